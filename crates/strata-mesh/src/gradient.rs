//! Depth-to-colour gradient used for vertex colours.

use glam::Vec4;
use strata_config::GradientKey;

/// Piecewise-linear colour ramp over `t` in `[0, 1]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorGradient {
    keys: Vec<(f32, Vec4)>,
}

impl ColorGradient {
    /// Builds a gradient from configuration keys, sorted by time.
    ///
    /// Keys with a non-finite time are skipped.
    pub fn from_keys(keys: &[GradientKey]) -> Self {
        let mut keys: Vec<(f32, Vec4)> = keys
            .iter()
            .filter(|k| k.time.is_finite())
            .map(|k| (k.time.clamp(0.0, 1.0), Vec4::from_array(k.color)))
            .collect();
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Colour at `t`. Values outside the key range take the nearest end key.
    /// An empty gradient is white.
    pub fn evaluate(&self, t: f32) -> Vec4 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return Vec4::ONE;
        };
        if t.is_nan() || t <= first.0 {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }
        for pair in self.keys.windows(2) {
            let ((t0, c0), (t1, c1)) = (pair[0], pair[1]);
            if t <= t1 {
                let span = t1 - t0;
                let f = if span > 0.0 { (t - t0) / span } else { 1.0 };
                return c0.lerp(c1, f);
            }
        }
        last.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(time: f32, grey: f32) -> GradientKey {
        GradientKey {
            time,
            color: [grey, grey, grey, 1.0],
        }
    }

    #[test]
    fn test_interpolates_between_keys() {
        let gradient = ColorGradient::from_keys(&[key(1.0, 1.0), key(0.0, 0.0)]);
        let mid = gradient.evaluate(0.25);
        assert!((mid.x - 0.25).abs() < 1e-6, "keys are sorted before use");
        assert_eq!(mid.w, 1.0);
    }

    #[test]
    fn test_clamps_outside_range() {
        let gradient = ColorGradient::from_keys(&[key(0.2, 0.1), key(0.8, 0.9)]);
        assert_eq!(gradient.evaluate(-3.0).x, 0.1);
        assert_eq!(gradient.evaluate(0.1).x, 0.1);
        assert_eq!(gradient.evaluate(2.0).x, 0.9);
        assert_eq!(gradient.evaluate(f32::NAN).x, 0.1);
    }

    #[test]
    fn test_empty_is_white() {
        let gradient = ColorGradient::from_keys(&[]);
        assert!(gradient.is_empty());
        assert_eq!(gradient.evaluate(0.5), Vec4::ONE);
    }
}

//! Per-layer noise settings for height-map synthesis.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Coherent noise basis used to sample a layer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NoiseKind {
    /// Classic gradient noise.
    #[default]
    Perlin,
    /// Simplex gradient noise.
    Simplex,
    /// OpenSimplex noise (patent-free simplex variant).
    OpenSimplex,
    /// SuperSimplex noise (smoother OpenSimplex variant).
    SuperSimplex,
    /// Value noise (interpolated lattice values).
    Value,
}

/// Settings for one layer of the height-map stack.
///
/// A layer with `depth == 0.0` is a mask layer: it never contributes additive
/// depth and only acts as a full-strength multiplier over the summed stack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayerSettings {
    /// Depth weight. The layer contributes `2 * noise * depth` to each cell.
    pub depth: f32,
    /// Noise basis.
    pub noise_kind: NoiseKind,
    /// Base sampling frequency, in features per chunk span.
    pub scale: f32,
    /// Number of octaves to accumulate.
    pub octaves: u32,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f32,
    /// Exponent applied to the normalized field (`>1` flattens lowlands).
    pub redistribution: f32,
    /// Subtract a square falloff mask so the layer fades out at the chunk border.
    pub use_falloff: bool,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            depth: 50.0,
            noise_kind: NoiseKind::Perlin,
            scale: 2.0,
            octaves: 4,
            persistence: 0.3,
            lacunarity: 1.8,
            redistribution: 1.0,
            use_falloff: false,
        }
    }
}

impl LayerSettings {
    /// Returns `true` if this layer is a mask layer (zero depth weight).
    pub fn is_mask(&self) -> bool {
        self.depth == 0.0
    }

    /// First numeric setting that is NaN or infinite, by field name.
    pub fn non_finite_setting(&self) -> Option<(&'static str, f32)> {
        [
            ("depth", self.depth),
            ("scale", self.scale),
            ("persistence", self.persistence),
            ("lacunarity", self.lacunarity),
            ("redistribution", self.redistribution),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
    }

    /// Replaces the shape parameters with random values in the editor ranges.
    ///
    /// The noise kind and falloff flag are left untouched.
    pub fn randomize(&mut self, rng: &mut impl Rng) {
        self.scale = rng.random_range(1.0..5.0);
        self.octaves = rng.random_range(1..6);
        self.persistence = rng.random_range(0.1..0.5);
        self.lacunarity = rng.random_range(1.0..2.0);
        self.redistribution = rng.random_range(1.0..3.0);
        self.depth = rng.random_range(30..100) as f32;
    }

    /// Creates a fresh layer with randomized shape parameters.
    pub fn random(rng: &mut impl Rng) -> Self {
        let mut layer = Self::default();
        layer.randomize(rng);
        layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_zero_depth_is_mask() {
        let layer = LayerSettings {
            depth: 0.0,
            ..Default::default()
        };
        assert!(layer.is_mask());
        assert!(!LayerSettings::default().is_mask());
    }

    #[test]
    fn test_non_finite_setting_names_first_field() {
        assert_eq!(LayerSettings::default().non_finite_setting(), None);
        let layer = LayerSettings {
            persistence: f32::INFINITY,
            redistribution: f32::NAN,
            ..Default::default()
        };
        assert_eq!(layer.non_finite_setting(), Some(("persistence", f32::INFINITY)));
    }

    #[test]
    fn test_randomize_stays_in_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let layer = LayerSettings::random(&mut rng);
            assert!((1.0..5.0).contains(&layer.scale), "scale {}", layer.scale);
            assert!((1..6).contains(&layer.octaves), "octaves {}", layer.octaves);
            assert!((0.1..0.5).contains(&layer.persistence));
            assert!((1.0..2.0).contains(&layer.lacunarity));
            assert!((1.0..3.0).contains(&layer.redistribution));
            assert!((30.0..100.0).contains(&layer.depth));
            assert!(!layer.is_mask(), "random layers always carry depth");
        }
    }

    #[test]
    fn test_randomize_is_seeded() {
        let a = LayerSettings::random(&mut ChaCha8Rng::seed_from_u64(99));
        let b = LayerSettings::random(&mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(a, b, "same RNG seed must give the same layer");
    }
}

//! Layer composition: weighted sum, falloff, mask layers and mean-depth
//! normalization.

use strata_config::LayerSettings;
use tracing::{debug, warn};

use crate::chunk::NoiseOffset;
use crate::erosion::{ErosionStats, HydraulicErosion};
use crate::error::TerrainError;
use crate::falloff::falloff_map;
use crate::grid::HeightMap;
use crate::noise_field::NoiseFieldSynthesizer;

/// Diagnostics from one composition.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CompositionReport {
    /// Layers that contributed additive depth.
    pub depth_layers: usize,
    /// Zero-weight layers applied as multipliers.
    pub mask_layers: usize,
    /// Non-finite cells replaced by the target average depth.
    pub sanitized_cells: usize,
    /// Amount subtracted from every cell to hit the target mean.
    pub mean_shift: f64,
    /// Erosion totals, summed over eroded layers.
    pub erosion: Option<ErosionStats>,
}

/// A composed height map together with its diagnostics.
#[derive(Clone, Debug)]
pub struct Composition {
    pub height_map: HeightMap,
    pub report: CompositionReport,
}

/// How a composition reaches the target mean depth.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DepthNormalization {
    /// Shift each chunk by its own mean. Exact per chunk, but neighbouring
    /// chunks end up with different shifts and stop sharing edge depths.
    #[default]
    PerChunk,
    /// Subtract the same amount from every chunk, keeping shared edges equal.
    Fixed(f64),
}

/// What one layer contributes to the stack.
enum LayerContribution {
    /// Added to the running sum.
    Additive(HeightMap),
    /// Multiplied into the final sum.
    Mask(HeightMap),
}

/// Sums a layer stack into a single height map.
///
/// A depth layer contributes `2 * noise * depth`. A zero-depth layer is a mask:
/// it contributes a flat `1` that multiplies the summed depth rather than
/// adding to it, and never receives falloff or erosion.
#[derive(Clone, Debug)]
pub struct HeightMapComposer {
    layers: Vec<LayerSettings>,
    average_depth: f32,
    erosion: Option<HydraulicErosion>,
    normalization: DepthNormalization,
}

impl HeightMapComposer {
    pub fn new(layers: Vec<LayerSettings>, average_depth: f32) -> Self {
        Self {
            layers,
            average_depth,
            erosion: None,
            normalization: DepthNormalization::PerChunk,
        }
    }

    /// Run `erosion` over every depth layer's noise field before scaling.
    pub fn with_erosion(mut self, erosion: HydraulicErosion) -> Self {
        self.erosion = Some(erosion);
        self
    }

    /// Subtract `shift` from every chunk instead of each chunk's own mean offset.
    pub fn with_fixed_shift(mut self, shift: f64) -> Self {
        self.normalization = DepthNormalization::Fixed(shift);
        self
    }

    pub fn normalization(&self) -> DepthNormalization {
        self.normalization
    }

    /// Compose the chunk at `offset`.
    ///
    /// After summing, every cell is shifted down. Under
    /// [`DepthNormalization::PerChunk`] the shift is `mean - average_depth`, so
    /// the realized mean equals the target; a fixed shift is applied as is.
    pub fn compose(
        &self,
        synth: &NoiseFieldSynthesizer,
        offset: NoiseOffset,
    ) -> Result<Composition, TerrainError> {
        let (width, height) = (synth.width(), synth.height());
        let mut sum = HeightMap::new(width, height)?;
        let mut mask = HeightMap::filled(width, height, 1.0)?;
        let falloff = if self.layers.iter().any(|l| l.use_falloff && !l.is_mask()) {
            Some(falloff_map(width, height)?)
        } else {
            None
        };

        let mut report = CompositionReport::default();
        for layer in &self.layers {
            match self.layer_contribution(synth, layer, offset, falloff.as_ref(), &mut report) {
                LayerContribution::Additive(field) => {
                    report.depth_layers += 1;
                    for (acc, v) in sum.cells_mut().iter_mut().zip(field.cells()) {
                        *acc += v;
                    }
                }
                LayerContribution::Mask(field) => {
                    report.mask_layers += 1;
                    for (m, v) in mask.cells_mut().iter_mut().zip(field.cells()) {
                        *m *= v;
                    }
                }
            }
        }

        for (acc, m) in sum.cells_mut().iter_mut().zip(mask.cells()) {
            *acc *= m;
        }

        report.sanitized_cells = sum.sanitize(self.average_depth);
        if report.sanitized_cells > 0 {
            warn!(
                cells = report.sanitized_cells,
                "replaced non-finite depths during composition"
            );
        }

        let shift = match self.normalization {
            DepthNormalization::PerChunk => sum.mean() - self.average_depth as f64,
            DepthNormalization::Fixed(shift) => shift,
        };
        for v in sum.cells_mut() {
            *v = (*v as f64 - shift) as f32;
        }
        report.mean_shift = shift;
        // An extreme shift can still overflow f32.
        report.sanitized_cells += sum.sanitize(self.average_depth);

        debug!(
            depth_layers = report.depth_layers,
            mask_layers = report.mask_layers,
            shift,
            "composed height map"
        );

        Ok(Composition {
            height_map: sum,
            report,
        })
    }

    fn layer_contribution(
        &self,
        synth: &NoiseFieldSynthesizer,
        layer: &LayerSettings,
        offset: NoiseOffset,
        falloff: Option<&HeightMap>,
        report: &mut CompositionReport,
    ) -> LayerContribution {
        let (width, height) = (synth.width(), synth.height());
        if layer.is_mask() {
            return LayerContribution::Mask(HeightMap::from_cells_unchecked(
                width,
                height,
                vec![1.0; width * height],
            ));
        }

        let mut noise = synth.synthesize(layer, offset);

        if let Some(erosion) = &self.erosion {
            let stats = erosion.erode(&mut noise, synth.seed());
            let total = report.erosion.get_or_insert_with(ErosionStats::default);
            total.droplets += stats.droplets;
            total.eroded += stats.eroded;
            total.deposited += stats.deposited;
        }

        if layer.use_falloff
            && let Some(falloff) = falloff
        {
            for (n, f) in noise.cells_mut().iter_mut().zip(falloff.cells()) {
                *n = (*n - f).clamp(0.0, 1.0);
            }
        }

        let depth = layer.depth;
        for v in noise.cells_mut() {
            *v = 2.0 * *v * depth;
        }
        LayerContribution::Additive(noise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkPos;

    fn layer(depth: f32) -> LayerSettings {
        LayerSettings {
            depth,
            scale: 2.0,
            octaves: 4,
            persistence: 0.3,
            lacunarity: 1.8,
            redistribution: 1.0,
            ..Default::default()
        }
    }

    fn synth(size: usize) -> NoiseFieldSynthesizer {
        NoiseFieldSynthesizer::new(42, size, size).unwrap()
    }

    #[test]
    fn test_mean_converges_to_target() {
        let stacks = [
            vec![layer(50.0)],
            vec![layer(10.0), layer(80.0)],
            vec![layer(0.0), layer(35.0)],
            vec![
                LayerSettings {
                    use_falloff: true,
                    ..layer(60.0)
                },
                layer(5.0),
            ],
        ];
        for (i, stack) in stacks.into_iter().enumerate() {
            for target in [0.0, 12.5, 50.0, -30.0] {
                let composer = HeightMapComposer::new(stack.clone(), target);
                let out = composer.compose(&synth(33), NoiseOffset::new(42, 42)).unwrap();
                let mean = out.height_map.mean();
                assert!(
                    (mean - target as f64).abs() < 1e-3,
                    "stack {i}, target {target}: mean {mean}"
                );
            }
        }
    }

    #[test]
    fn test_mask_layer_never_adds_depth() {
        let offset = NoiseOffset::new(3, 9);
        let plain = HeightMapComposer::new(vec![layer(40.0)], 20.0)
            .compose(&synth(25), offset)
            .unwrap();
        for position in 0..3 {
            let mut stack = vec![layer(40.0)];
            stack.insert(position.min(stack.len()), layer(0.0));
            stack.push(LayerSettings {
                use_falloff: true,
                ..layer(0.0)
            });
            let masked = HeightMapComposer::new(stack, 20.0)
                .compose(&synth(25), offset)
                .unwrap();
            assert_eq!(masked.report.mask_layers, 2);
            assert_eq!(masked.report.depth_layers, 1);
            assert_eq!(
                masked.height_map, plain.height_map,
                "a zero-depth layer must act as a full-strength mask, not as depth"
            );
        }
    }

    #[test]
    fn test_depth_scaling_before_shift() {
        // With a target equal to the raw mean, the shift is zero and cells are 2*n*depth.
        let s = synth(17);
        let offset = NoiseOffset::new(1, 1);
        let noise = s.synthesize(&layer(25.0), offset);
        let raw_mean = noise.mean() * 50.0;
        let out = HeightMapComposer::new(vec![layer(25.0)], raw_mean as f32)
            .compose(&s, offset)
            .unwrap();
        assert!(out.report.mean_shift.abs() < 1e-3);
        for (n, h) in noise.cells().iter().zip(out.height_map.cells()) {
            assert!((2.0 * n * 25.0 - h).abs() < 1e-3);
        }
    }

    #[test]
    fn test_falloff_lowers_rim() {
        let s = synth(33);
        let offset = NoiseOffset::new(0, 0);
        let with_falloff = HeightMapComposer::new(
            vec![LayerSettings {
                use_falloff: true,
                ..layer(50.0)
            }],
            0.0,
        )
        .compose(&s, offset)
        .unwrap();
        // The rim falloff is 1, so every rim cell sits at the composed minimum.
        let (lo, _) = with_falloff.height_map.min_max();
        for i in 0..33 {
            assert!((with_falloff.height_map.get(0, i) - lo).abs() < 1e-3);
        }
    }

    #[test]
    fn test_composition_all_finite_and_deterministic() {
        let composer = HeightMapComposer::new(vec![layer(50.0), layer(0.0), layer(20.0)], 50.0);
        let offset = NoiseOffset::for_chunk(ChunkPos::new(2, -1), 42, 33, 33);
        let a = composer.compose(&synth(33), offset).unwrap();
        let b = composer.compose(&synth(33), offset).unwrap();
        assert!(a.height_map.ensure_finite().is_ok());
        assert_eq!(a.height_map, b.height_map);
        assert_eq!(a.report.sanitized_cells, 0);
    }

    #[test]
    fn test_fixed_shift_keeps_neighbour_edges_equal() {
        let stack = vec![layer(50.0), layer(12.0)];
        let s = synth(33);
        let left_offset = NoiseOffset::for_chunk(ChunkPos::new(0, 0), 42, 33, 33);
        let right_offset = NoiseOffset::for_chunk(ChunkPos::new(1, 0), 42, 33, 33);

        let per_chunk = HeightMapComposer::new(stack.clone(), 50.0);
        let reference = per_chunk.compose(&s, left_offset).unwrap();
        let other = per_chunk.compose(&s, right_offset).unwrap();
        assert!(
            (reference.report.mean_shift - other.report.mean_shift).abs() > 1e-3,
            "neighbouring chunks should have different natural shifts"
        );

        let fixed = per_chunk.clone().with_fixed_shift(reference.report.mean_shift);
        assert_eq!(
            fixed.normalization(),
            DepthNormalization::Fixed(reference.report.mean_shift)
        );
        let left = fixed.compose(&s, left_offset).unwrap();
        let right = fixed.compose(&s, right_offset).unwrap();
        assert_eq!(left.height_map, reference.height_map, "the reference chunk is unchanged");
        for z in 0..33 {
            let gap = (left.height_map.get(32, z) - right.height_map.get(0, z)).abs();
            assert!(gap < 1e-3, "seam gap {gap} at z={z}");
        }
    }

    #[test]
    fn test_non_finite_target_falls_back_to_zero() {
        for target in [f32::NAN, f32::INFINITY] {
            let out = HeightMapComposer::new(vec![layer(10.0)], target)
                .compose(&synth(9), NoiseOffset::default())
                .unwrap();
            assert!(
                out.height_map.cells().iter().all(|&v| v == 0.0),
                "target {target}: diverged cells must be replaced by 0"
            );
            assert_eq!(out.report.sanitized_cells, 81);
        }
    }

    #[test]
    fn test_empty_stack_is_flat_at_target() {
        let out = HeightMapComposer::new(Vec::new(), 7.0)
            .compose(&synth(9), NoiseOffset::default())
            .unwrap();
        assert!(out.height_map.cells().iter().all(|&v| v == 7.0));
    }

    #[test]
    fn test_erosion_integration_reports_stats() {
        let erosion = HydraulicErosion::new(strata_config::ErosionConfig {
            enabled: true,
            iterations: 300,
            ..Default::default()
        });
        let composer = HeightMapComposer::new(vec![layer(50.0), layer(0.0)], 50.0).with_erosion(erosion);
        let out = composer.compose(&synth(33), NoiseOffset::new(42, 42)).unwrap();
        let stats = out.report.erosion.expect("erosion ran");
        assert_eq!(stats.droplets, 300, "mask layers are never eroded");
        assert!((out.height_map.mean() - 50.0).abs() < 1e-3);
    }
}

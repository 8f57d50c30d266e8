//! Validated, shareable snapshot of a generation pass's configuration.

use strata_config::{Config, ErosionPolicy, TerrainConfig};
use strata_mesh::{ColorGradient, MeshBuilder};
use strata_terrain::{
    ChunkPos, HeightMapComposer, HydraulicErosion, MIN_MAP_DIMENSION, NoiseFieldSynthesizer, NoiseOffset,
    TerrainError,
};
use tracing::{debug, warn};

/// Everything a worker needs to turn a request into a height map and mesh.
///
/// Built once per pass and shared with workers behind an `Arc`; never
/// mutated afterwards.
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    /// Composer without erosion. Applies [`mean_shift`](Self::mean_shift) to every chunk.
    pub composer: HeightMapComposer,
    /// Depth subtracted from every chunk of the pass, taken from the centre chunk.
    pub mean_shift: f64,
    /// Composer with erosion, present only when erosion may run this pass.
    /// Normalizes each chunk on its own, since eroded chunks never tile.
    pub eroding_composer: Option<HeightMapComposer>,
    /// Policy for requests that would erode next to other chunks in flight.
    pub erosion_policy: ErosionPolicy,
    pub mesh_builder: MeshBuilder,
    pub gradient: Option<ColorGradient>,
    /// Water plane height, when water is enabled.
    pub water_level: Option<f32>,
    /// Chunks per grid side, always odd.
    pub grid_width: u32,
    pub map_width: usize,
    pub map_height: usize,
    pub view_range: f32,
}

impl PipelineSettings {
    /// Validate `config` for a pass of `chunks` chunks.
    ///
    /// Erosion over more than one chunk is rejected or switched off
    /// depending on [`ErosionPolicy`].
    pub fn from_config(config: &Config, chunks: usize) -> Result<Self, TerrainError> {
        let terrain = &config.terrain;
        if terrain.chunk_grid_width == 0 {
            return Err(TerrainError::InvalidGridWidth(0));
        }
        let grid_width = terrain.normalized_grid_width();
        if grid_width != terrain.chunk_grid_width {
            warn!(
                requested = terrain.chunk_grid_width,
                using = grid_width,
                "chunk grid width must be odd, rounding up"
            );
        }

        let (map_width, map_height) = (terrain.map_width as usize, terrain.map_height as usize);
        if map_width < MIN_MAP_DIMENSION || map_height < MIN_MAP_DIMENSION {
            return Err(TerrainError::InvalidDimensions {
                width: map_width,
                height: map_height,
                reason: "each side needs at least two cells",
            });
        }

        check_finite(terrain)?;

        let mesh_builder = MeshBuilder::new(terrain.level_of_detail)?;
        let composer = HeightMapComposer::new(terrain.layers.clone(), terrain.average_depth);
        let mean_shift = centre_shift(&composer, terrain, map_width, map_height)?;

        let erosion = &config.erosion;
        let eroding_composer = match (erosion.enabled, chunks > 1, erosion.policy) {
            (false, _, _) => None,
            (true, false, _) => Some(composer.clone().with_erosion(HydraulicErosion::new(erosion.clone()))),
            (true, true, ErosionPolicy::Reject) => return Err(TerrainError::ErosionUnsupported { chunks }),
            (true, true, ErosionPolicy::Disable) => {
                warn!(chunks, "erosion needs a single-chunk pass, disabling it");
                None
            }
        };

        let gradient = Some(ColorGradient::from_keys(&terrain.gradient)).filter(|g| !g.is_empty());

        Ok(Self {
            composer: composer.with_fixed_shift(mean_shift),
            mean_shift,
            eroding_composer,
            erosion_policy: erosion.policy,
            mesh_builder,
            gradient,
            water_level: config.water.enabled.then_some(config.water.level),
            grid_width,
            map_width,
            map_height,
            view_range: config.streaming.chunk_view_range,
        })
    }
}

fn check_finite(terrain: &TerrainConfig) -> Result<(), TerrainError> {
    if !terrain.average_depth.is_finite() {
        return Err(TerrainError::NonFiniteAverageDepth(terrain.average_depth));
    }
    for (layer, settings) in terrain.layers.iter().enumerate() {
        if let Some((setting, value)) = settings.non_finite_setting() {
            return Err(TerrainError::NonFiniteLayerSetting { layer, setting, value });
        }
    }
    Ok(())
}

/// Shift that brings the centre chunk's mean to the target.
///
/// Every chunk of the pass subtracts this same amount, so shared edges keep
/// equal depths and the centre chunk hits the target exactly.
fn centre_shift(
    composer: &HeightMapComposer,
    terrain: &TerrainConfig,
    width: usize,
    height: usize,
) -> Result<f64, TerrainError> {
    let [cx, cy] = terrain.center;
    let synth = NoiseFieldSynthesizer::new(terrain.seed, width, height)?;
    let offset = NoiseOffset::for_chunk(ChunkPos::new(cx, cy), terrain.seed, width, height);
    let shift = composer.compose(&synth, offset)?.report.mean_shift;
    debug!(shift, "pass mean shift from centre chunk");
    Ok(shift)
}

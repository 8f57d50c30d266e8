//! Height-map synthesis for chunked terrain: layered fBm noise, falloff masks,
//! droplet erosion, layer composition and walkable-path flattening.

mod chunk;
mod composer;
mod error;
mod erosion;
mod falloff;
mod grid;
mod noise_field;
mod path;

pub use chunk::{ChunkPos, NoiseOffset};
pub use composer::{Composition, CompositionReport, DepthNormalization, HeightMapComposer};
pub use error::TerrainError;
pub use erosion::{ErosionStats, HydraulicErosion};
pub use falloff::{falloff_map, falloff_value};
pub use grid::{HeightMap, MIN_MAP_DIMENSION};
pub use noise_field::NoiseFieldSynthesizer;
pub use path::{PathConstraintPostProcessor, PathReport, WalkabilityMask};

pub use strata_config::{LayerSettings, NoiseKind};

//! Configuration system for the Strata terrain pipeline.
//!
//! Provides the generation settings (seed, chunk grid, layer stack, erosion,
//! water, streaming) that persist to disk as RON files. Supports CLI overrides
//! via clap, hot-reload detection, and forward/backward compatible
//! serialization.

mod cli;
mod config;
mod error;
mod layer;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, ErosionConfig, ErosionPolicy, GradientKey, MAX_LEVEL_OF_DETAIL,
    StreamingConfig, TerrainConfig, WaterConfig,
};
pub use error::ConfigError;
pub use layer::{LayerSettings, NoiseKind};

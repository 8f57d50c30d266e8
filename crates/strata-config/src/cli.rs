//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Strata command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "strata", about = "Procedural chunked terrain generator")]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<i32>,

    /// Chunks per side of the grid (rounded up to odd).
    #[arg(long)]
    pub grid_width: Option<u32>,

    /// Cells per chunk side (sets both width and height).
    #[arg(long)]
    pub map_size: Option<u32>,

    /// Mesh level of detail (0-6).
    #[arg(long)]
    pub lod: Option<u8>,

    /// Enable or disable hydraulic erosion.
    #[arg(long)]
    pub erosion: Option<bool>,

    /// Enable or disable the water plane.
    #[arg(long)]
    pub water: Option<bool>,

    /// Randomize the layer stack with this RNG seed before generating.
    #[arg(long)]
    pub randomize: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.terrain.seed = seed;
        }
        if let Some(w) = args.grid_width {
            self.terrain.chunk_grid_width = w;
        }
        if let Some(size) = args.map_size {
            self.terrain.map_width = size;
            self.terrain.map_height = size;
        }
        if let Some(lod) = args.lod {
            self.terrain.level_of_detail = lod;
        }
        if let Some(erosion) = args.erosion {
            self.erosion.enabled = erosion;
        }
        if let Some(water) = args.water {
            self.water.enabled = water;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> CliArgs {
        CliArgs {
            seed: None,
            grid_width: None,
            map_size: None,
            lod: None,
            erosion: None,
            water: None,
            randomize: None,
            log_level: None,
            config: None,
        }
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            seed: Some(42),
            map_size: Some(121),
            erosion: Some(true),
            ..empty_args()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.terrain.seed, 42);
        assert_eq!(config.terrain.map_width, 121);
        assert_eq!(config.terrain.map_height, 121);
        assert!(config.erosion.enabled);
        // Non-overridden fields retain defaults
        assert_eq!(config.terrain.chunk_grid_width, 1);
        assert!(!config.water.enabled);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&empty_args());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from(["strata", "--seed=-3", "--lod", "2", "--water", "true"]);
        assert_eq!(args.seed, Some(-3));
        assert_eq!(args.lod, Some(2));
        assert_eq!(args.water, Some(true));
    }
}

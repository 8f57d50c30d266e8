//! Generation settings, their defaults and `config.ron` persistence.

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::layer::LayerSettings;

/// Highest supported level-of-detail factor.
pub const MAX_LEVEL_OF_DETAIL: u8 = 6;

/// Top-level configuration for a generation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Height-map, chunk grid and mesh settings.
    pub terrain: TerrainConfig,
    /// Hydraulic erosion settings.
    pub erosion: ErosionConfig,
    /// Flat water plane settings.
    pub water: WaterConfig,
    /// Worker pool and visibility settings.
    pub streaming: StreamingConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Terrain generation settings shared by every chunk in a pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// World seed. Also added to the noise sampling offset.
    pub seed: i32,
    /// Chunk-grid coordinate of the central chunk.
    pub center: [i32; 2],
    /// Number of chunks along each side of the grid. Must be odd.
    pub chunk_grid_width: u32,
    /// Height-map cells along x per chunk.
    pub map_width: u32,
    /// Height-map cells along z per chunk.
    pub map_height: u32,
    /// Mesh level of detail, `0..=MAX_LEVEL_OF_DETAIL`.
    pub level_of_detail: u8,
    /// Realized mean depth after composition.
    pub average_depth: f32,
    /// Ordered layer stack.
    pub layers: Vec<LayerSettings>,
    /// Depth-to-colour gradient keys. Empty disables vertex colours.
    pub gradient: Vec<GradientKey>,
}

/// One stop of the depth-to-colour gradient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GradientKey {
    /// Normalized depth in `[0, 1]`.
    pub time: f32,
    /// Linear RGBA colour.
    pub color: [f32; 4],
}

/// What the scheduler does when erosion is enabled for a multi-chunk pass.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErosionPolicy {
    /// Abort the pass with an error before any work is dispatched.
    #[default]
    Reject,
    /// Log a warning and run the pass without erosion.
    Disable,
}

/// Droplet-based hydraulic erosion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ErosionConfig {
    /// Run erosion on every non-mask layer.
    pub enabled: bool,
    /// Behaviour when more than one chunk is requested.
    pub policy: ErosionPolicy,
    /// Number of droplets simulated per layer.
    pub iterations: u32,
    /// Radius of the erosion brush in cells.
    pub brush_radius: u32,
    /// How much a droplet keeps its previous direction, `[0, 1]`.
    pub inertia: f32,
    /// Multiplier for how much sediment a droplet can carry.
    pub sediment_capacity_factor: f32,
    /// Floor on capacity so flat terrain still erodes a little.
    pub min_sediment_capacity: f32,
    /// Fraction of free capacity eroded per step, `[0, 1]`.
    pub erode_speed: f32,
    /// Fraction of surplus sediment deposited per step, `[0, 1]`.
    pub deposit_speed: f32,
    /// Fraction of water lost per step, `[0, 1]`.
    pub evaporate_speed: f32,
    /// Downhill acceleration.
    pub gravity: f32,
    /// Maximum steps a droplet lives.
    pub max_lifetime: u32,
    /// Water volume a droplet starts with.
    pub initial_water: f32,
    /// Speed a droplet starts with.
    pub initial_speed: f32,
}

/// Flat water plane generated alongside each terrain chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WaterConfig {
    /// Emit a water mesh per chunk.
    pub enabled: bool,
    /// Height of the water plane.
    pub level: f32,
}

/// Worker pool and visibility settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Worker threads. `0` picks `num_cpus - 1` (at least one).
    pub worker_threads: u32,
    /// Chunks whose origin is farther than this from the viewer are hidden.
    pub chunk_view_range: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            center: [0, 0],
            chunk_grid_width: 1,
            map_width: 241,
            map_height: 241,
            level_of_detail: 0,
            average_depth: 50.0,
            layers: vec![LayerSettings::default()],
            gradient: default_gradient(),
        }
    }
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            policy: ErosionPolicy::Reject,
            iterations: 50_000,
            brush_radius: 3,
            inertia: 0.05,
            sediment_capacity_factor: 4.0,
            min_sediment_capacity: 0.01,
            erode_speed: 0.3,
            deposit_speed: 0.3,
            evaporate_speed: 0.01,
            gravity: 4.0,
            max_lifetime: 30,
            initial_water: 1.0,
            initial_speed: 1.0,
        }
    }
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: 10.0,
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            chunk_view_range: 600.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

fn default_gradient() -> Vec<GradientKey> {
    vec![
        GradientKey {
            time: 0.0,
            color: [0.76, 0.70, 0.50, 1.0],
        },
        GradientKey {
            time: 0.3,
            color: [0.34, 0.55, 0.23, 1.0],
        },
        GradientKey {
            time: 0.7,
            color: [0.45, 0.42, 0.40, 1.0],
        },
        GradientKey {
            time: 1.0,
            color: [0.95, 0.95, 0.97, 1.0],
        },
    ]
}

// --- Derived values ---

impl TerrainConfig {
    /// Chunk grid width rounded up to the nearest odd value `>= 1`.
    pub fn normalized_grid_width(&self) -> u32 {
        if self.chunk_grid_width % 2 == 0 {
            self.chunk_grid_width + 1
        } else {
            self.chunk_grid_width
        }
    }

    /// Number of chunks a full grid pass requests.
    pub fn chunk_count(&self) -> usize {
        let w = self.normalized_grid_width() as usize;
        w * w
    }

    /// Replaces the seed and layer stack with random values.
    pub fn randomize(&mut self, rng: &mut impl Rng) {
        self.seed = rng.random_range(0..1000);
        let layer_count = rng.random_range(1..4);
        self.layers = (0..layer_count)
            .map(|_| LayerSettings::random(rng))
            .collect();
    }
}

impl Config {
    /// Randomizes the terrain stack and the water level.
    pub fn randomize(&mut self, rng: &mut impl Rng) {
        self.terrain.randomize(rng);
        self.water.level = rng.random_range(0.0..30.0);
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Reads `config.ron` from `config_dir`, writing the defaults there first if it is missing.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let config = read_config(&config_path)?;
            log::info!("Loaded generation settings from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Wrote default generation settings to {}", config_path.display());
            Ok(config)
        }
    }

    /// Writes these settings to `config_dir/config.ron`, creating the directory if needed.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::WriteError {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::WriteError {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Re-reads the file; `Some` only when it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let new_config = read_config(&config_path)?;

        if &new_config != self {
            log::info!("Generation settings changed on disk");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("map_width: 241"));
        assert!(ron_str.contains("policy: Reject"));
    }

    #[test]
    fn test_missing_field_uses_default() {
        let ron_str = "(terrain: (seed: 7), streaming: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.terrain.seed, 7);
        assert_eq!(config.terrain.map_width, 241);
        assert_eq!(config.erosion, ErosionConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_layer_stack_parses() {
        let ron_str = "(terrain: (layers: [(depth: 0.0, noise_kind: Simplex), (depth: 20.0)]))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.terrain.layers.len(), 2);
        assert!(config.terrain.layers[0].is_mask());
        assert_eq!(config.terrain.layers[1].octaves, 4);
    }

    #[test]
    fn test_even_grid_width_rounds_up() {
        let mut terrain = TerrainConfig::default();
        for (input, expected) in [(0, 1), (1, 1), (2, 3), (3, 3), (4, 5), (10, 11)] {
            terrain.chunk_grid_width = input;
            assert_eq!(terrain.normalized_grid_width(), expected, "input {input}");
        }
        terrain.chunk_grid_width = 3;
        assert_eq!(terrain.chunk_count(), 9);
    }

    #[test]
    fn test_randomize_replaces_stack() {
        let mut config = Config::default();
        config.randomize(&mut ChaCha8Rng::seed_from_u64(3));
        assert!((0..1000).contains(&config.terrain.seed));
        assert!((1..4).contains(&config.terrain.layers.len()));
        assert!((0.0..30.0).contains(&config.water.level));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.terrain.seed = 42;
        config.terrain.chunk_grid_width = 3;
        config.erosion.policy = ErosionPolicy::Disable;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.terrain.average_depth = 12.5;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.terrain.average_depth), Some(12.5));
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "(terrain: (seed: \"x\"))").unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.ron"), "got {err}");
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}

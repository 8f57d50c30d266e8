//! Headless demo that runs one terrain generation pass and reports what the
//! pipeline produced.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p strata-demo -- --seed 42 --grid-width 3`.

use std::error::Error;
use std::time::{Duration, Instant};

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata_config::{CliArgs, Config};
use strata_mesh::MeshKind;
use strata_stream::{ChunkScheduler, GenerationResult};
use strata_terrain::ChunkPos;
use tracing::{info, warn};

/// Upper bound on a single pass.
const PASS_TIMEOUT: Duration = Duration::from_secs(600);

/// Poll interval while waiting for workers.
const TICK: Duration = Duration::from_millis(16);

#[derive(Debug, Default)]
struct PassSummary {
    height_maps: usize,
    terrain_meshes: usize,
    water_meshes: usize,
    failed: usize,
    cancelled: usize,
    vertices: usize,
}

impl PassSummary {
    fn record(&mut self, result: &GenerationResult) {
        match result {
            GenerationResult::HeightMap { position, height_map, .. } => {
                self.height_maps += 1;
                let (lo, hi) = height_map.min_max();
                info!(
                    %position,
                    mean = height_map.mean(),
                    min = lo,
                    max = hi,
                    "height map ready"
                );
            }
            GenerationResult::Mesh { position, mesh, kind, .. } => {
                match kind {
                    MeshKind::Terrain => self.terrain_meshes += 1,
                    MeshKind::Water => self.water_meshes += 1,
                }
                self.vertices += mesh.vertex_count();
                info!(
                    %position,
                    ?kind,
                    vertices = mesh.vertex_count(),
                    triangles = mesh.triangle_count(),
                    "mesh ready"
                );
            }
            GenerationResult::Failed {
                position,
                stage,
                message,
                ..
            } => {
                self.failed += 1;
                warn!(%position, %stage, %message, "chunk failed");
            }
            GenerationResult::Cancelled { .. } => self.cancelled += 1,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(|| dirs::config_dir().map(|dir| dir.join("strata")))
        .ok_or("could not resolve a config directory, pass --config")?;

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    if let Some(rng_seed) = args.randomize {
        let mut rng = ChaCha8Rng::seed_from_u64(rng_seed);
        config.randomize(&mut rng);
    }

    let log_dir = config_dir.join("logs");
    if let Some(path) = strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config)) {
        info!(path = %path.display(), "writing JSON log");
    }

    info!(
        seed = config.terrain.seed,
        grid_width = config.terrain.chunk_grid_width,
        map_width = config.terrain.map_width,
        map_height = config.terrain.map_height,
        layers = config.terrain.layers.len(),
        lod = config.terrain.level_of_detail,
        "starting generation pass"
    );

    let mut scheduler = ChunkScheduler::new(&config)?;
    let tickets = scheduler.generate_grid(&config)?;
    info!(
        requested = tickets.len(),
        workers = scheduler.thread_count(),
        "chunks requested"
    );

    let started = Instant::now();
    let mut summary = PassSummary::default();
    while !scheduler.is_idle() {
        if started.elapsed() > PASS_TIMEOUT {
            return Err(format!(
                "pass timed out with {} chunks outstanding",
                scheduler.pending_count()
            )
            .into());
        }
        for result in scheduler.tick() {
            summary.record(&result);
        }
        std::thread::sleep(TICK);
    }

    let [cx, cy] = config.terrain.center;
    let viewer = ChunkPos::new(cx, cy).world_origin(
        config.terrain.map_width as usize,
        config.terrain.map_height as usize,
    );
    let visible = scheduler.update_visibility(viewer);

    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        height_maps = summary.height_maps,
        terrain_meshes = summary.terrain_meshes,
        water_meshes = summary.water_meshes,
        failed = summary.failed,
        cancelled = summary.cancelled,
        vertices = summary.vertices,
        visible,
        "generation pass finished"
    );

    if summary.failed > 0 {
        return Err(format!("{} chunks failed", summary.failed).into());
    }
    Ok(())
}

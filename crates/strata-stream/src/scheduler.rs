//! Chunk scheduler: fans requests out to the worker pool and drains finished
//! work on the consuming thread.
//!
//! Per tick the consumer drains the height channel in FIFO order, applies
//! walkability flattening, queues mesh jobs, and then drains the mesh channel.
//! There is no ordering between chunks, only within each channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use glam::Vec2;
use rustc_hash::FxHashMap;
use strata_config::{Config, ErosionPolicy};
use strata_mesh::MeshKind;
use strata_terrain::{ChunkPos, HeightMap, MIN_MAP_DIMENSION, PathConstraintPostProcessor, TerrainError};
use tracing::{debug, info, warn};

use crate::error::StreamError;
use crate::registry::{ChunkRegistry, ChunkSlot, ChunkState};
use crate::request::{ChunkRequest, GenerationResult, Stage, Ticket};
use crate::settings::PipelineSettings;
use crate::worker::{HeightJob, Job, MeshJob, MeshOutcome, WorkerPool, default_thread_count};

/// Minimal generator lifecycle: submit, poll, clear.
pub trait TerrainGenerator {
    /// Queue `request` without blocking.
    fn generate(&mut self, request: ChunkRequest) -> Result<Ticket, StreamError>;

    /// Collect everything that finished since the last poll.
    fn poll(&mut self) -> Vec<GenerationResult>;

    /// Cancel all outstanding work and forget every chunk.
    fn clear(&mut self);
}

/// Asynchronous chunk pipeline with a single consumer.
///
/// Not `Sync`: every method that touches the registry runs on the thread that
/// owns the scheduler.
pub struct ChunkScheduler {
    settings: Arc<PipelineSettings>,
    post_processor: PathConstraintPostProcessor,
    pool: WorkerPool,
    height_results: Receiver<GenerationResult>,
    mesh_results: Receiver<MeshOutcome>,
    registry: ChunkRegistry,
    /// Tickets still owed a terminal result.
    outstanding: FxHashMap<Ticket, Arc<AtomicBool>>,
    water_in_flight: usize,
    /// Results produced on the consumer thread, delivered on the next tick.
    undelivered: Vec<GenerationResult>,
    next_ticket: u64,
    viewer: Option<Vec2>,
}

impl ChunkScheduler {
    /// Validates `config` and starts the worker pool.
    ///
    /// `streaming.worker_threads == 0` picks one worker per core minus one.
    pub fn new(config: &Config) -> Result<Self, StreamError> {
        let settings = PipelineSettings::from_config(config, config.terrain.chunk_count())?;
        let threads = match config.streaming.worker_threads {
            0 => default_thread_count(),
            n => n as usize,
        };
        let (pool, height_results, mesh_results) = WorkerPool::spawn(threads)?;
        Ok(Self {
            settings: Arc::new(settings),
            post_processor: PathConstraintPostProcessor::new(),
            pool,
            height_results,
            mesh_results,
            registry: ChunkRegistry::new(),
            outstanding: FxHashMap::default(),
            water_in_flight: 0,
            undelivered: Vec::new(),
            next_ticket: 0,
            viewer: None,
        })
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ChunkRegistry {
        &self.registry
    }

    pub fn thread_count(&self) -> usize {
        self.pool.thread_count()
    }

    /// Tickets that have not yet produced their terminal result.
    pub fn pending_count(&self) -> usize {
        self.outstanding.len()
    }

    /// Returns `true` once every ticket and water mesh has been delivered.
    pub fn is_idle(&self) -> bool {
        self.outstanding.is_empty() && self.water_in_flight == 0 && self.undelivered.is_empty()
    }

    /// Start a full grid pass: clears the registry and requests a
    /// `grid_width²` block of chunks centred on `terrain.center`.
    ///
    /// The configuration is validated first; on error nothing is cancelled or
    /// dispatched.
    pub fn generate_grid(&mut self, config: &Config) -> Result<Vec<Ticket>, StreamError> {
        let terrain = &config.terrain;
        let settings = PipelineSettings::from_config(config, terrain.chunk_count())?;
        let half = (settings.grid_width / 2) as i32;
        let (width, height) = (settings.map_width, settings.map_height);

        self.clear();
        self.settings = Arc::new(settings);

        let [cx, cy] = terrain.center;
        let mut tickets = Vec::with_capacity(terrain.chunk_count());
        for y in -half..=half {
            for x in -half..=half {
                let request = ChunkRequest::new(ChunkPos::new(cx + x, cy + y), width, height, terrain.seed);
                tickets.push(self.request_chunk(request)?);
            }
        }
        info!(
            chunks = tickets.len(),
            seed = terrain.seed,
            erosion = self.settings.eroding_composer.is_some(),
            lod = self.settings.mesh_builder.level_of_detail(),
            mean_shift = self.settings.mean_shift,
            "generation pass started"
        );
        Ok(tickets)
    }

    /// Queue one chunk. Returns immediately.
    ///
    /// A request for a position that already has a chunk supersedes it: the
    /// older ticket ends as [`GenerationResult::Cancelled`].
    pub fn request_chunk(&mut self, request: ChunkRequest) -> Result<Ticket, StreamError> {
        if request.width < MIN_MAP_DIMENSION || request.height < MIN_MAP_DIMENSION {
            return Err(TerrainError::InvalidDimensions {
                width: request.width,
                height: request.height,
                reason: "each side needs at least two cells",
            }
            .into());
        }
        if let Some(mask) = &request.mask {
            mask.validate(request.width, request.height)?;
        }
        let erode = self.erosion_allowed(request.position)?;

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        let cancel = Arc::new(AtomicBool::new(false));
        let position = request.position;
        let origin = position.world_origin(request.width, request.height);
        if let Some(previous) = self
            .registry
            .insert(position, ChunkSlot::new(ticket, Arc::clone(&cancel), origin))
        {
            debug!(%position, %previous, %ticket, "request superseded");
        }
        self.outstanding.insert(ticket, Arc::clone(&cancel));

        let job = Job::Height(HeightJob {
            ticket,
            request,
            settings: Arc::clone(&self.settings),
            erode,
            cancel,
        });
        if self.pool.submit(job).is_err() {
            self.undelivered.push(pool_closed(position, ticket, Stage::Height));
        }
        Ok(ticket)
    }

    /// Erosion may only run while no other chunk is in flight.
    fn erosion_allowed(&self, position: ChunkPos) -> Result<bool, TerrainError> {
        if self.settings.eroding_composer.is_none() {
            return Ok(false);
        }
        let others = self.registry.in_flight_except(position);
        if others == 0 {
            return Ok(true);
        }
        match self.settings.erosion_policy {
            ErosionPolicy::Reject => Err(TerrainError::ErosionUnsupported { chunks: others + 1 }),
            ErosionPolicy::Disable => {
                warn!(%position, others, "other chunks in flight, generating without erosion");
                Ok(false)
            }
        }
    }

    /// Drain both result channels. Call once per frame on the owning thread.
    pub fn tick(&mut self) -> Vec<GenerationResult> {
        let mut out = Vec::new();
        for result in std::mem::take(&mut self.undelivered) {
            self.finish(result, &mut out);
        }
        while let Ok(result) = self.height_results.try_recv() {
            self.accept_height(result, &mut out);
        }
        while let Ok(outcome) = self.mesh_results.try_recv() {
            self.accept_mesh(outcome, &mut out);
        }
        out
    }

    /// Tick until idle or until `timeout` elapses, returning everything drained.
    pub fn run_until_idle(&mut self, timeout: Duration) -> Vec<GenerationResult> {
        let deadline = Instant::now() + timeout;
        let mut results = self.tick();
        while !self.is_idle() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
            results.extend(self.tick());
        }
        results
    }

    /// Show ready chunks within the view range of `viewer`, hide the rest.
    /// Returns the number of visible chunks.
    pub fn update_visibility(&mut self, viewer: Vec2) -> usize {
        self.viewer = Some(viewer);
        self.registry.update_visibility(viewer, self.settings.view_range)
    }

    /// Cancel every outstanding ticket and empty the registry.
    ///
    /// Cancelled tickets still report [`GenerationResult::Cancelled`] on a
    /// later tick.
    pub fn clear(&mut self) {
        for cancel in self.outstanding.values() {
            cancel.store(true, Ordering::Relaxed);
        }
        let removed = self.registry.clear();
        if removed > 0 {
            debug!(removed, pending = self.outstanding.len(), "cleared chunk registry");
        }
    }

    fn accept_height(&mut self, result: GenerationResult, out: &mut Vec<GenerationResult>) {
        let (position, ticket, mut height_map, mask) = match result {
            GenerationResult::HeightMap {
                position,
                ticket,
                height_map,
                mask,
            } => (position, ticket, height_map, mask),
            other => {
                self.finish(other, out);
                return;
            }
        };

        if !self.registry.is_current(position, ticket) {
            self.finish(GenerationResult::Cancelled { position, ticket }, out);
            return;
        }

        if let Some(mask) = &mask {
            match self.post_processor.apply(&mut height_map, mask) {
                Ok(report) => debug!(
                    %position,
                    flattened = report.flattened,
                    smoothed = report.smoothed,
                    "walkable cells flattened"
                ),
                Err(err) => {
                    let failed = GenerationResult::Failed {
                        position,
                        ticket,
                        stage: Stage::PostProcess,
                        message: err.to_string(),
                    };
                    self.finish(failed, out);
                    return;
                }
            }
        }

        let Some(cancel) = self.outstanding.get(&ticket).cloned() else {
            return;
        };
        self.registry.set_state(position, ChunkState::Meshing);

        if let Some(level) = self.settings.water_level
            && let Ok(water) = HeightMap::filled(height_map.width(), height_map.height(), level)
        {
            let job = Job::Mesh(MeshJob {
                ticket,
                position,
                kind: MeshKind::Water,
                height_map: water,
                settings: Arc::clone(&self.settings),
                cancel: Arc::clone(&cancel),
            });
            if self.pool.submit(job).is_ok() {
                self.water_in_flight += 1;
            }
        }

        let job = Job::Mesh(MeshJob {
            ticket,
            position,
            kind: MeshKind::Terrain,
            height_map: height_map.clone(),
            settings: Arc::clone(&self.settings),
            cancel,
        });
        if self.pool.submit(job).is_err() {
            self.undelivered.push(pool_closed(position, ticket, Stage::Mesh));
        }

        out.push(GenerationResult::HeightMap {
            position,
            ticket,
            height_map,
            mask,
        });
    }

    fn accept_mesh(&mut self, outcome: MeshOutcome, out: &mut Vec<GenerationResult>) {
        let MeshOutcome { kind, result } = outcome;
        let (position, ticket) = (result.position(), result.ticket());
        let current = self.registry.is_current(position, ticket);

        if kind == MeshKind::Water {
            self.water_in_flight = self.water_in_flight.saturating_sub(1);
            match result {
                GenerationResult::Mesh { .. } if current => out.push(result),
                GenerationResult::Failed { message, .. } => {
                    warn!(%position, %ticket, %message, "water mesh failed");
                }
                _ => {}
            }
            return;
        }

        match result {
            GenerationResult::Mesh { .. } if !current => {
                self.finish(GenerationResult::Cancelled { position, ticket }, out);
            }
            GenerationResult::Mesh { .. } => {
                self.registry.set_state(position, ChunkState::Ready);
                let visible = match (self.viewer, self.registry.get(position)) {
                    (Some(viewer), Some(slot)) => slot.origin().distance(viewer) < self.settings.view_range,
                    _ => true,
                };
                self.registry.set_visible(position, visible);
                debug!(%position, %ticket, visible, "chunk ready");
                self.finish(result, out);
            }
            other => self.finish(other, out),
        }
    }

    /// Deliver a ticket's terminal result.
    fn finish(&mut self, result: GenerationResult, out: &mut Vec<GenerationResult>) {
        let (position, ticket) = (result.position(), result.ticket());
        if let GenerationResult::Failed { stage, message, .. } = &result {
            warn!(%position, %ticket, %stage, %message, "chunk generation failed");
            if self.registry.is_current(position, ticket) {
                self.registry.set_state(position, ChunkState::Failed);
            }
        }
        self.outstanding.remove(&ticket);
        out.push(result);
    }
}

impl TerrainGenerator for ChunkScheduler {
    fn generate(&mut self, request: ChunkRequest) -> Result<Ticket, StreamError> {
        self.request_chunk(request)
    }

    fn poll(&mut self) -> Vec<GenerationResult> {
        self.tick()
    }

    fn clear(&mut self) {
        ChunkScheduler::clear(self);
    }
}

impl Drop for ChunkScheduler {
    fn drop(&mut self) {
        // Queued jobs see the flag and return early while the pool joins.
        for cancel in self.outstanding.values() {
            cancel.store(true, Ordering::Relaxed);
        }
    }
}

fn pool_closed(position: ChunkPos, ticket: Ticket, stage: Stage) -> GenerationResult {
    GenerationResult::Failed {
        position,
        ticket,
        stage,
        message: "worker pool has shut down".to_string(),
    }
}

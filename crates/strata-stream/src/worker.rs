//! Worker pool running height and mesh jobs off the consumer thread.
//!
//! Jobs arrive on one shared channel. Height outcomes and mesh outcomes leave
//! on two separate channels so the consumer can drain them in stage order.
//! Panics inside a job are caught and reported as failures, so every job
//! posts exactly one outcome.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};
use strata_mesh::MeshKind;
use strata_terrain::{ChunkPos, HeightMap, NoiseFieldSynthesizer, NoiseOffset, TerrainError};
use tracing::{debug, trace};

use crate::error::StreamError;
use crate::request::{ChunkRequest, GenerationResult, Stage, Ticket};
use crate::settings::PipelineSettings;

/// Noise, erosion and composition for one request.
pub(crate) struct HeightJob {
    pub ticket: Ticket,
    pub request: ChunkRequest,
    pub settings: Arc<PipelineSettings>,
    pub erode: bool,
    pub cancel: Arc<AtomicBool>,
}

/// Mesh construction for one finished height map.
pub(crate) struct MeshJob {
    pub ticket: Ticket,
    pub position: ChunkPos,
    pub kind: MeshKind,
    pub height_map: HeightMap,
    pub settings: Arc<PipelineSettings>,
    pub cancel: Arc<AtomicBool>,
}

pub(crate) enum Job {
    Height(HeightJob),
    Mesh(MeshJob),
}

/// Outcome of a mesh job, tagged with the surface it was for.
pub(crate) struct MeshOutcome {
    pub kind: MeshKind,
    pub result: GenerationResult,
}

/// Fixed set of named threads consuming [`Job`]s.
pub(crate) struct WorkerPool {
    job_sender: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `threads` workers. Returns the pool and the two outcome receivers.
    pub fn spawn(
        threads: usize,
    ) -> Result<(Self, Receiver<GenerationResult>, Receiver<MeshOutcome>), StreamError> {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (height_tx, height_rx) = unbounded::<GenerationResult>();
        let (mesh_tx, mesh_rx) = unbounded::<MeshOutcome>();

        let mut pool = Self {
            job_sender: Some(job_tx),
            handles: Vec::with_capacity(threads),
        };
        for _ in 0..threads.max(1) {
            let jobs = job_rx.clone();
            let height_tx = height_tx.clone();
            let mesh_tx = mesh_tx.clone();
            let handle = std::thread::Builder::new()
                .name("chunk-gen-worker".into())
                .spawn(move || {
                    while let Ok(job) = jobs.recv() {
                        match job {
                            Job::Height(job) => {
                                let _ = height_tx.send(run_height_job(job));
                            }
                            Job::Mesh(job) => {
                                let _ = mesh_tx.send(run_mesh_job(job));
                            }
                        }
                    }
                })
                .map_err(StreamError::WorkerSpawn)?;
            pool.handles.push(handle);
        }
        debug!(threads = pool.handles.len(), "worker pool started");
        Ok((pool, height_rx, mesh_rx))
    }

    /// Queue a job. Returns the job back if the pool has shut down.
    pub fn submit(&self, job: Job) -> Result<(), Job> {
        match &self.job_sender {
            Some(sender) => sender.send(job).map_err(|e| e.into_inner()),
            None => Err(job),
        }
    }

    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }

    /// Closes the job channel and joins every worker.
    ///
    /// Queued jobs still run to completion first.
    pub fn shutdown(&mut self) {
        self.job_sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Default worker count: one per core, leaving one for the consumer.
pub(crate) fn default_thread_count() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

fn run_height_job(job: HeightJob) -> GenerationResult {
    let HeightJob {
        ticket,
        request,
        settings,
        erode,
        cancel,
    } = job;
    let position = request.position;
    if cancel.load(Ordering::Relaxed) {
        return GenerationResult::Cancelled { position, ticket };
    }

    let outcome = catch_unwind(AssertUnwindSafe(|| compose(&request, &settings, erode)));
    if cancel.load(Ordering::Relaxed) {
        return GenerationResult::Cancelled { position, ticket };
    }

    match outcome {
        Ok(Ok(height_map)) => {
            trace!(%position, %ticket, "height map composed");
            GenerationResult::HeightMap {
                position,
                ticket,
                height_map,
                mask: request.mask,
            }
        }
        Ok(Err(err)) => failed(position, ticket, Stage::Height, err.to_string()),
        Err(payload) => failed(position, ticket, Stage::Height, panic_message(payload)),
    }
}

fn compose(request: &ChunkRequest, settings: &PipelineSettings, erode: bool) -> Result<HeightMap, TerrainError> {
    let synth = NoiseFieldSynthesizer::new(request.seed, request.width, request.height)?;
    let offset = NoiseOffset::for_chunk(request.position, request.seed, request.width, request.height);
    let composer = match (&settings.eroding_composer, erode) {
        (Some(eroding), true) => eroding,
        _ => &settings.composer,
    };
    Ok(composer.compose(&synth, offset)?.height_map)
}

fn run_mesh_job(job: MeshJob) -> MeshOutcome {
    let MeshJob {
        ticket,
        position,
        kind,
        height_map,
        settings,
        cancel,
    } = job;
    let result = if cancel.load(Ordering::Relaxed) {
        GenerationResult::Cancelled { position, ticket }
    } else {
        let gradient = match kind {
            MeshKind::Terrain => settings.gradient.as_ref(),
            MeshKind::Water => None,
        };
        match catch_unwind(AssertUnwindSafe(|| settings.mesh_builder.build(&height_map, gradient))) {
            Ok(Ok(mesh)) => GenerationResult::Mesh {
                position,
                ticket,
                height_map,
                mesh,
                kind,
            },
            Ok(Err(err)) => failed(position, ticket, Stage::Mesh, err.to_string()),
            Err(payload) => failed(position, ticket, Stage::Mesh, panic_message(payload)),
        }
    };
    MeshOutcome { kind, result }
}

fn failed(position: ChunkPos, ticket: Ticket, stage: Stage, message: String) -> GenerationResult {
    GenerationResult::Failed {
        position,
        ticket,
        stage,
        message,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

//! Scheduler error types.

use strata_terrain::TerrainError;

/// Errors returned by [`ChunkScheduler`](crate::ChunkScheduler) before any
/// work is dispatched.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The request or pass configuration is invalid.
    #[error(transparent)]
    Terrain(#[from] TerrainError),

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

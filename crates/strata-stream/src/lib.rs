//! Chunk streaming: the scheduler that fans terrain work out to a worker pool
//! and hands finished height maps and meshes back to a single consumer.

mod error;
mod registry;
mod request;
mod scheduler;
mod settings;
mod worker;

pub use error::StreamError;
pub use registry::{ChunkRegistry, ChunkSlot, ChunkState};
pub use request::{ChunkRequest, GenerationResult, Stage, Ticket};
pub use scheduler::{ChunkScheduler, TerrainGenerator};
pub use settings::PipelineSettings;

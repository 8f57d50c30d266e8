//! Requests submitted to the scheduler and the results it hands back.

use strata_mesh::{MeshData, MeshKind};
use strata_terrain::{ChunkPos, HeightMap, WalkabilityMask};

/// Identifies one accepted request. Tickets increase monotonically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub(crate) u64);

impl Ticket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single chunk to generate.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkRequest {
    pub position: ChunkPos,
    /// Cells along x.
    pub width: usize,
    /// Cells along z.
    pub height: usize,
    pub seed: i32,
    /// Cells to flatten into walkable ground, indexed `x * width + z`.
    pub mask: Option<WalkabilityMask>,
}

impl ChunkRequest {
    pub fn new(position: ChunkPos, width: usize, height: usize, seed: i32) -> Self {
        Self {
            position,
            width,
            height,
            seed,
            mask: None,
        }
    }

    pub fn with_mask(mut self, mask: WalkabilityMask) -> Self {
        self.mask = Some(mask);
        self
    }
}

/// Pipeline stage that produced a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Noise synthesis, erosion and composition on a worker.
    Height,
    /// Walkability flattening on the consumer thread.
    PostProcess,
    /// Mesh construction on a worker.
    Mesh,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Height => "height",
            Stage::PostProcess => "post-process",
            Stage::Mesh => "mesh",
        })
    }
}

/// Output of the pipeline, handed to the consumer by value.
///
/// Every ticket ends in exactly one terminal result: a `Terrain` mesh,
/// `Failed` or `Cancelled`. `HeightMap` results and `Water` meshes are
/// intermediate and may accompany it.
#[derive(Debug)]
pub enum GenerationResult {
    /// A composed and post-processed height map. Meshing has been scheduled.
    HeightMap {
        position: ChunkPos,
        ticket: Ticket,
        height_map: HeightMap,
        mask: Option<WalkabilityMask>,
    },
    Mesh {
        position: ChunkPos,
        ticket: Ticket,
        height_map: HeightMap,
        mesh: MeshData,
        kind: MeshKind,
    },
    Failed {
        position: ChunkPos,
        ticket: Ticket,
        stage: Stage,
        message: String,
    },
    /// The request was cleared or superseded before it finished.
    Cancelled { position: ChunkPos, ticket: Ticket },
}

impl GenerationResult {
    pub fn position(&self) -> ChunkPos {
        match self {
            GenerationResult::HeightMap { position, .. }
            | GenerationResult::Mesh { position, .. }
            | GenerationResult::Failed { position, .. }
            | GenerationResult::Cancelled { position, .. } => *position,
        }
    }

    pub fn ticket(&self) -> Ticket {
        match self {
            GenerationResult::HeightMap { ticket, .. }
            | GenerationResult::Mesh { ticket, .. }
            | GenerationResult::Failed { ticket, .. }
            | GenerationResult::Cancelled { ticket, .. } => *ticket,
        }
    }

    /// Returns `true` for the single outcome that closes a ticket.
    pub fn is_terminal(&self) -> bool {
        match self {
            GenerationResult::HeightMap { .. } => false,
            GenerationResult::Mesh { kind, .. } => *kind == MeshKind::Terrain,
            GenerationResult::Failed { .. } | GenerationResult::Cancelled { .. } => true,
        }
    }
}

//! Chunk lattice coordinates and the noise offsets derived from them.

use glam::Vec2;

/// Integer position of a chunk on the world grid.
///
/// `y` runs along world `-z`: chunk `(0, 1)` sits one chunk span "north" of
/// `(0, 0)` on the negative z axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// World-space origin of the chunk's mesh for a `width × height` map.
    ///
    /// Adjacent chunks overlap by one row of cells, so one chunk spans
    /// `dimension - 1` world units.
    pub fn world_origin(&self, width: usize, height: usize) -> Vec2 {
        Vec2::new(
            self.x as f32 * (width - 1) as f32,
            -(self.y as f32) * (height - 1) as f32,
        )
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Integer sampling offset of a chunk in the continuous noise domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NoiseOffset {
    pub x: i64,
    pub z: i64,
}

impl NoiseOffset {
    pub const fn new(x: i64, z: i64) -> Self {
        Self { x, z }
    }

    /// Offset for a chunk: position scaled by `dimension - 1`, plus the seed.
    ///
    /// The last column of chunk `x` and the first column of chunk `x + 1`
    /// therefore sample the same noise coordinate.
    pub fn for_chunk(pos: ChunkPos, seed: i32, width: usize, height: usize) -> Self {
        Self {
            x: pos.x as i64 * (width as i64 - 1) + seed as i64,
            z: pos.y as i64 * (height as i64 - 1) + seed as i64,
        }
    }
}

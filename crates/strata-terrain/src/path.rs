//! Walkability masks and the post-processor that carves them into terrain.
//!
//! Marked cells are flattened to a target depth. Unmarked cells around each
//! marked cell are then pulled halfway towards their local `7×7` mean over a
//! radius that grows with how far the marked cell moved, so roads and plazas
//! blend into the surrounding noise instead of ending in a cliff.

use rustc_hash::FxHashSet;

use crate::error::TerrainError;
use crate::grid::HeightMap;

/// Set of passable linear cell indices, `x * width + z`.
///
/// Indices use one stride for both axes, so masks only apply to square maps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalkabilityMask {
    cells: FxHashSet<usize>,
}

impl WalkabilityMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            cells: indices.into_iter().collect(),
        }
    }

    /// Marks `(x, z)` on a map whose rows hold `row_len` cells.
    pub fn insert_coords(&mut self, x: usize, z: usize, row_len: usize) {
        self.cells.insert(x * row_len + z);
    }

    pub fn insert(&mut self, index: usize) -> bool {
        self.cells.insert(index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.cells.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Indices in ascending order.
    pub fn sorted(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.cells.iter().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Checks the map is square and every index addresses one of its cells.
    pub fn validate(&self, width: usize, height: usize) -> Result<(), TerrainError> {
        if width != height {
            return Err(TerrainError::InvalidDimensions {
                width,
                height,
                reason: "walkability masks need a square map",
            });
        }
        let cells = width * height;
        match self.cells.iter().copied().filter(|&i| i >= cells).min() {
            Some(index) => Err(TerrainError::MaskIndexOutOfRange { index, cells }),
            None => Ok(()),
        }
    }

    /// Rescale a mask from a coarser grid: every source cell becomes a
    /// `factor × factor` block.
    ///
    /// `src_row_len` is the number of cells per row of the source grid.
    pub fn upscale(&self, src_row_len: usize, factor: usize) -> Self {
        if factor <= 1 || src_row_len == 0 {
            return self.clone();
        }
        let dst_row_len = src_row_len * factor;
        let mut cells = FxHashSet::default();
        cells.reserve(self.cells.len() * factor * factor);
        for &index in &self.cells {
            let (sx, sz) = (index / src_row_len, index % src_row_len);
            for a in 0..factor {
                for b in 0..factor {
                    cells.insert((sx * factor + a) * dst_row_len + sz * factor + b);
                }
            }
        }
        Self { cells }
    }
}

impl FromIterator<usize> for WalkabilityMask {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::from_indices(iter)
    }
}

/// Counts from one post-processing pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathReport {
    /// Marked cells set to the target depth.
    pub flattened: usize,
    /// Smoothing writes applied to unmarked neighbours.
    pub smoothed: usize,
}

/// Flattens walkable cells and softens the terrain around them.
#[derive(Clone, Debug)]
pub struct PathConstraintPostProcessor {
    target: f32,
    max_radius: usize,
    window_radius: usize,
    blend: f32,
}

impl Default for PathConstraintPostProcessor {
    fn default() -> Self {
        Self {
            target: 0.0,
            max_radius: Self::MAX_RADIUS,
            window_radius: 3,
            blend: 0.5,
        }
    }
}

impl PathConstraintPostProcessor {
    /// Upper bound on the smoothing radius around one marked cell.
    pub const MAX_RADIUS: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten to `target` instead of 0.
    pub fn with_target(mut self, target: f32) -> Self {
        self.target = target;
        self
    }

    /// Apply `mask` to `map`.
    ///
    /// Marked cells are visited in ascending index order. All of them are
    /// flattened before any smoothing runs, and marked cells are never
    /// smoothed, so a second pass with the same mask leaves them unchanged.
    pub fn apply(&self, map: &mut HeightMap, mask: &WalkabilityMask) -> Result<PathReport, TerrainError> {
        mask.validate(map.width(), map.height())?;
        let mut report = PathReport::default();

        let mut radii = Vec::with_capacity(mask.len());
        for index in mask.sorted() {
            let original = map.cells()[index];
            let moved = (original - self.target).round().abs();
            // NaN saturates to 0 here.
            let radius = (moved as usize).min(self.max_radius);
            map.cells_mut()[index] = self.target;
            report.flattened += 1;
            if radius > 0 {
                radii.push((index, radius));
            }
        }

        for (index, radius) in radii {
            let (cx, cz) = map.coords(index);
            let r = radius as i64;
            for dx in -r..=r {
                for dz in -r..=r {
                    let (nx, nz) = (cx as i64 + dx, cz as i64 + dz);
                    if !map.contains(nx, nz) {
                        continue;
                    }
                    let (nx, nz) = (nx as usize, nz as usize);
                    let neighbour = map.index(nx, nz);
                    if mask.contains(neighbour) {
                        continue;
                    }
                    let current = map.get(nx, nz);
                    let mean = self.window_mean(map, nx, nz);
                    map.set(nx, nz, current + (mean - current) * self.blend);
                    report.smoothed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Mean of the in-bounds cells of the square window centred on `(x, z)`.
    fn window_mean(&self, map: &HeightMap, x: usize, z: usize) -> f32 {
        let r = self.window_radius as i64;
        let mut sum = 0.0;
        let mut count = 0u32;
        for dx in -r..=r {
            for dz in -r..=r {
                let (nx, nz) = (x as i64 + dx, z as i64 + dz);
                if map.contains(nx, nz) {
                    sum += map.get(nx as usize, nz as usize);
                    count += 1;
                }
            }
        }
        sum / count as f32
    }
}

//! Dense 2D depth grid addressed as `[x, z]`.
//!
//! Cells are stored x-major: `index(x, z) = x * height + z`, so a linear cell
//! index decodes as `x = index / height`, `z = index % height`. On square
//! maps this equals the `x * width + z` layout walkability masks are expressed
//! in; masks are refused on any other map.

use crate::error::TerrainError;

/// Smallest accepted side length. A chunk needs at least one quad.
pub const MIN_MAP_DIMENSION: usize = 2;

/// A `width × height` grid of depth values.
///
/// Dimensions are fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightMap {
    width: usize,
    height: usize,
    cells: Vec<f32>,
}

impl HeightMap {
    /// Creates a zero-filled map.
    pub fn new(width: usize, height: usize) -> Result<Self, TerrainError> {
        Self::filled(width, height, 0.0)
    }

    /// Creates a map with every cell set to `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Result<Self, TerrainError> {
        validate_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            cells: vec![value; width * height],
        })
    }

    /// Wraps an existing x-major cell buffer.
    pub fn from_cells(width: usize, height: usize, cells: Vec<f32>) -> Result<Self, TerrainError> {
        validate_dimensions(width, height)?;
        if cells.len() != width * height {
            return Err(TerrainError::InvalidDimensions {
                width,
                height,
                reason: "cell count does not match width * height",
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Wraps a buffer whose dimensions the caller has already validated.
    pub(crate) fn from_cells_unchecked(width: usize, height: usize, cells: Vec<f32>) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Self {
            width,
            height,
            cells,
        }
    }

    /// Cells along x.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Cells along z.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`; a map has at least `MIN_MAP_DIMENSION²` cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Linear index of `(x, z)`.
    #[inline]
    pub fn index(&self, x: usize, z: usize) -> usize {
        debug_assert!(x < self.width && z < self.height);
        x * self.height + z
    }

    /// Inverse of [`index`](Self::index).
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.height, index % self.height)
    }

    /// Returns `true` if the signed coordinate lies inside the grid.
    #[inline]
    pub fn contains(&self, x: i64, z: i64) -> bool {
        x >= 0 && z >= 0 && (x as usize) < self.width && (z as usize) < self.height
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.cells[self.index(x, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, z: usize, value: f32) {
        let i = self.index(x, z);
        self.cells[i] = value;
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [f32] {
        &mut self.cells
    }

    /// Mean depth, accumulated in `f64`.
    pub fn mean(&self) -> f64 {
        let sum: f64 = self.cells.iter().map(|&v| v as f64).sum();
        sum / self.cells.len() as f64
    }

    /// Smallest and largest finite cell values.
    pub fn min_max(&self) -> (f32, f32) {
        self.cells
            .iter()
            .filter(|v| v.is_finite())
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Fails on the first non-finite cell.
    pub fn ensure_finite(&self) -> Result<(), TerrainError> {
        match self.cells.iter().position(|v| !v.is_finite()) {
            Some(index) => Err(TerrainError::DivergentNoiseOutput {
                index,
                value: self.cells[index],
            }),
            None => Ok(()),
        }
    }

    /// Replaces non-finite cells with `fallback`, returning how many changed.
    ///
    /// A non-finite `fallback` is replaced by `0.0`.
    pub fn sanitize(&mut self, fallback: f32) -> usize {
        let fallback = if fallback.is_finite() { fallback } else { 0.0 };
        let mut replaced = 0;
        for v in self.cells.iter_mut().filter(|v| !v.is_finite()) {
            *v = fallback;
            replaced += 1;
        }
        replaced
    }
}

fn validate_dimensions(width: usize, height: usize) -> Result<(), TerrainError> {
    if width < MIN_MAP_DIMENSION || height < MIN_MAP_DIMENSION {
        return Err(TerrainError::InvalidDimensions {
            width,
            height,
            reason: "each side needs at least two cells",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip_non_square() {
        let map = HeightMap::new(5, 3).unwrap();
        for x in 0..5 {
            for z in 0..3 {
                let i = map.index(x, z);
                assert_eq!(map.coords(i), (x, z));
            }
        }
        assert_eq!(map.index(1, 0), 3, "x advances by one row of `height` cells");
    }

    #[test]
    fn test_degenerate_dimensions_rejected() {
        assert!(matches!(
            HeightMap::new(1, 10),
            Err(TerrainError::InvalidDimensions { .. })
        ));
        assert!(HeightMap::new(0, 0).is_err());
        assert!(HeightMap::from_cells(2, 2, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_sanitize_replaces_non_finite() {
        let mut map = HeightMap::from_cells(2, 2, vec![1.0, f32::NAN, f32::INFINITY, 4.0]).unwrap();
        assert!(matches!(
            map.ensure_finite(),
            Err(TerrainError::DivergentNoiseOutput { index: 1, .. })
        ));
        assert_eq!(map.sanitize(-1.0), 2);
        assert_eq!(map.cells(), &[1.0, -1.0, -1.0, 4.0]);
        assert!(map.ensure_finite().is_ok());
    }

    #[test]
    fn test_sanitize_never_writes_non_finite_fallback() {
        let mut map = HeightMap::from_cells(2, 2, vec![f32::NAN, 2.0, 3.0, f32::NEG_INFINITY]).unwrap();
        assert_eq!(map.sanitize(f32::NAN), 2);
        assert_eq!(map.cells(), &[0.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_min_max_and_mean() {
        let map = HeightMap::from_cells(2, 2, vec![1.0, 2.0, 3.0, 6.0]).unwrap();
        assert_eq!(map.min_max(), (1.0, 6.0));
        assert!((map.mean() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_contains_signed() {
        let map = HeightMap::new(4, 4).unwrap();
        assert!(map.contains(0, 3));
        assert!(!map.contains(-1, 0));
        assert!(!map.contains(4, 0));
    }
}

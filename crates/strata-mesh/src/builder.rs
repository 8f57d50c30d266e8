//! Grid triangulation of a height map at a chosen level of detail.

use glam::{Vec2, Vec3, Vec4};
use strata_config::MAX_LEVEL_OF_DETAIL;
use strata_terrain::{HeightMap, TerrainError};
use tracing::trace;

use crate::gradient::ColorGradient;
use crate::mesh_data::MeshData;

/// Sample stride for a level of detail: 1 at LOD 0, `2 * lod` otherwise.
pub fn lod_increment(lod: u8) -> usize {
    if lod == 0 { 1 } else { lod as usize * 2 }
}

/// Grid coordinates sampled along an axis of `len` cells.
///
/// Walks `0, step, 2·step, …` and always ends on `len - 1`, so the chunk's
/// border row is kept at every level of detail.
pub fn sample_positions(len: usize, step: usize) -> Vec<usize> {
    let last = len.saturating_sub(1);
    let mut positions: Vec<usize> = (0..len).step_by(step.max(1)).collect();
    if positions.last() != Some(&last) {
        positions.push(last);
    }
    positions
}

/// Turns height maps into [`MeshData`].
///
/// The mesh is centred on the origin in x and z. Grid `x` maps to world `+x`
/// and grid `z` to world `-z`, matching the chunk lattice layout.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeshBuilder {
    lod: u8,
}

impl MeshBuilder {
    pub fn new(lod: u8) -> Result<Self, TerrainError> {
        if lod > MAX_LEVEL_OF_DETAIL {
            return Err(TerrainError::InvalidLevelOfDetail {
                lod,
                max: MAX_LEVEL_OF_DETAIL,
            });
        }
        Ok(Self { lod })
    }

    pub fn level_of_detail(&self) -> u8 {
        self.lod
    }

    /// Triangulate `map`, colouring vertices from `gradient` when given.
    ///
    /// Colours sample the gradient at the vertex height normalized by this
    /// mesh's own height range.
    pub fn build(&self, map: &HeightMap, gradient: Option<&ColorGradient>) -> Result<MeshData, TerrainError> {
        map.ensure_finite()?;

        let (width, height) = (map.width(), map.height());
        let step = lod_increment(self.lod);
        let xs = sample_positions(width, step);
        let zs = sample_positions(height, step);
        let (vw, vh) = (xs.len(), zs.len());

        let top_left_x = (width - 1) as f32 / -2.0;
        let top_left_z = (height - 1) as f32 / 2.0;
        let (span_x, span_z) = ((width - 1) as f32, (height - 1) as f32);

        let mut mesh = MeshData::with_capacity(vw * vh, (vw - 1) * (vh - 1) * 6);
        for &z in &zs {
            for &x in &xs {
                mesh.vertices
                    .push(Vec3::new(top_left_x + x as f32, map.get(x, z), top_left_z - z as f32));
                mesh.uvs.push(Vec2::new(x as f32 / span_x, z as f32 / span_z));
            }
        }

        for row in 0..vh - 1 {
            for col in 0..vw - 1 {
                let i = (row * vw + col) as u32;
                let below = i + vw as u32;
                mesh.triangles.extend_from_slice(&[i, below + 1, below, below + 1, i, i + 1]);
            }
        }

        if let Some(gradient) = gradient.filter(|g| !g.is_empty()) {
            mesh.colors = Some(vertex_colors(&mesh, gradient));
        }
        mesh.recalculate_normals();

        trace!(
            lod = self.lod,
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "built mesh"
        );
        Ok(mesh)
    }
}

fn vertex_colors(mesh: &MeshData, gradient: &ColorGradient) -> Vec<Vec4> {
    let (lo, hi) = mesh.height_range().unwrap_or((0.0, 0.0));
    let range = hi - lo;
    mesh.vertices
        .iter()
        .map(|v| {
            let t = if range > 0.0 { (v.y - lo) / range } else { 0.0 };
            gradient.evaluate(t)
        })
        .collect()
}

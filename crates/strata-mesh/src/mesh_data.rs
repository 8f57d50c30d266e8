//! Renderable surface produced from a height map.

use glam::{Vec2, Vec3, Vec4};

/// Which surface a mesh represents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MeshKind {
    #[default]
    Terrain,
    /// Flat plane at the configured water level.
    Water,
}

/// Vertex and index buffers for one chunk surface.
///
/// `triangles` holds three vertex indices per triangle. `uvs` and `normals`
/// run parallel to `vertices`; `colors` does too when present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<u32>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub colors: Option<Vec<Vec4>>,
}

impl MeshData {
    /// Creates a mesh with room for `vertex_count` vertices and `index_count` indices.
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(index_count),
            uvs: Vec::with_capacity(vertex_count),
            normals: Vec::new(),
            colors: None,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles, not indices.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Smallest and largest vertex height.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        let mut iter = self.vertices.iter().map(|v| v.y);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }

    /// Rebuild per-vertex normals from the triangles.
    ///
    /// Each face contributes its unnormalized cross product, so larger faces
    /// weigh more. Vertices touched by no face get `+Y`.
    pub fn recalculate_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.triangles.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let (pa, pb, pc) = (self.vertices[a], self.vertices[b], self.vertices[c]);
            let face = (pb - pa).cross(pc - pa);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        for n in &mut normals {
            *n = n.try_normalize().unwrap_or(Vec3::Y);
        }
        self.normals = normals;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshData {
        MeshData {
            vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
            ],
            triangles: vec![0, 3, 2, 3, 0, 1],
            ..Default::default()
        }
    }

    #[test]
    fn test_flat_quad_normals_point_up() {
        let mut mesh = quad();
        mesh.recalculate_normals();
        assert_eq!(mesh.normals.len(), 4);
        for n in &mesh.normals {
            assert!((*n - Vec3::Y).length() < 1e-6, "expected +Y, got {n}");
        }
    }

    #[test]
    fn test_unreferenced_vertex_defaults_up() {
        let mut mesh = quad();
        mesh.vertices.push(Vec3::new(5.0, 5.0, 5.0));
        mesh.recalculate_normals();
        assert_eq!(mesh.normals[4], Vec3::Y);
    }

    #[test]
    fn test_counts_and_range() {
        let mut mesh = quad();
        mesh.vertices[1].y = 3.0;
        mesh.vertices[2].y = -1.0;
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.height_range(), Some((-1.0, 3.0)));
        assert_eq!(MeshData::default().height_range(), None);
    }
}

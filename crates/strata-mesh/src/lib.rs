//! Height-map meshing: level-of-detail grid triangulation, normals and
//! depth-gradient vertex colours.

mod builder;
mod gradient;
mod mesh_data;

pub use builder::{MeshBuilder, lod_increment, sample_positions};
pub use gradient::ColorGradient;
pub use mesh_data::{MeshData, MeshKind};

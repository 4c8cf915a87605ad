//! Mesh data for tweak.
//!
//! Provides the vertex buffers an editing session works on and everything
//! needed to get data in and out of them:
//!
//! - [`MeshBuffers`] - positions, normals, tangents, UVs, indices and a transform
//! - [`extract`] - builds buffers from a [`MeshSource`] (asset, scene object or terrain)
//! - [`MeshAsset`] - host-side mesh with stored [`BlendShape`] frames
//! - [`Topology`] - welded adjacency, boundary edges and loops, flood fill
//! - [`export_obj`] - Wavefront OBJ export

mod asset;
mod buffers;
mod error;
mod obj;
mod source;
mod tangents;
mod terrain;
mod topology;

pub use asset::{BlendShape, BlendShapeFrame, MeshAsset};
pub use buffers::{MeshBuffers, MeshBuilder, smooth_normals, valid_triangles};
pub use error::{MeshError, Result};
pub use obj::{ObjExportOptions, export_obj, write_obj};
pub use source::{MeshSource, Renderer, SceneObject, extract};
pub use tangents::compute_tangents;
pub use terrain::Heightfield;
pub use topology::Topology;

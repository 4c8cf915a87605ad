//! Blend-shape assembly for tweak.
//!
//! Shapes are described by [`BlendShapeData`]: a name and weighted frames,
//! each pointing at a target mesh that has the base's vertex layout, or at a
//! surface the base is projected onto. [`BlendShapeAssembler`] turns them into
//! per-vertex deltas and writes them as blend-shape frames on a copy of the
//! base mesh.
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use rhizome_tweak_blendshape::{BlendShapeBuilderData, BlendShapeData, BlendShapeFrameData};
//! use rhizome_tweak_mesh::{MeshAsset, MeshBuffers, MeshSource};
//!
//! let base = MeshBuffers::from_positions(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]);
//! let mut target = base.clone();
//! target.positions[2] = Vec3::new(0.0, 2.0, 0.0);
//!
//! let target = MeshSource::Asset(MeshAsset::new("tall", target));
//! let data = BlendShapeBuilderData::new(MeshSource::Asset(MeshAsset::new("base", base)))
//!     .with_shape(BlendShapeData::new("tall").with_frame(BlendShapeFrameData::new(target)));
//!
//! let report = data.build().unwrap();
//! assert_eq!(report.frames_added, 1);
//! assert_eq!(report.mesh.blend_shape("tall").unwrap().frames[0].delta_positions[2], Vec3::Y);
//! ```

mod assembler;
mod data;
mod delta;
mod error;

pub use assembler::{
    BlendShapeAssembler, BuildReport, SkippedFrame, find_valid_targets, generate_projected_target,
};
pub use data::{BlendShapeBuilderData, BlendShapeData, BlendShapeFrameData, MAX_FRAME_WEIGHT};
pub use delta::{FrameDeltas, delta, frame_deltas};
pub use error::{BuildError, FrameError, Result};

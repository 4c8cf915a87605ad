//! Interactive vertex editing for tweak.
//!
//! Builds on the mesh, rig and spatial crates to provide:
//!
//! - Soft selection ([`SelectionMask`]) and picking queries in [`query`]
//! - Weighted transforms ([`Move`], [`RotatePivot`], [`Scale`], [`Assign`])
//! - Brush strokes and soft edits ([`Brush`])
//! - Projection onto another mesh ([`project_vertices`])
//! - Mirroring across a symmetry plane ([`MirrorRelation`])
//! - Edit sessions tying it together ([`EditSession`])
//!
//! # Example
//!
//! ```
//! use rhizome_tweak_edit::{EditSession, TweakSettings};
//! use rhizome_tweak_mesh::MeshBuilder;
//! use glam::Vec3;
//!
//! let mut builder = MeshBuilder::new();
//! let a = builder.vertex(Vec3::ZERO);
//! let b = builder.vertex(Vec3::X);
//! let c = builder.vertex(Vec3::Z);
//! builder.triangle(a, c, b);
//!
//! let mut session = EditSession::begin(builder.build(), None, TweakSettings::default()).unwrap();
//! session.move_vertices(Vec3::Y);
//! let mesh = session.end();
//! assert!((mesh.positions[1] - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-4);
//! ```

mod brush;
mod error;
mod mirror;
mod projection;
pub mod query;
mod selection;
mod session;
mod settings;
mod space;
mod transform;

pub use brush::{Brush, brush_reset, brush_smooth};
pub use error::{EditError, MirrorError, Result};
pub use mirror::{
    DEFAULT_MIRROR_EPSILON, MirrorRelation, MirrorSide, apply_mirroring, build_relation, reflect,
};
pub use projection::{
    DEFAULT_MAX_DISTANCE, FRAME_MAX_DISTANCE, Projected, ProjectionSettings, project_vertices,
};
pub use query::{PickContext, RayHit, pick_normal, pick_vertex, raycast};
pub use selection::{SelectionMask, SelectionSummary, look_rotation};
pub use session::{Dirty, EditSession};
pub use settings::{BRUSH_SLOTS, EditMode, SELECTION_SETS, SelectMode, TweakSettings};
pub use space::{SkinnedVertices, VertexSpace};
pub use transform::{
    Assign, Move, Pivot, RotatePivot, Scale, TransformOp, assign_vertices, move_vertices,
    reset_vertices, rotate_pivot_vertices, scale_vertices, smooth_vertices,
};

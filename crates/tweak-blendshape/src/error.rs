//! Error types for blend-shape assembly.

use rhizome_tweak_mesh::MeshError;
use thiserror::Error;

/// Result alias for builds.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Conditions that abort a whole build.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    /// No base mesh was given.
    #[error("base mesh is not set")]
    BaseMissing,

    /// The base has no readable mesh.
    #[error("base mesh has no valid mesh: {0}")]
    BaseUnreadable(#[from] MeshError),
}

/// Why a single frame was skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    /// The frame references no target.
    #[error("frame has no target")]
    MissingTarget,

    /// The target does not have the base's vertex count.
    #[error("target has {got} vertices, base has {expected}")]
    VertexCountMismatch {
        /// Base vertex count.
        expected: usize,
        /// Target vertex count.
        got: usize,
    },

    /// The target could not be extracted.
    #[error("target: {0}")]
    Extract(#[from] MeshError),

    /// The output mesh rejected the frame.
    #[error("frame could not be written: {0}")]
    Write(MeshError),
}

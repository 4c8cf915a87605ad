//! Error types for editing.

use rhizome_tweak_mesh::MeshError;
use thiserror::Error;

/// Result alias for editing operations.
pub type Result<T> = std::result::Result<T, EditError>;

/// The mesh is not symmetric enough to pair vertices across the mirror plane.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MirrorError {
    /// A vertex had zero or several mirror candidates.
    #[error("vertex {vertex} has {candidates} mirror candidates, expected exactly one")]
    NotSymmetric {
        /// First vertex that could not be paired.
        vertex: usize,
        /// Number of candidates found.
        candidates: usize,
    },
    /// The mirror mode has no plane.
    #[error("mirroring is disabled")]
    Disabled,
}

/// Errors raised by editing sessions.
#[derive(Debug, Error)]
pub enum EditError {
    /// Mesh input is unusable.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// Two buffers that must describe the same mesh do not.
    #[error("expected {expected} vertices, got {got}")]
    VertexCountMismatch {
        /// Vertex count of the session.
        expected: usize,
        /// Vertex count provided.
        got: usize,
    },

    /// Skin influences do not cover the mesh.
    #[error("skin has influences for {skin} vertices, mesh has {mesh}")]
    SkinMismatch {
        /// Vertices covered by the skin.
        skin: usize,
        /// Vertices in the mesh.
        mesh: usize,
    },

    /// Settings file could not be read or written.
    #[cfg(feature = "serde")]
    #[error("settings: {0}")]
    Settings(#[from] serde_json::Error),
}

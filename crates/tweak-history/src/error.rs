//! History error types.

use thiserror::Error;

/// Reasons an undo or redo could not be performed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// The undo stack is empty.
    #[error("nothing to undo")]
    NothingToUndo,

    /// The redo stack is empty.
    #[error("nothing to redo")]
    NothingToRedo,

    /// The stored snapshot belongs to a mesh with a different vertex count.
    #[error("snapshot has {stored} vertices, current state has {current}")]
    VertexCountMismatch {
        /// Vertex count of the stored snapshot.
        stored: usize,
        /// Vertex count of the state being swapped in.
        current: usize,
    },
}

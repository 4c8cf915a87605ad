//! Undo/redo history for vertex edits.
//!
//! Editing operations report their state *before* mutating through the
//! [`Checkpoint`] trait. [`SnapshotHistory`] is the stock implementation; a
//! host with its own undo system can implement [`Checkpoint`] directly.

mod error;
mod snapshot;

pub use error::HistoryError;
pub use snapshot::{Checkpoint, DEFAULT_HISTORY_LIMIT, SnapshotHistory, VertexSnapshot};

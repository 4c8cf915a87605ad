//! Vertex snapshots and the stack-pair history that swaps them.

use std::collections::VecDeque;

use glam::{Vec3, Vec4};

use crate::error::HistoryError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of undo steps kept by [`SnapshotHistory`].
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Predeformed vertex attributes at one point in time.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VertexSnapshot {
    /// Operation that was about to run.
    pub label: String,
    /// Positions.
    pub positions: Vec<Vec3>,
    /// Normals.
    pub normals: Vec<Vec3>,
    /// Tangents.
    pub tangents: Vec<Vec4>,
}

impl VertexSnapshot {
    /// Captures attribute copies.
    pub fn capture(
        label: impl Into<String>,
        positions: &[Vec3],
        normals: &[Vec3],
        tangents: &[Vec4],
    ) -> Self {
        Self {
            label: label.into(),
            positions: positions.to_vec(),
            normals: normals.to_vec(),
            tangents: tangents.to_vec(),
        }
    }

    /// Returns the vertex count.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Takes over `stored`'s label after checking both describe the same mesh.
    fn relabel_from(mut self, stored: &VertexSnapshot) -> Result<Self, HistoryError> {
        if stored.vertex_count() != self.vertex_count() {
            return Err(HistoryError::VertexCountMismatch {
                stored: stored.vertex_count(),
                current: self.vertex_count(),
            });
        }
        self.label.clone_from(&stored.label);
        Ok(self)
    }
}

/// Receives the pre-mutation state of every editing operation.
pub trait Checkpoint {
    /// Called once before an operation writes to the vertex buffers.
    fn before_mutate(&mut self, snapshot: VertexSnapshot);
}

impl<F: FnMut(VertexSnapshot)> Checkpoint for F {
    fn before_mutate(&mut self, snapshot: VertexSnapshot) {
        self(snapshot)
    }
}

/// Undo/redo over whole vertex snapshots.
///
/// The undo stack holds pre-edit states. Undoing hands back the top entry and
/// parks the caller's live state on the redo stack under the same label, and
/// redo does the reverse. Recording a new edit drops the redo stack.
///
/// # Example
///
/// ```
/// use rhizome_tweak_history::{Checkpoint, SnapshotHistory, VertexSnapshot};
/// use glam::Vec3;
///
/// let mut history = SnapshotHistory::default();
/// history.before_mutate(VertexSnapshot::capture("move", &[Vec3::ZERO], &[], &[]));
///
/// let live = VertexSnapshot::capture("", &[Vec3::X], &[], &[]);
/// let restored = history.undo(live).unwrap();
/// assert_eq!(restored.positions[0], Vec3::ZERO);
/// assert_eq!(history.redo_label(), Some("move"));
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    undo: VecDeque<VertexSnapshot>,
    redo: Vec<VertexSnapshot>,
    /// Maximum undo depth; 0 keeps everything.
    limit: usize,
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl SnapshotHistory {
    /// Creates a history keeping at most `limit` undo steps (0 = unlimited).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
        }
    }

    /// Creates a history that never drops old steps.
    pub fn unlimited() -> Self {
        Self::with_limit(0)
    }

    /// Maximum undo depth; 0 means unlimited.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Pushes the state from before an edit and forgets anything redoable.
    pub fn record(&mut self, snapshot: VertexSnapshot) {
        self.redo.clear();
        self.undo.push_back(snapshot);
        if self.limit > 0 {
            while self.undo.len() > self.limit {
                self.undo.pop_front();
            }
        }
    }

    /// Reverts the last edit.
    ///
    /// `current` is the live state; it is kept for redo and the pre-edit state
    /// is returned. On a vertex-count mismatch nothing moves.
    pub fn undo(&mut self, current: VertexSnapshot) -> Result<VertexSnapshot, HistoryError> {
        let stored = self.undo.back().ok_or(HistoryError::NothingToUndo)?;
        let parked = current.relabel_from(stored)?;
        let restored = self.undo.pop_back().ok_or(HistoryError::NothingToUndo)?;
        self.redo.push(parked);
        Ok(restored)
    }

    /// Reapplies the last undone edit, keeping `current` for a later undo.
    pub fn redo(&mut self, current: VertexSnapshot) -> Result<VertexSnapshot, HistoryError> {
        let stored = self.redo.last().ok_or(HistoryError::NothingToRedo)?;
        let parked = current.relabel_from(stored)?;
        let restored = self.redo.pop().ok_or(HistoryError::NothingToRedo)?;
        self.undo.push_back(parked);
        Ok(restored)
    }

    /// Returns true if undo is possible.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Returns true if redo is possible.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Label of the edit undo would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo.back().map(|s| s.label.as_str())
    }

    /// Label of the edit redo would reapply.
    pub fn redo_label(&self) -> Option<&str> {
        self.redo.last().map(|s| s.label.as_str())
    }

    /// Number of undo steps available.
    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo steps available.
    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }

    /// Total stored snapshots on both stacks.
    pub fn len(&self) -> usize {
        self.undo.len() + self.redo.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every stored snapshot.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Checkpoint for SnapshotHistory {
    fn before_mutate(&mut self, snapshot: VertexSnapshot) {
        self.record(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(label: &str, x: f32) -> VertexSnapshot {
        VertexSnapshot::capture(label, &[Vec3::new(x, 0.0, 0.0)], &[Vec3::Y], &[Vec4::X])
    }

    #[test]
    fn test_undo_redo() {
        let mut history = SnapshotHistory::default();
        assert!(!history.can_undo());

        // Edits: 0 -> 1 -> 2
        history.record(state("a", 0.0));
        history.record(state("b", 1.0));
        assert_eq!(history.undo_count(), 2);
        assert_eq!(history.undo_label(), Some("b"));

        let s = history.undo(state("", 2.0)).unwrap();
        assert_eq!(s.positions[0].x, 1.0);
        let s = history.undo(s).unwrap();
        assert_eq!(s.positions[0].x, 0.0);
        assert_eq!(history.undo(s.clone()), Err(HistoryError::NothingToUndo));

        assert_eq!(history.redo_count(), 2);
        assert_eq!(history.redo_label(), Some("a"));
        let s = history.redo(s).unwrap();
        assert_eq!(s.positions[0].x, 1.0);
        let s = history.redo(s).unwrap();
        assert_eq!(s.positions[0].x, 2.0);
        assert_eq!(history.redo(s), Err(HistoryError::NothingToRedo));
        assert_eq!(history.undo_label(), Some("b"));
    }

    #[test]
    fn test_record_drops_redo() {
        let mut history = SnapshotHistory::default();
        history.record(state("a", 0.0));
        history.record(state("b", 1.0));
        let s = history.undo(state("", 2.0)).unwrap();
        assert!(history.can_redo());

        history.record(s);
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = SnapshotHistory::with_limit(3);
        for i in 0..5 {
            history.record(state("x", i as f32));
        }
        assert_eq!(history.undo_count(), 3);

        let s = history.undo(state("", 5.0)).unwrap();
        let s = history.undo(s).unwrap();
        let s = history.undo(s).unwrap();
        assert_eq!(s.positions[0].x, 2.0);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_unlimited_keeps_everything() {
        let mut history = SnapshotHistory::unlimited();
        for i in 0..250 {
            history.record(state("x", i as f32));
        }
        assert_eq!(history.undo_count(), 250);
        assert_eq!(SnapshotHistory::default().limit(), DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn test_vertex_count_mismatch_keeps_stacks() {
        let mut history = SnapshotHistory::default();
        history.record(state("a", 0.0));
        let wrong = VertexSnapshot::capture("", &[Vec3::ZERO, Vec3::X], &[], &[]);
        assert_eq!(
            history.undo(wrong),
            Err(HistoryError::VertexCountMismatch {
                stored: 1,
                current: 2
            })
        );
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_closure_checkpoint() {
        let mut seen = Vec::new();
        {
            let mut hook = |s: VertexSnapshot| seen.push(s.label);
            hook.before_mutate(state("move", 0.0));
        }
        assert_eq!(seen, vec!["move".to_string()]);
    }

    #[test]
    fn test_clear() {
        let mut history = SnapshotHistory::default();
        history.record(state("a", 0.0));
        history.undo(state("", 1.0)).unwrap();
        history.clear();
        assert!(history.is_empty());
    }
}

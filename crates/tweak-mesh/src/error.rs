//! Error types for mesh data.

use thiserror::Error;

/// Result alias for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors raised when mesh input is unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    /// The mesh exists but its vertex data cannot be read back.
    #[error("mesh is not readable")]
    NotReadable,

    /// The source object carries no mesh or renderer.
    #[error("source has no mesh")]
    NoMesh,

    /// A per-vertex attribute has the wrong length.
    #[error("{attribute} has {got} entries, expected {expected}")]
    AttributeLength {
        /// Attribute name.
        attribute: &'static str,
        /// Vertex count.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// The index buffer is not a triangle list.
    #[error("index count {0} is not a multiple of 3")]
    PartialTriangle(usize),

    /// A triangle references a vertex that does not exist.
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index value.
        index: u32,
        /// Vertex count.
        vertex_count: usize,
    },

    /// Blend-shape frame weights must increase within a shape.
    #[error("frame weight {weight} of blend shape '{shape}' is not above the previous frame")]
    FrameWeightOrder {
        /// Blend-shape name.
        shape: String,
        /// Rejected frame weight.
        weight: f32,
    },

    /// Heightfield data does not match its dimensions.
    #[error("heightfield of {width}x{depth} samples got {got} heights")]
    InvalidHeightfield {
        /// Width in samples.
        width: usize,
        /// Depth in samples.
        depth: usize,
        /// Number of samples provided.
        got: usize,
    },
}

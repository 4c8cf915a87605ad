//! Core types and traits for tweak.
//!
//! This crate provides the foundational types shared by the tweak crates:
//!
//! - Vertex channel access ([`VertexChannels`], [`VertexChannelsMut`])
//! - Option enums recognized by every editing operation ([`CoordinateSpace`],
//!   [`MirrorMode`], [`ProjectionRayDirection`], [`ProjectionMode`], ...)
//! - Small bitmask-like structs ([`AttributeMask`], [`AxisMask`])

mod attributes;
mod options;

pub use attributes::{VertexChannel, VertexChannels, VertexChannelsMut};
pub use glam;
pub use options::{
    AttributeMask, AxisMask, CoordinateSpace, MirrorMode, ProjectionMode, ProjectionRayDirection,
    RecalculateMode, TangentPrecision,
};

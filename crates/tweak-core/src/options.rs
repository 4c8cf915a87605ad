//! Option types recognized by the editing operations.

use glam::Vec3;

use crate::attributes::VertexChannel;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coordinate space in which an edit amount or pivot is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoordinateSpace {
    /// World space (the mesh transform is applied).
    #[default]
    World,
    /// Mesh-local space.
    Local,
    /// Space of the current pivot (position and rotation).
    Pivot,
}

/// Symmetry direction for mirroring.
///
/// Each variant names the authoritative side first: `RightToLeft` copies the
/// `+X` half onto the `-X` half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MirrorMode {
    /// Mirroring disabled.
    #[default]
    None,
    /// `+X` → `-X`.
    RightToLeft,
    /// `-X` → `+X`.
    LeftToRight,
    /// `+Z` → `-Z`.
    ForwardToBack,
    /// `-Z` → `+Z`.
    BackToForward,
    /// `+Y` → `-Y`.
    UpToDown,
    /// `-Y` → `+Y`.
    DownToUp,
}

impl MirrorMode {
    /// Returns the normal of the mirror plane through the origin.
    ///
    /// The normal points toward the destination half, so vertices with a
    /// positive signed distance are the ones that get overwritten.
    pub fn plane_normal(self) -> Option<Vec3> {
        match self {
            MirrorMode::None => None,
            MirrorMode::RightToLeft => Some(Vec3::NEG_X),
            MirrorMode::LeftToRight => Some(Vec3::X),
            MirrorMode::ForwardToBack => Some(Vec3::NEG_Z),
            MirrorMode::BackToForward => Some(Vec3::Z),
            MirrorMode::UpToDown => Some(Vec3::NEG_Y),
            MirrorMode::DownToUp => Some(Vec3::Y),
        }
    }

    /// Returns true if mirroring is active.
    pub fn is_enabled(self) -> bool {
        self != MirrorMode::None
    }
}

/// Source of the ray direction used by projection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProjectionRayDirection {
    /// Per-vertex current normal.
    #[default]
    CurrentNormals,
    /// Per-vertex normal of the undeformed base mesh.
    BaseNormals,
    /// Away from a center point: `normalize(position - center)`.
    Radial {
        /// Center in world space.
        center: Vec3,
    },
    /// One fixed world-space direction for every vertex.
    Directional {
        /// Ray direction in world space.
        direction: Vec3,
    },
}

/// Which ray senses projection tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProjectionMode {
    /// Only along `+direction`.
    Forward,
    /// Only along `-direction`.
    Backward,
    /// Both senses; the closer hit wins and ties go to the forward hit.
    #[default]
    ForwardAndBackward,
}

/// Tangent generation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TangentPrecision {
    /// Area-weighted UV gradients.
    #[default]
    Fast,
    /// Angle-weighted UV gradients with separate bitangent accumulation.
    Precise,
}

/// When derived attributes (normals, tangents) are recomputed after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RecalculateMode {
    /// Only when explicitly requested.
    Manual,
    /// When an edit is committed.
    #[default]
    Auto,
    /// After every mutation.
    Realtime,
}

/// Selects which vertex attributes an operation reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AttributeMask {
    /// Positions.
    pub vertex: bool,
    /// Normals.
    pub normal: bool,
    /// Tangents.
    pub tangent: bool,
}

impl Default for AttributeMask {
    fn default() -> Self {
        Self::all()
    }
}

impl AttributeMask {
    /// Bit for positions in [`AttributeMask::bits`].
    pub const VERTEX: u8 = 1;
    /// Bit for normals in [`AttributeMask::bits`].
    pub const NORMAL: u8 = 2;
    /// Bit for tangents in [`AttributeMask::bits`].
    pub const TANGENT: u8 = 4;

    /// All attributes enabled.
    pub fn all() -> Self {
        Self {
            vertex: true,
            normal: true,
            tangent: true,
        }
    }

    /// No attributes enabled.
    pub fn none() -> Self {
        Self {
            vertex: false,
            normal: false,
            tangent: false,
        }
    }

    /// Only positions enabled.
    pub fn positions_only() -> Self {
        Self {
            vertex: true,
            ..Self::none()
        }
    }

    /// Builds a mask from `VERTEX | NORMAL | TANGENT` bits.
    pub fn from_bits(bits: u8) -> Self {
        Self {
            vertex: bits & Self::VERTEX != 0,
            normal: bits & Self::NORMAL != 0,
            tangent: bits & Self::TANGENT != 0,
        }
    }

    /// Packs the mask into `VERTEX | NORMAL | TANGENT` bits.
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.vertex {
            bits |= Self::VERTEX;
        }
        if self.normal {
            bits |= Self::NORMAL;
        }
        if self.tangent {
            bits |= Self::TANGENT;
        }
        bits
    }

    /// Returns true if no attribute is enabled.
    pub fn is_empty(&self) -> bool {
        self.bits() == 0
    }

    /// Returns true if `channel` is enabled.
    pub fn contains(&self, channel: VertexChannel) -> bool {
        match channel {
            VertexChannel::Position => self.vertex,
            VertexChannel::Normal => self.normal,
            VertexChannel::Tangent => self.tangent,
        }
    }
}

/// Per-axis toggle used by assignment operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisMask {
    /// X axis.
    pub x: bool,
    /// Y axis.
    pub y: bool,
    /// Z axis.
    pub z: bool,
}

impl Default for AxisMask {
    fn default() -> Self {
        Self::all()
    }
}

impl AxisMask {
    /// All axes enabled.
    pub fn all() -> Self {
        Self {
            x: true,
            y: true,
            z: true,
        }
    }

    /// Creates a mask from three toggles.
    pub fn new(x: bool, y: bool, z: bool) -> Self {
        Self { x, y, z }
    }

    /// Blends the masked axes of `current` toward `value` by `t`.
    ///
    /// Unmasked axes keep their current value.
    pub fn blend(&self, current: Vec3, value: Vec3, t: f32) -> Vec3 {
        let pick = |enabled: bool, a: f32, b: f32| if enabled { a + (b - a) * t } else { a };
        Vec3::new(
            pick(self.x, current.x, value.x),
            pick(self.y, current.y, value.y),
            pick(self.z, current.z, value.z),
        )
    }
}

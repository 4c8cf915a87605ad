//! Interpolation and falloff shapes for soft edits.
//!
//! - [`Lerp`] blends edit amounts by selection weight (quaternions slerp).
//! - [`Easing`] names the standard brush profiles.
//! - [`FalloffCurve`] is a pre-sampled curve mapping normalized brush
//!   distance to a weight.
//!
//! # Lerp Trait
//!
//! ```
//! use rhizome_tweak_easing::Lerp;
//! use glam::Vec3;
//!
//! let half = Vec3::ZERO.lerp_to(&Vec3::ONE, 0.5);
//! assert!((half - Vec3::splat(0.5)).length() < 0.001);
//! ```

use glam::{Quat, Vec3, Vec4};

mod falloff;

pub use falloff::{FALLOFF_SAMPLES, FalloffCurve};

// ============================================================================
// Lerp Trait
// ============================================================================

/// Types that can be blended by a weight.
pub trait Lerp {
    /// Interpolates from `self` (`t = 0`) to `other` (`t = 1`).
    /// Values outside `[0, 1]` extrapolate.
    fn lerp_to(&self, other: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp_to(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Vec3 {
    #[inline]
    fn lerp_to(&self, other: &Self, t: f32) -> Self {
        self.lerp(*other, t)
    }
}

impl Lerp for Vec4 {
    #[inline]
    fn lerp_to(&self, other: &Self, t: f32) -> Self {
        self.lerp(*other, t)
    }
}

impl Lerp for Quat {
    /// Spherical interpolation, so partial weights rotate by a partial angle.
    #[inline]
    fn lerp_to(&self, other: &Self, t: f32) -> Self {
        self.slerp(*other, t)
    }
}

// ============================================================================
// Brush profiles
// ============================================================================

/// Standard brush profiles, as rising curves over `t` in `[0, 1]`.
///
/// A falloff built from a profile is `1 - ease(t)`, so `t` is the normalized
/// distance from the brush center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Easing {
    /// Straight line.
    #[default]
    Linear,
    /// Cubic Hermite; soft at both center and rim.
    Smooth,
    /// Quadratic ease in; wide plateau, steep rim.
    Sharp,
    /// Square-root; narrow peak, long tail.
    Root,
    /// Quarter circle; holds near the center, drops at the rim.
    Sphere,
}

impl Easing {
    /// Evaluates the profile at `t`, clamped to `[0, 1]`.
    pub fn ease(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::Smooth => t * t * (3.0 - 2.0 * t),
            Easing::Sharp => t * t,
            Easing::Root => t.sqrt(),
            Easing::Sphere => 1.0 - (1.0 - t * t).sqrt(),
        }
    }
}

//! Brush strokes and soft (brush-weighted) edits.

use glam::Vec3;
use rhizome_tweak_easing::{Easing, FalloffCurve};
use rhizome_tweak_mesh::{MeshBuffers, Topology};

use crate::query::select_brush;
use crate::selection::SelectionMask;
use crate::transform::{reset_vertices, smooth_vertices};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A round brush with a falloff curve.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Brush {
    /// World-space radius.
    pub radius: f32,
    /// Peak weight at the center. Negative values deselect.
    pub strength: f32,
    /// Upper bound for `radius`.
    pub max_radius: f32,
    /// Weight over normalized distance from the center.
    pub curve: FalloffCurve,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            radius: 0.2,
            strength: 0.2,
            max_radius: 3.0,
            curve: FalloffCurve::linear(),
        }
    }
}

impl Brush {
    /// Creates a brush with a linear falloff.
    pub fn new(radius: f32, strength: f32) -> Self {
        Self {
            radius,
            strength,
            ..Self::default()
        }
    }

    /// Replaces the falloff curve.
    pub fn with_curve(mut self, curve: FalloffCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Uses one of the standard brush profiles as the falloff.
    pub fn with_profile(self, profile: Easing) -> Self {
        self.with_curve(FalloffCurve::from_easing(profile))
    }

    /// Sets the radius, clamped to `0..=max_radius`.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.clamp(0.0, self.max_radius);
    }

    /// Weight at world-space distance `d` from the center.
    pub fn weight_at(&self, distance: f32) -> f32 {
        if self.radius <= 0.0 || distance > self.radius {
            return 0.0;
        }
        self.strength * self.curve.sample(distance / self.radius)
    }

    /// Builds a transient selection around `center` for soft operations.
    ///
    /// `positions` must be in world space.
    pub fn mask_at(&self, positions: &[Vec3], center: Vec3) -> SelectionMask {
        SelectionMask::from_weights(positions.iter().map(|p| self.weight_at(p.distance(center))))
    }

    /// Applies this brush as a selection stroke.
    pub fn select(&self, mesh: &MeshBuffers, mask: &mut SelectionMask, center: Vec3) -> usize {
        select_brush(mesh, mask, center, self.radius, self.strength, &self.curve)
    }
}

/// Smooths vertices under the brush.
///
/// The brush is placed against `world_positions`, one per vertex of `mesh`.
/// For a posed mesh these are the displayed positions while `mesh` holds
/// the bind-pose data being edited.
pub fn brush_smooth(
    mesh: &mut MeshBuffers,
    topology: &Topology,
    brush: &Brush,
    world_positions: &[Vec3],
    center: Vec3,
) -> usize {
    let mask = brush.mask_at(world_positions, center);
    if !mask.any_selected() {
        return 0;
    }
    smooth_vertices(mesh, topology, Some(&mask), 1.0)
}

/// Pulls vertices under the brush back toward the base mesh.
///
/// `world_positions` locate the vertices as in [`brush_smooth`].
pub fn brush_reset(
    mesh: &mut MeshBuffers,
    base: &MeshBuffers,
    brush: &Brush,
    world_positions: &[Vec3],
    center: Vec3,
) -> usize {
    let mask = brush.mask_at(world_positions, center);
    if !mask.any_selected() {
        return 0;
    }
    reset_vertices(mesh, base, Some(&mask))
}

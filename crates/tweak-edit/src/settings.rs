//! Persistent tool settings.

use glam::{Quat, Vec3};
use rhizome_tweak_core::{
    AxisMask, CoordinateSpace, MirrorMode, ProjectionRayDirection, RecalculateMode,
    TangentPrecision,
};
use rhizome_tweak_mesh::ObjExportOptions;

use crate::brush::Brush;
use crate::mirror::DEFAULT_MIRROR_EPSILON;
use crate::projection::ProjectionSettings;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of brush presets.
pub const BRUSH_SLOTS: usize = 5;

/// Number of saved selection slots.
pub const SELECTION_SETS: usize = 5;

/// What a drag in the viewport does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EditMode {
    /// Translate.
    #[default]
    Move,
    /// Rotate around the pivot.
    Rotate,
    /// Scale around the pivot.
    Scale,
    /// Set coordinates to a value.
    Assign,
    /// Project onto another mesh.
    Projection,
    /// Restore the base mesh.
    Reset,
}

/// How vertices are picked in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SelectMode {
    /// Nearest vertex under the cursor.
    Single,
    /// Rectangle drag.
    #[default]
    Rect,
    /// Freehand polygon.
    Lasso,
    /// Falloff brush.
    Brush,
}

/// Settings shared by every edit session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TweakSettings {
    /// Active edit operation.
    pub edit_mode: EditMode,
    /// Active selection tool.
    pub select_mode: SelectMode,
    /// When normals are recomputed.
    pub normal_mode: RecalculateMode,
    /// When tangents are recomputed.
    pub tangent_mode: RecalculateMode,
    /// Tangent generation method.
    pub tangent_precision: TangentPrecision,
    /// Mirror plane.
    pub mirror_mode: MirrorMode,
    /// Tolerance for pairing mirrored vertices.
    pub mirror_epsilon: f32,
    /// Ignore back-facing vertices when picking.
    pub front_face_only: bool,
    /// Brush presets.
    pub brushes: Vec<Brush>,
    /// Index of the active brush preset.
    pub active_brush: usize,
    /// Space for move, rotate and scale.
    pub coordinate: CoordinateSpace,
    /// Offset applied by a numeric move.
    pub move_amount: Vec3,
    /// Rotation applied by a numeric rotate.
    pub rotate_amount: Quat,
    /// Factor applied by a numeric scale.
    pub scale_amount: Vec3,
    /// Value written by assign.
    pub assign_value: Vec3,
    /// Axes written by assign.
    pub assign_axes: AxisMask,
    /// Space of the assigned value.
    pub assign_coordinate: CoordinateSpace,
    /// Weight drags by the brush instead of the selection.
    pub soft_op: bool,
    /// Projection options.
    pub projection: ProjectionSettings,
    /// Direction used when switching to directional projection.
    pub projection_direction: Vec3,
    /// Center used when switching to radial projection.
    pub projection_center: Vec3,
    /// OBJ export options.
    pub obj_export: ObjExportOptions,
}

impl Default for TweakSettings {
    fn default() -> Self {
        Self {
            edit_mode: EditMode::Move,
            select_mode: SelectMode::Rect,
            normal_mode: RecalculateMode::Realtime,
            tangent_mode: RecalculateMode::Auto,
            tangent_precision: TangentPrecision::Fast,
            mirror_mode: MirrorMode::None,
            mirror_epsilon: DEFAULT_MIRROR_EPSILON,
            front_face_only: true,
            brushes: vec![Brush::default(); BRUSH_SLOTS],
            active_brush: 0,
            coordinate: CoordinateSpace::World,
            move_amount: Vec3::ZERO,
            rotate_amount: Quat::IDENTITY,
            scale_amount: Vec3::ONE,
            assign_value: Vec3::Y,
            assign_axes: AxisMask::all(),
            assign_coordinate: CoordinateSpace::Local,
            soft_op: false,
            projection: ProjectionSettings::default(),
            projection_direction: Vec3::NEG_Y,
            projection_center: Vec3::ZERO,
            obj_export: ObjExportOptions::default(),
        }
    }
}

impl TweakSettings {
    /// Sets the normal recalculation mode.
    pub fn with_normal_mode(mut self, mode: RecalculateMode) -> Self {
        self.normal_mode = mode;
        self
    }

    /// Sets the tangent recalculation mode.
    pub fn with_tangent_mode(mut self, mode: RecalculateMode) -> Self {
        self.tangent_mode = mode;
        self
    }

    /// Sets the tangent precision.
    pub fn with_tangent_precision(mut self, precision: TangentPrecision) -> Self {
        self.tangent_precision = precision;
        self
    }

    /// Sets the mirror plane.
    pub fn with_mirror(mut self, mode: MirrorMode) -> Self {
        self.mirror_mode = mode;
        self
    }

    /// Sets the mirror pairing tolerance.
    pub fn with_mirror_epsilon(mut self, epsilon: f32) -> Self {
        self.mirror_epsilon = epsilon;
        self
    }

    /// Sets the edit coordinate space.
    pub fn with_coordinate(mut self, space: CoordinateSpace) -> Self {
        self.coordinate = space;
        self
    }

    /// Enables or disables brush-weighted edits.
    pub fn with_soft_op(mut self, soft_op: bool) -> Self {
        self.soft_op = soft_op;
        self
    }

    /// Sets the projection options.
    pub fn with_projection(mut self, projection: ProjectionSettings) -> Self {
        self.projection = projection;
        self
    }

    /// The active brush preset.
    pub fn brush(&self) -> Brush {
        self.brushes.get(self.active_brush).cloned().unwrap_or_default()
    }

    /// Mutable access to the active brush preset, if the index is valid.
    pub fn brush_mut(&mut self) -> Option<&mut Brush> {
        self.brushes.get_mut(self.active_brush)
    }

    /// Projects along `projection_direction`.
    pub fn use_directional_projection(&mut self) {
        self.projection.ray_direction = ProjectionRayDirection::Directional {
            direction: self.projection_direction,
        };
    }

    /// Projects away from `projection_center`.
    pub fn use_radial_projection(&mut self) {
        self.projection.ray_direction = ProjectionRayDirection::Radial {
            center: self.projection_center,
        };
    }

    /// Whether normals are recomputed after every mutation.
    pub fn realtime_normals(&self) -> bool {
        self.normal_mode == RecalculateMode::Realtime
    }

    /// Whether tangents are recomputed after every mutation.
    ///
    /// Requires realtime normals as well.
    pub fn realtime_tangents(&self) -> bool {
        self.realtime_normals() && self.tangent_mode == RecalculateMode::Realtime
    }

    /// Whether normals are recomputed on commit.
    pub fn commit_normals(&self) -> bool {
        self.normal_mode == RecalculateMode::Auto
    }

    /// Whether tangents are recomputed on commit.
    pub fn commit_tangents(&self) -> bool {
        self.tangent_mode == RecalculateMode::Auto && self.normal_mode != RecalculateMode::Manual
    }

    /// Parses settings from JSON. Missing fields take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes settings to pretty-printed JSON.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

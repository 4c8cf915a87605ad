//! Weighted vertex transforms.
//!
//! Operations are plain values with `apply` methods that edit a mesh's
//! local-space positions in place. Each vertex moves by its selection
//! weight: translation and scale are interpolated linearly, rotation is
//! slerped from identity. Without a mask every vertex has weight one.
//!
//! Vectors, pivots and assigned values are expressed in the operation's
//! [`CoordinateSpace`] and converted through the mesh transform.

use glam::{Mat4, Quat, Vec3, Vec4};
use rhizome_tweak_core::{AxisMask, CoordinateSpace};
use rhizome_tweak_easing::Lerp;
use rhizome_tweak_mesh::{MeshBuffers, Topology};

use crate::selection::SelectionMask;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Vertices an operation touches, with their weights.
pub(crate) fn weighted_vertices(
    mask: Option<&SelectionMask>,
    vertex_count: usize,
) -> Vec<(usize, f32)> {
    match mask {
        None => (0..vertex_count).map(|i| (i, 1.0)).collect(),
        Some(mask) => mask
            .iter_selected()
            .filter(|&(i, _)| i < vertex_count)
            .collect(),
    }
}

/// World-space frame that rotations and scales are applied around.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pivot {
    /// Pivot position in world space.
    pub position: Vec3,
    /// Pivot orientation in world space.
    pub rotation: Quat,
}

impl Default for Pivot {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Pivot {
    /// Creates a pivot.
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Creates an axis-aligned pivot at a position.
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Resolves the frame used for a coordinate space.
    ///
    /// Returns `(to_frame, pivot_position, pivot_rotation)` where `to_frame`
    /// maps local vertex positions into the space the pivot lives in.
    fn resolve(&self, transform: Mat4, space: CoordinateSpace) -> (Mat4, Vec3, Quat) {
        match space {
            CoordinateSpace::World => (transform, self.position, Quat::IDENTITY),
            CoordinateSpace::Local => (
                Mat4::IDENTITY,
                transform.inverse().transform_point3(self.position),
                Quat::IDENTITY,
            ),
            CoordinateSpace::Pivot => (transform, self.position, self.rotation),
        }
    }
}

/// Applies `f` to each weighted vertex in pivot-local coordinates.
fn apply_around_pivot(
    mesh: &mut MeshBuffers,
    mask: Option<&SelectionMask>,
    pivot: &Pivot,
    space: CoordinateSpace,
    f: impl Fn(Vec3, f32) -> Vec3,
) -> usize {
    let (to_frame, pivot_pos, pivot_rot) = pivot.resolve(mesh.transform, space);
    let from_frame = to_frame.inverse();
    let inv_rot = pivot_rot.inverse();

    let targets = weighted_vertices(mask, mesh.positions.len());
    for &(i, w) in &targets {
        let p = to_frame.transform_point3(mesh.positions[i]);
        let local = inv_rot * (p - pivot_pos);
        let moved = pivot_rot * f(local, w) + pivot_pos;
        mesh.positions[i] = from_frame.transform_point3(moved);
    }
    targets.len()
}

/// Translates vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Move {
    /// Offset in `space`.
    pub amount: Vec3,
    /// Space of `amount`.
    pub space: CoordinateSpace,
    /// Orientation used when `space` is [`CoordinateSpace::Pivot`].
    pub pivot_rotation: Quat,
}

impl Move {
    /// Creates a world-space move.
    pub fn new(amount: Vec3) -> Self {
        Self {
            amount,
            space: CoordinateSpace::World,
            pivot_rotation: Quat::IDENTITY,
        }
    }

    /// Sets the coordinate space.
    pub fn in_space(mut self, space: CoordinateSpace) -> Self {
        self.space = space;
        self
    }

    /// Sets the pivot orientation.
    pub fn with_pivot_rotation(mut self, rotation: Quat) -> Self {
        self.pivot_rotation = rotation;
        self
    }

    /// Applies this operation, returning the number of vertices affected.
    pub fn apply(&self, mesh: &mut MeshBuffers, mask: Option<&SelectionMask>) -> usize {
        let world = match self.space {
            CoordinateSpace::World => self.amount,
            CoordinateSpace::Local => mesh.transform.transform_vector3(self.amount),
            CoordinateSpace::Pivot => self.pivot_rotation * self.amount,
        };
        let local = mesh.transform.inverse().transform_vector3(world);

        let targets = weighted_vertices(mask, mesh.positions.len());
        for &(i, w) in &targets {
            mesh.positions[i] += local * w;
        }
        targets.len()
    }
}

/// Rotates vertices around a pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RotatePivot {
    /// Rotation in pivot space.
    pub rotation: Quat,
    /// Center of rotation.
    pub pivot: Pivot,
    /// Space the rotation axes are expressed in.
    pub space: CoordinateSpace,
}

impl RotatePivot {
    /// Creates a world-space rotation around a pivot.
    pub fn new(rotation: Quat, pivot: Pivot) -> Self {
        Self {
            rotation,
            pivot,
            space: CoordinateSpace::World,
        }
    }

    /// Sets the coordinate space.
    pub fn in_space(mut self, space: CoordinateSpace) -> Self {
        self.space = space;
        self
    }

    /// Applies this operation, returning the number of vertices affected.
    pub fn apply(&self, mesh: &mut MeshBuffers, mask: Option<&SelectionMask>) -> usize {
        let rotation = self.rotation.normalize();
        apply_around_pivot(mesh, mask, &self.pivot, self.space, |p, w| {
            Quat::IDENTITY.lerp_to(&rotation, w) * p
        })
    }
}

/// Scales vertices around a pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scale {
    /// Per-axis scale factor in pivot space.
    pub scale: Vec3,
    /// Center of scaling.
    pub pivot: Pivot,
    /// Space the scale axes are expressed in.
    pub space: CoordinateSpace,
}

impl Scale {
    /// Creates a world-space scale around a pivot.
    pub fn new(scale: Vec3, pivot: Pivot) -> Self {
        Self {
            scale,
            pivot,
            space: CoordinateSpace::World,
        }
    }

    /// Sets the coordinate space.
    pub fn in_space(mut self, space: CoordinateSpace) -> Self {
        self.space = space;
        self
    }

    /// Applies this operation, returning the number of vertices affected.
    pub fn apply(&self, mesh: &mut MeshBuffers, mask: Option<&SelectionMask>) -> usize {
        let scale = self.scale;
        apply_around_pivot(mesh, mask, &self.pivot, self.space, |p, w| {
            p * Vec3::ONE.lerp(scale, w)
        })
    }
}

/// Sets selected coordinates to a fixed value.
///
/// In [`CoordinateSpace::Pivot`] the value is relative to the pivot frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Assign {
    /// Target coordinates.
    pub value: Vec3,
    /// Axes to overwrite.
    pub axes: AxisMask,
    /// Space of `value`.
    pub space: CoordinateSpace,
    /// Frame used when `space` is [`CoordinateSpace::Pivot`].
    pub pivot: Pivot,
}

impl Assign {
    /// Creates a local-space assignment of all axes.
    pub fn new(value: Vec3) -> Self {
        Self {
            value,
            axes: AxisMask::all(),
            space: CoordinateSpace::Local,
            pivot: Pivot::default(),
        }
    }

    /// Restricts the assignment to some axes.
    pub fn with_axes(mut self, axes: AxisMask) -> Self {
        self.axes = axes;
        self
    }

    /// Sets the coordinate space.
    pub fn in_space(mut self, space: CoordinateSpace) -> Self {
        self.space = space;
        self
    }

    /// Sets the pivot frame.
    pub fn with_pivot(mut self, pivot: Pivot) -> Self {
        self.pivot = pivot;
        self
    }

    /// Applies this operation, returning the number of vertices affected.
    pub fn apply(&self, mesh: &mut MeshBuffers, mask: Option<&SelectionMask>) -> usize {
        let value = self.value;
        let axes = self.axes;
        let pivot = match self.space {
            CoordinateSpace::World => Pivot::default(),
            // Local coordinates are measured from the object's origin
            CoordinateSpace::Local => Pivot::at(mesh.transform.transform_point3(Vec3::ZERO)),
            CoordinateSpace::Pivot => self.pivot,
        };
        apply_around_pivot(mesh, mask, &pivot, self.space, |p, w| axes.blend(p, value, w))
    }
}

/// Any transform operation, for callers that dispatch on a value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransformOp {
    /// See [`Move`].
    Move(Move),
    /// See [`RotatePivot`].
    Rotate(RotatePivot),
    /// See [`Scale`].
    Scale(Scale),
    /// See [`Assign`].
    Assign(Assign),
}

impl TransformOp {
    /// Applies the wrapped operation.
    pub fn apply(&self, mesh: &mut MeshBuffers, mask: Option<&SelectionMask>) -> usize {
        match self {
            Self::Move(op) => op.apply(mesh, mask),
            Self::Rotate(op) => op.apply(mesh, mask),
            Self::Scale(op) => op.apply(mesh, mask),
            Self::Assign(op) => op.apply(mesh, mask),
        }
    }

    /// Short name for history entries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Move(_) => "Move",
            Self::Rotate(_) => "Rotate",
            Self::Scale(_) => "Scale",
            Self::Assign(_) => "Assign",
        }
    }
}

impl From<Move> for TransformOp {
    fn from(op: Move) -> Self {
        Self::Move(op)
    }
}

impl From<RotatePivot> for TransformOp {
    fn from(op: RotatePivot) -> Self {
        Self::Rotate(op)
    }
}

impl From<Scale> for TransformOp {
    fn from(op: Scale) -> Self {
        Self::Scale(op)
    }
}

impl From<Assign> for TransformOp {
    fn from(op: Assign) -> Self {
        Self::Assign(op)
    }
}

/// Moves vertices by `amount` in `space`.
pub fn move_vertices(
    mesh: &mut MeshBuffers,
    mask: Option<&SelectionMask>,
    amount: Vec3,
    space: CoordinateSpace,
    pivot_rotation: Quat,
) -> usize {
    Move::new(amount)
        .in_space(space)
        .with_pivot_rotation(pivot_rotation)
        .apply(mesh, mask)
}

/// Rotates vertices around a pivot.
pub fn rotate_pivot_vertices(
    mesh: &mut MeshBuffers,
    mask: Option<&SelectionMask>,
    rotation: Quat,
    pivot: Pivot,
    space: CoordinateSpace,
) -> usize {
    RotatePivot::new(rotation, pivot).in_space(space).apply(mesh, mask)
}

/// Scales vertices around a pivot.
pub fn scale_vertices(
    mesh: &mut MeshBuffers,
    mask: Option<&SelectionMask>,
    scale: Vec3,
    pivot: Pivot,
    space: CoordinateSpace,
) -> usize {
    Scale::new(scale, pivot).in_space(space).apply(mesh, mask)
}

/// Assigns masked axes of the selected vertices to `value`.
pub fn assign_vertices(
    mesh: &mut MeshBuffers,
    mask: Option<&SelectionMask>,
    value: Vec3,
    axes: AxisMask,
    space: CoordinateSpace,
    pivot: Pivot,
) -> usize {
    Assign::new(value)
        .with_axes(axes)
        .in_space(space)
        .with_pivot(pivot)
        .apply(mesh, mask)
}

/// Moves vertices back toward the base mesh.
///
/// Without a mask the base positions, normals and tangents are restored
/// exactly. With a mask each vertex is interpolated by its weight.
pub fn reset_vertices(
    mesh: &mut MeshBuffers,
    base: &MeshBuffers,
    mask: Option<&SelectionMask>,
) -> usize {
    let Some(mask) = mask else {
        copy_prefix(&mut mesh.positions, &base.positions);
        copy_prefix(&mut mesh.normals, &base.normals);
        copy_prefix(&mut mesh.tangents, &base.tangents);
        return mesh.positions.len().min(base.positions.len());
    };

    let mut count = 0;
    for (i, w) in mask.iter_selected() {
        let Some(&p) = base.positions.get(i) else {
            continue;
        };
        let Some(pos) = mesh.positions.get_mut(i) else {
            continue;
        };
        *pos = pos.lerp(p, w);
        if let (Some(n), Some(&b)) = (mesh.normals.get_mut(i), base.normals.get(i)) {
            *n = n.lerp(b, w);
        }
        if let (Some(t), Some(&b)) = (mesh.tangents.get_mut(i), base.tangents.get(i)) {
            *t = Vec4::lerp(*t, b, w);
        }
        count += 1;
    }
    count
}

fn copy_prefix<T: Copy>(dst: &mut [T], src: &[T]) {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
}

/// One step of Laplacian smoothing across edge neighbours.
///
/// Each weighted vertex moves `strength * weight` of the way toward the
/// average of its neighbours.
pub fn smooth_vertices(
    mesh: &mut MeshBuffers,
    topology: &Topology,
    mask: Option<&SelectionMask>,
    strength: f32,
) -> usize {
    let original = mesh.positions.clone();
    let mut count = 0;

    for (i, w) in weighted_vertices(mask, original.len()) {
        let mut sum = Vec3::ZERO;
        let mut n = 0;
        for j in topology.vertex_neighbors(i) {
            if let Some(&p) = original.get(j) {
                sum += p;
                n += 1;
            }
        }
        if n == 0 {
            continue;
        }
        let average = sum / n as f32;
        mesh.positions[i] = original[i].lerp(average, (strength * w).clamp(0.0, 1.0));
        count += 1;
    }
    count
}

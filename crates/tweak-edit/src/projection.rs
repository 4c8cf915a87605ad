//! Vertex projection onto another mesh.
//!
//! Each source vertex casts a ray in world space against the target mesh and,
//! on a hit within `max_distance`, takes the surface position (and optionally
//! the interpolated normal and tangent) at the hit. Results are written back
//! in the source's local space.

use glam::{Mat4, Vec3, Vec4};
use rhizome_tweak_core::{AttributeMask, ProjectionMode, ProjectionRayDirection};
use rhizome_tweak_mesh::MeshBuffers;
use rhizome_tweak_spatial::{Ray, TriangleBvh};

use crate::query::{RayHit, raycast_with};
use crate::selection::SelectionMask;
use crate::transform::weighted_vertices;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default ray length for interactive projection.
pub const DEFAULT_MAX_DISTANCE: f32 = 1000.0;

/// Default ray length for projected blend-shape frames.
pub const FRAME_MAX_DISTANCE: f32 = 10.0;

/// How rays are cast and which attributes are taken from the hit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProjectionSettings {
    /// Per-vertex ray direction source.
    pub ray_direction: ProjectionRayDirection,
    /// Which ray senses are tried.
    pub mode: ProjectionMode,
    /// Longest accepted world-space hit distance.
    pub max_distance: f32,
    /// Attributes copied from the hit surface.
    pub attributes: AttributeMask,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            ray_direction: ProjectionRayDirection::CurrentNormals,
            mode: ProjectionMode::ForwardAndBackward,
            max_distance: DEFAULT_MAX_DISTANCE,
            attributes: AttributeMask::all(),
        }
    }
}

impl ProjectionSettings {
    /// Settings used by blend-shape frames.
    pub fn for_frames() -> Self {
        Self {
            max_distance: FRAME_MAX_DISTANCE,
            ..Self::default()
        }
    }

    /// Sets the ray direction source.
    pub fn with_ray_direction(mut self, ray_direction: ProjectionRayDirection) -> Self {
        self.ray_direction = ray_direction;
        self
    }

    /// Sets which ray senses are tried.
    pub fn with_mode(mut self, mode: ProjectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the maximum hit distance.
    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Sets the attributes copied from the hit.
    pub fn with_attributes(mut self, attributes: AttributeMask) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Result of a projection: full-length attribute arrays in source local space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projected {
    /// Projected positions.
    pub positions: Vec<Vec3>,
    /// Projected normals.
    pub normals: Vec<Vec3>,
    /// Projected tangents.
    pub tangents: Vec<Vec4>,
    /// Number of vertices whose ray hit the target.
    pub hit_count: usize,
}

impl Projected {
    /// Copies the projected attributes into `mesh`.
    pub fn write_to(self, mesh: &mut MeshBuffers) {
        mesh.positions = self.positions;
        mesh.normals = self.normals;
        mesh.tangents = self.tangents;
    }
}

/// Projects the vertices of `source` onto `target`.
///
/// `base_normals` supplies the directions for
/// [`ProjectionRayDirection::BaseNormals`]; without it the current normals
/// are used. Vertices outside `mask`, or without a hit, keep their values.
pub fn project_vertices(
    source: &MeshBuffers,
    target: &MeshBuffers,
    settings: &ProjectionSettings,
    base_normals: Option<&[Vec3]>,
    mask: Option<&SelectionMask>,
) -> Projected {
    let mut out = Projected {
        positions: source.positions.clone(),
        normals: source.normals.clone(),
        tangents: source.tangents.clone(),
        hit_count: 0,
    };

    let bvh = TriangleBvh::build(&target.positions, &target.indices);
    if bvh.is_empty() {
        return out;
    }

    let to_source = source.transform.inverse();
    let source_normals = source.normal_matrix();
    let target_normals = target.normal_matrix();
    let ray_normals = match (settings.ray_direction, base_normals) {
        (ProjectionRayDirection::BaseNormals, Some(base)) => base,
        _ => source.normals.as_slice(),
    };

    for (i, w) in weighted_vertices(mask, source.positions.len()) {
        let origin = source.transform.transform_point3(source.positions[i]);
        let direction = match settings.ray_direction {
            ProjectionRayDirection::CurrentNormals | ProjectionRayDirection::BaseNormals => {
                match ray_normals.get(i) {
                    Some(&n) => source_normals.transform_vector3(n),
                    None => continue,
                }
            }
            ProjectionRayDirection::Radial { center } => origin - center,
            ProjectionRayDirection::Directional { direction } => direction,
        };
        let Some(ray) = Ray::try_new(origin, direction) else {
            continue;
        };
        let Some(hit) = cast(&bvh, target.transform, &ray, settings) else {
            continue;
        };
        out.hit_count += 1;

        if settings.attributes.vertex {
            let p = to_source.transform_point3(hit.position);
            out.positions[i] = out.positions[i].lerp(p, w);
        }
        if settings.attributes.normal {
            let hit_normal = surface_normal(target, &hit);
            if let (Some(n), Some(hit_normal)) = (out.normals.get_mut(i), hit_normal) {
                // Back to source local space: inverse of the inverse transpose
                let world = target_normals.transform_vector3(hit_normal);
                let local = source.transform.transpose().transform_vector3(world);
                *n = n.lerp(local.normalize_or_zero(), w).normalize_or_zero();
            }
        }
        if settings.attributes.tangent {
            let hit_tangent = surface_tangent(target, &hit);
            if let (Some(t), Some(hit_tangent)) = (out.tangents.get_mut(i), hit_tangent) {
                let world = target.transform.transform_vector3(hit_tangent);
                let local = to_source.transform_vector3(world).normalize_or_zero();
                let xyz = t.truncate().lerp(local, w).normalize_or_zero();
                *t = xyz.extend(t.w);
            }
        }
    }
    out
}

/// Casts in the configured senses; ties go to the forward hit.
fn cast(
    bvh: &TriangleBvh,
    transform: Mat4,
    ray: &Ray,
    settings: &ProjectionSettings,
) -> Option<RayHit> {
    let forward = || raycast_with(bvh, transform, ray, settings.max_distance);
    let backward = || raycast_with(bvh, transform, &ray.reversed(), settings.max_distance);
    match settings.mode {
        ProjectionMode::Forward => forward(),
        ProjectionMode::Backward => backward(),
        ProjectionMode::ForwardAndBackward => match (forward(), backward()) {
            (Some(f), Some(b)) => Some(if b.distance < f.distance { b } else { f }),
            (f, b) => f.or(b),
        },
    }
}

fn surface_normal(mesh: &MeshBuffers, hit: &RayHit) -> Option<Vec3> {
    let [a, b, c] = mesh.triangle(hit.triangle)?;
    if mesh.has_normals() {
        let bc = hit.barycentric;
        let n = mesh.normals[a] * bc.x + mesh.normals[b] * bc.y + mesh.normals[c] * bc.z;
        return n.try_normalize();
    }
    let p = &mesh.positions;
    (p[b] - p[a]).cross(p[c] - p[a]).try_normalize()
}

fn surface_tangent(mesh: &MeshBuffers, hit: &RayHit) -> Option<Vec3> {
    if !mesh.has_tangents() {
        return None;
    }
    let [a, b, c] = mesh.triangle(hit.triangle)?;
    let bc = hit.barycentric;
    let t = &mesh.tangents;
    (t[a].truncate() * bc.x + t[b].truncate() * bc.y + t[c].truncate() * bc.z).try_normalize()
}

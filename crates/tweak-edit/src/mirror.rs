//! Symmetric editing across a plane through the origin.
//!
//! A [`MirrorRelation`] pairs each vertex with its reflection, built once
//! from the undeformed base mesh. Applying it overwrites the destination
//! half with the reflection of the source half.

use glam::{Vec3, Vec4};
use rhizome_tweak_core::MirrorMode;
use rhizome_tweak_spatial::SpatialHash;

use crate::error::MirrorError;

/// Minimum cosine between a reflected normal and a candidate's normal for
/// the candidate to count as the same vertex.
const NORMAL_MATCH: f32 = 0.99;

/// Default pairing tolerance.
pub const DEFAULT_MIRROR_EPSILON: f32 = 0.0001;

/// Which side of the mirror plane a vertex is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorSide {
    /// Authoritative half, paired with the given destination vertex.
    Source(u32),
    /// Overwritten half, paired with the given source vertex.
    Destination(u32),
    /// On the plane; snapped back onto it when applied.
    OnPlane,
}

/// Vertex pairing across a mirror plane.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorRelation {
    plane_normal: Vec3,
    epsilon: f32,
    sides: Vec<MirrorSide>,
}

/// Reflects a point or direction across the plane through the origin.
pub fn reflect(v: Vec3, plane_normal: Vec3) -> Vec3 {
    v - plane_normal * (2.0 * v.dot(plane_normal))
}

impl MirrorRelation {
    /// Pairs every off-plane vertex with exactly one vertex on the other side.
    ///
    /// `plane_normal` points toward the destination half. When several
    /// vertices lie within `epsilon` of a reflected position, the one whose
    /// normal matches the reflected normal is taken.
    pub fn build(
        positions: &[Vec3],
        normals: &[Vec3],
        plane_normal: Vec3,
        epsilon: f32,
    ) -> Result<Self, MirrorError> {
        let plane_normal = plane_normal.try_normalize().ok_or(MirrorError::Disabled)?;
        let epsilon = epsilon.max(f32::EPSILON);

        let mut hash = SpatialHash::new(epsilon * 2.0);
        for (i, &p) in positions.iter().enumerate() {
            hash.insert(p, i);
        }

        let mut sides = Vec::with_capacity(positions.len());
        for (i, &p) in positions.iter().enumerate() {
            let distance = p.dot(plane_normal);
            if distance.abs() <= epsilon {
                sides.push(MirrorSide::OnPlane);
                continue;
            }

            let reflected = reflect(p, plane_normal);
            let mut candidates: Vec<usize> = hash
                .query_radius(reflected, epsilon)
                .map(|(_, &j)| j)
                .filter(|&j| j != i)
                .collect();

            if candidates.len() > 1 {
                if let Some(&n) = normals.get(i) {
                    let expected = reflect(n, plane_normal);
                    candidates.retain(|&j| {
                        normals.get(j).is_some_and(|m| m.dot(expected) >= NORMAL_MATCH)
                    });
                }
            }
            let &[partner] = candidates.as_slice() else {
                return Err(MirrorError::NotSymmetric {
                    vertex: i,
                    candidates: candidates.len(),
                });
            };

            let partner = partner as u32;
            sides.push(if distance > 0.0 {
                MirrorSide::Destination(partner)
            } else {
                MirrorSide::Source(partner)
            });
        }

        Ok(Self {
            plane_normal,
            epsilon,
            sides,
        })
    }

    /// Builds a relation for a mirror mode.
    pub fn for_mode(
        mode: MirrorMode,
        positions: &[Vec3],
        normals: &[Vec3],
        epsilon: f32,
    ) -> Result<Self, MirrorError> {
        let normal = mode.plane_normal().ok_or(MirrorError::Disabled)?;
        Self::build(positions, normals, normal, epsilon)
    }

    /// Normal of the mirror plane, pointing toward the destination half.
    pub fn plane_normal(&self) -> Vec3 {
        self.plane_normal
    }

    /// Tolerance the relation was built with.
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Number of vertices covered.
    pub fn vertex_count(&self) -> usize {
        self.sides.len()
    }

    /// Returns the side of a vertex.
    pub fn side(&self, vertex: usize) -> Option<MirrorSide> {
        self.sides.get(vertex).copied()
    }

    /// Returns the mirrored partner of an off-plane vertex.
    pub fn partner(&self, vertex: usize) -> Option<usize> {
        match self.sides.get(vertex)? {
            MirrorSide::Source(j) | MirrorSide::Destination(j) => Some(*j as usize),
            MirrorSide::OnPlane => None,
        }
    }

    /// Overwrites destination vertices with the reflection of their partners
    /// and snaps on-plane vertices onto the plane.
    ///
    /// Destination tangents keep their own handedness. Empty normal or
    /// tangent slices are skipped. Returns the number of vertices written.
    pub fn apply(
        &self,
        positions: &mut [Vec3],
        normals: &mut [Vec3],
        tangents: &mut [Vec4],
    ) -> usize {
        let n = self.plane_normal;
        let mut count = 0;

        for (i, side) in self.sides.iter().enumerate() {
            if i >= positions.len() {
                break;
            }
            match *side {
                MirrorSide::Source(_) => {}
                MirrorSide::OnPlane => {
                    let p = positions[i];
                    positions[i] = p - n * p.dot(n);
                    count += 1;
                }
                MirrorSide::Destination(j) => {
                    let j = j as usize;
                    let Some(&p) = positions.get(j) else {
                        continue;
                    };
                    positions[i] = reflect(p, n);
                    if let (Some(&src), true) = (normals.get(j), i < normals.len()) {
                        normals[i] = reflect(src, n);
                    }
                    if let (Some(&src), true) = (tangents.get(j), i < tangents.len()) {
                        tangents[i] = reflect(src.truncate(), n).extend(tangents[i].w);
                    }
                    count += 1;
                }
            }
        }
        count
    }
}

/// Builds a mirror relation from base positions and normals.
pub fn build_relation(
    positions: &[Vec3],
    normals: &[Vec3],
    plane_normal: Vec3,
    epsilon: f32,
) -> Result<MirrorRelation, MirrorError> {
    MirrorRelation::build(positions, normals, plane_normal, epsilon)
}

/// Applies a relation to vertex buffers.
pub fn apply_mirroring(
    relation: &MirrorRelation,
    positions: &mut [Vec3],
    normals: &mut [Vec3],
    tangents: &mut [Vec4],
) -> usize {
    relation.apply(positions, normals, tangents)
}

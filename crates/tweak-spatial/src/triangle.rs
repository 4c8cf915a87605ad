//! Ray casting against triangle meshes.

use glam::Vec3;

use crate::{Aabb3, Bvh, Ray};

/// Sine threshold below which a triangle is treated as degenerate or
/// parallel to the ray. The determinant is compared against it scaled by
/// the edge and direction lengths, so the test holds at any mesh scale.
const PARALLEL_EPSILON: f32 = 1e-6;

/// Result of a ray/triangle intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Index of the triangle in the source index buffer (`indices[3 * triangle..]`).
    pub triangle: usize,
    /// Distance along the ray.
    pub distance: f32,
    /// Barycentric weights of the three corners.
    pub barycentric: Vec3,
}

/// Möller–Trumbore intersection of a ray with a two-sided triangle.
///
/// Returns `(t, u, v)` where `t` is the ray parameter and `u`, `v` are the
/// barycentric weights of `v1` and `v2`. Hits behind the origin and
/// zero-area triangles return `None`.
pub fn ray_triangle(
    origin: Vec3,
    direction: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
) -> Option<(f32, f32, f32)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = direction.cross(edge2);
    let a = edge1.dot(h);

    let scale = edge1.length() * edge2.length() * direction.length();
    if a.abs() <= PARALLEL_EPSILON * scale {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(h);

    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * direction.dot(q);

    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if t >= 0.0 { Some((t, u, v)) } else { None }
}

/// Triangle soup with a BVH for nearest-hit ray casting.
///
/// Triangles referencing out-of-range vertices are skipped when building.
#[derive(Debug)]
pub struct TriangleBvh {
    triangles: Vec<[Vec3; 3]>,
    bvh: Bvh<usize>,
}

impl TriangleBvh {
    /// Builds the accelerator from a position buffer and a triangle index list.
    pub fn build(positions: &[Vec3], indices: &[u32]) -> Self {
        let mut triangles = Vec::with_capacity(indices.len() / 3);
        let mut primitives = Vec::with_capacity(indices.len() / 3);

        for (tri_idx, tri) in indices.chunks_exact(3).enumerate() {
            let corners = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if corners.iter().any(|&i| i >= positions.len()) {
                triangles.push([Vec3::ZERO; 3]);
                continue;
            }
            let verts = corners.map(|i| positions[i]);
            if let Some(bounds) = Aabb3::from_points(&verts) {
                // Flat triangles get a sliver of thickness so the slab test stays stable
                primitives.push((bounds.expanded(1e-6), tri_idx));
            }
            triangles.push(verts);
        }

        Self {
            triangles,
            bvh: Bvh::build(primitives),
        }
    }

    /// Returns the number of triangles indexed by the source buffer.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Returns true if there is nothing to hit.
    pub fn is_empty(&self) -> bool {
        self.bvh.is_empty()
    }

    /// Returns the nearest hit within `max_distance`, if any.
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<TriangleHit> {
        let (&triangle, distance) = self.bvh.closest_hit(ray, max_distance, |&i| {
            let [v0, v1, v2] = self.triangles[i];
            ray_triangle(ray.origin, ray.direction, v0, v1, v2).map(|(t, _, _)| t)
        })?;

        let [v0, v1, v2] = self.triangles[triangle];
        let (_, u, v) = ray_triangle(ray.origin, ray.direction, v0, v1, v2)?;

        Some(TriangleHit {
            triangle,
            distance,
            barycentric: Vec3::new(1.0 - u - v, u, v),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> (Vec<Vec3>, Vec<u32>) {
        let positions = vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        (positions, vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn test_ray_triangle_hit() {
        let hit = ray_triangle(
            Vec3::new(0.2, 0.2, 1.0),
            Vec3::NEG_Z,
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
        );
        let (t, u, v) = hit.unwrap();
        assert!((t - 1.0).abs() < 1e-6);
        assert!((u - 0.2).abs() < 1e-6);
        assert!((v - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_ray_triangle_two_sided() {
        let origin = Vec3::new(0.2, 0.2, -1.0);
        let from_below = ray_triangle(origin, Vec3::Z, Vec3::ZERO, Vec3::X, Vec3::Y);
        assert!(from_below.is_some());
    }

    #[test]
    fn test_ray_triangle_behind_origin() {
        let hit = ray_triangle(Vec3::new(0.2, 0.2, 1.0), Vec3::Z, Vec3::ZERO, Vec3::X, Vec3::Y);
        assert!(hit.is_none());
    }

    #[test]
    fn test_ray_triangle_degenerate() {
        let origin = Vec3::new(0.5, 0.0, 1.0);
        let hit = ray_triangle(origin, Vec3::NEG_Z, Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
        assert!(hit.is_none());

        let point = ray_triangle(origin, Vec3::NEG_Z, Vec3::X, Vec3::X, Vec3::X);
        assert!(point.is_none());
    }

    #[test]
    fn test_ray_triangle_any_scale() {
        // Micro-scale triangle: the determinant is far below 1e-8
        let s = 1e-5;
        let origin = Vec3::new(0.25 * s, 0.25 * s, 1.0);
        let hit = ray_triangle(origin, Vec3::NEG_Z, Vec3::ZERO, Vec3::X * s, Vec3::Y * s);
        let (t, u, v) = hit.unwrap();
        assert!((t - 1.0).abs() < 1e-5);
        assert!((u - 0.25).abs() < 1e-3);
        assert!((v - 0.25).abs() < 1e-3);

        // Large triangle grazed by a ray in its plane
        let big = 1e4;
        let origin = Vec3::new(-1.0, 0.5, 0.0);
        let grazing = ray_triangle(origin, Vec3::X, Vec3::ZERO, Vec3::X * big, Vec3::Y * big);
        assert!(grazing.is_none());
    }

    #[test]
    fn test_triangle_bvh_nearest() {
        let (mut positions, mut indices) = quad();
        // A second quad further along the ray
        let offset = positions.len() as u32;
        positions.extend(quad().0.iter().map(|p| *p - Vec3::Z * 2.0));
        indices.extend(quad().1.iter().map(|i| i + offset));

        let bvh = TriangleBvh::build(&positions, &indices);
        assert_eq!(bvh.triangle_count(), 4);

        let ray = Ray::new(Vec3::new(0.5, -0.5, 3.0), Vec3::NEG_Z);
        let hit = bvh.raycast(&ray, f32::MAX).unwrap();
        assert!((hit.distance - 3.0).abs() < 1e-5);
        assert!(hit.triangle < 2);
        assert!((hit.barycentric.x + hit.barycentric.y + hit.barycentric.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_triangle_bvh_max_distance() {
        let (positions, indices) = quad();
        let bvh = TriangleBvh::build(&positions, &indices);

        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(bvh.raycast(&ray, 4.0).is_none());
        assert!(bvh.raycast(&ray, 5.5).is_some());
    }

    #[test]
    fn test_triangle_bvh_empty_and_degenerate() {
        let empty = TriangleBvh::build(&[], &[]);
        assert!(empty.is_empty());
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(empty.raycast(&ray, f32::MAX).is_none());

        let positions = [Vec3::ZERO, Vec3::X, Vec3::X * 2.0];
        let bvh = TriangleBvh::build(&positions, &[0, 1, 2]);
        let ray = Ray::new(Vec3::new(0.5, 0.0, 1.0), Vec3::NEG_Z);
        assert!(bvh.raycast(&ray, f32::MAX).is_none());
    }

    #[test]
    fn test_triangle_bvh_skips_bad_indices() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let bvh = TriangleBvh::build(&positions, &[0, 1, 2, 0, 1, 9]);
        assert_eq!(bvh.triangle_count(), 2);

        let ray = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::NEG_Z);
        assert_eq!(bvh.raycast(&ray, f32::MAX).unwrap().triangle, 0);
    }
}

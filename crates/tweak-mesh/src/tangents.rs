//! Tangent frame generation.

use glam::{Vec2, Vec3, Vec4};
use rhizome_tweak_core::TangentPrecision;

use crate::buffers::valid_triangles;

/// Computes per-vertex tangents from positions, normals, UVs and triangles.
///
/// [`TangentPrecision::Fast`] accumulates the UV gradient of each triangle
/// weighted by its area. [`TangentPrecision::Precise`] weights by the corner
/// angle at each vertex, which is less sensitive to long thin triangles.
///
/// The tangent `w` holds the bitangent sign, so that
/// `bitangent = normal.cross(tangent.xyz) * w`. Vertices with no usable UV
/// gradient (or a mesh without UVs) receive an arbitrary tangent
/// perpendicular to their normal.
pub fn compute_tangents(
    positions: &[Vec3],
    normals: &[Vec3],
    uvs: &[Vec2],
    indices: &[u32],
    precision: TangentPrecision,
) -> Vec<Vec4> {
    let n = positions.len();
    let mut tan = vec![Vec3::ZERO; n];
    let mut bitan = vec![Vec3::ZERO; n];

    if uvs.len() == n {
        for (_, corners) in valid_triangles(indices, n) {
            let [i0, i1, i2] = corners;
            let (p0, p1, p2) = (positions[i0], positions[i1], positions[i2]);
            let (w0, w1, w2) = (uvs[i0], uvs[i1], uvs[i2]);

            let e1 = p1 - p0;
            let e2 = p2 - p0;
            let d1 = w1 - w0;
            let d2 = w2 - w0;

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < 1e-12 {
                continue;
            }
            let r = 1.0 / det;
            let sdir = (e1 * d2.y - e2 * d1.y) * r;
            let tdir = (e2 * d1.x - e1 * d2.x) * r;

            match precision {
                TangentPrecision::Fast => {
                    // Scale by area so large faces dominate
                    let area = e1.cross(e2).length();
                    let (s, t) = (sdir.normalize_or_zero() * area, tdir.normalize_or_zero() * area);
                    for i in corners {
                        tan[i] += s;
                        bitan[i] += t;
                    }
                }
                TangentPrecision::Precise => {
                    let s = sdir.normalize_or_zero();
                    let t = tdir.normalize_or_zero();
                    let pts = [p0, p1, p2];
                    for (k, &i) in corners.iter().enumerate() {
                        let a = pts[(k + 1) % 3] - pts[k];
                        let b = pts[(k + 2) % 3] - pts[k];
                        let angle = a.angle_between(b);
                        if angle.is_finite() {
                            tan[i] += s * angle;
                            bitan[i] += t * angle;
                        }
                    }
                }
            }
        }
    }

    (0..n)
        .map(|i| {
            let normal = normals.get(i).copied().unwrap_or(Vec3::Y).normalize_or_zero();
            orthogonalize(normal, tan[i], bitan[i])
        })
        .collect()
}

fn orthogonalize(normal: Vec3, tangent: Vec3, bitangent: Vec3) -> Vec4 {
    // Gram-Schmidt against the normal
    let t = (tangent - normal * normal.dot(tangent)).normalize_or_zero();
    if t == Vec3::ZERO {
        return fallback_tangent(normal).extend(1.0);
    }
    let w = if normal.cross(t).dot(bitangent) < 0.0 {
        -1.0
    } else {
        1.0
    };
    t.extend(w)
}

fn fallback_tangent(normal: Vec3) -> Vec3 {
    if normal == Vec3::ZERO {
        return Vec3::X;
    }
    normal.any_orthonormal_vector()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> (Vec<Vec3>, Vec<Vec3>, Vec<Vec2>, Vec<u32>) {
        (
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![Vec3::Z; 4],
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn test_tangents_follow_u() {
        let (p, n, uv, idx) = quad();
        for precision in [TangentPrecision::Fast, TangentPrecision::Precise] {
            let tangents = compute_tangents(&p, &n, &uv, &idx, precision);
            for t in &tangents {
                assert!((t.truncate() - Vec3::X).length() < 0.0001);
                assert_eq!(t.w, 1.0);
            }
        }
    }

    #[test]
    fn test_mirrored_uvs_flip_sign() {
        let (p, n, mut uv, idx) = quad();
        for w in &mut uv {
            w.y = 1.0 - w.y;
        }
        let tangents = compute_tangents(&p, &n, &uv, &idx, TangentPrecision::Fast);
        for t in &tangents {
            assert_eq!(t.w, -1.0);
        }
    }

    #[test]
    fn test_no_uvs_gives_perpendicular_tangent() {
        let (p, n, _, idx) = quad();
        let tangents = compute_tangents(&p, &n, &[], &idx, TangentPrecision::Fast);
        assert_eq!(tangents.len(), 4);
        for t in &tangents {
            assert!(t.truncate().dot(Vec3::Z).abs() < 0.0001);
            assert!((t.truncate().length() - 1.0).abs() < 0.0001);
        }
    }
}

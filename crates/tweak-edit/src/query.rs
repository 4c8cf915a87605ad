//! Ray casts, vertex picking and selection queries.
//!
//! Screen-space queries work in normalized device coordinates: the
//! [`PickContext`] projects each vertex through `view_proj * transform` and
//! divides by `w`, so rectangles and lasso points live in `[-1, 1]`.
//!
//! Every query on an empty mesh returns no hit or zero affected vertices.

use glam::{Mat4, Vec2, Vec3};
use rhizome_tweak_easing::FalloffCurve;
use rhizome_tweak_mesh::{MeshBuffers, Topology};
use rhizome_tweak_spatial::{Aabb2, Ray, TriangleBvh};

use crate::selection::SelectionMask;

/// Nearest ray/mesh intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Index of the hit triangle.
    pub triangle: usize,
    /// World-space distance from the ray origin.
    pub distance: f32,
    /// World-space hit position.
    pub position: Vec3,
    /// Barycentric weights of the triangle's three corners.
    pub barycentric: Vec3,
}

/// Casts a world-space ray against a mesh.
///
/// The ray is moved into the mesh's local space, so the mesh transform may
/// contain any invertible scale or rotation.
pub fn raycast(mesh: &MeshBuffers, ray: &Ray) -> Option<RayHit> {
    let bvh = TriangleBvh::build(&mesh.positions, &mesh.indices);
    raycast_with(&bvh, mesh.transform, ray, f32::INFINITY)
}

/// Casts a ray against a prebuilt accelerator for a mesh with `transform`.
pub(crate) fn raycast_with(
    bvh: &TriangleBvh,
    transform: Mat4,
    ray: &Ray,
    max_distance: f32,
) -> Option<RayHit> {
    if bvh.is_empty() {
        return None;
    }
    let to_local = transform.inverse();
    let local_dir = to_local.transform_vector3(ray.direction);
    let scale = local_dir.length();
    let local_ray = Ray::try_new(to_local.transform_point3(ray.origin), local_dir)?;

    let hit = bvh.raycast(&local_ray, max_distance * scale)?;
    let position = transform.transform_point3(local_ray.at(hit.distance));
    Some(RayHit {
        triangle: hit.triangle,
        distance: position.distance(ray.origin),
        position,
        barycentric: hit.barycentric,
    })
}

/// Interpolates the world-space vertex normal at a hit.
///
/// Falls back to the face normal when the mesh has no normals.
pub fn pick_normal(mesh: &MeshBuffers, hit: &RayHit) -> Option<Vec3> {
    let [a, b, c] = mesh.triangle(hit.triangle)?;
    let local = if mesh.has_normals() {
        let bc = hit.barycentric;
        mesh.normals[a] * bc.x + mesh.normals[b] * bc.y + mesh.normals[c] * bc.z
    } else {
        let p = &mesh.positions;
        (p[b] - p[a]).cross(p[c] - p[a])
    };
    mesh.normal_matrix().transform_vector3(local).try_normalize()
}

/// Camera state for screen-space picking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickContext {
    /// Projection times view matrix.
    pub view_proj: Mat4,
    /// Camera position in world space.
    pub camera_position: Vec3,
    /// Ignore vertices whose normal faces away from the camera.
    pub front_face_only: bool,
}

impl PickContext {
    /// Creates a context that picks front-facing vertices only.
    pub fn new(view_proj: Mat4, camera_position: Vec3) -> Self {
        Self {
            view_proj,
            camera_position,
            front_face_only: true,
        }
    }

    /// Sets whether back-facing vertices are ignored.
    pub fn with_front_face_only(mut self, front_face_only: bool) -> Self {
        self.front_face_only = front_face_only;
        self
    }

    /// Projects every vertex to NDC.
    ///
    /// Vertices behind the camera, or facing away when `front_face_only` is
    /// set, project to `None`.
    pub fn project(&self, mesh: &MeshBuffers) -> Vec<Option<Vec2>> {
        let mvp = self.view_proj * mesh.transform;
        let normal_matrix = mesh.normal_matrix();
        let cull = self.front_face_only && mesh.has_normals();

        mesh.positions
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let clip = mvp * p.extend(1.0);
                if clip.w <= 0.0 {
                    return None;
                }
                if cull {
                    let world = mesh.transform.transform_point3(p);
                    let normal = normal_matrix.transform_vector3(mesh.normals[i]);
                    if normal.dot(world - self.camera_position) > 0.0 {
                        return None;
                    }
                }
                Some(clip.truncate().truncate() / clip.w)
            })
            .collect()
    }
}

/// Finds the vertex inside `rect` nearest to its center.
///
/// Returns the vertex index and its world-space position.
pub fn pick_vertex(mesh: &MeshBuffers, ctx: &PickContext, rect: &Aabb2) -> Option<(usize, Vec3)> {
    let center = rect.center();
    ctx.project(mesh)
        .into_iter()
        .enumerate()
        .filter_map(|(i, p)| {
            p.filter(|&p| rect.contains_point(p))
                .map(|p| (i, p.distance_squared(center)))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| (i, mesh.transform.transform_point3(mesh.positions[i])))
}

/// Applies `strength` to the vertex nearest the center of `rect`.
pub fn select_single(
    mesh: &MeshBuffers,
    mask: &mut SelectionMask,
    ctx: &PickContext,
    rect: &Aabb2,
    strength: f32,
) -> usize {
    match pick_vertex(mesh, ctx, rect) {
        Some((i, _)) => usize::from(mask.apply(i, strength)),
        None => 0,
    }
}

/// Applies `strength` to every vertex projected inside `rect`.
pub fn select_rect(
    mesh: &MeshBuffers,
    mask: &mut SelectionMask,
    ctx: &PickContext,
    rect: &Aabb2,
    strength: f32,
) -> usize {
    let mut count = 0;
    for (i, p) in ctx.project(mesh).into_iter().enumerate() {
        if p.is_some_and(|p| rect.contains_point(p)) && mask.apply(i, strength) {
            count += 1;
        }
    }
    count
}

/// Applies `strength` to every vertex projected inside a lasso polygon.
///
/// Uses the even-odd rule; a lasso with fewer than three points selects nothing.
pub fn select_lasso(
    mesh: &MeshBuffers,
    mask: &mut SelectionMask,
    ctx: &PickContext,
    lasso: &[Vec2],
    strength: f32,
) -> usize {
    if lasso.len() < 3 {
        return 0;
    }
    let mut count = 0;
    for (i, p) in ctx.project(mesh).into_iter().enumerate() {
        if p.is_some_and(|p| point_in_polygon(p, lasso)) && mask.apply(i, strength) {
            count += 1;
        }
    }
    count
}

fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > point.y) != (b.y > point.y) {
            let crossing = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < crossing {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Applies a falloff-weighted stroke around a world-space point.
///
/// A vertex at distance `d <= radius` receives `strength * curve(d / radius)`.
/// Vertices outside the radius are left unchanged.
pub fn select_brush(
    mesh: &MeshBuffers,
    mask: &mut SelectionMask,
    center: Vec3,
    radius: f32,
    strength: f32,
    curve: &FalloffCurve,
) -> usize {
    if radius <= 0.0 {
        return 0;
    }
    let mut count = 0;
    for (i, &p) in mesh.positions.iter().enumerate() {
        let d = mesh.transform.transform_point3(p).distance(center);
        if d > radius {
            continue;
        }
        let w = strength * curve.sample(d / radius);
        if w != 0.0 && mask.apply(i, w) {
            count += 1;
        }
    }
    count
}

/// Applies `strength` to the three corners of the triangle hit by `ray`.
pub fn select_triangle(
    mesh: &MeshBuffers,
    mask: &mut SelectionMask,
    ray: &Ray,
    strength: f32,
) -> usize {
    let Some(corners) = raycast(mesh, ray).and_then(|hit| mesh.triangle(hit.triangle)) else {
        return 0;
    };
    corners.iter().filter(|&&i| mask.apply(i, strength)).count()
}

/// Starts a topology selection, optionally clearing the previous one.
///
/// Returns the vertices that were selected before clearing, or `None` when
/// the selection was empty.
fn take_seeds(mask: &mut SelectionMask, clear: bool) -> Option<Vec<usize>> {
    let seeds: Vec<usize> = mask.iter_selected().map(|(i, _)| i).collect();
    if clear {
        mask.clear();
    }
    (!seeds.is_empty()).then_some(seeds)
}

/// Selects vertices on open (boundary) edges.
///
/// With an existing selection only boundary vertices on the same connected
/// pieces of the mesh are selected; otherwise every boundary vertex is.
pub fn select_edge(
    topology: &Topology,
    mask: &mut SelectionMask,
    strength: f32,
    clear: bool,
) -> usize {
    let region = take_seeds(mask, clear).map(|seeds| topology.connected_region(seeds));
    let mut count = 0;
    for v in topology.boundary_vertices() {
        let in_region = region.as_ref().is_none_or(|r| r.get(v).copied().unwrap_or(false));
        if in_region && mask.apply(v, strength) {
            count += 1;
        }
    }
    count
}

/// Selects whole boundary loops (holes).
///
/// With an existing selection only loops that contain a selected vertex are
/// selected; otherwise every loop is.
pub fn select_hole(
    topology: &Topology,
    mask: &mut SelectionMask,
    strength: f32,
    clear: bool,
) -> usize {
    let n = mask.len();
    let seeds = take_seeds(mask, clear).map(|seeds| {
        let mut selected = vec![false; n];
        for v in seeds {
            selected[v] = true;
        }
        selected
    });
    let mut count = 0;
    for hole in topology.boundary_loops() {
        let touched = seeds
            .as_ref()
            .is_none_or(|s| hole.iter().any(|&v| s.get(v).copied().unwrap_or(false)));
        if !touched {
            continue;
        }
        count += hole.iter().filter(|&&v| mask.apply(v, strength)).count();
    }
    count
}

/// Grows the selection to every vertex connected to it across shared edges.
///
/// An empty selection applies `strength` to the whole mesh.
pub fn select_connected(
    topology: &Topology,
    mask: &mut SelectionMask,
    strength: f32,
    clear: bool,
) -> usize {
    let Some(seeds) = take_seeds(mask, clear) else {
        return (0..mask.len()).filter(|&v| mask.apply(v, strength)).count();
    };
    let region = topology.connected_region(seeds);
    region
        .iter()
        .enumerate()
        .filter(|&(v, &inside)| inside && mask.apply(v, strength))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhizome_tweak_mesh::MeshBuilder;

    /// Unit quad in the XY plane facing +Z.
    fn quad() -> MeshBuffers {
        let mut mesh = MeshBuffers::from_positions(
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        );
        mesh.compute_smooth_normals();
        mesh
    }

    /// Camera on +Z looking at the origin with an orthographic projection.
    fn front_camera() -> PickContext {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::orthographic_rh(-2.0, 2.0, -2.0, 2.0, 0.1, 10.0);
        PickContext::new(proj * view, Vec3::new(0.0, 0.0, 5.0))
    }

    #[test]
    fn test_raycast_hits_transformed_mesh() {
        let mesh = quad().with_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0)));
        let ray = Ray::new(Vec3::new(0.5, 0.5, 5.0), Vec3::NEG_Z);
        let hit = raycast(&mesh, &ray).unwrap();

        assert!((hit.distance - 7.0).abs() < 0.0001);
        assert!((hit.position - Vec3::new(0.5, 0.5, -2.0)).length() < 0.0001);
        assert!((hit.barycentric.element_sum() - 1.0).abs() < 0.0001);

        let normal = pick_normal(&mesh, &hit).unwrap();
        assert!((normal - Vec3::Z).length() < 0.0001);
    }

    #[test]
    fn test_raycast_scaled_distance_is_world() {
        let mesh = quad().with_transform(Mat4::from_scale(Vec3::splat(4.0)));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let hit = raycast(&mesh, &ray).unwrap();
        assert!((hit.distance - 10.0).abs() < 0.0001);
    }

    #[test]
    fn test_raycast_miss_and_empty() {
        let ray = Ray::new(Vec3::new(5.0, 5.0, 5.0), Vec3::NEG_Z);
        assert!(raycast(&quad(), &ray).is_none());
        assert!(raycast(&MeshBuffers::new(), &ray).is_none());
    }

    #[test]
    fn test_degenerate_triangle_never_hits() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0];
        let mesh = MeshBuffers::from_positions(positions, vec![0, 1, 2]);
        let ray = Ray::new(Vec3::new(1.0, 0.0, 1.0), Vec3::NEG_Z);
        assert!(raycast(&mesh, &ray).is_none());
    }

    #[test]
    fn test_pick_vertex_nearest_center() {
        let mesh = quad();
        let ctx = front_camera();
        // Vertex 2 at (1, 1) projects to (0.5, 0.5) in NDC
        let rect = Aabb2::from_corners(Vec2::new(0.3, 0.3), Vec2::new(0.6, 0.6));
        let (i, pos) = pick_vertex(&mesh, &ctx, &rect).unwrap();
        assert_eq!(i, 2);
        assert!((pos - Vec3::new(1.0, 1.0, 0.0)).length() < 0.0001);

        let empty = Aabb2::from_corners(Vec2::new(-0.1, -0.1), Vec2::new(0.1, 0.1));
        assert!(pick_vertex(&mesh, &ctx, &empty).is_none());
    }

    #[test]
    fn test_front_face_only_rejects_back_side() {
        let mesh = quad();
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::orthographic_rh(-2.0, 2.0, -2.0, 2.0, 0.1, 10.0);
        let ctx = PickContext::new(proj * view, Vec3::new(0.0, 0.0, -5.0));
        let all = Aabb2::from_corners(Vec2::splat(-1.0), Vec2::splat(1.0));

        let mut mask = SelectionMask::new(4);
        assert_eq!(select_rect(&mesh, &mut mask, &ctx, &all, 1.0), 0);

        let ctx = ctx.with_front_face_only(false);
        assert_eq!(select_rect(&mesh, &mut mask, &ctx, &all, 1.0), 4);
    }

    #[test]
    fn test_select_rect_and_deselect() {
        let mesh = quad();
        let ctx = front_camera();
        let right = Aabb2::from_corners(Vec2::new(0.0, -1.0), Vec2::new(1.0, 1.0));

        let mut mask = SelectionMask::new(4);
        assert_eq!(select_rect(&mesh, &mut mask, &ctx, &right, 1.0), 2);
        assert_eq!(mask.weights(), &[0.0, 1.0, 1.0, 0.0]);

        assert_eq!(select_rect(&mesh, &mut mask, &ctx, &right, -1.0), 2);
        assert_eq!(mask.num_selected(), 0);
    }

    #[test]
    fn test_select_single() {
        let mesh = quad();
        let ctx = front_camera();
        let mut mask = SelectionMask::new(4);
        let rect = Aabb2::from_corners(Vec2::new(-0.6, -0.6), Vec2::new(-0.4, -0.4));
        assert_eq!(select_single(&mesh, &mut mask, &ctx, &rect, 0.5), 1);
        assert_eq!(mask.get(0), 0.5);
    }

    #[test]
    fn test_select_lasso() {
        let mesh = quad();
        let ctx = front_camera();
        let mut mask = SelectionMask::new(4);
        // Triangle around the upper-left corner only
        let lasso = [Vec2::new(-0.9, 0.9), Vec2::new(0.0, 0.9), Vec2::new(-0.9, 0.0)];
        assert_eq!(select_lasso(&mesh, &mut mask, &ctx, &lasso, 1.0), 1);
        assert_eq!(mask.get(3), 1.0);

        assert_eq!(select_lasso(&mesh, &mut mask, &ctx, &lasso[..2], 1.0), 0);
    }

    #[test]
    fn test_select_brush_linear_falloff() {
        let mesh = MeshBuffers::from_positions(
            vec![Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)],
            vec![],
        );
        let mut mask = SelectionMask::from_weights([0.0, 0.0, 0.3]);
        let curve = FalloffCurve::linear();

        assert_eq!(select_brush(&mesh, &mut mask, Vec3::ZERO, 1.0, 1.0, &curve), 2);
        assert!((mask.get(0) - 1.0).abs() < 0.0001);
        assert!((mask.get(1) - 0.5).abs() < 0.001);
        assert_eq!(mask.get(2), 0.3);

        // A weaker positive stroke never lowers existing weights
        select_brush(&mesh, &mut mask, Vec3::ZERO, 1.0, 0.2, &curve);
        assert!((mask.get(0) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_select_triangle() {
        let mesh = quad();
        let mut mask = SelectionMask::new(4);
        let ray = Ray::new(Vec3::new(0.5, -0.5, 1.0), Vec3::NEG_Z);
        assert_eq!(select_triangle(&mesh, &mut mask, &ray, 1.0), 3);
        assert_eq!(mask.weights(), &[1.0, 1.0, 1.0, 0.0]);
    }

    /// Two disconnected quads.
    fn two_quads() -> MeshBuffers {
        let mut builder = MeshBuilder::new();
        for offset in [0.0, 5.0] {
            let a = builder.vertex(Vec3::new(offset, 0.0, 0.0));
            let b = builder.vertex(Vec3::new(offset + 1.0, 0.0, 0.0));
            let c = builder.vertex(Vec3::new(offset + 1.0, 1.0, 0.0));
            let d = builder.vertex(Vec3::new(offset, 1.0, 0.0));
            builder.quad(a, b, c, d);
        }
        builder.build()
    }

    #[test]
    fn test_select_connected() {
        let mesh = two_quads();
        let topology = Topology::new(&mesh.positions, &mesh.indices);

        let mut mask = SelectionMask::new(8);
        mask.set(0, 1.0);
        assert_eq!(select_connected(&topology, &mut mask, 1.0, false), 4);
        assert_eq!(mask.num_selected(), 4);
        assert_eq!(mask.get(5), 0.0);

        let mut empty = SelectionMask::new(8);
        assert_eq!(select_connected(&topology, &mut empty, 1.0, false), 8);
        assert_eq!(empty.num_selected(), 8);
    }

    #[test]
    fn test_select_connected_empty_uses_strength() {
        let mesh = two_quads();
        let topology = Topology::new(&mesh.positions, &mesh.indices);

        let mut mask = SelectionMask::new(8);
        assert_eq!(select_connected(&topology, &mut mask, 0.5, false), 8);
        assert!(mask.weights().iter().all(|&w| w == 0.5));

        let mut mask = SelectionMask::new(8);
        assert_eq!(select_connected(&topology, &mut mask, -1.0, false), 8);
        assert_eq!(mask.num_selected(), 0);
    }

    #[test]
    fn test_select_edge_and_hole() {
        let mesh = two_quads();
        let topology = Topology::new(&mesh.positions, &mesh.indices);

        let mut mask = SelectionMask::new(8);
        assert_eq!(select_edge(&topology, &mut mask, 1.0, false), 8);

        let mut mask = SelectionMask::new(8);
        mask.set(6, 1.0);
        assert_eq!(select_hole(&topology, &mut mask, 1.0, true), 4);
        assert_eq!(mask.get(0), 0.0);
        assert_eq!(mask.get(4), 1.0);

        // Seeds on both pieces pick both loops
        let mut mask = SelectionMask::new(8);
        mask.set(1, 1.0);
        mask.set(6, 1.0);
        assert_eq!(select_hole(&topology, &mut mask, 1.0, true), 8);

        // Nothing selected: every loop
        let mut mask = SelectionMask::new(8);
        assert_eq!(select_hole(&topology, &mut mask, 1.0, false), 8);
    }
}

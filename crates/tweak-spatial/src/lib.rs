//! Acceleration structures behind picking, projection and mirror pairing.
//!
//! - [`Aabb2`] / [`Aabb3`] - axis-aligned bounds (screen rectangles, primitive bounds)
//! - [`Ray`] - ray with slab test against bounds
//! - [`Bvh`] - bounding volume hierarchy for nearest-hit ray queries
//! - [`SpatialHash`] - uniform grid for radius queries
//! - [`TriangleBvh`] - nearest-hit ray casting against a triangle soup
//!
//! # Example
//!
//! ```
//! use rhizome_tweak_spatial::{Ray, TriangleBvh};
//! use glam::Vec3;
//!
//! let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
//! let bvh = TriangleBvh::build(&positions, &[0, 1, 2]);
//!
//! let ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::NEG_Z);
//! let hit = bvh.raycast(&ray, f32::MAX).unwrap();
//! assert_eq!(hit.triangle, 0);
//! assert!((hit.distance - 1.0).abs() < 1e-5);
//! ```

use std::collections::HashMap;

use glam::{Vec2, Vec3};

mod triangle;

pub use triangle::{TriangleBvh, TriangleHit, ray_triangle};

// ============================================================================
// Bounds
// ============================================================================

/// Axis-aligned rectangle, used for screen-space selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb2 {
    /// Lower-left corner.
    pub min: Vec2,
    /// Upper-right corner.
    pub max: Vec2,
}

impl Aabb2 {
    /// Spans two arbitrary corners, such as a drag start and end.
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Center point.
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Inclusive containment test.
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// 3D axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb3 {
    /// Creates a box from its corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Tightest box around `points`, or `None` if there are none.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (&first, rest) = points.split_first()?;
        let bounds = rest
            .iter()
            .fold(Self::new(first, first), |b, &p| Self::new(b.min.min(p), b.max.max(p)));
        Some(bounds)
    }

    /// Center point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Extent along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Index of the axis with the largest extent (0 = x, 1 = y, 2 = z).
    pub fn longest_axis(&self) -> usize {
        let s = self.size();
        if s.x >= s.y && s.x >= s.z {
            0
        } else if s.y >= s.z {
            1
        } else {
            2
        }
    }

    /// Box grown by `amount` on every side.
    pub fn expanded(&self, amount: f32) -> Self {
        Self::new(self.min - Vec3::splat(amount), self.max + Vec3::splat(amount))
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }
}

// ============================================================================
// Ray
// ============================================================================

/// A ray with a unit direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray, normalizing `direction`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Creates a ray, or `None` if the direction has no usable length.
    pub fn try_new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        Some(Self { origin, direction })
    }

    /// The same ray pointing the other way.
    pub fn reversed(&self) -> Self {
        Self {
            origin: self.origin,
            direction: -self.direction,
        }
    }

    /// Point at distance `t` along the ray.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test. Returns the entry and exit distances, with entry clamped
    /// to zero when the origin is inside the box.
    pub fn intersect_aabb(&self, aabb: &Aabb3) -> Option<(f32, f32)> {
        let inv = self.direction.recip();
        let t0 = (aabb.min - self.origin) * inv;
        let t1 = (aabb.max - self.origin) * inv;

        let near = t0.min(t1).max_element();
        let far = t0.max(t1).min_element();
        (far >= near && far >= 0.0).then(|| (near.max(0.0), far))
    }
}

// ============================================================================
// BVH
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf { bounds: Aabb3, item: usize },
    Branch { bounds: Aabb3, left: usize, right: usize },
}

impl Node {
    fn bounds(&self) -> &Aabb3 {
        match self {
            Node::Leaf { bounds, .. } | Node::Branch { bounds, .. } => bounds,
        }
    }
}

/// Bounding volume hierarchy over primitives with attached data.
///
/// Nodes live in one flat array. Each branch splits its primitives at the
/// median centroid along its longest axis.
#[derive(Debug, Clone)]
pub struct Bvh<T> {
    nodes: Vec<Node>,
    items: Vec<T>,
    root: Option<usize>,
}

impl<T> Bvh<T> {
    /// Builds the hierarchy from `(bounds, data)` pairs.
    pub fn build(primitives: Vec<(Aabb3, T)>) -> Self {
        let (bounds, items): (Vec<Aabb3>, Vec<T>) = primitives.into_iter().unzip();
        let mut order: Vec<usize> = (0..items.len()).collect();
        let mut nodes = Vec::with_capacity(items.len() * 2);
        let root = (!order.is_empty()).then(|| build_node(&bounds, &mut order, &mut nodes));
        Self { nodes, items, root }
    }

    /// Nearest primitive along `ray` according to an exact per-primitive test.
    ///
    /// `hit_test` returns the hit distance, if any. Hits beyond `max_t` are
    /// ignored; among equal distances the first one found is kept.
    pub fn closest_hit<F>(&self, ray: &Ray, max_t: f32, mut hit_test: F) -> Option<(&T, f32)>
    where
        F: FnMut(&T) -> Option<f32>,
    {
        let mut best: Option<(usize, f32)> = None;
        let mut stack: Vec<usize> = self.root.into_iter().collect();

        while let Some(index) = stack.pop() {
            let node = self.nodes[index];
            let Some((near, _)) = ray.intersect_aabb(node.bounds()) else {
                continue;
            };
            if near > best.map_or(max_t, |(_, t)| t) {
                continue;
            }
            match node {
                Node::Leaf { item, .. } => {
                    if let Some(t) = hit_test(&self.items[item]) {
                        if t <= max_t && best.is_none_or(|(_, b)| t < b) {
                            best = Some((item, t));
                        }
                    }
                }
                Node::Branch { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        best.map(|(item, t)| (&self.items[item], t))
    }

    /// Number of primitives.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no primitives.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn build_node(bounds: &[Aabb3], order: &mut [usize], nodes: &mut Vec<Node>) -> usize {
    if let [item] = *order {
        nodes.push(Node::Leaf {
            bounds: bounds[item],
            item,
        });
        return nodes.len() - 1;
    }

    let total = order[1..]
        .iter()
        .fold(bounds[order[0]], |acc, &i| acc.union(&bounds[i]));
    let axis = total.longest_axis();
    order.sort_by(|&a, &b| bounds[a].center()[axis].total_cmp(&bounds[b].center()[axis]));

    let (lo, hi) = order.split_at_mut(order.len() / 2);
    let left = build_node(bounds, lo, nodes);
    let right = build_node(bounds, hi, nodes);
    nodes.push(Node::Branch {
        bounds: total,
        left,
        right,
    });
    nodes.len() - 1
}

// ============================================================================
// Spatial Hash
// ============================================================================

type CellKey = (i64, i64, i64);

/// Uniform grid of points for radius queries.
///
/// # Example
///
/// ```
/// use rhizome_tweak_spatial::SpatialHash;
/// use glam::Vec3;
///
/// let mut hash = SpatialHash::new(1.0);
/// hash.insert(Vec3::ZERO, 0);
/// hash.insert(Vec3::new(0.5, 0.0, 0.0), 1);
/// hash.insert(Vec3::new(4.0, 0.0, 0.0), 2);
///
/// assert_eq!(hash.query_radius(Vec3::ZERO, 0.6).count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SpatialHash<T> {
    inv_cell_size: f32,
    cells: HashMap<CellKey, Vec<(Vec3, T)>>,
    len: usize,
}

impl<T> SpatialHash<T> {
    /// Creates an empty grid. Cells should be about twice the query radius.
    pub fn new(cell_size: f32) -> Self {
        Self {
            inv_cell_size: 1.0 / cell_size.max(f32::MIN_POSITIVE),
            cells: HashMap::new(),
            len: 0,
        }
    }

    fn cell_key(&self, p: Vec3) -> CellKey {
        let c = (p.as_dvec3() * f64::from(self.inv_cell_size)).floor();
        (c.x as i64, c.y as i64, c.z as i64)
    }

    /// Adds a point.
    pub fn insert(&mut self, position: Vec3, data: T) {
        let key = self.cell_key(position);
        self.cells.entry(key).or_default().push((position, data));
        self.len += 1;
    }

    /// Points within `radius` of `center` (inclusive), in no particular order.
    pub fn query_radius(&self, center: Vec3, radius: f32) -> impl Iterator<Item = (Vec3, &T)> {
        let reach = (f64::from(radius) * f64::from(self.inv_cell_size)).ceil() as i64;
        let (cx, cy, cz) = self.cell_key(center);
        let radius_sq = radius * radius;

        // Cells past the i64 range do not exist, so overflowing keys are skipped
        let axis = move |c: i64| (-reach..=reach).filter_map(move |d| c.checked_add(d));
        axis(cx)
            .flat_map(move |x| axis(cy).flat_map(move |y| axis(cz).map(move |z| (x, y, z))))
            .filter_map(|key| self.cells.get(&key))
            .flatten()
            .filter(move |(p, _)| p.distance_squared(center) <= radius_sq)
            .map(|(p, data)| (*p, data))
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no points were inserted.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_rect_from_drag() {
        let rect = Aabb2::from_corners(Vec2::new(0.5, -0.5), Vec2::new(-0.5, 0.5));
        assert_eq!(rect.min, Vec2::splat(-0.5));
        assert_eq!(rect.center(), Vec2::ZERO);
        assert!(rect.contains_point(Vec2::new(0.5, 0.5)));
        assert!(!rect.contains_point(Vec2::new(0.6, 0.0)));
    }

    #[test]
    fn test_bounds_of_triangle() {
        assert!(Aabb3::from_points(&[]).is_none());

        let points = [Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 3.0, 0.0), Vec3::ZERO];
        let b = Aabb3::from_points(&points).unwrap();
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 3.0, 0.0));
        assert_eq!(b.longest_axis(), 1);
        assert_eq!(b.expanded(0.5).size(), Vec3::new(3.0, 6.0, 1.0));
    }

    #[test]
    fn test_ray_slab() {
        let b = Aabb3::new(Vec3::splat(-1.0), Vec3::splat(1.0));

        let (near, far) = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z).intersect_aabb(&b).unwrap();
        assert!((near - 4.0).abs() < 1e-6);
        assert!((far - 6.0).abs() < 1e-6);

        // Origin inside the box
        let (near, _) = Ray::new(Vec3::ZERO, Vec3::X).intersect_aabb(&b).unwrap();
        assert_eq!(near, 0.0);

        assert!(Ray::new(Vec3::new(3.0, 0.0, -5.0), Vec3::Z).intersect_aabb(&b).is_none());
        assert!(Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z).intersect_aabb(&b).is_none());
    }

    #[test]
    fn test_ray_flat_box() {
        // Zero-thickness boxes still need a hit once expanded
        let flat = Aabb3::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 1.0)).expanded(1e-6);
        assert!(Ray::new(Vec3::new(0.2, 1.0, 0.3), Vec3::NEG_Y).intersect_aabb(&flat).is_some());
    }

    #[test]
    fn test_ray_try_new() {
        assert!(Ray::try_new(Vec3::ZERO, Vec3::ZERO).is_none());
        let ray = Ray::try_new(Vec3::ZERO, Vec3::new(0.0, 0.0, 3.0)).unwrap();
        assert!((ray.direction - Vec3::Z).length() < 1e-6);
        assert!((ray.reversed().at(2.0) - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-6);
    }

    #[test]
    fn test_bvh_empty() {
        let bvh: Bvh<u32> = Bvh::build(Vec::new());
        assert!(bvh.is_empty());
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(bvh.closest_hit(&ray, f32::MAX, |_| Some(0.0)).is_none());
    }

    #[test]
    fn test_bvh_closest_hit() {
        // Slabs stacked along z; the payload is the slab's front face
        let primitives: Vec<_> = [4.0f32, 0.0, 8.0, 2.0, 6.0]
            .into_iter()
            .map(|z| (Aabb3::new(Vec3::new(0.0, 0.0, z), Vec3::new(1.0, 1.0, z + 1.0)), z))
            .collect();
        let bvh = Bvh::build(primitives);
        assert_eq!(bvh.len(), 5);

        let ray = Ray::new(Vec3::new(0.5, 0.5, -5.0), Vec3::Z);
        let (z, t) = bvh.closest_hit(&ray, f32::MAX, |z| Some(z + 5.0)).unwrap();
        assert_eq!(*z, 0.0);
        assert!((t - 5.0).abs() < 1e-6);

        // Exact test rejecting the nearest slabs
        let (z, _) = bvh
            .closest_hit(&ray, f32::MAX, |&z| (z >= 3.0).then_some(z + 5.0))
            .unwrap();
        assert_eq!(*z, 4.0);

        assert!(bvh.closest_hit(&ray, 4.0, |z| Some(z + 5.0)).is_none());
    }

    #[test]
    fn test_spatial_hash_radius() {
        let mut hash = SpatialHash::new(10.0);
        hash.insert(Vec3::ZERO, "a");
        hash.insert(Vec3::new(5.0, 0.0, 0.0), "b");
        hash.insert(Vec3::new(20.0, 0.0, 0.0), "c");
        assert_eq!(hash.len(), 3);

        assert_eq!(hash.query_radius(Vec3::ZERO, 6.0).count(), 2);
        let near: Vec<_> = hash.query_radius(Vec3::ZERO, 3.0).collect();
        assert_eq!(near, vec![(Vec3::ZERO, &"a")]);
    }

    #[test]
    fn test_spatial_hash_tiny_cells_across_origin() {
        let mut hash = SpatialHash::new(0.0002);
        hash.insert(Vec3::new(-0.0004, 0.0, 0.0), 0);
        hash.insert(Vec3::new(0.0004, 0.0, 0.0), 1);

        let hits: Vec<_> = hash.query_radius(Vec3::new(0.00041, 0.0, 0.0), 0.0001).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(*hits[0].1, 1);
    }

    #[test]
    fn test_spatial_hash_far_points_small_cells() {
        // Cell indices beyond the i32 range
        let mut hash = SpatialHash::new(2e-6);
        hash.insert(Vec3::new(-5000.0, 0.0, 0.0), 0);
        hash.insert(Vec3::new(5000.0, 0.0, 0.0), 1);

        let hits: Vec<_> = hash.query_radius(Vec3::new(5000.0, 0.0, 0.0), 1e-6).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(*hits[0].1, 1);
    }

    #[test]
    fn test_spatial_hash_extreme_coordinates() {
        let mut hash = SpatialHash::new(1e-6);
        hash.insert(Vec3::splat(f32::MAX), 0);
        hash.insert(Vec3::splat(f32::MIN), 1);

        assert_eq!(hash.query_radius(Vec3::splat(f32::MAX), 1e-6).count(), 1);
        assert_eq!(hash.query_radius(Vec3::splat(f32::MIN), 1e-6).count(), 1);
    }
}

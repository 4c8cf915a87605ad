//! Soft vertex selection.

use glam::{Mat3, Mat4, Quat, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-vertex selection weights in `0..=1`.
///
/// Zero means unselected, one fully selected; values in between come from
/// brush falloff and scale how strongly an edit affects the vertex.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SelectionMask {
    weights: Vec<f32>,
}

impl SelectionMask {
    /// Creates an empty selection for `vertex_count` vertices.
    pub fn new(vertex_count: usize) -> Self {
        Self {
            weights: vec![0.0; vertex_count],
        }
    }

    /// Creates a selection from raw weights, clamped to `0..=1`.
    pub fn from_weights(weights: impl IntoIterator<Item = f32>) -> Self {
        Self {
            weights: weights.into_iter().map(|w| w.clamp(0.0, 1.0)).collect(),
        }
    }

    /// Creates a fully selected mask.
    pub fn all(vertex_count: usize) -> Self {
        Self {
            weights: vec![1.0; vertex_count],
        }
    }

    /// Returns the number of vertices covered.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Returns true if the mask covers no vertices.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Returns all weights.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Returns the weight of a vertex (zero if out of range).
    pub fn get(&self, vertex: usize) -> f32 {
        self.weights.get(vertex).copied().unwrap_or(0.0)
    }

    /// Sets the weight of a vertex, clamped to `0..=1`.
    pub fn set(&mut self, vertex: usize, weight: f32) {
        if let Some(w) = self.weights.get_mut(vertex) {
            *w = weight.clamp(0.0, 1.0);
        }
    }

    /// Applies a selection stroke to one vertex.
    ///
    /// Positive strength raises the weight to at least `strength`; negative
    /// strength subtracts from it. Returns false if the vertex is out of range.
    pub fn apply(&mut self, vertex: usize, strength: f32) -> bool {
        let Some(w) = self.weights.get_mut(vertex) else {
            return false;
        };
        *w = if strength >= 0.0 {
            w.max(strength.min(1.0))
        } else {
            (*w + strength).clamp(0.0, 1.0)
        };
        true
    }

    /// Deselects every vertex.
    pub fn clear(&mut self) {
        self.weights.fill(0.0);
    }

    /// Fully selects every vertex.
    pub fn select_all(&mut self) {
        self.weights.fill(1.0);
    }

    /// Replaces every weight `w` with `1 - w`.
    pub fn invert(&mut self) {
        for w in &mut self.weights {
            *w = 1.0 - *w;
        }
    }

    /// Counts vertices with a positive weight.
    pub fn num_selected(&self) -> usize {
        self.weights.iter().filter(|&&w| w > 0.0).count()
    }

    /// Returns true if any vertex has a positive weight.
    pub fn any_selected(&self) -> bool {
        self.weights.iter().any(|&w| w > 0.0)
    }

    /// Returns indices and weights of selected vertices.
    pub fn iter_selected(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.weights
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, w)| w > 0.0)
    }

    /// Computes the weighted world-space center and average normal of the
    /// selection, or `None` when nothing is selected.
    pub fn summary(
        &self,
        positions: &[Vec3],
        normals: &[Vec3],
        transform: Mat4,
    ) -> Option<SelectionSummary> {
        let normal_matrix = transform.inverse().transpose();
        let mut count = 0;
        let mut total = 0.0;
        let mut center = Vec3::ZERO;
        let mut normal = Vec3::ZERO;

        for (i, w) in self.iter_selected() {
            let Some(&p) = positions.get(i) else {
                continue;
            };
            count += 1;
            total += w;
            center += transform.transform_point3(p) * w;
            if let Some(&n) = normals.get(i) {
                normal += normal_matrix.transform_vector3(n).normalize_or_zero() * w;
            }
        }

        (count > 0 && total > 0.0).then(|| SelectionSummary {
            count,
            center: center / total,
            normal: normal.normalize_or_zero(),
        })
    }
}

/// Where the selection sits, used to place the transform pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionSummary {
    /// Number of selected vertices.
    pub count: usize,
    /// Weighted center in world space.
    pub center: Vec3,
    /// Weighted average normal in world space (zero if normals cancel out).
    pub normal: Vec3,
}

impl SelectionSummary {
    /// Rotation whose forward (+Z) axis points along the average normal.
    pub fn rotation(&self) -> Quat {
        look_rotation(self.normal, Vec3::Y)
    }
}

/// Rotation that maps +Z onto `forward`, keeping +Y as close to `up` as possible.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let z = forward.normalize_or_zero();
    if z == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let x = up.cross(z);
    if x.length_squared() < 1e-12 {
        return Quat::from_rotation_arc(Vec3::Z, z);
    }
    let x = x.normalize();
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z))
}

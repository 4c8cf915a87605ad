//! Core mesh buffer types.

use glam::{Mat4, Vec2, Vec3, Vec4};
use rhizome_tweak_core::{TangentPrecision, VertexChannel, VertexChannels, VertexChannelsMut};

use crate::error::{MeshError, Result};
use crate::tangents::compute_tangents;

/// Vertex attributes of one mesh plus its local-to-world transform.
///
/// All per-vertex arrays are parallel to `positions`. Normals, tangents and
/// UVs may be empty when the source has none; [`MeshBuffers::validate`]
/// accepts either an empty or a full-length array for each of them.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffers {
    /// Vertex positions in local space.
    pub positions: Vec<Vec3>,
    /// Vertex normals in local space.
    pub normals: Vec<Vec3>,
    /// Vertex tangents in local space; `w` is the bitangent sign.
    pub tangents: Vec<Vec4>,
    /// Texture coordinates (first channel).
    pub uvs: Vec<Vec2>,
    /// Triangle indices (every 3 indices form a triangle).
    pub indices: Vec<u32>,
    /// Local-to-world matrix.
    pub transform: Mat4,
}

impl Default for MeshBuffers {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            tangents: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
            transform: Mat4::IDENTITY,
        }
    }
}

impl MeshBuffers {
    /// Creates empty buffers with an identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates buffers with pre-allocated capacity.
    pub fn with_capacity(vertices: usize, triangles: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices),
            normals: Vec::with_capacity(vertices),
            tangents: Vec::with_capacity(vertices),
            uvs: Vec::with_capacity(vertices),
            indices: Vec::with_capacity(triangles * 3),
            transform: Mat4::IDENTITY,
        }
    }

    /// Creates buffers from positions and triangle indices only.
    pub fn from_positions(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            ..Self::default()
        }
    }

    /// Sets the local-to-world transform.
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Vertex count.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Complete triangles in the index buffer.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True for a mesh without vertices.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// True if every vertex has a normal.
    pub fn has_normals(&self) -> bool {
        self.has_channel(VertexChannel::Normal)
    }

    /// True if every vertex has a tangent.
    pub fn has_tangents(&self) -> bool {
        self.has_channel(VertexChannel::Tangent)
    }

    /// True if every vertex has a UV.
    pub fn has_uvs(&self) -> bool {
        !self.is_empty() && self.uvs.len() == self.positions.len()
    }

    /// Checks that attribute lengths match and every index is in range.
    pub fn validate(&self) -> Result<()> {
        let n = self.positions.len();
        let optional = [
            ("normals", self.normals.len()),
            ("tangents", self.tangents.len()),
            ("uvs", self.uvs.len()),
        ];
        for (attribute, got) in optional {
            if got != 0 && got != n {
                return Err(MeshError::AttributeLength {
                    attribute,
                    expected: n,
                    got,
                });
            }
        }

        if self.indices.len() % 3 != 0 {
            return Err(MeshError::PartialTriangle(self.indices.len()));
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= n) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: n,
            });
        }
        Ok(())
    }

    /// Returns the vertex indices of a triangle, if it exists and is in range.
    pub fn triangle(&self, index: usize) -> Option<[usize; 3]> {
        let tri = self.indices.get(index * 3..index * 3 + 3)?;
        let corners = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        corners
            .iter()
            .all(|&i| i < self.positions.len())
            .then_some(corners)
    }

    /// Recomputes smooth normals by averaging area-weighted face normals.
    pub fn compute_smooth_normals(&mut self) {
        self.normals = smooth_normals(&self.positions, &self.indices);
    }

    /// Recomputes tangents from positions, normals and UVs.
    pub fn compute_tangents(&mut self, precision: TangentPrecision) {
        if !self.has_normals() {
            self.compute_smooth_normals();
        }
        self.tangents = compute_tangents(
            &self.positions,
            &self.normals,
            &self.uvs,
            &self.indices,
            precision,
        );
    }

    /// Fills in normals and tangents when the source did not provide them.
    pub fn ensure_normals_and_tangents(&mut self, precision: TangentPrecision) {
        if !self.has_normals() {
            self.compute_smooth_normals();
        }
        if !self.has_tangents() {
            self.compute_tangents(precision);
        }
    }

    /// Returns the matrix that maps local normals to world space.
    pub fn normal_matrix(&self) -> Mat4 {
        self.transform.inverse().transpose()
    }

    /// Returns positions transformed to world space.
    pub fn world_positions(&self) -> Vec<Vec3> {
        self.positions
            .iter()
            .map(|p| self.transform.transform_point3(*p))
            .collect()
    }

    /// Returns normals transformed to world space.
    pub fn world_normals(&self) -> Vec<Vec3> {
        let normal_matrix = self.normal_matrix();
        self.normals
            .iter()
            .map(|n| normal_matrix.transform_vector3(*n).normalize_or_zero())
            .collect()
    }
}

/// Iterates over triangles whose corners are all below `vertex_count`.
///
/// Yields `(triangle_index, [i0, i1, i2])`. A trailing partial triangle is ignored.
pub fn valid_triangles(
    indices: &[u32],
    vertex_count: usize,
) -> impl Iterator<Item = (usize, [usize; 3])> + '_ {
    indices
        .chunks_exact(3)
        .enumerate()
        .filter_map(move |(t, tri)| {
            let corners = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            corners
                .iter()
                .all(|&i| i < vertex_count)
                .then_some((t, corners))
        })
}

/// Computes smooth vertex normals by averaging adjacent face normals.
pub fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut sums = vec![Vec3::ZERO; positions.len()];
    for (_, corners) in valid_triangles(indices, positions.len()) {
        let [a, b, c] = corners.map(|i| positions[i]);
        // Cross product length is twice the area, so larger faces weigh more
        let face = (b - a).cross(c - a);
        for i in corners {
            sums[i] += face;
        }
    }
    sums.into_iter().map(Vec3::normalize_or_zero).collect()
}

impl VertexChannels for MeshBuffers {
    fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    fn tangents(&self) -> &[Vec4] {
        &self.tangents
    }
}

impl VertexChannelsMut for MeshBuffers {
    fn positions_mut(&mut self) -> &mut [Vec3] {
        &mut self.positions
    }

    fn normals_mut(&mut self) -> &mut [Vec3] {
        &mut self.normals
    }

    fn tangents_mut(&mut self) -> &mut [Vec4] {
        &mut self.tangents
    }
}

/// Incremental mesh construction, used for fixtures and procedural shapes.
///
/// Vertex methods return the new vertex's index for use in faces. Mixing
/// [`MeshBuilder::vertex`] with [`MeshBuilder::vertex_with_normal_uv`] leaves
/// the normal and UV arrays short, which [`MeshBuffers::validate`] rejects.
#[derive(Debug, Clone, Default)]
pub struct MeshBuilder {
    mesh: MeshBuffers,
}

impl MeshBuilder {
    /// Starts an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_index(&self) -> u32 {
        self.mesh.positions.len() as u32
    }

    /// Appends a bare position.
    pub fn vertex(&mut self, position: Vec3) -> u32 {
        let index = self.next_index();
        self.mesh.positions.push(position);
        index
    }

    /// Appends a position with its normal and UV.
    pub fn vertex_with_normal_uv(&mut self, position: Vec3, normal: Vec3, uv: Vec2) -> u32 {
        self.mesh.normals.push(normal);
        self.mesh.uvs.push(uv);
        self.vertex(position)
    }

    /// Appends one triangle.
    pub fn triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.mesh.indices.extend([i0, i1, i2]);
    }

    /// Appends a quad as the triangles `(a, b, c)` and `(a, c, d)`.
    pub fn quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.triangle(a, b, c);
        self.triangle(a, c, d);
    }

    /// Finishes the mesh with an identity transform.
    pub fn build(self) -> MeshBuffers {
        self.mesh
    }
}

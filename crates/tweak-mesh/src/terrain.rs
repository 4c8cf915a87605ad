//! Terrain heightfields and their conversion to mesh buffers.

use glam::{Vec2, Vec3};

use crate::buffers::MeshBuffers;
use crate::error::{MeshError, Result};

/// Normalized terrain heights on a `width x depth` sample grid, `x` fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightfield {
    samples: Vec<f32>,
    width: usize,
    depth: usize,
}

impl Heightfield {
    /// A flat field. Both dimensions are raised to at least 2 samples.
    pub fn new(width: usize, depth: usize) -> Self {
        let (width, depth) = (width.max(2), depth.max(2));
        Self {
            samples: vec![0.0; width * depth],
            width,
            depth,
        }
    }

    /// Wraps row-major samples, checking they fill a grid of at least 2x2.
    pub fn from_data(samples: Vec<f32>, width: usize, depth: usize) -> Result<Self> {
        if width >= 2 && depth >= 2 && samples.len() == width * depth {
            return Ok(Self {
                samples,
                width,
                depth,
            });
        }
        Err(MeshError::InvalidHeightfield {
            width,
            depth,
            got: samples.len(),
        })
    }

    /// Samples along `x`.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Samples along `z`.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Total sample count, which is also the vertex count of the terrain mesh.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if there are no samples. Constructors never produce such a field.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn offset(&self, x: usize, z: usize) -> Option<usize> {
        (x < self.width && z < self.depth).then(|| z * self.width + x)
    }

    /// Height at grid cell `(x, z)`.
    pub fn height(&self, x: usize, z: usize) -> Option<f32> {
        self.offset(x, z).map(|i| self.samples[i])
    }

    /// Overwrites the height at `(x, z)`. Returns false when out of range.
    pub fn set_height(&mut self, x: usize, z: usize, height: f32) -> bool {
        match self.offset(x, z) {
            Some(i) => {
                self.samples[i] = height;
                true
            }
            None => false,
        }
    }

    /// Row-major samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// World-space position of sample `(x, z)` on a terrain spanning `size`.
    ///
    /// Out-of-range coordinates are clamped to the border.
    pub fn point(&self, x: usize, z: usize, size: Vec3) -> Vec3 {
        let x = x.min(self.width - 1);
        let z = z.min(self.depth - 1);
        let uv = self.uv(x, z);
        let h = self.samples[z * self.width + x];
        Vec3::new(uv.x * size.x, h * size.y, uv.y * size.z)
    }

    fn uv(&self, x: usize, z: usize) -> Vec2 {
        Vec2::new(
            x as f32 / (self.width - 1) as f32,
            z as f32 / (self.depth - 1) as f32,
        )
    }

    /// Surface normal at `(x, z)` for a terrain spanning `size`.
    ///
    /// Built from the central-difference tangents along `x` and `z`; at the
    /// border the difference is one-sided. A degenerate size gives `+Y`.
    pub fn normal(&self, x: usize, z: usize, size: Vec3) -> Vec3 {
        let along_x = self.point(x + 1, z, size) - self.point(x.saturating_sub(1), z, size);
        let along_z = self.point(x, z + 1, size) - self.point(x, z.saturating_sub(1), size);
        along_z.cross(along_x).try_normalize().unwrap_or(Vec3::Y)
    }

    /// Builds the terrain mesh: vertex `(x, z)` at index `z * width + x`,
    /// UVs over `0..1` and two triangles per cell.
    pub fn to_mesh_sized(&self, size: Vec3) -> MeshBuffers {
        let cells = (self.width - 1) * (self.depth - 1);
        let mut mesh = MeshBuffers::with_capacity(self.len(), cells * 2);

        let grid = (0..self.depth).flat_map(|z| (0..self.width).map(move |x| (x, z)));
        for (x, z) in grid {
            mesh.positions.push(self.point(x, z, size));
            mesh.normals.push(self.normal(x, z, size));
            mesh.uvs.push(self.uv(x, z));
        }

        let row = self.width as u32;
        for z in 0..(self.depth - 1) as u32 {
            for x in 0..(self.width - 1) as u32 {
                let near = z * row + x;
                let far = near + row;
                mesh.indices
                    .extend_from_slice(&[near, far, near + 1, near + 1, far, far + 1]);
            }
        }
        mesh
    }
}

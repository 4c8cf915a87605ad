//! Host mesh assets and their stored blend shapes.

use glam::Vec3;
use rhizome_tweak_core::{VertexChannel, VertexChannelsMut};

use crate::buffers::MeshBuffers;
use crate::error::{MeshError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One weighted frame of a blend shape.
///
/// Delta arrays are either empty (attribute unaffected) or one entry per vertex.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlendShapeFrame {
    /// Slider weight at which the frame is fully applied.
    pub weight: f32,
    /// Position offsets.
    pub delta_positions: Vec<Vec3>,
    /// Normal offsets.
    pub delta_normals: Vec<Vec3>,
    /// Tangent offsets (`xyz` only).
    pub delta_tangents: Vec<Vec3>,
}

impl BlendShapeFrame {
    /// Offsets stored for one channel; empty when the frame leaves it alone.
    pub fn deltas(&self, channel: VertexChannel) -> &[Vec3] {
        match channel {
            VertexChannel::Position => &self.delta_positions,
            VertexChannel::Normal => &self.delta_normals,
            VertexChannel::Tangent => &self.delta_tangents,
        }
    }
}

/// A named blend shape made of frames in ascending weight order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlendShape {
    /// Shape name, unique per mesh.
    pub name: String,
    /// Frames sorted by strictly increasing weight.
    pub frames: Vec<BlendShapeFrame>,
}

impl BlendShape {
    /// Returns the interpolated deltas at a slider weight, or `None` if the
    /// shape has no frames or the weight is zero.
    ///
    /// Below the first frame the first frame is scaled from zero. Between two
    /// frames the deltas are linearly interpolated. Above the last frame the
    /// last segment is extrapolated.
    pub fn evaluate(
        &self,
        weight: f32,
    ) -> Option<(f32, &BlendShapeFrame, Option<&BlendShapeFrame>)> {
        let first = self.frames.first()?;
        if weight == 0.0 {
            return None;
        }
        if self.frames.len() == 1 || weight <= first.weight {
            let t = if first.weight != 0.0 { weight / first.weight } else { 1.0 };
            return Some((t, first, None));
        }

        let upper = self
            .frames
            .iter()
            .position(|f| f.weight >= weight)
            .unwrap_or(self.frames.len() - 1)
            .max(1);
        let a = &self.frames[upper - 1];
        let b = &self.frames[upper];
        let span = b.weight - a.weight;
        let t = if span > 0.0 { (weight - a.weight) / span } else { 1.0 };
        Some((t, b, Some(a)))
    }
}

/// A mesh as stored by the host, including its blend shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAsset {
    /// Asset name.
    pub name: String,
    /// Whether vertex data can be read back.
    pub readable: bool,
    /// Vertex data in the mesh's local space.
    pub buffers: MeshBuffers,
    /// Stored blend shapes.
    pub blend_shapes: Vec<BlendShape>,
}

impl MeshAsset {
    /// Creates a readable asset with no blend shapes.
    pub fn new(name: impl Into<String>, buffers: MeshBuffers) -> Self {
        Self {
            name: name.into(),
            readable: true,
            buffers,
            blend_shapes: Vec::new(),
        }
    }

    /// Marks the asset as readable or not.
    pub fn with_readable(mut self, readable: bool) -> Self {
        self.readable = readable;
        self
    }

    /// Returns the vertex count.
    pub fn vertex_count(&self) -> usize {
        self.buffers.vertex_count()
    }

    /// Returns the number of blend shapes.
    pub fn blend_shape_count(&self) -> usize {
        self.blend_shapes.len()
    }

    /// Looks up a blend shape by name.
    pub fn blend_shape(&self, name: &str) -> Option<&BlendShape> {
        self.blend_shapes.iter().find(|s| s.name == name)
    }

    /// Returns the index of a blend shape by name.
    pub fn blend_shape_index(&self, name: &str) -> Option<usize> {
        self.blend_shapes.iter().position(|s| s.name == name)
    }

    /// Removes every blend shape.
    pub fn clear_blend_shapes(&mut self) {
        self.blend_shapes.clear();
    }

    /// Appends a frame to the named blend shape, creating the shape if needed.
    ///
    /// Delta arrays must be empty or match the vertex count, and the weight must
    /// be above the weight of the shape's last frame.
    pub fn add_blend_shape_frame(
        &mut self,
        name: &str,
        weight: f32,
        delta_positions: Vec<Vec3>,
        delta_normals: Vec<Vec3>,
        delta_tangents: Vec<Vec3>,
    ) -> Result<()> {
        let n = self.vertex_count();
        let arrays = [
            ("delta_positions", delta_positions.len()),
            ("delta_normals", delta_normals.len()),
            ("delta_tangents", delta_tangents.len()),
        ];
        for (attribute, got) in arrays {
            if got != 0 && got != n {
                return Err(MeshError::AttributeLength {
                    attribute,
                    expected: n,
                    got,
                });
            }
        }

        let frame = BlendShapeFrame {
            weight,
            delta_positions,
            delta_normals,
            delta_tangents,
        };

        match self.blend_shapes.iter_mut().find(|s| s.name == name) {
            Some(shape) => {
                if shape.frames.last().is_some_and(|last| weight <= last.weight) {
                    return Err(MeshError::FrameWeightOrder {
                        shape: name.to_string(),
                        weight,
                    });
                }
                shape.frames.push(frame);
            }
            None => self.blend_shapes.push(BlendShape {
                name: name.to_string(),
                frames: vec![frame],
            }),
        }
        Ok(())
    }

    /// Evaluates blend shapes at the given slider weights (one per shape,
    /// missing entries count as zero) and returns the deformed buffers.
    pub fn apply_blend_shapes(&self, weights: &[f32]) -> MeshBuffers {
        let mut out = self.buffers.clone();

        for (shape, &weight) in self.blend_shapes.iter().zip(weights) {
            let Some((t, upper, lower)) = shape.evaluate(weight) else {
                continue;
            };

            let n = out.vertex_count();
            for channel in VertexChannel::ALL {
                let from = lower.map_or(&[][..], |f| f.deltas(channel));
                let to = upper.deltas(channel);
                let offsets: Vec<Vec3> = (0..n).map(|i| lerp_delta(from, to, t, i)).collect();
                out.offset_channel(channel, &offsets);
            }
        }
        out
    }
}

fn lerp_delta(lower: &[Vec3], upper: &[Vec3], t: f32, i: usize) -> Vec3 {
    let a = lower.get(i).copied().unwrap_or(Vec3::ZERO);
    let b = upper.get(i).copied().unwrap_or(Vec3::ZERO);
    a + (b - a) * t
}

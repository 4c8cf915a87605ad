//! Per-vertex channels shared by meshes and blend-shape frames.
//!
//! A blend-shape frame stores one offset array per channel. [`VertexChannels`]
//! gives delta extraction read access to any buffer holder, and
//! [`VertexChannelsMut`] lets frame evaluation add offsets back.

use glam::{Vec3, Vec4};

/// A per-vertex attribute a blend-shape frame can offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VertexChannel {
    /// Vertex positions.
    Position,
    /// Vertex normals.
    Normal,
    /// Tangent directions (`xyz`; the sign in `w` is never offset).
    Tangent,
}

impl VertexChannel {
    /// Every channel, in storage order.
    pub const ALL: [VertexChannel; 3] = [
        VertexChannel::Position,
        VertexChannel::Normal,
        VertexChannel::Tangent,
    ];
}

/// Read access to vertex channels.
///
/// Normals and tangents may be empty. A channel counts as present only when
/// it has one entry per position.
pub trait VertexChannels {
    /// Vertex positions.
    fn positions(&self) -> &[Vec3];

    /// Vertex normals, or an empty slice.
    fn normals(&self) -> &[Vec3];

    /// Vertex tangents, or an empty slice. `w` is the bitangent sign.
    fn tangents(&self) -> &[Vec4];

    /// Number of vertices.
    fn vertex_count(&self) -> usize {
        self.positions().len()
    }

    /// True if `channel` is filled for every vertex.
    fn has_channel(&self, channel: VertexChannel) -> bool {
        let n = self.vertex_count();
        let len = match channel {
            VertexChannel::Position => n,
            VertexChannel::Normal => self.normals().len(),
            VertexChannel::Tangent => self.tangents().len(),
        };
        n > 0 && len == n
    }

    /// Copies `channel` out as directions.
    ///
    /// Tangents drop their sign. Absent channels yield zeros.
    fn channel_xyz(&self, channel: VertexChannel) -> Vec<Vec3> {
        if !self.has_channel(channel) {
            return vec![Vec3::ZERO; self.vertex_count()];
        }
        match channel {
            VertexChannel::Position => self.positions().to_vec(),
            VertexChannel::Normal => self.normals().to_vec(),
            VertexChannel::Tangent => self.tangents().iter().map(|t| t.truncate()).collect(),
        }
    }
}

/// Write access to vertex channels.
pub trait VertexChannelsMut: VertexChannels {
    /// Mutable vertex positions.
    fn positions_mut(&mut self) -> &mut [Vec3];

    /// Mutable vertex normals.
    fn normals_mut(&mut self) -> &mut [Vec3];

    /// Mutable vertex tangents.
    fn tangents_mut(&mut self) -> &mut [Vec4];

    /// Adds `offsets` to `channel`, one per vertex.
    ///
    /// Normals and tangent directions are renormalized afterwards. Missing
    /// offsets count as zero and an absent channel is left alone.
    fn offset_channel(&mut self, channel: VertexChannel, offsets: &[Vec3]) {
        if !self.has_channel(channel) {
            return;
        }
        match channel {
            VertexChannel::Position => {
                for (p, d) in self.positions_mut().iter_mut().zip(offsets) {
                    *p += *d;
                }
            }
            VertexChannel::Normal => {
                for (n, d) in self.normals_mut().iter_mut().zip(offsets) {
                    *n = (*n + *d).normalize_or_zero();
                }
            }
            VertexChannel::Tangent => {
                for (t, d) in self.tangents_mut().iter_mut().zip(offsets) {
                    *t = (t.truncate() + *d).normalize_or_zero().extend(t.w);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Verts {
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        tangents: Vec<Vec4>,
    }

    impl VertexChannels for Verts {
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

    impl VertexChannelsMut for Verts {
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

    #[test]
    fn test_partial_channel_is_absent() {
        let verts = Verts {
            positions: vec![Vec3::ZERO, Vec3::X],
            normals: vec![Vec3::Y],
            ..Default::default()
        };
        assert!(verts.has_channel(VertexChannel::Position));
        assert!(!verts.has_channel(VertexChannel::Normal));
        assert!(!verts.has_channel(VertexChannel::Tangent));
        assert_eq!(verts.channel_xyz(VertexChannel::Normal), vec![Vec3::ZERO; 2]);
    }

    #[test]
    fn test_empty_has_no_channels() {
        let verts = Verts::default();
        assert!(!verts.has_channel(VertexChannel::Position));
    }

    #[test]
    fn test_offset_keeps_tangent_sign() {
        let mut verts = Verts {
            positions: vec![Vec3::ZERO],
            normals: vec![Vec3::Y],
            tangents: vec![Vec4::new(1.0, 0.0, 0.0, -1.0)],
        };
        verts.offset_channel(VertexChannel::Position, &[Vec3::Z]);
        verts.offset_channel(VertexChannel::Normal, &[Vec3::new(0.0, 1.0, 0.0)]);
        verts.offset_channel(VertexChannel::Tangent, &[Vec3::new(-1.0, 0.0, 1.0)]);

        assert_eq!(verts.positions[0], Vec3::Z);
        assert_eq!(verts.normals[0], Vec3::Y);
        assert_eq!(verts.tangents[0], Vec4::new(0.0, 0.0, 1.0, -1.0));
    }

    #[test]
    fn test_short_offsets_leave_tail() {
        let mut verts = Verts {
            positions: vec![Vec3::ZERO, Vec3::X],
            ..Default::default()
        };
        verts.offset_channel(VertexChannel::Position, &[Vec3::Y]);
        assert_eq!(verts.positions, vec![Vec3::Y, Vec3::X]);
    }
}

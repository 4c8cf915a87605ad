//! Per-vertex attribute deltas between a base and a target mesh.

use glam::Vec3;
use rhizome_tweak_core::{AttributeMask, VertexChannel, VertexChannels};

/// Delta arrays for one blend-shape frame, one entry per base vertex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameDeltas {
    /// Position offsets.
    pub positions: Vec<Vec3>,
    /// Normal offsets.
    pub normals: Vec<Vec3>,
    /// Tangent offsets (`xyz` only).
    pub tangents: Vec<Vec3>,
}

impl FrameDeltas {
    /// All-zero deltas for `n` vertices.
    pub fn zero(n: usize) -> Self {
        Self {
            positions: vec![Vec3::ZERO; n],
            normals: vec![Vec3::ZERO; n],
            tangents: vec![Vec3::ZERO; n],
        }
    }

    /// Offsets for one channel.
    pub fn channel(&self, channel: VertexChannel) -> &[Vec3] {
        match channel {
            VertexChannel::Position => &self.positions,
            VertexChannel::Normal => &self.normals,
            VertexChannel::Tangent => &self.tangents,
        }
    }

    fn channel_mut(&mut self, channel: VertexChannel) -> &mut Vec<Vec3> {
        match channel {
            VertexChannel::Position => &mut self.positions,
            VertexChannel::Normal => &mut self.normals,
            VertexChannel::Tangent => &mut self.tangents,
        }
    }
}

/// Returns `to - from` per element.
///
/// Elements missing from either side yield a zero delta.
pub fn delta(from: &[Vec3], to: &[Vec3]) -> Vec<Vec3> {
    let mut out = vec![Vec3::ZERO; from.len()];
    for ((d, a), b) in out.iter_mut().zip(from).zip(to) {
        *d = *b - *a;
    }
    out
}

/// Computes the frame deltas from `base` to `target`.
///
/// Channels disabled in `attributes`, or absent on either mesh, get an
/// all-zero delta so the frame leaves that channel untouched.
pub fn frame_deltas<M>(base: &M, target: &M, attributes: AttributeMask) -> FrameDeltas
where
    M: VertexChannels + ?Sized,
{
    let mut out = FrameDeltas::zero(base.vertex_count());
    for channel in VertexChannel::ALL {
        let present = base.has_channel(channel) && target.has_channel(channel);
        if attributes.contains(channel) && present {
            let (from, to) = (base.channel_xyz(channel), target.channel_xyz(channel));
            *out.channel_mut(channel) = delta(&from, &to);
        }
    }
    out
}

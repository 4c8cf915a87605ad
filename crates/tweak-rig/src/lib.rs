//! Skinning for tweak.
//!
//! Bone influences per vertex and linear blend skinning over any
//! [`VertexChannelsMut`](rhizome_tweak_core::VertexChannelsMut) holder, from
//! bind-pose ("predeformed") to posed ("deformed") space and approximately
//! back. [`SkinCache`] tells callers when a pose actually changed.

mod cache;
mod skin;

pub use cache::SkinCache;
pub use skin::{BoneId, BoneWeight, MAX_INFLUENCES, Skin, SkinPose, VertexInfluences};

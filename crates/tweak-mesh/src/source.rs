//! Extraction of mesh buffers from host objects.

use glam::{Mat4, Vec3};
use rhizome_tweak_core::AttributeMask;
use rhizome_tweak_rig::{Skin, SkinPose};

use crate::asset::MeshAsset;
use crate::buffers::MeshBuffers;
use crate::error::{MeshError, Result};
use crate::terrain::Heightfield;

/// The renderer attached to a scene object.
#[derive(Debug, Clone, Default)]
pub enum Renderer {
    /// No renderer.
    #[default]
    None,
    /// A plain mesh renderer.
    Static {
        /// Shared mesh, if assigned.
        mesh: Option<MeshAsset>,
    },
    /// A skinned mesh renderer with its current pose.
    Skinned {
        /// Shared (unposed) mesh, if assigned.
        mesh: Option<MeshAsset>,
        /// Bone influences and bind poses.
        skin: Skin,
        /// Current bone matrices.
        pose: SkinPose,
    },
    /// A terrain.
    Terrain {
        /// Normalized heights.
        heightfield: Heightfield,
        /// World extents (x, z) and height scale (y).
        size: Vec3,
    },
}

/// A scene object carrying a transform and a renderer.
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// Object name.
    pub name: String,
    /// Local-to-world matrix.
    pub transform: Mat4,
    /// Attached renderer.
    pub renderer: Renderer,
}

impl SceneObject {
    /// Creates an object at the origin.
    pub fn new(name: impl Into<String>, renderer: Renderer) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            renderer,
        }
    }

    /// Sets the local-to-world matrix.
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Returns the mesh asset behind the renderer, if any.
    pub fn mesh(&self) -> Option<&MeshAsset> {
        match &self.renderer {
            Renderer::Static { mesh } | Renderer::Skinned { mesh, .. } => mesh.as_ref(),
            Renderer::None | Renderer::Terrain { .. } => None,
        }
    }
}

/// Anything mesh buffers can be extracted from.
#[derive(Debug, Clone)]
pub enum MeshSource {
    /// A raw mesh asset.
    Asset(MeshAsset),
    /// A scene object with a renderer.
    Object(SceneObject),
}

impl MeshSource {
    /// Returns a display name for logging.
    pub fn name(&self) -> &str {
        match self {
            Self::Asset(asset) => &asset.name,
            Self::Object(object) => &object.name,
        }
    }

    /// Returns the vertex count the source would extract to, without extracting.
    pub fn vertex_count(&self) -> Option<usize> {
        match self {
            Self::Asset(asset) => Some(asset.vertex_count()),
            Self::Object(object) => match &object.renderer {
                Renderer::Terrain { heightfield, .. } => Some(heightfield.len()),
                _ => object.mesh().map(MeshAsset::vertex_count),
            },
        }
    }
}

/// Extracts mesh buffers from a source.
///
/// - Assets extract in their own space with an identity transform.
/// - Static and skinned objects carry the object transform. With `bake` set,
///   skinned objects are evaluated at their current pose; otherwise the
///   shared mesh is returned unposed.
/// - Terrains become a grid mesh whose transform keeps only the object's
///   position.
pub fn extract(source: &MeshSource, bake: bool) -> Result<MeshBuffers> {
    match source {
        MeshSource::Asset(asset) => read_asset(asset),
        MeshSource::Object(object) => extract_object(object, bake),
    }
}

fn read_asset(asset: &MeshAsset) -> Result<MeshBuffers> {
    if !asset.readable {
        return Err(MeshError::NotReadable);
    }
    Ok(asset.buffers.clone().with_transform(Mat4::IDENTITY))
}

fn extract_object(object: &SceneObject, bake: bool) -> Result<MeshBuffers> {
    match &object.renderer {
        Renderer::None => Err(MeshError::NoMesh),
        Renderer::Static { mesh } => {
            let asset = mesh.as_ref().ok_or(MeshError::NoMesh)?;
            Ok(read_asset(asset)?.with_transform(object.transform))
        }
        Renderer::Skinned { mesh, skin, pose } => {
            let asset = mesh.as_ref().ok_or(MeshError::NoMesh)?;
            let mut buffers = read_asset(asset)?.with_transform(object.transform);
            if bake {
                skin.deform(pose, &mut buffers, AttributeMask::all());
            }
            Ok(buffers)
        }
        Renderer::Terrain { heightfield, size } => {
            let position = object.transform.w_axis.truncate();
            Ok(heightfield
                .to_mesh_sized(*size)
                .with_transform(Mat4::from_translation(position)))
        }
    }
}

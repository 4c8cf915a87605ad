//! Predeformed and deformed vertex storage.

use glam::{Vec3, Vec4};
use rhizome_tweak_core::AttributeMask;
use rhizome_tweak_mesh::MeshBuffers;
use rhizome_tweak_rig::{Skin, SkinCache, SkinPose};

use crate::error::{EditError, Result};

/// Buffers of a skinned mesh: the editable bind-pose data and its posed copy.
#[derive(Debug, Clone)]
pub struct SkinnedVertices {
    /// Bind-pose attributes; edits are applied here.
    pub predeformed: MeshBuffers,
    /// Posed attributes, derived from `predeformed`.
    pub deformed: MeshBuffers,
    /// Bone weights and bind matrices.
    pub skin: Skin,
    /// Current bone matrices.
    pub pose: SkinPose,
    cache: SkinCache,
}

impl SkinnedVertices {
    fn reskin(&mut self) {
        let deformed = &mut self.deformed;
        deformed.positions.clone_from(&self.predeformed.positions);
        deformed.normals.clone_from(&self.predeformed.normals);
        deformed.tangents.clone_from(&self.predeformed.tangents);
        self.skin.deform(&self.pose, deformed, AttributeMask::all());
    }

    fn edit_deformed<R>(&mut self, edit: impl FnOnce(&mut MeshBuffers) -> R) -> R {
        let before = self.deformed.positions.clone();
        let result = edit(&mut self.deformed);

        let inverse = self.skin.inverse_vertex_matrices(&self.pose, before.len());
        let moved = self.deformed.positions.iter().zip(&before).zip(&inverse);
        for (bind, ((p, old), m)) in self.predeformed.positions.iter_mut().zip(moved) {
            if p != old {
                *bind = m.transform_point3(*p);
            }
        }
        self.reskin();
        result
    }
}

/// Vertex storage of an edit session.
///
/// A static mesh has a single buffer serving as both predeformed and
/// deformed data. A skinned mesh keeps the two apart and re-skins the
/// deformed copy whenever the predeformed data or the pose changes.
#[derive(Debug, Clone)]
pub enum VertexSpace {
    /// One shared buffer.
    Static(MeshBuffers),
    /// Separate bind-pose and posed buffers.
    Skinned(Box<SkinnedVertices>),
}

impl VertexSpace {
    /// Chooses the variant for a mesh and skins it once.
    pub fn new(mesh: MeshBuffers, skin: Option<(Skin, SkinPose)>) -> Result<Self> {
        let Some((skin, pose)) = skin else {
            return Ok(Self::Static(mesh));
        };
        if skin.vertex_count() != mesh.vertex_count() {
            return Err(EditError::SkinMismatch {
                skin: skin.vertex_count(),
                mesh: mesh.vertex_count(),
            });
        }

        let mut cache = SkinCache::new();
        cache.update(&pose);
        let mut skinned = SkinnedVertices {
            deformed: mesh.clone(),
            predeformed: mesh,
            skin,
            pose,
            cache,
        };
        skinned.reskin();
        Ok(Self::Skinned(Box::new(skinned)))
    }

    /// Returns true for skinned meshes.
    pub fn is_skinned(&self) -> bool {
        matches!(self, Self::Skinned(_))
    }

    /// Editable bind-pose data.
    pub fn predeformed(&self) -> &MeshBuffers {
        match self {
            Self::Static(mesh) => mesh,
            Self::Skinned(s) => &s.predeformed,
        }
    }

    /// Mutable bind-pose data. Call [`VertexSpace::reskin`] after editing.
    pub fn predeformed_mut(&mut self) -> &mut MeshBuffers {
        match self {
            Self::Static(mesh) => mesh,
            Self::Skinned(s) => &mut s.predeformed,
        }
    }

    /// Posed data, as displayed.
    pub fn deformed(&self) -> &MeshBuffers {
        match self {
            Self::Static(mesh) => mesh,
            Self::Skinned(s) => &s.deformed,
        }
    }

    /// Current pose of a skinned mesh.
    pub fn pose(&self) -> Option<&SkinPose> {
        match self {
            Self::Static(_) => None,
            Self::Skinned(s) => Some(&s.pose),
        }
    }

    /// Skin of a skinned mesh.
    pub fn skin(&self) -> Option<&Skin> {
        match self {
            Self::Static(_) => None,
            Self::Skinned(s) => Some(&s.skin),
        }
    }

    /// Recomputes the deformed data from the predeformed data.
    ///
    /// Returns false for static meshes, which have nothing to re-skin.
    pub fn reskin(&mut self) -> bool {
        match self {
            Self::Static(_) => false,
            Self::Skinned(s) => {
                s.reskin();
                true
            }
        }
    }

    /// Replaces the pose, re-skinning only if any matrix changed.
    pub fn update_pose(&mut self, pose: SkinPose) -> bool {
        let Self::Skinned(s) = self else {
            return false;
        };
        if !s.cache.update(&pose) {
            return false;
        }
        log::debug!("pose changed, re-skinning {} vertices", s.predeformed.vertex_count());
        s.pose = pose;
        s.reskin();
        true
    }

    /// Runs `edit` on the posed data and carries moved positions back to
    /// bind pose.
    ///
    /// Static meshes are edited in place. On a skinned mesh every vertex
    /// whose position `edit` changed is mapped through the inverse of its
    /// blended matrix; untouched vertices keep their exact bind-pose values.
    /// Normals and tangents come back from the re-skin.
    pub fn edit_deformed<R>(&mut self, edit: impl FnOnce(&mut MeshBuffers) -> R) -> R {
        match self {
            Self::Static(mesh) => edit(mesh),
            Self::Skinned(s) => s.edit_deformed(edit),
        }
    }

    /// Writes positions given in deformed (posed) space.
    ///
    /// Skinned meshes map them back to bind pose through the inverse of
    /// each vertex's blended matrix.
    pub fn set_deformed_positions(&mut self, positions: &[Vec3]) -> Result<()> {
        self.set_deformed(positions, &[], &[])
    }

    /// Writes attributes given in deformed space.
    ///
    /// Empty `normals` or `tangents` leave that attribute unchanged.
    pub fn set_deformed(
        &mut self,
        positions: &[Vec3],
        normals: &[Vec3],
        tangents: &[Vec4],
    ) -> Result<()> {
        let expected = self.predeformed().vertex_count();
        let check = |got: usize| {
            if got == expected {
                Ok(())
            } else {
                Err(EditError::VertexCountMismatch { expected, got })
            }
        };
        check(positions.len())?;
        for got in [normals.len(), tangents.len()] {
            if got != 0 {
                check(got)?;
            }
        }

        let mesh = self.predeformed_mut();
        mesh.positions.copy_from_slice(positions);
        if !normals.is_empty() {
            mesh.normals = normals.to_vec();
        }
        if !tangents.is_empty() {
            mesh.tangents = tangents.to_vec();
        }

        if let Self::Skinned(s) = self {
            let s = s.as_mut();
            let channels = AttributeMask {
                vertex: true,
                normal: !normals.is_empty(),
                tangent: !tangents.is_empty(),
            };
            s.skin.reverse(&s.pose, &mut s.predeformed, channels);
            s.reskin();
        }
        Ok(())
    }

    /// Releases the storage, returning the bind-pose mesh.
    pub fn into_predeformed(self) -> MeshBuffers {
        match self {
            Self::Static(mesh) => mesh,
            Self::Skinned(s) => s.predeformed,
        }
    }
}

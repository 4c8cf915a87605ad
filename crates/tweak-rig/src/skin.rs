//! Linear blend skinning between bind-pose and posed vertex data.

use glam::Mat4;
use rhizome_tweak_core::{AttributeMask, VertexChannel, VertexChannelsMut};

/// Bone slots per vertex.
pub const MAX_INFLUENCES: usize = 4;

/// Blended matrices with a determinant smaller than this are not inverted.
const SINGULAR_EPSILON: f32 = 1e-12;

/// Index of a bone in a skin's bone list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BoneId(pub u32);

impl BoneId {
    /// Returns the bone index as usize.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One bone slot of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoneWeight {
    /// Bone index.
    pub bone: BoneId,
    /// Influence; slots with a weight of zero or less are ignored.
    pub weight: f32,
}

/// Bone slots of a single vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexInfluences(pub [BoneWeight; MAX_INFLUENCES]);

impl VertexInfluences {
    /// Fully bound to one bone.
    pub fn single(bone: BoneId) -> Self {
        Self::from_weights([(bone, 1.0)])
    }

    /// Split between two bones, weights taken as given.
    pub fn two(bone_a: BoneId, weight_a: f32, bone_b: BoneId, weight_b: f32) -> Self {
        let mut slots = [BoneWeight::default(); MAX_INFLUENCES];
        slots[0] = BoneWeight {
            bone: bone_a,
            weight: weight_a,
        };
        slots[1] = BoneWeight {
            bone: bone_b,
            weight: weight_b,
        };
        Self(slots)
    }

    /// Keeps the heaviest positive weights that fit and normalizes them.
    pub fn from_weights(weights: impl IntoIterator<Item = (BoneId, f32)>) -> Self {
        let mut all: Vec<BoneWeight> = weights
            .into_iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(bone, weight)| BoneWeight { bone, weight })
            .collect();
        all.sort_by(|a, b| b.weight.total_cmp(&a.weight));

        let mut slots = [BoneWeight::default(); MAX_INFLUENCES];
        for (slot, w) in slots.iter_mut().zip(all) {
            *slot = w;
        }
        let mut influences = Self(slots);
        influences.normalize();
        influences
    }

    /// Slots with a positive weight.
    pub fn active(&self) -> impl Iterator<Item = BoneWeight> + '_ {
        self.0.iter().copied().filter(|s| s.weight > 0.0)
    }

    /// Scales the weights to sum to one. All-zero slots stay zero.
    pub fn normalize(&mut self) {
        let sum: f32 = self.active().map(|s| s.weight).sum();
        if sum <= 0.0 {
            return;
        }
        for slot in &mut self.0 {
            slot.weight = if slot.weight > 0.0 { slot.weight / sum } else { 0.0 };
        }
    }

    /// Number of slots with a positive weight.
    pub fn influence_count(&self) -> usize {
        self.active().count()
    }
}

/// Current pose of a skinned mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkinPose {
    /// Local-to-world matrix of the skinned object. Skinned output is
    /// expressed relative to it.
    pub root: Mat4,
    /// World matrix of each bone, in skin bone order.
    pub bone_matrices: Vec<Mat4>,
}

impl SkinPose {
    /// Creates a pose with an identity root.
    pub fn new(bone_matrices: Vec<Mat4>) -> Self {
        Self {
            root: Mat4::IDENTITY,
            bone_matrices,
        }
    }

    /// Sets the root matrix.
    pub fn with_root(mut self, root: Mat4) -> Self {
        self.root = root;
        self
    }
}

/// Bone weights plus the bind pose they were authored against.
#[derive(Debug, Clone, Default)]
pub struct Skin {
    influences: Vec<VertexInfluences>,
    /// World-to-bone matrices at bind time, one per bone.
    inverse_binds: Vec<Mat4>,
}

impl Skin {
    /// Creates a skin from influences and the bones' world matrices at bind time.
    pub fn from_bind_poses(influences: Vec<VertexInfluences>, bind_poses: &[Mat4]) -> Self {
        Self {
            influences,
            inverse_binds: bind_poses.iter().map(|m| m.inverse()).collect(),
        }
    }

    /// Influences of a vertex; vertices past the list have none.
    pub fn influences(&self, vertex: usize) -> VertexInfluences {
        self.influences.get(vertex).copied().unwrap_or_default()
    }

    /// Number of vertices with influences.
    pub fn vertex_count(&self) -> usize {
        self.influences.len()
    }

    /// Number of bones.
    pub fn bone_count(&self) -> usize {
        self.inverse_binds.len()
    }

    /// `root⁻¹ · bone · bind⁻¹` per bone. Bones missing from the pose use
    /// the root alone.
    fn bone_transforms(&self, pose: &SkinPose) -> Vec<Mat4> {
        let to_object = pose.root.inverse();
        self.inverse_binds
            .iter()
            .enumerate()
            .map(|(i, inv_bind)| {
                pose.bone_matrices
                    .get(i)
                    .map_or(to_object, |bone| to_object * *bone * *inv_bind)
            })
            .collect()
    }

    /// Weighted sum of the bone transforms of every vertex.
    ///
    /// Weights are not renormalized. A vertex without any positive weight
    /// gets the identity.
    pub fn vertex_matrices(&self, pose: &SkinPose, vertex_count: usize) -> Vec<Mat4> {
        let bones = self.bone_transforms(pose);
        let bone = |id: BoneId| bones.get(id.index()).copied().unwrap_or(Mat4::IDENTITY);
        (0..vertex_count)
            .map(|v| {
                self.influences(v)
                    .active()
                    .map(|s| bone(s.bone) * s.weight)
                    .reduce(|a, b| a + b)
                    .unwrap_or(Mat4::IDENTITY)
            })
            .collect()
    }

    /// Skins bind-pose data into posed space in place.
    ///
    /// Only channels enabled in `channels` and present on `mesh` are touched.
    pub fn deform<M>(&self, pose: &SkinPose, mesh: &mut M, channels: AttributeMask)
    where
        M: VertexChannelsMut + ?Sized,
    {
        let matrices = self.vertex_matrices(pose, mesh.vertex_count());
        transform_channels(mesh, &matrices, channels);
    }

    /// Inverses of [`Skin::vertex_matrices`], mapping posed data back to
    /// bind pose. Singular matrices are replaced by the identity.
    pub fn inverse_vertex_matrices(&self, pose: &SkinPose, vertex_count: usize) -> Vec<Mat4> {
        let mut matrices = self.vertex_matrices(pose, vertex_count);
        for m in &mut matrices {
            *m = if m.determinant().abs() > SINGULAR_EPSILON {
                m.inverse()
            } else {
                Mat4::IDENTITY
            };
        }
        matrices
    }

    /// Maps posed data back to bind-pose space in place.
    ///
    /// Vertices whose blended matrix is singular are left unchanged.
    pub fn reverse<M>(&self, pose: &SkinPose, mesh: &mut M, channels: AttributeMask)
    where
        M: VertexChannelsMut + ?Sized,
    {
        let matrices = self.inverse_vertex_matrices(pose, mesh.vertex_count());
        transform_channels(mesh, &matrices, channels);
    }

    /// The pose in which every bone sits at its bind transform.
    ///
    /// Skinning with it leaves bind-pose data unchanged.
    pub fn bind_pose(&self, root: Mat4) -> SkinPose {
        let bones = self
            .inverse_binds
            .iter()
            .map(|inv_bind| root * inv_bind.inverse())
            .collect();
        SkinPose::new(bones).with_root(root)
    }
}

fn transform_channels<M>(mesh: &mut M, matrices: &[Mat4], channels: AttributeMask)
where
    M: VertexChannelsMut + ?Sized,
{
    if channels.contains(VertexChannel::Position) {
        for (p, m) in mesh.positions_mut().iter_mut().zip(matrices) {
            *p = m.transform_point3(*p);
        }
    }
    // Uniform scale is assumed, so directions are renormalized
    if channels.contains(VertexChannel::Normal) && mesh.has_channel(VertexChannel::Normal) {
        for (n, m) in mesh.normals_mut().iter_mut().zip(matrices) {
            *n = m.transform_vector3(*n).normalize_or_zero();
        }
    }
    if channels.contains(VertexChannel::Tangent) && mesh.has_channel(VertexChannel::Tangent) {
        for (t, m) in mesh.tangents_mut().iter_mut().zip(matrices) {
            *t = m
                .transform_vector3(t.truncate())
                .normalize_or_zero()
                .extend(t.w);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3, Vec4};
    use rhizome_tweak_core::VertexChannels;
    use std::f32::consts::FRAC_PI_2;

    #[derive(Debug, Clone, Default)]
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

    fn points(positions: Vec<Vec3>) -> Verts {
        Verts {
            positions,
            ..Default::default()
        }
    }

    /// Two bones: one at the origin, one two units up.
    fn arm_bind() -> Vec<Mat4> {
        vec![
            Mat4::IDENTITY,
            Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)),
        ]
    }

    #[test]
    fn test_from_weights_keeps_heaviest() {
        let influences = VertexInfluences::from_weights([
            (BoneId(0), 0.1),
            (BoneId(1), 0.4),
            (BoneId(2), 0.0),
            (BoneId(3), 0.2),
            (BoneId(4), 0.2),
            (BoneId(5), 0.1),
        ]);
        assert_eq!(influences.influence_count(), 4);
        assert_eq!(influences.0[0].bone, BoneId(1));
        let sum: f32 = influences.active().map(|s| s.weight).sum();
        assert!((sum - 1.0).abs() < 0.0001);
        assert!(influences.active().all(|s| s.bone != BoneId(2)));
    }

    #[test]
    fn test_influences_normalize() {
        let mut influences = VertexInfluences::two(BoneId(0), 2.0, BoneId(1), 2.0);
        influences.normalize();
        assert!((influences.0[0].weight - 0.5).abs() < 0.0001);
        assert!((influences.0[1].weight - 0.5).abs() < 0.0001);

        let mut empty = VertexInfluences::default();
        empty.normalize();
        assert_eq!(empty.influence_count(), 0);
    }

    #[test]
    fn test_bind_pose_is_identity() {
        let bind = arm_bind();
        let skin = Skin::from_bind_poses(
            vec![
                VertexInfluences::single(BoneId(0)),
                VertexInfluences::two(BoneId(0), 0.3, BoneId(1), 0.7),
            ],
            &bind,
        );
        let pose = SkinPose::new(bind.clone());

        let original = vec![Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.5, 2.5, -1.0)];
        let mut verts = points(original.clone());
        skin.deform(&pose, &mut verts, AttributeMask::all());

        for (a, b) in verts.positions.iter().zip(&original) {
            assert!((*a - *b).length() < 0.0001);
        }
    }

    #[test]
    fn test_rotated_bone() {
        let bind = arm_bind();
        let skin = Skin::from_bind_poses(vec![VertexInfluences::single(BoneId(0))], &bind);

        // First bone turned 90 degrees around Z
        let pose = SkinPose::new(vec![Mat4::from_quat(Quat::from_rotation_z(FRAC_PI_2)), bind[1]]);

        let mut verts = points(vec![Vec3::new(0.0, 1.0, 0.0)]);
        skin.deform(&pose, &mut verts, AttributeMask::all());
        assert!((verts.positions[0] - Vec3::new(-1.0, 0.0, 0.0)).length() < 0.0001);
    }

    #[test]
    fn test_root_is_removed() {
        let bind = arm_bind();
        let skin = Skin::from_bind_poses(vec![VertexInfluences::single(BoneId(1))], &bind);

        // Whole rig moved by the object transform: local result is unchanged
        let root = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let pose = SkinPose::new(bind.iter().map(|b| root * *b).collect()).with_root(root);

        let p = Vec3::new(0.0, 3.0, 0.0);
        let mut verts = points(vec![p]);
        skin.deform(&pose, &mut verts, AttributeMask::all());
        assert!((verts.positions[0] - p).length() < 0.0001);
    }

    #[test]
    fn test_bind_pose_from_skin() {
        let bind = arm_bind();
        let influences = VertexInfluences::two(BoneId(0), 0.5, BoneId(1), 0.5);
        let skin = Skin::from_bind_poses(vec![influences], &bind);
        let root = Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0));
        let pose = skin.bind_pose(root);

        assert_eq!(pose.root, root);
        let translation = pose.bone_matrices[1].w_axis.truncate();
        assert!((translation - Vec3::new(0.0, 2.0, 4.0)).length() < 0.0001);
        let m = skin.vertex_matrices(&pose, 1)[0];
        let p = Vec3::new(1.0, 1.0, 1.0);
        assert!((m.transform_point3(p) - p).length() < 0.0001);
    }

    #[test]
    fn test_reverse_inverts_deform() {
        let bind = arm_bind();
        let skin = Skin::from_bind_poses(
            vec![
                VertexInfluences::single(BoneId(0)),
                VertexInfluences::two(BoneId(0), 0.5, BoneId(1), 0.5),
            ],
            &bind,
        );
        let pose = SkinPose::new(vec![
            Mat4::from_rotation_translation(Quat::from_rotation_x(0.4), Vec3::new(0.0, 0.5, 0.0)),
            Mat4::from_rotation_translation(Quat::from_rotation_z(-0.7), Vec3::new(1.0, 2.0, 0.0)),
        ]);

        let original = Verts {
            positions: vec![Vec3::new(0.3, 1.0, 0.2), Vec3::new(-0.5, 2.0, 0.4)],
            normals: vec![Vec3::Y, Vec3::new(1.0, 1.0, 0.0).normalize()],
            tangents: vec![Vec4::new(1.0, 0.0, 0.0, -1.0), Vec4::new(0.0, 0.0, 1.0, 1.0)],
        };

        let mut verts = original.clone();
        skin.deform(&pose, &mut verts, AttributeMask::all());
        assert!((verts.positions[0] - original.positions[0]).length() > 0.01);

        skin.reverse(&pose, &mut verts, AttributeMask::all());
        for i in 0..2 {
            assert!((verts.positions[i] - original.positions[i]).length() < 0.0001);
            assert!((verts.normals[i] - original.normals[i]).length() < 0.0001);
            assert!((verts.tangents[i] - original.tangents[i]).length() < 0.0001);
        }
    }

    #[test]
    fn test_inverse_matrices_singular_fallback() {
        let skin = Skin::from_bind_poses(
            vec![VertexInfluences::single(BoneId(0)), VertexInfluences::single(BoneId(1))],
            &[Mat4::IDENTITY, Mat4::IDENTITY],
        );
        let pose = SkinPose::new(vec![
            Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)),
            Mat4::from_scale(Vec3::ZERO),
        ]);
        let inverse = skin.inverse_vertex_matrices(&pose, 2);
        assert!((inverse[0].transform_point3(Vec3::new(0.0, 5.0, 0.0))).length() < 0.0001);
        assert_eq!(inverse[1], Mat4::IDENTITY);
    }

    #[test]
    fn test_masked_channels_untouched() {
        let skin =
            Skin::from_bind_poses(vec![VertexInfluences::single(BoneId(0))], &[Mat4::IDENTITY]);
        let pose = SkinPose::new(vec![Mat4::from_quat(Quat::from_rotation_z(FRAC_PI_2))]);

        let mut verts = Verts {
            positions: vec![Vec3::X],
            normals: vec![Vec3::X],
            tangents: vec![Vec4::new(1.0, 0.0, 0.0, 1.0)],
        };
        skin.deform(&pose, &mut verts, AttributeMask::positions_only());

        assert!((verts.positions[0] - Vec3::Y).length() < 0.0001);
        assert_eq!(verts.normals[0], Vec3::X);
        assert_eq!(verts.tangents[0], Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_unweighted_vertex_is_identity() {
        let skin = Skin::from_bind_poses(vec![VertexInfluences::default()], &arm_bind());
        let pose = SkinPose::new(vec![Mat4::from_translation(Vec3::X); 2]);

        // Vertices past the influence list are treated the same way
        let matrices = skin.vertex_matrices(&pose, 3);
        assert!(matrices.iter().all(|m| *m == Mat4::IDENTITY));
        assert_eq!(skin.bone_count(), 2);
    }
}

//! Pose change detection for re-skinning.

use glam::Mat4;

use crate::SkinPose;

/// Remembers the last pose that was skinned.
///
/// [`SkinCache::update`] reports whether the root or any bone matrix moved
/// since the previous call, so callers only re-skin when needed.
#[derive(Debug, Clone, Default)]
pub struct SkinCache {
    root: Option<Mat4>,
    bone_matrices: Vec<Mat4>,
}

impl SkinCache {
    /// Creates an empty cache. The first update always reports a change.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `pose` and returns true if it differs from the cached one.
    pub fn update(&mut self, pose: &SkinPose) -> bool {
        let mut changed = self.root != Some(pose.root);
        self.root = Some(pose.root);

        if self.bone_matrices.len() != pose.bone_matrices.len() {
            self.bone_matrices.clone_from(&pose.bone_matrices);
            return true;
        }

        for (cached, current) in self.bone_matrices.iter_mut().zip(&pose.bone_matrices) {
            if cached != current {
                *cached = *current;
                changed = true;
            }
        }

        changed
    }

    /// Forgets the cached pose.
    pub fn invalidate(&mut self) {
        self.root = None;
        self.bone_matrices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_cache_detects_changes() {
        let mut cache = SkinCache::new();
        let mut pose = SkinPose::new(vec![Mat4::IDENTITY; 3]);

        assert!(cache.update(&pose));
        assert!(!cache.update(&pose));

        pose.bone_matrices[1] = Mat4::from_translation(Vec3::X);
        assert!(cache.update(&pose));
        assert!(!cache.update(&pose));

        pose.root = Mat4::from_translation(Vec3::Y);
        assert!(cache.update(&pose));

        cache.invalidate();
        assert!(cache.update(&pose));
    }

    #[test]
    fn test_cache_bone_count_change() {
        let mut cache = SkinCache::new();
        cache.update(&SkinPose::new(vec![Mat4::IDENTITY]));
        assert!(cache.update(&SkinPose::new(vec![Mat4::IDENTITY; 2])));
    }
}

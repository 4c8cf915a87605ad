//! Building blend-shape frames onto a base mesh.
//!
//! A build resolves every frame's target (directly, or by projecting the
//! base onto it), turns it into per-vertex deltas against the base, and
//! writes the deltas as frames on a copy of the base mesh asset. Frames that
//! cannot be resolved are logged and skipped; only a missing or unreadable
//! base aborts the build.

use rhizome_tweak_core::ProjectionRayDirection;
use rhizome_tweak_edit::{ProjectionSettings, project_vertices};
use rhizome_tweak_mesh::{MeshAsset, MeshBuffers, MeshError, MeshSource, extract, smooth_normals};

use crate::data::{BlendShapeData, BlendShapeFrameData};
use crate::delta::{FrameDeltas, frame_deltas};
use crate::error::{BuildError, FrameError, Result};

/// A frame left out of the output, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFrame {
    /// Name of the shape the frame belongs to.
    pub shape: String,
    /// Frame weight.
    pub weight: f32,
    /// Why it was skipped.
    pub error: FrameError,
}

/// Outcome of a build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Copy of the base mesh carrying the new blend shapes.
    pub mesh: MeshAsset,
    /// Number of frames written from the input shapes.
    pub frames_added: usize,
    /// Frames that were not written.
    pub skipped: Vec<SkippedFrame>,
}

/// Writes blend-shape frames computed from target meshes onto a base mesh.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlendShapeAssembler {
    /// Keep blend shapes already on the base whose names are not rebuilt.
    pub preserve_existing: bool,
}

impl BlendShapeAssembler {
    /// Creates an assembler that discards existing blend shapes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether existing blend shapes are kept.
    pub fn with_preserve_existing(mut self, preserve_existing: bool) -> Self {
        self.preserve_existing = preserve_existing;
        self
    }

    /// Builds `shapes` onto `base`.
    ///
    /// Frames are written in input order; a frame whose weight does not
    /// increase within its shape is rejected by the mesh and reported as
    /// skipped.
    pub fn build(
        &self,
        base: Option<&MeshSource>,
        shapes: &[BlendShapeData],
    ) -> Result<BuildReport> {
        let base = base.ok_or(BuildError::BaseMissing)?;
        let asset = shared_mesh(base)?;
        if !asset.readable {
            return Err(BuildError::BaseUnreadable(MeshError::NotReadable));
        }

        // Deltas are taken against the base before its shapes are touched
        let mut resolved = Vec::new();
        let mut skipped = Vec::new();
        for shape in shapes {
            for frame in &shape.frames {
                match resolve_frame(base, &asset.buffers, frame) {
                    Ok(deltas) => resolved.push((shape.name.as_str(), frame.weight, deltas)),
                    Err(error) => skip(&mut skipped, &shape.name, frame.weight, error),
                }
            }
        }

        let mut mesh = asset.clone();
        if self.preserve_existing {
            mesh.blend_shapes
                .retain(|existing| !shapes.iter().any(|s| s.name == existing.name));
        } else {
            mesh.clear_blend_shapes();
        }

        let mut frames_added = 0;
        for (name, weight, deltas) in resolved {
            let FrameDeltas {
                positions,
                normals,
                tangents,
            } = deltas;
            match mesh.add_blend_shape_frame(name, weight, positions, normals, tangents) {
                Ok(()) => frames_added += 1,
                Err(e) => skip(&mut skipped, name, weight, FrameError::Write(e)),
            }
        }

        log::info!("added {} blend-shape frames to '{}'", frames_added, mesh.name);
        Ok(BuildReport {
            mesh,
            frames_added,
            skipped,
        })
    }
}

fn skip(skipped: &mut Vec<SkippedFrame>, shape: &str, weight: f32, error: FrameError) {
    log::error!("invalid target in '{}' at weight {}: {}", shape, weight, error);
    skipped.push(SkippedFrame {
        shape: shape.to_string(),
        weight,
        error,
    });
}

fn resolve_frame(
    base: &MeshSource,
    base_buffers: &MeshBuffers,
    frame: &BlendShapeFrameData,
) -> std::result::Result<FrameDeltas, FrameError> {
    let target = frame.target.as_ref().ok_or(FrameError::MissingTarget)?;
    let shape = match &frame.projection {
        Some(projection) => {
            let settings = projection.with_attributes(frame.attributes);
            generate_projected_target(base, target, &settings)?
        }
        None => target_buffers(target)?,
    };

    let expected = base_buffers.vertex_count();
    let got = shape.vertex_count();
    if got != expected {
        return Err(FrameError::VertexCountMismatch { expected, got });
    }
    Ok(frame_deltas(base_buffers, &shape, frame.attributes))
}

/// The mesh asset a source stores its vertex data in.
fn shared_mesh(source: &MeshSource) -> std::result::Result<&MeshAsset, MeshError> {
    match source {
        MeshSource::Asset(asset) => Ok(asset),
        MeshSource::Object(object) => object.mesh().ok_or(MeshError::NoMesh),
    }
}

/// Target vertex data in its own local space, unposed.
fn target_buffers(target: &MeshSource) -> std::result::Result<MeshBuffers, MeshError> {
    match shared_mesh(target) {
        Ok(asset) if asset.readable => Ok(asset.buffers.clone()),
        Ok(_) => Err(MeshError::NotReadable),
        // Terrains have no shared mesh but can still be extracted
        Err(_) => extract(target, false),
    }
}

/// Projects the base onto `target` and returns the projected base mesh.
///
/// The base is taken unposed, in its local space under its object transform.
/// The target is taken at its current pose under its own transform. The
/// result keeps the base's vertex count and local space, so it can be diffed
/// against the base directly.
pub fn generate_projected_target(
    base: &MeshSource,
    target: &MeshSource,
    settings: &ProjectionSettings,
) -> std::result::Result<MeshBuffers, FrameError> {
    let mut mesh = extract(base, false)?;
    let surface = extract(target, true)?;
    if !mesh.has_normals() {
        mesh.compute_smooth_normals();
    }

    let base_normals = match settings.ray_direction {
        ProjectionRayDirection::BaseNormals => Some(smooth_normals(&mesh.positions, &mesh.indices)),
        _ => None,
    };
    let projected = project_vertices(&mesh, &surface, settings, base_normals.as_deref(), None);
    log::debug!(
        "projected {} of {} vertices onto '{}'",
        projected.hit_count,
        mesh.vertex_count(),
        target.name()
    );
    projected.write_to(&mut mesh);
    Ok(mesh)
}

/// Returns the candidates that can serve as frame targets for `base`: those
/// with the base's vertex count, other than the base itself, sorted by name.
pub fn find_valid_targets<'a>(
    base: &MeshSource,
    candidates: &'a [MeshSource],
) -> Result<Vec<&'a MeshSource>> {
    let asset = shared_mesh(base)?;
    let count = asset.vertex_count();

    let mut valid: Vec<&MeshSource> = candidates
        .iter()
        .filter(|c| c.name() != base.name())
        .filter(|c| c.vertex_count() == Some(count))
        .collect();
    valid.sort_by(|a, b| a.name().cmp(b.name()));

    if valid.is_empty() {
        log::info!("no valid targets for '{}'", base.name());
    } else {
        log::info!("{} targets found for '{}'", valid.len(), base.name());
    }
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};
    use rhizome_tweak_core::AttributeMask;
    use rhizome_tweak_mesh::{Heightfield, Renderer, SceneObject};

    fn tetra_buffers() -> MeshBuffers {
        MeshBuffers::from_positions(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3],
        )
    }

    fn tetra(name: &str) -> MeshAsset {
        let mut buffers = tetra_buffers();
        buffers.compute_smooth_normals();
        MeshAsset::new(name, buffers)
    }

    fn moved(name: &str) -> MeshSource {
        let mut asset = tetra(name);
        asset.buffers.positions[1] = Vec3::new(2.0, 0.0, 0.0);
        MeshSource::Asset(asset)
    }

    /// Flat quad in the XZ plane at height `y`, `half` units across.
    fn quad(name: &str, y: f32, half: f32) -> MeshAsset {
        quad_at(name, Vec3::new(0.0, y, 0.0), half)
    }

    /// Quad centered on `center`; base quads are offset so their corners
    /// do not fall on the target's diagonal.
    fn quad_at(name: &str, center: Vec3, half: f32) -> MeshAsset {
        let Vec3 { x, y, z } = center;
        let mut buffers = MeshBuffers::from_positions(
            vec![
                Vec3::new(x - half, y, z - half),
                Vec3::new(x + half, y, z - half),
                Vec3::new(x + half, y, z + half),
                Vec3::new(x - half, y, z + half),
            ],
            vec![0, 2, 1, 0, 3, 2],
        );
        buffers.compute_smooth_normals();
        MeshAsset::new(name, buffers)
    }

    #[test]
    fn test_single_frame_from_moved_vertex() {
        let base = MeshSource::Asset(tetra("base"));
        let frame = BlendShapeFrameData::new(moved("target"))
            .with_attributes(AttributeMask::positions_only());
        let shape = BlendShapeData::new("stretch").with_frame(frame);

        let report = BlendShapeAssembler::new().build(Some(&base), &[shape]).unwrap();
        assert_eq!(report.frames_added, 1);
        assert!(report.skipped.is_empty());
        assert_eq!(report.mesh.blend_shape_count(), 1);

        let built = report.mesh.blend_shape("stretch").unwrap();
        assert_eq!(built.frames.len(), 1);
        let frame = &built.frames[0];
        assert_eq!(frame.weight, 100.0);
        assert_eq!(frame.delta_positions, vec![Vec3::ZERO, Vec3::X, Vec3::ZERO, Vec3::ZERO]);
        assert_eq!(frame.delta_normals, vec![Vec3::ZERO; 4]);
        assert_eq!(frame.delta_tangents, vec![Vec3::ZERO; 4]);
    }

    #[test]
    fn test_applied_frame_reaches_target() {
        let base = MeshSource::Asset(tetra("base"));
        let shape =
            BlendShapeData::new("stretch").with_frame(BlendShapeFrameData::new(moved("target")));
        let report = BlendShapeAssembler::new().build(Some(&base), &[shape]).unwrap();

        let posed = report.mesh.apply_blend_shapes(&[100.0]);
        assert!((posed.positions[1] - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
        assert!((posed.positions[2] - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_invalid_frames_are_skipped() {
        let base = MeshSource::Asset(tetra("base"));
        let too_small = MeshSource::Asset(MeshAsset::new(
            "tri",
            MeshBuffers::from_positions(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]),
        ));
        let unreadable = MeshSource::Asset(tetra("locked").with_readable(false));

        let shape = BlendShapeData::new("s")
            .with_frame(BlendShapeFrameData::default().with_weight(25.0))
            .with_frame(BlendShapeFrameData::new(too_small).with_weight(50.0))
            .with_frame(BlendShapeFrameData::new(unreadable).with_weight(75.0))
            .with_frame(BlendShapeFrameData::new(moved("ok")));

        let report = BlendShapeAssembler::new().build(Some(&base), &[shape]).unwrap();
        assert_eq!(report.frames_added, 1);
        let errors: Vec<_> = report.skipped.iter().map(|s| s.error.clone()).collect();
        assert_eq!(
            errors,
            vec![
                FrameError::MissingTarget,
                FrameError::VertexCountMismatch { expected: 4, got: 3 },
                FrameError::Extract(MeshError::NotReadable),
            ]
        );
        assert_eq!(report.mesh.blend_shape("s").map(|s| s.frames.len()), Some(1));
    }

    #[test]
    fn test_out_of_order_weight_is_skipped() {
        let base = MeshSource::Asset(tetra("base"));
        let shape = BlendShapeData::new("s")
            .with_frame(BlendShapeFrameData::new(moved("a")).with_weight(80.0))
            .with_frame(BlendShapeFrameData::new(moved("b")).with_weight(40.0));

        let report = BlendShapeAssembler::new().build(Some(&base), &[shape]).unwrap();
        assert_eq!(report.frames_added, 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(
            report.skipped[0].error,
            FrameError::Write(MeshError::FrameWeightOrder { .. })
        ));
    }

    #[test]
    fn test_preserve_existing() {
        let mut asset = tetra("base");
        asset
            .add_blend_shape_frame("keep", 100.0, vec![Vec3::Y; 4], vec![], vec![])
            .unwrap();
        asset
            .add_blend_shape_frame("stretch", 100.0, vec![Vec3::Z; 4], vec![], vec![])
            .unwrap();
        let base = MeshSource::Asset(asset);
        let shapes =
            [BlendShapeData::new("stretch").with_frame(BlendShapeFrameData::new(moved("t")))];

        let kept = BlendShapeAssembler::new()
            .with_preserve_existing(true)
            .build(Some(&base), &shapes)
            .unwrap();
        assert_eq!(kept.mesh.blend_shape_count(), 2);
        assert_eq!(kept.mesh.blend_shape_index("keep"), Some(0));
        let keep = kept.mesh.blend_shape("keep").unwrap();
        assert_eq!(keep.frames[0].delta_positions, vec![Vec3::Y; 4]);
        let rebuilt = kept.mesh.blend_shape("stretch").unwrap();
        assert_eq!(rebuilt.frames.len(), 1);
        assert_eq!(rebuilt.frames[0].delta_positions[1], Vec3::X);

        let replaced = BlendShapeAssembler::new().build(Some(&base), &shapes).unwrap();
        assert_eq!(replaced.mesh.blend_shape_count(), 1);
        assert!(replaced.mesh.blend_shape("keep").is_none());
    }

    #[test]
    fn test_base_errors_abort() {
        let shapes = [BlendShapeData::new("s").with_frame(BlendShapeFrameData::new(moved("t")))];
        let assembler = BlendShapeAssembler::new();

        assert_eq!(assembler.build(None, &shapes).unwrap_err(), BuildError::BaseMissing);

        let locked = MeshSource::Asset(tetra("base").with_readable(false));
        assert_eq!(
            assembler.build(Some(&locked), &shapes).unwrap_err(),
            BuildError::BaseUnreadable(MeshError::NotReadable)
        );

        let empty = MeshSource::Object(SceneObject::new("empty", Renderer::None));
        assert_eq!(
            assembler.build(Some(&empty), &shapes).unwrap_err(),
            BuildError::BaseUnreadable(MeshError::NoMesh)
        );
    }

    #[test]
    fn test_projected_frame() {
        let base = MeshSource::Asset(quad_at("base", Vec3::new(0.3, 0.0, 0.0), 1.0));
        let target = MeshSource::Asset(quad("floor", 0.5, 10.0));
        let shape = BlendShapeData::new("lift").with_frame(BlendShapeFrameData::projected(target));

        let report = BlendShapeAssembler::new().build(Some(&base), &[shape]).unwrap();
        assert_eq!(report.frames_added, 1);
        let frame = &report.mesh.blend_shape("lift").unwrap().frames[0];
        for d in &frame.delta_positions {
            assert!((*d - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-4);
        }
        for d in &frame.delta_normals {
            assert!(d.length() < 1e-4);
        }
    }

    #[test]
    fn test_projected_target_honors_transforms() {
        let base_mesh = quad_at("base", Vec3::new(0.3, 0.0, 0.0), 1.0);
        let base = MeshSource::Object(
            SceneObject::new("base", Renderer::Static { mesh: Some(base_mesh) })
                .with_transform(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0))),
        );
        let floor = quad("floor", 0.0, 10.0);
        let target = MeshSource::Object(
            SceneObject::new("floor", Renderer::Static { mesh: Some(floor) })
                .with_transform(Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0))),
        );

        let settings = ProjectionSettings::for_frames();
        let projected = generate_projected_target(&base, &target, &settings).unwrap();
        assert_eq!(projected.vertex_count(), 4);
        // Target surface sits one unit above the base in the base's local space
        for p in &projected.positions {
            assert!((p.y - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_find_valid_targets() {
        let base = MeshSource::Asset(tetra("base"));
        let candidates = vec![
            MeshSource::Asset(tetra("zeta")),
            MeshSource::Asset(tetra("base")),
            MeshSource::Asset(MeshAsset::new(
                "tri",
                MeshBuffers::from_positions(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]),
            )),
            MeshSource::Object(SceneObject::new(
                "alpha",
                Renderer::Static {
                    mesh: Some(tetra("m")),
                },
            )),
            MeshSource::Object(SceneObject::new("nothing", Renderer::None)),
            MeshSource::Object(SceneObject::new(
                "terrain",
                Renderer::Terrain {
                    heightfield: Heightfield::new(3, 3),
                    size: Vec3::ONE,
                },
            )),
        ];

        let valid = find_valid_targets(&base, &candidates).unwrap();
        let names: Vec<_> = valid.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}

//! Blend-shape definitions: shapes, their weighted frames and the builder input.

use rhizome_tweak_core::AttributeMask;
use rhizome_tweak_edit::ProjectionSettings;
use rhizome_tweak_mesh::MeshSource;

use crate::assembler::{BlendShapeAssembler, BuildReport};
use crate::error::Result;

/// Slider weight of a fully applied frame.
pub const MAX_FRAME_WEIGHT: f32 = 100.0;

/// One frame of a blend shape to build.
#[derive(Debug, Clone)]
pub struct BlendShapeFrameData {
    /// Slider weight (0 to 100) at which the frame is fully applied.
    pub weight: f32,
    /// Mesh whose shape the frame captures.
    pub target: Option<MeshSource>,
    /// Attributes that receive a delta; disabled ones stay zero.
    pub attributes: AttributeMask,
    /// When set, the base is projected onto `target` and the projected
    /// mesh is used as the frame's shape.
    pub projection: Option<ProjectionSettings>,
}

impl Default for BlendShapeFrameData {
    fn default() -> Self {
        Self {
            weight: MAX_FRAME_WEIGHT,
            target: None,
            attributes: AttributeMask::all(),
            projection: None,
        }
    }
}

impl BlendShapeFrameData {
    /// A full-weight frame capturing `target` directly.
    pub fn new(target: MeshSource) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }

    /// A full-weight frame projecting the base onto `target`.
    pub fn projected(target: MeshSource) -> Self {
        Self::new(target).with_projection(ProjectionSettings::for_frames())
    }

    /// Sets the slider weight.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Sets which attributes receive a delta.
    pub fn with_attributes(mut self, attributes: AttributeMask) -> Self {
        self.attributes = attributes;
        self
    }

    /// Enables projection with the given settings.
    pub fn with_projection(mut self, projection: ProjectionSettings) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Returns true if the frame references a target.
    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }
}

/// A named blend shape and its frames, in build order.
#[derive(Debug, Clone, Default)]
pub struct BlendShapeData {
    /// Shape name, written as-is to the output mesh.
    pub name: String,
    /// Frames in the order they are written.
    pub frames: Vec<BlendShapeFrameData>,
}

impl BlendShapeData {
    /// Creates an empty shape.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: Vec::new(),
        }
    }

    /// Appends a frame.
    pub fn with_frame(mut self, frame: BlendShapeFrameData) -> Self {
        self.frames.push(frame);
        self
    }

    /// Appends a frame and returns it for further setup.
    pub fn add_frame(&mut self, frame: BlendShapeFrameData) -> &mut BlendShapeFrameData {
        self.frames.push(frame);
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Drops frames that reference no target.
    pub fn clear_invalid_frames(&mut self) {
        self.frames.retain(BlendShapeFrameData::has_target);
    }

    /// Spaces weights evenly as `100/n, 200/n, .., 100` in current frame order.
    pub fn normalize_weights(&mut self) {
        let step = MAX_FRAME_WEIGHT / self.frames.len() as f32;
        for (i, frame) in self.frames.iter_mut().enumerate() {
            frame.weight = step * (i + 1) as f32;
        }
    }

    /// Orders frames by ascending weight, keeping the order of equal weights.
    pub fn sort_by_weights(&mut self) {
        self.frames.sort_by(|a, b| a.weight.total_cmp(&b.weight));
    }
}

/// Everything needed to build blend shapes onto a base mesh.
#[derive(Debug, Clone, Default)]
pub struct BlendShapeBuilderData {
    /// Mesh receiving the blend shapes.
    pub base: Option<MeshSource>,
    /// Keep shapes already on the base unless a new shape has the same name.
    pub preserve_existing: bool,
    /// Shapes to build, in output order.
    pub shapes: Vec<BlendShapeData>,
}

impl BlendShapeBuilderData {
    /// Creates builder data for `base` with no shapes.
    pub fn new(base: MeshSource) -> Self {
        Self {
            base: Some(base),
            ..Self::default()
        }
    }

    /// Keeps existing shapes on the base.
    pub fn with_preserve_existing(mut self, preserve_existing: bool) -> Self {
        self.preserve_existing = preserve_existing;
        self
    }

    /// Appends a shape.
    pub fn with_shape(mut self, shape: BlendShapeData) -> Self {
        self.shapes.push(shape);
        self
    }

    /// Appends an empty shape named `NewBlendShape{n}` and returns it.
    pub fn add_shape(&mut self) -> &mut BlendShapeData {
        let name = format!("NewBlendShape{}", self.shapes.len());
        self.shapes.push(BlendShapeData::new(name));
        let last = self.shapes.len() - 1;
        &mut self.shapes[last]
    }

    /// Drops target-less frames from every shape.
    pub fn clear_invalid_frames(&mut self) {
        for shape in &mut self.shapes {
            shape.clear_invalid_frames();
        }
    }

    /// Builds the output mesh.
    pub fn build(&self) -> Result<BuildReport> {
        BlendShapeAssembler::new()
            .with_preserve_existing(self.preserve_existing)
            .build(self.base.as_ref(), &self.shapes)
    }
}

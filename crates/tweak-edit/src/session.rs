//! Edit sessions.
//!
//! An [`EditSession`] owns the vertex buffers of one mesh for as long as it
//! is being edited. Every mutation follows the same path:
//!
//! 1. the installed [`Checkpoint`] receives a snapshot of the predeformed data
//! 2. the operation rewrites predeformed data
//! 3. mirroring, realtime recalculation and re-skinning bring the rest up to date
//! 4. dirty flags record which GPU-visible buffers changed

use glam::{Mat4, Quat, Vec2, Vec3};
use rhizome_tweak_core::{AxisMask, MirrorMode};
use rhizome_tweak_history::{Checkpoint, VertexSnapshot};
use rhizome_tweak_mesh::{MeshBuffers, Topology, export_obj};
use rhizome_tweak_rig::{Skin, SkinPose};
use rhizome_tweak_spatial::{Aabb2, Ray};

use crate::brush;
use crate::error::{EditError, Result};
use crate::mirror::MirrorRelation;
use crate::projection::project_vertices;
use crate::query::{self, PickContext, RayHit};
use crate::selection::SelectionMask;
use crate::settings::{SELECTION_SETS, TweakSettings};
use crate::space::VertexSpace;
use crate::transform::{
    Assign, Move, Pivot, RotatePivot, Scale, TransformOp, reset_vertices, smooth_vertices,
};

/// Buffers changed since the last [`EditSession::take_dirty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dirty {
    /// Vertex positions.
    pub positions: bool,
    /// Vertex normals.
    pub normals: bool,
    /// Vertex tangents.
    pub tangents: bool,
    /// Selection weights.
    pub selection: bool,
}

impl Dirty {
    /// Returns true if anything changed.
    pub fn any(&self) -> bool {
        self.positions || self.normals || self.tangents || self.selection
    }
}

type MirrorKey = (usize, MirrorMode, u32);

/// Editing state for a single mesh.
pub struct EditSession {
    settings: TweakSettings,
    space: VertexSpace,
    base: MeshBuffers,
    selection: SelectionMask,
    selection_sets: Vec<Option<SelectionMask>>,
    pivot: Pivot,
    topology: Option<Topology>,
    mirror: Option<(MirrorKey, MirrorRelation)>,
    checkpoint: Option<Box<dyn Checkpoint>>,
    dirty: Dirty,
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("vertex_count", &self.vertex_count())
            .field("skinned", &self.space.is_skinned())
            .field("selected", &self.selection.num_selected())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl EditSession {
    /// Takes ownership of a mesh for editing.
    ///
    /// Missing normals and tangents are generated. With a skin, the mesh is
    /// treated as bind-pose data and posed immediately.
    pub fn begin(
        mut mesh: MeshBuffers,
        skin: Option<(Skin, SkinPose)>,
        settings: TweakSettings,
    ) -> Result<Self> {
        mesh.validate()?;
        mesh.ensure_normals_and_tangents(settings.tangent_precision);

        let n = mesh.vertex_count();
        let base = mesh.clone();
        let space = VertexSpace::new(mesh, skin)?;
        log::debug!(
            "edit session started: {} vertices, {} triangles, skinned: {}",
            n,
            base.triangle_count(),
            space.is_skinned()
        );

        Ok(Self {
            settings,
            space,
            base,
            selection: SelectionMask::new(n),
            selection_sets: vec![None; SELECTION_SETS],
            pivot: Pivot::default(),
            topology: None,
            mirror: None,
            checkpoint: None,
            dirty: Dirty::default(),
        })
    }

    /// Installs a callback that receives the pre-mutation state.
    pub fn with_checkpoint(mut self, checkpoint: impl Checkpoint + 'static) -> Self {
        self.checkpoint = Some(Box::new(checkpoint));
        self
    }

    /// Replaces or removes the checkpoint callback.
    pub fn set_checkpoint(&mut self, checkpoint: Option<Box<dyn Checkpoint>>) {
        self.checkpoint = checkpoint;
    }

    /// Releases the buffers, returning the edited bind-pose mesh.
    pub fn end(self) -> MeshBuffers {
        log::debug!("edit session ended: {} vertices", self.vertex_count());
        self.space.into_predeformed()
    }

    /// Current settings.
    pub fn settings(&self) -> &TweakSettings {
        &self.settings
    }

    /// Mutable settings.
    pub fn settings_mut(&mut self) -> &mut TweakSettings {
        &mut self.settings
    }

    /// Number of vertices being edited.
    pub fn vertex_count(&self) -> usize {
        self.base.vertex_count()
    }

    /// The mesh as it was when the session began.
    pub fn base(&self) -> &MeshBuffers {
        &self.base
    }

    /// Editable bind-pose data.
    pub fn predeformed(&self) -> &MeshBuffers {
        self.space.predeformed()
    }

    /// Displayed (posed) data.
    pub fn deformed(&self) -> &MeshBuffers {
        self.space.deformed()
    }

    /// Vertex storage.
    pub fn space(&self) -> &VertexSpace {
        &self.space
    }

    /// Current selection.
    pub fn selection(&self) -> &SelectionMask {
        &self.selection
    }

    /// Current transform pivot.
    pub fn pivot(&self) -> Pivot {
        self.pivot
    }

    /// Overrides the transform pivot.
    pub fn set_pivot(&mut self, pivot: Pivot) {
        self.pivot = pivot;
    }

    /// Returns and resets the dirty flags.
    pub fn take_dirty(&mut self) -> Dirty {
        std::mem::take(&mut self.dirty)
    }

    /// Captures the predeformed attributes.
    pub fn snapshot(&self, label: &str) -> VertexSnapshot {
        let mesh = self.space.predeformed();
        VertexSnapshot::capture(label, &mesh.positions, &mesh.normals, &mesh.tangents)
    }

    fn checkpoint(&mut self, label: &str) {
        if self.checkpoint.is_none() {
            return;
        }
        let snapshot = self.snapshot(label);
        if let Some(checkpoint) = self.checkpoint.as_mut() {
            checkpoint.before_mutate(snapshot);
        }
    }

    /// The selection to edit with; nothing selected means every vertex.
    fn edit_mask(&self) -> Option<&SelectionMask> {
        self.selection.any_selected().then_some(&self.selection)
    }

    // ------------------------------------------------------------------
    // Update pipeline
    // ------------------------------------------------------------------

    /// Brings derived data up to date after predeformed data changed.
    ///
    /// `wrote_attributes` is set when the edit wrote normals and tangents
    /// itself, which skips realtime recalculation.
    fn after_edit(&mut self, wrote_attributes: bool) {
        self.apply_mirror();

        let mut normals = wrote_attributes;
        let mut tangents = wrote_attributes;
        if !wrote_attributes && self.settings.realtime_normals() {
            let precision = self.settings.tangent_precision;
            let mesh = self.space.predeformed_mut();
            mesh.compute_smooth_normals();
            normals = true;
            if self.settings.realtime_tangents() {
                mesh.compute_tangents(precision);
                tangents = true;
            }
        }

        self.space.reskin();
        self.dirty.positions = true;
        self.dirty.normals |= normals;
        self.dirty.tangents |= tangents;
    }

    fn apply_mirror(&mut self) {
        let mode = self.settings.mirror_mode;
        if !mode.is_enabled() {
            return;
        }
        let key = (self.vertex_count(), mode, self.settings.mirror_epsilon.to_bits());
        let cached = self.mirror.as_ref().is_some_and(|(k, _)| *k == key);
        if !cached {
            let base = &self.base;
            let epsilon = self.settings.mirror_epsilon;
            match MirrorRelation::for_mode(mode, &base.positions, &base.normals, epsilon) {
                Ok(relation) => self.mirror = Some((key, relation)),
                Err(err) => {
                    log::warn!("mesh is not symmetric ({err}), mirroring disabled");
                    self.settings.mirror_mode = MirrorMode::None;
                    self.mirror = None;
                    return;
                }
            }
        }
        if let Some((_, relation)) = &self.mirror {
            let mesh = self.space.predeformed_mut();
            relation.apply(&mut mesh.positions, &mut mesh.normals, &mut mesh.tangents);
        }
    }

    /// Recomputes normals from the predeformed positions.
    pub fn recalculate_normals(&mut self) {
        self.space.predeformed_mut().compute_smooth_normals();
        self.space.reskin();
        self.dirty.normals = true;
    }

    /// Recomputes tangents from the predeformed normals and UVs.
    pub fn recalculate_tangents(&mut self) {
        let precision = self.settings.tangent_precision;
        self.space.predeformed_mut().compute_tangents(precision);
        self.space.reskin();
        self.dirty.tangents = true;
    }

    /// Finishes an interaction, running `Auto` recalculation.
    pub fn commit(&mut self) {
        if self.settings.commit_normals() {
            self.space.predeformed_mut().compute_smooth_normals();
            self.dirty.normals = true;
        }
        if self.settings.commit_tangents() {
            let precision = self.settings.tangent_precision;
            self.space.predeformed_mut().compute_tangents(precision);
            self.dirty.tangents = true;
        }
        self.space.reskin();
    }

    /// Restores predeformed attributes from a snapshot (undo or redo).
    pub fn restore(&mut self, snapshot: &VertexSnapshot) -> Result<()> {
        let expected = self.vertex_count();
        if snapshot.vertex_count() != expected {
            return Err(EditError::VertexCountMismatch {
                expected,
                got: snapshot.vertex_count(),
            });
        }
        let mesh = self.space.predeformed_mut();
        mesh.positions.clone_from(&snapshot.positions);
        mesh.normals.clone_from(&snapshot.normals);
        mesh.tangents.clone_from(&snapshot.tangents);
        self.space.reskin();
        self.dirty.positions = true;
        self.dirty.normals = true;
        self.dirty.tangents = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pose
    // ------------------------------------------------------------------

    /// Updates bone matrices; re-skins only if they changed.
    pub fn update_pose(&mut self, pose: SkinPose) -> bool {
        let changed = self.space.update_pose(pose);
        if changed {
            self.dirty.positions = true;
            self.dirty.normals = true;
            self.dirty.tangents = true;
        }
        changed
    }

    /// Moves every bone back to its bind transform.
    pub fn reset_to_bind_pose(&mut self) -> bool {
        let pose = match (self.space.skin(), self.space.pose()) {
            (Some(skin), Some(pose)) => skin.bind_pose(pose.root),
            _ => return false,
        };
        self.update_pose(pose)
    }

    /// Writes positions edited in posed space back into bind pose.
    pub fn set_deformed_positions(&mut self, positions: &[Vec3]) -> Result<()> {
        self.checkpoint("Set Positions");
        self.space.set_deformed_positions(positions)?;
        self.after_edit(false);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    fn selection_changed(&mut self, count: usize) -> usize {
        if count > 0 {
            self.dirty.selection = true;
            self.update_pivot();
        }
        count
    }

    /// Places the pivot at the selection's center, facing its average normal.
    pub fn update_pivot(&mut self) {
        let mesh = self.space.deformed();
        let summary = self.selection.summary(&mesh.positions, &mesh.normals, mesh.transform);
        if let Some(summary) = summary {
            self.pivot = Pivot::new(summary.center, summary.rotation());
        }
    }

    fn pick_context(&self, view_proj: Mat4, camera_position: Vec3) -> PickContext {
        PickContext::new(view_proj, camera_position)
            .with_front_face_only(self.settings.front_face_only)
    }

    /// Casts a ray against the displayed mesh.
    pub fn raycast(&self, ray: &Ray) -> Option<RayHit> {
        query::raycast(self.space.deformed(), ray)
    }

    /// Picks the vertex nearest the center of an NDC rectangle.
    pub fn pick_vertex(
        &self,
        view_proj: Mat4,
        camera_position: Vec3,
        rect: &Aabb2,
    ) -> Option<(usize, Vec3)> {
        let ctx = self.pick_context(view_proj, camera_position);
        query::pick_vertex(self.space.deformed(), &ctx, rect)
    }

    /// Selects the vertex nearest the center of an NDC rectangle.
    pub fn select_single(
        &mut self,
        view_proj: Mat4,
        camera_position: Vec3,
        rect: &Aabb2,
        strength: f32,
    ) -> usize {
        let ctx = self.pick_context(view_proj, camera_position);
        let mesh = self.space.deformed();
        let count = query::select_single(mesh, &mut self.selection, &ctx, rect, strength);
        self.selection_changed(count)
    }

    /// Selects vertices inside an NDC rectangle.
    pub fn select_rect(
        &mut self,
        view_proj: Mat4,
        camera_position: Vec3,
        rect: &Aabb2,
        strength: f32,
    ) -> usize {
        let ctx = self.pick_context(view_proj, camera_position);
        let mesh = self.space.deformed();
        let count = query::select_rect(mesh, &mut self.selection, &ctx, rect, strength);
        self.selection_changed(count)
    }

    /// Selects vertices inside an NDC lasso.
    pub fn select_lasso(
        &mut self,
        view_proj: Mat4,
        camera_position: Vec3,
        lasso: &[Vec2],
        strength: f32,
    ) -> usize {
        let ctx = self.pick_context(view_proj, camera_position);
        let mesh = self.space.deformed();
        let count = query::select_lasso(mesh, &mut self.selection, &ctx, lasso, strength);
        self.selection_changed(count)
    }

    /// Paints selection with the active brush.
    pub fn select_brush(&mut self, center: Vec3) -> usize {
        let brush = self.settings.brush();
        let count = brush.select(self.space.deformed(), &mut self.selection, center);
        self.selection_changed(count)
    }

    /// Selects the triangle under a ray.
    pub fn select_triangle(&mut self, ray: &Ray, strength: f32) -> usize {
        let mesh = self.space.deformed();
        let count = query::select_triangle(mesh, &mut self.selection, ray, strength);
        self.selection_changed(count)
    }

    /// Selects open-edge vertices.
    pub fn select_edge(&mut self, strength: f32, clear: bool) -> usize {
        let topology = self
            .topology
            .get_or_insert_with(|| Topology::new(&self.base.positions, &self.base.indices));
        let count = query::select_edge(topology, &mut self.selection, strength, clear);
        self.selection_changed(count)
    }

    /// Selects boundary loops.
    pub fn select_hole(&mut self, strength: f32, clear: bool) -> usize {
        let topology = self
            .topology
            .get_or_insert_with(|| Topology::new(&self.base.positions, &self.base.indices));
        let count = query::select_hole(topology, &mut self.selection, strength, clear);
        self.selection_changed(count)
    }

    /// Grows the selection across connected triangles.
    pub fn select_connected(&mut self, strength: f32, clear: bool) -> usize {
        let topology = self
            .topology
            .get_or_insert_with(|| Topology::new(&self.base.positions, &self.base.indices));
        let count = query::select_connected(topology, &mut self.selection, strength, clear);
        self.selection_changed(count)
    }

    /// Selects every vertex.
    pub fn select_all(&mut self) -> usize {
        self.selection.select_all();
        let n = self.selection.len();
        self.selection_changed(n)
    }

    /// Deselects every vertex.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.dirty.selection = true;
    }

    /// Inverts every selection weight.
    pub fn invert_selection(&mut self) -> usize {
        self.selection.invert();
        let n = self.selection.len();
        self.selection_changed(n)
    }

    /// Replaces the selection. Fails if the lengths differ.
    pub fn set_selection(&mut self, selection: SelectionMask) -> Result<()> {
        if selection.len() != self.vertex_count() {
            return Err(EditError::VertexCountMismatch {
                expected: self.vertex_count(),
                got: selection.len(),
            });
        }
        self.selection = selection;
        self.dirty.selection = true;
        self.update_pivot();
        Ok(())
    }

    /// Stores the selection in a slot. Returns false for an invalid slot.
    pub fn save_selection_set(&mut self, slot: usize) -> bool {
        let Some(set) = self.selection_sets.get_mut(slot) else {
            return false;
        };
        *set = Some(self.selection.clone());
        true
    }

    /// Restores the selection from a slot. Returns false if the slot is empty.
    pub fn load_selection_set(&mut self, slot: usize) -> bool {
        let Some(Some(set)) = self.selection_sets.get(slot) else {
            return false;
        };
        self.selection = set.clone();
        self.dirty.selection = true;
        self.update_pivot();
        true
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    /// Applies a transform to the selection (or every vertex without one).
    ///
    /// The transform runs on the displayed data, where the pivot lives, and
    /// skinned meshes carry the result back to bind pose.
    pub fn apply(&mut self, op: impl Into<TransformOp>) -> usize {
        let op = op.into();
        self.checkpoint(op.label());
        let mask = self.selection.any_selected().then_some(&self.selection);
        let count = self.space.edit_deformed(|mesh| op.apply(mesh, mask));
        self.after_edit(false);
        count
    }

    /// Applies a transform weighted by the active brush around `center`.
    pub fn apply_brush(&mut self, op: impl Into<TransformOp>, center: Vec3) -> usize {
        let op = op.into();
        let mask = self.brush_mask(center);
        if !mask.any_selected() {
            return 0;
        }
        self.checkpoint(op.label());
        let count = self.space.edit_deformed(|mesh| op.apply(mesh, Some(&mask)));
        self.after_edit(false);
        count
    }

    /// Applies a transform weighted by the selection, or by the brush when
    /// soft editing is enabled.
    pub fn apply_soft(&mut self, op: impl Into<TransformOp>, center: Vec3) -> usize {
        if self.settings.soft_op {
            self.apply_brush(op, center)
        } else {
            self.apply(op)
        }
    }

    fn brush_mask(&self, center: Vec3) -> SelectionMask {
        self.settings.brush().mask_at(&self.space.deformed().world_positions(), center)
    }

    /// Moves by `amount` in the configured coordinate space.
    pub fn move_vertices(&mut self, amount: Vec3) -> usize {
        let op = Move::new(amount)
            .in_space(self.settings.coordinate)
            .with_pivot_rotation(self.pivot.rotation);
        self.apply(op)
    }

    /// Rotates around the pivot.
    pub fn rotate_vertices(&mut self, rotation: Quat) -> usize {
        let op = RotatePivot::new(rotation, self.pivot).in_space(self.settings.coordinate);
        self.apply(op)
    }

    /// Scales around the pivot.
    pub fn scale_vertices(&mut self, scale: Vec3) -> usize {
        let op = Scale::new(scale, self.pivot).in_space(self.settings.coordinate);
        self.apply(op)
    }

    /// Assigns the configured value to the configured axes.
    pub fn assign_vertices(&mut self) -> usize {
        self.assign_with(self.settings.assign_value, self.settings.assign_axes)
    }

    /// Assigns `value` to the masked axes.
    pub fn assign_with(&mut self, value: Vec3, axes: AxisMask) -> usize {
        let op = Assign::new(value)
            .with_axes(axes)
            .in_space(self.settings.assign_coordinate)
            .with_pivot(self.pivot);
        self.apply(op)
    }

    /// Moves the selection back toward the base mesh.
    pub fn reset(&mut self) -> usize {
        self.checkpoint("Reset");
        let mask = self.selection.any_selected().then_some(&self.selection);
        let whole_mesh = mask.is_none();
        let count = reset_vertices(self.space.predeformed_mut(), &self.base, mask);
        // A full reset restores base normals exactly; partial ones recalculate
        self.after_edit(whole_mesh);
        count
    }

    /// Pulls vertices under the brush back toward the base mesh.
    ///
    /// The brush is placed on the displayed mesh.
    pub fn brush_reset(&mut self, center: Vec3) -> usize {
        let brush = self.settings.brush();
        let world = self.space.deformed().world_positions();
        if !brush.mask_at(&world, center).any_selected() {
            return 0;
        }
        self.checkpoint("Reset");
        let mesh = self.space.predeformed_mut();
        let count = brush::brush_reset(mesh, &self.base, &brush, &world, center);
        self.after_edit(false);
        count
    }

    /// Laplacian smoothing of the selection.
    pub fn smooth(&mut self, strength: f32) -> usize {
        self.checkpoint("Smooth");
        let mask = self.selection.any_selected().then_some(&self.selection);
        let topology = self
            .topology
            .get_or_insert_with(|| Topology::new(&self.base.positions, &self.base.indices));
        let count = smooth_vertices(self.space.predeformed_mut(), topology, mask, strength);
        self.after_edit(false);
        count
    }

    /// Smooths vertices under the brush, placed on the displayed mesh.
    pub fn brush_smooth(&mut self, center: Vec3) -> usize {
        let brush = self.settings.brush();
        let world = self.space.deformed().world_positions();
        if !brush.mask_at(&world, center).any_selected() {
            return 0;
        }
        self.checkpoint("Smooth");
        let topology = self
            .topology
            .get_or_insert_with(|| Topology::new(&self.base.positions, &self.base.indices));
        let mesh = self.space.predeformed_mut();
        let count = brush::brush_smooth(mesh, topology, &brush, &world, center);
        self.after_edit(false);
        count
    }

    /// Projects the displayed mesh onto `target` with the configured settings.
    ///
    /// Returns the number of vertices whose ray hit the target.
    pub fn project(&mut self, target: &MeshBuffers) -> Result<usize> {
        self.checkpoint("Projection");
        let projection = self.settings.projection;
        let projected = project_vertices(
            self.space.deformed(),
            target,
            &projection,
            Some(&self.base.normals),
            self.edit_mask(),
        );
        let wrote_attributes = projection.attributes.normal || projection.attributes.tangent;
        self.space
            .set_deformed(&projected.positions, &projected.normals, &projected.tangents)?;
        self.after_edit(wrote_attributes);
        Ok(projected.hit_count)
    }

    /// Writes the displayed mesh as OBJ text.
    pub fn export_obj(&self) -> String {
        export_obj(self.space.deformed(), &self.settings.obj_export)
    }
}

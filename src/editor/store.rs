use crate::catalog::{FilterId, StencilShape};
use crate::geometry::Point;

use super::command::EditCommand;
use super::document::{
    clamp_stencil_scale, clamp_zoom, normalize_rotation, AdjustmentKind, CropUpdate,
    EditDocument, SourceImage,
};
use super::history::{DocumentSnapshot, History, SnapshotOverrides};
use super::text::{NewText, TextOverlay, TextUpdate};

/// Single owner of the live document and its undo history.
///
/// Every mutation goes through a command method so clamping and snapshot
/// rules are applied in one place. Commands never fail: out-of-range values
/// are coerced and stale references are ignored.
#[derive(Debug)]
pub struct EditorStore {
    document: EditDocument,
    history: History,
    next_text_id: u64,
    revision: u64,
}

impl Default for EditorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorStore {
    pub fn new() -> Self {
        Self {
            document: EditDocument::default(),
            history: History::default(),
            next_text_id: 1,
            revision: 0,
        }
    }

    pub fn document(&self) -> &EditDocument {
        &self.document
    }

    pub fn history(&self) -> &[DocumentSnapshot] {
        self.history.entries()
    }

    /// Bumped on every applied change; observers compare it to skip redundant work.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    fn allocate_text_id(&mut self) -> u64 {
        let id = self.next_text_id;
        self.next_text_id = self.next_text_id.saturating_add(1);
        id
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn capture_snapshot(&mut self, overrides: SnapshotOverrides) {
        let snapshot = DocumentSnapshot::capture(&self.document, overrides);
        self.history.push(snapshot);
    }

    /// Snapshots the pre-command state, but only once an image is loaded.
    fn record_if_image(&mut self) {
        if self.document.has_image() {
            self.capture_snapshot(SnapshotOverrides::default());
        }
    }

    pub fn select_image(&mut self, image: SourceImage) {
        tracing::debug!(image_id = image.id(), size = ?image.size(), "select image");
        self.capture_snapshot(SnapshotOverrides::default());
        self.document.image = Some(image);
        self.touch();
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        let clamped = clamp_zoom(zoom);
        tracing::debug!(requested = zoom, zoom = clamped, "set zoom");
        self.document.zoom = clamped;
        self.touch();
    }

    pub fn set_position(&mut self, position: Point) {
        tracing::debug!(x = position.x, y = position.y, "set position");
        self.document.position = position;
        self.touch();
    }

    pub fn set_adjustment(&mut self, kind: AdjustmentKind, value: f64) {
        tracing::debug!(?kind, value, "set adjustment");
        self.record_if_image();
        self.document.adjustments.set(kind, value);
        self.touch();
    }

    pub fn set_stencil(&mut self, stencil: Option<StencilShape>) {
        tracing::debug!(?stencil, "set stencil");
        self.record_if_image();
        self.document.stencil = stencil;
        self.touch();
    }

    pub fn set_stencil_scale(&mut self, scale: f64) {
        let clamped = clamp_stencil_scale(scale);
        tracing::debug!(requested = scale, scale = clamped, "set stencil scale");
        self.document.stencil_scale = clamped;
        self.touch();
    }

    pub fn set_stencil_rotation(&mut self, degrees: f64) {
        let normalized = normalize_rotation(degrees);
        tracing::debug!(requested = degrees, degrees = normalized, "set stencil rotation");
        self.document.stencil_rotation = normalized;
        self.touch();
    }

    pub fn set_filter(&mut self, filter: FilterId) {
        tracing::debug!(%filter, "set filter");
        self.record_if_image();
        self.document.filter = filter;
        self.touch();
    }

    pub fn set_crop(&mut self, update: CropUpdate) {
        tracing::debug!(?update, "set crop");
        self.record_if_image();
        self.document.crop.merge(update);
        self.touch();
    }

    /// Appends a new overlay at the default anchor and selects it.
    pub fn add_text(&mut self, new_text: NewText) -> u64 {
        self.record_if_image();
        let id = self.allocate_text_id();
        self.document
            .text_objects
            .push(TextOverlay::from_new(id, new_text));
        self.document.selected_object_id = Some(id);
        self.touch();
        tracing::debug!(text_id = id, "add text");
        id
    }

    /// Returns `false` without touching history when `id` is unknown.
    pub fn update_text(&mut self, id: u64, update: TextUpdate) -> bool {
        if self.document.text(id).is_none() {
            tracing::debug!(text_id = id, "update for unknown text ignored");
            return false;
        }
        self.record_if_image();
        if let Some(text) = self.document.text_mut(id) {
            text.apply(update);
        }
        self.touch();
        tracing::debug!(text_id = id, "update text");
        true
    }

    /// Returns `false` without touching history when `id` is unknown.
    pub fn delete_text(&mut self, id: u64) -> bool {
        if self.document.text(id).is_none() {
            tracing::debug!(text_id = id, "delete for unknown text ignored");
            return false;
        }
        self.record_if_image();
        self.document.text_objects.retain(|text| text.id != id);
        if self.document.selected_object_id == Some(id) {
            self.document.selected_object_id = None;
        }
        self.touch();
        tracing::debug!(text_id = id, "delete text");
        true
    }

    pub fn set_selected_object(&mut self, id: Option<u64>) {
        self.document.selected_object_id = id;
        self.touch();
    }

    /// Unconditionally records the given image/zoom/position with the current
    /// adjustments, stencil, filter, crop and text.
    pub fn save_snapshot(&mut self, image: SourceImage, zoom: f64, position: Point) {
        let clamped = clamp_zoom(zoom);
        tracing::debug!(
            image_id = image.id(),
            requested = zoom,
            zoom = clamped,
            "save snapshot"
        );
        self.capture_snapshot(SnapshotOverrides {
            image: Some(image),
            zoom: Some(clamped),
            position: Some(position),
        });
        self.touch();
    }

    /// Restores the most recent snapshot. Returns `false` on empty history.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.pop() else {
            tracing::debug!("undo requested with empty history");
            return false;
        };
        snapshot.restore_into(&mut self.document);
        self.touch();
        tracing::debug!(remaining = self.history.len(), "undo applied");
        true
    }

    /// Returns every document field to its default; history is kept so the
    /// reset itself can be undone.
    pub fn reset(&mut self) {
        self.record_if_image();
        self.document = EditDocument::default();
        self.touch();
        tracing::debug!(history = self.history.len(), "document reset");
    }

    pub fn apply(&mut self, command: EditCommand) {
        tracing::debug!(command = command.name(), "dispatch command");
        match command {
            EditCommand::SetZoom { zoom } => self.set_zoom(zoom),
            EditCommand::SetPosition { x, y } => self.set_position(Point::new(x, y)),
            EditCommand::SetAdjustment { kind, value } => self.set_adjustment(kind, value),
            EditCommand::SetStencil { stencil } => self.set_stencil(stencil),
            EditCommand::SetStencilScale { scale } => self.set_stencil_scale(scale),
            EditCommand::SetStencilRotation { degrees } => self.set_stencil_rotation(degrees),
            EditCommand::SetFilter { filter } => self.set_filter(filter),
            EditCommand::SetCrop(update) => self.set_crop(update),
            EditCommand::AddText(new_text) => {
                self.add_text(new_text);
            }
            EditCommand::UpdateText { id, updates } => {
                self.update_text(id, updates);
            }
            EditCommand::DeleteText { id } => {
                self.delete_text(id);
            }
            EditCommand::SetSelectedObject { id } => self.set_selected_object(id),
            EditCommand::SaveSnapshot { zoom, position } => match self.document.image.clone() {
                Some(image) => self.save_snapshot(image, zoom, position),
                None => tracing::debug!("save snapshot ignored without an image"),
            },
            EditCommand::Undo => {
                self.undo();
            }
            EditCommand::Reset => self.reset(),
        }
    }
}

use crate::catalog::{FilterId, StencilShape};
use crate::geometry::Point;

use super::document::{Adjustments, CropSettings, EditDocument, SourceImage};
use super::text::TextOverlay;

/// Owned copy of every restorable document field.
///
/// The text list is cloned element by element and the image buffer is
/// immutable, so later edits to the live document never reach a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub image: Option<SourceImage>,
    pub zoom: f64,
    pub position: Point,
    pub adjustments: Adjustments,
    pub stencil: Option<StencilShape>,
    pub stencil_scale: f64,
    pub stencil_rotation: f64,
    pub filter: FilterId,
    pub crop: CropSettings,
    pub text_objects: Vec<TextOverlay>,
}

/// Values that replace the document's own image/zoom/position in a snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotOverrides {
    pub image: Option<SourceImage>,
    pub zoom: Option<f64>,
    pub position: Option<Point>,
}

impl DocumentSnapshot {
    pub(crate) fn capture(document: &EditDocument, overrides: SnapshotOverrides) -> Self {
        Self {
            image: overrides.image.or_else(|| document.image.clone()),
            zoom: overrides.zoom.unwrap_or(document.zoom),
            position: overrides.position.unwrap_or(document.position),
            adjustments: document.adjustments,
            stencil: document.stencil,
            stencil_scale: document.stencil_scale,
            stencil_rotation: document.stencil_rotation,
            filter: document.filter,
            crop: document.crop,
            text_objects: document.text_objects.clone(),
        }
    }

    /// Writes every snapshot field back; the selection pointer is left alone.
    pub(crate) fn restore_into(self, document: &mut EditDocument) {
        document.image = self.image;
        document.zoom = self.zoom;
        document.position = self.position;
        document.adjustments = self.adjustments;
        document.stencil = self.stencil;
        document.stencil_scale = self.stencil_scale;
        document.stencil_rotation = self.stencil_rotation;
        document.filter = self.filter;
        document.crop = self.crop;
        document.text_objects = self.text_objects;
    }
}

/// Linear undo stack. Popping discards the entry; there is no redo.
#[derive(Debug, Default, Clone)]
pub struct History {
    entries: Vec<DocumentSnapshot>,
}

impl History {
    pub fn push(&mut self, snapshot: DocumentSnapshot) {
        self.entries.push(snapshot);
    }

    pub fn pop(&mut self) -> Option<DocumentSnapshot> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DocumentSnapshot] {
        &self.entries
    }
}

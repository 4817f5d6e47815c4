use serde::{Deserialize, Serialize};

use crate::catalog::{FilterId, StencilShape};
use crate::geometry::Point;

use super::document::{AdjustmentKind, CropUpdate};
use super::text::{NewText, TextUpdate};

/// Store commands that carry plain value payloads.
///
/// Image selection is not listed: it takes a decoded image, which only the
/// ingestion boundary can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditCommand {
    SetZoom {
        zoom: f64,
    },
    SetPosition {
        x: f64,
        y: f64,
    },
    SetAdjustment {
        kind: AdjustmentKind,
        value: f64,
    },
    SetStencil {
        #[serde(default)]
        stencil: Option<StencilShape>,
    },
    SetStencilScale {
        scale: f64,
    },
    SetStencilRotation {
        degrees: f64,
    },
    SetFilter {
        filter: FilterId,
    },
    SetCrop(CropUpdate),
    AddText(NewText),
    UpdateText {
        id: u64,
        #[serde(default)]
        updates: TextUpdate,
    },
    DeleteText {
        id: u64,
    },
    SetSelectedObject {
        #[serde(default)]
        id: Option<u64>,
    },
    /// Records the current image with an explicit zoom and position.
    SaveSnapshot {
        zoom: f64,
        position: Point,
    },
    Undo,
    Reset,
}

impl EditCommand {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetZoom { .. } => "set_zoom",
            Self::SetPosition { .. } => "set_position",
            Self::SetAdjustment { .. } => "set_adjustment",
            Self::SetStencil { .. } => "set_stencil",
            Self::SetStencilScale { .. } => "set_stencil_scale",
            Self::SetStencilRotation { .. } => "set_stencil_rotation",
            Self::SetFilter { .. } => "set_filter",
            Self::SetCrop(_) => "set_crop",
            Self::AddText(_) => "add_text",
            Self::UpdateText { .. } => "update_text",
            Self::DeleteText { .. } => "delete_text",
            Self::SetSelectedObject { .. } => "set_selected_object",
            Self::SaveSnapshot { .. } => "save_snapshot",
            Self::Undo => "undo",
            Self::Reset => "reset",
        }
    }
}

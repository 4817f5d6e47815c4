//! Edit state: the live document, its undo history and the command store.

pub mod command;
pub mod document;
pub mod history;
pub mod store;
pub mod text;

pub use command::EditCommand;
pub use document::{
    AdjustmentKind, Adjustments, CropSettings, CropUpdate, EditDocument, SourceImage,
    STENCIL_SCALE_MAX, STENCIL_SCALE_MIN, ZOOM_MAX, ZOOM_MIN,
};
pub use history::{DocumentSnapshot, History, SnapshotOverrides};
pub use store::EditorStore;
pub use text::{NewText, TextFontFamily, TextOverlay, TextUpdate, DEFAULT_TEXT_ANCHOR};

//! Headless editing session: owns the store, compositor, interaction bridge
//! and decode worker, and replays JSON scripts of user actions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{FilterId, StencilShape};
use crate::config::AppConfig;
use crate::editor::{Adjustments, CropSettings, EditCommand, EditorStore, TextOverlay};
use crate::geometry::Point;
use crate::ingest::{DecodeOutcome, DecodeWorker, ImageSource, IngestError};
use crate::interaction::{Gesture, InteractionBridge};
use crate::render::{Compositor, Frame};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read script {}: {source}", path.display())]
    ReadScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse script {}: {source}", path.display())]
    ParseScript {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One replayed user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Upload a file; relative paths resolve against the script's directory.
    Load {
        path: PathBuf,
        #[serde(default)]
        media_type: Option<String>,
    },
    Edit(EditCommand),
    /// Press at `from`, move to `to`, release.
    Drag { from: Point, to: Point },
    Undo,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<ScriptStep>,
}

impl Script {
    pub fn parse(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageSummary {
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementSummary {
    pub fit_scale: f64,
    pub scale: f64,
    pub width: u32,
    pub height: u32,
    pub center: Point,
    pub operations: Vec<&'static str>,
}

/// Read-only view of the session state printed by the binary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub image: Option<ImageSummary>,
    pub zoom: f64,
    pub position: Point,
    pub adjustments: Adjustments,
    pub stencil: Option<StencilShape>,
    pub stencil_label: Option<&'static str>,
    pub stencil_scale: f64,
    pub stencil_rotation: f64,
    pub filter: FilterId,
    pub filter_label: &'static str,
    pub crop: CropSettings,
    pub text_objects: Vec<TextOverlay>,
    pub selected_object_id: Option<u64>,
    pub history_len: usize,
    pub placement: Option<PlacementSummary>,
    pub notices: Vec<String>,
}

#[derive(Debug)]
struct RenderedFrame {
    revision: u64,
    frame: Frame,
}

#[derive(Debug)]
pub struct Session {
    store: EditorStore,
    compositor: Compositor,
    bridge: InteractionBridge,
    worker: DecodeWorker,
    rendered: Option<RenderedFrame>,
    renders: u64,
    notices: Vec<String>,
}

impl Session {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_compositor(Compositor::from_config(config))
    }

    pub fn with_compositor(compositor: Compositor) -> Self {
        let bridge = InteractionBridge::new(compositor.canvas().size);
        Self {
            store: EditorStore::new(),
            compositor,
            bridge,
            worker: DecodeWorker::new(),
            rendered: None,
            renders: 0,
            notices: Vec::new(),
        }
    }

    pub fn store(&self) -> &EditorStore {
        &self.store
    }

    /// User-visible messages, e.g. rejected uploads.
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Number of full compositor passes so far.
    pub const fn renders(&self) -> u64 {
        self.renders
    }

    /// Starts decoding `source`; a later submission supersedes this one.
    pub fn submit_image(&mut self, source: ImageSource) -> u64 {
        tracing::debug!(name = %source.name, "image submitted");
        self.worker.submit(source)
    }

    /// Applies a finished decode, if any. Returns whether the document changed.
    pub fn pump(&mut self) -> bool {
        match self.worker.poll() {
            Some(outcome) => self.accept(outcome),
            None => false,
        }
    }

    /// Blocks until the latest submission finishes and applies it.
    pub fn finish_pending(&mut self) -> bool {
        match self.worker.wait() {
            Some(outcome) => self.accept(outcome),
            None => false,
        }
    }

    pub fn load(&mut self, source: ImageSource) -> bool {
        self.submit_image(source);
        self.finish_pending()
    }

    fn accept(&mut self, outcome: DecodeOutcome) -> bool {
        match outcome.result {
            Ok(image) => {
                tracing::info!(
                    ticket = outcome.ticket,
                    name = %outcome.name,
                    width = image.size().width,
                    height = image.size().height,
                    "image loaded"
                );
                self.store.select_image(image);
                true
            }
            Err(err) => {
                self.reject(&err);
                false
            }
        }
    }

    fn reject(&mut self, err: &IngestError) {
        tracing::warn!(error = %err, "upload rejected");
        self.notices.push(err.user_message());
    }

    pub fn dispatch(&mut self, command: EditCommand) {
        self.store.apply(command);
    }

    /// The frame for the current document, re-rendered only after a change.
    pub fn refresh(&mut self) -> &Frame {
        let revision = self.store.revision();
        let rendered = match self.rendered.take() {
            Some(rendered) if rendered.revision == revision => rendered,
            _ => {
                self.renders += 1;
                RenderedFrame {
                    revision,
                    frame: self.compositor.render(self.store.document()),
                }
            }
        };
        &self.rendered.insert(rendered).frame
    }

    /// A full press, move, release gesture against the rendered image.
    pub fn drag(&mut self, from: Point, to: Point) -> Option<Gesture> {
        let placement = self.refresh().placement().cloned();
        self.bridge.pointer_down(placement.as_ref(), from)?;
        let gesture = self.bridge.pointer_move(&mut self.store, to);
        self.bridge.pointer_up();
        gesture
    }

    pub fn run_step(&mut self, step: ScriptStep, base_dir: &Path) {
        match step {
            ScriptStep::Load { path, media_type } => {
                let path = if path.is_relative() {
                    base_dir.join(path)
                } else {
                    path
                };
                match ImageSource::from_path(&path) {
                    Ok(source) => {
                        let source = match media_type {
                            Some(media_type) => source.with_media_type(media_type),
                            None => source,
                        };
                        self.load(source);
                    }
                    Err(err) => self.reject(&err),
                }
            }
            ScriptStep::Edit(command) => self.dispatch(command),
            ScriptStep::Drag { from, to } => {
                if self.drag(from, to).is_none() {
                    tracing::debug!(?from, "drag missed the image");
                }
            }
            ScriptStep::Undo => {
                self.store.undo();
            }
            ScriptStep::Reset => self.store.reset(),
        }
        self.refresh();
    }

    pub fn run_script(&mut self, script: Script, base_dir: &Path) -> DocumentSummary {
        tracing::info!(steps = script.steps.len(), "running script");
        for step in script.steps {
            self.run_step(step, base_dir);
        }
        self.summary()
    }

    pub fn run_script_file(&mut self, path: &Path) -> Result<DocumentSummary, SessionError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SessionError::ReadScript {
            path: path.to_path_buf(),
            source,
        })?;
        let script = Script::parse(&contents).map_err(|source| SessionError::ParseScript {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(self.run_script(script, base_dir))
    }

    pub fn summary(&self) -> DocumentSummary {
        let document = self.store.document();
        let placement = self
            .rendered
            .as_ref()
            .filter(|rendered| rendered.revision == self.store.revision())
            .and_then(|rendered| rendered.frame.placement())
            .map(|placement| PlacementSummary {
                fit_scale: placement.fit_scale,
                scale: placement.scale,
                width: placement.extent.width,
                height: placement.extent.height,
                center: placement.center,
                operations: placement.operations.iter().map(|op| op.name()).collect(),
            });

        DocumentSummary {
            image: document.image.as_ref().map(|image| ImageSummary {
                id: image.id(),
                width: image.size().width,
                height: image.size().height,
            }),
            zoom: document.zoom,
            position: document.position,
            adjustments: document.adjustments,
            stencil: document.stencil,
            stencil_label: document.stencil.map(StencilShape::label),
            stencil_scale: document.stencil_scale,
            stencil_rotation: document.stencil_rotation,
            filter: document.filter,
            filter_label: document.filter.label(),
            crop: document.crop,
            text_objects: document.text_objects.clone(),
            selected_object_id: document.selected_object_id,
            history_len: self.store.history().len(),
            placement,
            notices: self.notices.clone(),
        }
    }
}

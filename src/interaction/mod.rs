//! Direct manipulation of the rendered image: body drags move it, corner
//! handle drags rescale it. Both feed the continuous store commands, so no
//! gesture ever records history.

use crate::editor::EditorStore;
use crate::geometry::{CanvasRect, Point, Size};
use crate::render::ImagePlacement;

/// Pointer distance from a corner that still grabs its handle.
pub const HANDLE_TOLERANCE: f64 = 8.0;
const MIN_GRAB_DISTANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl ResizeHandle {
    const ALL: [ResizeHandle; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomRight,
        Self::BottomLeft,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Handle(ResizeHandle),
    Body,
}

/// Handles win over the body so corners stay grabbable from inside the image.
pub fn hit_test(bounds: &CanvasRect, point: Point) -> Option<HitTarget> {
    for (handle, corner) in ResizeHandle::ALL.into_iter().zip(bounds.corners()) {
        if (point.x - corner.x).abs() <= HANDLE_TOLERANCE
            && (point.y - corner.y).abs() <= HANDLE_TOLERANCE
        {
            return Some(HitTarget::Handle(handle));
        }
    }
    bounds.contains(point).then_some(HitTarget::Body)
}

/// What a pointer move produced, already forwarded to the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// New absolute canvas centre of the image.
    Move { center: Point },
    /// New absolute render scale of the image.
    Scale { scale: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Move {
        grab_offset: Point,
    },
    Scale {
        handle: ResizeHandle,
        center: Point,
        start_scale: f64,
        start_distance: f64,
        fit_scale: f64,
    },
}

#[derive(Debug, Clone)]
pub struct InteractionBridge {
    canvas: Size,
    drag: DragState,
}

impl InteractionBridge {
    pub fn new(canvas: Size) -> Self {
        Self {
            canvas,
            drag: DragState::Idle,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag != DragState::Idle
    }

    /// Starts a gesture if `point` hits the placed image. Without a placement
    /// (no image rendered) the bridge stays inactive.
    pub fn pointer_down(
        &mut self,
        placement: Option<&ImagePlacement>,
        point: Point,
    ) -> Option<HitTarget> {
        self.drag = DragState::Idle;
        let placement = placement?;
        if !point.is_finite() {
            return None;
        }
        let target = hit_test(&placement.bounds, point)?;

        self.drag = match target {
            HitTarget::Body => DragState::Move {
                grab_offset: Point::new(
                    placement.center.x - point.x,
                    placement.center.y - point.y,
                ),
            },
            HitTarget::Handle(handle) => {
                let start_distance = placement.center.distance(point);
                if start_distance < MIN_GRAB_DISTANCE
                    || !placement.fit_scale.is_finite()
                    || placement.fit_scale <= 0.0
                {
                    return None;
                }
                DragState::Scale {
                    handle,
                    center: placement.center,
                    start_scale: placement.scale,
                    start_distance,
                    fit_scale: placement.fit_scale,
                }
            }
        };
        tracing::debug!(?target, x = point.x, y = point.y, "gesture started");
        Some(target)
    }

    /// Translates a pointer move into `set_position` or `set_zoom`.
    pub fn pointer_move(&mut self, store: &mut EditorStore, point: Point) -> Option<Gesture> {
        if !point.is_finite() {
            return None;
        }
        match self.drag {
            DragState::Idle => None,
            DragState::Move { grab_offset } => {
                let center = point.offset(grab_offset.x, grab_offset.y);
                let canvas_center = self.canvas.center();
                store.set_position(Point::new(
                    center.x - canvas_center.x,
                    center.y - canvas_center.y,
                ));
                Some(Gesture::Move { center })
            }
            DragState::Scale {
                handle,
                center,
                start_scale,
                start_distance,
                fit_scale,
            } => {
                let scale = start_scale * center.distance(point) / start_distance;
                if !scale.is_finite() {
                    return None;
                }
                store.set_zoom(scale / fit_scale);
                tracing::trace!(?handle, scale, "scale gesture");
                Some(Gesture::Scale { scale })
            }
        }
    }

    pub fn pointer_up(&mut self) {
        if self.is_dragging() {
            tracing::debug!("gesture finished");
        }
        self.drag = DragState::Idle;
    }
}

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::catalog::{FilterId, StencilShape};
use crate::geometry::{Point, Size};

use super::text::TextOverlay;

pub const ZOOM_MIN: f64 = 0.1;
pub const ZOOM_MAX: f64 = 3.0;
pub const STENCIL_SCALE_MIN: f64 = 0.1;
pub const STENCIL_SCALE_MAX: f64 = 2.0;
const DEGREES_PER_TURN: f64 = 360.0;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Decoded source pixels. Immutable once created; clones share the buffer.
#[derive(Clone)]
pub struct SourceImage {
    id: u64,
    pixels: Arc<RgbaImage>,
}

impl SourceImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            pixels: Arc::new(pixels),
        }
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn size(&self) -> Size {
        Size::new(self.pixels.width(), self.pixels.height())
    }
}

impl PartialEq for SourceImage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("id", &self.id)
            .field("width", &self.pixels.width())
            .field("height", &self.pixels.height())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentKind {
    Brightness,
    Contrast,
    Highlights,
    Shadows,
}

/// Slider values in `[-100, 100]`. Highlights and shadows are carried but not rendered.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Adjustments {
    pub brightness: f64,
    pub contrast: f64,
    pub highlights: f64,
    pub shadows: f64,
}

impl Adjustments {
    pub const fn get(&self, kind: AdjustmentKind) -> f64 {
        match kind {
            AdjustmentKind::Brightness => self.brightness,
            AdjustmentKind::Contrast => self.contrast,
            AdjustmentKind::Highlights => self.highlights,
            AdjustmentKind::Shadows => self.shadows,
        }
    }

    pub fn set(&mut self, kind: AdjustmentKind, value: f64) {
        let slot = match kind {
            AdjustmentKind::Brightness => &mut self.brightness,
            AdjustmentKind::Contrast => &mut self.contrast,
            AdjustmentKind::Highlights => &mut self.highlights,
            AdjustmentKind::Shadows => &mut self.shadows,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropSettings {
    pub aspect: Option<f64>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            aspect: None,
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        }
    }
}

/// Partial crop update; absent fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropUpdate {
    #[serde(default)]
    pub aspect: Option<Option<f64>>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

impl CropSettings {
    pub fn merge(&mut self, update: CropUpdate) {
        if let Some(aspect) = update.aspect {
            self.aspect = aspect;
        }
        if let Some(x) = update.x {
            self.x = x;
        }
        if let Some(y) = update.y {
            self.y = y;
        }
        if let Some(width) = update.width {
            self.width = width;
        }
        if let Some(height) = update.height {
            self.height = height;
        }
    }
}

/// The live editing state for one session.
///
/// `position` is the offset of the image centre from the canvas centre, so the
/// default places the image in the middle of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct EditDocument {
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
    pub selected_object_id: Option<u64>,
}

impl Default for EditDocument {
    fn default() -> Self {
        Self {
            image: None,
            zoom: 1.0,
            position: Point::ORIGIN,
            adjustments: Adjustments::default(),
            stencil: None,
            stencil_scale: 1.0,
            stencil_rotation: 0.0,
            filter: FilterId::None,
            crop: CropSettings::default(),
            text_objects: Vec::new(),
            selected_object_id: None,
        }
    }
}

impl EditDocument {
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn text(&self, id: u64) -> Option<&TextOverlay> {
        self.text_objects.iter().find(|text| text.id == id)
    }

    pub(crate) fn text_mut(&mut self, id: u64) -> Option<&mut TextOverlay> {
        self.text_objects.iter_mut().find(|text| text.id == id)
    }
}

pub fn clamp_zoom(zoom: f64) -> f64 {
    clamp_finite(zoom, ZOOM_MIN, ZOOM_MAX)
}

pub fn clamp_stencil_scale(scale: f64) -> f64 {
    clamp_finite(scale, STENCIL_SCALE_MIN, STENCIL_SCALE_MAX)
}

/// Maps any angle into `[0, 360)`, including negative inputs.
pub fn normalize_rotation(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let normalized = degrees.rem_euclid(DEGREES_PER_TURN);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= DEGREES_PER_TURN {
        0.0
    } else {
        normalized
    }
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_clamps_into_supported_range() {
        assert_eq!(clamp_zoom(0.0), ZOOM_MIN);
        assert_eq!(clamp_zoom(-4.0), ZOOM_MIN);
        assert_eq!(clamp_zoom(1.5), 1.5);
        assert_eq!(clamp_zoom(12.0), ZOOM_MAX);
        assert_eq!(clamp_zoom(f64::INFINITY), ZOOM_MAX);
        assert_eq!(clamp_zoom(f64::NAN), ZOOM_MIN);
    }

    #[test]
    fn rotation_normalizes_negative_and_wrapping_angles() {
        assert_eq!(normalize_rotation(0.0), 0.0);
        assert_eq!(normalize_rotation(360.0), 0.0);
        assert_eq!(normalize_rotation(725.0), 5.0);
        assert_eq!(normalize_rotation(-90.0), 270.0);
        assert_eq!(normalize_rotation(-720.0), 0.0);
        let tiny = normalize_rotation(-1e-14);
        assert!((0.0..360.0).contains(&tiny), "got {tiny}");
        assert_eq!(normalize_rotation(f64::NAN), 0.0);
    }

    #[test]
    fn crop_merge_only_touches_present_fields() {
        let mut crop = CropSettings::default();
        crop.merge(CropUpdate {
            aspect: Some(Some(1.5)),
            width: Some(40.0),
            ..CropUpdate::default()
        });
        assert_eq!(crop.aspect, Some(1.5));
        assert_eq!(crop.width, 40.0);
        assert_eq!(crop.height, 100.0);

        crop.merge(CropUpdate {
            aspect: Some(None),
            ..CropUpdate::default()
        });
        assert_eq!(crop.aspect, None);
        assert_eq!(crop.width, 40.0);
    }

    #[test]
    fn adjustments_address_each_field_by_kind() {
        let mut adjustments = Adjustments::default();
        adjustments.set(AdjustmentKind::Shadows, -30.0);
        adjustments.set(AdjustmentKind::Brightness, 25.0);
        assert_eq!(adjustments.get(AdjustmentKind::Shadows), -30.0);
        assert_eq!(adjustments.brightness, 25.0);
        assert_eq!(adjustments.contrast, 0.0);
    }

    #[test]
    fn source_images_compare_by_identity() {
        let pixels = RgbaImage::new(2, 2);
        let first = SourceImage::new(pixels.clone());
        let second = SourceImage::new(pixels);
        assert_ne!(first, second);
        assert_eq!(first, first.clone());
        assert_eq!(first.size(), Size::new(2, 2));
    }
}

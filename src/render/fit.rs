use crate::geometry::{CanvasRect, Point, Size};

/// Share of the binding canvas dimension the image fills at zoom 1.
pub const FIT_FRACTION: f64 = 0.9;

/// Scale that fits `image` into 90% of the binding `canvas` dimension,
/// preserving aspect ratio. `None` for zero-sized inputs.
pub fn fit_scale(image: Size, canvas: Size) -> Option<f64> {
    let image_aspect = image.aspect_ratio()?;
    let canvas_aspect = canvas.aspect_ratio()?;

    let final_width = if image_aspect > canvas_aspect {
        f64::from(canvas.width) * FIT_FRACTION
    } else {
        f64::from(canvas.height) * FIT_FRACTION * image_aspect
    };
    let scale = final_width / f64::from(image.width);
    (scale.is_finite() && scale > 0.0).then_some(scale)
}

/// Pixel extent of the image at `scale`, never below 1x1.
pub fn scaled_extent(image: Size, scale: f64) -> Size {
    let width = (f64::from(image.width) * scale).round().max(1.0);
    let height = (f64::from(image.height) * scale).round().max(1.0);
    Size::new(
        width.min(f64::from(u32::MAX)) as u32,
        height.min(f64::from(u32::MAX)) as u32,
    )
}

/// Canvas-space centre for an image offset `position` from the canvas centre.
pub fn image_center(canvas: Size, position: Point) -> Point {
    let center = canvas.center();
    center.offset(position.x, position.y)
}

pub fn image_bounds(center: Point, extent: Size) -> CanvasRect {
    CanvasRect::centered(center, f64::from(extent.width), f64::from(extent.height))
}

use image::{GrayImage, RgbaImage};
use kurbo::{Affine, BezPath, PathEl, Shape, Vec2};

use crate::catalog::StencilShape;
use crate::geometry::Size;

/// Share of the image box the stencil outline fills at stencil scale 1.
pub const STENCIL_FIT_FRACTION: f64 = 0.8;

/// Maps the normalized stencil outline into layer pixel space: centred on the
/// layer, fitted to 80% of it, then scaled by `stencil_scale` and rotated by
/// `rotation_degrees` about the layer centre.
pub fn stencil_transform(
    path: &BezPath,
    layer: Size,
    stencil_scale: f64,
    rotation_degrees: f64,
) -> Option<Affine> {
    let bounds = path.bounding_box();
    if bounds.width() <= 0.0 || bounds.height() <= 0.0 || layer.is_empty() {
        return None;
    }
    let fit = (f64::from(layer.width) / bounds.width())
        .min(f64::from(layer.height) / bounds.height())
        * STENCIL_FIT_FRACTION;
    let center = layer.center();
    let path_center = bounds.center().to_vec2();

    Some(
        Affine::translate(Vec2::new(center.x, center.y))
            * Affine::rotate(rotation_degrees.to_radians())
            * Affine::scale(fit * stencil_scale)
            * Affine::translate(-path_center),
    )
}

/// Coverage mask (255 inside, 0 outside) for `shape` over a layer of `layer` size.
pub fn stencil_mask(
    shape: StencilShape,
    layer: Size,
    stencil_scale: f64,
    rotation_degrees: f64,
) -> Option<GrayImage> {
    let mut path = shape.path()?;
    let transform = stencil_transform(&path, layer, stencil_scale, rotation_degrees)?;
    path.apply_affine(transform);
    fill_path(&path, layer)
}

/// Clears alpha wherever the mask is zero.
pub fn apply_mask(layer: &mut RgbaImage, mask: &GrayImage) {
    for (pixel, coverage) in layer.pixels_mut().zip(mask.pixels()) {
        let alpha = u16::from(pixel[3]) * u16::from(coverage[0]) / 255;
        pixel[3] = alpha as u8;
    }
}

/// Non-zero fill of the already transformed outline, without anti-aliasing so
/// the clip edge stays hard.
fn fill_path(path: &BezPath, size: Size) -> Option<GrayImage> {
    let mut mask = tiny_skia::Mask::new(size.width, size.height)?;
    if let Some(outline) = to_skia_path(path) {
        mask.fill_path(
            &outline,
            tiny_skia::FillRule::Winding,
            false,
            tiny_skia::Transform::identity(),
        );
    }
    GrayImage::from_raw(size.width, size.height, mask.data().to_vec())
}

fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut builder = tiny_skia::PathBuilder::new();
    for element in path.elements() {
        match *element {
            PathEl::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => {
                builder.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32)
            }
            PathEl::CurveTo(c1, c2, p) => builder.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => builder.close(),
        }
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(mask: &GrayImage) -> usize {
        mask.pixels().filter(|pixel| pixel[0] == 255).count()
    }

    #[test]
    fn square_stencil_covers_central_eighty_percent() {
        let mask = stencil_mask(StencilShape::Square, Size::new(100, 100), 1.0, 0.0)
            .expect("square mask");
        assert_eq!(mask.get_pixel(50, 50)[0], 255);
        assert_eq!(mask.get_pixel(10, 10)[0], 255);
        assert_eq!(mask.get_pixel(89, 89)[0], 255);
        assert_eq!(mask.get_pixel(9, 50)[0], 0);
        assert_eq!(mask.get_pixel(90, 50)[0], 0);
        assert_eq!(coverage(&mask), 80 * 80);
    }

    #[test]
    fn stencil_fits_the_binding_dimension_of_wide_layers() {
        let mask = stencil_mask(StencilShape::Square, Size::new(200, 100), 1.0, 0.0)
            .expect("square mask");
        assert_eq!(mask.get_pixel(100, 50)[0], 255);
        assert_eq!(mask.get_pixel(30, 50)[0], 0);
        assert_eq!(coverage(&mask), 80 * 80);
    }

    #[test]
    fn stencil_scale_grows_the_clip_region() {
        let small = stencil_mask(StencilShape::Circle, Size::new(120, 120), 0.5, 0.0)
            .expect("circle mask");
        let large = stencil_mask(StencilShape::Circle, Size::new(120, 120), 1.0, 0.0)
            .expect("circle mask");
        assert!(coverage(&small) < coverage(&large));
        assert_eq!(small.get_pixel(60, 60)[0], 255);
        assert_eq!(large.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn rotation_turns_the_outline_about_the_centre() {
        let upright = stencil_mask(StencilShape::Rectangle, Size::new(100, 100), 1.0, 0.0)
            .expect("rectangle mask");
        let turned = stencil_mask(StencilShape::Rectangle, Size::new(100, 100), 1.0, 90.0)
            .expect("rectangle mask");
        // 64 wide x 80 tall upright, 80 wide x 64 tall after a quarter turn
        assert_eq!(upright.get_pixel(50, 12)[0], 255);
        assert_eq!(upright.get_pixel(12, 50)[0], 0);
        assert_eq!(turned.get_pixel(12, 50)[0], 255);
        assert_eq!(turned.get_pixel(50, 12)[0], 0);
    }

    #[test]
    fn apply_mask_clears_alpha_outside_the_outline() {
        let mut layer = RgbaImage::from_pixel(100, 100, image::Rgba([9, 9, 9, 255]));
        let mask = stencil_mask(StencilShape::Star, Size::new(100, 100), 1.0, 0.0)
            .expect("star mask");
        apply_mask(&mut layer, &mask);
        assert_eq!(layer.get_pixel(0, 0)[3], 0);
        assert_eq!(layer.get_pixel(50, 55)[3], 255);
        assert_eq!(layer.get_pixel(50, 55)[0], 9);
    }

    #[test]
    fn mask_edges_are_hard() {
        let mask = stencil_mask(StencilShape::Circle, Size::new(90, 70), 1.3, 17.0)
            .expect("circle mask");
        assert!(mask.pixels().all(|pixel| pixel[0] == 0 || pixel[0] == 255));
    }

    #[test]
    fn empty_layers_produce_no_mask() {
        assert!(stencil_mask(StencilShape::Heart, Size::new(0, 40), 1.0, 0.0).is_none());
    }
}

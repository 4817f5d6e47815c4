use image::RgbaImage;

use crate::catalog::{FilterId, ImageOp};
use crate::editor::Adjustments;

const SLIDER_RANGE: f64 = 100.0;
const SEPIA_MATRIX: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Adjustment-derived steps (brightness, then contrast, each only if non-zero)
/// followed by the filter's catalog steps.
pub fn operation_chain(adjustments: &Adjustments, filter: FilterId) -> Vec<ImageOp> {
    let mut chain = Vec::with_capacity(2 + filter.operations().len());
    if adjustments.brightness != 0.0 {
        chain.push(ImageOp::Brightness((adjustments.brightness / SLIDER_RANGE) as f32));
    }
    if adjustments.contrast != 0.0 {
        chain.push(ImageOp::Contrast((adjustments.contrast / SLIDER_RANGE) as f32));
    }
    chain.extend_from_slice(filter.operations());
    chain
}

/// Applies the whole chain in a single pass over the pixels. Alpha is kept.
pub fn apply_operations(image: &mut RgbaImage, operations: &[ImageOp]) {
    if operations.is_empty() {
        return;
    }
    let kernels = operations
        .iter()
        .copied()
        .map(PixelKernel::from_op)
        .collect::<Vec<_>>();

    for pixel in image.pixels_mut() {
        let mut rgb = [
            f32::from(pixel[0]),
            f32::from(pixel[1]),
            f32::from(pixel[2]),
        ];
        for kernel in &kernels {
            rgb = kernel.apply(rgb).map(quantize);
        }
        pixel[0] = rgb[0] as u8;
        pixel[1] = rgb[1] as u8;
        pixel[2] = rgb[2] as u8;
    }
}

/// Per-op constants precomputed once per pass.
#[derive(Debug, Clone, Copy)]
enum PixelKernel {
    Offset(f32),
    Contrast(f32),
    Average,
    Matrix([[f32; 3]; 3]),
    Saturation(f32),
}

impl PixelKernel {
    fn from_op(op: ImageOp) -> Self {
        match op {
            ImageOp::Brightness(amount) => Self::Offset((amount * 255.0).round()),
            ImageOp::Contrast(amount) => {
                let contrast = (amount * 255.0).floor();
                Self::Contrast(259.0 * (contrast + 255.0) / (255.0 * (259.0 - contrast)))
            }
            ImageOp::Grayscale => Self::Average,
            ImageOp::Sepia => Self::Matrix(SEPIA_MATRIX),
            ImageOp::HueRotate(rotation) => Self::Matrix(hue_rotation_matrix(rotation)),
            ImageOp::Saturation(amount) => Self::Saturation(-amount),
        }
    }

    fn apply(self, [r, g, b]: [f32; 3]) -> [f32; 3] {
        match self {
            Self::Offset(offset) => [r + offset, g + offset, b + offset],
            Self::Contrast(factor) => [
                factor * (r - 128.0) + 128.0,
                factor * (g - 128.0) + 128.0,
                factor * (b - 128.0) + 128.0,
            ],
            Self::Average => {
                let mean = (r + g + b) / 3.0;
                [mean, mean, mean]
            }
            Self::Matrix(m) => [
                m[0][0] * r + m[0][1] * g + m[0][2] * b,
                m[1][0] * r + m[1][1] * g + m[1][2] * b,
                m[2][0] * r + m[2][1] * g + m[2][2] * b,
            ],
            Self::Saturation(adjust) => {
                let max = r.max(g).max(b);
                let shift = |channel: f32| {
                    if channel == max {
                        channel
                    } else {
                        channel + (max - channel) * adjust
                    }
                };
                [shift(r), shift(g), shift(b)]
            }
        }
    }
}

/// Hue rotation by `rotation * pi` radians around the grey axis.
fn hue_rotation_matrix(rotation: f32) -> [[f32; 3]; 3] {
    let radians = rotation * std::f32::consts::PI;
    let cos = radians.cos();
    let sin = radians.sin();
    let third: f32 = 1.0 / 3.0;
    let third_sqrt_sin = third.sqrt() * sin;
    let one_minus_cos = 1.0 - cos;
    let diagonal = cos + one_minus_cos * third;
    let plus = third * one_minus_cos + third_sqrt_sin;
    let minus = third * one_minus_cos - third_sqrt_sin;
    [
        [diagonal, minus, plus],
        [plus, diagonal, minus],
        [minus, plus, diagonal],
    ]
}

fn quantize(channel: f32) -> f32 {
    channel.round().clamp(0.0, 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn one_pixel(rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(1, 1, Rgba(rgba))
    }

    fn run(rgba: [u8; 4], ops: &[ImageOp]) -> [u8; 4] {
        let mut image = one_pixel(rgba);
        apply_operations(&mut image, ops);
        image.get_pixel(0, 0).0
    }

    #[test]
    fn chain_puts_adjustments_before_filter_steps() {
        let adjustments = Adjustments {
            brightness: 40.0,
            contrast: -20.0,
            ..Adjustments::default()
        };
        assert_eq!(
            operation_chain(&adjustments, FilterId::Vintage1),
            vec![
                ImageOp::Brightness(0.4),
                ImageOp::Contrast(-0.2),
                ImageOp::Sepia,
                ImageOp::Contrast(0.2),
            ]
        );
    }

    #[test]
    fn zero_adjustments_and_none_filter_produce_empty_chain() {
        let adjustments = Adjustments {
            highlights: 50.0,
            shadows: -50.0,
            ..Adjustments::default()
        };
        assert!(operation_chain(&adjustments, FilterId::None).is_empty());
    }

    #[test]
    fn empty_chain_leaves_pixels_untouched() {
        assert_eq!(run([12, 34, 56, 78], &[]), [12, 34, 56, 78]);
    }

    #[test]
    fn brightness_offsets_and_clamps_channels() {
        assert_eq!(run([100, 250, 0, 255], &[ImageOp::Brightness(0.2)]), [151, 255, 51, 255]);
        assert_eq!(run([100, 10, 0, 255], &[ImageOp::Brightness(-0.2)]), [49, 0, 0, 255]);
    }

    #[test]
    fn contrast_pivots_around_mid_grey() {
        assert_eq!(run([128, 128, 128, 255], &[ImageOp::Contrast(0.5)]), [128, 128, 128, 255]);
        let [r, _, b, _] = run([200, 128, 60, 255], &[ImageOp::Contrast(0.3)]);
        assert!(r > 200, "bright channel should rise, got {r}");
        assert!(b < 60, "dark channel should fall, got {b}");
    }

    #[test]
    fn grayscale_averages_and_keeps_alpha() {
        assert_eq!(run([30, 60, 90, 40], &[ImageOp::Grayscale]), [60, 60, 60, 40]);
    }

    #[test]
    fn sepia_applies_standard_matrix() {
        assert_eq!(run([100, 100, 100, 255], &[ImageOp::Sepia]), [135, 120, 94, 255]);
    }

    #[test]
    fn zero_hue_rotation_is_identity() {
        assert_eq!(run([200, 50, 10, 255], &[ImageOp::HueRotate(0.0)]), [200, 50, 10, 255]);
        assert_ne!(run([200, 50, 10, 255], &[ImageOp::HueRotate(0.15)]), [200, 50, 10, 255]);
    }

    #[test]
    fn positive_saturation_pushes_channels_away_from_max() {
        assert_eq!(run([200, 100, 50, 255], &[ImageOp::Saturation(0.5)]), [200, 50, 0, 255]);
        assert_eq!(run([200, 100, 50, 255], &[ImageOp::Saturation(0.0)]), [200, 100, 50, 255]);
        assert_eq!(run([200, 100, 0, 255], &[ImageOp::Saturation(-1.0)]), [200, 200, 200, 255]);
    }

    #[test]
    fn chained_operations_match_sequential_application() {
        let ops = [ImageOp::Sepia, ImageOp::Contrast(-0.2), ImageOp::Brightness(0.2)];
        let chained = run([90, 140, 210, 255], &ops);
        let mut stepwise = [90, 140, 210, 255];
        for op in ops {
            stepwise = run(stepwise, &[op]);
        }
        assert_eq!(chained, stepwise);
    }
}

use image::RgbaImage;

use crate::geometry::{Rgba, Size};

pub const BACKGROUND: Rgba = Rgba::WHITE;
pub const GRID_LINE: Rgba = Rgba::opaque(0xf3, 0xf4, 0xf6);

/// Fresh canvas: white fill with one-pixel grid lines every `grid_size` pixels,
/// starting at column and row zero.
pub fn grid_surface(canvas: Size, grid_size: u32) -> RgbaImage {
    let mut surface = RgbaImage::from_pixel(canvas.width, canvas.height, BACKGROUND.to_pixel());
    if grid_size == 0 {
        return surface;
    }

    let line = GRID_LINE.to_pixel();
    for (x, y, pixel) in surface.enumerate_pixels_mut() {
        if x % grid_size == 0 || y % grid_size == 0 {
            *pixel = line;
        }
    }
    surface
}

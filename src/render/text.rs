use std::collections::HashMap;
use std::path::Path;

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::RgbaImage;

use crate::config::FontEntry;
use crate::editor::text::primary_family;
use crate::editor::TextOverlay;
use crate::geometry::{Point, Rgba};

pub const TEXT_COLOR: Rgba = Rgba::BLACK;
const LINE_HEIGHT_FACTOR: f32 = 1.16;
const ITALIC_SHEAR: f32 = 0.2;
const BOLD_OFFSET: i32 = 1;

/// Font files keyed by lowercased family name, plus an optional fallback.
#[derive(Default, Clone)]
pub struct FontBook {
    families: HashMap<String, FontArc>,
    fallback: Option<FontArc>,
}

impl FontBook {
    pub fn load(entries: &[FontEntry], default_font: Option<&Path>) -> Self {
        let mut book = Self::default();
        for entry in entries {
            if let Some(font) = read_font(&entry.path) {
                book.insert(&entry.family, font);
            }
        }
        book.fallback = default_font.and_then(read_font);
        tracing::debug!(
            families = book.families.len(),
            fallback = book.fallback.is_some(),
            "font book loaded"
        );
        book
    }

    pub fn insert(&mut self, family: &str, font: FontArc) {
        self.families.insert(family.trim().to_ascii_lowercase(), font);
    }

    pub fn set_fallback(&mut self, font: FontArc) {
        self.fallback = Some(font);
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty() && self.fallback.is_none()
    }

    /// Font for a CSS-style family stack, matching on its first entry.
    pub fn font_for(&self, stack: &str) -> Option<&FontArc> {
        self.families
            .get(&primary_family(stack))
            .or(self.fallback.as_ref())
    }
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut families = self.families.keys().collect::<Vec<_>>();
        families.sort();
        f.debug_struct("FontBook")
            .field("families", &families)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

fn read_font(path: &Path) -> Option<FontArc> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read font file");
            return None;
        }
    };
    match FontArc::try_from_vec(bytes) {
        Ok(font) => Some(font),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to parse font file");
            None
        }
    }
}

/// Largest font size still rasterised; bigger overlays stay in the scene undrawn.
pub const MAX_RASTER_FONT_SIZE: f32 = 2048.0;

/// Half-open pixel window in an overlay's unrotated box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LocalWindow {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl LocalWindow {
    fn width(self) -> usize {
        (self.x1 - self.x0) as usize
    }

    fn height(self) -> usize {
        (self.y1 - self.y0) as usize
    }

    fn index(self, x: i32, y: i32) -> Option<usize> {
        if x < self.x0 || y < self.y0 || x >= self.x1 || y >= self.y1 {
            return None;
        }
        Some((y - self.y0) as usize * self.width() + (x - self.x0) as usize)
    }
}

/// Glyph coverage for the part of an overlay's box that can reach the surface.
#[derive(Debug, Clone)]
struct CoverageMap {
    window: LocalWindow,
    data: Vec<f32>,
}

impl CoverageMap {
    fn new(window: LocalWindow) -> Self {
        Self {
            window,
            data: vec![0.0; window.width() * window.height()],
        }
    }

    fn put(&mut self, x: i32, y: i32, coverage: f32) {
        if let Some(index) = self.window.index(x, y) {
            let slot = &mut self.data[index];
            *slot = slot.max(coverage.clamp(0.0, 1.0));
        }
    }

    fn get(&self, x: i32, y: i32) -> f32 {
        self.window
            .index(x, y)
            .map_or(0.0, |index| self.data[index])
    }
}

/// Overlay box metrics, top-left at the anchor.
#[derive(Debug, Clone, Copy)]
struct TextBox {
    width: f64,
    height: f64,
    text_height: f32,
    line_height: f32,
}

fn line_width<F: Font>(font: &F, scale: PxScale, line: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0;
    let mut previous: Option<GlyphId> = None;
    for ch in line.chars() {
        let glyph = font.glyph_id(ch);
        if let Some(previous) = previous {
            width += scaled.kern(previous, glyph);
        }
        width += scaled.h_advance(glyph);
        previous = Some(glyph);
    }
    width
}

fn measure<F: Font>(font: &F, overlay: &TextOverlay, lines: &[&str]) -> Option<TextBox> {
    if overlay.text.is_empty() || !overlay.font_size.is_finite() || overlay.font_size <= 0.0 {
        return None;
    }
    if overlay.font_size > MAX_RASTER_FONT_SIZE {
        tracing::debug!(
            id = overlay.id,
            font_size = overlay.font_size,
            "font size too large to rasterize"
        );
        return None;
    }
    let scale = PxScale::from(overlay.font_size);
    let line_height = overlay.font_size * LINE_HEIGHT_FACTOR;
    let text_width = lines
        .iter()
        .map(|line| line_width(font, scale, line))
        .fold(0.0_f32, f32::max);
    let text_height = lines.len() as f32 * line_height;
    let shear_room = if overlay.is_italic {
        (text_height * ITALIC_SHEAR).ceil()
    } else {
        0.0
    };
    let bold_room = if overlay.is_bold { BOLD_OFFSET } else { 0 };

    Some(TextBox {
        width: f64::from((text_width + shear_room).ceil()) + f64::from(bold_room) + 1.0,
        height: f64::from(text_height.ceil()) + 1.0,
        text_height,
        line_height,
    })
}

/// Part of the box whose pixels can land on a `surface`-sized canvas once
/// rotated about the anchor.
fn visible_window(
    surface: (u32, u32),
    anchor: Point,
    (sin, cos): (f64, f64),
    text_box: &TextBox,
) -> Option<LocalWindow> {
    let (width, height) = (f64::from(surface.0), f64::from(surface.1));
    let local = [(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)].map(|(x, y)| {
        let dx = x - anchor.x;
        let dy = y - anchor.y;
        (dx * cos + dy * sin, -dx * sin + dy * cos)
    });
    let min_x = local.iter().map(|p| p.0).fold(f64::MAX, f64::min).floor().max(0.0);
    let min_y = local.iter().map(|p| p.1).fold(f64::MAX, f64::min).floor().max(0.0);
    let max_x = local
        .iter()
        .map(|p| p.0)
        .fold(f64::MIN, f64::max)
        .ceil()
        .min(text_box.width);
    let max_y = local
        .iter()
        .map(|p| p.1)
        .fold(f64::MIN, f64::max)
        .ceil()
        .min(text_box.height);
    if min_x >= max_x || min_y >= max_y {
        return None;
    }
    Some(LocalWindow {
        x0: min_x as i32,
        y0: min_y as i32,
        x1: max_x as i32,
        y1: max_y as i32,
    })
}

fn rasterize<F: Font>(
    font: &F,
    overlay: &TextOverlay,
    lines: &[&str],
    text_box: &TextBox,
    window: LocalWindow,
) -> CoverageMap {
    let scale = PxScale::from(overlay.font_size);
    let scaled = font.as_scaled(scale);
    // glyph ink may overhang its advance box by up to about one em
    let margin = overlay.font_size;
    let mut map = CoverageMap::new(window);

    for (index, line) in lines.iter().enumerate() {
        let line_top = index as f32 * text_box.line_height;
        if line_top - margin >= window.y1 as f32 {
            break;
        }
        if line_top + text_box.line_height + margin <= window.y0 as f32 {
            continue;
        }
        let baseline = line_top + scaled.ascent();
        let mut caret = 0.0_f32;
        let mut previous: Option<GlyphId> = None;
        for ch in line.chars() {
            if caret - margin >= window.x1 as f32 {
                break;
            }
            let glyph_id = font.glyph_id(ch);
            if let Some(previous) = previous {
                caret += scaled.kern(previous, glyph_id);
            }
            let advance = scaled.h_advance(glyph_id);
            previous = Some(glyph_id);
            if caret + advance + margin * 2.0 <= window.x0 as f32 {
                caret += advance;
                continue;
            }

            let glyph = glyph_id.with_scale_and_position(scale, point(caret, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let y = (bounds.min.y + gy as f32) as i32;
                    let mut x = (bounds.min.x + gx as f32) as i32;
                    if overlay.is_italic {
                        x += ((text_box.text_height - y as f32) * ITALIC_SHEAR).round() as i32;
                    }
                    map.put(x, y, coverage);
                    if overlay.is_bold {
                        map.put(x + BOLD_OFFSET, y, coverage);
                    }
                });
            }
            caret += advance;
        }
    }
    map
}

/// Draws `overlay` onto `surface` with its box top-left at the overlay anchor,
/// rotated by the overlay rotation (degrees) about that anchor.
/// Returns whether anything was drawn.
pub fn draw_overlay<F: Font>(surface: &mut RgbaImage, font: &F, overlay: &TextOverlay) -> bool {
    let anchor = overlay.anchor();
    if !anchor.is_finite() {
        return false;
    }
    let lines = overlay.text.split('\n').collect::<Vec<_>>();
    let Some(text_box) = measure(font, overlay, &lines) else {
        return false;
    };

    let radians = if overlay.rotation.is_finite() {
        overlay.rotation.to_radians()
    } else {
        0.0
    };
    let (sin, cos) = radians.sin_cos();
    let Some(window) = visible_window(surface.dimensions(), anchor, (sin, cos), &text_box) else {
        return false;
    };
    let map = rasterize(font, overlay, &lines, &text_box, window);

    let (x0, y0) = (f64::from(window.x0), f64::from(window.y0));
    let (x1, y1) = (f64::from(window.x1), f64::from(window.y1));
    let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)].map(|(x, y)| {
        Point::new(
            anchor.x + x * cos - y * sin,
            anchor.y + x * sin + y * cos,
        )
    });
    let min_x = corners.iter().map(|c| c.x).fold(f64::MAX, f64::min).floor().max(0.0);
    let min_y = corners.iter().map(|c| c.y).fold(f64::MAX, f64::min).floor().max(0.0);
    let max_x = corners
        .iter()
        .map(|c| c.x)
        .fold(f64::MIN, f64::max)
        .ceil()
        .min(f64::from(surface.width()));
    let max_y = corners
        .iter()
        .map(|c| c.y)
        .fold(f64::MIN, f64::max)
        .ceil()
        .min(f64::from(surface.height()));
    if min_x >= max_x || min_y >= max_y {
        return false;
    }

    let color = TEXT_COLOR;
    let mut drawn = false;
    for py in min_y as u32..max_y as u32 {
        for px in min_x as u32..max_x as u32 {
            let dx = f64::from(px) + 0.5 - anchor.x;
            let dy = f64::from(py) + 0.5 - anchor.y;
            let local_x = dx * cos + dy * sin;
            let local_y = -dx * sin + dy * cos;
            let coverage = map.get(local_x.floor() as i32, local_y.floor() as i32);
            if coverage <= 0.0 {
                continue;
            }
            let alpha = coverage * f32::from(color.a) / 255.0;
            let pixel = surface.get_pixel_mut(px, py);
            pixel[0] = blend(color.r, pixel[0], alpha);
            pixel[1] = blend(color.g, pixel[1], alpha);
            pixel[2] = blend(color.b, pixel[2], alpha);
            pixel[3] = blend(255, pixel[3], alpha);
            drawn = true;
        }
    }
    drawn
}

/// Bundled DejaVu Sans, so text tests never depend on host fonts.
#[cfg(test)]
pub(crate) fn bundled_test_font() -> FontArc {
    FontArc::try_from_slice(include_bytes!("../../assets/fonts/DejaVuSans.ttf"))
        .expect("bundled font parses")
}

fn blend(source: u8, destination: u8, alpha: f32) -> u8 {
    let value = f32::from(source) * alpha + f32::from(destination) * (1.0 - alpha);
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{NewText, TextFontFamily};

    fn overlay(text: &str) -> TextOverlay {
        TextOverlay::from_new(1, NewText::new(text, TextFontFamily::Arial, 32.0))
    }

    fn dark_pixels(surface: &RgbaImage) -> usize {
        surface.pixels().filter(|pixel| pixel[0] < 128).count()
    }

    #[test]
    fn empty_book_resolves_nothing() {
        let book = FontBook::default();
        assert!(book.is_empty());
        assert!(book.font_for("Arial, sans-serif").is_none());
    }

    #[test]
    fn missing_font_files_are_skipped() {
        let book = FontBook::load(
            &[FontEntry {
                family: "Arial".to_string(),
                path: "/nonexistent/pictor/arial.ttf".into(),
            }],
            Some(Path::new("/nonexistent/pictor/default.ttf")),
        );
        assert!(book.is_empty());
    }

    #[test]
    fn font_lookup_matches_first_family_case_insensitively() {
        let mut book = FontBook::default();
        book.insert("Georgia", bundled_test_font());
        assert!(book.font_for("georgia, serif").is_some());
        assert!(book.font_for("Verdana, sans-serif").is_none());
    }

    #[test]
    fn overlay_is_drawn_right_and_below_its_anchor() {
        let font = bundled_test_font();
        let mut surface = RgbaImage::from_pixel(300, 200, Rgba::WHITE.to_pixel());
        let mut text = overlay("Hi");
        text.x = 100.0;
        text.y = 50.0;
        assert!(draw_overlay(&mut surface, &font, &text));

        let dark = surface
            .enumerate_pixels()
            .filter(|(_, _, pixel)| pixel[0] < 128)
            .collect::<Vec<_>>();
        assert!(!dark.is_empty());
        assert!(dark.iter().all(|(x, y, _)| *x >= 100 && *y >= 50));
    }

    #[test]
    fn rotation_turns_text_about_the_anchor() {
        let font = bundled_test_font();
        let mut surface = RgbaImage::from_pixel(300, 300, Rgba::WHITE.to_pixel());
        let mut text = overlay("Hello");
        text.x = 150.0;
        text.y = 150.0;
        text.rotation = 90.0;
        assert!(draw_overlay(&mut surface, &font, &text));

        let dark = surface
            .enumerate_pixels()
            .filter(|(_, _, pixel)| pixel[0] < 128)
            .collect::<Vec<_>>();
        // a quarter turn sends the text box down and to the left of the anchor
        assert!(dark.iter().all(|(x, y, _)| *x <= 150 && *y >= 149));
    }

    #[test]
    fn bold_text_inks_more_pixels() {
        let font = bundled_test_font();
        let mut regular_surface = RgbaImage::from_pixel(300, 100, Rgba::WHITE.to_pixel());
        let mut bold_surface = regular_surface.clone();
        let mut regular = overlay("Bold");
        regular.x = 10.0;
        regular.y = 10.0;
        let mut bold = regular.clone();
        bold.is_bold = true;

        draw_overlay(&mut regular_surface, &font, &regular);
        draw_overlay(&mut bold_surface, &font, &bold);
        assert!(dark_pixels(&bold_surface) > dark_pixels(&regular_surface));
    }

    #[test]
    fn italic_text_leans_right() {
        let font = bundled_test_font();
        let mut regular_surface = RgbaImage::from_pixel(200, 100, Rgba::WHITE.to_pixel());
        let mut italic_surface = regular_surface.clone();
        let mut regular = overlay("I");
        regular.x = 20.0;
        regular.y = 10.0;
        let mut italic = TextOverlay::from_new(
            2,
            NewText::new("I", TextFontFamily::Arial, 32.0).italic(true),
        );
        italic.x = 20.0;
        italic.y = 10.0;
        assert!(italic.is_italic);

        assert!(draw_overlay(&mut regular_surface, &font, &regular));
        assert!(draw_overlay(&mut italic_surface, &font, &italic));
        let rightmost = |surface: &RgbaImage| {
            surface
                .enumerate_pixels()
                .filter(|(_, _, pixel)| pixel[0] < 128)
                .map(|(x, _, _)| x)
                .max()
                .expect("text was inked")
        };
        assert!(rightmost(&italic_surface) > rightmost(&regular_surface));
    }

    #[test]
    fn empty_text_and_bad_sizes_draw_nothing() {
        let font = bundled_test_font();
        let mut surface = RgbaImage::from_pixel(50, 50, Rgba::WHITE.to_pixel());
        assert!(!draw_overlay(&mut surface, &font, &overlay("")));
        let mut zero = overlay("x");
        zero.font_size = 0.0;
        assert!(!draw_overlay(&mut surface, &font, &zero));
        assert_eq!(dark_pixels(&surface), 0);
    }

    #[test]
    fn oversized_fonts_are_skipped_without_allocating() {
        let font = bundled_test_font();
        let mut surface = RgbaImage::from_pixel(64, 64, Rgba::WHITE.to_pixel());
        let mut huge = overlay("Huge");
        huge.font_size = 1e9;
        assert!(!draw_overlay(&mut surface, &font, &huge));
        huge.font_size = MAX_RASTER_FONT_SIZE * 2.0;
        assert!(!draw_overlay(&mut surface, &font, &huge));
        assert_eq!(dark_pixels(&surface), 0);
    }

    #[test]
    fn large_fonts_only_rasterize_the_visible_part() {
        let font = bundled_test_font();
        let mut surface = RgbaImage::from_pixel(120, 80, Rgba::WHITE.to_pixel());
        let mut big = overlay("M");
        big.font_size = MAX_RASTER_FONT_SIZE;
        big.x = -100.0;
        big.y = -500.0;
        assert!(draw_overlay(&mut surface, &font, &big));
        assert!(dark_pixels(&surface) > 0);
    }

    #[test]
    fn very_long_lines_are_clipped_to_the_surface() {
        let font = bundled_test_font();
        let mut surface = RgbaImage::from_pixel(200, 100, Rgba::WHITE.to_pixel());
        let mut long = overlay(&"W".repeat(100_000));
        long.font_size = 72.0;
        long.x = 0.0;
        long.y = 0.0;
        assert!(draw_overlay(&mut surface, &font, &long));
        assert!(dark_pixels(&surface) > 0);
    }

    #[test]
    fn text_anchored_off_canvas_keeps_its_visible_part() {
        let font = bundled_test_font();
        let mut surface = RgbaImage::from_pixel(200, 100, Rgba::WHITE.to_pixel());
        let mut text = overlay("Hello world");
        text.x = -60.0;
        text.y = -12.0;
        assert!(draw_overlay(&mut surface, &font, &text));
        assert!(dark_pixels(&surface) > 0);

        let mut gone = overlay("Hello");
        gone.x = 500.0;
        gone.y = 500.0;
        let mut blank = RgbaImage::from_pixel(200, 100, Rgba::WHITE.to_pixel());
        assert!(!draw_overlay(&mut blank, &font, &gone));
    }
}

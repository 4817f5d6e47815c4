//! Deterministic compositor: grid, processed and stencil-clipped image, text overlays.

pub mod fit;
pub mod grid;
pub mod image_ops;
pub mod mask;
pub mod text;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::catalog::{ImageOp, StencilShape};
use crate::config::AppConfig;
use crate::editor::{EditDocument, SourceImage, TextOverlay};
use crate::geometry::{CanvasRect, Point, Size};

pub use fit::{fit_scale, FIT_FRACTION};
pub use text::FontBook;

/// Render surface extent and background grid spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSpec {
    pub size: Size,
    pub grid_size: u32,
}

impl Default for CanvasSpec {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl CanvasSpec {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            size: config.canvas_size(),
            grid_size: config.grid_size,
        }
    }
}

/// Where and how the image was placed in the last render.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    pub fit_scale: f64,
    /// `fit_scale * zoom`.
    pub scale: f64,
    pub extent: Size,
    pub center: Point,
    pub bounds: CanvasRect,
    pub operations: Vec<ImageOp>,
    pub stencil: Option<StencilShape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub id: u64,
    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    pub anchor: Point,
    pub rotation: f64,
    /// False when no font could be resolved for the overlay.
    pub rasterized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    Grid { spacing: u32 },
    Image(ImagePlacement),
    Text(TextNode),
}

/// Draw-order description of a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn placement(&self) -> Option<&ImagePlacement> {
        self.nodes.iter().find_map(|node| match node {
            SceneNode::Image(placement) => Some(placement),
            _ => None,
        })
    }

    pub fn text_nodes(&self) -> impl Iterator<Item = &TextNode> {
        self.nodes.iter().filter_map(|node| match node {
            SceneNode::Text(text) => Some(text),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub surface: RgbaImage,
    pub scene: Scene,
}

impl Frame {
    pub fn placement(&self) -> Option<&ImagePlacement> {
        self.scene.placement()
    }
}

/// Everything the processed image layer depends on. Position is absent so
/// moving the image only recomposites.
#[derive(Debug, Clone, PartialEq)]
struct LayerKey {
    image_id: u64,
    extent: Size,
    operations: Vec<ImageOp>,
    stencil: Option<StencilShape>,
    stencil_scale: f64,
    stencil_rotation: f64,
}

#[derive(Debug)]
struct LayerCache {
    key: LayerKey,
    layer: RgbaImage,
}

#[derive(Debug)]
pub struct Compositor {
    canvas: CanvasSpec,
    fonts: FontBook,
    cache: Option<LayerCache>,
    layer_builds: u64,
}

impl Compositor {
    pub fn new(canvas: CanvasSpec, fonts: FontBook) -> Self {
        Self {
            canvas,
            fonts,
            cache: None,
            layer_builds: 0,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let fonts = FontBook::load(&config.fonts, config.default_font.as_deref());
        Self::new(CanvasSpec::from_config(config), fonts)
    }

    pub const fn canvas(&self) -> CanvasSpec {
        self.canvas
    }

    pub fn fonts_mut(&mut self) -> &mut FontBook {
        &mut self.fonts
    }

    /// How many times the processed image layer has been rebuilt.
    pub const fn layer_builds(&self) -> u64 {
        self.layer_builds
    }

    /// Placement geometry for the document's image, without drawing.
    pub fn placement(&self, document: &EditDocument) -> Option<ImagePlacement> {
        let image = document.image.as_ref()?;
        let Some(fit_scale) = fit::fit_scale(image.size(), self.canvas.size) else {
            tracing::warn!(
                width = image.size().width,
                height = image.size().height,
                "degenerate image geometry; skipping image layer"
            );
            return None;
        };
        let center = fit::image_center(self.canvas.size, document.position);
        if !center.is_finite() {
            tracing::warn!(
                position = ?document.position,
                "non-finite image position; skipping image layer"
            );
            return None;
        }

        let scale = fit_scale * document.zoom;
        let extent = fit::scaled_extent(image.size(), scale);
        Some(ImagePlacement {
            fit_scale,
            scale,
            extent,
            center,
            bounds: fit::image_bounds(center, extent),
            operations: image_ops::operation_chain(&document.adjustments, document.filter),
            stencil: document.stencil,
        })
    }

    /// Full rebuild of the frame. Unchanged documents produce identical pixels.
    pub fn render(&mut self, document: &EditDocument) -> Frame {
        let spacing = self.canvas.grid_size;
        let mut surface = grid::grid_surface(self.canvas.size, spacing);
        let mut scene = Scene {
            nodes: vec![SceneNode::Grid { spacing }],
        };

        if let (Some(image), Some(placement)) = (document.image.as_ref(), self.placement(document))
        {
            let layer = self.image_layer(image, &placement, document);
            let x = (placement.bounds.x.round() as i64).clamp(-(1 << 31), 1 << 31);
            let y = (placement.bounds.y.round() as i64).clamp(-(1 << 31), 1 << 31);
            imageops::overlay(&mut surface, layer, x, y);
            scene.nodes.push(SceneNode::Image(placement));
        }

        for overlay in &document.text_objects {
            let node = self.draw_text(&mut surface, overlay);
            scene.nodes.push(SceneNode::Text(node));
        }

        Frame { surface, scene }
    }

    fn image_layer(
        &mut self,
        image: &SourceImage,
        placement: &ImagePlacement,
        document: &EditDocument,
    ) -> &RgbaImage {
        let key = LayerKey {
            image_id: image.id(),
            extent: placement.extent,
            operations: placement.operations.clone(),
            stencil: placement.stencil,
            stencil_scale: document.stencil_scale,
            stencil_rotation: document.stencil_rotation,
        };

        let cache = match self.cache.take() {
            Some(cache) if cache.key == key => cache,
            _ => {
                let layer = build_layer(image, &key);
                self.layer_builds += 1;
                tracing::debug!(
                    image_id = key.image_id,
                    width = key.extent.width,
                    height = key.extent.height,
                    operations = key.operations.len(),
                    stencil = ?key.stencil,
                    "rebuilt image layer"
                );
                LayerCache { key, layer }
            }
        };
        &self.cache.insert(cache).layer
    }

    fn draw_text(&self, surface: &mut RgbaImage, overlay: &TextOverlay) -> TextNode {
        let rasterized = match self.fonts.font_for(&overlay.font_family) {
            Some(font) => text::draw_overlay(surface, font, overlay),
            None => {
                tracing::debug!(
                    id = overlay.id,
                    family = %overlay.font_family,
                    "no font available; text overlay not rasterized"
                );
                false
            }
        };
        TextNode {
            id: overlay.id,
            text: overlay.text.clone(),
            font_family: overlay.font_family.clone(),
            font_size: overlay.font_size,
            anchor: overlay.anchor(),
            rotation: overlay.rotation,
            rasterized,
        }
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(CanvasSpec::default(), FontBook::default())
    }
}

/// Resize to the render extent, run the operation chain, then clip to the stencil.
fn build_layer(image: &SourceImage, key: &LayerKey) -> RgbaImage {
    let mut layer = imageops::resize(
        image.pixels(),
        key.extent.width,
        key.extent.height,
        FilterType::Triangle,
    );
    image_ops::apply_operations(&mut layer, &key.operations);
    if let Some(shape) = key.stencil {
        if let Some(mask) =
            mask::stencil_mask(shape, key.extent, key.stencil_scale, key.stencil_rotation)
        {
            mask::apply_mask(&mut layer, &mask);
        }
    }
    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FilterId;
    use crate::editor::{AdjustmentKind, EditorStore, NewText, TextFontFamily};
    use crate::geometry::Rgba;
    use image::Rgba as Pixel;

    fn red_image() -> SourceImage {
        SourceImage::new(RgbaImage::from_pixel(100, 60, Pixel([255, 0, 0, 255])))
    }

    fn loaded_store() -> EditorStore {
        let mut store = EditorStore::new();
        store.select_image(red_image());
        store
    }

    #[test]
    fn empty_document_renders_only_the_grid() {
        let mut compositor = Compositor::default();
        let frame = compositor.render(&EditDocument::default());

        assert_eq!(frame.surface.dimensions(), (1000, 600));
        assert_eq!(frame.scene.nodes, vec![SceneNode::Grid { spacing: 20 }]);
        assert_eq!(frame.surface, grid::grid_surface(Size::new(1000, 600), 20));
        assert_eq!(compositor.layer_builds(), 0);
    }

    #[test]
    fn image_is_fitted_and_centred() {
        let mut compositor = Compositor::default();
        let store = loaded_store();
        let frame = compositor.render(store.document());

        let placement = frame.placement().expect("image placed");
        assert!((placement.fit_scale - 9.0).abs() < 1e-9);
        assert_eq!(placement.extent, Size::new(900, 540));
        assert_eq!(placement.center, Point::new(500.0, 300.0));
        assert_eq!(*frame.surface.get_pixel(500, 300), Pixel([255, 0, 0, 255]));
        assert_eq!(*frame.surface.get_pixel(45, 301), Rgba::WHITE.to_pixel());
    }

    #[test]
    fn rebuilding_an_unchanged_document_is_byte_identical() {
        let mut compositor = Compositor::default();
        let mut store = loaded_store();
        store.set_filter(FilterId::Vintage2);
        store.set_stencil(Some(StencilShape::Heart));
        store.add_text(NewText::new("Hi", TextFontFamily::Arial, 24.0));

        let first = compositor.render(store.document());
        let second = compositor.render(store.document());
        assert_eq!(first.surface, second.surface);
        assert_eq!(first.scene, second.scene);
        assert_eq!(compositor.layer_builds(), 1);
    }

    #[test]
    fn zoom_set_through_the_store_rescales_the_image() {
        let mut compositor = Compositor::default();
        let mut store = loaded_store();
        let before = compositor.render(store.document());

        store.set_zoom(0.5);
        let after = compositor.render(store.document());

        let before = before.placement().expect("placed").clone();
        let after_placement = after.placement().expect("placed");
        assert_eq!(after_placement.extent, Size::new(450, 270));
        assert!((after_placement.scale - before.scale / 2.0).abs() < 1e-9);
        assert_eq!(*after.surface.get_pixel(101, 301), Rgba::WHITE.to_pixel());
        assert_eq!(compositor.layer_builds(), 2);
    }

    #[test]
    fn position_changes_reuse_the_processed_layer() {
        let mut compositor = Compositor::default();
        let mut store = loaded_store();
        store.set_filter(FilterId::Grayscale);
        compositor.render(store.document());

        store.set_position(Point::new(-100.0, 50.0));
        let moved = compositor.render(store.document());

        assert_eq!(compositor.layer_builds(), 1);
        let placement = moved.placement().expect("placed");
        assert_eq!(placement.center, Point::new(400.0, 350.0));
        assert_eq!(*moved.surface.get_pixel(905, 301), Rgba::WHITE.to_pixel());
        assert_eq!(*moved.surface.get_pixel(400, 350), Pixel([85, 85, 85, 255]));
    }

    #[test]
    fn stencil_clips_the_filtered_image() {
        let mut compositor = Compositor::default();
        let mut store = loaded_store();
        store.set_filter(FilterId::Grayscale);
        let unclipped = compositor.render(store.document());
        assert_eq!(*unclipped.surface.get_pixel(55, 35), Pixel([85, 85, 85, 255]));

        store.set_stencil(Some(StencilShape::Circle));
        let clipped = compositor.render(store.document());
        assert_eq!(*clipped.surface.get_pixel(500, 300), Pixel([85, 85, 85, 255]));
        assert_eq!(*clipped.surface.get_pixel(55, 35), Rgba::WHITE.to_pixel());
        assert_eq!(
            clipped.placement().expect("placed").stencil,
            Some(StencilShape::Circle)
        );
    }

    #[test]
    fn adjustments_run_before_filter_operations() {
        let mut compositor = Compositor::default();
        let mut store = loaded_store();
        store.set_adjustment(AdjustmentKind::Brightness, 20.0);
        store.set_filter(FilterId::Grayscale);
        let frame = compositor.render(store.document());

        let placement = frame.placement().expect("placed");
        assert_eq!(
            placement.operations,
            vec![ImageOp::Brightness(0.2), ImageOp::Grayscale]
        );
        // (255, 51, 51) averaged after the brightness offset
        assert_eq!(*frame.surface.get_pixel(500, 300), Pixel([119, 119, 119, 255]));
    }

    #[test]
    fn text_nodes_are_listed_without_fonts() {
        let mut compositor = Compositor::default();
        let mut store = loaded_store();
        let id = store.add_text(NewText::new("Caption", TextFontFamily::Verdana, 32.0));
        let frame = compositor.render(store.document());

        let nodes = frame.scene.text_nodes().collect::<Vec<_>>();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, id);
        assert_eq!(nodes[0].anchor, Point::new(400.0, 300.0));
        assert!(!nodes[0].rasterized);
        assert!(matches!(frame.scene.nodes.last(), Some(SceneNode::Text(_))));
    }

    #[test]
    fn text_is_drawn_outside_the_stencil_clip() {
        let mut compositor = Compositor::default();
        compositor.fonts_mut().set_fallback(text::bundled_test_font());
        let mut store = loaded_store();
        store.set_stencil(Some(StencilShape::Circle));
        let id = store.add_text(NewText::new("Corner", TextFontFamily::Arial, 24.0));
        store.update_text(
            id,
            crate::editor::TextUpdate {
                x: Some(60.0),
                y: Some(40.0),
                ..Default::default()
            },
        );
        let frame = compositor.render(store.document());

        let inked = (60..200)
            .flat_map(|x| (40..70).map(move |y| (x, y)))
            .any(|(x, y)| frame.surface.get_pixel(x, y)[0] < 128);
        assert!(inked, "text should be visible where the stencil hides the image");
        assert!(frame.scene.text_nodes().all(|node| node.rasterized));
    }

    #[test]
    fn degenerate_images_render_grid_without_panicking() {
        let mut compositor = Compositor::default();
        let mut store = EditorStore::new();
        store.select_image(SourceImage::new(RgbaImage::new(0, 10)));
        let frame = compositor.render(store.document());

        assert!(frame.placement().is_none());
        assert_eq!(frame.surface, grid::grid_surface(Size::new(1000, 600), 20));
    }

    #[test]
    fn non_finite_positions_skip_the_image() {
        let mut compositor = Compositor::default();
        let mut store = loaded_store();
        store.set_position(Point::new(f64::NAN, 0.0));
        assert!(compositor.render(store.document()).placement().is_none());
    }
}

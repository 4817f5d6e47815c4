use std::fmt;
use std::str::FromStr;

use kurbo::{BezPath, Shape};
use serde::{Deserialize, Serialize};

/// Clipping shapes, each a fixed path in a normalized 0..100 box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StencilShape {
    Circle,
    Square,
    Heart,
    Star,
    Hexagon,
    Oval,
    Rectangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilCategory {
    BasicShapes,
    Decorative,
    PhotoFrames,
}

impl StencilCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::BasicShapes => "Basic Shapes",
            Self::Decorative => "Decorative",
            Self::PhotoFrames => "Photo Frames",
        }
    }
}

impl StencilShape {
    pub const ALL: [StencilShape; 7] = [
        Self::Circle,
        Self::Square,
        Self::Heart,
        Self::Star,
        Self::Hexagon,
        Self::Oval,
        Self::Rectangle,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Square => "square",
            Self::Heart => "heart",
            Self::Star => "star",
            Self::Hexagon => "hexagon",
            Self::Oval => "oval",
            Self::Rectangle => "rectangle",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Circle => "Circle",
            Self::Square => "Square",
            Self::Heart => "Heart",
            Self::Star => "Star",
            Self::Hexagon => "Hexagon",
            Self::Oval => "Oval",
            Self::Rectangle => "Rectangle",
        }
    }

    pub const fn category(self) -> StencilCategory {
        match self {
            Self::Circle | Self::Square | Self::Hexagon => StencilCategory::BasicShapes,
            Self::Heart | Self::Star => StencilCategory::Decorative,
            Self::Oval | Self::Rectangle => StencilCategory::PhotoFrames,
        }
    }

    pub const fn svg_path(self) -> &'static str {
        match self {
            Self::Circle => "M50,0 A50,50 0 1,1 50,100 A50,50 0 1,1 50,0",
            Self::Square => "M0,0 L100,0 L100,100 L0,100 Z",
            Self::Heart => {
                "M50,30 A20,20 0 0,1 90,30 A20,20 0 0,1 50,70 A20,20 0 0,1 10,30 A20,20 0 0,1 50,30 Z"
            }
            Self::Star => "M50,0 L61,35 L98,35 L68,57 L79,91 L50,70 L21,91 L32,57 L2,35 L39,35 Z",
            Self::Hexagon => "M50,0 L93.3,25 L93.3,75 L50,100 L6.7,75 L6.7,25 Z",
            Self::Oval => "M10,50 A40,25 0 1,1 90,50 A40,25 0 1,1 10,50",
            Self::Rectangle => "M10,0 L90,0 L90,100 L10,100 Z",
        }
    }

    /// Parsed outline, or `None` if the built-in path data fails to parse.
    pub fn path(self) -> Option<BezPath> {
        match BezPath::from_svg(self.svg_path()) {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(stencil = self.id(), ?err, "stencil path failed to parse");
                None
            }
        }
    }

    pub fn bounds(self) -> Option<kurbo::Rect> {
        self.path().map(|path| path.bounding_box())
    }
}

impl fmt::Display for StencilShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stencil id: {0}")]
pub struct UnknownStencil(pub String);

impl FromStr for StencilShape {
    type Err = UnknownStencil;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|shape| shape.id() == value)
            .ok_or_else(|| UnknownStencil(value.to_string()))
    }
}

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Where freshly added overlays land on the canvas.
pub const DEFAULT_TEXT_ANCHOR: Point = Point::new(400.0, 300.0);

/// Font choices offered by the text panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFontFamily {
    Arial,
    TimesNewRoman,
    Georgia,
    Verdana,
    Montserrat,
}

impl TextFontFamily {
    pub const ALL: [TextFontFamily; 5] = [
        Self::Arial,
        Self::TimesNewRoman,
        Self::Georgia,
        Self::Verdana,
        Self::Montserrat,
    ];

    pub const PANEL_FONT_SIZES: [f32; 9] = [12.0, 14.0, 16.0, 18.0, 24.0, 32.0, 48.0, 64.0, 72.0];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Arial => "Arial",
            Self::TimesNewRoman => "Times New Roman",
            Self::Georgia => "Georgia",
            Self::Verdana => "Verdana",
            Self::Montserrat => "Montserrat",
        }
    }

    /// CSS-style family stack stored on overlays.
    pub const fn css_stack(self) -> &'static str {
        match self {
            Self::Arial => "Arial, sans-serif",
            Self::TimesNewRoman => "Times New Roman, serif",
            Self::Georgia => "Georgia, serif",
            Self::Verdana => "Verdana, sans-serif",
            Self::Montserrat => "Montserrat, sans-serif",
        }
    }
}

/// Leading family name of a stack, lowercased, e.g. `"Arial, sans-serif"` -> `"arial"`.
pub fn primary_family(stack: &str) -> String {
    stack
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub id: u64,
    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    pub is_bold: bool,
    pub is_italic: bool,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

/// Payload for the add-text command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewText {
    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    #[serde(default)]
    pub is_bold: bool,
    #[serde(default)]
    pub is_italic: bool,
}

impl NewText {
    pub fn new(text: impl Into<String>, family: TextFontFamily, font_size: f32) -> Self {
        Self {
            text: text.into(),
            font_family: family.css_stack().to_string(),
            font_size,
            is_bold: false,
            is_italic: false,
        }
    }

    pub fn bold(mut self, is_bold: bool) -> Self {
        self.is_bold = is_bold;
        self
    }

    pub fn italic(mut self, is_italic: bool) -> Self {
        self.is_italic = is_italic;
        self
    }
}

/// Partial overlay update; absent fields are left alone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextUpdate {
    pub text: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub is_bold: Option<bool>,
    pub is_italic: Option<bool>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub rotation: Option<f64>,
}

impl TextOverlay {
    pub(crate) fn from_new(id: u64, new: NewText) -> Self {
        Self {
            id,
            text: new.text,
            font_family: new.font_family,
            font_size: new.font_size,
            is_bold: new.is_bold,
            is_italic: new.is_italic,
            x: DEFAULT_TEXT_ANCHOR.x,
            y: DEFAULT_TEXT_ANCHOR.y,
            rotation: 0.0,
        }
    }

    pub fn anchor(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn apply(&mut self, update: TextUpdate) {
        let TextUpdate {
            text,
            font_family,
            font_size,
            is_bold,
            is_italic,
            x,
            y,
            rotation,
        } = update;
        if let Some(text) = text {
            self.text = text;
        }
        if let Some(font_family) = font_family {
            self.font_family = font_family;
        }
        if let Some(font_size) = font_size {
            self.font_size = font_size;
        }
        if let Some(is_bold) = is_bold {
            self.is_bold = is_bold;
        }
        if let Some(is_italic) = is_italic {
            self.is_italic = is_italic;
        }
        if let Some(x) = x {
            self.x = x;
        }
        if let Some(y) = y {
            self.y = y;
        }
        if let Some(rotation) = rotation {
            self.rotation = rotation;
        }
    }
}

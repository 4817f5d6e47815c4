use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One primitive image-processing step.
///
/// Parameters use the canvas-library conventions: brightness and contrast in
/// `[-1, 1]`, hue rotation as a fraction of pi, saturation in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageOp {
    Brightness(f32),
    Contrast(f32),
    Grayscale,
    Sepia,
    HueRotate(f32),
    Saturation(f32),
}

impl ImageOp {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Brightness(_) => "brightness",
            Self::Contrast(_) => "contrast",
            Self::Grayscale => "grayscale",
            Self::Sepia => "sepia",
            Self::HueRotate(_) => "hue-rotate",
            Self::Saturation(_) => "saturation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterId {
    #[default]
    None,
    Grayscale,
    Sepia,
    Vintage1,
    Vintage2,
    Cool,
    Warm,
    Sharp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterCategory {
    Basic,
    Vintage,
    Modern,
}

impl FilterCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Vintage => "Vintage",
            Self::Modern => "Modern",
        }
    }
}

const VINTAGE1_OPS: &[ImageOp] = &[ImageOp::Sepia, ImageOp::Contrast(0.2)];
const VINTAGE2_OPS: &[ImageOp] = &[
    ImageOp::Sepia,
    ImageOp::Contrast(-0.2),
    ImageOp::Brightness(0.2),
];
const COOL_OPS: &[ImageOp] = &[ImageOp::HueRotate(0.15), ImageOp::Saturation(0.5)];
const WARM_OPS: &[ImageOp] = &[
    ImageOp::Saturation(0.2),
    ImageOp::Brightness(0.1),
    ImageOp::Contrast(0.1),
];
const SHARP_OPS: &[ImageOp] = &[ImageOp::Contrast(0.3), ImageOp::Brightness(-0.1)];

impl FilterId {
    pub const ALL: [FilterId; 8] = [
        Self::None,
        Self::Grayscale,
        Self::Sepia,
        Self::Vintage1,
        Self::Vintage2,
        Self::Cool,
        Self::Warm,
        Self::Sharp,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Grayscale => "grayscale",
            Self::Sepia => "sepia",
            Self::Vintage1 => "vintage1",
            Self::Vintage2 => "vintage2",
            Self::Cool => "cool",
            Self::Warm => "warm",
            Self::Sharp => "sharp",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Grayscale => "Grayscale",
            Self::Sepia => "Sepia",
            Self::Vintage1 => "Vintage 1",
            Self::Vintage2 => "Vintage 2",
            Self::Cool => "Cool",
            Self::Warm => "Warm",
            Self::Sharp => "Sharp",
        }
    }

    pub const fn category(self) -> FilterCategory {
        match self {
            Self::None | Self::Grayscale | Self::Sepia => FilterCategory::Basic,
            Self::Vintage1 | Self::Vintage2 => FilterCategory::Vintage,
            Self::Cool | Self::Warm | Self::Sharp => FilterCategory::Modern,
        }
    }

    /// Ordered primitive operations realising this filter.
    pub const fn operations(self) -> &'static [ImageOp] {
        match self {
            Self::None => &[],
            Self::Grayscale => &[ImageOp::Grayscale],
            Self::Sepia => &[ImageOp::Sepia],
            Self::Vintage1 => VINTAGE1_OPS,
            Self::Vintage2 => VINTAGE2_OPS,
            Self::Cool => COOL_OPS,
            Self::Warm => WARM_OPS,
            Self::Sharp => SHARP_OPS,
        }
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter id: {0}")]
pub struct UnknownFilter(pub String);

impl FromStr for FilterId {
    type Err = UnknownFilter;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|filter| filter.id() == value)
            .ok_or_else(|| UnknownFilter(value.to_string()))
    }
}

/// Operations for a raw identifier; unknown identifiers contribute nothing.
pub fn operations_for_name(value: &str) -> &'static [ImageOp] {
    value
        .parse::<FilterId>()
        .map(FilterId::operations)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_and_unknown_filters_contribute_no_operations() {
        assert!(FilterId::None.operations().is_empty());
        assert!(operations_for_name("does-not-exist").is_empty());
        assert!(operations_for_name("").is_empty());
    }

    #[test]
    fn composite_filters_keep_catalog_order() {
        assert_eq!(
            FilterId::Vintage2.operations(),
            &[
                ImageOp::Sepia,
                ImageOp::Contrast(-0.2),
                ImageOp::Brightness(0.2)
            ]
        );
        assert_eq!(
            FilterId::Cool.operations(),
            &[ImageOp::HueRotate(0.15), ImageOp::Saturation(0.5)]
        );
        assert_eq!(
            FilterId::Sharp.operations(),
            &[ImageOp::Contrast(0.3), ImageOp::Brightness(-0.1)]
        );
    }

    #[test]
    fn lookup_is_pure_across_repeated_calls() {
        for filter in FilterId::ALL {
            assert_eq!(filter.operations(), filter.operations());
            assert_eq!(operations_for_name(filter.id()), filter.operations());
        }
    }

    #[test]
    fn ids_round_trip_through_from_str_and_serde() {
        for filter in FilterId::ALL {
            assert_eq!(filter.id().parse::<FilterId>(), Ok(filter));
        }
        let parsed: FilterId = serde_json::from_str("\"vintage1\"").expect("valid filter json");
        assert_eq!(parsed, FilterId::Vintage1);
        assert!("Sepia".parse::<FilterId>().is_err());
    }

    #[test]
    fn categories_group_filters_like_the_selector() {
        assert_eq!(FilterId::Sepia.category(), FilterCategory::Basic);
        assert_eq!(FilterId::Vintage1.category().label(), "Vintage");
        assert_eq!(FilterId::Warm.category(), FilterCategory::Modern);
    }
}

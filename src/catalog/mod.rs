//! Static filter and stencil catalogs.

pub mod filters;
pub mod stencils;

pub use filters::{operations_for_name, FilterCategory, FilterId, ImageOp, UnknownFilter};
pub use stencils::{StencilCategory, StencilShape, UnknownStencil};

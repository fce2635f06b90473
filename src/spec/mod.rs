//! Figure documents: partial tree, presets, validation and overrides.

pub mod load;
pub mod model;
pub mod overrides;
pub mod presets;
pub mod raw;
pub mod validate;

pub use load::{SpecSource, expand_overlays, load};
pub use model::*;
pub use overrides::{Override, apply_overrides, infer_value};
pub use raw::RawFigure;

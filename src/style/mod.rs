//! Unit and style resolution.
//!
//! Pure functions only: unit conversion, linestyle/color aliases, axis scale
//! transforms, tick placement and formatting, LaTeX emphasis wrapping.

pub mod color;
pub mod expr;
pub mod latex;
pub mod linestyle;
pub mod ticks;
pub mod units;

pub use color::{Color, Palette, parse_color};
pub use latex::{is_plain, to_display, wrap_emphasis};
pub use linestyle::{LineStyle, dash_segments, resolve_linestyle};
pub use ticks::{FormatterKind, TickFormatter, TickFormatterSpec, register_formatter};
pub use units::{AxisFrame, OffsetUnit, Scale, SizeUnit};

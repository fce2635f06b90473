//! Declarative figure rendering.
//!
//! A figure is described by a YAML/JSON document (size, font, layout, panels
//! of data series, overlays, export settings). The pipeline is:
//!
//! 1. `spec`: parse, expand overlay files, merge preset/theme/user layers,
//!    coerce and validate into a strict [`FigureSpec`].
//! 2. `data`: resolve every series' data reference into a [`Table`].
//! 3. `layers`: dispatch each series to the drawing strategy registered for
//!    its `type`.
//! 4. `overlay`: draw declarative shapes on top, one fail-soft item at a time.
//! 5. `render`: orchestrate panels and axes styling, then export.

/// Declares a closed set of string tags backed by a fieldless enum.
macro_rules! closed_set {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            /// Accepted spellings, in declaration order.
            pub const NAMES: &'static [&'static str] = &[$($text),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Case-insensitive lookup; surrounding whitespace is ignored.
            pub fn parse(s: &str) -> Option<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod data;
pub mod diagnostics;
pub mod error;
pub mod layers;
pub mod overlay;
pub mod render;
pub mod spec;
pub mod style;
pub mod surface;

pub use data::{DataSource, External, Table};
pub use error::{
    DataError, ExportError, FigureError, LayerError, OverlayRenderError, SchemaError,
    UnknownLayerError,
};
pub use layers::{Layer, LayerRegistry, register_layer, reset_layers};
pub use render::{ExportRoot, RenderOptions, render, render_spec, render_with};
pub use spec::{FigureSpec, Override, SpecSource, load};
pub use surface::{Axes, Figure, Surface};

pub type Result<T, E = FigureError> = std::result::Result<T, E>;

/// Version of the crate, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

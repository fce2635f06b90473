//! Drawing surface abstraction.
//!
//! Layers and overlays never talk to a backend directly: they add [`Artist`]s
//! to a [`Surface`]. The default surface is the recording [`Axes`] of a
//! [`Figure`], which the exporter later replays into a plotters backend.

pub mod figure;

pub use figure::{Axes, Figure, Label, Legend, LegendEntry, LegendKey, TextLook, TickLabel, Ticks};

use crate::spec::{HAlign, Marker, VAlign};
use crate::style::{Color, LineStyle, Palette};

/// Stroke of a line or a patch outline. Width in points.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    pub style: LineStyle,
}

impl Stroke {
    pub fn new(color: Color, width: f64, style: LineStyle) -> Self {
        Self {
            color,
            width,
            style,
        }
    }

    pub fn solid(color: Color, width: f64) -> Self {
        Self::new(color, width, LineStyle::Solid)
    }
}

/// Free text placed in data coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMark {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub color: Color,
    /// Points; `None` uses the figure font size.
    pub size: Option<f64>,
    pub ha: HAlign,
    pub va: VAlign,
    /// Degrees, counter-clockwise.
    pub rotation: f64,
}

/// Geometry of one artist, in data coordinates unless noted.
#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    Line {
        xs: Vec<f64>,
        ys: Vec<f64>,
        stroke: Stroke,
        marker: Option<Marker>,
    },
    Scatter {
        xs: Vec<f64>,
        ys: Vec<f64>,
        marker: Marker,
        /// Marker area in points squared.
        size: f64,
        color: Color,
    },
    /// Histogram bars: `heights[i]` spans `edges[i]..edges[i + 1]`.
    Bars {
        edges: Vec<f64>,
        heights: Vec<f64>,
        fill: Color,
        edge: Option<Stroke>,
    },
    /// Horizontal line across the whole axes.
    HLine { y: f64, stroke: Stroke },
    /// Vertical line across the whole axes.
    VLine { x: f64, stroke: Stroke },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Option<Color>,
        edge: Option<Stroke>,
    },
    Circle {
        x: f64,
        y: f64,
        radius: f64,
        fill: Option<Color>,
        edge: Option<Stroke>,
    },
    /// Vertical band; `ymin`/`ymax` are axes fractions.
    VSpan {
        x0: f64,
        x1: f64,
        ymin: f64,
        ymax: f64,
        fill: Option<Color>,
        edge: Option<Stroke>,
    },
    Text(TextMark),
}

impl Mark {
    /// Stacking order used when the caller gives none.
    pub fn default_zorder(&self) -> f64 {
        match self {
            Mark::Line { .. } | Mark::HLine { .. } | Mark::VLine { .. } => 2.0,
            Mark::Text(_) => 3.0,
            Mark::Scatter { .. }
            | Mark::Bars { .. }
            | Mark::Rect { .. }
            | Mark::Circle { .. }
            | Mark::VSpan { .. } => 1.0,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Mark::Line { .. } => "line",
            Mark::Scatter { .. } => "scatter",
            Mark::Bars { .. } => "bars",
            Mark::HLine { .. } => "hline",
            Mark::VLine { .. } => "vline",
            Mark::Rect { .. } => "rect",
            Mark::Circle { .. } => "circle",
            Mark::VSpan { .. } => "vspan",
            Mark::Text(_) => "text",
        }
    }
}

/// A mark plus its legend label and stacking order.
#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    pub mark: Mark,
    /// Legend label. `None` or empty keeps the artist out of the legend.
    pub label: Option<String>,
    pub zorder: f64,
}

impl Artist {
    pub fn new(mark: Mark) -> Self {
        let zorder = mark.default_zorder();
        Self {
            mark,
            label: None,
            zorder,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn with_zorder(mut self, zorder: Option<f64>) -> Self {
        if let Some(z) = zorder {
            self.zorder = z;
        }
        self
    }

    /// Label shown in the legend, if any.
    pub fn legend_label(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.is_empty())
    }
}

/// Something layers and overlays can draw onto: one axes of a figure.
pub trait Surface {
    /// Palette used to resolve `Cn` color references.
    fn palette(&self) -> Palette;

    fn add(&mut self, artist: Artist);

    /// Force the y view limits, applied after every other axes setting.
    fn pin_ylim(&mut self, lo: f64, hi: f64);

    fn plot(&mut self, xs: Vec<f64>, ys: Vec<f64>, stroke: Stroke, marker: Option<Marker>, label: Option<String>) {
        self.add(
            Artist::new(Mark::Line {
                xs,
                ys,
                stroke,
                marker,
            })
            .with_label(label),
        );
    }

    fn scatter(&mut self, xs: Vec<f64>, ys: Vec<f64>, marker: Marker, size: f64, color: Color, label: Option<String>) {
        self.add(
            Artist::new(Mark::Scatter {
                xs,
                ys,
                marker,
                size,
                color,
            })
            .with_label(label),
        );
    }

    fn bars(&mut self, edges: Vec<f64>, heights: Vec<f64>, fill: Color, label: Option<String>) {
        self.add(
            Artist::new(Mark::Bars {
                edges,
                heights,
                fill,
                edge: None,
            })
            .with_label(label),
        );
    }
}

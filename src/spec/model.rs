//! Strict figure model produced by validation.
//!
//! Everything here is resolved: closed sets are enums, colors are parsed,
//! TextLike fields are `Option<TextSpec>`. Downstream code never sees the raw
//! unions.

use crate::data::DataSource;
use crate::spec::raw::RawFigure;
use crate::style::{Color, LineStyle, OffsetUnit, Palette, Scale, SizeUnit, TickFormatterSpec};
use std::collections::BTreeMap;
use std::path::PathBuf;

closed_set! {
    /// Tick mark direction.
    pub enum TickDirection {
        In => "in",
        Out => "out",
        InOut => "inout",
    }
}

closed_set! {
    /// Which ticks the grid follows.
    pub enum GridWhich {
        Major => "major",
        Minor => "minor",
        Both => "both",
    }
}

closed_set! {
    pub enum HAlign {
        Left => "left",
        Center => "center",
        Right => "right",
    }
}

closed_set! {
    pub enum VAlign {
        Top => "top",
        Center => "center",
        Bottom => "bottom",
        Baseline => "baseline",
    }
}

closed_set! {
    /// Legend placement inside the axes box.
    pub enum LegendLoc {
        Best => "best",
        UpperRight => "upper right",
        UpperLeft => "upper left",
        LowerLeft => "lower left",
        LowerRight => "lower right",
        Right => "right",
        CenterLeft => "center left",
        CenterRight => "center right",
        LowerCenter => "lower center",
        UpperCenter => "upper center",
        Center => "center",
    }
}

closed_set! {
    /// Series marker symbols.
    pub enum Marker {
        Circle => "o",
        Square => "s",
        TriangleUp => "^",
        TriangleDown => "v",
        Diamond => "d",
        Cross => "x",
        Plus => "+",
        Dot => ".",
        Star => "*",
    }
}

closed_set! {
    /// Output file formats.
    pub enum ExportFormat {
        Png => "png",
        Svg => "svg",
        Pdf => "pdf",
    }
}

closed_set! {
    /// Declarative overlay shapes.
    pub enum OverlayKind {
        Line => "line",
        HLine => "hline",
        VLine => "vline",
        Point => "point",
        Rect => "rect",
        Circle => "circle",
        Annotation => "annotation",
        Band => "band",
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
    pub unit: SizeUnit,
}

impl Size {
    /// Canvas size in inches.
    pub fn inches(&self) -> (f64, f64) {
        (self.unit.to_inches(self.width), self.unit.to_inches(self.height))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
    pub weight: String,
    pub style: String,
    pub use_tex: bool,
    pub latex_preamble: Option<String>,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "serif".to_string(),
            size: 9.0,
            weight: "normal".to_string(),
            style: "normal".to_string(),
            use_tex: true,
            latex_preamble: Some(r"\usepackage{amsmath}".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSpec {
    pub rows: usize,
    pub cols: usize,
    /// `None` means automatic spacing.
    pub wspace: Option<f64>,
    pub hspace: Option<f64>,
    pub shared_x: bool,
    pub shared_y: bool,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            rows: 1,
            cols: 1,
            wspace: None,
            hspace: None,
            shared_x: false,
            shared_y: false,
        }
    }
}

/// Typographic properties shared by every text-bearing spec.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyleSpec {
    pub family: Option<String>,
    /// Points.
    pub size: Option<f64>,
    pub weight: Option<String>,
    pub style: Option<String>,
    pub color: Color,
}

impl Default for TextStyleSpec {
    fn default() -> Self {
        Self {
            family: None,
            size: None,
            weight: None,
            style: None,
            color: Color::BLACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    pub style: TextStyleSpec,
    pub show: bool,
    /// `None` keeps whatever the surface would show; `Some("")` shows nothing.
    pub text: Option<String>,
    pub rotation: Option<f64>,
    pub ha: Option<HAlign>,
    pub va: Option<VAlign>,
    /// Points.
    pub pad: Option<f64>,
    pub dx: Option<f64>,
    pub dy: Option<f64>,
    pub dx_unit: OffsetUnit,
    pub dy_unit: OffsetUnit,
}

impl Default for TextSpec {
    fn default() -> Self {
        Self {
            style: TextStyleSpec::default(),
            show: true,
            text: None,
            rotation: None,
            ha: None,
            va: None,
            pad: None,
            dx: None,
            dy: None,
            dx_unit: OffsetUnit::Axes,
            dy_unit: OffsetUnit::Axes,
        }
    }
}

impl TextSpec {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub show: bool,
    pub which: GridWhich,
    pub linestyle: LineStyle,
    pub linewidth: f64,
    pub color: Color,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            show: true,
            which: GridWhich::Both,
            linestyle: LineStyle::Dotted,
            linewidth: 0.5,
            color: Color::rgb(0xcc, 0xcc, 0xcc),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpinesSpec {
    pub show_left: bool,
    pub show_right: bool,
    pub show_top: bool,
    pub show_bottom: bool,
    pub color: Color,
    pub linewidth: Option<f64>,
}

impl Default for SpinesSpec {
    fn default() -> Self {
        Self {
            show_left: true,
            show_right: true,
            show_top: true,
            show_bottom: true,
            color: Color::BLACK,
            linewidth: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Limits {
    pub x: Option<(f64, f64)>,
    pub y: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendSpec {
    pub show: bool,
    pub loc: LegendLoc,
    pub ncol: usize,
    pub frameon: bool,
    pub title: Option<TextSpec>,
    pub labels: Option<Vec<Option<TextSpec>>>,
    pub style: Option<TextStyleSpec>,
    /// `[x, y]` or `[x, y, w, h]` in axes fractions.
    pub anchor: Option<Vec<f64>>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
    pub offset_unit: OffsetUnit,
}

impl Default for LegendSpec {
    fn default() -> Self {
        Self {
            show: true,
            loc: LegendLoc::Best,
            ncol: 1,
            frameon: false,
            title: None,
            labels: None,
            style: None,
            anchor: None,
            offset_x: None,
            offset_y: None,
            offset_unit: OffsetUnit::Axes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisTicksSpec {
    pub style: TextStyleSpec,
    pub show: bool,
    pub rotation: Option<f64>,
    pub direction: Option<TickDirection>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub locations: Option<Vec<f64>>,
    /// Inclusive `[min, max, step]`.
    pub range: Option<[f64; 3]>,
    pub fmt: Option<TickFormatterSpec>,
    pub labels: Option<Vec<Option<TextSpec>>>,
}

impl Default for AxisTicksSpec {
    fn default() -> Self {
        Self {
            style: TextStyleSpec::default(),
            show: true,
            rotation: None,
            direction: None,
            length: None,
            width: None,
            locations: None,
            range: None,
            fmt: None,
            labels: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxesSpec {
    pub title: Option<TextSpec>,
    pub xlabel: Option<TextSpec>,
    pub ylabel: Option<TextSpec>,
    pub xscale: Scale,
    pub yscale: Scale,
    pub grid: GridSpec,
    pub limits: Limits,
    pub legend: LegendSpec,
    pub spines: SpinesSpec,
    pub xticks: AxisTicksSpec,
    pub yticks: AxisTicksSpec,
    pub show_axes_frame: bool,
    pub show_xlabel: bool,
    pub show_ylabel: bool,
    pub show_title: bool,
}

impl Default for AxesSpec {
    fn default() -> Self {
        Self {
            title: None,
            xlabel: None,
            ylabel: None,
            xscale: Scale::Linear,
            yscale: Scale::Linear,
            grid: GridSpec::default(),
            limits: Limits::default(),
            legend: LegendSpec::default(),
            spines: SpinesSpec::default(),
            xticks: AxisTicksSpec::default(),
            yticks: AxisTicksSpec::default(),
            show_axes_frame: true,
            show_xlabel: true,
            show_ylabel: true,
            show_title: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSpec {
    pub color: Color,
    /// Points.
    pub width: f64,
    pub style: LineStyle,
    pub marker: Option<Marker>,
}

impl Default for LineSpec {
    fn default() -> Self {
        Self {
            color: Palette::default().cycle(0),
            width: 1.0,
            style: LineStyle::Solid,
            marker: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeriesSpec {
    /// Registered layer name. Unknown names fail at dispatch, not here.
    pub kind: String,
    pub x: Option<String>,
    pub y: Option<String>,
    pub data: Option<DataSource>,
    /// Boolean row filter, a SQL `WHERE` clause.
    pub query: Option<String>,
    pub style: LineSpec,
    pub label: Option<TextSpec>,
    pub bins: Option<usize>,
}

impl SeriesSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            x: None,
            y: None,
            data: None,
            query: None,
            style: LineSpec::default(),
            label: None,
            bins: None,
        }
    }

    /// Legend label text, if any.
    pub fn label_text(&self) -> Option<&str> {
        self.label.as_ref().and_then(|l| l.text.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySpec {
    pub kind: OverlayKind,
    pub color: Option<String>,
    pub edgecolor: Option<String>,
    pub facecolor: Option<String>,
    pub fill: Option<bool>,
    pub alpha: Option<f64>,
    pub linewidth: Option<f64>,
    pub linestyle: Option<String>,
    pub label: Option<String>,
    pub show_in_legend: bool,
    pub zorder: Option<i64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub x0: Option<f64>,
    pub x1: Option<f64>,
    pub y0: Option<f64>,
    pub y1: Option<f64>,
    pub radius: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub text: Option<String>,
    pub text_dx: f64,
    pub text_dy: f64,
    pub text_ha: Option<String>,
    pub text_va: Option<String>,
    pub text_rotation: Option<f64>,
    pub ymin_frac: Option<f64>,
    pub ymax_frac: Option<f64>,
}

impl OverlaySpec {
    pub fn new(kind: OverlayKind) -> Self {
        Self {
            kind,
            color: None,
            edgecolor: None,
            facecolor: None,
            fill: None,
            alpha: None,
            linewidth: None,
            linestyle: None,
            label: None,
            show_in_legend: false,
            zorder: None,
            x: None,
            y: None,
            x0: None,
            x1: None,
            y0: None,
            y1: None,
            radius: None,
            width: None,
            height: None,
            text: None,
            text_dx: 0.0,
            text_dy: 0.0,
            text_ha: None,
            text_va: None,
            text_rotation: None,
            ymin_frac: None,
            ymax_frac: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PanelSpec {
    pub axes: AxesSpec,
    pub series: Vec<SeriesSpec>,
    pub overlays: Vec<OverlaySpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpec {
    pub path: String,
    pub dpi: u32,
    pub formats: Vec<ExportFormat>,
    pub tight_layout: bool,
    pub metadata: BTreeMap<String, String>,
}

impl Default for ExportSpec {
    fn default() -> Self {
        Self {
            path: "figure.png".to_string(),
            dpi: 300,
            formats: vec![ExportFormat::Png],
            tight_layout: true,
            metadata: BTreeMap::new(),
        }
    }
}

/// A loaded, validated figure.
#[derive(Debug, Clone)]
pub struct FigureSpec {
    pub size: Size,
    pub font: FontSpec,
    pub layout: LayoutSpec,
    pub panels: Vec<PanelSpec>,
    pub theme: Option<String>,
    pub preset: Option<String>,
    pub palette: Palette,
    pub export: ExportSpec,
    pub axes_defaults: Option<AxesSpec>,
    /// Absolute directory for relative paths. Set by the loader.
    pub base_dir: PathBuf,
    /// Expanded user document this spec was validated from.
    pub(crate) document: RawFigure,
}

impl FigureSpec {
    /// The expanded user document (before preset/theme merging).
    pub fn document(&self) -> &RawFigure {
        &self.document
    }
}

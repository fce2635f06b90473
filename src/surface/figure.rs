//! In-memory figure: a grid of recording axes.

use crate::spec::{FigureSpec, FontSpec, HAlign, LayoutSpec, LegendLoc, Marker, SpinesSpec, TickDirection, VAlign};
use crate::style::{Color, OffsetUnit, Palette, Scale};
use crate::surface::{Artist, Mark, Stroke, Surface};

/// Resolved typography for one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLook {
    pub family: String,
    /// Points.
    pub size: f64,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
}

/// Title, axis label or legend title after styling.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub look: TextLook,
    pub rotation: Option<f64>,
    pub ha: Option<HAlign>,
    pub va: Option<VAlign>,
    /// Points between the label and the axes.
    pub pad: f64,
    pub dx: f64,
    pub dy: f64,
    pub dx_unit: OffsetUnit,
    pub dy_unit: OffsetUnit,
}

/// One tick label. Per-tick overrides may change the text and its look.
#[derive(Debug, Clone, PartialEq)]
pub struct TickLabel {
    pub text: String,
    pub look: TextLook,
}

/// Final tick marks and labels of one axis. `labels[i]` belongs to `positions[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticks {
    pub show: bool,
    pub positions: Vec<f64>,
    pub labels: Vec<TickLabel>,
    pub rotation: f64,
    pub direction: TickDirection,
    /// Points.
    pub length: f64,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LegendKey {
    Line(Stroke, Option<Marker>),
    Marker(Marker, Color),
    Patch(Color),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub key: LegendKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub loc: LegendLoc,
    pub ncol: usize,
    pub frameon: bool,
    pub title: Option<Label>,
    pub entries: Vec<LegendEntry>,
    pub look: TextLook,
    pub anchor: Option<Vec<f64>>,
    pub offset: (f64, f64),
    pub offset_unit: OffsetUnit,
}

/// One subplot. Records artists and the styling the orchestrator applied.
#[derive(Debug, Clone)]
pub struct Axes {
    palette: Palette,
    artists: Vec<Artist>,
    pinned_ylim: Option<(f64, f64)>,
    pub xscale: Scale,
    pub yscale: Scale,
    /// Final view limits, set once styling is complete.
    pub xlim: Option<(f64, f64)>,
    pub ylim: Option<(f64, f64)>,
    pub title: Option<Label>,
    pub xlabel: Option<Label>,
    pub ylabel: Option<Label>,
    pub grid: Option<crate::spec::GridSpec>,
    pub spines: SpinesSpec,
    pub frame: bool,
    pub xticks: Option<Ticks>,
    pub yticks: Option<Ticks>,
    pub legend: Option<Legend>,
}

impl Axes {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            artists: Vec::new(),
            pinned_ylim: None,
            xscale: Scale::Linear,
            yscale: Scale::Linear,
            xlim: None,
            ylim: None,
            title: None,
            xlabel: None,
            ylabel: None,
            grid: None,
            spines: SpinesSpec::default(),
            frame: true,
            xticks: None,
            yticks: None,
            legend: None,
        }
    }

    pub fn artists(&self) -> &[Artist] {
        &self.artists
    }

    pub fn pinned_ylim(&self) -> Option<(f64, f64)> {
        self.pinned_ylim
    }

    /// Extent of the drawn data, per axis. Values a log axis cannot show are skipped.
    pub fn data_bounds(&self) -> (Option<(f64, f64)>, Option<(f64, f64)>) {
        let mut xb = Bounds::new(self.xscale);
        let mut yb = Bounds::new(self.yscale);
        for artist in &self.artists {
            match &artist.mark {
                Mark::Line { xs, ys, .. } | Mark::Scatter { xs, ys, .. } => {
                    for (x, y) in xs.iter().zip(ys) {
                        if x.is_finite() && y.is_finite() {
                            xb.add(*x);
                            yb.add(*y);
                        }
                    }
                }
                Mark::Bars { edges, heights, .. } => {
                    edges.iter().for_each(|e| xb.add(*e));
                    heights.iter().for_each(|h| yb.add(*h));
                    if !heights.is_empty() {
                        yb.add(0.0);
                    }
                }
                Mark::HLine { y, .. } => yb.add(*y),
                Mark::VLine { x, .. } => xb.add(*x),
                Mark::Rect {
                    x, y, width, height, ..
                } => {
                    xb.add(*x);
                    xb.add(x + width);
                    yb.add(*y);
                    yb.add(y + height);
                }
                Mark::Circle { x, y, radius, .. } => {
                    xb.add(x - radius);
                    xb.add(x + radius);
                    yb.add(y - radius);
                    yb.add(y + radius);
                }
                Mark::VSpan { x0, x1, .. } => {
                    xb.add(*x0);
                    xb.add(*x1);
                }
                Mark::Text(_) => {}
            }
        }
        (xb.get(), yb.get())
    }

    /// Legend entries in drawing order, one per labelled artist.
    pub fn legend_entries(&self) -> Vec<LegendEntry> {
        self.artists
            .iter()
            .filter_map(|a| {
                let label = a.legend_label()?.to_string();
                let key = match &a.mark {
                    Mark::Line { stroke, marker, .. } => LegendKey::Line(stroke.clone(), *marker),
                    Mark::HLine { stroke, .. } | Mark::VLine { stroke, .. } => {
                        LegendKey::Line(stroke.clone(), None)
                    }
                    Mark::Scatter { marker, color, .. } => LegendKey::Marker(*marker, *color),
                    Mark::Bars { fill, .. } => LegendKey::Patch(*fill),
                    Mark::Rect { fill, edge, .. }
                    | Mark::Circle { fill, edge, .. }
                    | Mark::VSpan { fill, edge, .. } => LegendKey::Patch(
                        fill.or_else(|| edge.as_ref().map(|e| e.color))
                            .unwrap_or(Color::TRANSPARENT),
                    ),
                    Mark::Text(_) => return None,
                };
                Some(LegendEntry { label, key })
            })
            .collect()
    }
}

struct Bounds {
    scale: Scale,
    range: Option<(f64, f64)>,
}

impl Bounds {
    fn new(scale: Scale) -> Self {
        Self { scale, range: None }
    }

    fn add(&mut self, v: f64) {
        if !v.is_finite() || (self.scale == Scale::Log && v <= 0.0) {
            return;
        }
        self.range = Some(match self.range {
            None => (v, v),
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
        });
    }

    fn get(&self) -> Option<(f64, f64)> {
        self.range
    }
}

impl Surface for Axes {
    fn palette(&self) -> Palette {
        self.palette
    }

    fn add(&mut self, artist: Artist) {
        self.artists.push(artist);
    }

    fn pin_ylim(&mut self, lo: f64, hi: f64) {
        self.pinned_ylim = Some((lo, hi));
    }
}

/// Subplot grid with figure-wide settings. Removed cells hold `None`.
#[derive(Debug, Clone)]
pub struct Figure {
    /// Inches.
    pub width: f64,
    pub height: f64,
    pub font: FontSpec,
    pub layout: LayoutSpec,
    pub palette: Palette,
    cells: Vec<Option<Axes>>,
}

impl Figure {
    /// Empty figure with one axes per grid cell.
    pub fn new(spec: &FigureSpec) -> Self {
        let (width, height) = spec.size.inches();
        let n = spec.layout.rows * spec.layout.cols;
        Self {
            width,
            height,
            font: spec.font.clone(),
            layout: spec.layout.clone(),
            palette: spec.palette,
            cells: (0..n).map(|_| Some(Axes::new(spec.palette))).collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.layout.rows
    }

    pub fn cols(&self) -> usize {
        self.layout.cols
    }

    /// Row and column of the `index`-th cell, row-major.
    pub fn cell(&self, index: usize) -> (usize, usize) {
        (index / self.layout.cols, index % self.layout.cols)
    }

    pub fn axes(&self, index: usize) -> Option<&Axes> {
        self.cells.get(index).and_then(Option::as_ref)
    }

    pub fn axes_mut(&mut self, index: usize) -> Option<&mut Axes> {
        self.cells.get_mut(index).and_then(Option::as_mut)
    }

    /// Drop every cell from `used` onwards. Returns how many were removed.
    pub fn remove_unused(&mut self, used: usize) -> usize {
        let mut removed = 0;
        for cell in self.cells.iter_mut().skip(used) {
            if cell.take().is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Remaining axes with their grid index.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &Axes)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|a| (i, a)))
    }

    pub fn visible_mut(&mut self) -> impl Iterator<Item = (usize, &mut Axes)> {
        self.cells
            .iter_mut()
            .enumerate()
            .filter_map(|(i, c)| c.as_mut().map(|a| (i, a)))
    }
}

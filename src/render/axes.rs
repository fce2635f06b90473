//! Axes styling: labels, scales, limits, ticks, grid and legend.
//!
//! Styling runs after every series and overlay of a panel has been drawn, in
//! two steps: [`view_limits`] settles the visible ranges (shared axes are
//! unified by the caller in between), then [`decorate`] derives ticks and
//! text from them.

use crate::error::SchemaError;
use crate::spec::{AxesSpec, AxisTicksSpec, FontSpec, LegendSpec, TextSpec, TextStyleSpec, TickDirection};
use crate::style::latex::{is_bold_weight, is_italic_style};
use crate::style::ticks::tick_locations;
use crate::style::{Scale, TickFormatter, wrap_emphasis};
use crate::surface::{Axes, Label, Legend, TextLook, TickLabel, Ticks};

/// Fraction of the data span added on each side when autoscaling.
const MARGIN: f64 = 0.05;
/// Title size relative to the figure font size.
const TITLE_SCALE: f64 = 1.2;
/// Points between the title and the axes box.
const TITLE_PAD: f64 = 6.0;
/// Points between an axis label and its tick labels.
const LABEL_PAD: f64 = 4.0;
const TICK_LENGTH: f64 = 3.5;
const TICK_WIDTH: f64 = 0.8;

fn look(style: &TextStyleSpec, font: &FontSpec, default_size: f64) -> TextLook {
    TextLook {
        family: style.family.clone().unwrap_or_else(|| font.family.clone()),
        size: style.size.unwrap_or(default_size),
        color: style.color,
        bold: is_bold_weight(style.weight.as_deref().unwrap_or(&font.weight)),
        italic: is_italic_style(style.style.as_deref().unwrap_or(&font.style)),
    }
}

/// Styled label for a text spec, or `None` when nothing should be shown.
pub(crate) fn label(spec: Option<&TextSpec>, font: &FontSpec, default_size: f64, default_pad: f64) -> Option<Label> {
    let spec = spec.filter(|s| s.show)?;
    let text = spec.text.as_deref().filter(|t| !t.is_empty())?;
    let look = look(&spec.style, font, default_size);
    Some(Label {
        text: wrap_emphasis(text, look.bold, look.italic, font.use_tex),
        look,
        rotation: spec.rotation,
        ha: spec.ha,
        va: spec.va,
        pad: spec.pad.unwrap_or(default_pad),
        dx: spec.dx.unwrap_or(0.0),
        dy: spec.dy.unwrap_or(0.0),
        dx_unit: spec.dx_unit,
        dy_unit: spec.dy_unit,
    })
}

/// Expand a data range by the autoscale margin, in the scale's display space.
fn pad_range(lo: f64, hi: f64, scale: Scale) -> (f64, f64) {
    let (Some(a), Some(b)) = (scale.forward(lo), scale.forward(hi)) else {
        return (lo, hi);
    };
    if a == b {
        let d = if a == 0.0 { 1.0 } else { a.abs() * MARGIN };
        return (scale.inverse(a - d), scale.inverse(b + d));
    }
    let m = (b - a) * MARGIN;
    (scale.inverse(a - m), scale.inverse(b + m))
}

fn default_range(scale: Scale) -> (f64, f64) {
    match scale {
        Scale::Log => (1.0, 10.0),
        Scale::Linear | Scale::Symlog => (0.0, 1.0),
    }
}

/// Settle scales and view limits: explicit limits, else the padded data extent.
///
/// Pinned y-limits (set by a layer) are applied separately by
/// [`apply_pinned`], after shared axes have been unified.
pub fn view_limits(ax: &mut Axes, spec: &AxesSpec) {
    ax.xscale = spec.xscale;
    ax.yscale = spec.yscale;
    let (xb, yb) = ax.data_bounds();
    ax.xlim = Some(spec.limits.x.unwrap_or_else(|| {
        xb.map_or_else(|| default_range(spec.xscale), |(lo, hi)| pad_range(lo, hi, spec.xscale))
    }));
    ax.ylim = Some(spec.limits.y.unwrap_or_else(|| {
        yb.map_or_else(|| default_range(spec.yscale), |(lo, hi)| pad_range(lo, hi, spec.yscale))
    }));
}

/// Force the limits a layer pinned. Runs last so it beats user limits.
pub fn apply_pinned(ax: &mut Axes) {
    if let Some(lim) = ax.pinned_ylim() {
        ax.ylim = Some(lim);
    }
}

/// Labels for the given positions: formatter output, then per-tick overrides.
fn tick_labels(
    positions: &[f64],
    spec: &AxisTicksSpec,
    formatter: &TickFormatter,
    font: &FontSpec,
) -> Vec<TickLabel> {
    let base = look(&spec.style, font, font.size);
    positions
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let text = formatter.format(*v, i, font.use_tex);
            let over = spec.labels.as_ref().and_then(|l| l.get(i)).and_then(Option::as_ref);
            match over {
                None => TickLabel {
                    text: wrap_emphasis(&text, base.bold, base.italic, font.use_tex),
                    look: base.clone(),
                },
                Some(o) if !o.show => TickLabel {
                    text: String::new(),
                    look: base.clone(),
                },
                Some(o) => {
                    let look = TextLook {
                        family: o.style.family.clone().unwrap_or_else(|| base.family.clone()),
                        size: o.style.size.unwrap_or(base.size),
                        color: o.style.color,
                        bold: o.style.weight.as_deref().map_or(base.bold, is_bold_weight),
                        italic: o.style.style.as_deref().map_or(base.italic, is_italic_style),
                    };
                    let text = o.text.clone().unwrap_or(text);
                    TickLabel {
                        text: wrap_emphasis(&text, look.bold, look.italic, font.use_tex),
                        look,
                    }
                }
            }
        })
        .collect()
}

fn ticks(spec: &AxisTicksSpec, view: (f64, f64), scale: Scale, font: &FontSpec, path: &str) -> Result<Ticks, SchemaError> {
    let formatter = match &spec.fmt {
        Some(f) => TickFormatter::compile(f).map_err(|e| SchemaError::new(format!("{}.fmt", path), e))?,
        None => TickFormatter::default(),
    };
    let (lo, hi) = (view.0.min(view.1), view.0.max(view.1));
    let positions = tick_locations(spec.locations.as_deref(), spec.range, lo, hi, scale);
    let labels = tick_labels(&positions, spec, &formatter, font);
    Ok(Ticks {
        show: spec.show,
        positions,
        labels,
        rotation: spec.rotation.unwrap_or(0.0),
        direction: spec.direction.unwrap_or(TickDirection::Out),
        length: spec.length.unwrap_or(TICK_LENGTH),
        width: spec.width.unwrap_or(TICK_WIDTH),
    })
}

fn legend(ax: &Axes, spec: &LegendSpec, font: &FontSpec) -> Option<Legend> {
    if !spec.show {
        return None;
    }
    let mut entries = Vec::new();
    for (i, mut entry) in ax.legend_entries().into_iter().enumerate() {
        match spec.labels.as_ref().and_then(|l| l.get(i)).and_then(Option::as_ref) {
            Some(o) if !o.show => continue,
            Some(o) => {
                if let Some(text) = &o.text {
                    entry.label = text.clone();
                }
            }
            None => {}
        }
        entries.push(entry);
    }
    if entries.is_empty() {
        return None;
    }
    let look = look(spec.style.as_ref().unwrap_or(&TextStyleSpec::default()), font, font.size);
    for entry in &mut entries {
        entry.label = wrap_emphasis(&entry.label, look.bold, look.italic, font.use_tex);
    }
    Some(Legend {
        loc: spec.loc,
        ncol: spec.ncol,
        frameon: spec.frameon,
        title: label(spec.title.as_ref(), font, font.size, 0.0),
        entries,
        look,
        anchor: spec.anchor.clone(),
        offset: (spec.offset_x.unwrap_or(0.0), spec.offset_y.unwrap_or(0.0)),
        offset_unit: spec.offset_unit,
    })
}

/// Derive ticks, labels, grid, spines and legend from the settled limits.
pub fn decorate(ax: &mut Axes, spec: &AxesSpec, font: &FontSpec, path: &str) -> Result<(), SchemaError> {
    let xlim = ax.xlim.unwrap_or_else(|| default_range(ax.xscale));
    let ylim = ax.ylim.unwrap_or_else(|| default_range(ax.yscale));

    ax.title = label(
        spec.title.as_ref().filter(|_| spec.show_title),
        font,
        font.size * TITLE_SCALE,
        TITLE_PAD,
    );
    ax.xlabel = label(spec.xlabel.as_ref().filter(|_| spec.show_xlabel), font, font.size, LABEL_PAD);
    ax.ylabel = label(spec.ylabel.as_ref().filter(|_| spec.show_ylabel), font, font.size, LABEL_PAD);

    ax.xticks = Some(ticks(&spec.xticks, xlim, ax.xscale, font, &format!("{}.xticks", path))?);
    ax.yticks = Some(ticks(&spec.yticks, ylim, ax.yscale, font, &format!("{}.yticks", path))?);

    ax.grid = spec.grid.show.then(|| spec.grid.clone());
    ax.spines = spec.spines.clone();
    ax.frame = spec.show_axes_frame;
    ax.legend = legend(ax, &spec.legend, font);
    Ok(())
}

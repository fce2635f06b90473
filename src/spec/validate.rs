//! Coercion and validation of the merged partial tree into [`FigureSpec`].
//!
//! Errors carry the dotted path of the offending field and abort the whole
//! load; nothing partially valid escapes.

use crate::data::{DataSource, ReaderKind};
use crate::error::SchemaError;
use crate::spec::model::*;
use crate::spec::raw::*;
use crate::style::{
    Color, FormatterKind, OffsetUnit, Palette, Scale, SizeUnit, TickFormatter, TickFormatterSpec,
    parse_color, resolve_linestyle,
};
use crate::style::ticks::MAX_TICKS;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;

type Result<T> = std::result::Result<T, SchemaError>;

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", path, field)
    }
}

fn index(path: &str, i: usize) -> String {
    format!("{}[{}]", path, i)
}

fn unknown(path: String, value: &str, names: &[&str]) -> SchemaError {
    SchemaError::new(
        path,
        format!("unknown value {:?} (expected one of {})", value, names.join(", ")),
    )
}

fn closed<T: Copy>(
    value: Option<&str>,
    path: String,
    parse: fn(&str) -> Option<T>,
    names: &[&str],
    default: T,
) -> Result<T> {
    match value {
        None => Ok(default),
        Some(v) => parse(v).ok_or_else(|| unknown(path, v, names)),
    }
}

fn color(value: Option<&str>, path: String, palette: Palette, default: Color) -> Result<Color> {
    match value {
        None => Ok(default),
        Some(v) => parse_color(v, palette).map_err(|e| SchemaError::new(path, e)),
    }
}

fn positive(value: Option<f64>, path: String) -> Result<Option<f64>> {
    match value {
        Some(v) if !(v > 0.0 && v.is_finite()) => Err(SchemaError::new(
            path,
            format!("must be a positive number, got {}", v),
        )),
        other => Ok(other),
    }
}

fn non_negative(value: Option<f64>, path: String) -> Result<Option<f64>> {
    match value {
        Some(v) if !(v >= 0.0 && v.is_finite()) => Err(SchemaError::new(
            path,
            format!("must be zero or positive, got {}", v),
        )),
        other => Ok(other),
    }
}

fn count(value: Option<i64>, path: String, min: i64, default: usize) -> Result<usize> {
    match value {
        None => Ok(default),
        Some(v) if v < min => Err(SchemaError::new(
            path,
            format!("must be at least {}, got {}", min, v),
        )),
        Some(v) => usize::try_from(v).map_err(|_| SchemaError::new(path, "out of range")),
    }
}

/// Re-parse a value the untagged union could not place, to surface serde's reason.
fn reparse<T: DeserializeOwned>(value: &Value, path: String, expected: &str) -> Result<T> {
    if !value.is_object() {
        return Err(SchemaError::new(
            path,
            format!("expected {}, got {}", expected, value),
        ));
    }
    serde_json::from_value(value.clone())
        .map_err(|e| SchemaError::new(path, format!("expected {}: {}", expected, e)))
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

struct StyleFields<'a> {
    family: &'a Option<String>,
    size: Option<f64>,
    weight: &'a Option<String>,
    style: &'a Option<String>,
    color: &'a Option<String>,
}

fn text_style(f: StyleFields<'_>, path: &str, palette: Palette) -> Result<TextStyleSpec> {
    Ok(TextStyleSpec {
        family: f.family.clone(),
        size: positive(f.size, join(path, "size"))?,
        weight: f.weight.clone(),
        style: f.style.clone(),
        color: color(f.color.as_deref(), join(path, "color"), palette, Color::BLACK)?,
    })
}

fn raw_style(raw: &RawTextStyle, path: &str, palette: Palette) -> Result<TextStyleSpec> {
    text_style(
        StyleFields {
            family: &raw.family,
            size: raw.size,
            weight: &raw.weight,
            style: &raw.style,
            color: &raw.color,
        },
        path,
        palette,
    )
}

fn text_spec(raw: &RawTextSpec, path: &str, palette: Palette) -> Result<TextSpec> {
    let offset_unit = |v: &Option<String>, field: &str| {
        closed(
            v.as_deref(),
            join(path, field),
            OffsetUnit::parse,
            OffsetUnit::NAMES,
            OffsetUnit::Axes,
        )
    };
    Ok(TextSpec {
        style: text_style(
            StyleFields {
                family: &raw.family,
                size: raw.size,
                weight: &raw.weight,
                style: &raw.style,
                color: &raw.color,
            },
            path,
            palette,
        )?,
        show: raw.show.unwrap_or(true),
        text: raw.text.clone(),
        rotation: raw.rotation,
        ha: match raw.ha.as_deref() {
            None => None,
            Some(v) => Some(HAlign::parse(v).ok_or_else(|| unknown(join(path, "ha"), v, HAlign::NAMES))?),
        },
        va: match raw.va.as_deref() {
            None => None,
            Some(v) => Some(VAlign::parse(v).ok_or_else(|| unknown(join(path, "va"), v, VAlign::NAMES))?),
        },
        pad: raw.pad,
        dx: raw.dx,
        dy: raw.dy,
        dx_unit: offset_unit(&raw.dx_unit, "dx_unit")?,
        dy_unit: offset_unit(&raw.dy_unit, "dy_unit")?,
    })
}

/// TextLike coercion: string → text with defaults, mapping → full spec, absent → `None`.
pub fn text_like(raw: Option<&RawText>, path: &str, palette: Palette) -> Result<Option<TextSpec>> {
    match raw {
        None => Ok(None),
        Some(RawText::Plain(s)) => Ok(Some(TextSpec::plain(s.clone()))),
        Some(RawText::Styled(spec)) => text_spec(spec, path, palette).map(Some),
        Some(RawText::Other(v)) => {
            let spec: RawTextSpec =
                reparse(v, path.to_string(), "a string, a text mapping or null")?;
            text_spec(&spec, path, palette).map(Some)
        }
    }
}

fn text_list(
    raw: Option<&Vec<Option<RawText>>>,
    path: &str,
    palette: Palette,
) -> Result<Option<Vec<Option<TextSpec>>>> {
    let Some(items) = raw else { return Ok(None) };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| text_like(item.as_ref(), &index(path, i), palette))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

// ---------------------------------------------------------------------------
// Axes
// ---------------------------------------------------------------------------

fn formatter(raw: &RawFormatter, path: &str) -> Result<TickFormatterSpec> {
    let kind = closed(
        raw.kind.as_deref(),
        join(path, "kind"),
        FormatterKind::parse,
        FormatterKind::NAMES,
        FormatterKind::Strfmt,
    )?;
    let sci_limits = match raw.sci_limits.as_deref() {
        None => None,
        Some([lo, hi]) if lo <= hi => Some((*lo, *hi)),
        Some(other) => {
            return Err(SchemaError::new(
                join(path, "sci_limits"),
                format!("must be [lo, hi] with lo <= hi, got {:?}", other),
            ));
        }
    };
    let places = match raw.places {
        None => None,
        Some(p) => Some(count(Some(p), join(path, "places"), 0, 0)?),
    };
    let spec = TickFormatterSpec {
        kind,
        pattern: raw.pattern.clone(),
        sci_limits,
        unit: raw.unit.clone(),
        places,
        scale: raw.scale,
        prefix: raw.prefix.clone(),
        suffix: raw.suffix.clone(),
        use_mathtext: raw.use_mathtext.unwrap_or(false),
        expression: raw.expression.clone(),
        wrap_mathtext: raw.wrap_mathtext.unwrap_or(false),
        bold: raw.bold.unwrap_or(false),
        italic: raw.italic.unwrap_or(false),
    };
    TickFormatter::compile(&spec).map_err(|e| SchemaError::new(path, e))?;
    Ok(spec)
}

fn ticks(raw: Option<&RawTicks>, path: &str, palette: Palette) -> Result<AxisTicksSpec> {
    let Some(raw) = raw else {
        return Ok(AxisTicksSpec::default());
    };
    let range = match raw.range.as_deref() {
        None => None,
        Some(&[min, max, step]) if min < max && step > 0.0 => {
            if !((max - min) / step <= MAX_TICKS as f64) {
                return Err(SchemaError::new(
                    join(path, "range"),
                    format!("step {} yields more than {} ticks over [{}, {}]", step, MAX_TICKS, min, max),
                ));
            }
            Some([min, max, step])
        }
        Some(other) => {
            return Err(SchemaError::new(
                join(path, "range"),
                format!("must be [min, max, step] with min < max and step > 0, got {:?}", other),
            ));
        }
    };
    Ok(AxisTicksSpec {
        style: text_style(
            StyleFields {
                family: &raw.family,
                size: raw.size,
                weight: &raw.weight,
                style: &raw.style,
                color: &raw.color,
            },
            path,
            palette,
        )?,
        show: raw.show.unwrap_or(true),
        rotation: raw.rotation,
        direction: match raw.direction.as_deref() {
            None => None,
            Some(v) => Some(
                TickDirection::parse(v)
                    .ok_or_else(|| unknown(join(path, "direction"), v, TickDirection::NAMES))?,
            ),
        },
        length: non_negative(raw.length, join(path, "length"))?,
        width: non_negative(raw.width, join(path, "width"))?,
        locations: raw.locations.clone(),
        range,
        fmt: match &raw.fmt {
            None => None,
            Some(f) => Some(formatter(f, &join(path, "fmt"))?),
        },
        labels: text_list(raw.labels.as_ref(), &join(path, "labels"), palette)?,
    })
}

fn limit(raw: Option<&Vec<f64>>, path: String) -> Result<Option<(f64, f64)>> {
    match raw.map(Vec::as_slice) {
        None => Ok(None),
        Some(&[lo, hi]) if lo < hi => Ok(Some((lo, hi))),
        Some(other) => Err(SchemaError::new(
            path,
            format!("must be [min, max] with min < max, got {:?}", other),
        )),
    }
}

fn legend(raw: Option<&RawLegend>, path: &str, palette: Palette) -> Result<LegendSpec> {
    let Some(raw) = raw else {
        return Ok(LegendSpec::default());
    };
    if let Some(anchor) = &raw.anchor {
        if anchor.len() != 2 && anchor.len() != 4 {
            return Err(SchemaError::new(
                join(path, "anchor"),
                format!("must be [x, y] or [x, y, w, h], got {} values", anchor.len()),
            ));
        }
    }
    Ok(LegendSpec {
        show: raw.show.unwrap_or(true),
        loc: closed(
            raw.loc.as_deref(),
            join(path, "loc"),
            LegendLoc::parse,
            LegendLoc::NAMES,
            LegendLoc::Best,
        )?,
        ncol: count(raw.ncol, join(path, "ncol"), 1, 1)?,
        frameon: raw.frameon.unwrap_or(false),
        title: text_like(raw.title.as_ref(), &join(path, "title"), palette)?,
        labels: text_list(raw.labels.as_ref(), &join(path, "labels"), palette)?,
        style: match &raw.style {
            None => None,
            Some(s) => Some(raw_style(s, &join(path, "style"), palette)?),
        },
        anchor: raw.anchor.clone(),
        offset_x: raw.offset_x,
        offset_y: raw.offset_y,
        offset_unit: closed(
            raw.offset_unit.as_deref(),
            join(path, "offset_unit"),
            OffsetUnit::parse,
            OffsetUnit::NAMES,
            OffsetUnit::Axes,
        )?,
    })
}

fn grid(raw: Option<&RawGrid>, path: &str, palette: Palette) -> Result<GridSpec> {
    let defaults = GridSpec::default();
    let Some(raw) = raw else { return Ok(defaults) };
    let linestyle = match raw.linestyle.as_deref() {
        None => defaults.linestyle,
        Some(v) => resolve_linestyle(v).ok_or_else(|| {
            unknown(join(path, "linestyle"), v, &["solid", "dashed", "dotted", "dashdot"])
        })?,
    };
    Ok(GridSpec {
        show: raw.show.unwrap_or(defaults.show),
        which: closed(
            raw.which.as_deref(),
            join(path, "which"),
            GridWhich::parse,
            GridWhich::NAMES,
            defaults.which,
        )?,
        linestyle,
        linewidth: non_negative(raw.linewidth, join(path, "linewidth"))?.unwrap_or(defaults.linewidth),
        color: color(raw.color.as_deref(), join(path, "color"), palette, defaults.color)?,
    })
}

fn spines(raw: Option<&RawSpines>, path: &str, palette: Palette) -> Result<SpinesSpec> {
    let defaults = SpinesSpec::default();
    let Some(raw) = raw else { return Ok(defaults) };
    Ok(SpinesSpec {
        show_left: raw.show_left.unwrap_or(true),
        show_right: raw.show_right.unwrap_or(true),
        show_top: raw.show_top.unwrap_or(true),
        show_bottom: raw.show_bottom.unwrap_or(true),
        color: color(raw.color.as_deref(), join(path, "color"), palette, defaults.color)?,
        linewidth: non_negative(raw.linewidth, join(path, "linewidth"))?,
    })
}

pub fn axes(raw: Option<&RawAxes>, path: &str, palette: Palette) -> Result<AxesSpec> {
    let empty = RawAxes::default();
    let raw = raw.unwrap_or(&empty);
    let scale = |v: &Option<String>, field: &str| {
        closed(v.as_deref(), join(path, field), Scale::parse, Scale::NAMES, Scale::Linear)
    };
    let limits_path = join(path, "limits");
    Ok(AxesSpec {
        title: text_like(raw.title.as_ref(), &join(path, "title"), palette)?,
        xlabel: text_like(raw.xlabel.as_ref(), &join(path, "xlabel"), palette)?,
        ylabel: text_like(raw.ylabel.as_ref(), &join(path, "ylabel"), palette)?,
        xscale: scale(&raw.xscale, "xscale")?,
        yscale: scale(&raw.yscale, "yscale")?,
        grid: grid(raw.grid.as_ref(), &join(path, "grid"), palette)?,
        limits: Limits {
            x: limit(
                raw.limits.as_ref().and_then(|l| l.x.as_ref()),
                join(&limits_path, "x"),
            )?,
            y: limit(
                raw.limits.as_ref().and_then(|l| l.y.as_ref()),
                join(&limits_path, "y"),
            )?,
        },
        legend: legend(raw.legend.as_ref(), &join(path, "legend"), palette)?,
        spines: spines(raw.spines.as_ref(), &join(path, "spines"), palette)?,
        xticks: ticks(raw.xticks.as_ref(), &join(path, "xticks"), palette)?,
        yticks: ticks(raw.yticks.as_ref(), &join(path, "yticks"), palette)?,
        show_axes_frame: raw.show_axes_frame.unwrap_or(true),
        show_xlabel: raw.show_xlabel.unwrap_or(true),
        show_ylabel: raw.show_ylabel.unwrap_or(true),
        show_title: raw.show_title.unwrap_or(true),
    })
}

// ---------------------------------------------------------------------------
// Series and overlays
// ---------------------------------------------------------------------------

fn line_spec(raw: Option<&RawLine>, path: &str, palette: Palette) -> Result<LineSpec> {
    let defaults = LineSpec {
        color: palette.cycle(0),
        ..LineSpec::default()
    };
    let Some(raw) = raw else { return Ok(defaults) };
    let style = match raw.style.as_deref() {
        None => defaults.style,
        Some(v) => resolve_linestyle(v).ok_or_else(|| {
            unknown(join(path, "style"), v, &["solid", "dashed", "dotted", "dashdot"])
        })?,
    };
    let marker = match raw.marker.as_deref().map(str::trim) {
        None | Some("") | Some("none") | Some("None") => None,
        Some(v) => Some(Marker::parse(v).ok_or_else(|| unknown(join(path, "marker"), v, Marker::NAMES))?),
    };
    Ok(LineSpec {
        color: color(raw.color.as_deref(), join(path, "color"), palette, defaults.color)?,
        width: non_negative(raw.width, join(path, "width"))?.unwrap_or(defaults.width),
        style,
        marker,
    })
}

fn data_source(raw: &RawData, path: &str) -> Result<DataSource> {
    let loader = match raw {
        RawData::Name(name) => return Ok(DataSource::Path(name.clone())),
        RawData::Loader(loader) => loader.clone(),
        RawData::Other(v) => reparse::<RawLoader>(v, path.to_string(), "a path or a loader mapping")?,
    };
    let reader = match loader.reader.as_deref() {
        None => None,
        Some(v) => Some(
            ReaderKind::parse(v).ok_or_else(|| unknown(join(path, "reader"), v, ReaderKind::NAMES))?,
        ),
    };
    match (loader.path, loader.inline) {
        (Some(_), Some(_)) => Err(SchemaError::new(
            path,
            "loader takes either `path` or `inline`, not both",
        )),
        (None, Some(columns)) => Ok(DataSource::Inline(columns)),
        (Some(file), None) => Ok(DataSource::Loader {
            reader,
            path: file,
            options: loader.options.unwrap_or_default(),
        }),
        (None, None) => Err(SchemaError::new(path, "loader needs a `path` or `inline` columns")),
    }
}

fn series(raw: &RawSeries, path: &str, palette: Palette) -> Result<SeriesSpec> {
    let kind = match raw.kind.as_deref().map(str::trim) {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => return Err(SchemaError::new(join(path, "type"), "series type is required")),
    };
    Ok(SeriesSpec {
        kind,
        x: raw.x.clone(),
        y: raw.y.clone(),
        data: match &raw.data {
            None => None,
            Some(d) => Some(data_source(d, &join(path, "data"))?),
        },
        query: raw.query.clone().filter(|q| !q.trim().is_empty()),
        style: line_spec(raw.style.as_ref(), &join(path, "style"), palette)?,
        label: text_like(raw.label.as_ref(), &join(path, "label"), palette)?,
        bins: match raw.bins {
            None => None,
            Some(b) => Some(count(Some(b), join(path, "bins"), 1, 1)?),
        },
    })
}

fn overlay(raw: &RawOverlay, path: &str) -> Result<OverlaySpec> {
    let kind = match raw.kind.as_deref() {
        None => return Err(SchemaError::new(join(path, "type"), "overlay type is required")),
        Some(v) => {
            OverlayKind::parse(v).ok_or_else(|| unknown(join(path, "type"), v, OverlayKind::NAMES))?
        }
    };
    if let Some(a) = raw.alpha {
        if !(0.0..=1.0).contains(&a) {
            return Err(SchemaError::new(
                join(path, "alpha"),
                format!("must be within [0, 1], got {}", a),
            ));
        }
    }
    Ok(OverlaySpec {
        kind,
        color: raw.color.clone(),
        edgecolor: raw.edgecolor.clone(),
        facecolor: raw.facecolor.clone(),
        fill: raw.fill,
        alpha: raw.alpha,
        linewidth: raw.linewidth,
        linestyle: raw.linestyle.clone(),
        label: raw.label.clone(),
        show_in_legend: raw.show_in_legend.unwrap_or(false),
        zorder: raw.zorder,
        x: raw.x,
        y: raw.y,
        x0: raw.x0,
        x1: raw.x1,
        y0: raw.y0,
        y1: raw.y1,
        radius: raw.radius,
        width: raw.width,
        height: raw.height,
        text: raw.text.clone(),
        text_dx: raw.text_dx.unwrap_or(0.0),
        text_dy: raw.text_dy.unwrap_or(0.0),
        text_ha: raw.text_ha.clone(),
        text_va: raw.text_va.clone(),
        text_rotation: raw.text_rotation,
        ymin_frac: raw.ymin_frac,
        ymax_frac: raw.ymax_frac,
    })
}

fn overlays(raw: Option<&Vec<Option<RawOverlayEntry>>>, path: &str) -> Result<Vec<OverlaySpec>> {
    let mut out = Vec::new();
    for (i, entry) in raw.into_iter().flatten().enumerate() {
        let at = index(path, i);
        match entry {
            None => {}
            Some(RawOverlayEntry::Inline(o)) => out.push(overlay(o, &at)?),
            Some(RawOverlayEntry::Path(p)) => {
                return Err(SchemaError::new(
                    at,
                    format!("overlay file reference {:?} was not expanded", p),
                ));
            }
            Some(RawOverlayEntry::Other(v)) => {
                let o: RawOverlay = reparse(v, at.clone(), "an overlay mapping or a file path")?;
                out.push(overlay(&o, &at)?);
            }
        }
    }
    Ok(out)
}

fn panel(
    raw: &RawPanel,
    path: &str,
    axes_defaults: Option<&RawAxes>,
    palette: Palette,
) -> Result<PanelSpec> {
    let merged = merge_opt(axes_defaults.cloned(), raw.axes.clone());
    Ok(PanelSpec {
        axes: axes(merged.as_ref(), &join(path, "axes"), palette)?,
        series: raw
            .series
            .iter()
            .flatten()
            .enumerate()
            .map(|(i, s)| series(s, &index(&join(path, "series"), i), palette))
            .collect::<Result<Vec<_>>>()?,
        overlays: overlays(raw.overlays.as_ref(), &join(path, "overlays"))?,
    })
}

// ---------------------------------------------------------------------------
// Figure
// ---------------------------------------------------------------------------

fn size(raw: Option<&RawSize>) -> Result<Size> {
    let Some(raw) = raw else {
        return Err(SchemaError::new("size", "size is required"));
    };
    let dim = |v: Option<f64>, field: &str| -> Result<f64> {
        positive(v, join("size", field))?
            .ok_or_else(|| SchemaError::new(join("size", field), "is required"))
    };
    Ok(Size {
        width: dim(raw.width, "width")?,
        height: dim(raw.height, "height")?,
        unit: closed(
            raw.unit.as_deref(),
            "size.unit".to_string(),
            SizeUnit::parse,
            SizeUnit::NAMES,
            SizeUnit::Inch,
        )?,
    })
}

fn font(raw: Option<&RawFont>) -> Result<FontSpec> {
    let defaults = FontSpec::default();
    let Some(raw) = raw else { return Ok(defaults) };
    Ok(FontSpec {
        family: raw.family.clone().unwrap_or(defaults.family),
        size: positive(raw.size, "font.size".to_string())?.unwrap_or(defaults.size),
        weight: raw.weight.clone().unwrap_or(defaults.weight),
        style: raw.style.clone().unwrap_or(defaults.style),
        use_tex: raw.use_tex.unwrap_or(defaults.use_tex),
        latex_preamble: raw.latex_preamble.clone().or(defaults.latex_preamble),
    })
}

fn layout(raw: Option<&RawLayout>) -> Result<LayoutSpec> {
    let Some(raw) = raw else {
        return Ok(LayoutSpec::default());
    };
    Ok(LayoutSpec {
        rows: count(raw.rows, "layout.rows".to_string(), 1, 1)?,
        cols: count(raw.cols, "layout.cols".to_string(), 1, 1)?,
        wspace: non_negative(raw.wspace, "layout.wspace".to_string())?,
        hspace: non_negative(raw.hspace, "layout.hspace".to_string())?,
        shared_x: raw.shared_x.unwrap_or(false),
        shared_y: raw.shared_y.unwrap_or(false),
    })
}

fn export(raw: Option<&RawExport>) -> Result<ExportSpec> {
    let defaults = ExportSpec::default();
    let Some(raw) = raw else { return Ok(defaults) };
    let formats = match &raw.formats {
        None => defaults.formats,
        Some(list) if list.is_empty() => {
            return Err(SchemaError::new("export.formats", "must name at least one format"));
        }
        Some(list) => list
            .iter()
            .enumerate()
            .map(|(i, f)| {
                ExportFormat::parse(f)
                    .ok_or_else(|| unknown(index("export.formats", i), f, ExportFormat::NAMES))
            })
            .collect::<Result<Vec<_>>>()?,
    };
    let dpi = match raw.dpi {
        None => defaults.dpi,
        Some(d) => u32::try_from(d)
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| SchemaError::new("export.dpi", format!("must be a positive integer, got {}", d)))?,
    };
    Ok(ExportSpec {
        path: raw.path.clone().unwrap_or(defaults.path),
        dpi,
        formats,
        tight_layout: raw.tight_layout.unwrap_or(defaults.tight_layout),
        metadata: raw.metadata.clone().unwrap_or_default(),
    })
}

/// Validate a merged tree. `document` is the unmerged user document kept for overrides.
pub fn validate(merged: &RawFigure, base_dir: PathBuf, document: RawFigure) -> Result<FigureSpec> {
    let palette = closed(
        merged.palette.as_deref(),
        "palette".to_string(),
        Palette::parse,
        Palette::NAMES,
        Palette::OkabeIto,
    )?;
    let size = size(merged.size.as_ref())?;
    let layout = layout(merged.layout.as_ref())?;

    let Some(raw_panels) = &merged.panels else {
        return Err(SchemaError::new("panels", "panels are required"));
    };
    if raw_panels.len() > layout.rows * layout.cols {
        return Err(SchemaError::new(
            "panels",
            format!(
                "{} panels do not fit a {}x{} layout",
                raw_panels.len(),
                layout.rows,
                layout.cols
            ),
        ));
    }

    let defaults = merged.axes_defaults.as_ref();
    let panels = raw_panels
        .iter()
        .enumerate()
        .map(|(i, p)| panel(p, &index("panels", i), defaults, palette))
        .collect::<Result<Vec<_>>>()?;

    Ok(FigureSpec {
        size,
        font: font(merged.font.as_ref())?,
        layout,
        panels,
        theme: merged.theme.clone(),
        preset: merged.preset.clone(),
        palette,
        export: export(merged.export.as_ref())?,
        axes_defaults: match defaults {
            None => None,
            Some(d) => Some(axes(Some(d), "axes_defaults", palette)?),
        },
        base_dir,
        document,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn check(doc: Value) -> Result<FigureSpec> {
        let raw = RawFigure::from_value(doc).unwrap();
        validate(&raw, PathBuf::from("/tmp"), raw.clone())
    }

    fn minimal(panels: Value) -> Value {
        json!({"size": {"width": 3, "height": 2}, "panels": panels})
    }

    #[test]
    fn bare_strings_become_text_specs() {
        let spec = check(minimal(json!([{"axes": {"title": "Latency", "xlabel": {"text": "t", "size": 7}}}])))
            .unwrap();
        let axes = &spec.panels[0].axes;
        assert_eq!(axes.title, Some(TextSpec::plain("Latency")));
        let xlabel = axes.xlabel.as_ref().unwrap();
        assert_eq!(xlabel.text.as_deref(), Some("t"));
        assert_eq!(xlabel.style.size, Some(7.0));
        assert_eq!(axes.ylabel, None);
    }

    #[test]
    fn malformed_text_reports_its_path() {
        let err = check(minimal(json!([{"axes": {"title": 12}}]))).unwrap_err();
        assert_eq!(err.path, "panels[0].axes.title");
    }

    #[test]
    fn tick_labels_coerce_per_element() {
        let spec = check(minimal(json!([{"axes": {"xticks": {"labels": ["a", null, {"text": "c", "weight": "bold"}]}}}])))
            .unwrap();
        let labels = spec.panels[0].axes.xticks.labels.clone().unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0], Some(TextSpec::plain("a")));
        assert_eq!(labels[1], None);
        assert_eq!(labels[2].as_ref().unwrap().style.weight.as_deref(), Some("bold"));
    }

    #[test]
    fn closed_sets_name_path_and_value() {
        let err = check(minimal(json!([{"axes": {"xscale": "loglog"}}]))).unwrap_err();
        assert_eq!(err.path, "panels[0].axes.xscale");
        assert!(err.message.contains("\"loglog\""));

        let err = check(minimal(json!([{"overlays": [{"type": "hexagon"}]}]))).unwrap_err();
        assert_eq!(err.path, "panels[0].overlays[0].type");

        let err = check(minimal(json!([{"axes": {"yticks": {"fmt": {"kind": "roman"}}}}]))).unwrap_err();
        assert_eq!(err.path, "panels[0].axes.yticks.fmt.kind");
    }

    #[test]
    fn unknown_series_types_pass_validation() {
        let spec = check(minimal(json!([{"series": [{"type": "violin", "x": "a"}]}]))).unwrap();
        assert_eq!(spec.panels[0].series[0].kind, "violin");

        let err = check(minimal(json!([{"series": [{"x": "a"}]}]))).unwrap_err();
        assert_eq!(err.path, "panels[0].series[0].type");
    }

    #[test]
    fn linestyle_aliases_resolve() {
        let spec = check(minimal(json!([{"series": [{"type": "line", "style": {"style": "--"}}]}]))).unwrap();
        assert_eq!(spec.panels[0].series[0].style.style, crate::style::LineStyle::Dashed);
    }

    #[test]
    fn numeric_ranges() {
        let err = check(minimal(json!([{"axes": {"xticks": {"range": [5, 1, 1]}}}]))).unwrap_err();
        assert_eq!(err.path, "panels[0].axes.xticks.range");

        let err = check(minimal(json!([{"axes": {"xticks": {"range": [0, 1, 0]}}}]))).unwrap_err();
        assert_eq!(err.path, "panels[0].axes.xticks.range");

        let err = check(minimal(json!([{"axes": {"yticks": {"range": [0, 1e12, 1e-9]}}}]))).unwrap_err();
        assert_eq!(err.path, "panels[0].axes.yticks.range");
        assert!(err.message.contains("ticks"));

        let err = check(minimal(json!([{"axes": {"limits": {"y": [1]}}}]))).unwrap_err();
        assert_eq!(err.path, "panels[0].axes.limits.y");

        let err = check(json!({"size": {"width": 0, "height": 2}, "panels": []})).unwrap_err();
        assert_eq!(err.path, "size.width");

        let err = check(minimal(json!([{"overlays": [{"type": "band", "alpha": 1.5}]}]))).unwrap_err();
        assert_eq!(err.path, "panels[0].overlays[0].alpha");
    }

    #[test]
    fn unexpanded_overlay_paths_fail() {
        let err = check(minimal(json!([{"overlays": ["marks.yaml"]}]))).unwrap_err();
        assert_eq!(err.path, "panels[0].overlays[0]");
        assert!(err.message.contains("marks.yaml"));
    }

    #[test]
    fn panels_must_fit_the_grid() {
        let err = check(json!({
            "size": {"width": 3, "height": 2},
            "layout": {"rows": 1, "cols": 2},
            "panels": [{}, {}, {}]
        }))
        .unwrap_err();
        assert_eq!(err.path, "panels");
    }

    #[test]
    fn required_fields() {
        assert_eq!(check(json!({"panels": []})).unwrap_err().path, "size");
        assert_eq!(
            check(json!({"size": {"width": 1, "height": 1}})).unwrap_err().path,
            "panels"
        );
    }

    #[test]
    fn axes_defaults_fill_unset_panel_fields() {
        let spec = check(json!({
            "size": {"width": 3, "height": 2},
            "axes_defaults": {"xscale": "log", "grid": {"show": false, "color": "red"}},
            "layout": {"cols": 2},
            "panels": [{"axes": {"grid": {"show": true}}}, {"axes": {"xscale": "linear"}}]
        }))
        .unwrap();
        let a = &spec.panels[0].axes;
        assert_eq!(a.xscale, Scale::Log);
        assert!(a.grid.show);
        assert_eq!(a.grid.color, Color::rgb(255, 0, 0));
        let b = &spec.panels[1].axes;
        assert_eq!(b.xscale, Scale::Linear);
        assert!(!b.grid.show);
    }

    #[test]
    fn data_references() {
        let spec = check(minimal(json!([{"series": [
            {"type": "line", "data": "runs.csv"},
            {"type": "line", "data": {"reader": "parquet", "path": "r.pq", "options": {"columns": ["a"]}}},
            {"type": "line", "data": {"inline": {"a": [1, 2]}}}
        ]}])))
        .unwrap();
        let s = &spec.panels[0].series;
        assert!(matches!(&s[0].data, Some(DataSource::Path(p)) if p == "runs.csv"));
        assert!(matches!(&s[1].data, Some(DataSource::Loader { reader: Some(ReaderKind::Parquet), .. })));
        assert!(matches!(&s[2].data, Some(DataSource::Inline(_))));

        let err = check(minimal(json!([{"series": [{"type": "line", "data": {"reader": "xlsx", "path": "a"}}]}])))
            .unwrap_err();
        assert_eq!(err.path, "panels[0].series[0].data.reader");
    }

    #[test]
    fn series_color_defaults_follow_the_palette() {
        let spec = check(json!({
            "size": {"width": 3, "height": 2},
            "palette": "tab10",
            "panels": [{"series": [{"type": "line"}]}]
        }))
        .unwrap();
        assert_eq!(spec.panels[0].series[0].style.color, Color::rgb(31, 119, 180));
    }
}

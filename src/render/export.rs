//! Writing a finished figure: path resolution and plotters replay.
//!
//! SVG is laid out at 72 pixels per inch, so one pixel is one point. PDF is
//! converted from that same SVG. PNG is rasterized at the export dpi.
//! Export metadata lands in an RDF block for SVG and in text chunks for PNG.

use crate::diagnostics;
use crate::error::ExportError;
use crate::render::layout::{Rect, axes_boxes, text_width};
use crate::spec::{ExportFormat, ExportSpec, HAlign, LegendLoc, Marker, TickDirection, VAlign};
use crate::style::{AxisFrame, Color, LineStyle, Scale, dash_segments, to_display};
use crate::style::units::{POINTS_PER_INCH, legend_offset_to_pixels};
use crate::surface::{Axes, Figure, Label, Legend, LegendKey, Mark, Stroke, TextMark};
use plotters::coord::Shift;
use plotters::element::{Circle, PathElement, Polygon, Rectangle, Text};
use plotters::prelude::{BitMapBackend, DrawingArea, DrawingBackend, IntoDrawingArea, SVGBackend};
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle, FontTransform, RGBAColor, ShapeStyle, TextStyle};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use svg2pdf::usvg;
use svg2pdf::{ConversionOptions, PageOptions};

const METERS_PER_INCH: f64 = 0.0254;
/// Marker diameter on lines, in points.
const LINE_MARKER: f64 = 6.0;
const SPINE_WIDTH: f64 = 0.8;
/// Gap between tick marks and their labels, in points.
const TICK_PAD: f64 = 3.5;

/// Output file for one format: the extension is appended unless already there.
pub fn output_path(path: &Path, format: ExportFormat) -> PathBuf {
    let matches = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(format.as_str()));
    if matches {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(format.as_str());
    PathBuf::from(name)
}

/// Relative paths are resolved against `root`.
pub fn resolve_output(path: &str, root: &Path) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

/// Write `figure` once per requested format. Returns the written paths in format order.
pub fn save(figure: &Figure, export: &ExportSpec, root: &Path) -> Result<Vec<PathBuf>, ExportError> {
    if export.formats.is_empty() {
        return Err(ExportError::NoFormats);
    }
    let base = resolve_output(&export.path, root);
    let mut written = Vec::with_capacity(export.formats.len());
    for format in &export.formats {
        let path = output_path(&base, *format);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ExportError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        write_one(figure, &path, *format, export)?;
        diagnostics::info(format!("wrote {}", path.display()));
        written.push(path);
    }
    Ok(written)
}

fn pixel_size(figure: &Figure, px_per_inch: f64) -> (u32, u32) {
    (
        (figure.width * px_per_inch).round().max(1.0) as u32,
        (figure.height * px_per_inch).round().max(1.0) as u32,
    )
}

fn write_one(figure: &Figure, path: &Path, format: ExportFormat, export: &ExportSpec) -> Result<(), ExportError> {
    let backend = |message: String| ExportError::Backend {
        path: path.to_path_buf(),
        message,
    };
    let io = |source: std::io::Error| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    match format {
        ExportFormat::Svg => {
            let svg = render_svg(figure, export.tight_layout).map_err(backend)?;
            fs::write(path, with_svg_metadata(&svg, &export.metadata)).map_err(io)
        }
        ExportFormat::Pdf => {
            if !export.metadata.is_empty() {
                tracing::debug!("export metadata is not embedded in pdf output");
            }
            let svg = render_svg(figure, export.tight_layout).map_err(backend)?;
            let pdf = svg_to_pdf(&svg).map_err(backend)?;
            fs::write(path, pdf).map_err(io)
        }
        ExportFormat::Png => {
            let px_per_inch = export.dpi as f64;
            let size = pixel_size(figure, px_per_inch);
            let mut pixels = vec![0u8; size.0 as usize * size.1 as usize * 3];
            {
                let area = BitMapBackend::with_buffer(&mut pixels, size).into_drawing_area();
                paint(&area, figure, px_per_inch, export.tight_layout).map_err(backend)?;
                area.present().map_err(|e| backend(e.to_string()))?;
            }
            write_png(path, size, &pixels, export)
        }
    }
}

/// Lay the figure out at one pixel per point and return the SVG text.
fn render_svg(figure: &Figure, tight: bool) -> Result<String, String> {
    let mut svg = String::new();
    {
        let area = SVGBackend::with_string(&mut svg, pixel_size(figure, POINTS_PER_INCH)).into_drawing_area();
        paint(&area, figure, POINTS_PER_INCH, tight)?;
        area.present().map_err(|e| e.to_string())?;
    }
    Ok(svg)
}

fn svg_to_pdf(svg: &str) -> Result<Vec<u8>, String> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &opt).map_err(|e| e.to_string())?;
    svg2pdf::to_pdf(&tree, ConversionOptions::default(), PageOptions::default()).map_err(|e| e.to_string())
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Dublin Core element name for a metadata key: `Creation Date` becomes `creation_date`.
fn dc_name(key: &str) -> Option<String> {
    let name: String = key
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    name.starts_with(|c: char| c.is_ascii_alphabetic()).then_some(name)
}

/// Insert a `<title>` and an RDF `<metadata>` block right after the root tag.
fn with_svg_metadata(svg: &str, metadata: &BTreeMap<String, String>) -> String {
    if metadata.is_empty() {
        return svg.to_string();
    }
    let Some(at) = svg.find("<svg").and_then(|i| svg[i..].find('>').map(|j| i + j + 1)) else {
        return svg.to_string();
    };
    let mut block = String::from("\n");
    if let Some((_, title)) = metadata.iter().find(|(k, _)| k.eq_ignore_ascii_case("title")) {
        block.push_str(&format!("<title>{}</title>\n", xml_escape(title)));
    }
    block.push_str("<metadata>\n<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n<rdf:Description>\n");
    for (key, value) in metadata {
        match dc_name(key) {
            Some(name) => block.push_str(&format!("<dc:{0}>{1}</dc:{0}>\n", name, xml_escape(value))),
            None => diagnostics::warn(format!("metadata key {:?} is not a valid element name; skipped", key)),
        }
    }
    block.push_str("</rdf:Description>\n</rdf:RDF>\n</metadata>");
    format!("{}{}{}", &svg[..at], block, &svg[at..])
}

/// Encode RGB pixels with the export dpi and one text chunk per metadata entry.
fn write_png(path: &Path, size: (u32, u32), pixels: &[u8], export: &ExportSpec) -> Result<(), ExportError> {
    let backend = |e: png::EncodingError| ExportError::Backend {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let file = fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), size.0, size.1);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let per_meter = (export.dpi as f64 / METERS_PER_INCH).round() as u32;
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: per_meter,
        yppu: per_meter,
        unit: png::Unit::Meter,
    }));
    for (key, value) in &export.metadata {
        // Keywords are 1 to 79 Latin-1 characters.
        if key.is_empty() || key.len() > 79 || !key.chars().all(|c| (' '..='~').contains(&c)) {
            diagnostics::warn(format!("metadata key {:?} is not a valid png keyword; skipped", key));
            continue;
        }
        let added = if value.chars().all(|c| (c as u32) < 256) {
            encoder.add_text_chunk(key.clone(), value.clone())
        } else {
            encoder.add_itxt_chunk(key.clone(), value.clone())
        };
        added.map_err(backend)?;
    }
    let mut writer = encoder.write_header().map_err(backend)?;
    writer.write_image_data(pixels).map_err(backend)?;
    writer.finish().map_err(backend)
}

fn paint<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, figure: &Figure, px_per_inch: f64, tight: bool) -> Result<(), String> {
    let painter = Painter {
        area,
        scale: px_per_inch / POINTS_PER_INCH,
        font_size: figure.font.size,
        text_failed: Cell::new(false),
    };
    area.fill(&plotters::style::colors::WHITE).map_err(|e| e.to_string())?;
    let (w, h) = (figure.width * px_per_inch, figure.height * px_per_inch);
    for (i, rect) in axes_boxes(figure, w, h, painter.scale, tight) {
        if let Some(ax) = figure.axes(i) {
            draw_axes(&painter, ax, rect)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

fn rgba(c: Color) -> RGBAColor {
    RGBAColor(c.r, c.g, c.b, c.a)
}

fn filled(c: Color) -> ShapeStyle {
    ShapeStyle {
        color: rgba(c),
        filled: true,
        stroke_width: 0,
    }
}

fn px(p: (f64, f64)) -> (i32, i32) {
    (p.0.round() as i32, p.1.round() as i32)
}

struct Painter<'a, DB: DrawingBackend> {
    area: &'a DrawingArea<DB, Shift>,
    /// Pixels per point.
    scale: f64,
    font_size: f64,
    text_failed: Cell<bool>,
}

impl<DB: DrawingBackend> Painter<'_, DB> {
    fn pt(&self, points: f64) -> f64 {
        points * self.scale
    }

    fn dpi(&self) -> f64 {
        self.scale * POINTS_PER_INCH
    }

    fn polyline(&self, points: &[(f64, f64)], color: Color, width_pt: f64, style: LineStyle) -> Result<(), String> {
        if points.len() < 2 || color.is_transparent() || width_pt <= 0.0 {
            return Ok(());
        }
        let width = self.pt(width_pt);
        let shape = ShapeStyle {
            color: rgba(color),
            filled: false,
            stroke_width: width.round().max(1.0) as u32,
        };
        let pattern: Vec<f64> = style.dash_pattern().iter().map(|p| p * width.max(1.0)).collect();
        let pieces = if pattern.is_empty() {
            vec![points.to_vec()]
        } else {
            dash_segments(points, &pattern)
        };
        for piece in pieces.into_iter().filter(|p| p.len() >= 2) {
            let pts: Vec<(i32, i32)> = piece.into_iter().map(px).collect();
            self.area
                .draw(&PathElement::new(pts, shape))
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn stroke(&self, points: &[(f64, f64)], stroke: &Stroke) -> Result<(), String> {
        self.polyline(points, stroke.color, stroke.width, stroke.style)
    }

    fn polygon(&self, points: &[(f64, f64)], fill: Option<Color>, edge: Option<&Stroke>) -> Result<(), String> {
        if let Some(c) = fill.filter(|c| !c.is_transparent()) {
            let pts: Vec<(i32, i32)> = points.iter().copied().map(px).collect();
            self.area
                .draw(&Polygon::new(pts, filled(c)))
                .map_err(|e| e.to_string())?;
        }
        if let Some(edge) = edge {
            let mut closed = points.to_vec();
            if let Some(first) = points.first() {
                closed.push(*first);
            }
            self.stroke(&closed, edge)?;
        }
        Ok(())
    }

    fn rect(&self, r: Rect, fill: Option<Color>, edge: Option<&Stroke>) -> Result<(), String> {
        if let Some(c) = fill.filter(|c| !c.is_transparent()) {
            self.area
                .draw(&Rectangle::new([px((r.x, r.y)), px((r.right(), r.bottom()))], filled(c)))
                .map_err(|e| e.to_string())?;
        }
        if edge.is_some() {
            let corners = [(r.x, r.y), (r.right(), r.y), (r.right(), r.bottom()), (r.x, r.bottom())];
            self.polygon(&corners, None, edge)?;
        }
        Ok(())
    }

    fn circle(&self, center: (f64, f64), radius: f64, fill: Option<Color>, edge: Option<&Stroke>) -> Result<(), String> {
        let r = radius.round().max(1.0) as i32;
        if let Some(c) = fill.filter(|c| !c.is_transparent()) {
            self.area
                .draw(&Circle::new(px(center), r, filled(c)))
                .map_err(|e| e.to_string())?;
        }
        if let Some(e) = edge.filter(|e| !e.color.is_transparent()) {
            let style = ShapeStyle {
                color: rgba(e.color),
                filled: false,
                stroke_width: self.pt(e.width).round().max(1.0) as u32,
            };
            self.area
                .draw(&Circle::new(px(center), r, style))
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn marker(&self, marker: Marker, at: (f64, f64), diameter_pt: f64, color: Color) -> Result<(), String> {
        let r = self.pt(diameter_pt) / 2.0;
        let (x, y) = at;
        let edge = Stroke::solid(color, (diameter_pt / 6.0).max(0.5));
        match marker {
            Marker::Circle => self.circle(at, r, Some(color), None),
            Marker::Dot => self.circle(at, (r / 2.0).max(1.0), Some(color), None),
            Marker::Square => self.rect(
                Rect {
                    x: x - r,
                    y: y - r,
                    w: 2.0 * r,
                    h: 2.0 * r,
                },
                Some(color),
                None,
            ),
            Marker::TriangleUp => self.polygon(&[(x, y - r), (x + r, y + r), (x - r, y + r)], Some(color), None),
            Marker::TriangleDown => self.polygon(&[(x, y + r), (x + r, y - r), (x - r, y - r)], Some(color), None),
            Marker::Diamond => self.polygon(&[(x, y - r), (x + r, y), (x, y + r), (x - r, y)], Some(color), None),
            Marker::Plus => {
                self.stroke(&[(x - r, y), (x + r, y)], &edge)?;
                self.stroke(&[(x, y - r), (x, y + r)], &edge)
            }
            Marker::Cross => {
                self.stroke(&[(x - r, y - r), (x + r, y + r)], &edge)?;
                self.stroke(&[(x - r, y + r), (x + r, y - r)], &edge)
            }
            Marker::Star => {
                let points: Vec<(f64, f64)> = (0..10)
                    .map(|k| {
                        let radius = if k % 2 == 0 { r } else { r * 0.4 };
                        let a = std::f64::consts::PI * (k as f64 / 5.0 - 0.5);
                        (x + radius * a.cos(), y + radius * a.sin())
                    })
                    .collect();
                self.polygon(&points, Some(color), None)
            }
        }
    }

    /// Draw text anchored at `at`. Text the backend cannot render is skipped with one warning.
    #[allow(clippy::too_many_arguments)]
    fn text(
        &self,
        text: &str,
        at: (f64, f64),
        family: &str,
        size_pt: f64,
        color: Color,
        bold: bool,
        italic: bool,
        ha: HAlign,
        va: VAlign,
        rotation: f64,
    ) -> Result<(), String> {
        let shown = to_display(text);
        if shown.trim().is_empty() || color.is_transparent() {
            return Ok(());
        }
        let style = if bold {
            FontStyle::Bold
        } else if italic {
            FontStyle::Italic
        } else {
            FontStyle::Normal
        };
        let color = rgba(color);
        let h = match ha {
            HAlign::Left => HPos::Left,
            HAlign::Center => HPos::Center,
            HAlign::Right => HPos::Right,
        };
        let v = match va {
            VAlign::Top => VPos::Top,
            VAlign::Center => VPos::Center,
            VAlign::Bottom | VAlign::Baseline => VPos::Bottom,
        };
        let mut text_style = TextStyle::from(FontDesc::new(FontFamily::from(family), self.pt(size_pt), style))
            .color(&color)
            .pos(Pos::new(h, v));
        let quarter = (rotation.rem_euclid(360.0) / 90.0).round() as i32 % 4;
        match quarter {
            1 => text_style = text_style.transform(FontTransform::Rotate270),
            2 => text_style = text_style.transform(FontTransform::Rotate180),
            3 => text_style = text_style.transform(FontTransform::Rotate90),
            _ => {}
        }
        if let Err(e) = self.area.draw(&Text::new(shown, px(at), text_style)) {
            if !self.text_failed.replace(true) {
                diagnostics::warn(format!("text could not be drawn and was skipped: {}", e));
            }
        }
        Ok(())
    }

    fn label(&self, label: &Label, at: (f64, f64), ha: HAlign, va: VAlign, rotation: f64) -> Result<(), String> {
        self.text(
            &label.text,
            at,
            &label.look.family,
            label.look.size,
            label.look.color,
            label.look.bold,
            label.look.italic,
            label.ha.unwrap_or(ha),
            label.va.unwrap_or(va),
            label.rotation.unwrap_or(rotation),
        )
    }
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// Data to pixel mapping of one axes box.
struct Mapper {
    rect: Rect,
    xscale: Scale,
    yscale: Scale,
    x: (f64, f64),
    y: (f64, f64),
    xlim: (f64, f64),
    ylim: (f64, f64),
}

fn display_range(lim: (f64, f64), scale: Scale) -> (f64, f64) {
    match (scale.forward(lim.0), scale.forward(lim.1)) {
        (Some(a), Some(b)) if a != b => (a, b),
        (Some(a), _) => (a, a + 1.0),
        _ => (0.0, 1.0),
    }
}

impl Mapper {
    fn new(ax: &Axes, rect: Rect) -> Self {
        let xlim = ax.xlim.unwrap_or((0.0, 1.0));
        let ylim = ax.ylim.unwrap_or((0.0, 1.0));
        Self {
            rect,
            xscale: ax.xscale,
            yscale: ax.yscale,
            x: display_range(xlim, ax.xscale),
            y: display_range(ylim, ax.yscale),
            xlim,
            ylim,
        }
    }

    fn px_x(&self, v: f64) -> Option<f64> {
        let t = self.xscale.forward(v)?;
        Some(self.rect.x + (t - self.x.0) / (self.x.1 - self.x.0) * self.rect.w)
    }

    fn px_y(&self, v: f64) -> Option<f64> {
        let t = self.yscale.forward(v)?;
        Some(self.rect.bottom() - (t - self.y.0) / (self.y.1 - self.y.0) * self.rect.h)
    }

    fn point(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        Some((self.px_x(x)?, self.px_y(y)?))
    }

    fn contains(&self, p: (f64, f64)) -> bool {
        let r = &self.rect;
        p.0 >= r.x - 0.5 && p.0 <= r.right() + 0.5 && p.1 >= r.y - 0.5 && p.1 <= r.bottom() + 0.5
    }

    /// Intersection with the axes box, if any.
    fn clip_rect(&self, r: Rect) -> Option<Rect> {
        let b = &self.rect;
        let (x0, x1) = (r.x.min(r.right()).max(b.x), r.x.max(r.right()).min(b.right()));
        let (y0, y1) = (r.y.min(r.bottom()).max(b.y), r.y.max(r.bottom()).min(b.bottom()));
        (x1 > x0 && y1 > y0).then_some(Rect {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        })
    }

    /// Liang-Barsky clip of one segment against the axes box.
    fn clip_segment(&self, a: (f64, f64), b: (f64, f64)) -> Option<((f64, f64), (f64, f64))> {
        let r = &self.rect;
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let mut t0: f64 = 0.0;
        let mut t1: f64 = 1.0;
        for (p, q) in [
            (-dx, a.0 - r.x),
            (dx, r.right() - a.0),
            (-dy, a.1 - r.y),
            (dy, r.bottom() - a.1),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else {
                let t = q / p;
                if p < 0.0 {
                    t0 = t0.max(t);
                } else {
                    t1 = t1.min(t);
                }
            }
        }
        (t0 <= t1).then(|| ((a.0 + t0 * dx, a.1 + t0 * dy), (a.0 + t1 * dx, a.1 + t1 * dy)))
    }

    /// Visible runs of a polyline. NaN or unmappable points break the line.
    fn polyline(&self, xs: &[f64], ys: &[f64]) -> Vec<Vec<(f64, f64)>> {
        let mut runs = Vec::new();
        let mut run: Vec<(f64, f64)> = Vec::new();
        let mut prev: Option<(f64, f64)> = None;
        for (x, y) in xs.iter().zip(ys) {
            let Some(p) = self.point(*x, *y) else {
                prev = None;
                continue;
            };
            if let Some(q) = prev {
                match self.clip_segment(q, p) {
                    Some((a, b)) => {
                        if run.last() != Some(&a) {
                            if run.len() >= 2 {
                                runs.push(std::mem::take(&mut run));
                            }
                            run.clear();
                            run.push(a);
                        }
                        run.push(b);
                    }
                    None => {
                        if run.len() >= 2 {
                            runs.push(std::mem::take(&mut run));
                        }
                        run.clear();
                    }
                }
            }
            prev = Some(p);
        }
        if run.len() >= 2 {
            runs.push(run);
        }
        runs
    }
}

// ---------------------------------------------------------------------------
// Axes
// ---------------------------------------------------------------------------

fn draw_mark<DB: DrawingBackend>(p: &Painter<'_, DB>, m: &Mapper, mark: &Mark) -> Result<(), String> {
    match mark {
        Mark::Line { xs, ys, stroke, marker } => {
            for run in m.polyline(xs, ys) {
                p.stroke(&run, stroke)?;
            }
            if let Some(marker) = marker {
                for (x, y) in xs.iter().zip(ys) {
                    if let Some(pt) = m.point(*x, *y).filter(|pt| m.contains(*pt)) {
                        p.marker(*marker, pt, LINE_MARKER, stroke.color)?;
                    }
                }
            }
            Ok(())
        }
        Mark::Scatter { xs, ys, marker, size, color } => {
            let diameter = size.max(0.0).sqrt();
            for (x, y) in xs.iter().zip(ys) {
                if let Some(pt) = m.point(*x, *y).filter(|pt| m.contains(*pt)) {
                    p.marker(*marker, pt, diameter, *color)?;
                }
            }
            Ok(())
        }
        Mark::Bars { edges, heights, fill, edge } => {
            let base = if m.yscale == Scale::Log { m.ylim.0.min(m.ylim.1) } else { 0.0 };
            for (i, h) in heights.iter().enumerate() {
                let (Some(x0), Some(x1)) = (edges.get(i), edges.get(i + 1)) else { break };
                let (Some(a), Some(b)) = (m.point(*x0, base), m.point(*x1, *h)) else { continue };
                let r = Rect {
                    x: a.0.min(b.0),
                    y: a.1.min(b.1),
                    w: (b.0 - a.0).abs(),
                    h: (b.1 - a.1).abs(),
                };
                if let Some(r) = m.clip_rect(r) {
                    p.rect(r, Some(*fill), edge.as_ref())?;
                }
            }
            Ok(())
        }
        Mark::HLine { y, stroke } => match m.px_y(*y) {
            Some(py) if py >= m.rect.y && py <= m.rect.bottom() => {
                p.stroke(&[(m.rect.x, py), (m.rect.right(), py)], stroke)
            }
            _ => Ok(()),
        },
        Mark::VLine { x, stroke } => match m.px_x(*x) {
            Some(px) if px >= m.rect.x && px <= m.rect.right() => {
                p.stroke(&[(px, m.rect.y), (px, m.rect.bottom())], stroke)
            }
            _ => Ok(()),
        },
        Mark::Rect { x, y, width, height, fill, edge } => {
            let (Some(a), Some(b)) = (m.point(*x, *y), m.point(x + width, y + height)) else {
                return Ok(());
            };
            let r = Rect {
                x: a.0.min(b.0),
                y: a.1.min(b.1),
                w: (b.0 - a.0).abs(),
                h: (b.1 - a.1).abs(),
            };
            match m.clip_rect(r) {
                Some(r) => p.rect(r, *fill, edge.as_ref()),
                None => Ok(()),
            }
        }
        Mark::Circle { x, y, radius, fill, edge } => {
            let (Some(c), Some(e)) = (m.point(*x, *y), m.point(x + radius, *y)) else {
                return Ok(());
            };
            if m.contains(c) {
                p.circle(c, (e.0 - c.0).abs(), *fill, edge.as_ref())?;
            }
            Ok(())
        }
        Mark::VSpan { x0, x1, ymin, ymax, fill, edge } => {
            let (Some(a), Some(b)) = (m.px_x(*x0), m.px_x(*x1)) else { return Ok(()) };
            let top = m.rect.bottom() - ymax * m.rect.h;
            let bottom = m.rect.bottom() - ymin * m.rect.h;
            let r = Rect {
                x: a.min(b),
                y: top.min(bottom),
                w: (b - a).abs(),
                h: (bottom - top).abs(),
            };
            match m.clip_rect(r) {
                Some(r) => p.rect(r, *fill, edge.as_ref()),
                None => Ok(()),
            }
        }
        Mark::Text(t) => draw_text_mark(p, m, t),
    }
}

fn draw_text_mark<DB: DrawingBackend>(p: &Painter<'_, DB>, m: &Mapper, t: &TextMark) -> Result<(), String> {
    match m.point(t.x, t.y) {
        Some(at) if m.contains(at) => p.text(
            &t.text,
            at,
            "serif",
            t.size.unwrap_or(p.font_size),
            t.color,
            false,
            false,
            t.ha,
            t.va,
            t.rotation,
        ),
        _ => Ok(()),
    }
}

/// Offset of a label in pixels, positive `dy` moving up.
fn label_offset<DB: DrawingBackend>(p: &Painter<'_, DB>, m: &Mapper, label: &Label) -> (f64, f64) {
    let fx = AxisFrame::new(m.xlim.0, m.xlim.1, m.rect.w);
    let fy = AxisFrame::new(m.ylim.0, m.ylim.1, m.rect.h);
    (
        fx.offset_to_pixels(label.dx, label.dx_unit, p.dpi()),
        -fy.offset_to_pixels(label.dy, label.dy_unit, p.dpi()),
    )
}

fn tick_extent(direction: TickDirection, length: f64) -> (f64, f64) {
    // (inside, outside) lengths.
    match direction {
        TickDirection::In => (length, 0.0),
        TickDirection::Out => (0.0, length),
        TickDirection::InOut => (length / 2.0, length / 2.0),
    }
}

fn draw_axes<DB: DrawingBackend>(p: &Painter<'_, DB>, ax: &Axes, rect: Rect) -> Result<(), String> {
    let m = Mapper::new(ax, rect);
    let r = rect;

    if let Some(grid) = &ax.grid {
        let stroke = Stroke::new(grid.color, grid.linewidth, grid.linestyle);
        if let Some(t) = &ax.xticks {
            for px in t.positions.iter().filter_map(|v| m.px_x(*v)) {
                if px >= r.x && px <= r.right() {
                    p.stroke(&[(px, r.y), (px, r.bottom())], &stroke)?;
                }
            }
        }
        if let Some(t) = &ax.yticks {
            for py in t.positions.iter().filter_map(|v| m.px_y(*v)) {
                if py >= r.y && py <= r.bottom() {
                    p.stroke(&[(r.x, py), (r.right(), py)], &stroke)?;
                }
            }
        }
    }

    let mut artists: Vec<_> = ax.artists().iter().collect();
    artists.sort_by(|a, b| a.zorder.total_cmp(&b.zorder));
    for artist in artists {
        draw_mark(p, &m, &artist.mark)?;
    }

    let spine_width = ax.spines.linewidth.unwrap_or(SPINE_WIDTH);
    let spine = Stroke::solid(ax.spines.color, spine_width);
    if ax.frame {
        let s = &ax.spines;
        for (show, a, b) in [
            (s.show_left, (r.x, r.y), (r.x, r.bottom())),
            (s.show_right, (r.right(), r.y), (r.right(), r.bottom())),
            (s.show_top, (r.x, r.y), (r.right(), r.y)),
            (s.show_bottom, (r.x, r.bottom()), (r.right(), r.bottom())),
        ] {
            if show {
                p.stroke(&[a, b], &spine)?;
            }
        }
    }

    let mut below = 0.0;
    if let Some(t) = ax.xticks.as_ref().filter(|t| t.show) {
        let (inside, outside) = tick_extent(t.direction, p.pt(t.length));
        let mark = Stroke::solid(ax.spines.color, t.width);
        let mut tallest: f64 = 0.0;
        for (v, label) in t.positions.iter().zip(&t.labels) {
            let Some(x) = m.px_x(*v).filter(|x| *x >= r.x - 0.5 && *x <= r.right() + 0.5) else { continue };
            p.stroke(&[(x, r.bottom() - inside), (x, r.bottom() + outside)], &mark)?;
            let y = r.bottom() + outside + p.pt(TICK_PAD);
            p.text(&label.text, (x, y), &label.look.family, label.look.size, label.look.color, label.look.bold, label.look.italic, HAlign::Center, VAlign::Top, t.rotation)?;
            tallest = tallest.max(label.look.size);
        }
        below = outside + p.pt(TICK_PAD + tallest);
    }
    let mut beside = 0.0;
    if let Some(t) = ax.yticks.as_ref().filter(|t| t.show) {
        let (inside, outside) = tick_extent(t.direction, p.pt(t.length));
        let mark = Stroke::solid(ax.spines.color, t.width);
        let mut widest: f64 = 0.0;
        for (v, label) in t.positions.iter().zip(&t.labels) {
            let Some(y) = m.px_y(*v).filter(|y| *y >= r.y - 0.5 && *y <= r.bottom() + 0.5) else { continue };
            p.stroke(&[(r.x - outside, y), (r.x + inside, y)], &mark)?;
            let x = r.x - outside - p.pt(TICK_PAD);
            p.text(&label.text, (x, y), &label.look.family, label.look.size, label.look.color, label.look.bold, label.look.italic, HAlign::Right, VAlign::Center, t.rotation)?;
            widest = widest.max(text_width(&label.text, label.look.size));
        }
        beside = outside + p.pt(TICK_PAD + widest);
    }

    if let Some(l) = &ax.xlabel {
        let (dx, dy) = label_offset(p, &m, l);
        let at = (r.x + r.w / 2.0 + dx, r.bottom() + below + p.pt(l.pad) + dy);
        p.label(l, at, HAlign::Center, VAlign::Top, 0.0)?;
    }
    if let Some(l) = &ax.ylabel {
        let (dx, dy) = label_offset(p, &m, l);
        let at = (r.x - beside - p.pt(l.pad) + dx, r.y + r.h / 2.0 + dy);
        p.label(l, at, HAlign::Center, VAlign::Bottom, 90.0)?;
    }
    if let Some(l) = &ax.title {
        let (dx, dy) = label_offset(p, &m, l);
        let at = (r.x + r.w / 2.0 + dx, r.y - p.pt(l.pad) + dy);
        p.label(l, at, HAlign::Center, VAlign::Bottom, 0.0)?;
    }
    if let Some(legend) = &ax.legend {
        draw_legend(p, legend, r)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Legend
// ---------------------------------------------------------------------------

/// Anchor point inside the axes box as fractions, plus which corner of the legend sits there.
fn legend_anchor(loc: LegendLoc) -> ((f64, f64), (f64, f64)) {
    // ((ax, ay) in axes fractions from the bottom-left, (fx, fy) of the legend box).
    match loc {
        LegendLoc::Best | LegendLoc::UpperRight => ((1.0, 1.0), (1.0, 1.0)),
        LegendLoc::UpperLeft => ((0.0, 1.0), (0.0, 1.0)),
        LegendLoc::LowerLeft => ((0.0, 0.0), (0.0, 0.0)),
        LegendLoc::LowerRight => ((1.0, 0.0), (1.0, 0.0)),
        LegendLoc::Right | LegendLoc::CenterRight => ((1.0, 0.5), (1.0, 0.5)),
        LegendLoc::CenterLeft => ((0.0, 0.5), (0.0, 0.5)),
        LegendLoc::LowerCenter => ((0.5, 0.0), (0.5, 0.0)),
        LegendLoc::UpperCenter => ((0.5, 1.0), (0.5, 1.0)),
        LegendLoc::Center => ((0.5, 0.5), (0.5, 0.5)),
    }
}

fn draw_legend<DB: DrawingBackend>(p: &Painter<'_, DB>, legend: &Legend, r: Rect) -> Result<(), String> {
    let size = legend.look.size;
    let ncol = legend.ncol.max(1);
    let nrow = legend.entries.len().div_ceil(ncol);
    let handle = p.pt(2.0 * size);
    let gap = p.pt(0.8 * size);
    let row_h = p.pt(1.4 * size);
    let pad = p.pt(0.4 * size);
    let text_w = legend
        .entries
        .iter()
        .map(|e| p.pt(text_width(&e.label, size)))
        .fold(0.0, f64::max);
    let col_w = handle + gap + text_w;
    let title_h = legend.title.as_ref().map_or(0.0, |t| p.pt(t.look.size * 1.4));
    let title_w = legend
        .title
        .as_ref()
        .map_or(0.0, |t| p.pt(text_width(&t.text, t.look.size)));
    let box_w = (ncol as f64 * col_w + (ncol - 1) as f64 * gap).max(title_w) + 2.0 * pad;
    let box_h = nrow as f64 * row_h + title_h + 2.0 * pad;

    let ((ax, ay), (fx, fy)) = legend_anchor(legend.loc);
    let (ax, ay) = match legend.anchor.as_deref() {
        Some([x, y, ..]) => (*x, *y),
        _ => (ax, ay),
    };
    let inset = if legend.anchor.is_some() { 0.0 } else { pad };
    let dx = legend_offset_to_pixels(legend.offset.0, legend.offset_unit, r.w, p.dpi());
    let dy = legend_offset_to_pixels(legend.offset.1, legend.offset_unit, r.h, p.dpi());
    let anchor_x = r.x + ax * r.w + dx + inset * (1.0 - 2.0 * fx);
    let anchor_y = r.bottom() - ay * r.h - dy - inset * (1.0 - 2.0 * fy);
    let left = anchor_x - fx * box_w;
    let top = anchor_y - (1.0 - fy) * box_h;
    let frame = Rect {
        x: left,
        y: top,
        w: box_w,
        h: box_h,
    };
    if legend.frameon {
        p.rect(frame, Some(Color::WHITE.with_alpha(0.8)), Some(&Stroke::solid(Color::rgb(0xcc, 0xcc, 0xcc), 0.8)))?;
    }
    if let Some(t) = &legend.title {
        p.label(t, (left + box_w / 2.0, top + pad), HAlign::Center, VAlign::Top, 0.0)?;
    }
    for (i, entry) in legend.entries.iter().enumerate() {
        let (row, col) = (i / ncol, i % ncol);
        let x = left + pad + col as f64 * (col_w + gap);
        let y = top + pad + title_h + (row as f64 + 0.5) * row_h;
        match &entry.key {
            LegendKey::Line(stroke, marker) => {
                p.stroke(&[(x, y), (x + handle, y)], stroke)?;
                if let Some(marker) = marker {
                    p.marker(*marker, (x + handle / 2.0, y), LINE_MARKER, stroke.color)?;
                }
            }
            LegendKey::Marker(marker, color) => p.marker(*marker, (x + handle / 2.0, y), LINE_MARKER, *color)?,
            LegendKey::Patch(color) => {
                let h = row_h * 0.5;
                p.rect(
                    Rect {
                        x,
                        y: y - h / 2.0,
                        w: handle,
                        h,
                    },
                    Some(*color),
                    None,
                )?;
            }
        }
        let look = &legend.look;
        p.text(&entry.label, (x + handle + gap, y), &look.family, look.size, look.color, look.bold, look.italic, HAlign::Left, VAlign::Center, 0.0)?;
    }
    Ok(())
}

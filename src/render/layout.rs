//! Placement of the axes boxes on the canvas.
//!
//! Without tight layout the subplot parameters follow the usual fixed
//! fractions. With tight layout the margins are sized from the decorations
//! actually present (tick labels, axis labels, titles).

use crate::style::to_display;
use crate::surface::{Axes, Figure};

/// Pixel rectangle, origin at the top-left corner of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }
}

/// Subplot parameters as fractions of the canvas.
const LEFT: f64 = 0.125;
const RIGHT: f64 = 0.9;
const BOTTOM: f64 = 0.11;
const TOP: f64 = 0.88;
const SPACE: f64 = 0.2;
/// Border kept around a tight layout, in points.
const TIGHT_PAD: f64 = 4.0;
/// Average glyph advance relative to the font size.
const GLYPH_WIDTH: f64 = 0.55;

/// Rough rendered width of `text` in points.
pub fn text_width(text: &str, size: f64) -> f64 {
    to_display(text).chars().count() as f64 * size * GLYPH_WIDTH
}

/// Space the decorations of one axes need around its box, in points.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Decor {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

impl Decor {
    fn of(ax: &Axes) -> Self {
        let mut d = Decor::default();
        if let Some(t) = ax.yticks.as_ref().filter(|t| t.show) {
            let widest = t
                .labels
                .iter()
                .map(|l| text_width(&l.text, l.look.size))
                .fold(0.0, f64::max);
            d.left += t.length + 3.5 + widest;
        }
        if let Some(t) = ax.xticks.as_ref().filter(|t| t.show) {
            let tallest = t.labels.iter().map(|l| l.look.size).fold(0.0, f64::max);
            d.bottom += t.length + 3.5 + tallest;
            let last = t.labels.last().map_or(0.0, |l| text_width(&l.text, l.look.size) / 2.0);
            d.right = d.right.max(last);
        }
        if let Some(l) = &ax.ylabel {
            d.left += l.look.size + l.pad;
        }
        if let Some(l) = &ax.xlabel {
            d.bottom += l.look.size + l.pad;
        }
        if let Some(l) = &ax.title {
            d.top += l.look.size + l.pad;
        }
        d
    }

    fn max(self, other: Decor) -> Decor {
        Decor {
            left: self.left.max(other.left),
            right: self.right.max(other.right),
            top: self.top.max(other.top),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// Split `avail` pixels into `n` cells separated by gaps.
///
/// `space` is the gap as a fraction of the cell size; `None` uses `gap_px`.
fn cells(avail: f64, n: usize, space: Option<f64>, gap_px: f64) -> (f64, f64) {
    let n = n.max(1) as f64;
    let (cell, gap) = match space {
        Some(f) => {
            let cell = avail / (n + f * (n - 1.0));
            (cell, cell * f)
        }
        None => ((avail - gap_px * (n - 1.0)) / n, gap_px),
    };
    (cell.max(1.0), gap)
}

/// Boxes of the visible axes, keyed by grid index. `px_per_pt` converts points to pixels.
pub fn axes_boxes(figure: &Figure, width: f64, height: f64, px_per_pt: f64, tight: bool) -> Vec<(usize, Rect)> {
    let (rows, cols) = (figure.rows(), figure.cols());
    let (left, right, top, bottom, col_gap, row_gap) = if tight {
        let d = figure
            .visible()
            .map(|(_, ax)| Decor::of(ax))
            .fold(Decor::default(), Decor::max);
        let pad = TIGHT_PAD * px_per_pt;
        (
            pad + d.left * px_per_pt,
            pad + d.right * px_per_pt,
            pad + d.top.max(figure.font.size / 2.0) * px_per_pt,
            pad + d.bottom * px_per_pt,
            (d.left + d.right + TIGHT_PAD) * px_per_pt,
            (d.top + d.bottom + TIGHT_PAD) * px_per_pt,
        )
    } else {
        (LEFT * width, (1.0 - RIGHT) * width, (1.0 - TOP) * height, BOTTOM * height, 0.0, 0.0)
    };
    let wspace = figure.layout.wspace.or((!tight).then_some(SPACE));
    let hspace = figure.layout.hspace.or((!tight).then_some(SPACE));
    let (cell_w, gap_x) = cells(width - left - right, cols, wspace, col_gap);
    let (cell_h, gap_y) = cells(height - top - bottom, rows, hspace, row_gap);

    figure
        .visible()
        .map(|(i, _)| {
            let (r, c) = figure.cell(i);
            let rect = Rect {
                x: left + c as f64 * (cell_w + gap_x),
                y: top + r as f64 * (cell_h + gap_y),
                w: cell_w,
                h: cell_h,
            };
            (i, rect)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::load;
    use serde_json::json;

    fn figure(layout: serde_json::Value) -> Figure {
        let spec = load(json!({
            "size": {"width": 10, "height": 5},
            "layout": layout,
            "panels": [{}, {}]
        }))
        .unwrap();
        Figure::new(&spec)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn fixed_fractions_without_tight_layout() {
        let fig = figure(json!({"rows": 1, "cols": 2}));
        let boxes = axes_boxes(&fig, 1000.0, 500.0, 1.0, false);
        assert_eq!(boxes.len(), 2);
        let (a, b) = (boxes[0].1, boxes[1].1);
        assert!(close(a.x, 125.0));
        assert!(close(b.right(), 900.0));
        assert!(close(a.y, 60.0));
        assert!(close(a.bottom(), 445.0));
        // Gap is 20% of the cell width.
        assert!(close(b.x - a.right(), 0.2 * a.w));
    }

    #[test]
    fn explicit_spacing_is_a_fraction_of_the_cell() {
        let fig = figure(json!({"rows": 2, "cols": 1, "hspace": 0.5}));
        let boxes = axes_boxes(&fig, 1000.0, 500.0, 1.0, true);
        let (a, b) = (boxes[0].1, boxes[1].1);
        assert!(close(b.y - a.bottom(), 0.5 * a.h));
        assert!(close(a.w, b.w));
    }

    #[test]
    fn tight_layout_stays_inside_the_canvas() {
        let fig = figure(json!({"rows": 1, "cols": 2}));
        for (_, r) in axes_boxes(&fig, 720.0, 360.0, 1.0, true) {
            assert!(r.x >= 0.0 && r.right() <= 720.0);
            assert!(r.y >= 0.0 && r.bottom() <= 360.0);
        }
    }

    #[test]
    fn text_width_ignores_markup() {
        assert_eq!(text_width(r"\textbf{ab}", 10.0), text_width("ab", 10.0));
    }
}

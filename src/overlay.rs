//! Declarative overlays: reference lines, shapes, bands and annotations.
//!
//! Each overlay is drawn independently. A malformed entry is logged and
//! skipped; it never aborts the panel.

use crate::diagnostics;
use crate::error::OverlayRenderError;
use crate::spec::{HAlign, Marker, OverlayKind, OverlaySpec, VAlign};
use crate::style::{Color, LineStyle, parse_color, resolve_linestyle};
use crate::surface::{Artist, Mark, Stroke, Surface, TextMark};

/// Marker area in points squared when a point overlay gives no `width`.
const POINT_SIZE: f64 = 30.0;
const LINE_WIDTH: f64 = 1.0;

/// Resolved style shared by every overlay kind.
struct Look {
    line: Color,
    face: Color,
    edge: Color,
    width: f64,
    style: LineStyle,
    filled: bool,
}

fn fail(ov: &OverlaySpec, message: impl Into<String>) -> OverlayRenderError {
    OverlayRenderError::new(ov.kind.as_str(), message)
}

fn require(ov: &OverlaySpec, value: Option<f64>, field: &str) -> Result<f64, OverlayRenderError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(fail(ov, format!("`{}` must be finite, got {}", field, v))),
        None => Err(fail(ov, format!("missing `{}`", field))),
    }
}

fn look(surface: &dyn Surface, ov: &OverlaySpec) -> Result<Look, OverlayRenderError> {
    let palette = surface.palette();
    let color = |field: &str, value: &Option<String>| -> Result<Option<Color>, OverlayRenderError> {
        value
            .as_deref()
            .map(|s| parse_color(s, palette).map_err(|e| fail(ov, format!("{}: {}", field, e))))
            .transpose()
    };
    let base = color("color", &ov.color)?;
    let face = color("facecolor", &ov.facecolor)?;
    let edge = color("edgecolor", &ov.edgecolor)?;
    let style = match ov.linestyle.as_deref() {
        Some(s) => resolve_linestyle(s).ok_or_else(|| fail(ov, format!("unknown linestyle {:?}", s)))?,
        None => LineStyle::Solid,
    };
    let default = palette.cycle(0);
    let alpha = |c: Color| match ov.alpha {
        Some(a) if !c.is_transparent() => c.with_alpha(a),
        _ => c,
    };
    Ok(Look {
        line: alpha(base.unwrap_or(default)),
        face: alpha(face.or(base).unwrap_or(default)),
        edge: alpha(edge.or(base).unwrap_or(default)),
        width: ov.linewidth.unwrap_or(LINE_WIDTH),
        style,
        filled: ov.fill.unwrap_or(true),
    })
}

fn align<T>(ov: &OverlaySpec, value: &Option<String>, parse: fn(&str) -> Option<T>, default: T, field: &str) -> Result<T, OverlayRenderError> {
    match value.as_deref() {
        None => Ok(default),
        Some(s) => parse(s).ok_or_else(|| fail(ov, format!("unknown {} {:?}", field, s))),
    }
}

fn text_mark(ov: &OverlaySpec, x: f64, y: f64, text: &str) -> Result<TextMark, OverlayRenderError> {
    Ok(TextMark {
        x: x + ov.text_dx,
        y: y + ov.text_dy,
        text: text.to_string(),
        color: Color::BLACK,
        size: None,
        ha: align(ov, &ov.text_ha, HAlign::parse, HAlign::Center, "text_ha")?,
        va: align(ov, &ov.text_va, VAlign::parse, VAlign::Center, "text_va")?,
        rotation: ov.text_rotation.unwrap_or(0.0),
    })
}

/// Text placed over a shape's center, stacked just above it.
fn centered_text(ov: &OverlaySpec, x: f64, y: f64) -> Result<Option<Artist>, OverlayRenderError> {
    match ov.text.as_deref() {
        Some(text) if !text.is_empty() => {
            let mark = text_mark(ov, x, y, text)?;
            Ok(Some(Artist::new(Mark::Text(mark)).with_zorder(ov.zorder.map(|z| z as f64 + 1.0))))
        }
        _ => Ok(None),
    }
}

/// Build the artists for one overlay without touching the surface.
fn build(surface: &dyn Surface, ov: &OverlaySpec) -> Result<Vec<Artist>, OverlayRenderError> {
    let look = look(surface, ov)?;
    let stroke = Stroke::new(look.line, look.width, look.style);
    let edge = Stroke::new(look.edge, look.width, look.style);
    let fill = look.filled.then_some(look.face);
    let mut extra = None;
    let mark = match ov.kind {
        OverlayKind::VLine => Mark::VLine {
            x: require(ov, ov.x, "x")?,
            stroke,
        },
        OverlayKind::HLine => Mark::HLine {
            y: require(ov, ov.y, "y")?,
            stroke,
        },
        OverlayKind::Line => Mark::Line {
            xs: vec![require(ov, ov.x0, "x0")?, require(ov, ov.x1, "x1")?],
            ys: vec![require(ov, ov.y0, "y0")?, require(ov, ov.y1, "y1")?],
            stroke,
            marker: None,
        },
        OverlayKind::Point => Mark::Scatter {
            xs: vec![require(ov, ov.x, "x")?],
            ys: vec![require(ov, ov.y, "y")?],
            marker: Marker::Circle,
            size: ov.width.unwrap_or(POINT_SIZE),
            color: look.line,
        },
        OverlayKind::Rect => {
            let (x, y, width, height) = match (ov.x, ov.y, ov.width, ov.height) {
                (Some(x), Some(y), Some(w), Some(h)) => (x, y, w, h),
                _ => {
                    let (x0, x1) = (require(ov, ov.x0, "x0")?, require(ov, ov.x1, "x1")?);
                    let (y0, y1) = (require(ov, ov.y0, "y0")?, require(ov, ov.y1, "y1")?);
                    (x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs())
                }
            };
            extra = centered_text(ov, x + width / 2.0, y + height / 2.0)?;
            Mark::Rect {
                x,
                y,
                width,
                height,
                fill,
                edge: Some(edge),
            }
        }
        OverlayKind::Circle => {
            let (x, y) = (require(ov, ov.x, "x")?, require(ov, ov.y, "y")?);
            let radius = require(ov, ov.radius, "radius")?;
            if radius <= 0.0 {
                return Err(fail(ov, format!("`radius` must be positive, got {}", radius)));
            }
            extra = centered_text(ov, x, y)?;
            Mark::Circle {
                x,
                y,
                radius,
                fill,
                edge: Some(edge),
            }
        }
        OverlayKind::Annotation => {
            let (x, y) = (require(ov, ov.x, "x")?, require(ov, ov.y, "y")?);
            let text = ov.text.as_deref().ok_or_else(|| fail(ov, "missing `text`"))?;
            Mark::Text(TextMark {
                color: ov.color.as_ref().map_or(Color::BLACK, |_| look.line),
                ..text_mark(ov, x, y, text)?
            })
        }
        OverlayKind::Band => {
            let (x0, x1) = (require(ov, ov.x0, "x0")?, require(ov, ov.x1, "x1")?);
            let clamp = |v: Option<f64>, default: f64| v.map_or(default, |f| f.clamp(0.0, 1.0));
            Mark::VSpan {
                x0: x0.min(x1),
                x1: x0.max(x1),
                ymin: clamp(ov.ymin_frac, 0.0),
                ymax: clamp(ov.ymax_frac, 1.0),
                fill,
                edge: ov.edgecolor.is_some().then_some(edge),
            }
        }
    };

    let label = ov.show_in_legend.then(|| ov.label.clone().unwrap_or_default());
    let artist = Artist::new(mark)
        .with_label(label)
        .with_zorder(ov.zorder.map(|z| z as f64));
    Ok(std::iter::once(artist).chain(extra).collect())
}

/// Draw one overlay. Nothing reaches the surface when the overlay is invalid.
pub fn draw_overlay(surface: &mut dyn Surface, ov: &OverlaySpec) -> Result<(), OverlayRenderError> {
    for artist in build(surface, ov)? {
        surface.add(artist);
    }
    Ok(())
}

/// Draw overlays in order, skipping the ones that fail. Returns how many were drawn.
pub fn draw_overlays(surface: &mut dyn Surface, overlays: &[OverlaySpec]) -> usize {
    let mut drawn = 0;
    for (i, ov) in overlays.iter().enumerate() {
        match draw_overlay(surface, ov) {
            Ok(()) => drawn += 1,
            Err(e) => diagnostics::warn(format!("skipping overlay {}: {}", i, e)),
        }
    }
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Palette;
    use crate::surface::Axes;
    use pretty_assertions::assert_eq;

    fn overlay(kind: OverlayKind, f: impl FnOnce(&mut OverlaySpec)) -> OverlaySpec {
        let mut ov = OverlaySpec::new(kind);
        f(&mut ov);
        ov
    }

    fn axes() -> Axes {
        Axes::new(Palette::default())
    }

    #[test]
    fn circle_without_radius_is_skipped() {
        let mut ax = axes();
        let overlays = vec![
            overlay(OverlayKind::HLine, |o| o.y = Some(0.5)),
            overlay(OverlayKind::Circle, |o| {
                o.x = Some(1.0);
                o.y = Some(1.0);
            }),
            overlay(OverlayKind::VLine, |o| o.x = Some(2.0)),
        ];
        assert_eq!(draw_overlays(&mut ax, &overlays), 2);
        let kinds: Vec<&str> = ax.artists().iter().map(|a| a.mark.kind()).collect();
        assert_eq!(kinds, vec!["hline", "vline"]);
    }

    #[test]
    fn rect_corners_normalize() {
        let mut ax = axes();
        let ov = overlay(OverlayKind::Rect, |o| {
            o.x0 = Some(3.0);
            o.x1 = Some(1.0);
            o.y0 = Some(2.0);
            o.y1 = Some(5.0);
        });
        draw_overlay(&mut ax, &ov).unwrap();
        assert!(matches!(
            ax.artists()[0].mark,
            Mark::Rect { x, y, width, height, .. } if (x, y, width, height) == (1.0, 2.0, 2.0, 3.0)
        ));
    }

    #[test]
    fn rect_text_sits_above_the_shape() {
        let mut ax = axes();
        let ov = overlay(OverlayKind::Rect, |o| {
            o.x = Some(0.0);
            o.y = Some(0.0);
            o.width = Some(2.0);
            o.height = Some(4.0);
            o.text = Some("ROI".into());
            o.text_dx = 0.5;
            o.zorder = Some(4);
        });
        draw_overlay(&mut ax, &ov).unwrap();
        let text = &ax.artists()[1];
        assert_eq!(text.zorder, 5.0);
        match &text.mark {
            Mark::Text(t) => assert_eq!((t.x, t.y, t.ha), (1.5, 2.0, HAlign::Center)),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn facecolor_beats_color_and_alpha_applies() {
        let mut ax = axes();
        let ov = overlay(OverlayKind::Circle, |o| {
            o.x = Some(0.0);
            o.y = Some(0.0);
            o.radius = Some(1.0);
            o.color = Some("red".into());
            o.facecolor = Some("#0000ff".into());
            o.alpha = Some(0.5);
        });
        draw_overlay(&mut ax, &ov).unwrap();
        match &ax.artists()[0].mark {
            Mark::Circle { fill, edge, .. } => {
                assert_eq!(*fill, Some(Color::rgb(0, 0, 255).with_alpha(0.5)));
                assert_eq!(edge.as_ref().map(|e| e.color), Some(Color::rgb(255, 0, 0).with_alpha(0.5)));
            }
            other => panic!("expected a circle, got {other:?}"),
        }
    }

    #[test]
    fn band_fractions_are_clamped() {
        let mut ax = axes();
        let ov = overlay(OverlayKind::Band, |o| {
            o.x0 = Some(5.0);
            o.x1 = Some(2.0);
            o.ymin_frac = Some(-1.0);
            o.ymax_frac = Some(0.25);
        });
        draw_overlay(&mut ax, &ov).unwrap();
        assert!(matches!(
            ax.artists()[0].mark,
            Mark::VSpan { x0, x1, ymin, ymax, .. } if (x0, x1, ymin, ymax) == (2.0, 5.0, 0.0, 0.25)
        ));
    }

    #[test]
    fn legend_label_only_when_requested() {
        let mut ax = axes();
        let hidden = overlay(OverlayKind::HLine, |o| {
            o.y = Some(1.0);
            o.label = Some("limit".into());
        });
        let shown = overlay(OverlayKind::HLine, |o| {
            o.y = Some(2.0);
            o.label = Some("target".into());
            o.show_in_legend = true;
        });
        draw_overlays(&mut ax, &[hidden, shown]);
        assert_eq!(ax.artists()[0].label, None);
        assert_eq!(ax.artists()[1].label.as_deref(), Some("target"));
        assert_eq!(ax.legend_entries().len(), 1);
    }

    #[test]
    fn annotation_alignment_and_bad_values() {
        let mut ax = axes();
        let ok = overlay(OverlayKind::Annotation, |o| {
            o.x = Some(1.0);
            o.y = Some(2.0);
            o.text = Some("peak".into());
            o.text_ha = Some("left".into());
            o.text_dy = 0.5;
        });
        draw_overlay(&mut ax, &ok).unwrap();
        match &ax.artists()[0].mark {
            Mark::Text(t) => {
                assert_eq!((t.x, t.y), (1.0, 2.5));
                assert_eq!((t.ha, t.va), (HAlign::Left, VAlign::Center));
            }
            other => panic!("expected text, got {other:?}"),
        }

        let bad = overlay(OverlayKind::Annotation, |o| {
            o.x = Some(1.0);
            o.y = Some(2.0);
            o.text = Some("peak".into());
            o.text_va = Some("middle".into());
        });
        assert!(draw_overlay(&mut ax, &bad).is_err());
        assert_eq!(ax.artists().len(), 1);
    }

    #[test]
    fn bad_colors_fail_softly() {
        let mut ax = axes();
        let ov = overlay(OverlayKind::VLine, |o| {
            o.x = Some(1.0);
            o.color = Some("not-a-color".into());
        });
        let err = draw_overlay(&mut ax, &ov).unwrap_err();
        assert_eq!(err.kind, "vline");
        assert_eq!(draw_overlays(&mut ax, &[ov]), 0);
        assert!(ax.artists().is_empty());
    }

    #[test]
    fn point_size_comes_from_width() {
        let mut ax = axes();
        let ov = overlay(OverlayKind::Point, |o| {
            o.x = Some(1.0);
            o.y = Some(1.0);
            o.width = Some(80.0);
        });
        draw_overlay(&mut ax, &ov).unwrap();
        assert!(matches!(ax.artists()[0].mark, Mark::Scatter { size, .. } if size == 80.0));
    }
}

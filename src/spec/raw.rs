//! Partial document tree, as authored.
//!
//! Every field is optional so the same shape can hold a user document, a
//! preset or a theme. Flexible fields are untagged unions whose last variant
//! keeps whatever did not fit, so validation can report it with its path.
//!
//! YAML shape (abridged):
//! {
//!   "size":   { "width": 89, "height": 67, "unit": "mm" },
//!   "preset": "ieee_single_col",
//!   "axes_defaults": { "grid": { "show": true } },
//!   "panels": [
//!     {
//!       "axes":     { "title": "Latency", "xscale": "log" },
//!       "series":   [ { "type": "line", "data": "runs.csv", "x": "t", "y": "v" } ],
//!       "overlays": [ "marks.yaml", { "type": "vline", "x": 3 } ]
//!     }
//!   ]
//! }

use crate::error::SchemaError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field-by-field merge where `over` wins.
///
/// Leaves and sequences are replaced wholesale; nested objects recurse.
pub trait Merge: Sized {
    fn merge(self, over: Self) -> Self;
}

pub fn merge_opt<T: Merge>(base: Option<T>, over: Option<T>) -> Option<T> {
    match (base, over) {
        (Some(b), Some(o)) => Some(b.merge(o)),
        (b, o) => o.or(b),
    }
}

/// Merge three layers in ascending precedence.
pub fn merge3<T: Merge>(preset: T, theme: T, user: T) -> T {
    preset.merge(theme).merge(user)
}

/// Integer field that also takes whole floats such as `300.0`.
fn whole_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let Some(n) = Option::<serde_json::Number>::deserialize(d)? else {
        return Ok(None);
    };
    if let Some(i) = n.as_i64() {
        return Ok(Some(i));
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() <= i64::MAX as f64 / 2.0 => Ok(Some(f as i64)),
        _ => Err(serde::de::Error::custom(format!("expected an integer, got {}", n))),
    }
}

macro_rules! partial {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            deep { $($deep:ident : $dty:ty),* $(,)? }
            leaf { $($(#[$fmeta:meta])* $leaf:ident : $lty:ty),* $(,)? }
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $(pub $deep: Option<$dty>,)*
            $($(#[$fmeta])* pub $leaf: Option<$lty>,)*
        }

        impl Merge for $name {
            fn merge(self, over: Self) -> Self {
                Self {
                    $($deep: merge_opt(self.$deep, over.$deep),)*
                    $($leaf: over.$leaf.or(self.$leaf),)*
                }
            }
        }
    };
}

partial! {
    pub struct RawFigure {
        deep {
            size: RawSize,
            font: RawFont,
            layout: RawLayout,
            export: RawExport,
            axes_defaults: RawAxes,
        }
        leaf {
            panels: Vec<RawPanel>,
            theme: String,
            preset: String,
            palette: String,
        }
    }
}

partial! {
    pub struct RawSize {
        deep {}
        leaf {
            width: f64,
            height: f64,
            unit: String,
        }
    }
}

partial! {
    pub struct RawFont {
        deep {}
        leaf {
            family: String,
            size: f64,
            weight: String,
            style: String,
            use_tex: bool,
            latex_preamble: String,
        }
    }
}

partial! {
    pub struct RawLayout {
        deep {}
        leaf {
            #[serde(default, deserialize_with = "whole_number")]
            rows: i64,
            #[serde(default, deserialize_with = "whole_number")]
            cols: i64,
            wspace: f64,
            hspace: f64,
            shared_x: bool,
            shared_y: bool,
        }
    }
}

partial! {
    pub struct RawExport {
        deep {}
        leaf {
            path: String,
            #[serde(default, deserialize_with = "whole_number")]
            dpi: i64,
            formats: Vec<String>,
            tight_layout: bool,
            metadata: BTreeMap<String, String>,
        }
    }
}

partial! {
    pub struct RawPanel {
        deep {
            axes: RawAxes,
        }
        leaf {
            series: Vec<RawSeries>,
            overlays: Vec<Option<RawOverlayEntry>>,
        }
    }
}

partial! {
    pub struct RawAxes {
        deep {
            title: RawText,
            xlabel: RawText,
            ylabel: RawText,
            grid: RawGrid,
            limits: RawLimits,
            legend: RawLegend,
            spines: RawSpines,
            xticks: RawTicks,
            yticks: RawTicks,
        }
        leaf {
            xscale: String,
            yscale: String,
            show_axes_frame: bool,
            show_xlabel: bool,
            show_ylabel: bool,
            show_title: bool,
        }
    }
}

partial! {
    pub struct RawTextStyle {
        deep {}
        leaf {
            family: String,
            size: f64,
            weight: String,
            style: String,
            color: String,
        }
    }
}

partial! {
    pub struct RawTextSpec {
        deep {}
        leaf {
            family: String,
            size: f64,
            weight: String,
            style: String,
            color: String,
            show: bool,
            text: String,
            rotation: f64,
            ha: String,
            va: String,
            pad: f64,
            dx: f64,
            dy: f64,
            dx_unit: String,
            dy_unit: String,
        }
    }
}

/// TextLike: a bare string or a styled mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawText {
    Plain(String),
    Styled(RawTextSpec),
    Other(Value),
}

impl Merge for RawText {
    /// A plain string over a styled template keeps the template's style.
    fn merge(self, over: Self) -> Self {
        match (self, over) {
            (RawText::Styled(base), RawText::Styled(o)) => RawText::Styled(base.merge(o)),
            (RawText::Styled(base), RawText::Plain(text)) => RawText::Styled(RawTextSpec {
                text: Some(text),
                ..base
            }),
            (_, o) => o,
        }
    }
}

partial! {
    pub struct RawGrid {
        deep {}
        leaf {
            show: bool,
            which: String,
            linestyle: String,
            linewidth: f64,
            color: String,
        }
    }
}

partial! {
    pub struct RawLimits {
        deep {}
        leaf {
            x: Vec<f64>,
            y: Vec<f64>,
        }
    }
}

partial! {
    pub struct RawLegend {
        deep {
            title: RawText,
            style: RawTextStyle,
        }
        leaf {
            show: bool,
            loc: String,
            #[serde(default, deserialize_with = "whole_number")]
            ncol: i64,
            frameon: bool,
            labels: Vec<Option<RawText>>,
            anchor: Vec<f64>,
            offset_x: f64,
            offset_y: f64,
            offset_unit: String,
        }
    }
}

partial! {
    pub struct RawSpines {
        deep {}
        leaf {
            show_left: bool,
            show_right: bool,
            show_top: bool,
            show_bottom: bool,
            color: String,
            linewidth: f64,
        }
    }
}

partial! {
    pub struct RawTicks {
        deep {
            fmt: RawFormatter,
        }
        leaf {
            family: String,
            size: f64,
            weight: String,
            style: String,
            color: String,
            show: bool,
            rotation: f64,
            direction: String,
            length: f64,
            width: f64,
            locations: Vec<f64>,
            range: Vec<f64>,
            labels: Vec<Option<RawText>>,
        }
    }
}

partial! {
    pub struct RawFormatter {
        deep {}
        leaf {
            kind: String,
            pattern: String,
            sci_limits: Vec<i32>,
            unit: String,
            #[serde(default, deserialize_with = "whole_number")]
            places: i64,
            scale: f64,
            prefix: String,
            suffix: String,
            use_mathtext: bool,
            expression: String,
            wrap_mathtext: bool,
            bold: bool,
            italic: bool,
        }
    }
}

partial! {
    pub struct RawLine {
        deep {}
        leaf {
            color: String,
            width: f64,
            style: String,
            marker: String,
        }
    }
}

partial! {
    pub struct RawSeries {
        deep {
            style: RawLine,
            label: RawText,
        }
        leaf {
            #[serde(rename = "type")]
            kind: String,
            x: String,
            y: String,
            data: RawData,
            query: String,
            #[serde(default, deserialize_with = "whole_number")]
            bins: i64,
        }
    }
}

/// Data reference: a name/path or a loader mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawData {
    Name(String),
    Loader(RawLoader),
    Other(Value),
}

/// `{reader, path, options}` or `{inline: {column: [values]}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLoader {
    pub reader: Option<String>,
    pub path: Option<String>,
    pub options: Option<serde_json::Map<String, Value>>,
    pub inline: Option<BTreeMap<String, Vec<Value>>>,
}

partial! {
    pub struct RawOverlay {
        deep {}
        leaf {
            #[serde(rename = "type")]
            kind: String,
            color: String,
            edgecolor: String,
            facecolor: String,
            fill: bool,
            alpha: f64,
            linewidth: f64,
            linestyle: String,
            label: String,
            show_in_legend: bool,
            #[serde(default, deserialize_with = "whole_number")]
            zorder: i64,
            x: f64,
            y: f64,
            x0: f64,
            x1: f64,
            y0: f64,
            y1: f64,
            radius: f64,
            width: f64,
            height: f64,
            text: String,
            text_dx: f64,
            text_dy: f64,
            text_ha: String,
            text_va: String,
            text_rotation: f64,
            ymin_frac: f64,
            ymax_frac: f64,
        }
    }
}

/// Overlay list entry: a file reference (before expansion) or an inline overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawOverlayEntry {
    Path(String),
    Inline(RawOverlay),
    Other(Value),
}

impl RawFigure {
    /// Deserialize a document. Shape errors carry the path of the field.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        serde_path_to_error::deserialize(value).map_err(|e| {
            let path = e.path().to_string();
            let path = if path == "." { "document".to_string() } else { path };
            SchemaError::new(path, e.inner().to_string())
        })
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn user_wins_over_theme_over_preset() {
        let preset: RawFigure =
            serde_json::from_value(json!({"size": {"width": 89, "height": 67, "unit": "mm"}, "palette": "tab10"}))
                .unwrap();
        let theme: RawFigure =
            serde_json::from_value(json!({"palette": "grayscale", "size": {"unit": "in"}})).unwrap();
        let user: RawFigure = serde_json::from_value(json!({"size": {"width": 3.5}})).unwrap();

        let merged = merge3(preset, theme, user);
        let size = merged.size.unwrap();
        assert_eq!(size.width, Some(3.5));
        assert_eq!(size.height, Some(67.0));
        assert_eq!(size.unit.as_deref(), Some("in"));
        assert_eq!(merged.palette.as_deref(), Some("grayscale"));
    }

    #[test]
    fn sequences_are_replaced_not_concatenated() {
        let base = RawTicks {
            locations: Some(vec![1.0, 2.0, 3.0]),
            ..Default::default()
        };
        let over = RawTicks {
            locations: Some(vec![5.0]),
            ..Default::default()
        };
        assert_eq!(base.merge(over).locations, Some(vec![5.0]));
    }

    #[test]
    fn plain_text_over_styled_template_keeps_style() {
        let base: RawText = serde_json::from_value(json!({"size": 12, "weight": "bold"})).unwrap();
        let merged = base.merge(RawText::Plain("Latency".into()));
        match merged {
            RawText::Styled(spec) => {
                assert_eq!(spec.text.as_deref(), Some("Latency"));
                assert_eq!(spec.weight.as_deref(), Some("bold"));
            }
            other => panic!("expected styled text, got {other:?}"),
        }
    }

    #[test]
    fn integer_fields_take_whole_floats() {
        let raw = RawFigure::from_value(json!({
            "export": {"dpi": 300.0},
            "layout": {"rows": 2, "cols": 3.0},
            "panels": [{"series": [{"type": "hist", "bins": 20.0}], "overlays": [{"type": "hline", "zorder": 4.0}]}]
        }))
        .unwrap();
        assert_eq!(raw.export.unwrap().dpi, Some(300));
        assert_eq!(raw.layout.as_ref().and_then(|l| l.cols), Some(3));
        let panels = raw.panels.unwrap();
        let panel = &panels[0];
        assert_eq!(panel.series.as_ref().unwrap()[0].bins, Some(20));
        match &panel.overlays.as_ref().unwrap()[0] {
            Some(RawOverlayEntry::Inline(o)) => assert_eq!(o.zorder, Some(4)),
            other => panic!("expected an inline overlay, got {other:?}"),
        }

        let err = RawFigure::from_value(json!({"export": {"dpi": 300.5}})).unwrap_err();
        assert_eq!(err.path, "export.dpi");
        assert!(err.message.contains("integer"), "{}", err.message);
    }

    #[test]
    fn flexible_fields_keep_unrecognized_shapes() {
        let v: RawText = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(v, RawText::Other(json!(42)));

        let d: RawData = serde_json::from_value(json!({"reader": "csv", "path": "a.csv"})).unwrap();
        assert!(matches!(d, RawData::Loader(_)));

        let o: RawOverlayEntry = serde_json::from_value(json!("marks.yaml")).unwrap();
        assert_eq!(o, RawOverlayEntry::Path("marks.yaml".into()));
    }

    #[test]
    fn document_round_trips_through_json() {
        let doc = json!({
            "size": {"width": 3, "height": 2},
            "panels": [{"series": [{"type": "line", "data": "a.csv"}], "overlays": [null, {"type": "hline", "y": 1}]}]
        });
        let raw = RawFigure::from_value(doc).unwrap();
        let again = RawFigure::from_value(raw.to_value().unwrap()).unwrap();
        assert_eq!(raw, again);
    }
}

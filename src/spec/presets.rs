//! Named partial documents: journal presets and color themes.

use crate::error::SchemaError;
use crate::spec::raw::{RawAxes, RawFigure, RawFont, RawGrid, RawSize, RawSpines, merge3};

/// Journal presets, merged below the theme and the user document.
pub const PRESET_NAMES: &[&str] = &["ieee_single_col", "ieee_double_col", "nature_single_col"];

/// Themes, merged between the preset and the user document.
pub const THEME_NAMES: &[&str] = &["light", "dark"];

fn journal(width_mm: f64, height_mm: f64, font_pt: f64) -> RawFigure {
    RawFigure {
        size: Some(RawSize {
            width: Some(width_mm),
            height: Some(height_mm),
            unit: Some("mm".to_string()),
        }),
        font: Some(RawFont {
            size: Some(font_pt),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn themed(palette: &str, grid: &str, spines: &str) -> RawFigure {
    RawFigure {
        palette: Some(palette.to_string()),
        axes_defaults: Some(RawAxes {
            grid: Some(RawGrid {
                color: Some(grid.to_string()),
                ..Default::default()
            }),
            spines: Some(RawSpines {
                color: Some(spines.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn preset(name: &str) -> Option<RawFigure> {
    match name.trim().to_ascii_lowercase().as_str() {
        "ieee_single_col" => Some(journal(89.0, 67.0, 8.0)),
        "ieee_double_col" => Some(journal(183.0, 67.0, 8.0)),
        "nature_single_col" => Some(journal(89.0, 89.0, 9.0)),
        _ => None,
    }
}

pub fn theme(name: &str) -> Option<RawFigure> {
    match name.trim().to_ascii_lowercase().as_str() {
        "light" => Some(themed("okabe_ito", "#cccccc", "black")),
        "dark" => Some(themed("okabe_ito", "#555555", "#333333")),
        _ => None,
    }
}

/// Merge the document's preset and theme underneath it.
pub fn apply(user: RawFigure) -> Result<RawFigure, SchemaError> {
    let base = match user.preset.as_deref() {
        Some(name) => preset(name).ok_or_else(|| {
            SchemaError::new(
                "preset",
                format!("unknown preset {:?} (expected one of {})", name, PRESET_NAMES.join(", ")),
            )
        })?,
        None => RawFigure::default(),
    };
    let themed = match user.theme.as_deref() {
        Some(name) => theme(name).ok_or_else(|| {
            SchemaError::new(
                "theme",
                format!("unknown theme {:?} (expected one of {})", name, THEME_NAMES.join(", ")),
            )
        })?,
        None => RawFigure::default(),
    };
    Ok(merge3(base, themed, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Palette, SizeUnit, parse_color};
    use pretty_assertions::assert_eq;

    #[test]
    fn preset_fills_missing_size() {
        let user = RawFigure {
            preset: Some("ieee_double_col".into()),
            ..Default::default()
        };
        let merged = apply(user).unwrap();
        let size = merged.size.unwrap();
        assert_eq!((size.width, size.height), (Some(183.0), Some(67.0)));
        assert_eq!(merged.font.unwrap().size, Some(8.0));
    }

    #[test]
    fn theme_sits_between_preset_and_user() {
        let user = RawFigure {
            preset: Some("nature_single_col".into()),
            theme: Some("dark".into()),
            palette: Some("tab10".into()),
            ..Default::default()
        };
        let merged = apply(user).unwrap();
        assert_eq!(merged.palette.as_deref(), Some("tab10"));
        let grid = merged.axes_defaults.unwrap().grid.unwrap();
        assert_eq!(grid.color.as_deref(), Some("#555555"));
    }

    #[test]
    fn loaded_documents_layer_user_over_theme_over_preset() {
        let spec = crate::spec::load(serde_json::json!({
            "preset": "ieee_single_col",
            "theme": "dark",
            "font": {"size": 10},
            "axes_defaults": {"grid": {"color": "#123456"}},
            "panels": [{}]
        }))
        .unwrap();
        // Preset only.
        assert_eq!((spec.size.width, spec.size.height), (89.0, 67.0));
        assert_eq!(spec.size.unit, SizeUnit::Millimeter);
        // Preset and user: user wins.
        assert_eq!(spec.font.size, 10.0);
        // Theme and user: user wins.
        let axes = &spec.panels[0].axes;
        assert_eq!(axes.grid.color, parse_color("#123456", Palette::OkabeIto).unwrap());
        // Theme only.
        assert_eq!(axes.spines.color, parse_color("#333333", Palette::OkabeIto).unwrap());
        assert_eq!(spec.palette, Palette::OkabeIto);
        // The retained document is the user layer alone.
        assert_eq!(spec.document().size, None);
    }

    #[test]
    fn unknown_names_fail_with_the_field_path() {
        let user = RawFigure {
            preset: Some("acm_wide".into()),
            ..Default::default()
        };
        let err = apply(user).unwrap_err();
        assert_eq!(err.path, "preset");
        assert!(err.message.contains("acm_wide"));

        let user = RawFigure {
            theme: Some("neon".into()),
            ..Default::default()
        };
        assert_eq!(apply(user).unwrap_err().path, "theme");
    }
}

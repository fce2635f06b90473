//! Document loading: parse, expand overlay files, merge presets, validate.

use crate::error::SchemaError;
use crate::spec::model::FigureSpec;
use crate::spec::presets;
use crate::spec::raw::RawFigure;
use crate::spec::validate::validate;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a figure document comes from.
#[derive(Debug, Clone)]
pub enum SpecSource {
    /// A `.yaml`, `.yml` or `.json` file. Other suffixes are read as YAML.
    Path(PathBuf),
    /// An in-memory document. `base_dir` defaults to the working directory.
    Document {
        value: Value,
        base_dir: Option<PathBuf>,
    },
}

impl SpecSource {
    /// Parse YAML (or JSON) text into an in-memory source.
    pub fn from_yaml_str(text: &str) -> Result<Self, SchemaError> {
        Ok(SpecSource::Document {
            value: parse_text(text, false)?,
            base_dir: None,
        })
    }

    pub fn with_base_dir(self, dir: impl Into<PathBuf>) -> Self {
        match self {
            SpecSource::Document { value, .. } => SpecSource::Document {
                value,
                base_dir: Some(dir.into()),
            },
            path => path,
        }
    }
}

impl From<PathBuf> for SpecSource {
    fn from(path: PathBuf) -> Self {
        SpecSource::Path(path)
    }
}

impl From<&Path> for SpecSource {
    fn from(path: &Path) -> Self {
        SpecSource::Path(path.to_path_buf())
    }
}

impl From<&str> for SpecSource {
    fn from(path: &str) -> Self {
        SpecSource::Path(PathBuf::from(path))
    }
}

impl From<Value> for SpecSource {
    fn from(value: Value) -> Self {
        SpecSource::Document {
            value,
            base_dir: None,
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn parse_text(text: &str, json: bool) -> Result<Value, SchemaError> {
    let value: Value = if json {
        serde_json::from_str(text).map_err(|e| SchemaError::document(format!("invalid JSON: {}", e)))?
    } else {
        serde_yaml::from_str(text).map_err(|e| SchemaError::document(format!("invalid YAML: {}", e)))?
    };
    Ok(value)
}

fn read_document(path: &Path) -> Result<Value, String> {
    let text =
        fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    parse_text(&text, is_json(path)).map_err(|e| e.message)
}

fn absolute_dir(dir: Option<PathBuf>) -> Result<PathBuf, SchemaError> {
    let dir = match dir {
        Some(d) => d,
        None => std::env::current_dir()
            .map_err(|e| SchemaError::document(format!("cannot determine working directory: {}", e)))?,
    };
    let dir = std::path::absolute(&dir)
        .map_err(|e| SchemaError::document(format!("invalid base directory {}: {}", dir.display(), e)))?;
    Ok(fs::canonicalize(&dir).unwrap_or(dir))
}

/// Load and validate a figure document.
///
/// Errors are never partial: either every panel, series and overlay
/// validated, or the first failure comes back with its dotted path.
pub fn load(source: impl Into<SpecSource>) -> Result<FigureSpec, SchemaError> {
    let (value, base_dir) = match source.into() {
        SpecSource::Path(path) => {
            let resolved = fs::canonicalize(&path)
                .map_err(|e| SchemaError::document(format!("cannot read {}: {}", path.display(), e)))?;
            let value = read_document(&resolved).map_err(SchemaError::document)?;
            let dir = resolved.parent().map(Path::to_path_buf).unwrap_or_default();
            (value, dir)
        }
        SpecSource::Document { value, base_dir } => (value, absolute_dir(base_dir)?),
    };
    build(value, base_dir)
}

/// Shared tail of [`load`] and overrides: expand, merge, validate.
pub(crate) fn build(value: Value, base_dir: PathBuf) -> Result<FigureSpec, SchemaError> {
    let value = match value {
        Value::Null => Value::Object(Default::default()),
        Value::Object(_) => value,
        other => {
            return Err(SchemaError::document(format!(
                "top level must be a mapping, got {}",
                kind_of(&other)
            )));
        }
    };
    let expanded = expand_overlays(&value, &base_dir)?;
    let user = RawFigure::from_value(expanded)?;
    let merged = presets::apply(user.clone())?;
    validate(&merged, base_dir, user)
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Replace overlay file references with the overlays they contain.
///
/// Each string entry of `panels[i].overlays` is read relative to `base_dir`
/// and must hold a sequence of overlay mappings; its entries take the
/// string's place. Inline entries keep their position and `null` entries are
/// dropped. The input is left untouched.
pub fn expand_overlays(doc: &Value, base_dir: &Path) -> Result<Value, SchemaError> {
    let mut out = doc.clone();
    let Some(panels) = out.get_mut("panels").and_then(Value::as_array_mut) else {
        return Ok(out);
    };
    for (i, panel) in panels.iter_mut().enumerate() {
        let Some(entries) = panel.get_mut("overlays").and_then(Value::as_array_mut) else {
            continue;
        };
        let mut expanded = Vec::with_capacity(entries.len());
        for (j, entry) in entries.drain(..).enumerate() {
            let at = format!("panels[{}].overlays[{}]", i, j);
            match entry {
                Value::Null => {}
                Value::String(reference) => {
                    let path = base_dir.join(&reference);
                    let loaded = read_document(&path).map_err(|e| SchemaError::new(&at, e))?;
                    let items = match loaded {
                        Value::Null => Vec::new(),
                        Value::Array(items) => items,
                        other => {
                            return Err(SchemaError::new(
                                at,
                                format!(
                                    "overlay file {} must hold a sequence of overlays, got {}",
                                    reference,
                                    kind_of(&other)
                                ),
                            ));
                        }
                    };
                    for (k, item) in items.into_iter().enumerate() {
                        match item {
                            Value::Null => {}
                            Value::Object(_) => expanded.push(item),
                            other => {
                                return Err(SchemaError::new(
                                    at,
                                    format!(
                                        "entry {} of overlay file {} must be a mapping, got {}",
                                        k,
                                        reference,
                                        kind_of(&other)
                                    ),
                                ));
                            }
                        }
                    }
                }
                inline => expanded.push(inline),
            }
        }
        *entries = expanded;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn overlay_files_expand_in_place() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.yaml", "- {type: hline, y: 1}\n- {type: vline, x: 2}\n");
        write(dir.path(), "b.json", r#"[{"type": "point", "x": 0, "y": 0}]"#);

        let doc = json!({"panels": [{"overlays": [
            "a.yaml",
            {"type": "band", "y0": 0, "y1": 1},
            null,
            "b.json"
        ]}]});
        let out = expand_overlays(&doc, dir.path()).unwrap();
        let kinds: Vec<&str> = out["panels"][0]["overlays"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["type"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["hline", "vline", "band", "point"]);

        let again = expand_overlays(&out, dir.path()).unwrap();
        assert_eq!(out, again);
        assert_eq!(doc["panels"][0]["overlays"][0], json!("a.yaml"));
    }

    #[test]
    fn overlay_file_must_be_a_sequence() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "one.yaml", "type: hline\ny: 1\n");
        let doc = json!({"panels": [{}, {"overlays": ["one.yaml"]}]});
        let err = expand_overlays(&doc, dir.path()).unwrap_err();
        assert_eq!(err.path, "panels[1].overlays[0]");
    }

    #[test]
    fn missing_overlay_file_reports_its_entry() {
        let dir = tempfile::tempdir().unwrap();
        let doc = json!({"panels": [{"overlays": ["nope.yaml"]}]});
        let err = expand_overlays(&doc, dir.path()).unwrap_err();
        assert_eq!(err.path, "panels[0].overlays[0]");
        assert!(err.message.contains("nope.yaml"));
    }

    #[test]
    fn file_sources_record_their_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "fig.yml",
            "size: {width: 3, height: 2}\npanels:\n  - axes: {title: Hello}\n",
        );
        let spec = load(path).unwrap();
        assert_eq!(spec.base_dir, fs::canonicalize(dir.path()).unwrap());
        assert!(spec.base_dir.is_absolute());
    }

    #[test]
    fn documents_default_to_the_working_directory() {
        let spec = load(json!({"size": {"width": 1, "height": 1}, "panels": []})).unwrap();
        assert!(spec.base_dir.is_absolute());
    }

    #[test]
    fn parse_failures_are_document_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.json", "{not json");
        assert_eq!(load(path).unwrap_err().path, "document");

        assert_eq!(load(json!([1, 2])).unwrap_err().path, "document");
        assert_eq!(load(json!({"panels": 3})).unwrap_err().path, "panels");
    }

    #[test]
    fn shape_errors_name_the_offending_field() {
        let err = load(json!({"size": {"width": "wide", "height": 1}, "panels": []})).unwrap_err();
        assert_eq!(err.path, "size.width");
        assert!(err.message.contains("wide"), "{}", err.message);

        let err = load(json!({"panels": [{}, {"axes": {"grid": {"show": "yes"}}}]})).unwrap_err();
        assert_eq!(err.path, "panels[1].axes.grid.show");
    }

    #[test]
    fn retained_document_is_the_unmerged_user_layer() {
        let spec = load(json!({
            "preset": "ieee_single_col",
            "panels": [{"axes": {"title": "T"}}]
        }))
        .unwrap();
        assert_eq!(spec.size.width, 89.0);
        assert_eq!(spec.document().size, None);
    }
}

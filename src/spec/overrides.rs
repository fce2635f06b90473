//! Dot-path overrides applied to a loaded figure.
//!
//! `panels.0.axes.title=Latency` sets one field of the retained user document;
//! the result is expanded, merged and validated again from scratch.

use crate::error::SchemaError;
use crate::spec::load::build;
use crate::spec::model::FigureSpec;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::str::FromStr;

static KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.([A-Za-z_][A-Za-z0-9_]*|[0-9]+))*$").expect("static regex")
});

/// One `path=value` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub path: Vec<String>,
    pub value: Value,
}

/// Infer a scalar from override text: integer, float, boolean, else string.
pub fn infer_value(text: &str) -> Value {
    let t = text.trim();
    if let Ok(i) = t.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = t.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    if t.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if t.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::String(text.to_string())
}

impl Override {
    pub fn new(key: &str, value: impl Into<Value>) -> Result<Self, SchemaError> {
        let key = key.trim();
        if !KEY.is_match(key) {
            return Err(SchemaError::new(
                key,
                "override key must be dot-separated names or indices",
            ));
        }
        Ok(Self {
            path: key.split('.').map(str::to_string).collect(),
            value: value.into(),
        })
    }

    /// Parse `a.b.c=value`.
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        let Some((key, value)) = s.split_once('=') else {
            return Err(SchemaError::new(
                s.trim(),
                "override must look like path=value",
            ));
        };
        Self::new(key, infer_value(value))
    }

    pub fn key(&self) -> String {
        self.path.join(".")
    }

    /// Set the value inside `doc`, creating intermediate mappings as needed.
    pub fn apply(&self, doc: &mut Value) -> Result<(), SchemaError> {
        let key = self.key();
        let fail = |msg: String| SchemaError::new(key.clone(), msg);
        let Some((last, parents)) = self.path.split_last() else {
            return Err(fail("empty override path".to_string()));
        };

        let mut cursor = doc;
        for seg in parents {
            if cursor.is_null() {
                if seg.parse::<usize>().is_ok() {
                    return Err(fail(format!("cannot index {} into a missing sequence", seg)));
                }
                *cursor = Value::Object(Map::new());
            }
            cursor = match cursor {
                Value::Object(map) => map.entry(seg.clone()).or_insert(Value::Null),
                Value::Array(items) => {
                    let len = items.len();
                    let idx = seg
                        .parse::<usize>()
                        .map_err(|_| fail(format!("{:?} is not an index into a sequence", seg)))?;
                    items
                        .get_mut(idx)
                        .ok_or_else(|| fail(format!("index {} out of range (length {})", idx, len)))?
                }
                _ => return Err(fail(format!("cannot set a field below scalar {:?}", seg))),
            };
        }

        if cursor.is_null() {
            *cursor = Value::Object(Map::new());
        }
        match cursor {
            Value::Object(map) => {
                map.insert(last.clone(), self.value.clone());
            }
            Value::Array(items) => {
                let len = items.len();
                let idx = last
                    .parse::<usize>()
                    .map_err(|_| fail(format!("{:?} is not an index into a sequence", last)))?;
                match idx.cmp(&len) {
                    std::cmp::Ordering::Less => items[idx] = self.value.clone(),
                    std::cmp::Ordering::Equal => items.push(self.value.clone()),
                    std::cmp::Ordering::Greater => {
                        return Err(fail(format!("index {} out of range (length {})", idx, len)));
                    }
                }
            }
            _ => return Err(fail(format!("cannot set {:?} on a scalar", last))),
        }
        Ok(())
    }
}

impl FromStr for Override {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Override::parse(s)
    }
}

/// Apply overrides in order to a document value.
pub fn apply_overrides(doc: &mut Value, overrides: &[Override]) -> Result<(), SchemaError> {
    for o in overrides {
        o.apply(doc)?;
    }
    Ok(())
}

impl FigureSpec {
    /// Re-validate with `overrides` applied to the retained user document.
    ///
    /// Tables and callables attached in code are carried over by position
    /// unless an override gave that series a document-level data reference.
    pub fn with_overrides(&self, overrides: &[Override]) -> Result<FigureSpec, SchemaError> {
        let mut doc = self
            .document
            .to_value()
            .map_err(|e| SchemaError::document(e.to_string()))?;
        apply_overrides(&mut doc, overrides)?;
        let mut spec = build(doc, self.base_dir.clone())?;

        for (old, new) in self.panels.iter().zip(spec.panels.iter_mut()) {
            for (os, ns) in old.series.iter().zip(new.series.iter_mut()) {
                if ns.data.is_none() {
                    if let Some(source) = os.data.as_ref().filter(|d| d.is_runtime()) {
                        ns.data = Some(source.clone());
                    }
                }
            }
        }
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataSource, Table};
    use crate::spec::load;
    use crate::style::Scale;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn values_are_inferred_in_order() {
        assert_eq!(infer_value("3"), json!(3));
        assert_eq!(infer_value("2.5"), json!(2.5));
        assert_eq!(infer_value("TRUE"), json!(true));
        assert_eq!(infer_value("false"), json!(false));
        assert_eq!(infer_value("log"), json!("log"));
        assert_eq!(infer_value("nan"), json!("nan"));
    }

    #[test]
    fn keys_are_validated() {
        assert!(Override::parse("panels.0.axes.title=Hi").is_ok());
        assert!(Override::parse("panels..title=x").is_err());
        assert!(Override::parse("0.title=x").is_err());
        assert!(Override::parse("no_equals_sign").is_err());
        let o: Override = "export.dpi=600".parse().unwrap();
        assert_eq!(o.path, vec!["export", "dpi"]);
        assert_eq!(o.value, json!(600));
    }

    #[test]
    fn apply_creates_missing_mappings_and_indexes_sequences() {
        let mut doc = json!({"panels": [{"axes": null}]});
        Override::parse("panels.0.axes.title.text=T").unwrap().apply(&mut doc).unwrap();
        assert_eq!(doc, json!({"panels": [{"axes": {"title": {"text": "T"}}}]}));

        let err = Override::parse("panels.3.axes=x").unwrap().apply(&mut doc).unwrap_err();
        assert_eq!(err.path, "panels.3.axes");

        let err = Override::parse("series.0.type=line").unwrap().apply(&mut doc).unwrap_err();
        assert_eq!(err.path, "series.0.type");
    }

    fn spec() -> FigureSpec {
        load(json!({
            "size": {"width": 3, "height": 2},
            "panels": [{"axes": {"xscale": "linear"}, "series": [{"type": "line", "x": "a", "y": "b"}]}]
        }))
        .unwrap()
    }

    #[test]
    fn overrides_revalidate() {
        let spec = spec();
        let next = spec
            .with_overrides(&[
                Override::parse("panels.0.axes.xscale=log").unwrap(),
                Override::parse("size.width=5").unwrap(),
            ])
            .unwrap();
        assert_eq!(next.panels[0].axes.xscale, Scale::Log);
        assert_eq!(next.size.width, 5.0);
        assert_eq!(spec.panels[0].axes.xscale, Scale::Linear);

        let err = spec
            .with_overrides(&[Override::parse("panels.0.axes.xscale=loglog").unwrap()])
            .unwrap_err();
        assert_eq!(err.path, "panels[0].axes.xscale");
    }

    #[test]
    fn runtime_tables_survive_overrides() {
        let mut spec = spec();
        let table = Table::from_columns(vec![("a", vec![1.0, 2.0]), ("b", vec![3.0, 4.0])]).unwrap();
        spec.panels[0].series[0].data = Some(DataSource::Table(table.clone()));

        let next = spec
            .with_overrides(&[Override::parse("panels.0.axes.title=T").unwrap()])
            .unwrap();
        match &next.panels[0].series[0].data {
            Some(DataSource::Table(t)) => assert_eq!(t, &table),
            other => panic!("expected the attached table, got {other:?}"),
        }

        let next = spec
            .with_overrides(&[Override::parse("panels.0.series.0.data=runs.csv").unwrap()])
            .unwrap();
        assert!(matches!(&next.panels[0].series[0].data, Some(DataSource::Path(p)) if p == "runs.csv"));
    }
}

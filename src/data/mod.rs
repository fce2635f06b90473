//! Data resolution: turn a series' data reference into a [`Table`].
//!
//! Resolution order, first match wins:
//!
//! 1. a single external table, used for every series
//! 2. a named external table whose key equals the series' data name
//! 3. the series' own source: table, callable, loader, inline columns or path
//!
//! A `query` on the series is applied last as a row filter.

pub mod readers;
pub mod table;

pub use readers::{ReaderKind, read};
pub use table::Table;

use crate::error::DataError;
use crate::spec::SeriesSpec;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Zero-argument data producer. Its result is resolved like any other source.
pub type DataFn = Arc<dyn Fn() -> Result<DataSource, DataError> + Send + Sync>;

/// Callables returning callables are followed this many times at most.
const MAX_CALLABLE_DEPTH: usize = 16;

#[derive(Clone)]
pub enum DataSource {
    /// File path or external table name.
    Path(String),
    Loader {
        /// Inferred from the extension when absent.
        reader: Option<ReaderKind>,
        path: String,
        options: Map<String, Value>,
    },
    Inline(BTreeMap<String, Vec<Value>>),
    Table(Table),
    Callable(DataFn),
}

impl DataSource {
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn() -> Result<DataSource, DataError> + Send + Sync + 'static,
    {
        DataSource::Callable(Arc::new(f))
    }

    /// Attached in code rather than written in the document.
    pub fn is_runtime(&self) -> bool {
        matches!(self, DataSource::Table(_) | DataSource::Callable(_))
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Path(p) => f.debug_tuple("Path").field(p).finish(),
            DataSource::Loader {
                reader,
                path,
                options,
            } => f
                .debug_struct("Loader")
                .field("reader", reader)
                .field("path", path)
                .field("options", options)
                .finish(),
            DataSource::Inline(cols) => f
                .debug_tuple("Inline")
                .field(&cols.keys().collect::<Vec<_>>())
                .finish(),
            DataSource::Table(t) => write!(f, "Table({} rows)", t.height()),
            DataSource::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

impl From<Table> for DataSource {
    fn from(table: Table) -> Self {
        DataSource::Table(table)
    }
}

impl From<polars::prelude::DataFrame> for DataSource {
    fn from(df: polars::prelude::DataFrame) -> Self {
        DataSource::Table(Table::new(df))
    }
}

/// Tables injected by the caller at render time.
#[derive(Debug, Clone)]
pub enum External {
    Single(Table),
    Named(HashMap<String, Table>),
}

impl From<Table> for External {
    fn from(table: Table) -> Self {
        External::Single(table)
    }
}

impl From<HashMap<String, Table>> for External {
    fn from(tables: HashMap<String, Table>) -> Self {
        External::Named(tables)
    }
}

fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn load_source(source: &DataSource, base_dir: &Path, depth: usize) -> Result<Table, DataError> {
    match source {
        DataSource::Table(t) => Ok(t.clone()),
        DataSource::Callable(f) => {
            if depth >= MAX_CALLABLE_DEPTH {
                return Err(DataError::Callable(format!(
                    "gave up after {} nested callables",
                    MAX_CALLABLE_DEPTH
                )));
            }
            let next = f()?;
            load_source(&next, base_dir, depth + 1)
        }
        DataSource::Inline(columns) => Table::from_inline(columns),
        DataSource::Loader {
            reader,
            path,
            options,
        } => {
            let full = resolve_path(base_dir, path);
            let kind = reader.unwrap_or_else(|| ReaderKind::infer(&full));
            read(kind, &full, options)
        }
        DataSource::Path(path) => {
            let full = resolve_path(base_dir, path);
            if !full.exists() {
                return Err(DataError::NotFound { path: full });
            }
            read(ReaderKind::infer(&full), &full, &Map::new())
        }
    }
}

/// Resolve the table one series draws from.
pub fn resolve(
    series: &SeriesSpec,
    base_dir: &Path,
    external: Option<&External>,
) -> Result<Table, DataError> {
    let named = match (external, &series.data) {
        (Some(External::Single(t)), _) => Some(t.clone()),
        (Some(External::Named(tables)), Some(DataSource::Path(name))) => tables.get(name).cloned(),
        _ => None,
    };
    let table = match named {
        Some(t) => t,
        None => match &series.data {
            Some(source) => load_source(source, base_dir, 0)?,
            None => return Err(DataError::Missing),
        },
    };
    match series.query.as_deref() {
        Some(q) if !q.trim().is_empty() => table.filter(q),
        _ => Ok(table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn table(values: &[f64]) -> Table {
        Table::from_columns(vec![("x", values.to_vec())]).unwrap()
    }

    fn series(data: Option<DataSource>) -> SeriesSpec {
        SeriesSpec {
            data,
            ..SeriesSpec::new("line")
        }
    }

    #[test]
    fn single_external_wins_for_every_series() {
        let ext = External::Single(table(&[1.0]));
        let s = series(Some(DataSource::Path("ignored.csv".into())));
        assert_eq!(resolve(&s, Path::new("/"), Some(&ext)).unwrap(), table(&[1.0]));
    }

    #[test]
    fn named_external_beats_a_file_of_the_same_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), "x\n9\n").unwrap();
        let mut tables = HashMap::new();
        tables.insert("a".to_string(), table(&[1.0, 2.0]));
        let ext = External::Named(tables);

        let s = series(Some(DataSource::Path("a".into())));
        assert_eq!(resolve(&s, dir.path(), Some(&ext)).unwrap(), table(&[1.0, 2.0]));

        let from_file = resolve(&s, dir.path(), None).unwrap();
        assert_eq!(from_file.column_f64("x").unwrap(), vec![9.0]);
    }

    #[test]
    fn callables_resolve_recursively() {
        let s = series(Some(DataSource::callable(|| {
            Ok(DataSource::callable(|| Ok(DataSource::Table(table(&[4.0])))))
        })));
        assert_eq!(resolve(&s, Path::new("/"), None).unwrap(), table(&[4.0]));

        let failing = series(Some(DataSource::callable(|| {
            Err(DataError::Callable("boom".into()))
        })));
        assert!(matches!(resolve(&failing, Path::new("/"), None), Err(DataError::Callable(_))));
    }

    #[test]
    fn relative_paths_use_the_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/r.csv"), "x,y\n1,2\n3,4\n").unwrap();
        let s = series(Some(DataSource::Path("data/r.csv".into())));
        let t = resolve(&s, dir.path(), None).unwrap();
        assert_eq!(t.column_f64("y").unwrap(), vec![2.0, 4.0]);

        let missing = series(Some(DataSource::Path("data/none.csv".into())));
        assert!(matches!(resolve(&missing, dir.path(), None), Err(DataError::NotFound { .. })));
    }

    #[test]
    fn no_source_is_missing() {
        assert!(matches!(resolve(&series(None), Path::new("/"), None), Err(DataError::Missing)));
    }

    #[test]
    fn query_filters_after_loading() {
        let mut cols = BTreeMap::new();
        cols.insert("x".to_string(), vec![json!(1), json!(2), json!(3)]);
        let s = SeriesSpec {
            query: Some("x >= 2".into()),
            ..series(Some(DataSource::Inline(cols)))
        };
        let t = resolve(&s, Path::new("/"), None).unwrap();
        assert_eq!(t.column_f64("x").unwrap(), vec![2.0, 3.0]);
    }
}

//! File readers keyed by name.

use crate::data::table::Table;
use crate::error::DataError;
use polars::prelude::*;
use serde_json::{Map, Value};
use std::fs::File;
use std::path::Path;

closed_set! {
    /// Registered data reader.
    pub enum ReaderKind {
        Csv => "csv",
        Parquet => "parquet",
        Json => "json",
    }
}

impl ReaderKind {
    /// Reader implied by a file extension; csv when nothing matches.
    pub fn infer(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("parquet") | Some("pq") => ReaderKind::Parquet,
            Some("json") | Some("jsonl") | Some("ndjson") => ReaderKind::Json,
            _ => ReaderKind::Csv,
        }
    }
}

fn option_error(key: &str, message: impl Into<String>) -> DataError {
    DataError::ReaderOption {
        key: key.to_string(),
        message: message.into(),
    }
}

fn bool_option(key: &str, value: &Value) -> Result<bool, DataError> {
    value
        .as_bool()
        .ok_or_else(|| option_error(key, format!("expected a boolean, got {}", value)))
}

struct CsvOptions {
    separator: u8,
    has_header: bool,
    skip_rows: usize,
}

fn csv_options(options: &Map<String, Value>) -> Result<CsvOptions, DataError> {
    let mut out = CsvOptions {
        separator: b',',
        has_header: true,
        skip_rows: 0,
    };
    for (key, value) in options {
        match key.as_str() {
            "separator" | "sep" => {
                let s = value.as_str().unwrap_or_default();
                out.separator = match s.as_bytes() {
                    [b] => *b,
                    _ if s == "\\t" => b'\t',
                    _ => return Err(option_error(key, format!("expected one character, got {}", value))),
                };
            }
            "has_header" | "header" => out.has_header = bool_option(key, value)?,
            "skip_rows" => {
                out.skip_rows = value
                    .as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| option_error(key, format!("expected a non-negative integer, got {}", value)))?;
            }
            _ => return Err(option_error(key, "not a csv option (separator, has_header, skip_rows)")),
        }
    }
    Ok(out)
}

fn parquet_columns(options: &Map<String, Value>) -> Result<Option<Vec<String>>, DataError> {
    let mut columns = None;
    for (key, value) in options {
        match key.as_str() {
            "columns" => {
                let list = value
                    .as_array()
                    .and_then(|items| {
                        items
                            .iter()
                            .map(|v| v.as_str().map(str::to_string))
                            .collect::<Option<Vec<_>>>()
                    })
                    .ok_or_else(|| option_error(key, format!("expected a list of column names, got {}", value)))?;
                columns = Some(list);
            }
            _ => return Err(option_error(key, "not a parquet option (columns)")),
        }
    }
    Ok(columns)
}

fn json_lines(path: &Path, options: &Map<String, Value>) -> Result<bool, DataError> {
    let mut lines = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jsonl") || e.eq_ignore_ascii_case("ndjson"));
    for (key, value) in options {
        match key.as_str() {
            "lines" => lines = bool_option(key, value)?,
            _ => return Err(option_error(key, "not a json option (lines)")),
        }
    }
    Ok(lines)
}

fn open(path: &Path) -> Result<File, DataError> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DataError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            DataError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        }
    })
}

/// Read `path` with the named reader, forwarding its options.
pub fn read(kind: ReaderKind, path: &Path, options: &Map<String, Value>) -> Result<Table, DataError> {
    let read_error = |e: PolarsError| DataError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let df = match kind {
        ReaderKind::Csv => {
            let opts = csv_options(options)?;
            if !path.exists() {
                return Err(DataError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            CsvReadOptions::default()
                .with_has_header(opts.has_header)
                .with_skip_rows(opts.skip_rows)
                .map_parse_options(|p| p.with_separator(opts.separator))
                .try_into_reader_with_file_path(Some(path.to_path_buf()))
                .and_then(|reader| reader.finish())
                .map_err(read_error)?
        }
        ReaderKind::Parquet => {
            let columns = parquet_columns(options)?;
            ParquetReader::new(open(path)?)
                .with_columns(columns)
                .finish()
                .map_err(read_error)?
        }
        ReaderKind::Json => {
            let format = if json_lines(path, options)? {
                JsonFormat::JsonLines
            } else {
                JsonFormat::Json
            };
            JsonReader::new(open(path)?)
                .with_json_format(format)
                .finish()
                .map_err(read_error)?
        }
    };
    Ok(Table::new(df))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::PathBuf;

    fn opts(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn reader_is_inferred_from_extension() {
        assert_eq!(ReaderKind::infer(Path::new("a.csv")), ReaderKind::Csv);
        assert_eq!(ReaderKind::infer(Path::new("a.PQ")), ReaderKind::Parquet);
        assert_eq!(ReaderKind::infer(Path::new("a.parquet")), ReaderKind::Parquet);
        assert_eq!(ReaderKind::infer(Path::new("a.json")), ReaderKind::Json);
        assert_eq!(ReaderKind::infer(Path::new("runs")), ReaderKind::Csv);
    }

    #[test]
    fn csv_options_are_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.txt");
        std::fs::write(&path, "# produced by bench\nt;v\n1;10\n2;20\n").unwrap();
        let t = read(
            ReaderKind::Csv,
            &path,
            &opts(json!({"separator": ";", "skip_rows": 1})),
        )
        .unwrap();
        assert_eq!(t.column_f64("v").unwrap(), vec![10.0, 20.0]);
    }

    #[test]
    fn unknown_options_are_rejected() {
        let err = read(ReaderKind::Csv, Path::new("x.csv"), &opts(json!({"delimiter": ","}))).unwrap_err();
        assert!(matches!(err, DataError::ReaderOption { key, .. } if key == "delimiter"));

        let err = read(ReaderKind::Parquet, Path::new("x.pq"), &opts(json!({"columns": "a"}))).unwrap_err();
        assert!(matches!(err, DataError::ReaderOption { .. }));
    }

    #[test]
    fn json_records_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        std::fs::write(&path, r#"[{"a": 1, "b": 2.5}, {"a": 2, "b": 3.5}]"#).unwrap();
        let t = read(ReaderKind::Json, &path, &Map::new()).unwrap();
        assert_eq!(t.column_f64("b").unwrap(), vec![2.5, 3.5]);
    }

    #[test]
    fn missing_files_are_not_found() {
        let path = PathBuf::from("/definitely/not/here.csv");
        assert!(matches!(
            read(ReaderKind::Csv, &path, &Map::new()),
            Err(DataError::NotFound { .. })
        ));
        assert!(matches!(
            read(ReaderKind::Json, &path, &Map::new()),
            Err(DataError::NotFound { .. })
        ));
    }
}

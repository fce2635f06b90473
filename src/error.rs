//! Error taxonomy.
//!
//! Loading and data/layer resolution fail hard and propagate to the caller.
//! `OverlayRenderError` is the one error that is caught locally: the overlay
//! loop logs it and moves on to the next overlay.

use std::path::PathBuf;
use thiserror::Error;

/// Structural or validation failure while loading a figure document.
///
/// `path` is the dotted location of the offending field, e.g.
/// `panels[0].axes.xscale`, or `document` for whole-document failures.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("schema error at {path}: {message}")]
pub struct SchemaError {
    pub path: String,
    pub message: String,
}

impl SchemaError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Error about the document as a whole (parse failures, I/O).
    pub fn document(message: impl Into<String>) -> Self {
        Self::new("document", message)
    }
}

/// A series' data could not be resolved, loaded or filtered.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("series has no data source")]
    Missing,

    #[error("data not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("unknown reader {0:?} (expected csv, parquet or json)")]
    UnknownReader(String),

    #[error("invalid reader option {key:?}: {message}")]
    ReaderOption { key: String, message: String },

    #[error("invalid query {query:?}: {message}")]
    Query { query: String, message: String },

    #[error("column {column:?} not found (available: {available})")]
    Column { column: String, available: String },

    #[error("column {column:?} is not numeric: {message}")]
    NonNumeric { column: String, message: String },

    #[error("data callable failed: {0}")]
    Callable(String),

    #[error("table error: {0}")]
    Table(String),
}

impl From<polars::prelude::PolarsError> for DataError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        DataError::Table(err.to_string())
    }
}

/// A series references a layer type nobody registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown layer type {0:?}")]
pub struct UnknownLayerError(pub String);

/// Failure raised by a layer while drawing one series.
#[derive(Error, Debug)]
pub enum LayerError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("{layer}: {message}")]
    Invalid { layer: String, message: String },
}

/// Failure while building or drawing one overlay. Never leaves the overlay loop.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} overlay: {message}")]
pub struct OverlayRenderError {
    pub kind: String,
    pub message: String,
}

impl OverlayRenderError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Failure while writing the finished figure.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("drawing backend failed for {}: {message}", path.display())]
    Backend { path: PathBuf, message: String },

    #[error("export requested no formats")]
    NoFormats,
}

/// Everything a render call can fail with.
#[derive(Error, Debug)]
pub enum FigureError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    UnknownLayer(#[from] UnknownLayerError),

    #[error("layer {layer}: {message}")]
    Layer { layer: String, message: String },

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl From<LayerError> for FigureError {
    fn from(err: LayerError) -> Self {
        match err {
            LayerError::Data(e) => FigureError::Data(e),
            LayerError::Invalid { layer, message } => FigureError::Layer { layer, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_path_and_message() {
        let err = SchemaError::new("panels[0].axes.xscale", "unknown value \"loglog\"");
        assert_eq!(
            err.to_string(),
            "schema error at panels[0].axes.xscale: unknown value \"loglog\""
        );
    }

    #[test]
    fn unknown_layer_names_the_type() {
        let err = FigureError::from(UnknownLayerError("nonexistent".into()));
        assert!(err.to_string().contains("nonexistent"));
        assert!(matches!(err, FigureError::UnknownLayer(_)));
    }

    #[test]
    fn layer_data_errors_surface_as_data_errors() {
        let err = FigureError::from(LayerError::Data(DataError::Missing));
        assert!(matches!(err, FigureError::Data(DataError::Missing)));
    }
}

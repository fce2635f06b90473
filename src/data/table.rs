//! Tabular data handed to layers.

use crate::error::DataError;
use once_cell::sync::Lazy;
use polars::prelude::*;
use polars::sql::sql_expr;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*""#).expect("static regex"));
static CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(select|from|where|group\s+by|order\s+by|having|limit|offset|union)\b|;|--")
        .expect("static regex")
});

/// A column-oriented table backed by a polars `DataFrame`.
#[derive(Debug, Clone)]
pub struct Table {
    df: DataFrame,
}

impl Table {
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }

    /// Build a numeric table from `(name, values)` pairs.
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<f64>)>) -> Result<Self, DataError> {
        let columns: Vec<Column> = columns
            .into_iter()
            .map(|(name, values)| {
                let name: String = name.into();
                Column::new(name.into(), values)
            })
            .collect();
        Ok(Self::new(DataFrame::new(columns)?))
    }

    /// Build a table from inline document columns.
    ///
    /// A column of numbers (and nulls) becomes `Float64`, a column of booleans
    /// becomes `Boolean`; anything else is kept as text.
    pub fn from_inline(columns: &BTreeMap<String, Vec<Value>>) -> Result<Self, DataError> {
        let mut out = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            let column = if values.iter().all(|v| v.is_number() || v.is_null()) {
                let vals: Vec<Option<f64>> = values.iter().map(Value::as_f64).collect();
                Column::new(name.as_str().into(), vals)
            } else if values.iter().all(|v| v.is_boolean() || v.is_null()) {
                let vals: Vec<Option<bool>> = values.iter().map(Value::as_bool).collect();
                Column::new(name.as_str().into(), vals)
            } else {
                let vals: Vec<Option<String>> = values
                    .iter()
                    .map(|v| match v {
                        Value::Null => None,
                        Value::String(s) => Some(s.clone()),
                        other => Some(other.to_string()),
                    })
                    .collect();
                Column::new(name.as_str().into(), vals)
            };
            out.push(column);
        }
        DataFrame::new(out)
            .map(Self::new)
            .map_err(|e| DataError::Table(format!("inline columns: {}", e)))
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_frame(self) -> DataFrame {
        self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    /// A column as `f64` values; nulls become NaN.
    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>, DataError> {
        let column = self.df.column(name).map_err(|_| DataError::Column {
            column: name.to_string(),
            available: self.column_names().join(", "),
        })?;
        let dtype = column.dtype();
        if !(dtype.is_primitive_numeric() || dtype.is_temporal() || dtype.is_bool()) {
            return Err(DataError::NonNumeric {
                column: name.to_string(),
                message: format!("dtype is {}", dtype),
            });
        }
        let non_numeric = |e: PolarsError| DataError::NonNumeric {
            column: name.to_string(),
            message: e.to_string(),
        };
        let cast = column.cast(&DataType::Float64).map_err(non_numeric)?;
        let values = cast.f64().map_err(non_numeric)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }

    /// Keep the rows matching a SQL boolean expression (`WHERE` clause syntax).
    pub fn filter(&self, query: &str) -> Result<Table, DataError> {
        let fail = |e: PolarsError| DataError::Query {
            query: query.to_string(),
            message: e.to_string(),
        };
        // Only a predicate is accepted; clauses outside string literals are refused.
        if let Some(m) = CLAUSE.find(&QUOTED.replace_all(query, "''")) {
            return Err(DataError::Query {
                query: query.to_string(),
                message: format!("expected a boolean expression, found `{}`", m.as_str()),
            });
        }
        let predicate = sql_expr(query).map_err(fail)?;
        let df = self.df.clone().lazy().filter(predicate).collect().map_err(fail)?;
        Ok(Self::new(df))
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.df.equals_missing(&other.df)
    }
}

impl From<DataFrame> for Table {
    fn from(df: DataFrame) -> Self {
        Self::new(df)
    }
}

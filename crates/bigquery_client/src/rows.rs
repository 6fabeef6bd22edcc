//! Decoded query results.

use serde_json::Value;

use crate::api::models::{TableRow, TableSchema};
use crate::error::BigQueryError;

/// All rows returned by a completed query, in result order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl QueryRows {
    /// Builds a result set from column names and cell values.
    ///
    /// Every row must have one cell per column.
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// A result set with no columns and no rows, as returned by DDL statements.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_schema(schema: Option<&TableSchema>) -> Self {
        let columns = schema
            .map(|schema| schema.fields.iter().map(|field| field.name.clone()).collect())
            .unwrap_or_default();

        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub(crate) fn extend_from_page(&mut self, rows: Vec<TableRow>) {
        self.rows.extend(
            rows.into_iter()
                .map(|row| row.f.into_iter().map(|cell| cell.v).collect()),
        );
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row {
            columns: &self.columns,
            cells,
        })
    }
}

/// A borrowed view of one result row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    cells: &'a [Value],
}

/// Stands in for cells missing from short rows.
static NULL: Value = Value::Null;

impl<'a> Row<'a> {
    fn cell(&self, column: &str) -> Result<&'a Value, BigQueryError> {
        let index = self
            .columns
            .iter()
            .position(|name| name == column)
            .ok_or_else(|| BigQueryError::MissingColumn(column.to_string()))?;

        Ok(self.cells.get(index).unwrap_or(&NULL))
    }

    /// Reads a FLOAT64/NUMERIC/INT64 cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing, NULL or not numeric.
    pub fn get_f64(&self, column: &str) -> Result<f64, BigQueryError> {
        let value = self.cell(column)?;
        let parsed = match value {
            Value::String(text) => text.parse::<f64>().ok(),
            Value::Number(number) => number.as_f64(),
            _ => None,
        };

        parsed.ok_or_else(|| BigQueryError::InvalidValue {
            column: column.to_string(),
            value: value.to_string(),
        })
    }
}

//! Result rows and column metadata

use crate::types::{decode_text, PgValue};
use crate::Result;
use bytes::Bytes;
use std::sync::Arc;

/// Column descriptors shared between a statement and every row it produced
pub type SharedColumns = Arc<Vec<Column>>;

/// One result column: name and type OID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    type_oid: u32,
}

impl Column {
    pub(crate) fn new(name: String, type_oid: u32) -> Self {
        Self { name, type_oid }
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data type OID
    pub fn type_oid(&self) -> u32 {
        self.type_oid
    }
}

/// One decoded result row.
///
/// Values are ordered like the statement's column descriptors; fields can be
/// read by position, by column name, or iterated as `(name, value)` pairs.
#[derive(Debug, Clone)]
pub struct Row {
    columns: SharedColumns,
    values: Vec<PgValue>,
}

impl Row {
    /// Decode a DataRow body against the column descriptors.
    ///
    /// A wire length of -1 arrives here as `None` and decodes to
    /// [`PgValue::Null`]; everything else goes through the OID table.
    pub(crate) fn decode(columns: SharedColumns, raw: Vec<Option<Bytes>>) -> Result<Row> {
        let mut values = Vec::with_capacity(raw.len());
        for (i, field) in raw.into_iter().enumerate() {
            let value = match field {
                None => PgValue::Null,
                Some(bytes) => {
                    // Columns beyond the descriptor list decode as raw text
                    let oid = columns.get(i).map(|c| c.type_oid()).unwrap_or(0);
                    decode_text(oid, &bytes)?
                }
            };
            values.push(value);
        }
        Ok(Row { columns, values })
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the row has no fields
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column descriptors for this row
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Field by position
    pub fn get(&self, index: usize) -> Option<&PgValue> {
        self.values.get(index)
    }

    /// Field by column name (first match)
    pub fn get_by_name(&self, name: &str) -> Option<&PgValue> {
        let index = self.index_of(name)?;
        self.values.get(index)
    }

    /// Position of a named column
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Iterate `(column_name, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PgValue)> {
        self.columns
            .iter()
            .map(|c| c.name())
            .zip(self.values.iter())
    }

    /// Consume the row into its values
    pub fn into_values(self) -> Vec<PgValue> {
        self.values
    }
}

/// The collected result of one execute: column descriptors, decoded rows and
/// the final CommandComplete tag (e.g. `SELECT 5` or `INSERT 0 1`).
#[derive(Debug)]
pub struct QueryResult {
    columns: SharedColumns,
    rows: Vec<Row>,
    command_tag: String,
}

impl QueryResult {
    pub(crate) fn new(columns: SharedColumns, rows: Vec<Row>, command_tag: String) -> Self {
        Self {
            columns,
            rows,
            command_tag,
        }
    }

    /// Column descriptors
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Decoded rows
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows came back
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The last CommandComplete tag of the execution
    pub fn command_tag(&self) -> &str {
        &self.command_tag
    }

    /// Consume into the row vector
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl IntoIterator for QueryResult {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

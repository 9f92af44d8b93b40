//! Record sanitizer: turns a raw table into documents a schemaless store
//! accepts without mangling.
//!
//! Two rules:
//! - A column is dropped whole when its first present sample is a list, or a
//!   mapping that itself holds a list or mapping. Only that one sample is
//!   looked at; later rows never change the verdict.
//! - Float NaN becomes null. Nothing else is touched.

use dbclaw_core::table::{Column, Table};
use dbclaw_core::value::{Document, Value};

/// Why a column was kept or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnVerdict {
    /// Sample is a scalar or a flat mapping
    Keep,
    /// Every value is null or NaN
    KeepEmpty,
    /// Sample is a list
    DropList,
    /// Sample is a mapping with a list or mapping inside
    DropNestedMap,
}

impl ColumnVerdict {
    pub fn is_drop(self) -> bool {
        matches!(self, Self::DropList | Self::DropNestedMap)
    }
}

/// The sanitized form of one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SanitizedTable {
    /// Surviving column names, in source order
    pub columns: Vec<String>,
    /// One document per row, in source order
    pub documents: Vec<Document>,
    /// Names of the eliminated columns, in source order
    pub dropped_columns: Vec<String>,
}

impl SanitizedTable {
    pub fn row_count(&self) -> usize {
        self.documents.len()
    }
}

/// Stateless sanitizer.
pub struct RecordSanitizer;

impl RecordSanitizer {
    /// Judge one column from its first present sample.
    pub fn verdict(column: &Column) -> ColumnVerdict {
        match column.first_present() {
            None => ColumnVerdict::KeepEmpty,
            Some(Value::List(_)) => ColumnVerdict::DropList,
            Some(Value::Map(map)) if map.values().any(|v| v.is_list() || v.is_map()) => {
                ColumnVerdict::DropNestedMap
            }
            Some(_) => ColumnVerdict::Keep,
        }
    }

    /// Limit, eliminate columns, materialize rows, normalize NaN.
    pub fn sanitize(table: &Table, limit: Option<usize>) -> SanitizedTable {
        let limited;
        let table = match limit {
            Some(n) if n < table.row_count() => {
                limited = table.head(n);
                &limited
            }
            _ => table,
        };

        let mut kept: Vec<&Column> = Vec::with_capacity(table.column_count());
        let mut dropped_columns = Vec::new();
        for column in table.columns() {
            if Self::verdict(column).is_drop() {
                dropped_columns.push(column.name.clone());
            } else {
                kept.push(column);
            }
        }

        let documents = (0..table.row_count())
            .map(|row| {
                let mut doc = Document::with_capacity(kept.len());
                for column in &kept {
                    doc.insert(column.name.clone(), normalize(&column.values[row]));
                }
                doc
            })
            .collect();

        SanitizedTable {
            columns: kept.iter().map(|c| c.name.clone()).collect(),
            documents,
            dropped_columns,
        }
    }
}

fn normalize(value: &Value) -> Value {
    if value.is_nan() {
        Value::Null
    } else {
        value.clone()
    }
}

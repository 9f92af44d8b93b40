//! In-memory tabular data: an ordered list of named, equal-length columns.

use crate::error::DatasetError;
use crate::value::{Document, Value};
use std::collections::HashMap;

/// One named column of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// The first value that is neither null nor NaN.
    pub fn first_present(&self) -> Option<&Value> {
        self.values.iter().find(|v| !v.is_missing())
    }
}

/// A column-major table. Every column has exactly `row_count` values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from columns, rejecting ragged input.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let rows = columns.first().map_or(0, |c| c.values.len());
        if let Some(bad) = columns.iter().find(|c| c.values.len() != rows) {
            return Err(DatasetError::Decode(format!(
                "column '{}' has {} values, expected {rows}",
                bad.name,
                bad.values.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Build a table from row records.
    ///
    /// Columns follow `column_order` first, then any extra keys in the order
    /// they are first seen. A row that lacks a column gets null there.
    pub fn from_rows<R, I>(column_order: Vec<String>, rows: R) -> Self
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut columns: Vec<Column> = Vec::with_capacity(column_order.len());
        for name in column_order {
            if !index.contains_key(&name) {
                index.insert(name.clone(), columns.len());
                columns.push(Column::new(name, Vec::new()));
            }
        }

        let mut count = 0usize;
        for row in rows {
            for (key, value) in row {
                let idx = match index.get(&key) {
                    Some(&i) => i,
                    None => {
                        // Late column: backfill earlier rows with null.
                        let i = columns.len();
                        index.insert(key.clone(), i);
                        columns.push(Column::new(key, vec![Value::Null; count]));
                        i
                    }
                };
                let col = &mut columns[idx];
                if col.values.len() == count {
                    col.values.push(value);
                } else {
                    // Duplicate key within one row: last one wins.
                    col.values[count] = value;
                }
            }
            count += 1;
            for col in &mut columns {
                if col.values.len() < count {
                    col.values.push(Value::Null);
                }
            }
        }

        Self {
            columns,
            rows: count,
        }
    }

    /// Rebuild a table from documents (column order = first-seen key order).
    pub fn from_documents(documents: &[Document]) -> Self {
        Self::from_rows(
            Vec::new(),
            documents.iter().map(|d| {
                d.iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect::<Vec<_>>()
            }),
        )
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// The first `n` rows, in order. `n` larger than the table keeps everything.
    pub fn head(&self, n: usize) -> Table {
        let rows = n.min(self.rows);
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.values[..rows].to_vec()))
                .collect(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn from_rows_fills_missing_cells_with_null() {
        let table = Table::from_rows(
            vec!["id".into(), "name".into()],
            vec![
                row(&[("id", Value::Int(1)), ("name", "a".into())]),
                row(&[("id", Value::Int(2))]),
            ],
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("name").unwrap().values[1], Value::Null);
    }

    #[test]
    fn late_columns_are_backfilled() {
        let table = Table::from_rows(
            vec!["id".into()],
            vec![
                row(&[("id", Value::Int(1))]),
                row(&[("id", Value::Int(2)), ("extra", Value::Bool(true))]),
            ],
        );
        assert_eq!(table.column_names(), vec!["id", "extra"]);
        assert_eq!(
            table.column("extra").unwrap().values,
            vec![Value::Null, Value::Bool(true)]
        );
    }

    #[test]
    fn ragged_columns_rejected() {
        let result = Table::from_columns(vec![
            Column::new("a", vec![Value::Int(1), Value::Int(2)]),
            Column::new("b", vec![Value::Int(1)]),
        ]);
        assert!(matches!(result, Err(DatasetError::Decode(_))));
    }

    #[test]
    fn head_is_an_ordered_prefix() {
        let table = Table::from_columns(vec![Column::new(
            "n",
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        )])
        .unwrap();
        let head = table.head(2);
        assert_eq!(head.row_count(), 2);
        assert_eq!(head.columns()[0].values, vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(table.head(10).row_count(), 3);
    }

    #[test]
    fn first_present_skips_null_and_nan() {
        let col = Column::new(
            "score",
            vec![Value::Null, Value::Float(f64::NAN), Value::Float(2.5)],
        );
        assert_eq!(col.first_present(), Some(&Value::Float(2.5)));
    }
}

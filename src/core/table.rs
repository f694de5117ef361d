/// In-memory tabular dataset
///
/// A `Table` is built once by the loader and only read afterwards. Every column
/// holds the same number of rows.

use thiserror::Error;

/// Values of a single column, typed by inference at load time
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Every present cell parsed as a number
    Numeric(Vec<Option<f64>>),
    /// Anything else, including mixed columns
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of absent cells
    pub fn missing_count(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.iter().filter(|v| v.is_none()).count(),
            ColumnData::Text(values) => values.iter().filter(|v| v.is_none()).count(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric(_))
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }
}

/// Columns disagree on the number of rows
#[derive(Debug, Error, PartialEq)]
#[error("column '{column}' has {actual} rows, expected {expected}")]
pub struct RaggedColumns {
    pub column: String,
    pub expected: usize,
    pub actual: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Build a table, checking that every column has the same length
    pub fn new(columns: Vec<Column>) -> Result<Self, RaggedColumns> {
        let rows = columns.first().map(|c| c.data.len()).unwrap_or(0);

        if let Some(bad) = columns.iter().find(|c| c.data.len() != rows) {
            return Err(RaggedColumns {
                column: bad.name.clone(),
                expected: rows,
                actual: bad.data.len(),
            });
        }

        Ok(Self { columns, rows })
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns.len())
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Numeric columns in table order
    pub fn numeric_columns(&self) -> Vec<(&str, &[Option<f64>])> {
        self.columns
            .iter()
            .filter_map(|c| match &c.data {
                ColumnData::Numeric(values) => Some((c.name.as_str(), values.as_slice())),
                ColumnData::Text(_) => None,
            })
            .collect()
    }

    pub fn has_numeric_columns(&self) -> bool {
        self.columns.iter().any(|c| c.data.is_numeric())
    }

    /// Missing cell count for every column, in table order
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.data.missing_count()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_columns_rejected() {
        let err = Table::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0)]),
            Column::text("b", vec![Some("x".to_string())]),
        ])
        .unwrap_err();

        assert_eq!(err.column, "b");
        assert_eq!(err.expected, 2);
        assert_eq!(err.actual, 1);
    }

    #[test]
    fn test_shape_and_missing_counts() {
        let table = Table::new(vec![
            Column::numeric("a", vec![Some(1.0), None, Some(3.0)]),
            Column::text("b", vec![None, None, Some("z".to_string())]),
        ])
        .unwrap();

        assert_eq!(table.shape(), (3, 2));
        assert_eq!(
            table.missing_counts(),
            vec![("a".to_string(), 1), ("b".to_string(), 2)]
        );
        assert_eq!(table.numeric_columns().len(), 1);
        assert!(table.column("b").is_some());
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new(Vec::new()).unwrap();
        assert_eq!(table.shape(), (0, 0));
        assert!(!table.has_numeric_columns());
    }
}

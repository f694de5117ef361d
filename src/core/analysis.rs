/// Statistical profile of a table
///
/// These types only hold data. They serialize to the JSON that is embedded in
/// the narrative prompt and written by the optional analysis export.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Map keyed by column name that keeps table order when serialized
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap<T>(Vec<(String, T)>);

impl<T> ColumnMap<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, column: impl Into<String>, value: T) {
        self.0.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<&T> {
        self.0.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Default for ColumnMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(String, T)> for ColumnMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: Serialize> Serialize for ColumnMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Statistics of a numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    #[serde(rename = "25%")]
    pub q25: f64,
    #[serde(rename = "50%")]
    pub median: f64,
    #[serde(rename = "75%")]
    pub q75: f64,
    pub max: f64,
}

/// Statistics of a text column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    pub count: usize,
    pub unique: usize,
    /// Most frequent value
    pub top: Option<String>,
    /// Occurrences of `top`
    pub freq: Option<usize>,
}

/// Per-column statistics; the set depends on the column type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnSummary {
    Numeric(NumericSummary),
    Categorical(CategoricalSummary),
}

impl ColumnSummary {
    pub fn count(&self) -> usize {
        match self {
            ColumnSummary::Numeric(s) => s.count,
            ColumnSummary::Categorical(s) => s.count,
        }
    }
}

/// Shape of a table as (rows, columns)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shape(pub usize, pub usize);

impl Shape {
    pub fn rows(&self) -> usize {
        self.0
    }

    pub fn columns(&self) -> usize {
        self.1
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// Everything the profiler derives from a table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub shape: Shape,
    pub columns: Vec<String>,
    pub missing_values: ColumnMap<usize>,
    pub summary_statistics: ColumnMap<ColumnSummary>,
    /// Pearson coefficients between numeric columns; `None` without any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_matrix: Option<ColumnMap<ColumnMap<f64>>>,
}

impl Analysis {
    /// Coefficient between two numeric columns, if both are in the matrix
    pub fn correlation(&self, a: &str, b: &str) -> Option<f64> {
        self.correlation_matrix
            .as_ref()
            .and_then(|matrix| matrix.get(a))
            .and_then(|row| row.get(b))
            .copied()
    }

    pub fn total_missing(&self) -> usize {
        self.missing_values.iter().map(|(_, count)| *count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_map_keeps_insertion_order() {
        let mut map = ColumnMap::new();
        map.insert("zeta", 1);
        map.insert("alpha", 2);

        let text = serde_json::to_string(&map).unwrap();
        assert_eq!(text, r#"{"zeta":1,"alpha":2}"#);
        assert_eq!(map.get("alpha"), Some(&2));
    }

    #[test]
    fn test_summary_serialization() {
        let numeric = ColumnSummary::Numeric(NumericSummary {
            count: 1,
            mean: 2.0,
            std: f64::NAN,
            min: 2.0,
            q25: 2.0,
            median: 2.0,
            q75: 2.0,
            max: 2.0,
        });
        let value = serde_json::to_value(&numeric).unwrap();
        assert_eq!(value["std"], serde_json::Value::Null);
        assert_eq!(value["25%"], json!(2.0));

        let categorical = ColumnSummary::Categorical(CategoricalSummary {
            count: 3,
            unique: 2,
            top: Some("a".to_string()),
            freq: Some(2),
        });
        assert_eq!(
            serde_json::to_value(&categorical).unwrap(),
            json!({"count": 3, "unique": 2, "top": "a", "freq": 2})
        );
    }

    #[test]
    fn test_absent_correlation_matrix_is_omitted() {
        let analysis = Analysis {
            shape: Shape(0, 0),
            columns: Vec::new(),
            missing_values: ColumnMap::new(),
            summary_statistics: ColumnMap::new(),
            correlation_matrix: None,
        };
        let value = serde_json::to_value(&analysis).unwrap();
        assert!(value.get("correlation_matrix").is_none());
        assert_eq!(value["shape"], json!([0, 0]));
    }
}

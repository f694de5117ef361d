/// Table profiler
///
/// Derives an `Analysis` from a `Table`. Profiling never fails for a valid
/// table: statistics that cannot be computed come out as NaN.

use log::{debug, info};

use crate::core::analysis::{
    Analysis, CategoricalSummary, ColumnMap, ColumnSummary, NumericSummary, Shape,
};
use crate::core::table::{ColumnData, Table};
use crate::utils::stats;

/// Profile every column of the table
///
/// # Arguments
///
/// * `table` - The loaded dataset
///
/// # Returns
///
/// The analysis snapshot
pub fn profile(table: &Table) -> Analysis {
    let (rows, cols) = table.shape();
    info!("Profiling {} rows x {} columns", rows, cols);

    let missing_values: ColumnMap<usize> = table.missing_counts().into_iter().collect();

    let summary_statistics: ColumnMap<ColumnSummary> = table
        .columns()
        .iter()
        .map(|column| (column.name.clone(), summarize(&column.data)))
        .collect();

    let correlation_matrix = correlation_matrix(table);
    if correlation_matrix.is_none() {
        debug!("No numeric columns, correlation matrix omitted");
    }

    Analysis {
        shape: Shape(rows, cols),
        columns: table.column_names(),
        missing_values,
        summary_statistics,
        correlation_matrix,
    }
}

/// Statistics for one column, chosen by its type
pub fn summarize(data: &ColumnData) -> ColumnSummary {
    match data {
        ColumnData::Numeric(values) => ColumnSummary::Numeric(summarize_numeric(values)),
        ColumnData::Text(values) => ColumnSummary::Categorical(summarize_text(values)),
    }
}

fn summarize_numeric(values: &[Option<f64>]) -> NumericSummary {
    let mut sorted = stats::present(values);
    sorted.sort_by(f64::total_cmp);

    NumericSummary {
        count: sorted.len(),
        mean: stats::mean(&sorted),
        std: stats::sample_std(&sorted),
        min: sorted.first().copied().unwrap_or(f64::NAN),
        q25: stats::quantile_sorted(&sorted, 0.25),
        median: stats::quantile_sorted(&sorted, 0.5),
        q75: stats::quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied().unwrap_or(f64::NAN),
    }
}

fn summarize_text(values: &[Option<String>]) -> CategoricalSummary {
    let mode = stats::mode_with_frequency(values);

    CategoricalSummary {
        count: values.iter().flatten().count(),
        unique: stats::unique_count(values),
        top: mode.as_ref().map(|(value, _)| value.clone()),
        freq: mode.map(|(_, freq)| freq),
    }
}

/// Pairwise Pearson matrix over the numeric columns
///
/// The diagonal is 1.0 for any column with at least one value, so a constant
/// column correlates perfectly with itself. Returns `None` when the table has
/// no numeric column.
pub fn correlation_matrix(table: &Table) -> Option<ColumnMap<ColumnMap<f64>>> {
    let numeric = table.numeric_columns();
    if numeric.is_empty() {
        return None;
    }

    let matrix = numeric
        .iter()
        .enumerate()
        .map(|(i, (name, xs))| {
            let row = numeric
                .iter()
                .enumerate()
                .map(|(j, (other, ys))| {
                    let coefficient = if i == j {
                        if xs.iter().any(Option::is_some) {
                            1.0
                        } else {
                            f64::NAN
                        }
                    } else {
                        stats::pearson(xs, ys)
                    };
                    (other.to_string(), coefficient)
                })
                .collect();
            (name.to_string(), row)
        })
        .collect();

    Some(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::Column;

    fn text(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[test]
    fn test_profile_mixed_table() {
        let table = Table::new(vec![
            Column::numeric("id", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            Column::text("name", text(&[Some("a"), Some("b"), Some("a"), None])),
            Column::numeric("score", vec![Some(10.0), Some(20.0), None, Some(40.0)]),
        ])
        .unwrap();

        let analysis = profile(&table);

        assert_eq!(analysis.shape, Shape(4, 3));
        assert_eq!(analysis.columns, vec!["id", "name", "score"]);
        assert_eq!(analysis.missing_values.get("score"), Some(&1));
        assert_eq!(analysis.missing_values.get("name"), Some(&1));
        assert_eq!(analysis.missing_values.get("id"), Some(&0));

        match analysis.summary_statistics.get("id") {
            Some(ColumnSummary::Numeric(s)) => {
                assert_eq!(s.count, 4);
                assert_eq!(s.mean, 2.5);
                assert_eq!(s.min, 1.0);
                assert_eq!(s.median, 2.5);
                assert_eq!(s.max, 4.0);
            }
            other => panic!("unexpected summary for id: {:?}", other),
        }

        match analysis.summary_statistics.get("name") {
            Some(ColumnSummary::Categorical(s)) => {
                assert_eq!(s.count, 3);
                assert_eq!(s.unique, 2);
                assert_eq!(s.top.as_deref(), Some("a"));
                assert_eq!(s.freq, Some(2));
            }
            other => panic!("unexpected summary for name: {:?}", other),
        }

        let matrix = analysis.correlation_matrix.as_ref().unwrap();
        assert_eq!(matrix.keys().collect::<Vec<_>>(), vec!["id", "score"]);
        assert!(analysis.correlation("id", "score").unwrap() > 0.99);
        assert_eq!(analysis.correlation("id", "id"), Some(1.0));
    }

    #[test]
    fn test_text_only_table_has_no_correlation() {
        let table = Table::new(vec![Column::text(
            "word",
            text(&[Some("x"), Some("y"), Some("x")]),
        )])
        .unwrap();

        let analysis = profile(&table);
        assert!(analysis.correlation_matrix.is_none());
        assert!(matches!(
            analysis.summary_statistics.get("word"),
            Some(ColumnSummary::Categorical(_))
        ));
    }

    #[test]
    fn test_constant_columns() {
        let table = Table::new(vec![
            Column::numeric("a", vec![Some(5.0), Some(5.0)]),
            Column::numeric("b", vec![Some(5.0), Some(5.0)]),
        ])
        .unwrap();

        let analysis = profile(&table);
        assert_eq!(analysis.correlation("a", "a"), Some(1.0));
        assert!(analysis.correlation("a", "b").unwrap().is_nan());
    }

    #[test]
    fn test_diagonal_is_decided_by_position() {
        // Same name, different data
        let table = Table::new(vec![
            Column::numeric("x", vec![Some(5.0), Some(1.0), Some(0.0)]),
            Column::numeric("x", vec![Some(3.0), Some(9.0), Some(1.0)]),
        ])
        .unwrap();

        let matrix = correlation_matrix(&table).unwrap();
        let rows: Vec<Vec<f64>> = matrix
            .iter()
            .map(|(_, row)| row.iter().map(|(_, value)| *value).collect())
            .collect();

        assert_eq!(rows[0][0], 1.0);
        assert_eq!(rows[1][1], 1.0);
        assert!(rows[0][1] < 1.0);
        assert_eq!(rows[0][1], rows[1][0]);
    }

    #[test]
    fn test_deduplicated_headers_keep_distinct_correlations() {
        let table =
            crate::core::loader::parse_delimited("a,a,a.1\n1,5,3\n2,1,9\n3,0,1\n").unwrap();

        let analysis = profile(&table);
        assert_eq!(analysis.columns, vec!["a", "a.1", "a.1.1"]);
        assert!(analysis.correlation("a.1", "a.1.1").unwrap() < 1.0);
        assert_eq!(analysis.correlation("a.1.1", "a.1.1"), Some(1.0));
    }

    #[test]
    fn test_zero_row_table() {
        let table = Table::new(vec![
            Column::text("a", Vec::new()),
            Column::text("b", Vec::new()),
        ])
        .unwrap();

        let analysis = profile(&table);
        assert_eq!(analysis.shape, Shape(0, 2));
        assert_eq!(analysis.total_missing(), 0);
        match analysis.summary_statistics.get("a") {
            Some(ColumnSummary::Categorical(s)) => {
                assert_eq!(s.count, 0);
                assert!(s.top.is_none());
            }
            other => panic!("unexpected summary: {:?}", other),
        }
    }

    #[test]
    fn test_all_missing_numeric_column() {
        let table = Table::new(vec![Column::numeric("gap", vec![None, None])]).unwrap();

        let analysis = profile(&table);
        assert!(analysis.correlation("gap", "gap").unwrap().is_nan());
        match analysis.summary_statistics.get("gap") {
            Some(ColumnSummary::Numeric(s)) => {
                assert_eq!(s.count, 0);
                assert!(s.mean.is_nan() && s.min.is_nan() && s.q75.is_nan());
            }
            other => panic!("unexpected summary: {:?}", other),
        }
    }
}

/// Diagnostic chart rendering
///
/// Charts are drawn with the [`plotters`] bitmap backend straight into the
/// report directory. Each chart is attempted on its own: a failure is logged
/// and the chart is left out, the remaining charts are still drawn.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::core::profiler;
use crate::core::table::Table;
use crate::error::ChartRenderError;

type Result<T> = std::result::Result<T, ChartRenderError>;

pub const MISSING_VALUES_FILE: &str = "missing_values.png";
pub const CORRELATION_HEATMAP_FILE: &str = "correlation_heatmap.png";

const FONT: &str = "sans-serif";

/// Kinds of chart the renderer knows about, in drawing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    MissingValues,
    CorrelationHeatmap,
}

impl ChartKind {
    pub const ALL: [ChartKind; 2] = [ChartKind::MissingValues, ChartKind::CorrelationHeatmap];

    pub fn file_name(self) -> &'static str {
        match self {
            ChartKind::MissingValues => MISSING_VALUES_FILE,
            ChartKind::CorrelationHeatmap => CORRELATION_HEATMAP_FILE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::MissingValues => "missing_values",
            ChartKind::CorrelationHeatmap => "correlation_heatmap",
        }
    }

    /// Whether the table has anything for this chart to show
    pub fn applies_to(self, table: &Table) -> bool {
        match self {
            ChartKind::MissingValues => table.missing_counts().iter().any(|(_, n)| *n > 0),
            ChartKind::CorrelationHeatmap => table.has_numeric_columns(),
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A rendered chart file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    pub kind: ChartKind,
    pub path: PathBuf,
}

impl ChartArtifact {
    /// File name used for both the image alt text and its relative link
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.kind.file_name().to_string())
    }
}

/// Charts whose precondition holds for this table
pub fn planned_charts(table: &Table) -> Vec<ChartKind> {
    ChartKind::ALL
        .into_iter()
        .filter(|kind| kind.applies_to(table))
        .collect()
}

/// Render every applicable chart into `output_dir`
///
/// # Arguments
///
/// * `table` - The loaded dataset
/// * `output_dir` - Directory the PNG files are written to (created if absent)
///
/// # Returns
///
/// The charts that were actually written
pub fn render_charts(table: &Table, output_dir: &Path) -> Vec<ChartArtifact> {
    if let Err(e) = fs::create_dir_all(output_dir) {
        error!(
            "Cannot create output directory {}: {}",
            output_dir.display(),
            e
        );
        return Vec::new();
    }

    let mut artifacts = Vec::new();

    for kind in ChartKind::ALL {
        if !kind.applies_to(table) {
            debug!("Skipping {} chart, nothing to plot", kind);
            continue;
        }

        let path = output_dir.join(kind.file_name());
        match render_chart(kind, table, &path) {
            Ok(()) => {
                info!("Visualization saved: {}", path.display());
                artifacts.push(ChartArtifact { kind, path });
            }
            Err(e) => {
                error!("Error generating {} chart: {}", kind, e);
                discard_partial(&path);
            }
        }
    }

    artifacts
}

/// Remove whatever a failed chart left behind
///
/// The bitmap backend flushes on drop, so a chart that failed half-way may
/// still have written a partial image.
fn discard_partial(path: &Path) {
    if !path.exists() {
        return;
    }

    match fs::remove_file(path) {
        Ok(()) => warn!("Removed partial chart {}", path.display()),
        Err(e) => warn!("Could not remove partial chart {}: {}", path.display(), e),
    }
}

fn render_chart(kind: ChartKind, table: &Table, path: &Path) -> Result<()> {
    match kind {
        ChartKind::MissingValues => draw_missing_values(table, path)?,
        ChartKind::CorrelationHeatmap => draw_correlation_heatmap(table, path)?,
    }

    if path.exists() {
        Ok(())
    } else {
        Err(ChartRenderError::Missing(path.to_path_buf()))
    }
}

/// Bar chart of missing cell counts for the columns that have any
fn draw_missing_values(table: &Table, path: &Path) -> Result<()> {
    let affected: Vec<(String, u32)> = table
        .missing_counts()
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, count)| (name, count as u32))
        .collect();

    let bars = affected.len() as u32;
    let max_count = affected.iter().map(|(_, count)| *count).max().unwrap_or(0);

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ChartRenderError::DrawingArea(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Missing Values by Column", (FONT, 30.0))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0u32..bars).into_segmented(),
            0u32..(max_count + max_count / 10 + 1),
        )
        .map_err(|e| ChartRenderError::ChartConfig(e.to_string()))?;

    let label_for = |value: &SegmentValue<u32>| match value {
        SegmentValue::CenterOf(index) => affected
            .get(*index as usize)
            .map(|(name, _)| name.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(affected.len() + 1)
        .x_label_formatter(&label_for)
        .y_desc("Count")
        .label_style((FONT, 16.0))
        .draw()
        .map_err(|e| ChartRenderError::Drawing(e.to_string()))?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.7).filled())
                .margin(10)
                .data(
                    affected
                        .iter()
                        .enumerate()
                        .map(|(index, (_, count))| (index as u32, *count)),
                ),
        )
        .map_err(|e| ChartRenderError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| ChartRenderError::Drawing(e.to_string()))?;

    Ok(())
}

/// Annotated heatmap of the numeric correlation matrix
///
/// Cell `(row, col)` is centred on integer coordinates so that axis labels line
/// up with cells. Rows run top to bottom in column order.
fn draw_correlation_heatmap(table: &Table, path: &Path) -> Result<()> {
    let matrix = profiler::correlation_matrix(table)
        .ok_or_else(|| ChartRenderError::ChartConfig("no numeric columns".to_string()))?;

    let names: Vec<String> = matrix.keys().map(str::to_string).collect();
    let n = names.len();
    let extent = n as f64 - 0.5;

    let root = BitMapBackend::new(path, (1000, 800)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ChartRenderError::DrawingArea(e.to_string()))?;

    let (plot_area, legend_area) = root.split_horizontally(880);

    let mut chart = ChartBuilder::on(&plot_area)
        .caption("Correlation Heatmap", (FONT, 30.0))
        .margin(20)
        .x_label_area_size(80)
        .y_label_area_size(140)
        .build_cartesian_2d(-0.5f64..extent, -0.5f64..extent)
        .map_err(|e| ChartRenderError::ChartConfig(e.to_string()))?;

    let x_label = |value: &f64| cell_label(&names, *value, false);
    let y_label = |value: &f64| cell_label(&names, *value, true);

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&x_label)
        .y_label_formatter(&y_label)
        .label_style((FONT, 16.0))
        .draw()
        .map_err(|e| ChartRenderError::Drawing(e.to_string()))?;

    let cells: Vec<(f64, f64, f64)> = matrix
        .iter()
        .enumerate()
        .flat_map(|(row, (_, values))| {
            values.iter().enumerate().map(move |(col, (_, value))| {
                (col as f64, (n - 1 - row) as f64, *value)
            })
        })
        .collect();

    chart
        .draw_series(cells.iter().map(|&(x, y, value)| {
            Rectangle::new(
                [(x - 0.5, y + 0.5), (x + 0.5, y - 0.5)],
                coolwarm(value).filled(),
            )
        }))
        .map_err(|e| ChartRenderError::Drawing(e.to_string()))?;

    let annotation_size = (240.0 / n.max(1) as f64).clamp(9.0, 24.0);
    let annotation = (FONT, annotation_size)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));

    chart
        .draw_series(cells.iter().map(|&(x, y, value)| {
            Text::new(format_coefficient(value), (x, y), annotation.clone())
        }))
        .map_err(|e| ChartRenderError::Drawing(e.to_string()))?;

    draw_color_scale(&legend_area)?;

    root.present()
        .map_err(|e| ChartRenderError::Drawing(e.to_string()))?;

    Ok(())
}

/// Vertical colour bar for the [-1, 1] scale
fn draw_color_scale(area: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>) -> Result<()> {
    const STEPS: usize = 100;

    let mut scale = ChartBuilder::on(area)
        .margin_top(70)
        .margin_bottom(100)
        .margin_right(10)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..1f64, -1f64..1f64)
        .map_err(|e| ChartRenderError::ChartConfig(e.to_string()))?;

    scale
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .disable_x_axis()
        .y_labels(5)
        .label_style((FONT, 14.0))
        .draw()
        .map_err(|e| ChartRenderError::Drawing(e.to_string()))?;

    let step = 2.0 / STEPS as f64;
    scale
        .draw_series((0..STEPS).map(|i| {
            let low = -1.0 + i as f64 * step;
            Rectangle::new(
                [(0.0, low), (1.0, low + step)],
                coolwarm(low + step / 2.0).filled(),
            )
        }))
        .map_err(|e| ChartRenderError::Drawing(e.to_string()))?;

    Ok(())
}

/// Axis label for a cell centre, empty between cells
fn cell_label(names: &[String], value: f64, reversed: bool) -> String {
    let rounded = value.round();
    if (value - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }

    let index = rounded as usize;
    let index = if reversed {
        match names.len().checked_sub(index + 1) {
            Some(i) => i,
            None => return String::new(),
        }
    } else {
        index
    };

    names.get(index).cloned().unwrap_or_default()
}

pub fn format_coefficient(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{:.2}", value)
    }
}

/// Diverging blue-grey-red colour for a coefficient in [-1, 1]
///
/// Undefined coefficients are drawn light grey.
pub fn coolwarm(value: f64) -> RGBColor {
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const NEUTRAL: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

    if !value.is_finite() {
        return RGBColor(235, 235, 235);
    }

    let t = value.clamp(-1.0, 1.0);
    let (from, to, weight) = if t < 0.0 {
        (COLD, NEUTRAL, t + 1.0)
    } else {
        (NEUTRAL, WARM, t)
    };
    let lerp = |a: f64, b: f64| (a + (b - a) * weight).round() as u8;

    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::Column;

    #[test]
    fn test_planned_charts_follow_preconditions() {
        let complete_text = Table::new(vec![Column::text(
            "word",
            vec![Some("a".to_string()), Some("b".to_string())],
        )])
        .unwrap();
        assert!(planned_charts(&complete_text).is_empty());

        let gappy_numbers = Table::new(vec![Column::numeric("x", vec![Some(1.0), None])]).unwrap();
        assert_eq!(
            planned_charts(&gappy_numbers),
            vec![ChartKind::MissingValues, ChartKind::CorrelationHeatmap]
        );
    }

    #[test]
    fn test_render_skips_everything_for_complete_text() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("bundle");
        let table = Table::new(vec![Column::text("word", vec![Some("a".to_string())])]).unwrap();

        let artifacts = render_charts(&table, &out);

        assert!(artifacts.is_empty());
        assert!(out.is_dir());
        assert!(!out.join(MISSING_VALUES_FILE).exists());
        assert!(!out.join(CORRELATION_HEATMAP_FILE).exists());
    }

    #[test]
    fn test_renders_both_charts() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0), None]),
            Column::numeric("b", vec![Some(2.0), Some(4.0), Some(5.0)]),
        ])
        .unwrap();

        let artifacts = render_charts(&table, dir.path());

        let kinds: Vec<ChartKind> = artifacts.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, planned_charts(&table));
        assert_eq!(kinds, ChartKind::ALL.to_vec());
        for artifact in &artifacts {
            assert_eq!(artifact.path, dir.path().join(artifact.kind.file_name()));
            assert!(fs::metadata(&artifact.path).unwrap().len() > 0);
        }
    }

    #[test]
    fn test_failed_chart_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let partial = dir.path().join(MISSING_VALUES_FILE);
        fs::write(&partial, b"half a png").unwrap();

        discard_partial(&partial);
        assert!(!partial.exists());

        // Nothing there is fine too
        discard_partial(&partial);
    }

    #[test]
    fn test_coolwarm_scale() {
        let rgb = |value: f64| {
            let RGBColor(r, g, b) = coolwarm(value);
            (r, g, b)
        };
        assert_eq!(rgb(-1.0), (59, 76, 192));
        assert_eq!(rgb(0.0), (221, 221, 221));
        assert_eq!(rgb(1.0), (180, 4, 38));
        assert_eq!(rgb(f64::NAN), (235, 235, 235));
    }

    #[test]
    fn test_cell_labels() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(cell_label(&names, 0.0, false), "a");
        assert_eq!(cell_label(&names, 0.0, true), "c");
        assert_eq!(cell_label(&names, 0.5, false), "");
        assert_eq!(cell_label(&names, -0.5, false), "");
        assert_eq!(cell_label(&names, 3.0, true), "");
        assert_eq!(format_coefficient(0.123), "0.12");
        assert_eq!(format_coefficient(f64::NAN), "nan");
    }
}

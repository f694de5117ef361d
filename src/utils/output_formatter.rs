/// Output formatter for analysis results
///
/// This module writes the report bundle: the Markdown narrative document, the
/// chart images next to it, and optionally the raw analysis as JSON. It also
/// formats the end-of-run summary shown on the console.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use handlebars::Handlebars;
use log::{error, info};
use serde_json::json;

use crate::app::RunSummary;
use crate::core::analysis::Analysis;
use crate::core::charts::ChartArtifact;
use crate::core::narrator::FALLBACK_NARRATIVE;
use crate::utils::file_utils::{dataset_base_name, move_into_dir, same_directory};

/// File name of the report document inside the bundle
pub const README_FILE: &str = "README.md";

const README_TEMPLATE: &str = "# Analysis of {{dataset_name}}\n\n\
## Narrative Summary\n\n\
{{narrative}}\n\n\
## Visualizations\n\n\
{{#each images}}![{{this}}]({{this}})\n\n{{/each}}";

/// Render the Markdown report
///
/// # Arguments
///
/// * `dataset_name` - Base name of the input file, used in the title
/// * `narrative` - Narrative text, inserted verbatim
/// * `artifacts` - Charts to embed, in order
///
/// # Returns
///
/// The Markdown document
pub fn render_readme(
    dataset_name: &str,
    narrative: &str,
    artifacts: &[ChartArtifact],
) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
        .register_template_string("readme", README_TEMPLATE)
        .context("Failed to register README template")?;

    let images: Vec<String> = artifacts.iter().map(ChartArtifact::file_name).collect();
    let data = json!({
        "dataset_name": dataset_name,
        "narrative": narrative,
        "images": images,
    });

    handlebars
        .render("readme", &data)
        .context("Failed to render README template")
}

/// Write `README.md` and make sure every chart sits next to it
///
/// # Arguments
///
/// * `dataset_path` - Input file; its base name becomes the title
/// * `output_dir` - Bundle directory (created if absent)
/// * `narrative` - Narrative text
/// * `artifacts` - Rendered charts, possibly outside `output_dir`
///
/// # Returns
///
/// Path of the written document
pub fn assemble_report(
    dataset_path: &Path,
    output_dir: &Path,
    narrative: &str,
    artifacts: &[ChartArtifact],
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let markdown = render_readme(&dataset_base_name(dataset_path), narrative, artifacts)?;

    let readme_path = output_dir.join(README_FILE);
    let mut file = File::create(&readme_path)
        .with_context(|| format!("Failed to create report file: {}", readme_path.display()))?;
    file.write_all(markdown.as_bytes())
        .context("Failed to write report")?;

    relocate_artifacts(artifacts, output_dir);

    info!("Report written to {}", readme_path.display());
    Ok(readme_path)
}

/// Move charts rendered elsewhere into the bundle directory
///
/// A chart whose file has disappeared is logged and skipped; the document
/// still references it.
fn relocate_artifacts(artifacts: &[ChartArtifact], output_dir: &Path) {
    for artifact in artifacts {
        let in_place = artifact
            .path
            .parent()
            .map(|parent| same_directory(parent, output_dir))
            .unwrap_or(false);

        if in_place && artifact.path.exists() {
            continue;
        }

        if !artifact.path.exists() {
            error!(
                "Source file not found: {}. Skipping move.",
                artifact.path.display()
            );
            continue;
        }

        if let Err(e) = move_into_dir(&artifact.path, output_dir) {
            error!("Could not move {}: {:#}", artifact.path.display(), e);
        }
    }
}

/// Export the analysis to a JSON file
///
/// # Arguments
///
/// * `analysis` - Profile of the dataset
/// * `output_path` - Path where the JSON file will be written
pub fn export_analysis_json(analysis: &Analysis, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output file: {}", output_path.display()))?;

    serde_json::to_writer_pretty(file, analysis)
        .context("Failed to write JSON data")?;

    info!("Analysis exported to {}", output_path.display());
    Ok(())
}

/// Console summary printed at the end of a run
pub fn format_summary(summary: &RunSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("\n{}\n", "Analysis Complete".bold()));
    output.push_str(&format!("{} {}\n", "Dataset:".green(), summary.dataset.display()));
    output.push_str(&format!("{} {}\n", "Encoding:".green(), summary.encoding));
    output.push_str(&format!(
        "{} {} rows x {} columns\n",
        "Shape:".green(),
        summary.analysis.shape.rows(),
        summary.analysis.shape.columns()
    ));
    output.push_str(&format!(
        "{} {}\n",
        "Missing values:".green(),
        summary.analysis.total_missing()
    ));

    let charts = if summary.artifacts.is_empty() {
        "none".to_string()
    } else {
        summary
            .artifacts
            .iter()
            .map(ChartArtifact::file_name)
            .collect::<Vec<_>>()
            .join(", ")
    };
    output.push_str(&format!("{} {}\n", "Charts:".green(), charts));

    let narrative = if summary.narrative == FALLBACK_NARRATIVE {
        "unavailable (fallback used)".yellow().to_string()
    } else {
        "generated".to_string()
    };
    output.push_str(&format!("{} {}\n", "Narrative:".green(), narrative));

    output.push_str(&format!(
        "{} {}\n",
        "Report:".cyan().bold(),
        summary.readme_path.display()
    ));
    output.push_str(&format!(
        "{} {:.2} seconds\n",
        "Time elapsed:".green(),
        summary.elapsed.as_secs_f64()
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::charts::{ChartKind, MISSING_VALUES_FILE};

    fn artifact(dir: &Path, kind: ChartKind) -> ChartArtifact {
        ChartArtifact {
            kind,
            path: dir.join(kind.file_name()),
        }
    }

    #[test]
    fn test_readme_layout() {
        let dir = Path::new("bundle");
        let markdown = render_readme(
            "scores.csv",
            "Scores rise with <id> & \"rank\".",
            &[
                artifact(dir, ChartKind::MissingValues),
                artifact(dir, ChartKind::CorrelationHeatmap),
            ],
        )
        .unwrap();

        assert_eq!(
            markdown,
            "# Analysis of scores.csv\n\n\
             ## Narrative Summary\n\n\
             Scores rise with <id> & \"rank\".\n\n\
             ## Visualizations\n\n\
             ![missing_values.png](missing_values.png)\n\n\
             ![correlation_heatmap.png](correlation_heatmap.png)\n\n"
        );
    }

    #[test]
    fn test_readme_without_charts() {
        let markdown = render_readme("words.csv", "text", &[]).unwrap();
        assert!(markdown.ends_with("## Visualizations\n\n"));
        assert!(!markdown.contains("!["));
    }

    #[test]
    fn test_assemble_relocates_foreign_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");
        let bundle = dir.path().join("bundle");
        fs::create_dir_all(&staging).unwrap();

        let moved = artifact(&staging, ChartKind::MissingValues);
        fs::write(&moved.path, b"png").unwrap();
        let vanished = artifact(&staging, ChartKind::CorrelationHeatmap);

        let readme = assemble_report(
            Path::new("data/scores.csv"),
            &bundle,
            "narrative",
            &[moved.clone(), vanished],
        )
        .unwrap();

        assert_eq!(readme, bundle.join(README_FILE));
        assert!(bundle.join(MISSING_VALUES_FILE).exists());
        assert!(!moved.path.exists());
        // The vanished chart is still referenced
        let markdown = fs::read_to_string(readme).unwrap();
        assert!(markdown.contains("![correlation_heatmap.png](correlation_heatmap.png)"));
        assert!(!bundle.join("correlation_heatmap.png").exists());
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("bundle");
        fs::create_dir_all(&bundle).unwrap();
        let chart = artifact(&bundle, ChartKind::CorrelationHeatmap);
        fs::write(&chart.path, b"png").unwrap();

        let first = assemble_report(Path::new("a.csv"), &bundle, "n", &[chart.clone()]).unwrap();
        let first_text = fs::read_to_string(&first).unwrap();
        let second = assemble_report(Path::new("a.csv"), &bundle, "n", &[chart.clone()]).unwrap();

        assert_eq!(first_text, fs::read_to_string(second).unwrap());
        assert!(chart.path.exists());
    }

    #[test]
    fn test_export_analysis_json() {
        use crate::core::analysis::{ColumnMap, Shape};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        let analysis = Analysis {
            shape: Shape(2, 0),
            columns: Vec::new(),
            missing_values: ColumnMap::new(),
            summary_statistics: ColumnMap::new(),
            correlation_matrix: None,
        };

        export_analysis_json(&analysis, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["shape"], json!([2, 0]));
        assert!(value.get("correlation_matrix").is_none());
    }
}

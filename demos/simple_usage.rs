/// Simple example demonstrating how to use the autolysis library
///
/// Profiles a small dataset, then runs the full pipeline with a canned
/// narrative so no API token or network access is needed.

use anyhow::Result;
use autolysis::app::{run_pipeline, RunOptions};
use autolysis::error::NarrativeServiceError;
use autolysis::{analyze_file, NarrativeService};

struct CannedNarrative;

impl NarrativeService for CannedNarrative {
    fn complete(&self, _prompt: &str) -> Result<String, NarrativeServiceError> {
        Ok("Scores increase steadily with the id; one score is missing.".to_string())
    }
}

fn main() -> Result<()> {
    let dir = std::env::temp_dir().join("autolysis_demo");
    std::fs::create_dir_all(&dir)?;

    // Create sample file
    let file_path = dir.join("scores.csv");
    std::fs::write(&file_path, "id,name,score\n1,a,10\n2,b,20\n3,c,\n4,d,41\n")?;

    println!("Analyzing file: {}", file_path.display());

    let analysis = analyze_file(&file_path)?;
    println!("Shape: {}", analysis.shape);
    for (column, missing) in analysis.missing_values.iter() {
        println!("  {}: {} missing", column, missing);
    }
    if let Some(r) = analysis.correlation("id", "score") {
        println!("Correlation id/score: {:.3}", r);
    }

    let mut options = RunOptions::new(&file_path);
    options.output_dir = Some(dir.join("scores"));
    let summary = run_pipeline(&options, &CannedNarrative)?;

    println!("\nReport written to {}", summary.readme_path.display());
    for artifact in &summary.artifacts {
        println!("  - {}", artifact.file_name());
    }

    Ok(())
}

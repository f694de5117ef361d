/// Autolysis - automated exploratory analysis of delimited datasets
///
/// This library loads a delimited text file with encoding fallback, profiles
/// its columns, renders diagnostic charts, asks a text-generation service for
/// a narrative, and writes everything to a Markdown report bundle.

pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use crate::core::analysis::Analysis;
pub use crate::core::loader::load_table;
pub use crate::core::narrator::{
    ChatCompletionsClient, NarrativeService, UnavailableService, FALLBACK_NARRATIVE,
};
pub use crate::core::profiler::profile;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load and profile a dataset without rendering or narrating
///
/// This is a convenience function for simple use cases.
///
/// # Arguments
///
/// * `file_path` - Path to the dataset
///
/// # Returns
///
/// The analysis of the dataset
pub fn analyze_file<P: AsRef<std::path::Path>>(file_path: P) -> anyhow::Result<Analysis> {
    let (table, _) = load_table(file_path.as_ref())?;
    Ok(profile(&table))
}

/// Pipeline orchestration
pub mod app {
    use std::path::{Path, PathBuf};
    use std::time::{Duration, Instant};

    use anyhow::Result;
    use log::info;

    use crate::core::analysis::Analysis;
    use crate::core::charts::{render_charts, ChartArtifact};
    use crate::core::loader::{load_table, TextEncoding};
    use crate::core::narrator::{NarrativeService, Narrator};
    use crate::core::profiler::profile;
    use crate::utils::file_utils::bundle_dir_for;
    use crate::utils::output_formatter::{assemble_report, export_analysis_json};

    /// What to analyze and where to put the results
    #[derive(Debug, Clone)]
    pub struct RunOptions {
        /// Dataset to analyze
        pub dataset: PathBuf,
        /// Bundle directory; defaults to the dataset stem in the working directory
        pub output_dir: Option<PathBuf>,
        /// Where to write the analysis as JSON, if anywhere
        pub json_export: Option<PathBuf>,
        /// Show a spinner while waiting for the narrative
        pub show_progress: bool,
    }

    impl RunOptions {
        pub fn new(dataset: impl Into<PathBuf>) -> Self {
            Self {
                dataset: dataset.into(),
                output_dir: None,
                json_export: None,
                show_progress: false,
            }
        }

        /// Bundle directory for this run
        pub fn bundle_dir(&self) -> PathBuf {
            self.output_dir
                .clone()
                .unwrap_or_else(|| bundle_dir_for(&self.dataset, Path::new(".")))
        }
    }

    /// Outcome of a successful run
    #[derive(Debug, Clone)]
    pub struct RunSummary {
        pub dataset: PathBuf,
        pub output_dir: PathBuf,
        pub readme_path: PathBuf,
        pub encoding: TextEncoding,
        pub analysis: Analysis,
        pub artifacts: Vec<ChartArtifact>,
        pub narrative: String,
        pub elapsed: Duration,
    }

    /// Run load, profile, charts, narrative and report, in that order
    ///
    /// # Arguments
    ///
    /// * `options` - Dataset and output locations
    /// * `service` - Text-generation service used for the narrative
    ///
    /// # Returns
    ///
    /// A summary of the run. Only loading and report writing can fail; chart
    /// and narrative failures degrade the report instead.
    pub fn run_pipeline(options: &RunOptions, service: &dyn NarrativeService) -> Result<RunSummary> {
        let start_time = Instant::now();
        info!("Starting analysis...");

        let (table, encoding) = load_table(&options.dataset)?;
        let analysis = profile(&table);

        let output_dir = options.bundle_dir();
        let artifacts = render_charts(&table, &output_dir);

        let narrative = Narrator::new(service)
            .with_progress(options.show_progress)
            .narrate(&analysis);

        let readme_path = assemble_report(&options.dataset, &output_dir, &narrative, &artifacts)?;

        if let Some(json_path) = &options.json_export {
            export_analysis_json(&analysis, json_path)?;
        }

        info!("Analysis complete. Results saved in {}", output_dir.display());

        Ok(RunSummary {
            dataset: options.dataset.clone(),
            output_dir,
            readme_path,
            encoding,
            analysis,
            artifacts,
            narrative,
            elapsed: start_time.elapsed(),
        })
    }
}

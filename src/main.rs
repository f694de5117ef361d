/// Autolysis - automated exploratory analysis of delimited datasets
///
/// The main entry point parses the command line, installs the logger, reads
/// the configuration, and runs the analysis pipeline on one dataset.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use colored::Colorize;
use log::{error, LevelFilter};

use autolysis::app::{run_pipeline, RunOptions};
use autolysis::config::Config;
use autolysis::core::narrator;
use autolysis::utils::output_formatter;

/// Command line argument structure
#[derive(Parser, Debug)]
#[command(
    name = "autolysis",
    version,
    about = "Automated exploratory analysis of a CSV dataset",
    long_about = "Loads a delimited text file, profiles every column, renders diagnostic charts
and asks a language model for a narrative. Results are written to a directory
named after the dataset:
- README.md (the report)
- missing_values.png (when any value is missing)
- correlation_heatmap.png (when any column is numeric)

The AIPROXY_TOKEN environment variable must hold the API token."
)]
struct Args {
    /// Path to the dataset to analyze
    #[arg(name = "dataset")]
    dataset: PathBuf,

    /// Directory for the report bundle (default: dataset name in the working directory)
    #[arg(long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// JSON file overriding the narrative endpoint, model or timeout
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Also export the analysis to this JSON file
    #[arg(long = "json")]
    json: Option<PathBuf>,

    /// Set logging level (default: INFO)
    #[arg(long = "log-level", default_value = "info")]
    log_level: LevelFilter,

    /// Write logs to this file instead of standard error
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Suppress the spinner and the final summary
    #[arg(long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,
}

/// Main entry point function
fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    setup_logging(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Unexpected error: {:#}", e);
            error!("{:?}", e);
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

/// Read configuration, check the dataset, and run the pipeline
fn run(args: &Args) -> Result<()> {
    // The token is checked before touching the dataset
    let config = Config::load(args.config.as_deref())?;

    if !args.dataset.is_file() {
        bail!("File not found: {}", args.dataset.display());
    }

    let service = narrator::connect(&config.narrator, &config.api_token);

    let options = RunOptions {
        dataset: args.dataset.clone(),
        output_dir: args.output_dir.clone(),
        json_export: args.json.clone(),
        show_progress: !args.quiet,
    };

    let summary = run_pipeline(&options, service.as_ref())?;

    if !args.quiet {
        println!("{}", output_formatter::format_summary(&summary));
    }

    Ok(())
}

/// Set up logging to standard error or to a log file
fn setup_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();

    builder.filter_level(args.log_level);

    builder.format(|buf, record| {
        use chrono::Local;
        use std::io::Write;
        writeln!(
            buf,
            "{} - {} - {} - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if let Some(log_file) = &args.log_file {
        match File::create(log_file) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!(
                "{} cannot open log file {}: {}",
                "Warning:".yellow(),
                log_file.display(),
                e
            ),
        }
    }

    builder.init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_positional_argument() {
        let args = Args::try_parse_from(["autolysis", "data.csv"]).unwrap();
        assert_eq!(args.dataset, PathBuf::from("data.csv"));
        assert_eq!(args.log_level, LevelFilter::Info);
        assert!(!args.quiet);

        assert!(Args::try_parse_from(["autolysis"]).is_err());
        assert!(Args::try_parse_from(["autolysis", "a.csv", "b.csv"]).is_err());
    }

    #[test]
    fn test_optional_flags() {
        let args = Args::try_parse_from([
            "autolysis",
            "data.csv",
            "--output-dir",
            "out",
            "--json",
            "analysis.json",
            "--log-level",
            "debug",
            "--quiet",
        ])
        .unwrap();

        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        assert_eq!(args.json, Some(PathBuf::from("analysis.json")));
        assert_eq!(args.log_level, LevelFilter::Debug);
        assert!(args.quiet);
    }
}

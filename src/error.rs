/// Error types for the analysis pipeline
///
/// Only configuration and data format errors abort a run. Chart and narrative
/// errors are recovered where they happen and only ever reach the log.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Process-wide configuration could not be established
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not set")]
    MissingToken { var: &'static str },

    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// No supported encoding produced a structurally valid table
#[derive(Debug, Error)]
#[error("could not read {} as delimited text: {reason}", path.display())]
pub struct DataFormatError {
    pub path: PathBuf,
    pub reason: String,
}

/// Failure while drawing a single chart
#[derive(Debug, Error)]
pub enum ChartRenderError {
    #[error("failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("chart file was not written: {}", .0.display())]
    Missing(PathBuf),
}

/// Failure of the external text-generation call
#[derive(Debug, Error)]
pub enum NarrativeServiceError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for NarrativeServiceError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            NarrativeServiceError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() {
            NarrativeServiceError::MalformedResponse(err.to_string())
        } else {
            NarrativeServiceError::Transport(err.to_string())
        }
    }
}

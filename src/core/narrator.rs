/// Narrative generation through an external text-generation service
///
/// The service is a trait so the pipeline can run against a stub. `Narrator`
/// never fails: any service error is logged and replaced by a fixed fallback.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::config::NarratorSettings;
use crate::core::analysis::Analysis;
use crate::error::NarrativeServiceError;

/// Text returned when the narrative service cannot be used
pub const FALLBACK_NARRATIVE: &str =
    "Error: Unable to generate narrative. Please review the dataset manually.";

/// Something that turns a prompt into generated text
pub trait NarrativeService {
    fn complete(&self, prompt: &str) -> Result<String, NarrativeServiceError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

/// Blocking client for an OpenAI-style chat-completions endpoint
pub struct ChatCompletionsClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_token: String,
    timeout: Duration,
}

impl ChatCompletionsClient {
    /// Create a client for the configured endpoint
    ///
    /// # Arguments
    ///
    /// * `settings` - Endpoint, model and timeout
    /// * `api_token` - Bearer token sent with every request
    pub fn new(
        settings: &NarratorSettings,
        api_token: impl Into<String>,
    ) -> Result<Self, NarrativeServiceError> {
        let timeout = settings.timeout();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NarrativeServiceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_token: api_token.into(),
            timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> NarrativeServiceError {
        if err.is_timeout() {
            NarrativeServiceError::Timeout(self.timeout)
        } else {
            err.into()
        }
    }
}

impl NarrativeService for ChatCompletionsClient {
    fn complete(&self, prompt: &str) -> Result<String, NarrativeServiceError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        info!("Requesting narrative from {} ({})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NarrativeServiceError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let payload: Value = response.json().map_err(|e| self.classify(e))?;
        extract_content(&payload)
    }
}

/// Stand-in for a client that could not be set up; every request fails
pub struct UnavailableService {
    reason: String,
}

impl UnavailableService {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl NarrativeService for UnavailableService {
    fn complete(&self, _prompt: &str) -> Result<String, NarrativeServiceError> {
        Err(NarrativeServiceError::Transport(self.reason.clone()))
    }
}

/// Build the chat-completions client, or a stand-in that always fails
///
/// A client that cannot be built is a narrative failure like any other: the
/// run goes on and the report gets the fallback text.
pub fn connect(settings: &NarratorSettings, api_token: &str) -> Box<dyn NarrativeService> {
    match ChatCompletionsClient::new(settings, api_token) {
        Ok(client) => Box::new(client),
        Err(e) => {
            error!("Could not set up the narrative client: {}", e);
            Box::new(UnavailableService::new(e.to_string()))
        }
    }
}

/// Pull the generated text out of a chat-completions response body
pub fn extract_content(payload: &Value) -> Result<String, NarrativeServiceError> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            NarrativeServiceError::MalformedResponse(
                "missing choices[0].message.content".to_string(),
            )
        })
}

/// Serialize part of the analysis for the prompt
fn pretty<T: Serialize>(section: &str, value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        warn!("Could not serialize {} for the prompt: {}", section, e);
        "{}".to_string()
    })
}

/// Build the single user prompt describing the analysis
pub fn build_prompt(analysis: &Analysis) -> String {
    let correlation = match &analysis.correlation_matrix {
        Some(matrix) => pretty("correlation matrix", matrix),
        None => "{}".to_string(),
    };

    format!(
        "Write a narrative for the dataset analysis:\n\n\
         Shape: {}\n\
         Columns: {}\n\
         Missing Values: {}\n\
         Summary Statistics: {}\n\
         Correlation Matrix: {}\n\n\
         Provide key insights and recommendations in Markdown format.\n",
        analysis.shape,
        analysis.columns.join(", "),
        pretty("missing values", &analysis.missing_values),
        pretty("summary statistics", &analysis.summary_statistics),
        correlation,
    )
}

/// Turns an analysis into narrative text
pub struct Narrator<'a> {
    service: &'a dyn NarrativeService,
    show_progress: bool,
}

impl<'a> Narrator<'a> {
    pub fn new(service: &'a dyn NarrativeService) -> Self {
        Self {
            service,
            show_progress: false,
        }
    }

    /// Show a terminal spinner while the request is in flight
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Generate the narrative, falling back to a fixed message on failure
    ///
    /// Exactly one request is made. There is no retry.
    pub fn narrate(&self, analysis: &Analysis) -> String {
        let prompt = build_prompt(analysis);

        let spinner = self.show_progress.then(|| {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                pb.set_style(style);
            }
            pb.set_message("Generating narrative...");
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });

        let result = self.service.complete(&prompt);

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        match result {
            Ok(text) => {
                info!("Narrative generated ({} characters)", text.len());
                text
            }
            Err(e) => {
                error!("LLM call failed: {}", e);
                FALLBACK_NARRATIVE.to_string()
            }
        }
    }
}

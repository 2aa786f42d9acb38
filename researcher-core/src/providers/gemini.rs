//! Google Gemini deep research provider.
//!
//! Drives the Interactions API over REST: a background interaction is
//! created for the research agent, the prompt is sent to it as a message,
//! and the interaction is polled by name until it finishes. The final text
//! is every text part of the interaction's messages joined with blank
//! lines.
//!
//! Auth is via `?key=API_KEY` query parameter, as elsewhere in the Gemini
//! API family.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::{CanonicalStatus, DeepResearchJob, PollOutcome};
use crate::error::ProviderError;

/// Environment variable holding the Gemini API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// The default Google Gemini API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Deep research job on Gemini's background Interactions API.
#[derive(Debug)]
pub struct GeminiDeepResearch {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiDeepResearch {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Endpoint URL with the API key appended as a query parameter.
    fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}?key={}", self.base_url, path, self.api_key)
    }

    /// Request body for creating a background research interaction.
    fn create_body(model: &str) -> Value {
        json!({
            "agent": model,
            "config": {"background": true},
        })
    }

    /// Read one interaction body into a poll outcome.
    ///
    /// A freshly created interaction may not carry a status field yet;
    /// that reads as "unknown" and keeps the job polling.
    fn parse_poll(body: &Value) -> PollOutcome {
        let raw = body
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown");

        let mut outcome = PollOutcome::new(canonical_status(raw), raw);
        if let Some(detail) = extract_error_detail(body) {
            outcome = outcome.with_detail(detail);
        }
        outcome
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let url = self.endpoint_url(path);
        debug!(path = %path, "Sending Gemini request");

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::ApiRequest {
                message: format!("Request failed: {}", e),
            })?;

        Self::read_json(response).await
    }

    async fn get_json(&self, path: &str) -> Result<Value, ProviderError> {
        let url = self.endpoint_url(path);
        debug!(path = %path, "Sending Gemini request");

        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|e| ProviderError::ApiRequest {
                    message: format!("Request failed: {}", e),
                })?;

        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, ProviderError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::ApiRequest {
                message: format!("Failed to read response body: {}", e),
            })?;

        if !status.is_success() {
            return Err(map_http_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::ResponseParse {
            message: format!("Invalid JSON: {}", e),
        })
    }
}

#[async_trait]
impl DeepResearchJob for GeminiDeepResearch {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn display_name(&self) -> &str {
        "Gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn job_noun(&self) -> &'static str {
        "Interaction"
    }

    async fn submit(&self, prompt: &str) -> Result<String, ProviderError> {
        let created = self
            .post_json("interactions", &Self::create_body(&self.model))
            .await?;

        let name = created
            .get("name")
            .and_then(|n| n.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ProviderError::ResponseParse {
                message: "No name in created interaction".to_string(),
            })?;

        self.post_json(
            &format!("{}:sendMessage", name),
            &json!({"message": prompt}),
        )
        .await?;

        Ok(name)
    }

    async fn poll(&self, handle: &str) -> Result<PollOutcome, ProviderError> {
        let body = self.get_json(handle).await?;
        Ok(Self::parse_poll(&body))
    }

    async fn fetch(&self, handle: &str) -> Result<String, ProviderError> {
        let body = self.get_json(&format!("{}/messages", handle)).await?;
        Ok(extract_messages_text(&body))
    }
}

/// Map a raw interaction status onto the canonical lifecycle.
///
/// The Interactions API has reported statuses in both SCREAMING_CASE and
/// lowercase; both spellings are accepted. Anything else maps to `Unknown`
/// and keeps the job polling.
fn canonical_status(raw: &str) -> CanonicalStatus {
    match raw {
        "COMPLETED" | "completed" | "DONE" | "done" => CanonicalStatus::Completed,
        "FAILED" | "failed" | "ERROR" | "error" => CanonicalStatus::Failed,
        "RUNNING" | "running" | "IN_PROGRESS" | "in_progress" => CanonicalStatus::Running,
        "QUEUED" | "queued" | "PENDING" | "pending" => CanonicalStatus::Queued,
        _ => CanonicalStatus::Unknown,
    }
}

/// Join every text part from the interaction's messages with blank lines.
///
/// Non-text parts (thoughts, function calls) are skipped.
fn extract_messages_text(body: &Value) -> String {
    let mut texts = Vec::new();
    if let Some(messages) = body.get("messages").and_then(|m| m.as_array()) {
        for message in messages {
            if let Some(parts) = message.get("content").and_then(|c| c.as_array()) {
                for part in parts {
                    if let Some(text) = part.get("text").and_then(|t| t.as_str())
                        && !text.is_empty()
                    {
                        texts.push(text.to_string());
                    }
                }
            }
        }
    }
    texts.join("\n\n")
}

/// Provider-reported failure detail from an interaction body, if any.
fn extract_error_detail(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    if error.is_null() {
        return None;
    }
    if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
        return Some(message.to_string());
    }
    Some(error.to_string())
}

/// Map an HTTP status code to the appropriate ProviderError.
fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthFailed {
            provider: "Gemini".to_string(),
        },
        429 => ProviderError::RateLimited {
            retry_after_secs: 30,
        },
        _ => ProviderError::ApiRequest {
            message: format!("HTTP {} from Gemini API: {}", status, body_text),
        },
    }
}

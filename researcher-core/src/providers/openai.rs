//! OpenAI deep research provider.
//!
//! Talks to the Responses API over REST. Deep research jobs are submitted
//! with `background: true` and a web search tool, then polled by id. The
//! same endpoint serves one-shot completions (query generation, synthesis)
//! through [`OpenAiClient::respond`].

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::{CanonicalStatus, DeepResearchJob, PollOutcome};
use crate::error::ProviderError;

/// Environment variable holding the OpenAI API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Default Responses API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Thin REST client for the OpenAI Responses API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// One-shot completion through the Responses API.
    ///
    /// Returns the concatenated output text, which may be empty; callers
    /// decide whether empty output is acceptable.
    pub async fn respond(
        &self,
        model: &str,
        instructions: Option<&str>,
        input: &str,
    ) -> Result<String, ProviderError> {
        let mut body = json!({
            "model": model,
            "input": input,
        });
        if let Some(instructions) = instructions {
            body["instructions"] = json!(instructions);
        }

        let response = self.post_json("/responses", &body).await?;
        Ok(extract_output_text(&response))
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Sending OpenAI request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::ApiRequest {
                message: format!("Request failed: {}", e),
            })?;

        Self::read_json(response).await
    }

    async fn get_json(&self, path: &str) -> Result<Value, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Sending OpenAI request");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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

/// Deep research job on OpenAI's background Responses API.
#[derive(Debug)]
pub struct OpenAiDeepResearch {
    client: OpenAiClient,
    model: String,
}

impl OpenAiDeepResearch {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: OpenAiClient::new(api_key),
            model: model.into(),
        }
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: OpenAiClient::with_base_url(api_key, base_url),
            model: model.into(),
        }
    }

    /// Request body for a background research submission.
    fn submit_body(model: &str, prompt: &str) -> Value {
        json!({
            "model": model,
            "input": prompt,
            "tools": [{"type": "web_search_preview"}],
            "background": true,
        })
    }

    /// Read one retrieved response body into a poll outcome.
    fn parse_poll(body: &Value) -> Result<PollOutcome, ProviderError> {
        let raw = body
            .get("status")
            .and_then(|s| s.as_str())
            .ok_or_else(|| ProviderError::ResponseParse {
                message: "No status in response".to_string(),
            })?;

        let mut outcome = PollOutcome::new(canonical_status(raw), raw);
        if let Some(detail) = extract_error_detail(body) {
            outcome = outcome.with_detail(detail);
        }
        Ok(outcome)
    }
}

#[async_trait]
impl DeepResearchJob for OpenAiDeepResearch {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn display_name(&self) -> &str {
        "OpenAI"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn job_noun(&self) -> &'static str {
        "Response"
    }

    async fn submit(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = Self::submit_body(&self.model, prompt);
        let response = self.client.post_json("/responses", &body).await?;

        response
            .get("id")
            .and_then(|i| i.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ProviderError::ResponseParse {
                message: "No id in response".to_string(),
            })
    }

    async fn poll(&self, handle: &str) -> Result<PollOutcome, ProviderError> {
        let body = self.client.get_json(&format!("/responses/{}", handle)).await?;
        Self::parse_poll(&body)
    }

    async fn fetch(&self, handle: &str) -> Result<String, ProviderError> {
        let body = self.client.get_json(&format!("/responses/{}", handle)).await?;
        Ok(extract_output_text(&body))
    }
}

/// Map a raw Responses API status onto the canonical lifecycle.
///
/// Statuses this crate has never seen map to `Unknown` and keep the job
/// polling rather than failing it.
fn canonical_status(raw: &str) -> CanonicalStatus {
    match raw {
        "queued" => CanonicalStatus::Queued,
        "in_progress" => CanonicalStatus::Running,
        "completed" => CanonicalStatus::Completed,
        "failed" | "cancelled" | "incomplete" | "expired" => CanonicalStatus::Failed,
        _ => CanonicalStatus::Unknown,
    }
}

/// Concatenate every `output_text` block from a Responses API body.
///
/// Non-message output items (web search calls, reasoning) are skipped.
fn extract_output_text(body: &Value) -> String {
    let mut content = String::new();
    if let Some(output) = body.get("output").and_then(|o| o.as_array()) {
        for item in output {
            if item.get("type").and_then(|t| t.as_str()) != Some("message") {
                continue;
            }
            if let Some(blocks) = item.get("content").and_then(|c| c.as_array()) {
                for block in blocks {
                    if block.get("type").and_then(|t| t.as_str()) == Some("output_text")
                        && let Some(text) = block.get("text").and_then(|t| t.as_str())
                    {
                        content.push_str(text);
                    }
                }
            }
        }
    }
    content
}

/// Provider-reported failure detail from a response body, if any.
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

/// Map an HTTP error status to the appropriate ProviderError.
fn map_http_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        401 | 403 => {
            debug!(body = %body, "Authentication failed");
            ProviderError::AuthFailed {
                provider: "OpenAI".to_string(),
            }
        }
        429 => {
            // Try to parse "try again in Xs" from the error message
            let retry_secs = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| {
                    v.get("error")?
                        .get("message")?
                        .as_str()
                        .map(|s| s.to_string())
                })
                .and_then(|msg| {
                    msg.split("in ")
                        .last()
                        .and_then(|s| s.trim_end_matches('s').parse::<u64>().ok())
                })
                .unwrap_or(30);
            ProviderError::RateLimited {
                retry_after_secs: retry_secs,
            }
        }
        code if code >= 500 => ProviderError::ApiRequest {
            message: format!("Server error ({}): {}", code, body),
        },
        code => ProviderError::ApiRequest {
            message: format!("HTTP {}: {}", code, body),
        },
    }
}

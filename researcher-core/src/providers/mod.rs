//! Deep research provider clients.
//!
//! Every backend speaks the same three-phase protocol: `submit` starts a
//! background research job and returns an opaque handle, `poll` reads its
//! current status, `fetch` retrieves the finished text. The
//! [`submit_and_await`] driver runs that protocol to completion and folds
//! every outcome, including transport errors, timeouts and cancellation,
//! into a [`ResearchResult`]; it never returns an error.
//!
//! The provider set is closed: [`ResearchProvider`] enumerates every
//! supported backend and [`resolve_provider`] is the only name table.
//! Adding a backend means a new variant and a new match arm, not a registry
//! entry.

pub mod gemini;
pub mod openai;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{PollingConfig, ResearcherConfig};
use crate::error::ProviderError;
use crate::progress::{JobPhase, ProgressSink};
use crate::types::ResearchResult;

pub use gemini::GeminiDeepResearch;
pub use openai::OpenAiDeepResearch;

/// Provider names accepted by [`resolve_provider`].
pub const SUPPORTED_PROVIDERS: &[&str] = &["openai", "gemini"];

/// Canonical lifecycle states a raw provider status maps onto.
///
/// `Unknown` is deliberately non-terminal: a status string this crate has
/// never seen keeps the job polling instead of killing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Unknown,
}

/// One poll observation: the canonical state plus the provider's own words.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub status: CanonicalStatus,
    /// Raw status string as reported by the provider.
    pub raw: String,
    /// Provider-reported failure detail, when there is one.
    pub detail: Option<String>,
}

impl PollOutcome {
    pub fn new(status: CanonicalStatus, raw: impl Into<String>) -> Self {
        Self {
            status,
            raw: raw.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Poll cadence and overall deadline for one research job.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_duration: Duration,
}

impl PollSettings {
    pub fn from_config(polling: &PollingConfig) -> Self {
        Self {
            interval: Duration::from_secs(polling.interval_secs),
            max_duration: Duration::from_secs(polling.max_duration_secs),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

/// The submit/poll/fetch protocol a deep research backend speaks.
#[async_trait]
pub trait DeepResearchJob: Send + Sync {
    /// Short lowercase identifier, e.g. "openai".
    fn provider_name(&self) -> &str;

    /// Human-facing name used in progress messages, e.g. "OpenAI".
    fn display_name(&self) -> &str;

    /// Model the job runs with.
    fn model_name(&self) -> &str;

    /// Noun for this provider's job object ("Response", "Interaction"),
    /// used in user-facing status and failure messages.
    fn job_noun(&self) -> &'static str;

    /// Start a background research job. Returns the handle used to poll
    /// and fetch it.
    async fn submit(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Read the job's current status once.
    async fn poll(&self, handle: &str) -> Result<PollOutcome, ProviderError>;

    /// Retrieve the final text of a completed job. May be empty; the
    /// driver treats empty text as a failure.
    async fn fetch(&self, handle: &str) -> Result<String, ProviderError>;
}

/// Drive a research job from submission to a terminal [`ResearchResult`].
///
/// This function never fails: submission errors, poll errors, provider
/// failure statuses, empty completions, the `max_duration` deadline and
/// cancellation all come back as a failed result carrying the cause in its
/// `error` field. Status updates go to `sink` as they happen.
pub async fn submit_and_await(
    job: &dyn DeepResearchJob,
    prompt: &str,
    settings: PollSettings,
    cancel: &CancellationToken,
    sink: &ProgressSink,
) -> ResearchResult {
    let provider = job.provider_name().to_string();
    let model = job.model_name().to_string();
    let started = Instant::now();

    sink.update(
        &provider,
        JobPhase::Submitting,
        format!("Submitting to {} deep research...", job.display_name()),
    );
    info!(provider = %provider, model = %model, "submitting research job");

    let handle = match job.submit(prompt).await {
        Ok(handle) => handle,
        Err(err) => {
            let message = err.to_string();
            warn!(provider = %provider, error = %message, "submission failed");
            sink.update(&provider, JobPhase::Failed, &message);
            return ResearchResult::failed(provider, model, message);
        }
    };

    let short: String = handle.chars().take(12).collect();
    sink.update(
        &provider,
        JobPhase::Polling,
        format!(
            "Submitted. Polling {} {}...",
            job.job_noun().to_lowercase(),
            short
        ),
    );
    debug!(provider = %provider, handle = %handle, "job submitted");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let message = "Research cancelled".to_string();
                warn!(provider = %provider, "research cancelled");
                sink.update(&provider, JobPhase::Failed, &message);
                return ResearchResult::failed(provider, model, message);
            }
            _ = tokio::time::sleep(settings.interval) => {}
        }

        if started.elapsed() >= settings.max_duration {
            let message = format!(
                "Research timed out after {}s",
                settings.max_duration.as_secs()
            );
            warn!(provider = %provider, "research timed out");
            sink.update(&provider, JobPhase::Failed, &message);
            return ResearchResult::failed(provider, model, message);
        }

        let outcome = match job.poll(&handle).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let message = err.to_string();
                warn!(provider = %provider, error = %message, "poll failed");
                sink.update(&provider, JobPhase::Failed, &message);
                return ResearchResult::failed(provider, model, message);
            }
        };

        debug!(provider = %provider, status = %outcome.raw, "polled job");
        sink.update(
            &provider,
            JobPhase::Polling,
            format!("Status: {}", outcome.raw),
        );

        match outcome.status {
            CanonicalStatus::Completed => match job.fetch(&handle).await {
                Ok(content) if !content.trim().is_empty() => {
                    info!(
                        provider = %provider,
                        chars = content.len(),
                        elapsed_secs = started.elapsed().as_secs(),
                        "research completed"
                    );
                    sink.update(
                        &provider,
                        JobPhase::Completed,
                        format!("Got {} chars", content.len()),
                    );
                    return ResearchResult::completed(provider, model, content);
                }
                Ok(_) => {
                    let message =
                        format!("{} completed but no text content found.", job.job_noun());
                    sink.update(&provider, JobPhase::Failed, &message);
                    return ResearchResult::failed(provider, model, message);
                }
                Err(err) => {
                    let message = err.to_string();
                    warn!(provider = %provider, error = %message, "fetch failed");
                    sink.update(&provider, JobPhase::Failed, &message);
                    return ResearchResult::failed(provider, model, message);
                }
            },
            CanonicalStatus::Failed => {
                let mut message = format!("{} ended with status: {}", job.job_noun(), outcome.raw);
                if let Some(detail) = &outcome.detail
                    && !detail.is_empty()
                {
                    message.push_str(" - ");
                    message.push_str(detail);
                }
                warn!(provider = %provider, status = %outcome.raw, "research failed");
                sink.update(&provider, JobPhase::Failed, &message);
                return ResearchResult::failed(provider, model, message);
            }
            CanonicalStatus::Queued | CanonicalStatus::Running => {}
            CanonicalStatus::Unknown => {
                warn!(provider = %provider, status = %outcome.raw, "unknown status, continuing to poll");
                sink.update(
                    &provider,
                    JobPhase::Polling,
                    format!("Unknown status: {}, continuing to poll...", outcome.raw),
                );
            }
        }
    }
}

/// The closed set of deep research providers.
#[derive(Debug)]
pub enum ResearchProvider {
    OpenAi(OpenAiDeepResearch),
    Gemini(GeminiDeepResearch),
}

#[async_trait]
impl DeepResearchJob for ResearchProvider {
    fn provider_name(&self) -> &str {
        match self {
            ResearchProvider::OpenAi(p) => p.provider_name(),
            ResearchProvider::Gemini(p) => p.provider_name(),
        }
    }

    fn display_name(&self) -> &str {
        match self {
            ResearchProvider::OpenAi(p) => p.display_name(),
            ResearchProvider::Gemini(p) => p.display_name(),
        }
    }

    fn model_name(&self) -> &str {
        match self {
            ResearchProvider::OpenAi(p) => p.model_name(),
            ResearchProvider::Gemini(p) => p.model_name(),
        }
    }

    fn job_noun(&self) -> &'static str {
        match self {
            ResearchProvider::OpenAi(p) => p.job_noun(),
            ResearchProvider::Gemini(p) => p.job_noun(),
        }
    }

    async fn submit(&self, prompt: &str) -> Result<String, ProviderError> {
        match self {
            ResearchProvider::OpenAi(p) => p.submit(prompt).await,
            ResearchProvider::Gemini(p) => p.submit(prompt).await,
        }
    }

    async fn poll(&self, handle: &str) -> Result<PollOutcome, ProviderError> {
        match self {
            ResearchProvider::OpenAi(p) => p.poll(handle).await,
            ResearchProvider::Gemini(p) => p.poll(handle).await,
        }
    }

    async fn fetch(&self, handle: &str) -> Result<String, ProviderError> {
        match self {
            ResearchProvider::OpenAi(p) => p.fetch(handle).await,
            ResearchProvider::Gemini(p) => p.fetch(handle).await,
        }
    }
}

/// Build the provider client for `name`, reading its API key from the
/// environment and its model from config unless overridden.
pub fn resolve_provider(
    name: &str,
    config: &ResearcherConfig,
    model_override: Option<&str>,
) -> Result<ResearchProvider, ProviderError> {
    match name {
        "openai" => {
            let api_key = resolve_api_key(openai::API_KEY_VAR)?;
            let model = model_override.unwrap_or(&config.models.openai_deep_research);
            Ok(ResearchProvider::OpenAi(OpenAiDeepResearch::new(
                api_key, model,
            )))
        }
        "gemini" => {
            let api_key = resolve_api_key(gemini::API_KEY_VAR)?;
            let model = model_override.unwrap_or(&config.models.gemini_deep_research);
            Ok(ResearchProvider::Gemini(GeminiDeepResearch::new(
                api_key, model,
            )))
        }
        other => Err(ProviderError::UnknownProvider {
            name: other.to_string(),
            supported: SUPPORTED_PROVIDERS.join(", "),
        }),
    }
}

/// Read an API key from the environment, rejecting unset or blank values.
pub fn resolve_api_key(var: &str) -> Result<String, ProviderError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ProviderError::MissingApiKey {
            var: var.to_string(),
        }),
    }
}

/// A scripted research job for testing and development.
///
/// Successive `poll` calls consume queued [`PollOutcome`]s in order; once
/// the queue is empty the job reports as running forever. `submit` and
/// `fetch` return configured values and count their calls.
pub struct MockResearchJob {
    name: String,
    model: String,
    outcomes: std::sync::Mutex<Vec<PollOutcome>>,
    content: std::sync::Mutex<String>,
    submit_error: std::sync::Mutex<Option<ProviderError>>,
    fetch_error: std::sync::Mutex<Option<ProviderError>>,
    submit_calls: std::sync::atomic::AtomicUsize,
    poll_calls: std::sync::atomic::AtomicUsize,
}

impl MockResearchJob {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            model: "mock-deep-research".to_string(),
            outcomes: std::sync::Mutex::new(Vec::new()),
            content: std::sync::Mutex::new(String::new()),
            submit_error: std::sync::Mutex::new(None),
            fetch_error: std::sync::Mutex::new(None),
            submit_calls: std::sync::atomic::AtomicUsize::new(0),
            poll_calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// A job that completes on its first poll and yields `content`.
    pub fn completing_with(name: &str, content: &str) -> Self {
        let job = Self::new(name);
        job.queue_poll(PollOutcome::new(CanonicalStatus::Completed, "completed"));
        job.set_content(content);
        job
    }

    /// Queue an outcome to be returned by the next `poll` call.
    pub fn queue_poll(&self, outcome: PollOutcome) {
        self.outcomes.lock().unwrap().push(outcome);
    }

    /// Set the text returned by `fetch`.
    pub fn set_content(&self, text: &str) {
        *self.content.lock().unwrap() = text.to_string();
    }

    /// Make the next `submit` call fail.
    pub fn fail_submit(&self, error: ProviderError) {
        *self.submit_error.lock().unwrap() = Some(error);
    }

    /// Make the next `fetch` call fail.
    pub fn fail_fetch(&self, error: ProviderError) {
        *self.fetch_error.lock().unwrap() = Some(error);
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl DeepResearchJob for MockResearchJob {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn job_noun(&self) -> &'static str {
        "Response"
    }

    async fn submit(&self, _prompt: &str) -> Result<String, ProviderError> {
        self.submit_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(err) = self.submit_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(format!("job-{}", self.name))
    }

    async fn poll(&self, _handle: &str) -> Result<PollOutcome, ProviderError> {
        self.poll_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            Ok(PollOutcome::new(CanonicalStatus::Running, "running"))
        } else {
            Ok(outcomes.remove(0))
        }
    }

    async fn fetch(&self, _handle: &str) -> Result<String, ProviderError> {
        if let Some(err) = self.fetch_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.content.lock().unwrap().clone())
    }
}

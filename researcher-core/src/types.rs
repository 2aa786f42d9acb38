//! Core type definitions for the researcher.
//!
//! Defines the value types passed between the provider clients, the
//! orchestrator, and the synthesis step.

use serde::{Deserialize, Serialize};

/// Terminal status of one provider's research job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Completed,
    Failed,
    Partial,
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultStatus::Completed => write!(f, "completed"),
            ResultStatus::Failed => write!(f, "failed"),
            ResultStatus::Partial => write!(f, "partial"),
        }
    }
}

/// Model identifier recorded on results restored from the partial store.
pub const RESUMED_MODEL: &str = "resumed";

/// Result from a deep research provider.
///
/// Handed by value from the provider client to the orchestrator and on to
/// synthesis. A failed provider still produces one of these; the error text
/// travels with it rather than through an error channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    /// Provider name (e.g. "openai", "gemini").
    pub provider: String,
    /// The research content. Empty unless status is `Completed`.
    pub content: String,
    /// Model identifier used, or [`RESUMED_MODEL`] for restored partials.
    pub model: String,
    pub status: ResultStatus,
    /// Human-readable failure cause. Empty unless status is `Failed`.
    #[serde(default)]
    pub error: String,
}

impl ResearchResult {
    /// A completed result. `content` must be non-empty; empty completions
    /// are a provider fault and belong in [`ResearchResult::failed`].
    pub fn completed(
        provider: impl Into<String>,
        model: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        debug_assert!(!content.is_empty(), "completed result with empty content");
        Self {
            provider: provider.into(),
            content,
            model: model.into(),
            status: ResultStatus::Completed,
            error: String::new(),
        }
    }

    /// A failed result carrying its cause.
    pub fn failed(
        provider: impl Into<String>,
        model: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        debug_assert!(!error.is_empty(), "failed result with empty error");
        Self {
            provider: provider.into(),
            content: String::new(),
            model: model.into(),
            status: ResultStatus::Failed,
            error,
        }
    }

    /// A synthetic completed result restored from the partial store.
    pub fn resumed(provider: impl Into<String>, content: impl Into<String>) -> Self {
        Self::completed(provider, RESUMED_MODEL, content)
    }

    pub fn is_completed(&self) -> bool {
        self.status == ResultStatus::Completed
    }
}

/// The pair of documents produced by synthesis.
///
/// Either document may be empty only as a degraded fallback; the synthesis
/// step never drops one silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOutput {
    /// The research companion document (content.md).
    pub content: String,
    /// The improvement suggestions document (suggestions.md).
    pub suggestions: String,
}

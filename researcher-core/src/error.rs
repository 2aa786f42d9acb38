//! Error types for the researcher core.
//!
//! Uses `thiserror` for public API error types. Provider-level faults are
//! normally contained inside a failed `ResearchResult` and never surface
//! through these enums; what does surface here are pipeline-level failures
//! (nothing to synthesize, missing playground) and configuration problems.

use std::path::PathBuf;

/// Top-level error type for the researcher core library.
#[derive(Debug, thiserror::Error)]
pub enum ResearcherError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Playground '{name}' not found under {searched}. Expected a directory matching (YYYY)/(MM)/{name}/ containing page.tsx")]
    PlaygroundNotFound { name: String, searched: PathBuf },

    #[error("Playgrounds directory not found: {path}")]
    PlaygroundsDirMissing { path: PathBuf },

    #[error("Could not detect project root (package.json with an app/ directory); pass --project-root")]
    ProjectRootNotFound,

    #[error("No successful research results to synthesize")]
    NoCompletedResults,

    #[error("Query generation produced no queries")]
    NoQueries,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from deep research provider interactions.
///
/// These are produced inside a provider's submit/poll/fetch protocol and are
/// converted to failed `ResearchResult`s by the polling driver; only the
/// one-shot completion calls (query generation, synthesis) let them escape.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Environment variable not set: {var}")]
    MissingApiKey { var: String },

    #[error("Unknown provider: {name} (supported: {supported})")]
    UnknownProvider { name: String, supported: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `ResearcherError`.
pub type Result<T> = std::result::Result<T, ResearcherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_provider() {
        let err = ResearcherError::Provider(ProviderError::ApiRequest {
            message: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "Provider error: API request failed: connection refused"
        );
    }

    #[test]
    fn test_error_display_missing_api_key() {
        let err = ProviderError::MissingApiKey {
            var: "OPENAI_API_KEY".into(),
        };
        assert_eq!(
            err.to_string(),
            "Environment variable not set: OPENAI_API_KEY"
        );
    }

    #[test]
    fn test_error_display_unknown_provider() {
        let err = ProviderError::UnknownProvider {
            name: "claude".into(),
            supported: "openai, gemini".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown provider: claude (supported: openai, gemini)"
        );
    }

    #[test]
    fn test_error_display_playground_not_found() {
        let err = ResearcherError::PlaygroundNotFound {
            name: "hsp90-canalization".into(),
            searched: PathBuf::from("/proj/app/playgrounds"),
        };
        let msg = err.to_string();
        assert!(msg.contains("hsp90-canalization"));
        assert!(msg.contains("/proj/app/playgrounds"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ResearcherError = io_err.into();
        assert!(matches!(err, ResearcherError::Io(_)));
    }

    #[test]
    fn test_error_display_no_completed() {
        assert_eq!(
            ResearcherError::NoCompletedResults.to_string(),
            "No successful research results to synthesize"
        );
    }
}

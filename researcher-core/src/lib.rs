//! # Researcher Core
//!
//! Core library for the playground deep research companion generator.
//! Provides playground discovery and context extraction, the deep research
//! provider clients, the fan-out orchestrator with resumable partial
//! results, synthesis, and output generation.

pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod partials;
pub mod persistence;
pub mod pipeline;
pub mod progress;
pub mod providers;
pub mod queries;
pub mod synthesis;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{ModelsConfig, PollingConfig, ProjectConfig, ResearcherConfig};
pub use context::{PlaygroundContext, build_context};
pub use discovery::{PlaygroundEntry, detect_project_root, find_playground, list_playgrounds};
pub use error::{ConfigError, ProviderError, Result, ResearcherError};
pub use orchestrator::{ResearchPlan, dispatch_research, merge_results, plan_research, run_jobs};
pub use output::write_output;
pub use partials::{PartialStore, RunManifest};
pub use pipeline::{ResearchPipeline, RunOptions, RunOutcome};
pub use progress::{
    JobPhase, ProgressSink, ProgressTracker, ProgressUpdate, ProviderProgress, format_elapsed,
};
pub use providers::{
    CanonicalStatus, DeepResearchJob, MockResearchJob, PollOutcome, PollSettings, ResearchProvider,
    SUPPORTED_PROVIDERS, resolve_provider, submit_and_await,
};
pub use queries::{ApproveAll, QueryReviewer, build_research_prompt, generate_queries, parse_queries};
pub use synthesis::{NO_SUGGESTIONS_FALLBACK, parse_synthesis, synthesize};
pub use types::{RESUMED_MODEL, ResearchResult, ResultStatus, SynthesisOutput};

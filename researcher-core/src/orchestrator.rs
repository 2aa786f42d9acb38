//! Fan-out orchestration of research providers.
//!
//! A run is planned first: partial results already on disk satisfy their
//! providers when resuming, and only the remainder is dispatched. Dispatch
//! runs every provider concurrently and never short-circuits; a provider
//! that fails, times out or cannot even be constructed still contributes a
//! failed result. Completed results are persisted to the partial store the
//! moment they arrive, so an interrupted run loses nothing that finished.

use std::collections::HashMap;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ResearcherConfig;
use crate::error::Result;
use crate::partials::PartialStore;
use crate::progress::{JobPhase, ProgressSink};
use crate::providers::{
    DeepResearchJob, PollSettings, ResearchProvider, resolve_provider, submit_and_await,
};
use crate::types::ResearchResult;

/// Outcome of resume planning: what is already done, what still runs.
#[derive(Debug)]
pub struct ResearchPlan {
    /// Synthetic completed results restored from the partial store.
    pub resumed: Vec<ResearchResult>,
    /// Provider names that still need a live research job.
    pub to_dispatch: Vec<String>,
}

/// Decide which requested providers can be satisfied from the partial
/// store. Without `resume` everything is dispatched; with it, providers
/// holding a non-empty partial are restored instead of re-run.
pub fn plan_research(
    requested: &[String],
    store: &PartialStore,
    resume: bool,
) -> Result<ResearchPlan> {
    let mut resumed = Vec::new();
    let mut to_dispatch = Vec::new();

    for name in requested {
        if resume
            && let Some(content) = store.load(name)?
            && !content.trim().is_empty()
        {
            info!(provider = %name, "using cached partial result");
            resumed.push(ResearchResult::resumed(name, content));
        } else {
            to_dispatch.push(name.clone());
        }
    }

    Ok(ResearchPlan {
        resumed,
        to_dispatch,
    })
}

/// Run research across the named providers and collect one result each.
///
/// Providers that cannot be constructed (unknown name, missing API key)
/// become failed results immediately; the rest run concurrently through
/// [`run_jobs`]. The model override applies to the openai provider only.
pub async fn dispatch_research(
    to_dispatch: &[String],
    prompt: &str,
    config: &ResearcherConfig,
    model_override: Option<&str>,
    store: &PartialStore,
    cancel: &CancellationToken,
    sink: &ProgressSink,
) -> Vec<ResearchResult> {
    let mut jobs: Vec<ResearchProvider> = Vec::new();
    let mut unresolved: Vec<ResearchResult> = Vec::new();

    for name in to_dispatch {
        let override_for = if name == "openai" { model_override } else { None };
        match resolve_provider(name, config, override_for) {
            Ok(provider) => jobs.push(provider),
            Err(err) => {
                let message = err.to_string();
                warn!(provider = %name, error = %message, "cannot run provider");
                sink.update(name, JobPhase::Failed, &message);
                unresolved.push(ResearchResult::failed(name, "unknown", message));
            }
        }
    }

    let settings = PollSettings::from_config(&config.polling);
    let mut results = run_jobs(&jobs, prompt, settings, store, cancel, sink).await;
    results.extend(unresolved);
    results
}

/// Drive a set of research jobs concurrently to completion.
///
/// Each completed result is written to the partial store before the
/// fan-in finishes; a persistence failure is logged but does not demote
/// the result, the research itself succeeded.
pub async fn run_jobs<J: DeepResearchJob>(
    jobs: &[J],
    prompt: &str,
    settings: PollSettings,
    store: &PartialStore,
    cancel: &CancellationToken,
    sink: &ProgressSink,
) -> Vec<ResearchResult> {
    let tasks = jobs.iter().map(|job| async move {
        let result = submit_and_await(job, prompt, settings, cancel, sink).await;
        if result.is_completed()
            && let Err(err) = store.save(&result.provider, &result.content)
        {
            warn!(provider = %result.provider, error = %err, "failed to persist partial result");
        }
        result
    });

    join_all(tasks).await
}

/// Merge restored and freshly dispatched results into exactly one entry
/// per requested provider, in request order. Duplicate requests collapse.
pub fn merge_results(
    requested: &[String],
    resumed: Vec<ResearchResult>,
    dispatched: Vec<ResearchResult>,
) -> Vec<ResearchResult> {
    let mut by_provider: HashMap<String, ResearchResult> = HashMap::new();
    for result in resumed.into_iter().chain(dispatched) {
        by_provider.insert(result.provider.clone(), result);
    }

    requested
        .iter()
        .filter_map(|name| by_provider.remove(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RESUMED_MODEL, ResultStatus};
    use tempfile::TempDir;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_plan_without_resume_dispatches_everything() {
        let dir = TempDir::new().unwrap();
        let store = PartialStore::new(dir.path());
        store.save("openai", "cached").unwrap();

        let plan = plan_research(&names(&["openai", "gemini"]), &store, false).unwrap();
        assert!(plan.resumed.is_empty());
        assert_eq!(plan.to_dispatch, names(&["openai", "gemini"]));
    }

    #[test]
    fn test_plan_resume_restores_partials() {
        let dir = TempDir::new().unwrap();
        let store = PartialStore::new(dir.path());
        store.save("openai", "cached findings").unwrap();

        let plan = plan_research(&names(&["openai", "gemini"]), &store, true).unwrap();
        assert_eq!(plan.resumed.len(), 1);
        assert_eq!(plan.resumed[0].provider, "openai");
        assert_eq!(plan.resumed[0].model, RESUMED_MODEL);
        assert_eq!(plan.resumed[0].content, "cached findings");
        assert!(plan.resumed[0].is_completed());
        assert_eq!(plan.to_dispatch, names(&["gemini"]));
    }

    #[test]
    fn test_plan_resume_ignores_blank_partials() {
        let dir = TempDir::new().unwrap();
        let store = PartialStore::new(dir.path());
        store.save("openai", "   \n").unwrap();

        let plan = plan_research(&names(&["openai"]), &store, true).unwrap();
        assert!(plan.resumed.is_empty());
        assert_eq!(plan.to_dispatch, names(&["openai"]));
    }

    #[test]
    fn test_merge_results_is_request_ordered() {
        let resumed = vec![ResearchResult::resumed("gemini", "cached")];
        let dispatched = vec![ResearchResult::completed("openai", "o3", "fresh")];

        let merged = merge_results(&names(&["openai", "gemini"]), resumed, dispatched);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].provider, "openai");
        assert_eq!(merged[1].provider, "gemini");
    }

    #[test]
    fn test_merge_results_collapses_duplicates() {
        let dispatched = vec![ResearchResult::completed("openai", "o3", "fresh")];
        let merged = merge_results(&names(&["openai", "openai"]), Vec::new(), dispatched);
        assert_eq!(merged.len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_provider_becomes_failed_result() {
        let dir = TempDir::new().unwrap();
        let store = PartialStore::new(dir.path());
        let config = ResearcherConfig::default();
        let cancel = CancellationToken::new();
        let sink = ProgressSink::disabled();

        let results = dispatch_research(
            &names(&["claude"]),
            "prompt",
            &config,
            None,
            &store,
            &cancel,
            &sink,
        )
        .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].provider, "claude");
        assert_eq!(results[0].status, ResultStatus::Failed);
        assert!(results[0].error.contains("Unknown provider"));
    }
}

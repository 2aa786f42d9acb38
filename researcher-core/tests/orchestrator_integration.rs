//! Integration tests for the research orchestrator.
//!
//! These tests exercise the fan-out/fan-in flow end-to-end using
//! MockResearchJob, verifying that provider faults stay contained as failed
//! results, that completed research persists before fan-in finishes, and
//! that resumed runs skip providers with saved partials.

use std::time::Duration;

use researcher_core::partials::PartialStore;
use researcher_core::pipeline::{ResearchPipeline, RunOptions};
use researcher_core::progress::{JobPhase, ProgressSink, ProgressTracker};
use researcher_core::providers::{
    CanonicalStatus, MockResearchJob, PollOutcome, PollSettings, openai,
};
use researcher_core::queries::ApproveAll;
use researcher_core::types::{RESUMED_MODEL, ResultStatus};
use researcher_core::{
    ProviderError, ResearcherConfig, ResearcherError, dispatch_research, merge_results,
    plan_research, run_jobs,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn fast_settings() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(5),
        max_duration: Duration::from_secs(5),
    }
}

fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

// --- Integration Tests ---

#[tokio::test]
async fn test_fan_out_completes_and_persists() {
    let dir = TempDir::new().unwrap();
    let store = PartialStore::new(dir.path());
    let jobs = vec![
        MockResearchJob::completing_with("openai", "openai findings"),
        MockResearchJob::completing_with("gemini", "gemini findings"),
    ];

    let results = run_jobs(
        &jobs,
        "prompt",
        fast_settings(),
        &store,
        &CancellationToken::new(),
        &ProgressSink::disabled(),
    )
    .await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_completed()));

    // Both partials were written before the fan-in returned.
    assert_eq!(
        store.load("openai").unwrap().as_deref(),
        Some("openai findings")
    );
    assert_eq!(
        store.load("gemini").unwrap().as_deref(),
        Some("gemini findings")
    );
}

#[tokio::test]
async fn test_one_failure_does_not_stop_others() {
    let dir = TempDir::new().unwrap();
    let store = PartialStore::new(dir.path());

    let failing = MockResearchJob::new("gemini");
    failing.queue_poll(
        PollOutcome::new(CanonicalStatus::Failed, "FAILED").with_detail("quota exhausted"),
    );
    let jobs = vec![
        MockResearchJob::completing_with("openai", "openai findings"),
        failing,
    ];

    let results = run_jobs(
        &jobs,
        "prompt",
        fast_settings(),
        &store,
        &CancellationToken::new(),
        &ProgressSink::disabled(),
    )
    .await;

    assert_eq!(results.len(), 2);
    let openai = results.iter().find(|r| r.provider == "openai").unwrap();
    let gemini = results.iter().find(|r| r.provider == "gemini").unwrap();

    assert!(openai.is_completed());
    assert!(!gemini.is_completed());
    assert!(gemini.error.contains("quota exhausted"));

    assert!(store.has("openai"));
    assert!(!store.has("gemini"));
}

#[tokio::test]
async fn test_every_fault_becomes_a_failed_result() {
    let dir = TempDir::new().unwrap();
    let store = PartialStore::new(dir.path());

    let submit_fails = MockResearchJob::new("openai");
    submit_fails.fail_submit(ProviderError::ApiRequest {
        message: "connection refused".into(),
    });

    let fetch_fails = MockResearchJob::new("gemini");
    fetch_fails.queue_poll(PollOutcome::new(CanonicalStatus::Completed, "completed"));
    fetch_fails.fail_fetch(ProviderError::ResponseParse {
        message: "no messages".into(),
    });

    let jobs = vec![submit_fails, fetch_fails];
    let results = run_jobs(
        &jobs,
        "prompt",
        fast_settings(),
        &store,
        &CancellationToken::new(),
        &ProgressSink::disabled(),
    )
    .await;

    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(result.status, ResultStatus::Failed);
        assert!(!result.error.is_empty());
        assert!(result.content.is_empty());
    }
    assert!(store.list().is_empty());
}

#[tokio::test]
async fn test_resume_skips_providers_with_partials() {
    let dir = TempDir::new().unwrap();
    let store = PartialStore::new(dir.path());
    store.save("openai", "cached openai findings").unwrap();

    let requested = names(&["openai", "gemini"]);
    let plan = plan_research(&requested, &store, true).unwrap();
    assert_eq!(plan.to_dispatch, names(&["gemini"]));

    // Only gemini gets a live job; openai is never submitted.
    let gemini = MockResearchJob::completing_with("gemini", "fresh gemini findings");
    let jobs = vec![gemini];
    let dispatched = run_jobs(
        &jobs,
        "prompt",
        fast_settings(),
        &store,
        &CancellationToken::new(),
        &ProgressSink::disabled(),
    )
    .await;
    assert_eq!(jobs[0].submit_calls(), 1);

    let results = merge_results(&requested, plan.resumed, dispatched);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].provider, "openai");
    assert_eq!(results[0].model, RESUMED_MODEL);
    assert_eq!(results[0].content, "cached openai findings");
    assert_eq!(results[1].provider, "gemini");
    assert_eq!(results[1].content, "fresh gemini findings");
    assert!(results.iter().all(|r| r.is_completed()));
}

#[tokio::test]
async fn test_merge_covers_every_requested_provider() {
    let dir = TempDir::new().unwrap();
    let store = PartialStore::new(dir.path());
    store.save("openai", "cached").unwrap();

    let requested = names(&["openai", "gemini", "claude"]);
    let plan = plan_research(&requested, &store, true).unwrap();
    assert_eq!(plan.to_dispatch, names(&["gemini", "claude"]));

    let jobs = vec![MockResearchJob::completing_with("gemini", "fresh")];
    let mut dispatched = run_jobs(
        &jobs,
        "prompt",
        fast_settings(),
        &store,
        &CancellationToken::new(),
        &ProgressSink::disabled(),
    )
    .await;

    // "claude" resolves to nothing; dispatch turns it into a failed entry.
    let config = ResearcherConfig::default();
    dispatched.extend(
        dispatch_research(
            &names(&["claude"]),
            "prompt",
            &config,
            None,
            &store,
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await,
    );

    let results = merge_results(&requested, plan.resumed, dispatched);
    let providers: Vec<&str> = results.iter().map(|r| r.provider.as_str()).collect();
    assert_eq!(providers, vec!["openai", "gemini", "claude"]);
    assert!(results[0].is_completed());
    assert!(results[1].is_completed());
    assert_eq!(results[2].status, ResultStatus::Failed);
    assert!(results[2].error.contains("Unknown provider"));
}

#[tokio::test]
async fn test_cancellation_fails_all_pending_jobs() {
    let dir = TempDir::new().unwrap();
    let store = PartialStore::new(dir.path());
    let cancel = CancellationToken::new();
    cancel.cancel();

    // No scripted outcomes: these jobs would poll forever if not cancelled.
    let jobs = vec![MockResearchJob::new("openai"), MockResearchJob::new("gemini")];
    let results = run_jobs(
        &jobs,
        "prompt",
        fast_settings(),
        &store,
        &cancel,
        &ProgressSink::disabled(),
    )
    .await;

    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(result.error, "Research cancelled");
        assert!(!result.is_completed());
    }
    assert!(store.list().is_empty());
}

#[tokio::test]
async fn test_progress_updates_drive_observer_tracker() {
    let dir = TempDir::new().unwrap();
    let store = PartialStore::new(dir.path());
    let (sink, mut rx) = ProgressSink::channel();

    let failing = MockResearchJob::new("gemini");
    failing.queue_poll(PollOutcome::new(CanonicalStatus::Failed, "FAILED"));
    let jobs = vec![
        MockResearchJob::completing_with("openai", "findings"),
        failing,
    ];

    run_jobs(
        &jobs,
        "prompt",
        fast_settings(),
        &store,
        &CancellationToken::new(),
        &sink,
    )
    .await;
    drop(sink);

    let mut tracker = ProgressTracker::new(&names(&["openai", "gemini"]));
    while let Some(update) = rx.recv().await {
        tracker.apply(&update);
    }

    let rows = tracker.snapshot();
    assert_eq!(rows[0].phase, JobPhase::Completed);
    assert_eq!(rows[0].message, "Got 8 chars");
    assert!(rows[0].started_at.is_some());
    assert_eq!(rows[1].phase, JobPhase::Failed);
    assert!(rows[1].message.contains("FAILED"));
}

#[tokio::test]
async fn test_pipeline_requires_openai_key_up_front() {
    // SAFETY: test-only env var manipulation
    unsafe { std::env::remove_var(openai::API_KEY_VAR) };

    let dir = TempDir::new().unwrap();
    let playground = dir.path().join("pg");
    std::fs::create_dir_all(&playground).unwrap();

    let pipeline = ResearchPipeline::new(
        ResearcherConfig::default(),
        playground,
        dir.path().to_path_buf(),
    );
    let ctx = pipeline.build_context().unwrap();

    let options = RunOptions {
        providers: names(&["gemini"]),
        ..Default::default()
    };
    let err = pipeline
        .run(
            &ctx,
            &options,
            &ApproveAll,
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ResearcherError::Provider(ProviderError::MissingApiKey { .. })
    ));
}

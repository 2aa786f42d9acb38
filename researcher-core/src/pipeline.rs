//! The end-to-end research pipeline.
//!
//! One run walks the full arc: extract playground context, plan around any
//! partial results, generate and review research queries, fan the research
//! prompt out to the providers, synthesize the findings, and write the
//! output files. Synthesis and query generation always go through OpenAI,
//! so the OpenAI key is required up front even for a gemini-only run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ResearcherConfig;
use crate::context::{self, PlaygroundContext};
use crate::error::{Result, ResearcherError};
use crate::orchestrator::{dispatch_research, merge_results, plan_research};
use crate::output::write_output;
use crate::partials::{PartialStore, RunManifest};
use crate::progress::{JobPhase, ProgressSink};
use crate::providers::{openai, resolve_api_key};
use crate::providers::openai::OpenAiClient;
use crate::queries::{QueryReviewer, build_research_prompt, generate_queries};
use crate::synthesis::synthesize;
use crate::types::{ResearchResult, SynthesisOutput};

/// Caller-selected knobs for one research run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Provider names to research with, in request order.
    pub providers: Vec<String>,
    /// Optional focus area steering query generation.
    pub focus: Option<String>,
    /// Override for the openai deep research model only.
    pub model_override: Option<String>,
    /// Satisfy providers from the partial store where possible.
    pub resume: bool,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// One result per requested provider, in request order.
    pub results: Vec<ResearchResult>,
    pub synthesis: SynthesisOutput,
    /// The playground's `research/` directory.
    pub research_dir: PathBuf,
}

/// Deep research pipeline for a single playground.
#[derive(Debug, Clone)]
pub struct ResearchPipeline {
    config: ResearcherConfig,
    playground_dir: PathBuf,
    project_root: PathBuf,
}

impl ResearchPipeline {
    pub fn new(config: ResearcherConfig, playground_dir: PathBuf, project_root: PathBuf) -> Self {
        Self {
            config,
            playground_dir,
            project_root,
        }
    }

    /// Extract the playground's context bundle.
    pub fn build_context(&self) -> Result<PlaygroundContext> {
        context::build_context(&self.playground_dir, &self.project_root)
    }

    /// Run the full pipeline against an already-built context.
    ///
    /// Provider faults never abort the run; they surface as failed entries
    /// in the outcome. The run itself fails only when query generation
    /// produces nothing, when no provider completes, or when synthesis or
    /// output writing fails.
    pub async fn run(
        &self,
        ctx: &PlaygroundContext,
        options: &RunOptions,
        reviewer: &dyn QueryReviewer,
        cancel: &CancellationToken,
        sink: &ProgressSink,
    ) -> Result<RunOutcome> {
        let requested = normalize_providers(&options.providers);
        let store = PartialStore::new(&self.playground_dir);

        // Synthesis always needs the OpenAI key; fail before any research
        // money is spent, not after.
        let client = OpenAiClient::new(resolve_api_key(openai::API_KEY_VAR)?);

        let plan = plan_research(&requested, &store, options.resume)?;
        for result in &plan.resumed {
            sink.update(&result.provider, JobPhase::Completed, "Using cached result");
        }

        let dispatched = if plan.to_dispatch.is_empty() {
            info!("all requested providers satisfied from partial results");
            Vec::new()
        } else {
            let queries = generate_queries(
                &client,
                &self.config.models.query_generation,
                ctx,
                options.focus.as_deref(),
            )
            .await?;
            if queries.is_empty() {
                return Err(ResearcherError::NoQueries);
            }
            info!(count = queries.len(), "generated research queries");

            let reviewed = reviewer.review(queries.clone());
            let queries = if reviewed.is_empty() { queries } else { reviewed };
            let prompt = build_research_prompt(ctx, &queries);

            let manifest = RunManifest::new(
                ctx.name.clone(),
                requested.clone(),
                self.dispatch_models(&plan.to_dispatch, options.model_override.as_deref()),
            );
            if let Err(err) = store.save_manifest(&manifest) {
                warn!(error = %err, "failed to write run manifest");
            }

            dispatch_research(
                &plan.to_dispatch,
                &prompt,
                &self.config,
                options.model_override.as_deref(),
                &store,
                cancel,
                sink,
            )
            .await
        };

        let results = merge_results(&requested, plan.resumed, dispatched);
        let completed = results.iter().filter(|r| r.is_completed()).count();
        if completed == 0 {
            return Err(ResearcherError::NoCompletedResults);
        }

        info!(completed, "synthesizing research results");
        let synthesis = synthesize(&client, &self.config.models.synthesis, ctx, &results).await?;
        let research_dir = write_output(
            &self.playground_dir,
            ctx,
            &synthesis.content,
            &synthesis.suggestions,
        )?;

        Ok(RunOutcome {
            results,
            synthesis,
            research_dir,
        })
    }

    /// Model in effect per provider at dispatch, for the run manifest.
    fn dispatch_models(
        &self,
        to_dispatch: &[String],
        model_override: Option<&str>,
    ) -> BTreeMap<String, String> {
        let mut models = BTreeMap::new();
        for name in to_dispatch {
            match name.as_str() {
                "openai" => {
                    let model = model_override
                        .unwrap_or(&self.config.models.openai_deep_research)
                        .to_string();
                    models.insert(name.clone(), model);
                }
                "gemini" => {
                    models.insert(name.clone(), self.config.models.gemini_deep_research.clone());
                }
                _ => {}
            }
        }
        models
    }
}

/// Trim, drop empties, and dedup while preserving request order.
fn normalize_providers(raw: &[String]) -> Vec<String> {
    let mut providers: Vec<String> = Vec::new();
    for name in raw {
        let name = name.trim();
        if name.is_empty() || providers.iter().any(|p| p == name) {
            continue;
        }
        providers.push(name.to_string());
    }
    providers
}

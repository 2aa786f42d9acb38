//! Research query generation and the prompt handed to research providers.
//!
//! Queries are proposed by a one-shot completion over the playground
//! context, then pass through a [`QueryReviewer`] before dispatch. The
//! reviewer is a seam: the CLI plugs in an interactive one, tests and
//! non-interactive runs use [`ApproveAll`].

use regex::Regex;

use crate::context::PlaygroundContext;
use crate::error::ProviderError;
use crate::providers::openai::OpenAiClient;

/// Generate research queries for a playground.
///
/// Returns the parsed query list, which may be empty if the model produced
/// nothing usable; callers decide whether that is fatal.
pub async fn generate_queries(
    client: &OpenAiClient,
    model: &str,
    ctx: &PlaygroundContext,
    focus: Option<&str>,
) -> Result<Vec<String>, ProviderError> {
    let prompt = build_query_prompt(ctx, focus);
    let raw = client.respond(model, None, &prompt).await?;
    Ok(parse_queries(&raw))
}

/// Assemble the query generation prompt from the context bundle.
fn build_query_prompt(ctx: &PlaygroundContext, focus: Option<&str>) -> String {
    let focus_instruction = focus
        .map(|f| format!("Pay special attention to this focus area: {}", f))
        .unwrap_or_default();

    format!(
        r#"You are a research assistant for an interactive scientific playground website.

Given the following playground context, generate 4-6 deep research queries that would help produce a comprehensive research companion document for this playground.

The queries should:
1. Cover the core scientific foundations and key theories behind the playground
2. Explore recent advances and open questions in the field
3. Investigate cross-disciplinary connections suggested by the playground's topics
4. Look for empirical evidence, experimental results, or real-world applications
5. Examine critical perspectives or limitations of the models used

{focus_instruction}

Output ONLY the queries, one per line, numbered. Each query should be a complete, specific research question suitable for deep research APIs.

## Playground Context

{context}
"#,
        focus_instruction = focus_instruction,
        context = ctx.to_prompt(),
    )
}

/// Parse model output into individual queries.
///
/// One query per non-empty line, with any leading "1. " / "1) " numbering
/// stripped. Lines that are nothing but numbering are dropped.
pub fn parse_queries(raw: &str) -> Vec<String> {
    let leading_number = Regex::new(r"^\d+[.)]\s*").unwrap();

    let mut queries = Vec::new();
    for line in raw.trim().lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let cleaned = leading_number.replace(line, "");
        if !cleaned.is_empty() {
            queries.push(cleaned.to_string());
        }
    }
    queries
}

/// Concatenate reviewed queries into the single prompt submitted to every
/// research provider.
pub fn build_research_prompt(ctx: &PlaygroundContext, queries: &[String]) -> String {
    let numbered = queries
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# Deep Research Request: {title}\n\n\
         ## Context\n\n\
         This research is for an interactive scientific playground about: {description}\n\
         Topics: {topics}\n\
         Operations: {operations}\n\n\
         ## Research Questions\n\n\
         {queries}\n\n\
         ## Instructions\n\n\
         Please provide comprehensive, well-sourced answers to the above research questions. \
         Include specific citations, data, and references where available. \
         Focus on academic and scientific rigor while remaining accessible. \
         Cover both established knowledge and recent developments.",
        title = ctx.title,
        description = ctx.description,
        topics = ctx.topics.join(", "),
        operations = ctx.operations.join(", "),
        queries = numbered,
    )
}

/// Seam for reviewing generated queries before research dispatch.
pub trait QueryReviewer {
    /// Review proposed queries and return the final set.
    ///
    /// Returning an empty set means "no decision"; the caller falls back
    /// to the original queries rather than dispatching nothing.
    fn review(&self, queries: Vec<String>) -> Vec<String>;
}

/// A reviewer that approves every query unchanged.
pub struct ApproveAll;

impl QueryReviewer for ApproveAll {
    fn review(&self, queries: Vec<String>) -> Vec<String> {
        queries
    }
}

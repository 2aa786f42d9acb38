//! Cross-provider synthesis.
//!
//! Folds completed research results into a single model call and parses
//! the response into the content/suggestions document pair. Parsing never
//! fails: when neither document can be located, the whole response becomes
//! the content document and a fixed notice stands in for suggestions.

use crate::context::PlaygroundContext;
use crate::error::{ResearcherError, Result};
use crate::providers::openai::OpenAiClient;
use crate::types::{ResearchResult, SynthesisOutput};

/// Instructions for the synthesis model.
pub const SYNTHESIS_SYSTEM_PROMPT: &str = r#"You are a scientific writer producing a research companion document for an interactive educational playground on piatra.institute.

Your task is to synthesize deep research findings into two documents:

1. **content.md** — A 5-10 page research companion (3000-6000 words) that:
   - Opens with a brief introduction connecting to the playground's topic
   - Covers theoretical foundations with proper academic depth
   - Includes relevant empirical evidence and experimental results
   - Discusses cross-disciplinary connections
   - Addresses limitations and open questions
   - Concludes with future directions
   - Uses markdown formatting with headers (##, ###), emphasis, and lists
   - Includes inline citations as markdown links where available
   - Is written for an educated general audience (undergrad+ level)

2. **suggestions.md** — Improvement recommendations for the playground:
   - Scientific accuracy improvements
   - Additional parameters or visualizations to add
   - Missing concepts or models to incorporate
   - UI/UX suggestions for better learning
   - References to key papers or datasets
   - Each suggestion should be actionable and specific

Format your response as:

```content.md
[full content here]
```

```suggestions.md
[full suggestions here]
```
"#;

/// Stand-in suggestions document used when none could be parsed.
pub const NO_SUGGESTIONS_FALLBACK: &str =
    "No suggestions could be extracted from the synthesis.";

/// Synthesize completed research results into the two output documents.
///
/// Only completed results with content contribute; passing none of those
/// is an error, there is nothing to write in that case.
pub async fn synthesize(
    client: &OpenAiClient,
    model: &str,
    ctx: &PlaygroundContext,
    results: &[ResearchResult],
) -> Result<SynthesisOutput> {
    let sections = research_sections(results);
    if sections.is_empty() {
        return Err(ResearcherError::NoCompletedResults);
    }

    let user_prompt = build_synthesis_prompt(ctx, &sections);
    let raw = client
        .respond(model, Some(SYNTHESIS_SYSTEM_PROMPT), &user_prompt)
        .await?;

    Ok(parse_synthesis(&raw))
}

/// One markdown section per completed result, in input order.
fn research_sections(results: &[ResearchResult]) -> Vec<String> {
    results
        .iter()
        .filter(|r| r.is_completed() && !r.content.is_empty())
        .map(|r| format!("## Research from {} ({})\n\n{}", r.provider, r.model, r.content))
        .collect()
}

fn build_synthesis_prompt(ctx: &PlaygroundContext, sections: &[String]) -> String {
    format!(
        "## Playground Context\n\n\
         **Title:** {title}\n\
         **Description:** {description}\n\
         **Topics:** {topics}\n\
         **Operations:** {operations}\n\
         **Date:** {date}\n\n\
         {context}\n\n\
         ---\n\n\
         ## Deep Research Findings\n\n\
         {findings}\n\n\
         ---\n\n\
         Please synthesize the above research findings into a content.md and suggestions.md \
         as described in your instructions.\n",
        title = ctx.title,
        description = ctx.description,
        topics = ctx.topics.join(", "),
        operations = ctx.operations.join(", "),
        date = ctx.date,
        context = ctx.to_prompt(),
        findings = sections.join("\n"),
    )
}

/// Split a raw synthesis response into the two documents.
///
/// Each document is located by a fenced block whose info string is the
/// document name, falling back to a markdown heading carrying the name.
/// When neither document is found at all, the entire response is kept as
/// content so nothing the model wrote is lost.
pub fn parse_synthesis(raw: &str) -> SynthesisOutput {
    let content = extract_labeled_block(raw, "content.md");
    let suggestions = extract_labeled_block(raw, "suggestions.md");

    if content.is_empty() && suggestions.is_empty() {
        return SynthesisOutput {
            content: raw.to_string(),
            suggestions: NO_SUGGESTIONS_FALLBACK.to_string(),
        };
    }

    SynthesisOutput {
        content,
        suggestions,
    }
}

fn extract_labeled_block(text: &str, label: &str) -> String {
    if let Some(block) = extract_fenced_block(text, label) {
        return block;
    }
    extract_heading_section(text, label).unwrap_or_default()
}

/// Scan for a fence line whose info string is exactly `label` and capture
/// until its matching close.
///
/// Fences nest: a line opening another fenced block inside the document
/// deepens the scan, so code examples in the synthesized text survive. An
/// unterminated block is treated as not found.
fn extract_fenced_block(text: &str, label: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();

    let mut i = 0;
    while i < lines.len() {
        if let Some(info) = lines[i].trim().strip_prefix("```")
            && info.trim() == label
        {
            let mut depth = 1usize;
            let mut block: Vec<&str> = Vec::new();
            for line in &lines[i + 1..] {
                let trimmed = line.trim();
                if let Some(rest) = trimmed.strip_prefix("```") {
                    if rest.trim().is_empty() {
                        depth -= 1;
                        if depth == 0 {
                            return Some(block.join("\n").trim().to_string());
                        }
                    } else {
                        depth += 1;
                    }
                }
                block.push(line);
            }
            return None;
        }
        i += 1;
    }
    None
}

/// Capture the section under a heading whose text is exactly `label`.
///
/// The section runs until the next heading of the same or higher weight;
/// deeper subsections belong to the captured document.
fn extract_heading_section(text: &str, label: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        if let Some(level) = heading_level(line)
            && line[level..].trim() == label
        {
            let mut section: Vec<&str> = Vec::new();
            for line in &lines[i + 1..] {
                if let Some(next_level) = heading_level(line)
                    && next_level <= level
                {
                    break;
                }
                section.push(line);
            }
            return Some(section.join("\n").trim().to_string());
        }
    }
    None
}

/// Heading weight of a line, if it is an ATX heading.
fn heading_level(line: &str) -> Option<usize> {
    let count = line.chars().take_while(|&c| c == '#').count();
    if count == 0 || count > 6 {
        return None;
    }
    let rest = &line[count..];
    if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t') {
        Some(count)
    } else {
        None
    }
}

//! Line-oriented progress rendering for research runs.
//!
//! Provider tasks stream updates through the core's progress channel; the
//! renderer folds them into a [`ProgressTracker`] snapshot and prints one
//! line per change. Deep research runs for many minutes between updates,
//! so a scrolling log reads better in practice than a live table and
//! survives piping to a file.

use researcher_core::progress::{JobPhase, ProgressTracker, ProgressUpdate, format_elapsed};
use researcher_core::types::ResearchResult;
use tokio::sync::mpsc;

/// Drain progress updates until every sender is gone, printing each one.
pub async fn render_progress(
    providers: Vec<String>,
    mut rx: mpsc::UnboundedReceiver<ProgressUpdate>,
) {
    let mut tracker = ProgressTracker::new(&providers);

    while let Some(update) = rx.recv().await {
        tracker.apply(&update);
        let row = tracker
            .snapshot()
            .iter()
            .find(|r| r.provider == update.provider);
        let elapsed = row
            .and_then(|r| r.elapsed())
            .map(format_elapsed)
            .unwrap_or_default();
        println!("{}", format_line(&update, &elapsed));
    }
}

fn format_line(update: &ProgressUpdate, elapsed: &str) -> String {
    format!(
        "  {:<10} {:<11} {:>7}  {}",
        update.provider,
        update.phase.to_string(),
        elapsed,
        update.message
    )
}

/// Print the per-provider outcome table after the run finishes.
pub fn print_summary(results: &[ResearchResult]) {
    println!("\n  Results:");
    for result in results {
        if result.is_completed() {
            println!(
                "  {:<10} completed  {} chars ({})",
                result.provider,
                result.content.len(),
                result.model
            );
        } else {
            println!(
                "  {:<10} {}  {}",
                result.provider,
                result.status,
                truncate(&result.error, 60)
            );
        }
    }
}

/// Shorten long error text for the one-line summary; the full message was
/// already streamed by the renderer and logged.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

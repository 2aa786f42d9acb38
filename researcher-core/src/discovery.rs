//! Playground discovery.
//!
//! Playgrounds live under `app/playgrounds/(YYYY)/(MM)/<slug>/` route groups
//! in the target project. Discovery walks exactly that shape: parenthesized
//! year and month directories, then a slug directory containing page.tsx.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{ResearcherError, Result};

/// One discovered playground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaygroundEntry {
    pub name: String,
    pub path: PathBuf,
    pub year: String,
    pub month: String,
}

fn is_route_group(component: &Path) -> bool {
    component
        .file_name()
        .map(|n| {
            let name = n.to_string_lossy();
            name.starts_with('(') && name.ends_with(')')
        })
        .unwrap_or(false)
}

fn strip_parens(component: &Path) -> String {
    component
        .file_name()
        .map(|n| n.to_string_lossy().trim_matches(|c| c == '(' || c == ')').to_string())
        .unwrap_or_default()
}

/// Walk the playgrounds tree and collect every playground directory, sorted
/// by year, month, then slug.
fn scan_playgrounds(playgrounds_dir: &Path) -> Vec<PlaygroundEntry> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(playgrounds_dir)
        .min_depth(3)
        .max_depth(3)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_dir() || !entry.path().join("page.tsx").exists() {
            continue;
        }
        let month_dir = match entry.path().parent() {
            Some(p) => p,
            None => continue,
        };
        let year_dir = match month_dir.parent() {
            Some(p) => p,
            None => continue,
        };
        if !is_route_group(month_dir) || !is_route_group(year_dir) {
            continue;
        }

        entries.push(PlaygroundEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            path: entry.path().to_path_buf(),
            year: strip_parens(year_dir),
            month: strip_parens(month_dir),
        });
    }

    entries
}

/// Find a playground directory by its slug name.
pub fn find_playground(
    name: &str,
    project_root: &Path,
    playgrounds_dir: &str,
) -> Result<PathBuf> {
    let root = project_root.join(playgrounds_dir);
    if !root.is_dir() {
        return Err(ResearcherError::PlaygroundsDirMissing { path: root });
    }

    scan_playgrounds(&root)
        .into_iter()
        .find(|entry| entry.name == name)
        .map(|entry| entry.path)
        .ok_or_else(|| ResearcherError::PlaygroundNotFound {
            name: name.to_string(),
            searched: root,
        })
}

/// List all available playgrounds. Returns an empty list when the
/// playgrounds directory does not exist.
pub fn list_playgrounds(project_root: &Path, playgrounds_dir: &str) -> Vec<PlaygroundEntry> {
    let root = project_root.join(playgrounds_dir);
    if !root.is_dir() {
        return Vec::new();
    }
    scan_playgrounds(&root)
}

/// Walk up from the current directory looking for the target project root
/// (a `package.json` next to an `app/` directory).
pub fn detect_project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    for dir in cwd.ancestors().take(6) {
        if dir.join("package.json").exists() && dir.join("app").is_dir() {
            return Ok(dir.to_path_buf());
        }
    }
    Err(ResearcherError::ProjectRootNotFound)
}

//! Research output files.
//!
//! A finished run materializes under the playground's `research/` directory
//! as `content.md` (the synthesized companion document), `suggestions.md`
//! (improvement ideas), and a generated `page.tsx` that renders the content
//! on the site. The page is regenerated on every run so template changes
//! propagate without manual edits.

use std::io;
use std::path::{Path, PathBuf};

use crate::context::PlaygroundContext;
use crate::persistence;

/// Write the research output files and return the `research/` directory.
pub fn write_output(
    playground_dir: &Path,
    ctx: &PlaygroundContext,
    content_md: &str,
    suggestions_md: &str,
) -> io::Result<PathBuf> {
    let research_dir = playground_dir.join("research");

    persistence::atomic_write(&research_dir.join("content.md"), content_md.as_bytes())?;
    persistence::atomic_write(
        &research_dir.join("suggestions.md"),
        suggestions_md.as_bytes(),
    )?;

    let content_path = content_md_path(&research_dir, &ctx.name);
    let page = render_page(&content_path, &ctx.title);
    persistence::atomic_write(&research_dir.join("page.tsx"), page.as_bytes())?;

    Ok(research_dir)
}

/// Project-relative path to `content.md`, for the page's `fs.readFileSync`.
///
/// Playgrounds live under `app/playgrounds/...`, so the project-relative
/// path starts at the first `app/` component of the absolute path. When the
/// playground sits outside any `app/` tree the canonical layout is assumed.
fn content_md_path(research_dir: &Path, playground_name: &str) -> String {
    let full = research_dir.join("content.md");
    let full = full.to_string_lossy();
    match full.find("app/") {
        Some(idx) => full[idx..].to_string(),
        None => format!("app/playgrounds/{}/research/content.md", playground_name),
    }
}

fn render_page(content_path: &str, title: &str) -> String {
    format!(
        r#"import {{ Metadata }} from 'next';
import {{ defaultOpenGraph }} from '@/data/metadata';
import fs from 'fs';
import path from 'path';

import ResearchRenderer from '@/components/ResearchRenderer';

const content = fs.readFileSync(
    path.join(process.cwd(), '{content_path}'),
    'utf-8',
);

export const metadata: Metadata = {{
    title: '{title} · research · playgrounds',
    description: 'research companion for {title}',

    openGraph: {{
        ...defaultOpenGraph,
        title: '{title} · research · playgrounds · piatra.institute',
        description: 'research companion for {title}',
    }},
}};

export default function ResearchPage() {{
    return (
        <div className="min-h-screen bg-black">
            <div className="max-w-3xl mx-auto px-4 sm:px-8 py-16">
                <ResearchRenderer content={{content}} />
            </div>
        </div>
    );
}}
"#,
        content_path = content_path,
        title = title,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_context() -> PlaygroundContext {
        PlaygroundContext {
            name: "meaning-autogenesis".into(),
            title: "meaning autogenesis".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_write_output_creates_files() {
        let dir = TempDir::new().unwrap();
        let playground = dir
            .path()
            .join("app")
            .join("playgrounds")
            .join("meaning-autogenesis");
        std::fs::create_dir_all(&playground).unwrap();

        let research_dir =
            write_output(&playground, &test_context(), "# Research\n", "- Idea\n").unwrap();

        assert_eq!(research_dir, playground.join("research"));
        assert_eq!(
            std::fs::read_to_string(research_dir.join("content.md")).unwrap(),
            "# Research\n"
        );
        assert_eq!(
            std::fs::read_to_string(research_dir.join("suggestions.md")).unwrap(),
            "- Idea\n"
        );
        assert!(research_dir.join("page.tsx").is_file());
    }

    #[test]
    fn test_page_path_starts_at_app_component() {
        let dir = TempDir::new().unwrap();
        let playground = dir
            .path()
            .join("app")
            .join("playgrounds")
            .join("(2025)")
            .join("(07)")
            .join("meaning-autogenesis");
        std::fs::create_dir_all(&playground).unwrap();

        write_output(&playground, &test_context(), "c", "s").unwrap();

        let page = std::fs::read_to_string(playground.join("research").join("page.tsx")).unwrap();
        assert!(page.contains(
            "'app/playgrounds/(2025)/(07)/meaning-autogenesis/research/content.md'"
        ));
    }

    #[test]
    fn test_page_path_falls_back_to_canonical_layout() {
        let dir = TempDir::new().unwrap();
        let playground = dir.path().join("meaning-autogenesis");
        std::fs::create_dir_all(&playground).unwrap();

        write_output(&playground, &test_context(), "c", "s").unwrap();

        let page = std::fs::read_to_string(playground.join("research").join("page.tsx")).unwrap();
        assert!(page.contains("'app/playgrounds/meaning-autogenesis/research/content.md'"));
    }

    #[test]
    fn test_rendered_page_shape() {
        let page = render_page("app/playgrounds/x/research/content.md", "canal waves");

        assert!(page.starts_with("import { Metadata } from 'next';"));
        assert!(page.contains("title: 'canal waves · research · playgrounds',"));
        assert!(page.contains("description: 'research companion for canal waves',"));
        assert!(page.contains("...defaultOpenGraph,"));
        assert!(page.contains("<ResearchRenderer content={content} />"));
        assert!(page.ends_with("}\n"));
    }

    #[test]
    fn test_output_overwrites_previous_run() {
        let dir = TempDir::new().unwrap();
        let playground = dir.path().join("pg");
        std::fs::create_dir_all(&playground).unwrap();

        write_output(&playground, &test_context(), "first", "a").unwrap();
        write_output(&playground, &test_context(), "second", "b").unwrap();

        let research_dir = playground.join("research");
        assert_eq!(
            std::fs::read_to_string(research_dir.join("content.md")).unwrap(),
            "second"
        );
        assert_eq!(
            std::fs::read_to_string(research_dir.join("suggestions.md")).unwrap(),
            "b"
        );
    }
}

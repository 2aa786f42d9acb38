//! Playground context extraction.
//!
//! Reads a playground's files and builds the context bundle that grounds
//! query generation and synthesis: page metadata, the main component, logic
//! files, ideation materials, and the playground's entry in the data.ts
//! catalog.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

/// All extracted context for a playground.
#[derive(Debug, Clone, Default)]
pub struct PlaygroundContext {
    /// Directory slug (e.g. "hsp90-canalization").
    pub name: String,
    /// Display title from page.tsx metadata, falling back to the slug.
    pub title: String,
    pub description: String,
    /// Publication date from the data.ts entry.
    pub date: String,
    pub topics: Vec<String>,
    pub operations: Vec<String>,
    pub page_tsx: String,
    pub playground_tsx: String,
    /// logic/*.ts and *.tsx sources, keyed by file name, sorted.
    pub logic_files: BTreeMap<String, String>,
    /// ideation/info.md contents, when present.
    pub ideation_info: String,
    /// ideation/demo.xtsx contents, when present.
    pub ideation_demo: String,
    /// Raw entry block from app/playgrounds/data.ts.
    pub data_entry: String,
}

impl PlaygroundContext {
    /// Format the bundle as a markdown section for LLM consumption.
    pub fn to_prompt(&self) -> String {
        let mut sections = vec![
            format!("# Playground: {}", self.title),
            format!("**Slug:** {}", self.name),
            format!("**Description:** {}", self.description),
            format!("**Date:** {}", self.date),
            format!("**Topics:** {}", self.topics.join(", ")),
            format!("**Operations:** {}", self.operations.join(", ")),
        ];

        if !self.ideation_info.is_empty() {
            sections.push(format!(
                "\n## Ideation / Concept Document\n\n{}",
                self.ideation_info
            ));
        }

        if !self.playground_tsx.is_empty() {
            sections.push(format!(
                "\n## Main Playground Component (playground.tsx)\n\n```tsx\n{}\n```",
                self.playground_tsx
            ));
        }

        for (filename, content) in &self.logic_files {
            sections.push(format!("\n## Logic: {}\n\n```ts\n{}\n```", filename, content));
        }

        if !self.ideation_demo.is_empty() {
            sections.push(format!(
                "\n## Ideation Demo Code\n\n```tsx\n{}\n```",
                self.ideation_demo
            ));
        }

        sections.join("\n")
    }
}

/// Extract a string field value from page.tsx metadata.
///
/// Handles both `title: 'value'` on one line and the value broken onto the
/// following line.
fn extract_metadata_field(content: &str, field_name: &str) -> Option<String> {
    let inline = Regex::new(&format!(
        r#"{}:\s*['"](.+?)['"]"#,
        regex::escape(field_name)
    ))
    .unwrap();
    if let Some(captures) = inline.captures(content) {
        return Some(captures[1].to_string());
    }

    let broken = Regex::new(&format!(
        r#"{}:\s*\n\s*['"](.+?)['"]"#,
        regex::escape(field_name)
    ))
    .unwrap();
    broken.captures(content).map(|c| c[1].to_string())
}

fn parse_string_list(entry: &str, field_name: &str) -> Vec<String> {
    let re = Regex::new(&format!(
        r"{}:\s*\[([^\]]+)\]",
        regex::escape(field_name)
    ))
    .unwrap();
    match re.captures(entry) {
        Some(captures) => captures[1]
            .split(',')
            .map(|part| part.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        None => Vec::new(),
    }
}

/// Extract a playground's entry block from data.ts.
///
/// Returns (raw_entry, topics, operations, date); all empty when the catalog
/// or the entry is missing.
fn extract_data_entry(
    data_ts_path: &Path,
    playground_link: &str,
) -> (String, Vec<String>, Vec<String>, String) {
    let Ok(content) = std::fs::read_to_string(data_ts_path) else {
        return (String::new(), Vec::new(), Vec::new(), String::new());
    };

    let escaped = regex::escape(playground_link);
    let single = Regex::new(&format!(r"\{{[^}}]*link:\s*'{}'[^}}]*\}}", escaped)).unwrap();
    let double = Regex::new(&format!(r#"\{{[^}}]*link:\s*"{}"[^}}]*\}}"#, escaped)).unwrap();

    let entry = match single.find(&content).or_else(|| double.find(&content)) {
        Some(found) => found.as_str().to_string(),
        None => return (String::new(), Vec::new(), Vec::new(), String::new()),
    };

    let topics = parse_string_list(&entry, "topics");
    let operations = parse_string_list(&entry, "operations");

    let date_re = Regex::new(r#"date:\s*['"](.+?)['"]"#).unwrap();
    let date = date_re
        .captures(&entry)
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    (entry, topics, operations, date)
}

fn read_if_exists(path: &Path) -> Result<String> {
    if path.exists() {
        Ok(std::fs::read_to_string(path)?)
    } else {
        Ok(String::new())
    }
}

/// Build a complete context bundle from a playground directory.
pub fn build_context(playground_dir: &Path, project_root: &Path) -> Result<PlaygroundContext> {
    let name = playground_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let link = format!("/playgrounds/{}", name);

    let page_tsx = read_if_exists(&playground_dir.join("page.tsx"))?;
    let mut title = name.replace('-', " ");
    let mut description = String::new();
    if !page_tsx.is_empty() {
        if let Some(extracted) = extract_metadata_field(&page_tsx, "title") {
            // Page titles read "name · playgrounds"; keep just the name.
            title = extracted
                .split('·')
                .next()
                .unwrap_or(&extracted)
                .trim()
                .to_string();
        }
        if let Some(extracted) = extract_metadata_field(&page_tsx, "description") {
            description = extracted;
        }
    }

    let playground_tsx = read_if_exists(&playground_dir.join("playground.tsx"))?;

    let mut logic_files = BTreeMap::new();
    let logic_dir = playground_dir.join("logic");
    if logic_dir.is_dir() {
        for entry in std::fs::read_dir(&logic_dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_logic_source = path
                .extension()
                .is_some_and(|ext| ext == "ts" || ext == "tsx");
            if path.is_file() && is_logic_source {
                let filename = entry.file_name().to_string_lossy().to_string();
                logic_files.insert(filename, std::fs::read_to_string(&path)?);
            }
        }
    }

    let ideation_dir = playground_dir.join("ideation");
    let ideation_info = read_if_exists(&ideation_dir.join("info.md"))?;
    let ideation_demo = read_if_exists(&ideation_dir.join("demo.xtsx"))?;

    let data_ts_path = project_root.join("app").join("playgrounds").join("data.ts");
    let (data_entry, topics, operations, date) = extract_data_entry(&data_ts_path, &link);

    Ok(PlaygroundContext {
        name,
        title,
        description,
        date,
        topics,
        operations,
        page_tsx,
        playground_tsx,
        logic_files,
        ideation_info,
        ideation_demo,
        data_entry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAGE_TSX: &str = r#"
import { Metadata } from 'next';

export const metadata: Metadata = {
    title: 'meaning autogenesis · playgrounds',
    description: 'how symbols bootstrap themselves into meaning',
};
"#;

    const DATA_TS: &str = r#"
export const playgrounds = [
    {
        name: 'Meaning Autogenesis',
        link: '/playgrounds/meaning-autogenesis',
        date: '2025-07-12',
        topics: ['semiotics', 'emergence'],
        operations: ['simulate', 'perturb'],
    },
    {
        name: 'Other',
        link: '/playgrounds/other',
        date: '2025-01-01',
        topics: ['misc'],
        operations: ['view'],
    },
];
"#;

    fn make_playground(dir: &TempDir) -> std::path::PathBuf {
        let root = dir.path();
        let playground = root
            .join("app")
            .join("playgrounds")
            .join("(2025)")
            .join("(07)")
            .join("meaning-autogenesis");
        std::fs::create_dir_all(&playground).unwrap();
        std::fs::write(playground.join("page.tsx"), PAGE_TSX).unwrap();
        std::fs::write(playground.join("playground.tsx"), "export default 1;").unwrap();
        std::fs::write(root.join("app").join("playgrounds").join("data.ts"), DATA_TS).unwrap();
        playground
    }

    #[test]
    fn test_build_context_extracts_metadata() {
        let dir = TempDir::new().unwrap();
        let playground = make_playground(&dir);

        let ctx = build_context(&playground, dir.path()).unwrap();
        assert_eq!(ctx.name, "meaning-autogenesis");
        assert_eq!(ctx.title, "meaning autogenesis");
        assert_eq!(ctx.description, "how symbols bootstrap themselves into meaning");
        assert_eq!(ctx.date, "2025-07-12");
        assert_eq!(ctx.topics, vec!["semiotics", "emergence"]);
        assert_eq!(ctx.operations, vec!["simulate", "perturb"]);
        assert!(ctx.data_entry.contains("meaning-autogenesis"));
    }

    #[test]
    fn test_build_context_title_falls_back_to_slug() {
        let dir = TempDir::new().unwrap();
        let playground = dir.path().join("bare-playground");
        std::fs::create_dir_all(&playground).unwrap();

        let ctx = build_context(&playground, dir.path()).unwrap();
        assert_eq!(ctx.title, "bare playground");
        assert!(ctx.description.is_empty());
        assert!(ctx.topics.is_empty());
    }

    #[test]
    fn test_logic_files_sorted_by_name() {
        let dir = TempDir::new().unwrap();
        let playground = make_playground(&dir);
        let logic = playground.join("logic");
        std::fs::create_dir_all(&logic).unwrap();
        std::fs::write(logic.join("b-model.ts"), "export const b = 2;").unwrap();
        std::fs::write(logic.join("a-model.ts"), "export const a = 1;").unwrap();
        std::fs::write(logic.join("notes.txt"), "ignored").unwrap();

        let ctx = build_context(&playground, dir.path()).unwrap();
        let names: Vec<&String> = ctx.logic_files.keys().collect();
        assert_eq!(names, vec!["a-model.ts", "b-model.ts"]);
    }

    #[test]
    fn test_metadata_field_on_broken_line() {
        let content = "metadata = {\n    title:\n        'broken line title · playgrounds',\n}";
        let title = extract_metadata_field(content, "title").unwrap();
        assert_eq!(title, "broken line title · playgrounds");
    }

    #[test]
    fn test_data_entry_double_quoted_link() {
        let dir = TempDir::new().unwrap();
        let data_ts = dir.path().join("data.ts");
        std::fs::write(
            &data_ts,
            "{ link: \"/playgrounds/x\", date: \"2024-03-01\", topics: [\"a\"], operations: [\"b\"] }",
        )
        .unwrap();

        let (entry, topics, operations, date) = extract_data_entry(&data_ts, "/playgrounds/x");
        assert!(!entry.is_empty());
        assert_eq!(topics, vec!["a"]);
        assert_eq!(operations, vec!["b"]);
        assert_eq!(date, "2024-03-01");
    }

    #[test]
    fn test_data_entry_missing_catalog() {
        let (entry, topics, operations, date) =
            extract_data_entry(Path::new("/nonexistent/data.ts"), "/playgrounds/x");
        assert!(entry.is_empty());
        assert!(topics.is_empty());
        assert!(operations.is_empty());
        assert!(date.is_empty());
    }

    #[test]
    fn test_to_prompt_includes_sections() {
        let mut ctx = PlaygroundContext {
            name: "meaning-autogenesis".into(),
            title: "meaning autogenesis".into(),
            description: "symbols".into(),
            date: "2025-07-12".into(),
            topics: vec!["semiotics".into()],
            operations: vec!["simulate".into()],
            ..Default::default()
        };
        ctx.ideation_info = "The core idea.".into();
        ctx.logic_files
            .insert("model.ts".into(), "export const k = 1;".into());

        let prompt = ctx.to_prompt();
        assert!(prompt.starts_with("# Playground: meaning autogenesis"));
        assert!(prompt.contains("**Topics:** semiotics"));
        assert!(prompt.contains("## Ideation / Concept Document"));
        assert!(prompt.contains("## Logic: model.ts"));
        assert!(!prompt.contains("## Ideation Demo Code"));
    }
}

//! Markdown index of every analysis written under a root directory.
//!
//! Artifacts are found by walking `root` for directories named
//! `output_dir`, then grouped by the language of the source file that sits
//! next to each such directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::conversation::QuestionSpec;
use crate::error::AnalyzerError;
use crate::prompts::language_for;
use crate::scanner::EligibilityRules;

/// Analyses of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Source file name, or the bare stem when the source is gone.
    pub name: String,
    /// `(label, path relative to root)` in question order.
    pub links: Vec<(String, PathBuf)>,
}

/// Entries grouped by language name, each group sorted by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisIndex {
    pub sections: Vec<(String, Vec<IndexEntry>)>,
}

impl AnalysisIndex {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn render(&self, generated_on: &str) -> String {
        let mut out = String::new();
        out.push_str("# Comprehensive Code Analysis Index\n\n");
        out.push_str(&format!("Generated on: {generated_on}\n\n"));
        out.push_str(
            "This index links to step-by-step explanations of every analyzed code file.\n\n",
        );

        for (language, entries) in &self.sections {
            out.push_str(&format!("## {language} Files\n\n"));
            for entry in entries {
                out.push_str(&format!("### {}\n\n", entry.name));
                for (label, path) in &entry.links {
                    let link = path.to_string_lossy().replace('\\', "/");
                    out.push_str(&format!("* [{label}]({link})\n"));
                }
                out.push('\n');
            }
        }
        out
    }
}

/// Where the index for `output_dir` is written.
pub fn index_path(root: &Path, output_dir: &str) -> PathBuf {
    root.join(format!("{output_dir}_index.md"))
}

/// Collect every analysis below `root`.
pub fn build_index(
    root: &Path,
    output_dir: &str,
    questions: &QuestionSpec,
    rules: &EligibilityRules,
) -> AnalysisIndex {
    // (analysis dir, stem) -> artifact paths by question index
    let mut found: BTreeMap<(PathBuf, String), BTreeMap<usize, PathBuf>> = BTreeMap::new();

    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(dir) = path.parent() else { continue };
        if dir.file_name().is_none_or(|name| name != output_dir) {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        for (index, question) in questions.iter().enumerate() {
            if let Some(stem) = file_name.strip_suffix(question.suffix.as_str()) {
                found
                    .entry((dir.to_path_buf(), stem.to_string()))
                    .or_default()
                    .insert(index, path.to_path_buf());
                break;
            }
        }
    }

    let mut by_language: BTreeMap<usize, (String, Vec<(IndexEntry, PathBuf)>)> = BTreeMap::new();
    let order = |language: &str| {
        rules
            .extensions
            .iter()
            .position(|ext| language_for(Path::new(&format!("x.{ext}"))) == language)
            .unwrap_or(usize::MAX)
    };

    for ((dir, stem), artifacts) in found {
        let source_dir = dir.parent().unwrap_or(root);
        let source = rules
            .extensions
            .iter()
            .map(|ext| source_dir.join(format!("{stem}.{ext}")))
            .find(|candidate| candidate.is_file());

        let (name, language) = match &source {
            Some(path) => (
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| stem.clone()),
                language_for(path),
            ),
            None => {
                debug!(dir = %dir.display(), stem = %stem, "source not found, listing under C");
                (stem.clone(), "C")
            }
        };

        let links = artifacts
            .into_iter()
            .filter_map(|(index, path)| {
                let label = questions.get(index)?.label.clone();
                let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                Some((label, rel))
            })
            .collect();

        by_language
            .entry(order(language))
            .or_insert_with(|| (language.to_string(), Vec::new()))
            .1
            .push((IndexEntry { name, links }, dir));
    }

    let sections = by_language
        .into_values()
        .map(|(language, mut entries)| {
            entries.sort_by(|(a, a_dir), (b, b_dir)| a.name.cmp(&b.name).then(a_dir.cmp(b_dir)));
            (language, entries.into_iter().map(|(entry, _)| entry).collect())
        })
        .collect();

    AnalysisIndex { sections }
}

/// Build the index and write it to `<root>/<output_dir>_index.md`.
pub fn write_index(
    root: &Path,
    output_dir: &str,
    questions: &QuestionSpec,
    rules: &EligibilityRules,
) -> Result<PathBuf, AnalyzerError> {
    let index = build_index(root, output_dir, questions, rules);
    if index.is_empty() {
        warn!(root = %root.display(), output_dir, "no analysis artifacts found, index will be empty");
    }
    let generated_on = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let path = index_path(root, output_dir);

    fs::write(&path, index.render(&generated_on)).map_err(|source| AnalyzerError::Artifact {
        path: path.clone(),
        source,
    })?;
    let files: usize = index.sections.iter().map(|(_, entries)| entries.len()).sum();
    info!(path = %path.display(), files, "analysis index written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::default_questions;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn build(root: &Path) -> AnalysisIndex {
        build_index(
            root,
            "docs",
            &default_questions(),
            &EligibilityRules::default(),
        )
    }

    #[test]
    fn groups_entries_by_language() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "gpio/led.c");
        touch(root, "gpio/docs/led_overview.md");
        touch(root, "gpio/docs/led_line_by_line.md");
        touch(root, "gpio/docs/led_improvements.md");
        touch(root, "app/cam.cpp");
        touch(root, "app/docs/cam_overview.md");
        touch(root, "board/pi.dts");
        touch(root, "board/docs/pi_improvements.md");

        let index = build(root);

        let languages: Vec<&str> = index.sections.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(languages, vec!["C", "C++", "Device Tree Source"]);

        let (_, c_entries) = &index.sections[0];
        assert_eq!(c_entries.len(), 1);
        assert_eq!(c_entries[0].name, "led.c");
        assert_eq!(
            c_entries[0].links,
            vec![
                ("Overview".to_string(), PathBuf::from("gpio/docs/led_overview.md")),
                (
                    "Step-by-Step Explanation".to_string(),
                    PathBuf::from("gpio/docs/led_line_by_line.md")
                ),
                (
                    "Suggested Improvements".to_string(),
                    PathBuf::from("gpio/docs/led_improvements.md")
                ),
            ]
        );
        assert_eq!(index.sections[1].1[0].name, "cam.cpp");
        assert_eq!(index.sections[2].1[0].links.len(), 1);
    }

    #[test]
    fn orphaned_analyses_are_listed_under_c() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "docs/ghost_overview.md");

        let index = build(tmp.path());

        assert_eq!(index.sections.len(), 1);
        assert_eq!(index.sections[0].0, "C");
        assert_eq!(index.sections[0].1[0].name, "ghost");
    }

    #[test]
    fn entries_are_sorted_by_name() {
        let tmp = TempDir::new().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            touch(tmp.path(), &format!("{name}.c"));
            touch(tmp.path(), &format!("docs/{name}_overview.md"));
        }

        let index = build(tmp.path());

        let names: Vec<&str> = index.sections[0].1.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.c", "mid.c", "zeta.c"]);
    }

    #[test]
    fn ignores_files_outside_output_dirs() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "led.c");
        touch(tmp.path(), "notes/led_overview.md");
        touch(tmp.path(), "docs/readme.md");

        assert!(build(tmp.path()).is_empty());
    }

    #[test]
    fn render_layout() {
        let index = AnalysisIndex {
            sections: vec![(
                "C".to_string(),
                vec![IndexEntry {
                    name: "led.c".into(),
                    links: vec![("Overview".into(), PathBuf::from("docs/led_overview.md"))],
                }],
            )],
        };

        let text = index.render("2025-01-01 00:00:00");

        assert!(text.starts_with("# Comprehensive Code Analysis Index\n\nGenerated on: 2025-01-01 00:00:00\n"));
        assert!(text.contains("## C Files\n\n### led.c\n\n* [Overview](docs/led_overview.md)\n"));
    }

    #[test]
    fn writes_index_beside_root() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "led.c");
        touch(tmp.path(), "docs/led_overview.md");

        let path = write_index(
            tmp.path(),
            "docs",
            &default_questions(),
            &EligibilityRules::default(),
        )
        .unwrap();

        assert_eq!(path, tmp.path().join("docs_index.md"));
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("### led.c\n\n* [Overview](docs/led_overview.md)\n"));
    }

    #[test]
    fn empty_tree_still_writes_header() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "led.c");

        let path = write_index(
            tmp.path(),
            "docs",
            &default_questions(),
            &EligibilityRules::default(),
        )
        .unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert!(text.starts_with("# Comprehensive Code Analysis Index\n"));
        assert!(!text.contains("## "));
    }
}

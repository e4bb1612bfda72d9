//! Markdown artifacts written next to each analyzed file.
//!
//! For `drivers/led.c` and output directory `docs`, question *i* is stored in
//! `drivers/docs/led<suffix_i>` with a heading naming the source file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::conversation::{ArtifactWriter, QuestionSpec};
use crate::error::AnalyzerError;

/// Location of the artifact with `suffix` for `source`.
pub fn artifact_path(source: &Path, output_dir: &str, suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(output_dir)
        .join(format!("{stem}{suffix}"))
}

/// Whether every expected artifact of `source` is present on disk.
///
/// Only existence is checked; content is not compared with the source.
pub fn artifacts_exist(source: &Path, output_dir: &str, suffixes: &[String]) -> bool {
    !suffixes.is_empty()
        && suffixes
            .iter()
            .all(|suffix| artifact_path(source, output_dir, suffix).is_file())
}

/// Writes answers as markdown files beneath `<source dir>/<output_dir>/`.
pub struct MarkdownArtifacts<'a> {
    source: &'a Path,
    output_dir: &'a str,
    questions: &'a QuestionSpec,
}

impl<'a> MarkdownArtifacts<'a> {
    pub fn new(source: &'a Path, output_dir: &'a str, questions: &'a QuestionSpec) -> Self {
        Self {
            source,
            output_dir,
            questions,
        }
    }
}

impl ArtifactWriter for MarkdownArtifacts<'_> {
    fn write(&mut self, question: usize, content: &str) -> Result<PathBuf, AnalyzerError> {
        let spec = self.questions.get(question).ok_or_else(|| {
            AnalyzerError::Config(format!("no question with index {question}"))
        })?;
        let path = artifact_path(self.source, self.output_dir, &spec.suffix);

        if let Some(dir) = path.parent() {
            if !dir.is_dir() {
                fs::create_dir_all(dir).map_err(|source| AnalyzerError::Artifact {
                    path: dir.to_path_buf(),
                    source,
                })?;
                info!(dir = %dir.display(), "created output directory");
            }
        }

        let file_name = self
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let document = format!("# {}: {file_name}\n\n{content}", spec.heading);

        fs::write(&path, document).map_err(|source| AnalyzerError::Artifact {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::default_questions;
    use tempfile::TempDir;

    #[test]
    fn artifact_path_sits_beside_source() {
        let path = artifact_path(Path::new("drivers/gpio/led.c"), "docs", "_overview.md");
        assert_eq!(path, PathBuf::from("drivers/gpio/docs/led_overview.md"));
    }

    #[test]
    fn writes_heading_and_content() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("led.c");
        fs::write(&source, "int main() {}").unwrap();
        let questions = default_questions();
        let mut writer = MarkdownArtifacts::new(&source, "docs", &questions);

        let path = writer.write(0, "Blinks an LED.").unwrap();

        assert_eq!(path, tmp.path().join("docs").join("led_overview.md"));
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text, "# Code Overview: led.c\n\nBlinks an LED.");
    }

    #[test]
    fn unknown_question_index_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("led.c");
        let questions = default_questions();
        let mut writer = MarkdownArtifacts::new(&source, "docs", &questions);
        assert!(writer.write(99, "x").is_err());
    }

    #[test]
    fn blocked_output_directory_is_an_artifact_error() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("led.c");
        fs::write(tmp.path().join("docs"), "a file, not a directory").unwrap();
        let questions = default_questions();
        let mut writer = MarkdownArtifacts::new(&source, "docs", &questions);

        let err = writer.write(0, "x").unwrap_err();
        assert!(matches!(err, AnalyzerError::Artifact { .. }));
    }

    #[test]
    fn artifacts_exist_requires_every_suffix() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("led.c");
        let suffixes = default_questions().suffixes();
        let docs = tmp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();

        fs::write(docs.join("led_overview.md"), "x").unwrap();
        fs::write(docs.join("led_line_by_line.md"), "x").unwrap();
        assert!(!artifacts_exist(&source, "docs", &suffixes));

        fs::write(docs.join("led_improvements.md"), "x").unwrap();
        assert!(artifacts_exist(&source, "docs", &suffixes));
    }

    #[test]
    fn no_suffixes_means_nothing_exists() {
        assert!(!artifacts_exist(Path::new("a.c"), "docs", &[]));
    }
}

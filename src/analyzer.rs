use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::artifacts::MarkdownArtifacts;
use crate::conversation::{ConversationDriver, QuestionSpec};
use crate::deepseek::ChatSender;
use crate::error::AnalyzerError;
use crate::prompts::priming_turns;
use crate::queue::ItemOutcome;
use crate::retry::RetryingClient;
use crate::scheduler::ItemProcessor;
use crate::ui::FileProgress;

/// Read a source file as text, decoding invalid UTF-8 as Latin-1.
pub fn read_source(path: &Path) -> Result<String, AnalyzerError> {
    let bytes = fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            warn!(path = %path.display(), "file is not valid UTF-8, decoding as Latin-1");
            Ok(err.into_bytes().into_iter().map(char::from).collect())
        }
    }
}

/// Analyzes one source file per work item by running the question
/// conversation against it and writing markdown next to the file.
pub struct FileAnalyzer<S> {
    client: RetryingClient<S>,
    questions: QuestionSpec,
    output_dir: String,
    max_code_length: usize,
    pacing: Duration,
}

impl<S: ChatSender> FileAnalyzer<S> {
    pub fn new(
        client: RetryingClient<S>,
        questions: QuestionSpec,
        output_dir: impl Into<String>,
        max_code_length: usize,
        pacing: Duration,
    ) -> Self {
        Self {
            client,
            questions,
            output_dir: output_dir.into(),
            max_code_length,
            pacing,
        }
    }
}

impl<S: ChatSender> ItemProcessor for FileAnalyzer<S> {
    async fn process(&self, item: &str) -> ItemOutcome {
        let path = Path::new(item);
        info!(path = %item, model = self.client.model(), "processing file");
        let progress = FileProgress::start(item);

        let content = match read_source(path) {
            Ok(content) => content,
            Err(err) => {
                error!(path = %item, error = %err, "cannot read file");
                progress.unreadable(item, &err.to_string());
                return ItemOutcome::Failed;
            }
        };

        let priming = priming_turns(path, &content, self.max_code_length);
        let mut writer = MarkdownArtifacts::new(path, &self.output_dir, &self.questions);
        let driver = ConversationDriver::new(&self.client, &self.questions, self.pacing);
        let outcome = driver.run(priming, &mut writer).await;
        progress.complete(item, &outcome);

        if outcome.is_completed() {
            info!(path = %item, "all questions answered");
            ItemOutcome::Completed
        } else {
            ItemOutcome::Failed
        }
    }
}

//! Sequential multi-question conversation over one growing context.
//!
//! [`ConversationDriver::run`] asks every question of a [`QuestionSpec`] in
//! order. Each answer is written through an [`ArtifactWriter`] and then
//! appended to the context so later questions see the whole dialogue. The
//! first failure aborts the conversation; there is no resume mid-way.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::deepseek::{ChatSender, Message};
use crate::error::AnalyzerError;
use crate::retry::RetryingClient;

/// One question and the artifact its answer is stored in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    /// File name suffix of the artifact, e.g. `_overview.md`.
    pub suffix: String,
    /// Title placed above the answer, e.g. `Code Overview`.
    pub heading: String,
    /// Link text in the analysis index, e.g. `Overview`.
    pub label: String,
}

/// Fixed, ordered list of questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSpec {
    questions: Vec<Question>,
}

impl QuestionSpec {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    /// Artifact suffixes in question order.
    pub fn suffixes(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.suffix.clone()).collect()
    }
}

/// Append-only turn sequence for one work item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationContext {
    turns: Vec<Message>,
}

impl ConversationContext {
    /// Start a context from the priming turns (system prompt and code).
    pub fn primed(priming: Vec<Message>) -> Self {
        Self { turns: priming }
    }

    pub fn push(&mut self, turn: Message) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }
}

/// Receives each answer, keyed by the index of its question.
pub trait ArtifactWriter {
    fn write(&mut self, question: usize, content: &str) -> Result<PathBuf, AnalyzerError>;
}

/// Result of driving one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationOutcome {
    /// Every question was answered and every artifact written.
    Completed { artifacts: Vec<PathBuf> },
    /// Question `question` failed; `artifacts` holds what was written before.
    Failed {
        question: usize,
        reason: String,
        artifacts: Vec<PathBuf>,
    },
}

impl ConversationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ConversationOutcome::Completed { .. })
    }
}

pub struct ConversationDriver<'a, S> {
    client: &'a RetryingClient<S>,
    questions: &'a QuestionSpec,
    pacing: Duration,
}

impl<'a, S: ChatSender> ConversationDriver<'a, S> {
    pub fn new(client: &'a RetryingClient<S>, questions: &'a QuestionSpec, pacing: Duration) -> Self {
        Self {
            client,
            questions,
            pacing,
        }
    }

    /// Ask every question in order, starting from the priming turns.
    pub async fn run<W: ArtifactWriter>(
        &self,
        priming: Vec<Message>,
        writer: &mut W,
    ) -> ConversationOutcome {
        let mut context = ConversationContext::primed(priming);
        let mut artifacts = Vec::with_capacity(self.questions.len());
        let total = self.questions.len();

        for (index, question) in self.questions.iter().enumerate() {
            context.push(Message::user(question.prompt.as_str()));
            debug!(question = index + 1, total, turns = context.len(), "asking question");

            let answer = match self.client.send(context.turns()).await {
                Ok(answer) => answer,
                Err(failure) => {
                    error!(question = index + 1, total, error = %failure, "question failed");
                    return ConversationOutcome::Failed {
                        question: index,
                        reason: failure.to_string(),
                        artifacts,
                    };
                }
            };

            match writer.write(index, &answer) {
                Ok(path) => {
                    info!(path = %path.display(), "response saved");
                    artifacts.push(path);
                }
                Err(err) => {
                    error!(question = index + 1, total, error = %err, "could not save response");
                    return ConversationOutcome::Failed {
                        question: index,
                        reason: err.to_string(),
                        artifacts,
                    };
                }
            }
            context.push(Message::assistant(answer));

            if index + 1 < total && !self.pacing.is_zero() {
                sleep(self.pacing).await;
            }
        }

        ConversationOutcome::Completed { artifacts }
    }
}

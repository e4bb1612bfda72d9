//! One-shot requests used by `check-models` and `test-connection`.
//!
//! These bypass the retry layer: a probe reports the first answer it gets.

use tracing::debug;

use crate::deepseek::{ChatRequest, ChatSender, DeepSeekError, Message};

pub const RECOMMENDED_MODELS: &[(&str, &str)] = &[
    ("deepseek-coder", "base code model"),
    ("deepseek-chat", "general chat model"),
    ("deepseek-coder-instruct", "instruction-tuned coder"),
    ("deepseek-lite", "faster, smaller model"),
];

/// Models probed by `check-models` when none are given.
pub const DEFAULT_PROBE_MODELS: &[&str] = &[
    "deepseek-coder",
    "deepseek-chat",
    "deepseek-coder-instruct",
    "deepseek-lite",
    "deepseek-ai/deepseek-coder-7b-instruct",
    "deepseek-ai/deepseek-chat",
];

const PROBE_MAX_TOKENS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProbe {
    pub model: String,
    /// `None` when the model answered.
    pub error: Option<String>,
}

impl ModelProbe {
    pub fn is_available(&self) -> bool {
        self.error.is_none()
    }
}

fn probe_request(model: &str, prompt: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![Message::user(prompt)],
        max_tokens: PROBE_MAX_TOKENS,
        temperature: 0.0,
    }
}

/// Send one tiny request to `model` and return its reply.
pub async fn test_connection<S: ChatSender>(sender: &S, model: &str) -> Result<String, DeepSeekError> {
    let response = sender
        .send_chat(&probe_request(model, "Hello, are you working?"))
        .await?;
    response
        .completion()
        .map(str::to_string)
        .ok_or(DeepSeekError::MissingCompletion)
}

/// Probe each model in turn; any HTTP 2xx counts as available.
pub async fn probe_models<S: ChatSender>(sender: &S, models: &[String]) -> Vec<ModelProbe> {
    let mut results = Vec::with_capacity(models.len());
    for model in models {
        let request = probe_request(model, "Hello, can you respond with one word?");
        let error = match sender.send_chat(&request).await {
            Ok(_) => None,
            Err(err) => Some(err.to_string()),
        };
        debug!(model = %model, available = error.is_none(), "model probed");
        results.push(ModelProbe {
            model: model.clone(),
            error,
        });
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deepseek::types::ChatResponse;
    use crate::test_support::{ScriptedSender, server_error, unknown_model};

    #[tokio::test]
    async fn probes_each_model_once() {
        let sender = ScriptedSender::new()
            .reply("Yes")
            .fail(unknown_model())
            .respond(ChatResponse::default());
        let models: Vec<String> = ["a", "b", "c"].iter().map(|m| m.to_string()).collect();

        let results = probe_models(&sender, &models).await;

        assert_eq!(sender.calls(), 3);
        assert!(results[0].is_available());
        assert!(!results[1].is_available());
        assert!(results[2].is_available());
        let requests = sender.requests();
        assert_eq!(requests[1].model, "b");
        assert_eq!(requests[1].max_tokens, 10);
    }

    #[tokio::test]
    async fn connection_test_returns_reply() {
        let sender = ScriptedSender::new().reply("I am working.");
        let reply = test_connection(&sender, "deepseek-coder").await.unwrap();
        assert_eq!(reply, "I am working.");
        assert_eq!(sender.requests()[0].messages.len(), 1);
    }

    #[tokio::test]
    async fn connection_test_reports_first_error_without_retry() {
        let sender = ScriptedSender::new().fail(server_error(503)).reply("late");
        let err = test_connection(&sender, "deepseek-coder").await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(sender.calls(), 1);
    }

    #[tokio::test]
    async fn connection_test_without_content_is_an_error() {
        let sender = ScriptedSender::new().respond(ChatResponse::default());
        let err = test_connection(&sender, "deepseek-coder").await.unwrap_err();
        assert!(matches!(err, DeepSeekError::MissingCompletion));
    }
}

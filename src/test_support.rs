//! Test-only helpers: a scripted chat sender and canned API errors.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::deepseek::types::{ChatResponse, Choice, ChoiceMessage, ErrorBody};
use crate::deepseek::{ChatRequest, ChatSender, DeepSeekError};

/// Replays queued replies in order and records every request it receives.
///
/// Once the script runs dry every further call fails with a 503.
#[derive(Default)]
pub struct ScriptedSender {
    replies: RefCell<VecDeque<Result<ChatResponse, DeepSeekError>>>,
    requests: RefCell<Vec<ChatRequest>>,
}

impl ScriptedSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful completion.
    pub fn reply(self, text: &str) -> Self {
        self.replies.borrow_mut().push_back(Ok(completion(text)));
        self
    }

    /// Queue a failure.
    pub fn fail(self, err: DeepSeekError) -> Self {
        self.replies.borrow_mut().push_back(Err(err));
        self
    }

    /// Queue a raw response (e.g. one without choices).
    pub fn respond(self, response: ChatResponse) -> Self {
        self.replies.borrow_mut().push_back(Ok(response));
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl ChatSender for ScriptedSender {
    async fn send_chat(&self, req: &ChatRequest) -> Result<ChatResponse, DeepSeekError> {
        self.requests.borrow_mut().push(req.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(server_error(503)))
    }
}

/// A well-formed response whose first choice carries `text`.
pub fn completion(text: &str) -> ChatResponse {
    ChatResponse {
        id: Some("chatcmpl-test".into()),
        model: Some("deepseek-coder".into()),
        choices: vec![Choice {
            index: 0,
            message: Some(ChoiceMessage {
                role: Some("assistant".into()),
                content: Some(text.to_string()),
            }),
            finish_reason: Some("stop".into()),
        }],
        usage: None,
    }
}

pub fn server_error(status: u16) -> DeepSeekError {
    DeepSeekError::Api {
        status,
        body: None,
        message: "server busy".into(),
    }
}

pub fn unknown_model() -> DeepSeekError {
    DeepSeekError::Api {
        status: 400,
        body: Some(ErrorBody {
            message: "Model Not Exist".into(),
            kind: Some("invalid_request_error".into()),
            param: Some("model".into()),
            code: None,
        }),
        message: "Model Not Exist".into(),
    }
}

pub fn bad_request() -> DeepSeekError {
    DeepSeekError::Api {
        status: 400,
        body: Some(ErrorBody {
            message: "messages must not be empty".into(),
            kind: Some("invalid_request_error".into()),
            param: Some("messages".into()),
            code: None,
        }),
        message: "messages must not be empty".into(),
    }
}

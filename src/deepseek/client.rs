use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::error::DeepSeekError;
use super::types::{ChatRequest, ChatResponse, ErrorEnvelope};

pub const API_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Anything that can perform one chat-completions exchange.
///
/// Implemented by [`DeepSeekClient`] for real calls and by scripted senders in
/// tests.
#[allow(async_fn_in_trait)]
pub trait ChatSender {
    async fn send_chat(&self, req: &ChatRequest) -> Result<ChatResponse, DeepSeekError>;
}

pub struct DeepSeekClient {
    api_key: String,
    client: Client,
    endpoint: String,
}

impl DeepSeekClient {
    /// Client for `{base_url}/chat/completions`, e.g. [`API_BASE_URL`].
    pub fn with_base_url(
        api_key: String,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, DeepSeekError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            api_key,
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    #[cfg(test)]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ChatSender for DeepSeekClient {
    async fn send_chat(&self, req: &ChatRequest) -> Result<ChatResponse, DeepSeekError> {
        debug!(model = %req.model, turns = req.messages.len(), "sending chat request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .map(|env| env.error);
            let message = match &body {
                Some(b) if !b.message.is_empty() => b.message.clone(),
                _ if text.trim().is_empty() => "no error details provided".to_string(),
                _ => text.trim().to_string(),
            };
            return Err(DeepSeekError::Api {
                status: status.as_u16(),
                body,
                message,
            });
        }

        serde_json::from_str::<ChatResponse>(&text).map_err(|e| DeepSeekError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deepseek::types::Message;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            model: "deepseek-coder".into(),
            messages: vec![Message::system("reviewer"), Message::user("explain main.c")],
            max_tokens: 4096,
            temperature: 0.2,
        }
    }

    fn client_for(server: &MockServer) -> DeepSeekClient {
        DeepSeekClient::with_base_url(
            "sk-test".into(),
            &format!("{}/v1", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn endpoint_appends_path() {
        let client =
            DeepSeekClient::with_base_url("k".into(), "http://localhost:1/v1/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:1/v1/chat/completions");
    }

    #[tokio::test]
    async fn sends_bearer_auth_and_parses_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "deepseek-coder", "max_tokens": 4096})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "It toggles a GPIO."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let resp = client.send_chat(&request()).await.unwrap();
        assert_eq!(resp.completion(), Some("It toggles a GPIO."));
    }

    #[tokio::test]
    async fn rate_limit_maps_to_api_error_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit reached", "type": "rate_limit_error"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).send_chat(&request()).await.unwrap_err();
        match err {
            DeepSeekError::Api { status, body, message } => {
                assert_eq!(status, 429);
                assert_eq!(body.unwrap().kind.as_deref(), Some("rate_limit_error"));
                assert_eq!(message, "Rate limit reached");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_model_body_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "Model Not Exist", "type": "invalid_request_error", "param": "model", "code": null}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).send_chat(&request()).await.unwrap_err();
        assert!(err.is_unknown_model());
    }

    #[tokio::test]
    async fn plain_text_error_body_is_kept_as_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
            .mount(&server)
            .await;

        let err = client_for(&server).send_chat(&request()).await.unwrap_err();
        match err {
            DeepSeekError::Api { status, body, message } => {
                assert_eq!(status, 503);
                assert!(body.is_none());
                assert_eq!(message, "upstream overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_json_success_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).send_chat(&request()).await.unwrap_err();
        assert!(matches!(err, DeepSeekError::Decode(_)));
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let client = DeepSeekClient::with_base_url(
            "k".into(),
            "http://127.0.0.1:9",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client.send_chat(&request()).await.unwrap_err();
        assert!(matches!(err, DeepSeekError::Network(_)));
    }
}

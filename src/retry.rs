//! Bounded retries with exponential backoff around a [`ChatSender`].
//!
//! [`RetryingClient::send`] performs one conversational exchange. Failures
//! are classified from the structured [`DeepSeekError`] into transient ones,
//! which are retried after `min(base * 2^i, cap) * jitter`, and fatal ones,
//! which end the call at once. An unknown model gets a single substitution
//! with the configured fallback model on the first attempt.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::deepseek::{ChatRequest, ChatSender, DeepSeekError, Message};

/// Backoff parameters for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Inclusive range the jitter factor is drawn from.
    pub jitter: (f64, f64),
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            jitter: (0.8, 1.2),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (0-based) for a given jitter factor:
    /// `min(base * 2^attempt, max_delay) * jitter`.
    pub fn delay_for_attempt(&self, attempt: u32, jitter: f64) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        exponential.min(self.max_delay).mul_f64(jitter)
    }

    /// Delay after failed attempt `attempt` with a freshly drawn jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.delay_for_attempt(attempt, self.sample_jitter())
    }

    fn sample_jitter(&self) -> f64 {
        let (low, high) = self.jitter;
        if low >= high {
            low
        } else {
            rand::thread_rng().gen_range(low..=high)
        }
    }
}

/// Retry classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Fatal,
}

/// Classify a client error. Unknown-model errors are handled separately by
/// [`RetryingClient`] because they may trigger a model substitution.
pub fn classify(err: &DeepSeekError) -> ErrorClass {
    match err {
        DeepSeekError::Api { status, .. } => match status {
            408 | 409 | 429 => ErrorClass::Transient,
            500..=599 => ErrorClass::Transient,
            _ => ErrorClass::Fatal,
        },
        DeepSeekError::Network(_) | DeepSeekError::Decode(_) | DeepSeekError::MissingCompletion => {
            ErrorClass::Transient
        }
    }
}

/// One failed attempt of a request. [`RetryingClient::send`] logs a summary
/// of these; [`RetryingClient::send_traced`] returns them.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryAttempt {
    pub attempt: u32,
    /// Sleep taken before the next attempt (zero when none followed).
    pub delay: Duration,
    pub class: ErrorClass,
}

/// Terminal result of a request that produced no content.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestFailure {
    #[error("fatal error on attempt {attempt}: {reason}")]
    Fatal { attempt: u32, reason: String },

    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

/// A [`ChatSender`] wrapped with model selection, sampling settings and the
/// retry policy.
pub struct RetryingClient<S> {
    sender: S,
    model: String,
    fallback_models: HashMap<String, String>,
    max_tokens: u32,
    temperature: f32,
    policy: RetryPolicy,
}

impl<S: ChatSender> RetryingClient<S> {
    pub fn new(sender: S, model: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            sender,
            model: model.into(),
            fallback_models: HashMap::new(),
            max_tokens: 4096,
            temperature: 0.2,
            policy,
        }
    }

    /// Map of model identifier to the identifier tried when the first is unknown.
    pub fn with_fallbacks(mut self, fallback_models: HashMap<String, String>) -> Self {
        self.fallback_models = fallback_models;
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    #[cfg(test)]
    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Send the full conversation and return the assistant's reply.
    pub async fn send(&self, messages: &[Message]) -> Result<String, RequestFailure> {
        let (result, trace) = self.send_traced(messages).await;
        if !trace.is_empty() {
            let waited: Duration = trace.iter().map(|a| a.delay).sum();
            let fatal = trace.iter().any(|a| a.class == ErrorClass::Fatal);
            let attempts: Vec<u32> = trace.iter().map(|a| a.attempt).collect();
            debug!(
                failed_attempts = trace.len(),
                ?attempts,
                waited_secs = waited.as_secs_f64(),
                fatal,
                "request finished after failed attempts"
            );
        }
        result
    }

    /// Like [`send`](Self::send), also returning every failed attempt.
    pub async fn send_traced(
        &self,
        messages: &[Message],
    ) -> (Result<String, RequestFailure>, Vec<RetryAttempt>) {
        // The fallback substitution may add one attempt to a budget of one.
        let mut max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        let mut model = self.model.clone();
        let mut trace = Vec::new();
        let mut last_error = String::new();

        while attempt < max_attempts {
            let req = ChatRequest {
                model: model.clone(),
                messages: messages.to_vec(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            };

            let result = self.sender.send_chat(&req).await.and_then(|resp| {
                resp.completion()
                    .map(str::to_string)
                    .ok_or(DeepSeekError::MissingCompletion)
            });

            let err = match result {
                Ok(content) => {
                    if attempt > 0 {
                        info!(attempt = attempt + 1, model = %model, "request succeeded after retry");
                    }
                    return (Ok(content), trace);
                }
                Err(err) => err,
            };
            last_error = err.to_string();

            if err.is_unknown_model() {
                if attempt == 0 {
                    if let Some(fallback) = self.fallback_models.get(&model) {
                        warn!(model = %model, fallback = %fallback, "model not found, falling back");
                        trace.push(RetryAttempt {
                            attempt,
                            delay: Duration::ZERO,
                            class: ErrorClass::Transient,
                        });
                        model = fallback.clone();
                        max_attempts = max_attempts.max(2);
                        attempt += 1;
                        continue;
                    }
                }
                error!(model = %model, error = %err, "model not found");
                trace.push(RetryAttempt {
                    attempt,
                    delay: Duration::ZERO,
                    class: ErrorClass::Fatal,
                });
                return (
                    Err(RequestFailure::Fatal {
                        attempt,
                        reason: last_error,
                    }),
                    trace,
                );
            }

            match classify(&err) {
                ErrorClass::Fatal => {
                    error!(
                        attempt = attempt + 1,
                        status = ?err.status(),
                        error = %err,
                        "request failed, not retrying"
                    );
                    trace.push(RetryAttempt {
                        attempt,
                        delay: Duration::ZERO,
                        class: ErrorClass::Fatal,
                    });
                    return (
                        Err(RequestFailure::Fatal {
                            attempt,
                            reason: last_error,
                        }),
                        trace,
                    );
                }
                ErrorClass::Transient if attempt + 1 < max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        status = ?err.status(),
                        delay_secs = delay.as_secs_f64(),
                        error = %err,
                        "request failed, retrying"
                    );
                    trace.push(RetryAttempt {
                        attempt,
                        delay,
                        class: ErrorClass::Transient,
                    });
                    sleep(delay).await;
                }
                ErrorClass::Transient => {
                    trace.push(RetryAttempt {
                        attempt,
                        delay: Duration::ZERO,
                        class: ErrorClass::Transient,
                    });
                }
            }
            attempt += 1;
        }

        error!(attempts = max_attempts, error = %last_error, "request failed after all attempts");
        (
            Err(RequestFailure::Exhausted {
                attempts: max_attempts,
                last_error,
            }),
            trace,
        )
    }
}

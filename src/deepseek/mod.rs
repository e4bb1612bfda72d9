pub mod client;
pub mod error;
pub mod types;

pub use client::{API_BASE_URL, ChatSender, DeepSeekClient};
pub use error::DeepSeekError;
pub use types::{ChatRequest, Message};

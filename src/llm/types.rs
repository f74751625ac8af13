use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Structured prompt handed to a generation gateway.
///
/// Sampling options come from the gateway's configuration.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    /// Concatenated prompt text, used for logging and fakes.
    pub fn prompt_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
}

/// Failure of an external embedding, vector-store or generation service.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("{service} request failed: {message}")]
    Http { service: String, message: String },
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },
    #[error("{service} response could not be decoded: {message}")]
    Decode { service: String, message: String },
    #[error("{service} request timed out")]
    Timeout { service: String },
    #[error("{service} is not configured: {message}")]
    Config { service: String, message: String },
}

impl ServiceError {
    pub fn from_reqwest(service: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ServiceError::Timeout {
                service: service.to_string(),
            };
        }
        ServiceError::Http {
            service: service.to_string(),
            message: err.to_string(),
        }
    }

    pub fn decode(service: &str, message: impl Into<String>) -> Self {
        ServiceError::Decode {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn config(service: &str, message: impl Into<String>) -> Self {
        ServiceError::Config {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn service(&self) -> &str {
        match self {
            ServiceError::Http { service, .. }
            | ServiceError::Status { service, .. }
            | ServiceError::Decode { service, .. }
            | ServiceError::Timeout { service }
            | ServiceError::Config { service, .. } => service,
        }
    }
}

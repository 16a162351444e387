use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Wire shape of every error response: `{"error": …, "details": {"code": …}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Stable machine-readable code (e.g. `INVALID_CREDENTIALS`).
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            details: ErrorDetails {
                code: code.into(),
                retry_after_seconds: None,
            },
        }
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.details.retry_after_seconds = Some(seconds);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_serializes_stable_code() {
        let body = ErrorBody::new("INVALID_CREDENTIALS", "Identifiant ou mot de passe incorrect");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["details"]["code"], "INVALID_CREDENTIALS");
        assert!(json["details"].get("retry_after_seconds").is_none());
    }

    #[test]
    fn error_body_carries_retry_after() {
        let body = ErrorBody::new("RATE_LIMIT_EXCEEDED", "Trop de tentatives").with_retry_after(874);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["details"]["retry_after_seconds"], 874);
    }
}

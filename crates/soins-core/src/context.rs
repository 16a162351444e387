use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ClientType;

/// Tenant identity resolved by the upstream middleware before any auth call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstablishmentContext {
    pub establishment_id: Uuid,
    /// 3-20 uppercase alphanumeric code, used for key namespacing.
    pub establishment_code: String,
}

impl EstablishmentContext {
    pub fn new(establishment_id: Uuid, establishment_code: impl Into<String>) -> Self {
        Self {
            establishment_id,
            establishment_code: establishment_code.into(),
        }
    }

    /// Tenant codes are 3-20 uppercase alphanumeric characters.
    pub fn is_valid_code(code: &str) -> bool {
        (3..=20).contains(&code.len())
            && code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    }
}

/// Session facts injected by the session middleware for Me / ChangePassword.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub token: String,
    pub user_id: Uuid,
    pub client_type: ClientType,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn establishment_code_validation() {
        assert!(EstablishmentContext::is_valid_code("CLINIC01"));
        assert!(EstablishmentContext::is_valid_code("ABC"));
        assert!(!EstablishmentContext::is_valid_code("ab"));
        assert!(!EstablishmentContext::is_valid_code("clinic01"));
        assert!(!EstablishmentContext::is_valid_code("TOO-LONG!"));
        assert!(!EstablishmentContext::is_valid_code("ABCDEFGHIJKLMNOPQRSTU"));
    }
}

use thiserror::Error;

use soins_core::ErrorBody;

/// Auth pipeline failures. Every variant maps to a stable wire code and an
/// HTTP status; the French messages are part of the client contract.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("client type header is required")]
    ClientTypeRequired,

    #[error("identifiant is required")]
    IdentifiantRequired,

    #[error("password is required")]
    PasswordRequired,

    #[error("request body could not be interpreted")]
    InvalidRequestFormat,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("client type does not match the account kind")]
    ClientTypeMismatch,

    #[error("too many failed login attempts")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("bearer token is required")]
    TokenRequired,

    #[error("token has been revoked")]
    TokenRevoked,

    #[error("token is unknown or expired")]
    InvalidToken,

    #[error("user not found or inactive")]
    UserNotFound,

    #[error("current password is incorrect")]
    InvalidCurrentPassword,

    #[error("new password and confirmation differ")]
    PasswordMismatch,

    #[error("establishment context is missing")]
    EstablishmentContextMissing,

    #[error("establishment context is invalid")]
    EstablishmentContextInvalid,

    #[error("session context is missing")]
    SessionContextMissing,

    #[error("session context is incomplete")]
    SessionContextIncomplete,

    #[error("salt has an invalid length")]
    InvalidSalt,

    #[error(transparent)]
    Internal(#[from] soins_core::Error),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ClientTypeRequired => "CLIENT_TYPE_REQUIRED",
            Self::IdentifiantRequired => "IDENTIFIANT_REQUIRED",
            Self::PasswordRequired => "PASSWORD_REQUIRED",
            Self::InvalidRequestFormat => "INVALID_REQUEST_FORMAT",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::ClientTypeMismatch => "CLIENT_TYPE_MISMATCH",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::TokenRequired => "TOKEN_REQUIRED",
            Self::TokenRevoked => "TOKEN_REVOKED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::InvalidCurrentPassword => "INVALID_CURRENT_PASSWORD",
            Self::PasswordMismatch => "PASSWORD_MISMATCH",
            Self::EstablishmentContextMissing => "ESTABLISHMENT_CONTEXT_MISSING",
            Self::EstablishmentContextInvalid => "ESTABLISHMENT_CONTEXT_INVALID",
            Self::SessionContextMissing => "SESSION_CONTEXT_MISSING",
            Self::SessionContextIncomplete => "SESSION_CONTEXT_INCOMPLETE",
            Self::InvalidSalt | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::ClientTypeRequired
            | Self::IdentifiantRequired
            | Self::PasswordRequired
            | Self::InvalidRequestFormat
            | Self::PasswordMismatch => 400,
            Self::InvalidCredentials
            | Self::TokenRequired
            | Self::TokenRevoked
            | Self::InvalidToken
            | Self::InvalidCurrentPassword => 401,
            Self::ClientTypeMismatch => 403,
            Self::UserNotFound => 404,
            Self::RateLimitExceeded { .. } => 429,
            Self::EstablishmentContextMissing
            | Self::EstablishmentContextInvalid
            | Self::SessionContextMissing
            | Self::SessionContextIncomplete
            | Self::InvalidSalt
            | Self::Internal(_) => 500,
        }
    }

    /// Human message shown to the caller, in the product language.
    pub fn message(&self) -> String {
        match self {
            Self::ClientTypeRequired => "L'en-tête X-Client-Type est requis".to_string(),
            Self::IdentifiantRequired => "L'identifiant est requis".to_string(),
            Self::PasswordRequired => "Le mot de passe est requis".to_string(),
            Self::InvalidRequestFormat => "Format de requête invalide".to_string(),
            Self::InvalidCredentials => "Identifiant ou mot de passe incorrect".to_string(),
            Self::ClientTypeMismatch => {
                "Type de client incompatible avec le compte".to_string()
            }
            Self::RateLimitExceeded { .. } => {
                "Trop de tentatives de connexion, veuillez réessayer plus tard".to_string()
            }
            Self::TokenRequired => "Token d'authentification requis".to_string(),
            Self::TokenRevoked => "Session expirée ou déconnectée".to_string(),
            Self::InvalidToken => "Token invalide ou expiré".to_string(),
            Self::UserNotFound => "Utilisateur introuvable ou inactif".to_string(),
            Self::InvalidCurrentPassword => "Mot de passe actuel incorrect".to_string(),
            Self::PasswordMismatch => {
                "Le nouveau mot de passe et sa confirmation diffèrent".to_string()
            }
            Self::EstablishmentContextMissing => "Contexte établissement manquant".to_string(),
            Self::EstablishmentContextInvalid => "Contexte établissement invalide".to_string(),
            Self::SessionContextMissing => "Contexte de session manquant".to_string(),
            Self::SessionContextIncomplete => "Contexte de session incomplet".to_string(),
            Self::InvalidSalt | Self::Internal(_) => "Erreur interne".to_string(),
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let body = ErrorBody::new(self.code(), self.message());
        match self {
            Self::RateLimitExceeded {
                retry_after_seconds,
            } => body.with_retry_after(*retry_after_seconds),
            _ => body,
        }
    }
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Internal(err.into())
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        Self::Internal(err.into())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AuthError::InvalidCredentials.code(), "INVALID_CREDENTIALS");
        assert_eq!(AuthError::ClientTypeMismatch.code(), "CLIENT_TYPE_MISMATCH");
        assert_eq!(AuthError::TokenRevoked.code(), "TOKEN_REVOKED");
        assert_eq!(
            AuthError::RateLimitExceeded {
                retry_after_seconds: 1
            }
            .code(),
            "RATE_LIMIT_EXCEEDED"
        );
    }

    #[test]
    fn statuses_follow_the_http_contract() {
        assert_eq!(AuthError::InvalidCredentials.status(), 401);
        assert_eq!(AuthError::ClientTypeMismatch.status(), 403);
        assert_eq!(
            AuthError::RateLimitExceeded {
                retry_after_seconds: 10
            }
            .status(),
            429
        );
        assert_eq!(AuthError::ClientTypeRequired.status(), 400);
    }

    #[test]
    fn rate_limit_body_exposes_retry_after() {
        let body = AuthError::RateLimitExceeded {
            retry_after_seconds: 874,
        }
        .to_body();
        assert_eq!(body.details.retry_after_seconds, Some(874));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use soins_core::ClientType;

use crate::entities::users;
use crate::error::AuthError;
use crate::permissions::PermissionMatrix;

/// Success envelope: `{"success": true, "data": …}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSuccess<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub identifiant: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.identifiant.trim().is_empty() {
            return Err(AuthError::IdentifiantRequired);
        }
        if self.password.is_empty() {
            return Err(AuthError::PasswordRequired);
        }
        Ok(())
    }
}

/// User projection returned to clients. Never carries the digest or the salt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: Uuid,
    pub identifiant: String,
    pub nom: String,
    pub prenoms: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
    pub est_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_admin: Option<String>,
    pub est_medecin: bool,
    pub must_change_password: bool,
    pub statut: String,
}

impl From<&users::Model> for UserPayload {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            identifiant: user.identifiant.clone(),
            nom: user.nom.clone(),
            prenoms: user.prenoms.clone(),
            telephone: user.telephone.clone(),
            est_admin: user.est_admin,
            type_admin: user.type_admin.clone(),
            est_medecin: user.est_medecin,
            must_change_password: user.must_change_password,
            statut: user.statut.to_string(),
        }
    }
}

/// Back-office onboarding progress, attached to back-office logins only and
/// only when the lookup succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupState {
    pub setup_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_current_step: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub front_office: bool,
    pub back_office: bool,
    pub user: UserPayload,
    pub permissions: PermissionMatrix,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup: Option<SetupState>,
}

/// Logout always succeeds; the message is part of the client contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

impl LogoutResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: "Déconnexion réussie".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub token: String,
    pub client_type: ClientType,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeData {
    pub user: UserPayload,
    pub permissions: PermissionMatrix,
    pub session: SessionInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(rename = "current")]
    pub current_password: String,
    #[serde(rename = "new")]
    pub new_password: String,
    #[serde(rename = "confirm")]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordData {
    pub success: bool,
    pub message: String,
    pub must_change_password: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_requires_both_fields() {
        let request = LoginRequest {
            identifiant: "  ".to_string(),
            password: "x".to_string(),
        };
        assert!(matches!(
            request.validate(),
            Err(AuthError::IdentifiantRequired)
        ));

        let request = LoginRequest {
            identifiant: "mkoffi".to_string(),
            password: String::new(),
        };
        assert!(matches!(request.validate(), Err(AuthError::PasswordRequired)));

        let request = LoginRequest {
            identifiant: "mkoffi".to_string(),
            password: "P@ss!".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn change_password_body_uses_short_field_names() {
        let body: ChangePasswordRequest = serde_json::from_str(
            r#"{"current": "old", "new": "fresh", "confirm": "fresh"}"#,
        )
        .unwrap();
        assert_eq!(body.current_password, "old");
        assert_eq!(body.new_password, "fresh");
        assert_eq!(body.confirm_password, "fresh");
    }

    #[test]
    fn logout_response_message_is_fixed() {
        let response = LogoutResponse::ok();
        assert!(response.success);
        assert_eq!(response.message, "Déconnexion réussie");
    }

    #[test]
    fn login_data_omits_absent_setup() {
        let data = LoginData {
            token: "t".to_string(),
            expires_at: Utc::now(),
            front_office: true,
            back_office: false,
            user: UserPayload {
                id: Uuid::new_v4(),
                identifiant: "mkoffi".to_string(),
                nom: "Koffi".to_string(),
                prenoms: "Marc".to_string(),
                telephone: None,
                est_admin: false,
                type_admin: None,
                est_medecin: true,
                must_change_password: false,
                statut: "actif".to_string(),
            },
            permissions: PermissionMatrix::default(),
            setup: None,
        };

        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("setup").is_none());
        assert_eq!(json["front_office"], true);
        assert_eq!(json["back_office"], false);
        assert!(json["user"].get("type_admin").is_none());
    }
}

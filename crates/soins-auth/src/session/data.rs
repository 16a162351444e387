use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use soins_core::ClientType;

use crate::entities::sessions;

/// Strongly typed view of the string-keyed session hash held in the fast
/// store. Unknown hash fields are ignored; a missing required field makes the
/// whole session invalid rather than half-parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub user_id: Uuid,
    pub establishment_id: Uuid,
    pub client_type: ClientType,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_live(&self) -> bool {
        self.expires_at > Utc::now()
    }

    /// Field pairs for the fast-store `HSET`.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("token", self.token.clone()),
            ("user_id", self.user_id.to_string()),
            ("establishment_id", self.establishment_id.to_string()),
            ("client_type", self.client_type.to_string()),
            ("created_at", self.created_at.to_rfc3339()),
            ("last_activity", self.last_activity.to_rfc3339()),
            ("expires_at", self.expires_at.to_rfc3339()),
        ];
        if let Some(ip) = &self.ip_address {
            fields.push(("ip_address", ip.clone()));
        }
        if let Some(ua) = &self.user_agent {
            fields.push(("user_agent", ua.clone()));
        }
        fields
    }

    /// Projects an `HGETALL` result back onto the typed shape.
    pub fn from_fields(fields: &HashMap<String, String>) -> Option<Self> {
        Some(Self {
            token: fields.get("token")?.clone(),
            user_id: fields.get("user_id")?.parse().ok()?,
            establishment_id: fields.get("establishment_id")?.parse().ok()?,
            client_type: fields.get("client_type")?.parse().ok()?,
            ip_address: fields.get("ip_address").cloned(),
            user_agent: fields.get("user_agent").cloned(),
            created_at: parse_timestamp(fields.get("created_at")?)?,
            last_activity: parse_timestamp(fields.get("last_activity")?)?,
            expires_at: parse_timestamp(fields.get("expires_at")?)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|value| value.with_timezone(&Utc))
}

impl From<sessions::Model> for SessionData {
    fn from(row: sessions::Model) -> Self {
        Self {
            token: row.token,
            user_id: row.user_id,
            establishment_id: row.establishment_id,
            client_type: row.client_type,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at.into(),
            last_activity: row.last_activity.into(),
            expires_at: row.expires_at.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> SessionData {
        let now = Utc::now();
        SessionData {
            token: "3fa9c1d2-0000-4000-8000-000000000001".to_string(),
            user_id: Uuid::new_v4(),
            establishment_id: Uuid::new_v4(),
            client_type: ClientType::FrontOffice,
            ip_address: Some("10.0.0.7".to_string()),
            user_agent: Some("soins-mobile/2.4".to_string()),
            created_at: now,
            last_activity: now,
            expires_at: now + Duration::hours(1),
        }
    }

    #[test]
    fn fields_round_trip() {
        let session = sample();
        let map: HashMap<String, String> = session
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let restored = SessionData::from_fields(&map).unwrap();
        assert_eq!(restored.token, session.token);
        assert_eq!(restored.user_id, session.user_id);
        assert_eq!(restored.client_type, session.client_type);
        assert_eq!(restored.ip_address, session.ip_address);
    }

    #[test]
    fn missing_required_field_invalidates_the_session() {
        let session = sample();
        let mut map: HashMap<String, String> = session
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        map.remove("user_id");

        assert!(SessionData::from_fields(&map).is_none());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let session = sample();
        let mut map: HashMap<String, String> = session
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        map.insert("legacy_field".to_string(), "whatever".to_string());

        assert!(SessionData::from_fields(&map).is_some());
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let mut session = sample();
        session.ip_address = None;
        session.user_agent = None;
        let map: HashMap<String, String> = session
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let restored = SessionData::from_fields(&map).unwrap();
        assert_eq!(restored.ip_address, None);
        assert_eq!(restored.user_agent, None);
    }

    #[test]
    fn garbled_timestamp_invalidates_the_session() {
        let session = sample();
        let mut map: HashMap<String, String> = session
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        map.insert("expires_at".to_string(), "yesterday".to_string());

        assert!(SessionData::from_fields(&map).is_none());
    }
}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use soins_core::ClientType;

/// Durable mirror of the fast-store session hash. The fast store is
/// authoritative for liveness; these rows serve audit and read fallback.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub token: String,
    pub establishment_id: Uuid,
    pub user_id: Uuid,
    pub client_type: ClientType,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub last_activity: DateTimeWithTimeZone,
    pub expires_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_live(&self) -> bool {
        DateTime::<Utc>::from(self.expires_at) > Utc::now()
    }
}

impl ActiveModel {
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        token: String,
        establishment_id: Uuid,
        user_id: Uuid,
        client_type: ClientType,
        ip_address: Option<String>,
        user_agent: Option<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: Set(token),
            establishment_id: Set(establishment_id),
            user_id: Set(user_id),
            client_type: Set(client_type),
            ip_address: Set(ip_address),
            user_agent: Set(user_agent),
            created_at: Set(created_at.into()),
            last_activity: Set(created_at.into()),
            expires_at: Set(expires_at.into()),
        }
    }
}

impl Entity {
    /// Fallback read path: only rows that have not reached their horizon.
    pub async fn find_live(
        db: &DatabaseConnection,
        establishment_id: Uuid,
        token: &str,
    ) -> Result<Option<Model>, DbErr> {
        Self::find_by_id(token.to_string())
            .filter(Column::EstablishmentId.eq(establishment_id))
            .filter(Column::ExpiresAt.gt(Utc::now()))
            .one(db)
            .await
    }
}

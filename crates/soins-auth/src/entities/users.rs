use sea_orm::entity::prelude::*;
use sea_orm::QuerySelect;
use serde::{Deserialize, Serialize};

use soins_core::UserStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub identifiant: String,
    pub password_hash: String,
    pub salt: String,
    pub nom: String,
    pub prenoms: String,
    pub telephone: Option<String>,
    pub est_admin: bool,
    pub type_admin: Option<String>,
    pub est_medecin: bool,
    pub must_change_password: bool,
    pub statut: UserStatus,
    pub last_login_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_actif(&self) -> bool {
        self.statut == UserStatus::Actif
    }

    pub fn is_super_admin(&self) -> bool {
        self.est_admin && soins_core::AdminType::is_super_admin(self.type_admin.as_deref())
    }
}

impl Entity {
    pub async fn find_by_identifiant(
        db: &DatabaseConnection,
        establishment_id: Uuid,
        identifiant: &str,
    ) -> Result<Option<Model>, DbErr> {
        Self::find()
            .filter(Column::EstablishmentId.eq(establishment_id))
            .filter(Column::Identifiant.eq(identifiant))
            .one(db)
            .await
    }

    /// Row-locked fetch used inside the password-change transaction.
    pub async fn find_by_id_for_update<C: ConnectionTrait>(
        conn: &C,
        establishment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Model>, DbErr> {
        Self::find_by_id(user_id)
            .filter(Column::EstablishmentId.eq(establishment_id))
            .lock_exclusive()
            .one(conn)
            .await
    }
}

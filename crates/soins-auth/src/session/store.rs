use std::time::Duration;

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use soins_core::{EstablishmentContext, TenantKeyBuilder};

use crate::entities::sessions;
use crate::error::AuthError;
use crate::session::SessionData;

/// Dual-backed session persistence: write-through to the fast store, shadow
/// write to the durable store, read-through with promotion. The fast store is
/// authoritative for liveness, the durable store for audit. The blacklist
/// lives in the fast store only.
#[derive(Clone)]
pub struct SessionStore {
    redis: redis::Client,
    db: DatabaseConnection,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(redis: redis::Client, db: DatabaseConnection, ttl: Duration) -> Self {
        Self { redis, db, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Writes the session hash and the user-session set in one atomic
    /// pipeline, then shadow-writes the durable row. Either store alone is
    /// enough for the session to survive; only a double failure is an error.
    pub async fn create(
        &self,
        tenant: &EstablishmentContext,
        session: &SessionData,
    ) -> Result<(), AuthError> {
        let keys = TenantKeyBuilder::new(&tenant.establishment_code);

        let fast_result = self.write_fast(&keys, session).await;
        if let Err(err) = &fast_result {
            tracing::warn!(
                tenant = tenant.establishment_code.as_str(),
                token = session.token.as_str(),
                error = %err,
                "fast-store session write failed, falling back to durable only"
            );
        }

        let durable_result = self.upsert_durable(session).await;
        match (&fast_result, durable_result) {
            (_, Ok(())) => Ok(()),
            (Ok(()), Err(err)) => {
                tracing::warn!(
                    tenant = tenant.establishment_code.as_str(),
                    token = session.token.as_str(),
                    error = %err,
                    "durable session write failed, fast store holds the session"
                );
                Ok(())
            }
            (Err(_), Err(err)) => Err(err.into()),
        }
    }

    /// Read path: blacklist, then the fast hash, then the durable row.
    /// Fast hits refresh `last_activity` asynchronously; durable hits are
    /// re-synced to the fast store asynchronously.
    pub async fn get(
        &self,
        tenant: &EstablishmentContext,
        token: &str,
    ) -> Result<SessionData, AuthError> {
        let keys = TenantKeyBuilder::new(&tenant.establishment_code);

        match self.read_fast(&keys, token).await {
            Ok(FastRead::Revoked) => return Err(AuthError::TokenRevoked),
            Ok(FastRead::Hit(session)) => {
                self.spawn_touch(keys, token.to_string());
                return Ok(session);
            }
            Ok(FastRead::Miss) => {}
            Err(err) => {
                tracing::warn!(
                    tenant = tenant.establishment_code.as_str(),
                    error = %err,
                    "fast-store session read failed, falling back to durable store"
                );
            }
        }

        let row = sessions::Entity::find_live(&self.db, tenant.establishment_id, token).await?;
        match row {
            Some(row) => {
                let session = SessionData::from(row);
                self.spawn_promote(keys, session.clone());
                Ok(session)
            }
            None => Err(AuthError::InvalidToken),
        }
    }

    /// Revocation: one atomic pipeline adds the blacklist tombstone, removes
    /// the session hash, the user-set entry and both permission-cache shapes,
    /// then the durable row goes away best-effort. Never fails.
    pub async fn delete_idempotent(
        &self,
        tenant: &EstablishmentContext,
        token: &str,
        user_id: Option<Uuid>,
    ) {
        let keys = TenantKeyBuilder::new(&tenant.establishment_code);

        if let Err(err) = self.delete_fast(&keys, token, user_id).await {
            tracing::warn!(
                tenant = tenant.establishment_code.as_str(),
                token,
                error = %err,
                "fast-store session delete failed"
            );
        }

        if let Err(err) = sessions::Entity::delete_by_id(token.to_string())
            .exec(&self.db)
            .await
        {
            tracing::warn!(
                tenant = tenant.establishment_code.as_str(),
                token,
                error = %err,
                "durable session delete failed"
            );
        }
    }

    async fn write_fast(
        &self,
        keys: &TenantKeyBuilder,
        session: &SessionData,
    ) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let session_key = keys.session(&session.token);
        let user_set_key = keys.user_sessions(session.user_id);
        let ttl = self.ttl.as_secs();

        let mut pipe = redis::pipe();
        pipe.atomic();
        {
            let hset = pipe.cmd("HSET").arg(&session_key);
            for (field, value) in session.to_fields() {
                hset.arg(field).arg(value);
            }
        }
        pipe.cmd("EXPIRE").arg(&session_key).arg(ttl);
        pipe.cmd("SADD").arg(&user_set_key).arg(&session.token);
        pipe.cmd("EXPIRE").arg(&user_set_key).arg(ttl);
        pipe.query_async::<()>(&mut conn).await
    }

    async fn upsert_durable(&self, session: &SessionData) -> Result<(), sea_orm::DbErr> {
        let record = sessions::ActiveModel::record(
            session.token.clone(),
            session.establishment_id,
            session.user_id,
            session.client_type,
            session.ip_address.clone(),
            session.user_agent.clone(),
            session.created_at,
            session.expires_at,
        );

        sessions::Entity::insert(record)
            .on_conflict(
                OnConflict::column(sessions::Column::Token)
                    .update_columns([
                        sessions::Column::LastActivity,
                        sessions::Column::ExpiresAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map(|_| ())
    }

    async fn read_fast(
        &self,
        keys: &TenantKeyBuilder,
        token: &str,
    ) -> Result<FastRead, redis::RedisError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let revoked: bool = redis::cmd("EXISTS")
            .arg(keys.blacklist(token))
            .query_async(&mut conn)
            .await?;
        if revoked {
            return Ok(FastRead::Revoked);
        }

        let fields: std::collections::HashMap<String, String> = redis::cmd("HGETALL")
            .arg(keys.session(token))
            .query_async(&mut conn)
            .await?;
        if fields.is_empty() {
            return Ok(FastRead::Miss);
        }

        // A hash that lost required fields is treated as absent; the durable
        // fallback re-syncs a clean copy.
        match SessionData::from_fields(&fields) {
            Some(session) => Ok(FastRead::Hit(session)),
            None => {
                tracing::warn!(
                    tenant = keys.tenant_code(),
                    token,
                    "session hash failed field validation, deferring to durable store"
                );
                Ok(FastRead::Miss)
            }
        }
    }

    async fn delete_fast(
        &self,
        keys: &TenantKeyBuilder,
        token: &str,
        user_id: Option<Uuid>,
    ) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let ttl = self.ttl.as_secs();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.cmd("SET")
            .arg(keys.blacklist(token))
            .arg(Utc::now().to_rfc3339())
            .arg("EX")
            .arg(ttl);
        pipe.cmd("DEL").arg(keys.session(token));
        if let Some(user_id) = user_id {
            pipe.cmd("SREM").arg(keys.user_sessions(user_id)).arg(token);
            pipe.cmd("DEL").arg(keys.permissions(user_id));
            pipe.cmd("DEL").arg(keys.permissions_detail(user_id));
        }
        pipe.query_async::<()>(&mut conn).await
    }

    /// Best-effort `last_activity` refresh after a fast-store hit. A missed
    /// update never invalidates a session.
    fn spawn_touch(&self, keys: TenantKeyBuilder, token: String) {
        let redis = self.redis.clone();
        let db = self.db.clone();
        tokio::spawn(async move {
            let now = Utc::now();

            if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
                let _: Result<(), redis::RedisError> = redis::cmd("HSET")
                    .arg(keys.session(&token))
                    .arg("last_activity")
                    .arg(now.to_rfc3339())
                    .query_async(&mut conn)
                    .await;
            }

            let update = sessions::Entity::update_many()
                .col_expr(sessions::Column::LastActivity, Expr::value(now))
                .filter(sessions::Column::Token.eq(token.clone()))
                .exec(&db)
                .await;
            if let Err(err) = update {
                tracing::debug!(token, error = %err, "session last-activity refresh skipped");
            }
        });
    }

    /// Best-effort re-sync of a durable hit back into the fast store.
    fn spawn_promote(&self, keys: TenantKeyBuilder, session: SessionData) {
        let store = self.clone();
        tokio::spawn(async move {
            if let Err(err) = store.write_fast(&keys, &session).await {
                tracing::debug!(
                    token = session.token.as_str(),
                    error = %err,
                    "session promotion to fast store skipped"
                );
            }
        });
    }
}

enum FastRead {
    Revoked,
    Hit(SessionData),
    Miss,
}

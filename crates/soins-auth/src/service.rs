use std::time::Duration;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, Set, Statement, TransactionTrait,
};

use soins_core::{ClientType, EstablishmentContext, SessionContext, TenantKeyBuilder};

use crate::dto::{
    ChangePasswordData, ChangePasswordRequest, LoginData, LoginRequest, LogoutResponse, MeData,
    SessionInfo, SetupState, UserPayload,
};
use crate::entities::users;
use crate::error::AuthError;
use crate::password::{generate_salt, hash_password, verify_password, DummyCredentials};
use crate::permissions::PermissionResolver;
use crate::rate_limit::{LoginRateLimiter, RateLimitDecision};
use crate::session::{SessionData, SessionStore};
use crate::token;

/// Login/Logout/Me/ChangePassword orchestrator composing the hasher, the
/// token issuer, the rate limiter, the session store and the permission
/// resolver.
#[derive(Clone)]
pub struct AuthService {
    db: DatabaseConnection,
    sessions: SessionStore,
    permissions: PermissionResolver,
    rate_limiter: LoginRateLimiter,
    dummy: DummyCredentials,
    session_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub client_type: ClientType,
    pub request: LoginRequest,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuthService {
    pub fn new(
        db: DatabaseConnection,
        redis: redis::Client,
        session_ttl: Duration,
    ) -> Self {
        Self {
            sessions: SessionStore::new(redis.clone(), db.clone(), session_ttl),
            permissions: PermissionResolver::new(redis.clone(), db.clone(), session_ttl),
            rate_limiter: LoginRateLimiter::new(redis),
            dummy: DummyCredentials::generate(),
            session_ttl,
            db,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn permissions(&self) -> &PermissionResolver {
        &self.permissions
    }

    pub async fn login(
        &self,
        tenant: &EstablishmentContext,
        input: LoginInput,
    ) -> Result<LoginData, AuthError> {
        input.request.validate()?;
        let keys = TenantKeyBuilder::new(&tenant.establishment_code);
        let identifiant = input.request.identifiant.trim().to_string();

        if let RateLimitDecision::Throttled {
            retry_after_seconds,
        } = self.rate_limiter.check(&keys, &identifiant).await
        {
            tracing::warn!(
                target: "audit",
                event = "auth.login",
                outcome = "throttled",
                tenant = tenant.establishment_code.as_str(),
                identifiant = identifiant.as_str(),
                "login throttled"
            );
            return Err(AuthError::RateLimitExceeded {
                retry_after_seconds,
            });
        }

        let user =
            users::Entity::find_by_identifiant(&self.db, tenant.establishment_id, &identifiant)
                .await?;

        // The password is verified even when the identifier is unknown or the
        // account is not actif, so response timing stays uniform.
        let (salt, digest) = match &user {
            Some(user) => (user.salt.as_str(), user.password_hash.as_str()),
            None => (self.dummy.salt.as_str(), self.dummy.digest.as_str()),
        };
        let password_ok = verify_password(&input.request.password, salt, digest)?;

        let user = match user {
            Some(user) if password_ok && user.is_actif() => user,
            _ => {
                self.rate_limiter.record_failure(&keys, &identifiant).await;
                tracing::warn!(
                    target: "audit",
                    event = "auth.login",
                    outcome = "invalid_credentials",
                    tenant = tenant.establishment_code.as_str(),
                    identifiant = identifiant.as_str(),
                    "login rejected"
                );
                return Err(AuthError::InvalidCredentials);
            }
        };

        // Checked only after a successful verification, and without touching
        // the failure counter: a mismatched surface is not a bad password.
        validate_client_type(input.client_type, user.est_admin)?;

        let now = Utc::now();
        let session = SessionData {
            token: token::issue(),
            user_id: user.id,
            establishment_id: tenant.establishment_id,
            client_type: input.client_type,
            ip_address: input.ip_address,
            user_agent: input.user_agent,
            created_at: now,
            last_activity: now,
            expires_at: now + chrono::Duration::seconds(self.session_ttl.as_secs() as i64),
        };
        self.sessions.create(tenant, &session).await?;

        let super_admin_back_office =
            user.is_super_admin() && input.client_type == ClientType::BackOffice;
        let permissions = match self
            .permissions
            .warm(&keys, user.id, super_admin_back_office)
            .await
        {
            Ok(matrix) => matrix,
            Err(err) => {
                // The session must not survive without a warmed permission
                // cache; roll it back before surfacing the failure.
                self.sessions
                    .delete_idempotent(tenant, &session.token, Some(user.id))
                    .await;
                return Err(err);
            }
        };

        let setup = if input.client_type == ClientType::BackOffice {
            self.fetch_setup_state(tenant).await
        } else {
            None
        };

        self.rate_limiter.clear(&keys, &identifiant).await;
        self.touch_last_login(user.id).await;

        tracing::info!(
            target: "audit",
            event = "auth.login",
            outcome = "success",
            tenant = tenant.establishment_code.as_str(),
            user_id = %user.id,
            client_type = %input.client_type,
            "login succeeded"
        );

        Ok(LoginData {
            token: session.token,
            expires_at: session.expires_at,
            front_office: !user.est_admin,
            back_office: user.est_admin,
            user: UserPayload::from(&user),
            permissions,
            setup,
        })
    }

    /// Idempotent and total: looks up the session for audit purposes, revokes
    /// it, and reports success regardless of what it found.
    pub async fn logout(&self, tenant: &EstablishmentContext, token: &str) -> LogoutResponse {
        let session = match self.sessions.get(tenant, token).await {
            Ok(session) => Some(session),
            Err(_) => None,
        };
        let user_id = session.as_ref().map(|s| s.user_id);

        self.sessions.delete_idempotent(tenant, token, user_id).await;

        if let Some(user_id) = user_id {
            let keys = TenantKeyBuilder::new(&tenant.establishment_code);
            self.permissions.invalidate(&keys, user_id).await;
        }

        let session_duration_secs = session
            .as_ref()
            .map(|s| (Utc::now() - s.created_at).num_seconds());
        tracing::info!(
            target: "audit",
            event = "auth.logout",
            tenant = tenant.establishment_code.as_str(),
            user_id = %session.as_ref().map(|s| s.user_id.to_string()).unwrap_or_default(),
            client_type = %session.as_ref().map(|s| s.client_type.to_string()).unwrap_or_default(),
            session_duration_secs,
            ip_address = %session.as_ref().and_then(|s| s.ip_address.clone()).unwrap_or_default(),
            user_agent = %session.as_ref().and_then(|s| s.user_agent.clone()).unwrap_or_default(),
            "logout"
        );

        LogoutResponse::ok()
    }

    /// Requires the upstream middleware to have validated the session and
    /// injected the contexts. Fails when the user row is gone or not actif.
    pub async fn me(
        &self,
        tenant: &EstablishmentContext,
        session: &SessionContext,
    ) -> Result<MeData, AuthError> {
        let user = users::Entity::find_by_id(session.user_id)
            .filter(users::Column::EstablishmentId.eq(tenant.establishment_id))
            .one(&self.db)
            .await?
            .filter(users::Model::is_actif)
            .ok_or(AuthError::UserNotFound)?;

        let keys = TenantKeyBuilder::new(&tenant.establishment_code);
        let super_admin_back_office =
            user.is_super_admin() && session.client_type == ClientType::BackOffice;
        let permissions = self
            .permissions
            .resolve(&keys, user.id, super_admin_back_office)
            .await?;

        Ok(MeData {
            user: UserPayload::from(&user),
            permissions,
            session: SessionInfo {
                token: session.token.clone(),
                client_type: session.client_type,
                expires_at: session.expires_at,
            },
        })
    }

    /// Row-locked password rotation inside a single durable transaction.
    pub async fn change_password(
        &self,
        tenant: &EstablishmentContext,
        session: &SessionContext,
        request: ChangePasswordRequest,
    ) -> Result<ChangePasswordData, AuthError> {
        if request.new_password != request.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let txn = self.db.begin().await?;

        let user = users::Entity::find_by_id_for_update(
            &txn,
            tenant.establishment_id,
            session.user_id,
        )
        .await?
        .filter(users::Model::is_actif)
        .ok_or(AuthError::UserNotFound)?;

        if !verify_password(&request.current_password, &user.salt, &user.password_hash)? {
            return Err(AuthError::InvalidCurrentPassword);
        }

        let salt = generate_salt();
        let digest = hash_password(&request.new_password, &salt)?;

        let mut active: users::ActiveModel = user.into();
        active.salt = Set(salt);
        active.password_hash = Set(digest);
        active.must_change_password = Set(false);
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;

        txn.commit().await?;

        tracing::info!(
            target: "audit",
            event = "auth.change_password",
            tenant = tenant.establishment_code.as_str(),
            user_id = %session.user_id,
            "password changed"
        );

        Ok(ChangePasswordData {
            success: true,
            message: "Mot de passe modifié avec succès".to_string(),
            must_change_password: false,
        })
    }

    /// Back-office logins surface onboarding progress when available; any
    /// failure here degrades to an absent `setup` block.
    async fn fetch_setup_state(&self, tenant: &EstablishmentContext) -> Option<SetupState> {
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT setup_complete, setup_current_step FROM establishments WHERE id = $1",
            [tenant.establishment_id.into()],
        );

        match self.db.query_one(statement).await {
            Ok(Some(row)) => {
                let setup_complete = row.try_get("", "setup_complete").ok()?;
                let setup_current_step = row.try_get("", "setup_current_step").ok()?;
                Some(SetupState {
                    setup_complete,
                    setup_current_step,
                })
            }
            Ok(None) => None,
            Err(err) => {
                tracing::debug!(
                    tenant = tenant.establishment_code.as_str(),
                    error = %err,
                    "setup state lookup skipped"
                );
                None
            }
        }
    }

    async fn touch_last_login(&self, user_id: uuid::Uuid) {
        let update = users::Entity::update_many()
            .col_expr(users::Column::LastLoginAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.db)
            .await;
        if let Err(err) = update {
            tracing::debug!(%user_id, error = %err, "last-login refresh skipped");
        }
    }
}

/// Hard routing rule: back-office requires an admin account, front-office a
/// non-admin one.
fn validate_client_type(client_type: ClientType, est_admin: bool) -> Result<(), AuthError> {
    let allowed = match client_type {
        ClientType::BackOffice => est_admin,
        ClientType::FrontOffice => !est_admin,
    };
    if allowed {
        Ok(())
    } else {
        Err(AuthError::ClientTypeMismatch)
    }
}

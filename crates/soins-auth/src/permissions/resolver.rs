use std::time::Duration;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use uuid::Uuid;

use soins_core::TenantKeyBuilder;

use crate::error::AuthError;
use crate::permissions::{aggregate_rows, PermissionMatrix, PermissionRow};

/// Effective grants of a user: union of active profile-template bindings and
/// direct user grants, restricted to active modules and rubrics. Each branch
/// carries its `acces_toutes_rubriques` flag; the fold in `aggregate_rows`
/// applies the full-access-wins rule.
const EFFECTIVE_GRANTS_SQL: &str = r#"
WITH modules_effectifs AS (
    SELECT m.id, m.code_module, m.nom_standard, m.nom_personnalise, m.description,
           BOOL_OR(src.acces_toutes_rubriques) AS acces_toutes_rubriques
    FROM modules m
    JOIN (
        SELECT pm.module_id, pm.acces_toutes_rubriques
        FROM profil_modules pm
        JOIN user_profils up ON up.profil_id = pm.profil_id
        JOIN profil_templates pt ON pt.id = pm.profil_id
        WHERE up.user_id = $1 AND up.est_actif = TRUE AND pt.est_actif = TRUE
        UNION ALL
        SELECT um.module_id, um.acces_toutes_rubriques
        FROM user_modules um
        WHERE um.user_id = $1
    ) src ON src.module_id = m.id
    WHERE m.est_actif = TRUE
    GROUP BY m.id, m.code_module, m.nom_standard, m.nom_personnalise, m.description
),
rubriques_effectives AS (
    SELECT r.module_id, r.code_rubrique, r.nom, r.description, r.ordre_affichage
    FROM rubriques r
    JOIN profil_rubriques pr ON pr.rubrique_id = r.id
    JOIN user_profils up ON up.profil_id = pr.profil_id
    JOIN profil_templates pt ON pt.id = pr.profil_id
    WHERE up.user_id = $1 AND up.est_actif = TRUE AND pt.est_actif = TRUE
          AND r.est_actif = TRUE
    UNION
    SELECT r.module_id, r.code_rubrique, r.nom, r.description, r.ordre_affichage
    FROM rubriques r
    JOIN user_rubriques ur ON ur.rubrique_id = r.id
    WHERE ur.user_id = $1 AND r.est_actif = TRUE
)
SELECT me.code_module, me.nom_standard, me.nom_personnalise, me.description,
       me.acces_toutes_rubriques,
       re.code_rubrique, re.nom AS rubrique_nom,
       re.description AS rubrique_description, re.ordre_affichage
FROM modules_effectifs me
LEFT JOIN rubriques_effectives re ON re.module_id = me.id
ORDER BY me.code_module, re.code_rubrique
"#;

/// Super-admin back-office branch: every active back-office module, full access.
const BACK_OFFICE_MODULES_SQL: &str = r#"
SELECT m.code_module, m.nom_standard, m.nom_personnalise, m.description,
       TRUE AS acces_toutes_rubriques,
       NULL::text AS code_rubrique, NULL::text AS rubrique_nom,
       NULL::text AS rubrique_description, NULL::integer AS ordre_affichage
FROM modules m
WHERE m.est_actif = TRUE AND m.est_module_back_office = TRUE
ORDER BY m.code_module
"#;

/// Computes a user's permission matrix and caches it in two coexisting
/// shapes: a membership set for O(1) checks and a JSON blob for one-shot
/// retrieval. Both shapes are written in one pipeline so they cannot diverge.
#[derive(Clone)]
pub struct PermissionResolver {
    redis: redis::Client,
    db: DatabaseConnection,
    ttl: Duration,
}

impl PermissionResolver {
    pub fn new(redis: redis::Client, db: DatabaseConnection, ttl: Duration) -> Self {
        Self { redis, db, ttl }
    }

    /// Runs the grants query (or the super-admin back-office branch) and
    /// folds the rows into a matrix.
    pub async fn compute(
        &self,
        user_id: Uuid,
        super_admin_back_office: bool,
    ) -> Result<PermissionMatrix, AuthError> {
        let statement = if super_admin_back_office {
            Statement::from_string(DbBackend::Postgres, BACK_OFFICE_MODULES_SQL)
        } else {
            Statement::from_sql_and_values(DbBackend::Postgres, EFFECTIVE_GRANTS_SQL, [user_id.into()])
        };

        let rows = self.db.query_all(statement).await?;
        let mut flattened = Vec::with_capacity(rows.len());
        for row in rows {
            flattened.push(PermissionRow {
                module_code: row.try_get("", "code_module")?,
                nom_standard: row.try_get("", "nom_standard")?,
                nom_personnalise: row.try_get("", "nom_personnalise")?,
                description: row.try_get("", "description")?,
                acces_toutes_rubriques: row.try_get("", "acces_toutes_rubriques")?,
                rubrique_code: row.try_get("", "code_rubrique")?,
                rubrique_nom: row.try_get("", "rubrique_nom")?,
                rubrique_description: row.try_get("", "rubrique_description")?,
                ordre_affichage: row.try_get("", "ordre_affichage")?,
            });
        }

        Ok(aggregate_rows(flattened))
    }

    /// Writes both cache shapes atomically: the membership set is rebuilt
    /// from scratch, the JSON detail replaced, both with the session TTL.
    pub async fn cache(
        &self,
        keys: &TenantKeyBuilder,
        user_id: Uuid,
        matrix: &PermissionMatrix,
    ) -> Result<(), AuthError> {
        let set_key = keys.permissions(user_id);
        let detail_key = keys.permissions_detail(user_id);
        let json = serde_json::to_string(matrix)?;
        let ttl = self.ttl.as_secs();

        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.cmd("DEL").arg(&set_key);
        let entries = matrix.cache_entries();
        if !entries.is_empty() {
            {
                let sadd = pipe.cmd("SADD").arg(&set_key);
                for entry in &entries {
                    sadd.arg(entry);
                }
            }
            pipe.cmd("EXPIRE").arg(&set_key).arg(ttl);
        }
        pipe.cmd("SET").arg(&detail_key).arg(json).arg("EX").arg(ttl);
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    /// Compute + cache in one step; the login path treats any failure here as
    /// fatal and rolls the session back.
    pub async fn warm(
        &self,
        keys: &TenantKeyBuilder,
        user_id: Uuid,
        super_admin_back_office: bool,
    ) -> Result<PermissionMatrix, AuthError> {
        let matrix = self.compute(user_id, super_admin_back_office).await?;
        self.cache(keys, user_id, &matrix).await?;
        Ok(matrix)
    }

    /// O(1) membership check against the set shape. When the fast store is
    /// down the check recomputes from the durable store instead of denying.
    pub async fn check(
        &self,
        keys: &TenantKeyBuilder,
        user_id: Uuid,
        module: &str,
        rubric: Option<&str>,
    ) -> Result<bool, AuthError> {
        match self.check_fast(keys, user_id, module, rubric).await {
            Ok(allowed) => Ok(allowed),
            Err(err) => {
                tracing::warn!(
                    tenant = keys.tenant_code(),
                    %user_id,
                    error = %err,
                    "permission set unavailable, recomputing from durable store"
                );
                let matrix = self.compute(user_id, false).await?;
                Ok(matrix.allows(module, rubric))
            }
        }
    }

    /// JSON-shape read for one-shot retrieval. A blob that fails to parse is
    /// treated as divergence: both shapes are dropped and the caller
    /// recomputes.
    pub async fn cached_matrix(
        &self,
        keys: &TenantKeyBuilder,
        user_id: Uuid,
    ) -> Result<Option<PermissionMatrix>, AuthError> {
        let detail_key = keys.permissions_detail(user_id);
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(&detail_key)
            .query_async(&mut conn)
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<PermissionMatrix>(&raw) {
            Ok(matrix) => Ok(Some(matrix)),
            Err(err) => {
                tracing::warn!(
                    tenant = keys.tenant_code(),
                    %user_id,
                    error = %err,
                    "permission detail cache diverged, dropping both shapes"
                );
                self.invalidate(keys, user_id).await;
                Ok(None)
            }
        }
    }

    /// Fetch-or-compute used by Me: cached JSON when present, otherwise a
    /// fresh compute + cache.
    pub async fn resolve(
        &self,
        keys: &TenantKeyBuilder,
        user_id: Uuid,
        super_admin_back_office: bool,
    ) -> Result<PermissionMatrix, AuthError> {
        match self.cached_matrix(keys, user_id).await {
            Ok(Some(matrix)) => Ok(matrix),
            Ok(None) => self.warm(keys, user_id, super_admin_back_office).await,
            Err(err) => {
                tracing::warn!(
                    tenant = keys.tenant_code(),
                    %user_id,
                    error = %err,
                    "permission cache read failed, recomputing"
                );
                self.compute(user_id, super_admin_back_office).await
            }
        }
    }

    /// Drops both cache shapes. Best-effort: revocation must not fail.
    pub async fn invalidate(&self, keys: &TenantKeyBuilder, user_id: Uuid) {
        let result: Result<(), redis::RedisError> = async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;
            redis::cmd("DEL")
                .arg(keys.permissions(user_id))
                .arg(keys.permissions_detail(user_id))
                .query_async::<()>(&mut conn)
                .await
        }
        .await;

        if let Err(err) = result {
            tracing::warn!(
                tenant = keys.tenant_code(),
                %user_id,
                error = %err,
                "permission cache invalidation failed"
            );
        }
    }

    /// Explicit refresh: invalidate + recompute + re-cache.
    pub async fn refresh(
        &self,
        keys: &TenantKeyBuilder,
        user_id: Uuid,
        super_admin_back_office: bool,
    ) -> Result<PermissionMatrix, AuthError> {
        self.invalidate(keys, user_id).await;
        self.warm(keys, user_id, super_admin_back_office).await
    }

    async fn check_fast(
        &self,
        keys: &TenantKeyBuilder,
        user_id: Uuid,
        module: &str,
        rubric: Option<&str>,
    ) -> Result<bool, redis::RedisError> {
        let set_key = keys.permissions(user_id);
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let full: bool = redis::cmd("SISMEMBER")
            .arg(&set_key)
            .arg(format!("module:{module}"))
            .query_async(&mut conn)
            .await?;
        if full {
            return Ok(true);
        }

        if let Some(rubric) = rubric {
            let partial: bool = redis::cmd("SISMEMBER")
                .arg(&set_key)
                .arg(format!("rubric:{module}:{rubric}"))
                .query_async(&mut conn)
                .await?;
            return Ok(partial);
        }

        Ok(false)
    }
}

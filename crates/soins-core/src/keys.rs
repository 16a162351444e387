use std::fmt;

/// Namespace literal shared by every fast-store key. Operational tooling
/// matches on `KEYS soins_suite_{tenant}_*`, so the layout is byte-exact.
pub const KEY_NAMESPACE: &str = "soins_suite";

/// Builds the tenant-scoped fast-store keys: `soins_suite_{tenant}_{domain}_{context}:{id}`.
#[derive(Debug, Clone)]
pub struct TenantKeyBuilder {
    tenant_code: String,
}

impl TenantKeyBuilder {
    pub fn new(tenant_code: impl Into<String>) -> Self {
        Self {
            tenant_code: tenant_code.into(),
        }
    }

    pub fn tenant_code(&self) -> &str {
        &self.tenant_code
    }

    fn key(&self, suffix: &str, id: impl fmt::Display) -> String {
        format!("{KEY_NAMESPACE}_{}_{suffix}:{id}", self.tenant_code)
    }

    /// Session payload hash, TTL 1h.
    pub fn session(&self, token: &str) -> String {
        self.key("auth_session", token)
    }

    /// Set of a user's live tokens, TTL 1h.
    pub fn user_sessions(&self, user_id: impl fmt::Display) -> String {
        self.key("auth_user_sessions", user_id)
    }

    /// Blacklist tombstone for a revoked token, TTL 1h.
    pub fn blacklist(&self, token: &str) -> String {
        self.key("auth_blacklist", token)
    }

    /// Permission membership set (`module:{code}` / `rubric:{module}:{code}`), TTL 1h.
    pub fn permissions(&self, user_id: impl fmt::Display) -> String {
        self.key("auth_permissions", user_id)
    }

    /// Full permission matrix as JSON, TTL 1h.
    pub fn permissions_detail(&self, user_id: impl fmt::Display) -> String {
        self.key("auth_permissions_detail", user_id)
    }

    /// Failed-login counter, 15 min sliding expiry.
    pub fn login_attempts(&self, identifiant: &str) -> String {
        self.key("auth_login_attempts", identifiant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_layout_is_byte_exact() {
        let keys = TenantKeyBuilder::new("CLINIC01");
        assert_eq!(
            keys.session("0193d3a2-aaaa-bbbb-cccc-0123456789ab"),
            "soins_suite_CLINIC01_auth_session:0193d3a2-aaaa-bbbb-cccc-0123456789ab"
        );
    }

    #[test]
    fn per_user_keys_embed_the_user_id() {
        let keys = TenantKeyBuilder::new("CLINIC01");
        let user_id = uuid::Uuid::nil();

        assert_eq!(
            keys.user_sessions(user_id),
            format!("soins_suite_CLINIC01_auth_user_sessions:{user_id}")
        );
        assert_eq!(
            keys.permissions(user_id),
            format!("soins_suite_CLINIC01_auth_permissions:{user_id}")
        );
        assert_eq!(
            keys.permissions_detail(user_id),
            format!("soins_suite_CLINIC01_auth_permissions_detail:{user_id}")
        );
    }

    #[test]
    fn blacklist_and_rate_limit_keys() {
        let keys = TenantKeyBuilder::new("HOP2");
        assert_eq!(keys.blacklist("tok"), "soins_suite_HOP2_auth_blacklist:tok");
        assert_eq!(
            keys.login_attempts("mkoffi"),
            "soins_suite_HOP2_auth_login_attempts:mkoffi"
        );
    }
}

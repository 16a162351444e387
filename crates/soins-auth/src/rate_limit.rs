use soins_core::TenantKeyBuilder;

/// Failed logins allowed inside one window before throttling kicks in.
pub const MAX_FAILED_ATTEMPTS: u64 = 5;
/// Sliding window: set when the counter transitions 0 -> 1.
pub const ATTEMPT_WINDOW_SECS: u64 = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Ok,
    Throttled { retry_after_seconds: u64 },
}

/// Per-tenant per-identifier failed-login counter living in the fast store.
///
/// The counter is advisory: when the fast store is unreachable the limiter
/// fails open and the login stays protected by password verification alone.
#[derive(Clone)]
pub struct LoginRateLimiter {
    redis: redis::Client,
}

impl LoginRateLimiter {
    pub fn new(redis: redis::Client) -> Self {
        Self { redis }
    }

    pub async fn check(&self, keys: &TenantKeyBuilder, identifiant: &str) -> RateLimitDecision {
        let key = keys.login_attempts(identifiant);
        match self.read_counter(&key).await {
            Ok((count, ttl)) if count >= MAX_FAILED_ATTEMPTS => RateLimitDecision::Throttled {
                retry_after_seconds: retry_after_from_ttl(ttl),
            },
            Ok(_) => RateLimitDecision::Ok,
            Err(err) => {
                tracing::warn!(
                    tenant = keys.tenant_code(),
                    identifiant,
                    error = %err,
                    "rate-limit check failed, failing open"
                );
                RateLimitDecision::Ok
            }
        }
    }

    /// Atomically increments the counter; the first failure in a window arms
    /// the 15-minute expiry. Best-effort: fast-store errors are logged.
    pub async fn record_failure(&self, keys: &TenantKeyBuilder, identifiant: &str) {
        let key = keys.login_attempts(identifiant);
        if let Err(err) = self.increment(&key).await {
            tracing::warn!(
                tenant = keys.tenant_code(),
                identifiant,
                error = %err,
                "failed to record login failure"
            );
        }
    }

    /// Deleted on successful login so one good password resets the window.
    pub async fn clear(&self, keys: &TenantKeyBuilder, identifiant: &str) {
        let key = keys.login_attempts(identifiant);
        if let Err(err) = self.delete(&key).await {
            tracing::warn!(
                tenant = keys.tenant_code(),
                identifiant,
                error = %err,
                "failed to clear login attempt counter"
            );
        }
    }

    async fn read_counter(&self, key: &str) -> Result<(u64, i64), redis::RedisError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let count: Option<u64> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        let ttl: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;
        Ok((count.unwrap_or(0), ttl))
    }

    async fn increment(&self, key: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let count: u64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        if count == 1 {
            redis::cmd("EXPIRE")
                .arg(key)
                .arg(ATTEMPT_WINDOW_SECS)
                .query_async::<()>(&mut conn)
                .await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        redis::cmd("DEL").arg(key).query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

/// TTL -2 (missing) or -1 (no expiry) still reports a full window so the
/// caller never sees a zero or negative retry-after.
fn retry_after_from_ttl(ttl: i64) -> u64 {
    if ttl <= 0 {
        ATTEMPT_WINDOW_SECS
    } else {
        (ttl as u64).min(ATTEMPT_WINDOW_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_is_positive_and_bounded() {
        assert_eq!(retry_after_from_ttl(-2), ATTEMPT_WINDOW_SECS);
        assert_eq!(retry_after_from_ttl(-1), ATTEMPT_WINDOW_SECS);
        assert_eq!(retry_after_from_ttl(0), ATTEMPT_WINDOW_SECS);
        assert_eq!(retry_after_from_ttl(1), 1);
        assert_eq!(retry_after_from_ttl(874), 874);
        assert_eq!(retry_after_from_ttl(10_000), ATTEMPT_WINDOW_SECS);
    }

    #[test]
    fn threshold_matches_the_contract() {
        assert_eq!(MAX_FAILED_ATTEMPTS, 5);
        assert_eq!(ATTEMPT_WINDOW_SECS, 900);
    }
}

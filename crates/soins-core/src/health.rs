use sea_orm::DatabaseConnection;

/// Readiness of one backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentHealth {
    Healthy,
    Unhealthy(String),
}

impl ComponentHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub fast_store: ComponentHealth,
    pub durable_store: ComponentHealth,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.fast_store.is_healthy() && self.durable_store.is_healthy()
    }
}

/// Probes both stores. Used by the (external) readiness endpoint after the
/// migration engine has run.
pub async fn check(redis: &redis::Client, db: &DatabaseConnection) -> HealthReport {
    HealthReport {
        fast_store: check_fast_store(redis).await,
        durable_store: check_durable_store(db).await,
    }
}

async fn check_fast_store(redis: &redis::Client) -> ComponentHealth {
    let result: Result<String, redis::RedisError> = async {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async(&mut conn).await
    }
    .await;

    match result {
        Ok(pong) if pong == "PONG" => ComponentHealth::Healthy,
        Ok(pong) => ComponentHealth::Unhealthy(format!("unexpected PING response: {pong}")),
        Err(err) => ComponentHealth::Unhealthy(err.to_string()),
    }
}

async fn check_durable_store(db: &DatabaseConnection) -> ComponentHealth {
    match db.ping().await {
        Ok(()) => ComponentHealth::Healthy,
        Err(err) => ComponentHealth::Unhealthy(err.to_string()),
    }
}

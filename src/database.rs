use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::{config::Config, services::response::ServiceError};

/// Opens the pool, retrying a bounded number of times before giving up.
pub async fn connect(config: &Config) -> Result<PgPool, ServiceError> {
	let mut attempt = 0;
	loop {
		attempt += 1;
		tracing::info!(attempt, "connecting to database");
		match PgPoolOptions::new()
			.max_connections(config.db_max_connections)
			.acquire_timeout(Duration::from_secs(5))
			.connect(&config.database_url)
			.await
		{
			Ok(pool) => {
				tracing::info!(attempt, "database connected");
				return Ok(pool);
			}
			Err(err) if attempt <= config.db_connect_retries => {
				tracing::warn!(attempt, error = %err, delay_ms = config.db_retry_delay.as_millis() as u64, "database connection failed, retrying");
				tokio::time::sleep(config.db_retry_delay).await;
			}
			Err(err) => {
				tracing::error!(attempt, error = %err, "database connection failed, giving up");
				return Err(ServiceError::StoreUnavailable(err.to_string()));
			}
		}
	}
}

pub async fn migrate(pool: &PgPool) -> Result<(), ServiceError> {
	sqlx::migrate!("./migrations")
		.run(pool)
		.await
		.map_err(|err| ServiceError::Internal(format!("migration failed: {err}")))?;
	tracing::info!("database migrations applied");
	Ok(())
}

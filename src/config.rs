use std::{fmt::Display, ops::RangeInclusive, str::FromStr, time::Duration};

use crate::services::response::ServiceError;

const DEV_JWT_SECRET: &str = "development-only-secret";

/// Up to ten years; larger values overflow the token expiry arithmetic.
const JWT_TTL_HOURS: RangeInclusive<i64> = 1..=87_600;
/// The bounds bcrypt itself accepts.
const BCRYPT_COST: RangeInclusive<u32> = 4..=31;

pub struct Config {
	/// Which errors we want to log
	pub log_level: String,

	/// Port server is listening to
	pub server_ip_port: String,
	pub database_url: String,
	pub allow_origins: String,

	pub jwt_secret: String,
	pub jwt_ttl_hours: i64,
	pub bcrypt_cost: u32,

	pub db_max_connections: u32,
	/// Extra attempts after the first failed connection.
	pub db_connect_retries: u32,
	pub db_retry_delay: Duration,
}

impl Config {
	pub fn new() -> Result<Config, ServiceError> {
		dotenv::dotenv().ok();
		let log_level = std::env::var("LOG_LEVEL").unwrap_or("info".to_string());
		let server_ip_port = std::env::var("SERVER_IP_PORT").unwrap_or("0.0.0.0:80".into());
		let database_url = std::env::var("DATABASE_URL").map_err(|_| ServiceError::Configuration("DATABASE_URL must be set".to_string()))?;
		let allow_origins = std::env::var("ALLOW_ORIGINS").unwrap_or("*".to_string());

		let jwt_secret = match std::env::var("JWT_SECRET") {
			Ok(secret) if !secret.trim().is_empty() => secret,
			_ if cfg!(debug_assertions) => {
				tracing::warn!("JWT_SECRET not set, using the development secret");
				DEV_JWT_SECRET.to_string()
			}
			_ => return Err(ServiceError::Configuration("JWT_SECRET must be set".to_string())),
		};

		Ok(Config {
			log_level,
			server_ip_port,
			database_url,
			allow_origins,
			jwt_secret,
			jwt_ttl_hours: parse_var_in("JWT_TTL_HOURS", 24, JWT_TTL_HOURS)?,
			bcrypt_cost: parse_var_in("BCRYPT_COST", 10, BCRYPT_COST)?,
			db_max_connections: parse_var("DB_MAX_CONNECTIONS", 10)?,
			db_connect_retries: parse_var("DB_CONNECT_RETRIES", 2)?,
			db_retry_delay: Duration::from_millis(parse_var("DB_RETRY_DELAY_MS", 1000)?),
		})
	}

	/// Origins for CORS; `None` means any origin.
	pub fn cors_origins(&self) -> Option<Vec<String>> {
		if self.allow_origins.trim() == "*" {
			return None;
		}
		Some(
			self.allow_origins
				.split(',')
				.map(str::trim)
				.filter(|origin| !origin.is_empty())
				.map(str::to_owned)
				.collect(),
		)
	}
}

fn parse_var<T>(
	key: &str,
	default: T,
) -> Result<T, ServiceError>
where
	T: FromStr,
	T::Err: Display,
{
	match std::env::var(key) {
		Ok(raw) => raw
			.trim()
			.parse()
			.map_err(|err| ServiceError::Configuration(format!("invalid {key} value `{raw}`: {err}"))),
		Err(_) => Ok(default),
	}
}

fn parse_var_in<T>(
	key: &str,
	default: T,
	range: RangeInclusive<T>,
) -> Result<T, ServiceError>
where
	T: FromStr + PartialOrd + Display,
	T::Err: Display,
{
	let value = parse_var(key, default)?;
	if !range.contains(&value) {
		return Err(ServiceError::Configuration(format!(
			"{key} must be between {} and {}, got {value}",
			range.start(),
			range.end()
		)));
	}
	Ok(value)
}

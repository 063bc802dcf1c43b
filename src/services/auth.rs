//! Account registration, login and bearer-token verification.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::response::{LoggedIn, ServiceError, UserSummary};
use crate::{
	adapters::repositories::{RepositoryError, UserRepository},
	domain::user::{normalize_email, NewUser, Registration, User, UserId},
};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
	id: UserId,
	iat: i64,
	exp: i64,
}

/// Issues and verifies HS256 bearer tokens.
pub struct TokenService {
	encoding: EncodingKey,
	decoding: DecodingKey,
	ttl: Duration,
}

impl TokenService {
	pub fn new(
		secret: &str,
		ttl: Duration,
	) -> Self {
		Self {
			encoding: EncodingKey::from_secret(secret.as_bytes()),
			decoding: DecodingKey::from_secret(secret.as_bytes()),
			ttl,
		}
	}

	pub fn issue(
		&self,
		user_id: UserId,
	) -> Result<String, ServiceError> {
		let now = Utc::now();
		let claims = Claims {
			id: user_id,
			iat: now.timestamp(),
			exp: (now + self.ttl).timestamp(),
		};
		encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|err| ServiceError::Internal(format!("token signing failed: {err}")))
	}

	/// Resolves a bearer token to the caller's id.
	pub fn verify(
		&self,
		token: &str,
	) -> Result<UserId, ServiceError> {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.leeway = 0;
		decode::<Claims>(token, &self.decoding, &validation)
			.map(|data| data.claims.id)
			.map_err(|err| {
				tracing::debug!(error = %err, "bearer token rejected");
				ServiceError::Unauthenticated
			})
	}
}

pub struct AuthHandler {
	users: Arc<dyn UserRepository>,
	tokens: Arc<TokenService>,
	bcrypt_cost: u32,
}

impl AuthHandler {
	pub fn new(
		users: Arc<dyn UserRepository>,
		tokens: Arc<TokenService>,
		bcrypt_cost: u32,
	) -> Self {
		Self { users, tokens, bcrypt_cost }
	}

	pub async fn register(
		&self,
		registration: Registration,
	) -> Result<User, ServiceError> {
		if self.users.find_by_email(registration.email()).await?.is_some() {
			tracing::info!(email = registration.email(), "registration for existing email");
			return Err(ServiceError::DuplicateKey);
		}

		let password = registration.password().to_owned();
		let cost = self.bcrypt_cost;
		let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
			.await
			.map_err(|err| ServiceError::Internal(format!("hashing task failed: {err}")))?
			.map_err(|err| ServiceError::Internal(format!("password hashing failed: {err}")))?;

		// the lookup above is only a fast path; the unique constraint decides
		let user = self
			.users
			.create(NewUser {
				name: registration.name().to_owned(),
				email: registration.email().to_owned(),
				password_hash,
			})
			.await
			.map_err(|err| match err {
				RepositoryError::DuplicateKey { .. } => ServiceError::DuplicateKey,
				other => other.into(),
			})?;

		tracing::info!(user_id = %user.id, "user registered");
		Ok(user)
	}

	pub async fn login(
		&self,
		email: &str,
		password: &str,
	) -> Result<LoggedIn, ServiceError> {
		let email = normalize_email(email).ok_or(ServiceError::InvalidCredentials)?;
		let Some(user) = self.users.find_by_email(&email).await? else {
			tracing::info!("login for unknown email");
			return Err(ServiceError::InvalidCredentials);
		};

		let password = password.to_owned();
		let hash = user.password_hash.clone();
		let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
			.await
			.map_err(|err| ServiceError::Internal(format!("verification task failed: {err}")))?
			.map_err(|err| ServiceError::Internal(format!("stored password hash unreadable: {err}")))?;
		if !matches {
			tracing::info!(user_id = %user.id, "login with wrong password");
			return Err(ServiceError::InvalidCredentials);
		}

		Ok(LoggedIn {
			message: "Login successful",
			data: UserSummary::from(&user),
			token: self.tokens.issue(user.id)?,
		})
	}

	pub async fn profile(
		&self,
		user_id: &UserId,
	) -> Result<User, ServiceError> {
		self.users
			.find_by_id(user_id)
			.await?
			.ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
	}
}

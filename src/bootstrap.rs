use std::sync::Arc;

use chrono::Duration;
use sqlx::PgPool;

use crate::{
	adapters::repositories::{ArticleRepository, Repository, UserRepository},
	config::Config,
	domain::{article::ArticleAggregate, user::User},
	services::{auth::AuthHandler, auth::TokenService, handlers::SocialHandler, queries::ArticleQueries},
};

/// Everything a request handler needs, built once by the entry point.
///
/// Handlers build their service objects from it per request; nothing in here
/// caches request data.
#[derive(Clone)]
pub struct AppState {
	pub users: Arc<dyn UserRepository>,
	pub articles: Arc<dyn ArticleRepository>,
	pub tokens: Arc<TokenService>,
	pub bcrypt_cost: u32,
}

impl AppState {
	pub fn social(&self) -> SocialHandler {
		SocialHandler::new(self.users.clone(), self.articles.clone())
	}

	pub fn queries(&self) -> ArticleQueries {
		ArticleQueries::new(self.articles.clone())
	}

	pub fn auth(&self) -> AuthHandler {
		AuthHandler::new(self.users.clone(), self.tokens.clone(), self.bcrypt_cost)
	}
}

pub struct Bootstrap;
impl Bootstrap {
	pub fn postgres(
		pool: PgPool,
		config: &Config,
	) -> AppState {
		AppState {
			users: Arc::new(Repository::<User>::new(pool.clone())),
			articles: Arc::new(Repository::<ArticleAggregate>::new(pool)),
			tokens: Arc::new(TokenService::new(&config.jwt_secret, Duration::hours(config.jwt_ttl_hours))),
			bcrypt_cost: config.bcrypt_cost,
		}
	}

	/// State over a fresh in-memory store, with the cheapest bcrypt cost.
	#[cfg(any(test, feature = "test"))]
	pub fn in_memory(jwt_secret: &str) -> AppState {
		let store = Arc::new(crate::adapters::repositories::in_memory::InMemoryStore::new());
		AppState {
			users: store.clone(),
			articles: store,
			tokens: Arc::new(TokenService::new(jwt_secret, Duration::hours(1))),
			bcrypt_cost: 4,
		}
	}
}

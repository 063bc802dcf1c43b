//! Store ports and their adapters.
//!
//! The social services only ever see [`UserRepository`] and
//! [`ArticleRepository`]; the Postgres adapters implement them over a shared
//! pool and the in-memory adapter backs tests.

pub(crate) mod article_repository;
#[cfg(any(test, feature = "test"))]
pub mod in_memory;
pub(crate) mod user_repository;

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{
	article::{
		entity::{ArticleComment, ArticleMetadata, ArticleRef},
		ArticleAggregate,
	},
	user::{NewUser, User, UserId},
};

macro_rules! repository_error {
	(
		$(#[$outer:meta])*
		pub enum $name:ident {
			$( $(#[$variant_meta:meta])* $variant:ident => $message:literal ),* $(,)?
		}
	) => {
		$(#[$outer])*
		#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
		pub enum $name {
			$( $(#[$variant_meta])* #[error($message)] $variant { message: String }, )*
		}

		impl $name {
			$(
				::paste::paste! {
					pub fn [<$variant:snake>](message: impl Into<String>) -> Self {
						Self::$variant { message: message.into() }
					}
				}
			)*
		}
	};
}

repository_error! {
	/// Failures raised by store adapters.
	pub enum RepositoryError {
		/// The store could not be reached.
		Connection => "store connection failed: {message}",
		/// A query or mutation failed while executing.
		Query => "store query failed: {message}",
		/// A unique constraint rejected the write.
		DuplicateKey => "duplicate key: {message}",
	}
}

impl From<sqlx::Error> for RepositoryError {
	fn from(err: sqlx::Error) -> Self {
		tracing::debug!(error = %err, "store operation failed");
		match err {
			sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Self::duplicate_key(db_err.message()),
			sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
				Self::connection(err.to_string())
			}
			other => Self::query(other.to_string()),
		}
	}
}

/// Outcome of a conditional like/unlike at the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeMutation {
	/// Whether the like set actually changed.
	pub changed: bool,
	/// Size of the like set after the mutation.
	pub like_count: i64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
	async fn find_by_email(
		&self,
		email: &str,
	) -> Result<Option<User>, RepositoryError>;

	async fn find_by_id(
		&self,
		id: &UserId,
	) -> Result<Option<User>, RepositoryError>;

	/// Fails with [`RepositoryError::DuplicateKey`] when the email is taken.
	async fn create(
		&self,
		user: NewUser,
	) -> Result<User, RepositoryError>;

	/// Returns `false` when the article was already in the list.
	async fn add_liked_article(
		&self,
		id: &UserId,
		url: &ArticleRef,
		title: &str,
	) -> Result<bool, RepositoryError>;

	/// Returns `false` when there was nothing to remove.
	async fn remove_liked_article(
		&self,
		id: &UserId,
		url: &ArticleRef,
	) -> Result<bool, RepositoryError>;

	async fn add_bookmark(
		&self,
		id: &UserId,
		url: &ArticleRef,
		title: &str,
	) -> Result<bool, RepositoryError>;

	async fn remove_bookmark(
		&self,
		id: &UserId,
		url: &ArticleRef,
	) -> Result<bool, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArticleRepository: Send + Sync {
	async fn find_by_ref(
		&self,
		url: &ArticleRef,
	) -> Result<Option<ArticleAggregate>, RepositoryError>;

	/// Materializes the article on first touch. Losing a creation race is not
	/// an error: the winner's record is returned.
	async fn get_or_create(
		&self,
		url: &ArticleRef,
		metadata: &ArticleMetadata,
	) -> Result<ArticleAggregate, RepositoryError>;

	/// Adds the user's like unless one is already present.
	async fn insert_like(
		&self,
		url: &ArticleRef,
		user_id: &UserId,
		liked_at: DateTime<Utc>,
	) -> Result<LikeMutation, RepositoryError>;

	/// Removes the user's like if present.
	async fn delete_like(
		&self,
		url: &ArticleRef,
		user_id: &UserId,
	) -> Result<LikeMutation, RepositoryError>;

	/// Appends to the comment list and returns the new comment count.
	async fn append_comment(
		&self,
		url: &ArticleRef,
		comment: &ArticleComment,
	) -> Result<i64, RepositoryError>;
}

/// Postgres-backed repository for aggregate `A`.
pub struct Repository<A> {
	pub executor: PgPool,
	pub _phantom: PhantomData<fn() -> A>,
}

impl<A> Repository<A> {
	pub fn new(executor: PgPool) -> Self {
		Self {
			executor,
			_phantom: Default::default(),
		}
	}
}

impl<A> Clone for Repository<A> {
	fn clone(&self) -> Self {
		Self::new(self.executor.clone())
	}
}

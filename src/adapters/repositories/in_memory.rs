//! Process-local store used by tests.
//!
//! Every conditional mutation runs under a single write lock, which gives the
//! same add-if-absent / remove-if-present atomicity the Postgres adapter gets
//! from a row lock held across the write and the count.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{ArticleRepository, LikeMutation, RepositoryError, UserRepository};
use crate::domain::{
	article::{
		entity::{ArticleComment, ArticleLike, ArticleMetadata, ArticleRef},
		ArticleAggregate,
	},
	user::{BookmarkedArticle, LikedArticle, NewUser, User, UserId},
};

#[derive(Default)]
pub struct InMemoryStore {
	users: RwLock<HashMap<UserId, User>>,
	articles: RwLock<HashMap<ArticleRef, ArticleAggregate>>,
}

impl InMemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of article records materialized so far.
	pub async fn article_count(&self) -> usize {
		self.articles.read().await.len()
	}
}

#[async_trait]
impl UserRepository for InMemoryStore {
	async fn find_by_email(
		&self,
		email: &str,
	) -> Result<Option<User>, RepositoryError> {
		Ok(self.users.read().await.values().find(|u| u.email == email).cloned())
	}

	async fn find_by_id(
		&self,
		id: &UserId,
	) -> Result<Option<User>, RepositoryError> {
		Ok(self.users.read().await.get(id).cloned())
	}

	async fn create(
		&self,
		user: NewUser,
	) -> Result<User, RepositoryError> {
		let mut users = self.users.write().await;
		if users.values().any(|u| u.email == user.email) {
			return Err(RepositoryError::duplicate_key(format!("email `{}` already registered", user.email)));
		}
		let created = User {
			id: UserId::new(),
			name: user.name,
			email: user.email,
			password_hash: user.password_hash,
			liked_articles: Vec::new(),
			bookmarked_articles: Vec::new(),
			create_dt: Utc::now(),
		};
		users.insert(created.id, created.clone());
		Ok(created)
	}

	async fn add_liked_article(
		&self,
		id: &UserId,
		url: &ArticleRef,
		title: &str,
	) -> Result<bool, RepositoryError> {
		let mut users = self.users.write().await;
		let user = users.get_mut(id).ok_or_else(|| RepositoryError::query(format!("no user {id}")))?;
		if user.liked_articles.iter().any(|a| &a.article_url == url) {
			return Ok(false);
		}
		user.liked_articles.push(LikedArticle {
			article_url: url.clone(),
			article_title: title.to_owned(),
			liked_at: Utc::now(),
		});
		Ok(true)
	}

	async fn remove_liked_article(
		&self,
		id: &UserId,
		url: &ArticleRef,
	) -> Result<bool, RepositoryError> {
		let mut users = self.users.write().await;
		let Some(user) = users.get_mut(id) else {
			return Ok(false);
		};
		let before = user.liked_articles.len();
		user.liked_articles.retain(|a| &a.article_url != url);
		Ok(user.liked_articles.len() != before)
	}

	async fn add_bookmark(
		&self,
		id: &UserId,
		url: &ArticleRef,
		title: &str,
	) -> Result<bool, RepositoryError> {
		let mut users = self.users.write().await;
		let user = users.get_mut(id).ok_or_else(|| RepositoryError::query(format!("no user {id}")))?;
		if user.bookmarked_articles.iter().any(|a| &a.article_url == url) {
			return Ok(false);
		}
		user.bookmarked_articles.push(BookmarkedArticle {
			article_url: url.clone(),
			article_title: title.to_owned(),
			bookmarked_at: Utc::now(),
		});
		Ok(true)
	}

	async fn remove_bookmark(
		&self,
		id: &UserId,
		url: &ArticleRef,
	) -> Result<bool, RepositoryError> {
		let mut users = self.users.write().await;
		let Some(user) = users.get_mut(id) else {
			return Ok(false);
		};
		let before = user.bookmarked_articles.len();
		user.bookmarked_articles.retain(|a| &a.article_url != url);
		Ok(user.bookmarked_articles.len() != before)
	}
}

#[async_trait]
impl ArticleRepository for InMemoryStore {
	async fn find_by_ref(
		&self,
		url: &ArticleRef,
	) -> Result<Option<ArticleAggregate>, RepositoryError> {
		Ok(self.articles.read().await.get(url).cloned())
	}

	async fn get_or_create(
		&self,
		url: &ArticleRef,
		metadata: &ArticleMetadata,
	) -> Result<ArticleAggregate, RepositoryError> {
		let mut articles = self.articles.write().await;
		let article = articles
			.entry(url.clone())
			.or_insert_with(|| ArticleAggregate::new(url.clone(), metadata.clone()));
		Ok(article.clone())
	}

	async fn insert_like(
		&self,
		url: &ArticleRef,
		user_id: &UserId,
		liked_at: DateTime<Utc>,
	) -> Result<LikeMutation, RepositoryError> {
		let mut articles = self.articles.write().await;
		let article = articles.get_mut(url).ok_or_else(|| RepositoryError::query(format!("no article `{url}`")))?;
		let changed = !article.is_liked_by(user_id);
		if changed {
			article.likes.push(ArticleLike {
				user_id: *user_id,
				liked_at,
			});
		}
		Ok(LikeMutation {
			changed,
			like_count: article.like_count(),
		})
	}

	async fn delete_like(
		&self,
		url: &ArticleRef,
		user_id: &UserId,
	) -> Result<LikeMutation, RepositoryError> {
		let mut articles = self.articles.write().await;
		let article = articles.get_mut(url).ok_or_else(|| RepositoryError::query(format!("no article `{url}`")))?;
		let before = article.likes.len();
		article.likes.retain(|like| &like.user_id != user_id);
		Ok(LikeMutation {
			changed: article.likes.len() != before,
			like_count: article.like_count(),
		})
	}

	async fn append_comment(
		&self,
		url: &ArticleRef,
		comment: &ArticleComment,
	) -> Result<i64, RepositoryError> {
		let mut articles = self.articles.write().await;
		let article = articles.get_mut(url).ok_or_else(|| RepositoryError::query(format!("no article `{url}`")))?;
		article.comments.push(comment.clone());
		Ok(article.comment_count())
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use chrono::Utc;

	use super::InMemoryStore;
	use crate::{
		adapters::repositories::{ArticleRepository, RepositoryError, UserRepository},
		domain::{
			article::entity::{ArticleMetadata, ArticleRef},
			user::{NewUser, UserId},
		},
	};

	fn metadata(title: &str) -> ArticleMetadata {
		ArticleMetadata {
			title: title.to_string(),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn test_concurrent_get_or_create_keeps_first_record() {
		'_given: {
			let store = Arc::new(InMemoryStore::new());
			let url = ArticleRef::parse("https://n.example/race").unwrap();

			'_when: {
				let handles: Vec<_> = (0..8)
					.map(|i| {
						let store = store.clone();
						let url = url.clone();
						tokio::spawn(async move { store.get_or_create(&url, &metadata(&format!("title {i}"))).await.unwrap() })
					})
					.collect();
				let mut titles = Vec::new();
				for handle in handles {
					titles.push(handle.await.unwrap().metadata.title.clone());
				}

				'_then: {
					assert_eq!(store.article_count().await, 1);
					let stored = store.find_by_ref(&url).await.unwrap().unwrap();
					assert!(titles.iter().all(|t| t == &stored.metadata.title));
				}
			}
		}
	}

	#[tokio::test]
	async fn test_conditional_like_mutations() {
		let store = InMemoryStore::new();
		let url = ArticleRef::parse("https://n.example/1").unwrap();
		store.get_or_create(&url, &metadata("T")).await.unwrap();
		let user = UserId::new();

		let first = store.insert_like(&url, &user, Utc::now()).await.unwrap();
		let second = store.insert_like(&url, &user, Utc::now()).await.unwrap();
		assert!(first.changed);
		assert!(!second.changed);
		assert_eq!(second.like_count, 1);

		let removed = store.delete_like(&url, &user).await.unwrap();
		let again = store.delete_like(&url, &user).await.unwrap();
		assert!(removed.changed);
		assert!(!again.changed);
		assert_eq!(again.like_count, 0);
	}

	#[tokio::test]
	async fn test_duplicate_email_rejected() {
		let store = InMemoryStore::new();
		let new_user = NewUser {
			name: "alice".to_string(),
			email: "alice@n.example".to_string(),
			password_hash: "hash".to_string(),
		};
		store.create(new_user.clone()).await.unwrap();

		let err = store.create(new_user).await.unwrap_err();
		assert!(matches!(err, RepositoryError::DuplicateKey { .. }));
	}

	#[tokio::test]
	async fn test_list_removals_are_idempotent() {
		let store = InMemoryStore::new();
		let user = store
			.create(NewUser {
				name: "bob".to_string(),
				email: "bob@n.example".to_string(),
				password_hash: "hash".to_string(),
			})
			.await
			.unwrap();
		let url = ArticleRef::parse("https://n.example/2").unwrap();

		assert!(!store.remove_bookmark(&user.id, &url).await.unwrap());
		assert!(store.add_bookmark(&user.id, &url, "T").await.unwrap());
		assert!(!store.add_bookmark(&user.id, &url, "T").await.unwrap());
		assert!(store.remove_bookmark(&user.id, &url).await.unwrap());
		assert!(!store.remove_liked_article(&user.id, &url).await.unwrap());
	}
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Repository, RepositoryError, UserRepository};
use crate::domain::{
	article::entity::ArticleRef,
	user::{BookmarkedArticle, LikedArticle, NewUser, User, UserId},
};

#[derive(FromRow)]
struct UserRow {
	id: Uuid,
	name: String,
	email: String,
	password_hash: String,
	create_dt: DateTime<Utc>,
}

#[derive(FromRow)]
struct UserArticleRow {
	article_url: String,
	article_title: String,
	touched_at: DateTime<Utc>,
}

impl Repository<User> {
	async fn hydrate(
		&self,
		row: UserRow,
	) -> Result<User, RepositoryError> {
		let liked = sqlx::query_as::<_, UserArticleRow>(
			"SELECT article_url, article_title, liked_at AS touched_at
			FROM user_liked_articles WHERE user_id = $1 ORDER BY seq",
		)
		.bind(row.id)
		.fetch_all(&self.executor)
		.await?;

		let bookmarked = sqlx::query_as::<_, UserArticleRow>(
			"SELECT article_url, article_title, bookmarked_at AS touched_at
			FROM user_bookmarked_articles WHERE user_id = $1 ORDER BY seq",
		)
		.bind(row.id)
		.fetch_all(&self.executor)
		.await?;

		Ok(User {
			id: row.id.into(),
			name: row.name,
			email: row.email,
			password_hash: row.password_hash,
			liked_articles: liked
				.into_iter()
				.map(|r| LikedArticle {
					article_url: ArticleRef::from_stored(r.article_url),
					article_title: r.article_title,
					liked_at: r.touched_at,
				})
				.collect(),
			bookmarked_articles: bookmarked
				.into_iter()
				.map(|r| BookmarkedArticle {
					article_url: ArticleRef::from_stored(r.article_url),
					article_title: r.article_title,
					bookmarked_at: r.touched_at,
				})
				.collect(),
			create_dt: row.create_dt,
		})
	}
}

#[async_trait]
impl UserRepository for Repository<User> {
	async fn find_by_email(
		&self,
		email: &str,
	) -> Result<Option<User>, RepositoryError> {
		let row = sqlx::query_as::<_, UserRow>("SELECT id, name, email, password_hash, create_dt FROM users WHERE email = $1")
			.bind(email)
			.fetch_optional(&self.executor)
			.await?;
		match row {
			Some(row) => Ok(Some(self.hydrate(row).await?)),
			None => Ok(None),
		}
	}

	async fn find_by_id(
		&self,
		id: &UserId,
	) -> Result<Option<User>, RepositoryError> {
		let row = sqlx::query_as::<_, UserRow>("SELECT id, name, email, password_hash, create_dt FROM users WHERE id = $1")
			.bind(id.as_uuid())
			.fetch_optional(&self.executor)
			.await?;
		match row {
			Some(row) => Ok(Some(self.hydrate(row).await?)),
			None => Ok(None),
		}
	}

	async fn create(
		&self,
		user: NewUser,
	) -> Result<User, RepositoryError> {
		let id = UserId::new();
		let create_dt: DateTime<Utc> = sqlx::query_scalar(
			"INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4)
			RETURNING create_dt",
		)
		.bind(id.as_uuid())
		.bind(&user.name)
		.bind(&user.email)
		.bind(&user.password_hash)
		.fetch_one(&self.executor)
		.await?;

		Ok(User {
			id,
			name: user.name,
			email: user.email,
			password_hash: user.password_hash,
			liked_articles: Vec::new(),
			bookmarked_articles: Vec::new(),
			create_dt,
		})
	}

	async fn add_liked_article(
		&self,
		id: &UserId,
		url: &ArticleRef,
		title: &str,
	) -> Result<bool, RepositoryError> {
		let result = sqlx::query(
			"INSERT INTO user_liked_articles (user_id, article_url, article_title) VALUES ($1, $2, $3)
			ON CONFLICT (user_id, article_url) DO NOTHING",
		)
		.bind(id.as_uuid())
		.bind(url.as_str())
		.bind(title)
		.execute(&self.executor)
		.await?;
		Ok(result.rows_affected() == 1)
	}

	async fn remove_liked_article(
		&self,
		id: &UserId,
		url: &ArticleRef,
	) -> Result<bool, RepositoryError> {
		let result = sqlx::query("DELETE FROM user_liked_articles WHERE user_id = $1 AND article_url = $2")
			.bind(id.as_uuid())
			.bind(url.as_str())
			.execute(&self.executor)
			.await?;
		Ok(result.rows_affected() == 1)
	}

	async fn add_bookmark(
		&self,
		id: &UserId,
		url: &ArticleRef,
		title: &str,
	) -> Result<bool, RepositoryError> {
		let result = sqlx::query(
			"INSERT INTO user_bookmarked_articles (user_id, article_url, article_title) VALUES ($1, $2, $3)
			ON CONFLICT (user_id, article_url) DO NOTHING",
		)
		.bind(id.as_uuid())
		.bind(url.as_str())
		.bind(title)
		.execute(&self.executor)
		.await?;
		Ok(result.rows_affected() == 1)
	}

	async fn remove_bookmark(
		&self,
		id: &UserId,
		url: &ArticleRef,
	) -> Result<bool, RepositoryError> {
		let result = sqlx::query("DELETE FROM user_bookmarked_articles WHERE user_id = $1 AND article_url = $2")
			.bind(id.as_uuid())
			.bind(url.as_str())
			.execute(&self.executor)
			.await?;
		Ok(result.rows_affected() == 1)
	}
}

#[cfg(test)]
mod test {
	use sqlx::PgPool;

	use crate::{
		adapters::repositories::{Repository, RepositoryError, UserRepository},
		domain::{
			article::entity::ArticleRef,
			user::{NewUser, User},
		},
	};

	fn new_user(email: &str) -> NewUser {
		NewUser {
			name: "alice".to_string(),
			email: email.to_string(),
			password_hash: "hash".to_string(),
		}
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_duplicate_email_is_rejected(pool: PgPool) {
		let repo = Repository::<User>::new(pool);
		let created = repo.create(new_user("alice@n.example")).await.unwrap();

		let duplicate = repo.create(new_user("alice@n.example")).await;
		assert!(matches!(duplicate, Err(RepositoryError::DuplicateKey { .. })));

		let found = repo.find_by_email("alice@n.example").await.unwrap().unwrap();
		assert_eq!(found.id, created.id);
		assert_eq!(found.password_hash, "hash");
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_liked_list_is_a_set_in_insertion_order(pool: PgPool) {
		'_given: {
			let repo = Repository::<User>::new(pool);
			let alice = repo.create(new_user("alice@n.example")).await.unwrap();
			let first = ArticleRef::parse("https://n.example/b").unwrap();
			let second = ArticleRef::parse("https://n.example/a").unwrap();

			'_when: {
				assert!(repo.add_liked_article(&alice.id, &first, "B").await.unwrap());
				assert!(repo.add_liked_article(&alice.id, &second, "A").await.unwrap());
				assert!(!repo.add_liked_article(&alice.id, &first, "B again").await.unwrap());

				'_then: {
					let user = repo.find_by_id(&alice.id).await.unwrap().unwrap();
					let urls: Vec<_> = user.liked_articles.iter().map(|a| a.article_url.clone()).collect();
					assert_eq!(urls, vec![first.clone(), second.clone()]);
					assert_eq!(user.liked_articles[0].article_title, "B");

					assert!(repo.remove_liked_article(&alice.id, &first).await.unwrap());
					assert!(!repo.remove_liked_article(&alice.id, &first).await.unwrap());
					let user = repo.find_by_id(&alice.id).await.unwrap().unwrap();
					assert_eq!(user.liked_articles.len(), 1);
				}
			}
		}
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_bookmark_add_and_remove(pool: PgPool) {
		let repo = Repository::<User>::new(pool);
		let alice = repo.create(new_user("alice@n.example")).await.unwrap();
		let url = ArticleRef::parse("https://n.example/saved").unwrap();

		assert!(repo.add_bookmark(&alice.id, &url, "Saved").await.unwrap());
		assert!(!repo.add_bookmark(&alice.id, &url, "Saved").await.unwrap());
		let user = repo.find_by_id(&alice.id).await.unwrap().unwrap();
		assert_eq!(user.bookmarked_articles.len(), 1);
		assert_eq!(user.bookmarked_articles[0].article_url, url);

		assert!(repo.remove_bookmark(&alice.id, &url).await.unwrap());
		assert!(!repo.remove_bookmark(&alice.id, &url).await.unwrap());
		assert!(repo.find_by_id(&alice.id).await.unwrap().unwrap().bookmarked_articles.is_empty());
	}
}

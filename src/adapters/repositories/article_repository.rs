use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::{ArticleRepository, LikeMutation, Repository, RepositoryError};
use crate::domain::{
	article::{
		entity::{Article, ArticleComment, ArticleLike, ArticleMetadata, ArticleRef},
		ArticleAggregate,
	},
	user::UserId,
};

#[derive(FromRow)]
struct ArticleRow {
	url: String,
	title: String,
	description: Option<String>,
	image_url: Option<String>,
	source: Option<String>,
	author: Option<String>,
	published_at: Option<String>,
	create_dt: DateTime<Utc>,
}

#[derive(FromRow)]
struct LikeRow {
	user_id: Uuid,
	liked_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct CommentRow {
	user_id: Uuid,
	user_name: String,
	text: String,
	commented_at: DateTime<Utc>,
}

/// Serializes like and comment mutations on one article. Every mutator takes
/// this row lock first, so the count read after the write sees every
/// competing write that committed before it.
async fn lock_article(
	conn: &mut PgConnection,
	url: &ArticleRef,
) -> Result<(), RepositoryError> {
	let locked: Option<i32> = sqlx::query_scalar("SELECT 1 FROM articles WHERE url = $1 FOR UPDATE")
		.bind(url.as_str())
		.fetch_optional(&mut *conn)
		.await?;
	locked
		.map(|_| ())
		.ok_or_else(|| RepositoryError::query(format!("article `{url}` does not exist")))
}

async fn count_likes(
	conn: &mut PgConnection,
	url: &ArticleRef,
) -> Result<i64, RepositoryError> {
	let count = sqlx::query_scalar("SELECT COUNT(*) FROM article_likes WHERE article_url = $1")
		.bind(url.as_str())
		.fetch_one(&mut *conn)
		.await?;
	Ok(count)
}

#[async_trait]
impl ArticleRepository for Repository<ArticleAggregate> {
	async fn find_by_ref(
		&self,
		url: &ArticleRef,
	) -> Result<Option<ArticleAggregate>, RepositoryError> {
		let Some(row) = sqlx::query_as::<_, ArticleRow>(
			"SELECT url, title, description, image_url, source, author, published_at, create_dt
			FROM articles WHERE url = $1",
		)
		.bind(url.as_str())
		.fetch_optional(&self.executor)
		.await?
		else {
			return Ok(None);
		};

		let likes = sqlx::query_as::<_, LikeRow>("SELECT user_id, liked_at FROM article_likes WHERE article_url = $1 ORDER BY liked_at")
			.bind(url.as_str())
			.fetch_all(&self.executor)
			.await?;

		let comments = sqlx::query_as::<_, CommentRow>(
			"SELECT user_id, user_name, text, commented_at FROM article_comments WHERE article_url = $1 ORDER BY seq",
		)
		.bind(url.as_str())
		.fetch_all(&self.executor)
		.await?;

		let article = Article {
			url: ArticleRef::from_stored(row.url),
			metadata: ArticleMetadata {
				title: row.title,
				description: row.description,
				image_url: row.image_url,
				source: row.source,
				author: row.author,
				published_at: row.published_at,
			},
			create_dt: row.create_dt,
		};
		Ok(Some(ArticleAggregate::from_parts(
			article,
			likes
				.into_iter()
				.map(|l| ArticleLike {
					user_id: l.user_id.into(),
					liked_at: l.liked_at,
				})
				.collect(),
			comments
				.into_iter()
				.map(|c| ArticleComment {
					user_id: c.user_id.into(),
					user_name: c.user_name,
					text: c.text,
					commented_at: c.commented_at,
				})
				.collect(),
		)))
	}

	async fn get_or_create(
		&self,
		url: &ArticleRef,
		metadata: &ArticleMetadata,
	) -> Result<ArticleAggregate, RepositoryError> {
		let created = sqlx::query(
			"INSERT INTO articles (url, title, description, image_url, source, author, published_at)
			VALUES ($1, $2, $3, $4, $5, $6, $7)
			ON CONFLICT (url) DO NOTHING",
		)
		.bind(url.as_str())
		.bind(&metadata.title)
		.bind(&metadata.description)
		.bind(&metadata.image_url)
		.bind(&metadata.source)
		.bind(&metadata.author)
		.bind(&metadata.published_at)
		.execute(&self.executor)
		.await?
		.rows_affected()
			== 1;
		if created {
			tracing::info!(article = %url, "article materialized on first social action");
		}

		self.find_by_ref(url)
			.await?
			.ok_or_else(|| RepositoryError::query(format!("article `{url}` missing right after insert")))
	}

	async fn insert_like(
		&self,
		url: &ArticleRef,
		user_id: &UserId,
		liked_at: DateTime<Utc>,
	) -> Result<LikeMutation, RepositoryError> {
		let mut tx = self.executor.begin().await?;
		lock_article(&mut tx, url).await?;

		let changed = sqlx::query(
			"INSERT INTO article_likes (article_url, user_id, liked_at) VALUES ($1, $2, $3)
			ON CONFLICT (article_url, user_id) DO NOTHING",
		)
		.bind(url.as_str())
		.bind(user_id.as_uuid())
		.bind(liked_at)
		.execute(&mut *tx)
		.await?
		.rows_affected()
			== 1;
		let like_count = count_likes(&mut tx, url).await?;

		tx.commit().await?;
		Ok(LikeMutation { changed, like_count })
	}

	async fn delete_like(
		&self,
		url: &ArticleRef,
		user_id: &UserId,
	) -> Result<LikeMutation, RepositoryError> {
		let mut tx = self.executor.begin().await?;
		lock_article(&mut tx, url).await?;

		let changed = sqlx::query("DELETE FROM article_likes WHERE article_url = $1 AND user_id = $2")
			.bind(url.as_str())
			.bind(user_id.as_uuid())
			.execute(&mut *tx)
			.await?
			.rows_affected()
			== 1;
		let like_count = count_likes(&mut tx, url).await?;

		tx.commit().await?;
		Ok(LikeMutation { changed, like_count })
	}

	async fn append_comment(
		&self,
		url: &ArticleRef,
		comment: &ArticleComment,
	) -> Result<i64, RepositoryError> {
		let mut tx = self.executor.begin().await?;
		lock_article(&mut tx, url).await?;

		sqlx::query(
			"INSERT INTO article_comments (article_url, user_id, user_name, text, commented_at)
			VALUES ($1, $2, $3, $4, $5)",
		)
		.bind(url.as_str())
		.bind(comment.user_id.as_uuid())
		.bind(&comment.user_name)
		.bind(&comment.text)
		.bind(comment.commented_at)
		.execute(&mut *tx)
		.await?;
		let comment_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM article_comments WHERE article_url = $1")
			.bind(url.as_str())
			.fetch_one(&mut *tx)
			.await?;

		tx.commit().await?;
		Ok(comment_count)
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use chrono::Utc;
	use sqlx::PgPool;

	use crate::{
		adapters::repositories::{ArticleRepository, Repository, UserRepository},
		domain::{
			article::{
				entity::{ArticleComment, ArticleMetadata, ArticleRef},
				ArticleAggregate,
			},
			user::{NewUser, User, UserId},
		},
		services::handlers::SocialHandler,
	};

	fn metadata(title: &str) -> ArticleMetadata {
		ArticleMetadata {
			title: title.to_string(),
			..Default::default()
		}
	}

	async fn register(
		pool: &PgPool,
		name: &str,
	) -> User {
		Repository::<User>::new(pool.clone())
			.create(NewUser {
				name: name.to_string(),
				email: format!("{name}@n.example"),
				password_hash: "hash".to_string(),
			})
			.await
			.unwrap()
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_get_or_create_keeps_single_record(pool: PgPool) {
		let repo = Repository::<ArticleAggregate>::new(pool.clone());
		let url = ArticleRef::parse("https://n.example/once").unwrap();

		let first = repo.get_or_create(&url, &metadata("First title")).await.unwrap();
		let second = repo.get_or_create(&url, &metadata("Second title")).await.unwrap();

		assert_eq!(first.metadata.title, "First title");
		assert_eq!(second.metadata.title, "First title");
		let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE url = $1")
			.bind(url.as_str())
			.fetch_one(&pool)
			.await
			.unwrap();
		assert_eq!(rows, 1);
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_like_then_unlike_returns_to_start(pool: PgPool) {
		'_given: {
			let repo = Repository::<ArticleAggregate>::new(pool);
			let url = ArticleRef::parse("https://n.example/toggle").unwrap();
			let alice = UserId::new();
			repo.get_or_create(&url, &metadata("T")).await.unwrap();

			'_when: {
				let liked = repo.insert_like(&url, &alice, Utc::now()).await.unwrap();
				let again = repo.insert_like(&url, &alice, Utc::now()).await.unwrap();
				let unliked = repo.delete_like(&url, &alice).await.unwrap();
				let nothing = repo.delete_like(&url, &alice).await.unwrap();

				'_then: {
					assert!(liked.changed);
					assert_eq!(liked.like_count, 1);
					assert!(!again.changed);
					assert_eq!(again.like_count, 1);
					assert!(unliked.changed);
					assert_eq!(unliked.like_count, 0);
					assert!(!nothing.changed);

					let article = repo.find_by_ref(&url).await.unwrap().unwrap();
					assert_eq!(article.like_count(), 0);
					assert!(!article.is_liked_by(&alice));
				}
			}
		}
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_comments_read_back_in_insertion_order(pool: PgPool) {
		let repo = Repository::<ArticleAggregate>::new(pool);
		let url = ArticleRef::parse("https://n.example/comments").unwrap();
		repo.get_or_create(&url, &metadata("T")).await.unwrap();

		let mut written = Vec::new();
		for (i, text) in ["first", "second", "third"].into_iter().enumerate() {
			let comment = ArticleComment {
				user_id: UserId::new(),
				user_name: format!("user{i}"),
				text: text.to_string(),
				// identical timestamps so only insertion order can sort them
				commented_at: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
			};
			let count = repo.append_comment(&url, &comment).await.unwrap();
			assert_eq!(count, i as i64 + 1);
			written.push(comment);
		}

		let article = repo.find_by_ref(&url).await.unwrap().unwrap();
		assert_eq!(article.comments(), written.as_slice());
		assert_eq!(article.comment_count(), 3);
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_concurrent_likes_report_stored_count(pool: PgPool) {
		let repo = Repository::<ArticleAggregate>::new(pool);
		let url = ArticleRef::parse("https://n.example/concurrent").unwrap();
		repo.get_or_create(&url, &metadata("T")).await.unwrap();
		let alice = UserId::new();
		let bob = UserId::new();

		let (a1, a2, b) = tokio::join!(
			repo.insert_like(&url, &alice, Utc::now()),
			repo.insert_like(&url, &alice, Utc::now()),
			repo.insert_like(&url, &bob, Utc::now()),
		);
		let (a1, a2, b) = (a1.unwrap(), a2.unwrap(), b.unwrap());

		// exactly one of alice's inserts lands, and nobody sees fewer likes
		// than they themselves hold
		assert_ne!(a1.changed, a2.changed);
		assert!(b.changed);
		for outcome in [a1, a2, b] {
			assert!((1..=2).contains(&outcome.like_count));
		}
		let stored = repo.find_by_ref(&url).await.unwrap().unwrap();
		assert_eq!(stored.like_count(), 2);
		assert_eq!(a1.like_count.max(a2.like_count).max(b.like_count), 2);
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_concurrent_toggles_by_one_user_stay_consistent(pool: PgPool) {
		'_given: {
			let alice = register(&pool, "alice").await;
			let handler = SocialHandler::new(
				Arc::new(Repository::<User>::new(pool.clone())),
				Arc::new(Repository::<ArticleAggregate>::new(pool.clone())),
			);
			let url = ArticleRef::parse("https://n.example/double-submit").unwrap();

			'_when: {
				let (meta_a, meta_b) = (metadata("T"), metadata("T"));
				let (first, second) = tokio::join!(
					handler.toggle_like(alice.id, &url, &meta_a),
					handler.toggle_like(alice.id, &url, &meta_b),
				);

				'_then: {
					for outcome in [first.unwrap(), second.unwrap()] {
						assert_eq!(outcome.like_count, i64::from(outcome.liked));
					}
					let stored = Repository::<ArticleAggregate>::new(pool)
						.find_by_ref(&url)
						.await
						.unwrap()
						.unwrap();
					assert!(stored.like_count() <= 1);
				}
			}
		}
	}
}

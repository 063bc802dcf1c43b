use std::sync::Arc;

use chrono::Utc;

use super::response::{BookmarkToggled, CommentAdded, LikeToggled, ServiceError};
use crate::{
	adapters::repositories::{ArticleRepository, RepositoryError, UserRepository},
	domain::{
		article::entity::{ArticleComment, ArticleMetadata, ArticleRef},
		user::{User, UserId},
	},
};

pub const MAX_COMMENT_LEN: usize = 2000;

/// Like, comment and bookmark transitions.
///
/// The article aggregate is the source of truth; the user's liked and
/// bookmarked lists are a secondary index written only from here, always after
/// the article-side write has succeeded.
pub struct SocialHandler {
	users: Arc<dyn UserRepository>,
	articles: Arc<dyn ArticleRepository>,
}

impl SocialHandler {
	pub fn new(
		users: Arc<dyn UserRepository>,
		articles: Arc<dyn ArticleRepository>,
	) -> Self {
		Self { users, articles }
	}

	/// Flips the caller's like on the article, creating the article record on
	/// first touch.
	pub async fn toggle_like(
		&self,
		user_id: UserId,
		url: &ArticleRef,
		metadata: &ArticleMetadata,
	) -> Result<LikeToggled, ServiceError> {
		validate_metadata(metadata)?;
		self.require_user(&user_id).await?;

		let article = self.articles.get_or_create(url, metadata).await?;

		let unliked = self.articles.delete_like(url, &user_id).await?;
		if unliked.changed {
			self.users
				.remove_liked_article(&user_id, url)
				.await
				.map_err(|err| partial_write(url, user_id, "unlike", err))?;
			tracing::info!(article = %url, %user_id, like_count = unliked.like_count, "article unliked");
			return Ok(LikeToggled {
				liked: false,
				like_count: unliked.like_count,
			});
		}

		// a concurrent toggle by the same caller may have inserted first; the
		// caller ends up Liked either way
		let liked = self.articles.insert_like(url, &user_id, Utc::now()).await?;
		self.users
			.add_liked_article(&user_id, url, &article.metadata.title)
			.await
			.map_err(|err| partial_write(url, user_id, "like", err))?;
		tracing::info!(article = %url, %user_id, like_count = liked.like_count, changed = liked.changed, "article liked");
		Ok(LikeToggled {
			liked: true,
			like_count: liked.like_count,
		})
	}

	/// Flips the bookmark in the caller's own list. No article record is
	/// created.
	pub async fn toggle_bookmark(
		&self,
		user_id: UserId,
		url: &ArticleRef,
		title: &str,
	) -> Result<BookmarkToggled, ServiceError> {
		if title.trim().is_empty() {
			return Err(ServiceError::InvalidRequest("title must not be empty".to_string()));
		}
		self.require_user(&user_id).await?;

		if self.users.remove_bookmark(&user_id, url).await? {
			tracing::info!(article = %url, %user_id, "bookmark removed");
			return Ok(BookmarkToggled { bookmarked: false });
		}
		self.users.add_bookmark(&user_id, url, title.trim()).await?;
		tracing::info!(article = %url, %user_id, "bookmark added");
		Ok(BookmarkToggled { bookmarked: true })
	}

	pub async fn add_comment(
		&self,
		user_id: UserId,
		url: &ArticleRef,
		metadata: &ArticleMetadata,
		text: &str,
	) -> Result<CommentAdded, ServiceError> {
		let text = text.trim();
		if text.is_empty() {
			return Err(ServiceError::InvalidRequest("comment text must not be empty".to_string()));
		}
		if text.chars().count() > MAX_COMMENT_LEN {
			return Err(ServiceError::InvalidRequest(format!("comment text must be at most {MAX_COMMENT_LEN} characters")));
		}
		validate_metadata(metadata)?;
		let user = self.require_user(&user_id).await?;

		self.articles.get_or_create(url, metadata).await?;

		let comment = ArticleComment {
			user_id,
			user_name: user.name,
			text: text.to_owned(),
			commented_at: Utc::now(),
		};
		let comment_count = self.articles.append_comment(url, &comment).await?;
		tracing::info!(article = %url, %user_id, comment_count, "comment added");
		Ok(CommentAdded { comment, comment_count })
	}

	async fn require_user(
		&self,
		user_id: &UserId,
	) -> Result<User, ServiceError> {
		self.users.find_by_id(user_id).await?.ok_or_else(|| {
			tracing::warn!(%user_id, "authenticated caller has no user record");
			ServiceError::NotFound("User not found".to_string())
		})
	}
}

fn validate_metadata(metadata: &ArticleMetadata) -> Result<(), ServiceError> {
	if metadata.title.trim().is_empty() {
		return Err(ServiceError::InvalidRequest("title must not be empty".to_string()));
	}
	Ok(())
}

fn partial_write(
	url: &ArticleRef,
	user_id: UserId,
	direction: &'static str,
	err: RepositoryError,
) -> ServiceError {
	tracing::error!(
		article = %url,
		%user_id,
		direction,
		error = %err,
		"article updated but user list write failed; left inconsistent"
	);
	ServiceError::PartialWriteInconsistency {
		article: url.to_string(),
		user: user_id,
		message: err.to_string(),
	}
}

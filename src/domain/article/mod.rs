use std::ops::Deref;

use chrono::Utc;
use serde::Serialize;

use self::entity::{Article, ArticleComment, ArticleLike, ArticleMetadata, ArticleRef};
use crate::domain::user::UserId;
pub mod entity;

/// Social state attached to one article.
///
/// Counts are never stored: `like_count` and `comment_count` are read off the
/// backing collections so they cannot drift from them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleAggregate {
	#[serde(flatten)]
	pub(crate) article: Article,
	pub(crate) likes: Vec<ArticleLike>,
	pub(crate) comments: Vec<ArticleComment>,
}

impl ArticleAggregate {
	/// A freshly materialized article with no social state yet.
	pub fn new(
		url: ArticleRef,
		metadata: ArticleMetadata,
	) -> Self {
		Self {
			article: Article {
				url,
				metadata,
				create_dt: Utc::now(),
			},
			likes: Vec::new(),
			comments: Vec::new(),
		}
	}

	pub(crate) fn from_parts(
		article: Article,
		likes: Vec<ArticleLike>,
		comments: Vec<ArticleComment>,
	) -> Self {
		Self { article, likes, comments }
	}

	pub fn likes(&self) -> &[ArticleLike] {
		&self.likes
	}

	/// Oldest first.
	pub fn comments(&self) -> &[ArticleComment] {
		&self.comments
	}

	pub fn like_count(&self) -> i64 {
		self.likes.len() as i64
	}

	pub fn comment_count(&self) -> i64 {
		self.comments.len() as i64
	}

	pub fn is_liked_by(
		&self,
		user_id: &UserId,
	) -> bool {
		self.likes.iter().any(|like| &like.user_id == user_id)
	}
}

impl Deref for ArticleAggregate {
	type Target = Article;
	fn deref(&self) -> &Self::Target {
		&self.article
	}
}

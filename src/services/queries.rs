use std::sync::Arc;

use super::response::{ArticleSocialData, ServiceError};
use crate::{
	adapters::repositories::ArticleRepository,
	domain::{article::entity::ArticleRef, user::UserId},
};

/// Assembles the per-article social view.
pub struct ArticleQueries {
	articles: Arc<dyn ArticleRepository>,
}

impl ArticleQueries {
	pub fn new(articles: Arc<dyn ArticleRepository>) -> Self {
		Self { articles }
	}

	/// An article nobody has touched yet reads as the zero aggregate; any
	/// store failure is still an error.
	pub async fn social_data(
		&self,
		url: &ArticleRef,
		caller: Option<UserId>,
	) -> Result<ArticleSocialData, ServiceError> {
		match self.articles.find_by_ref(url).await? {
			None => Ok(ArticleSocialData::empty()),
			Some(article) => Ok(ArticleSocialData {
				like_count: article.like_count(),
				comment_count: article.comment_count(),
				user_liked: caller.is_some_and(|id| article.is_liked_by(&id)),
				comments: article.comments().to_vec(),
			}),
		}
	}
}

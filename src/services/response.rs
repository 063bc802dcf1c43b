use axum::{
	extract::rejection::JsonRejection,
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;
use serde_json::json;

use crate::{
	adapters::repositories::RepositoryError,
	domain::{
		article::entity::{ArticleComment, ArticleRefError},
		user::{RegistrationError, User, UserId},
	},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggled {
	pub liked: bool,
	pub like_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkToggled {
	pub bookmarked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAdded {
	pub comment: ArticleComment,
	pub comment_count: i64,
}

/// Read model for one article as seen by an optional caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSocialData {
	pub like_count: i64,
	pub comment_count: i64,
	pub comments: Vec<ArticleComment>,
	pub user_liked: bool,
}

impl ArticleSocialData {
	/// What an article nobody has interacted with looks like.
	pub fn empty() -> Self {
		Self {
			like_count: 0,
			comment_count: 0,
			comments: Vec::new(),
			user_liked: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
	pub id: UserId,
	pub name: String,
	pub email: String,
}

impl From<&User> for UserSummary {
	fn from(user: &User) -> Self {
		Self {
			id: user.id,
			name: user.name.clone(),
			email: user.email.clone(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedIn {
	pub message: &'static str,
	pub data: UserSummary,
	pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ServiceResponse {
	Like(LikeToggled),
	Bookmark(BookmarkToggled),
	Comment(CommentAdded),
	SocialData(ArticleSocialData),
	LoggedIn(LoggedIn),
	Profile { user: User },
	Registered { message: &'static str },
}

impl From<LikeToggled> for ServiceResponse {
	fn from(value: LikeToggled) -> Self {
		ServiceResponse::Like(value)
	}
}

impl From<BookmarkToggled> for ServiceResponse {
	fn from(value: BookmarkToggled) -> Self {
		ServiceResponse::Bookmark(value)
	}
}

impl From<CommentAdded> for ServiceResponse {
	fn from(value: CommentAdded) -> Self {
		ServiceResponse::Comment(value)
	}
}

impl From<ArticleSocialData> for ServiceResponse {
	fn from(value: ArticleSocialData) -> Self {
		ServiceResponse::SocialData(value)
	}
}

impl From<LoggedIn> for ServiceResponse {
	fn from(value: LoggedIn) -> Self {
		ServiceResponse::LoggedIn(value)
	}
}

#[derive(Serialize)]
struct Envelope<'a> {
	success: bool,
	#[serde(flatten)]
	body: &'a ServiceResponse,
}

impl IntoResponse for ServiceResponse {
	fn into_response(self) -> Response {
		let status = match self {
			ServiceResponse::Registered { .. } => StatusCode::CREATED,
			_ => StatusCode::OK,
		};
		(status, Json(Envelope { success: true, body: &self })).into_response()
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("authentication required")]
	Unauthenticated,
	#[error("email or password is incorrect")]
	InvalidCredentials,
	#[error("{0}")]
	InvalidRequest(String),
	#[error("{0}")]
	NotFound(String),
	#[error("User already exists")]
	DuplicateKey,
	#[error("store unavailable: {0}")]
	StoreUnavailable(String),
	#[error("article `{article}` changed but user {user} was not updated: {message}")]
	PartialWriteInconsistency { article: String, user: UserId, message: String },
	#[error("internal error: {0}")]
	Internal(String),
	#[error("configuration error: {0}")]
	Configuration(String),
}

impl ServiceError {
	pub fn status(&self) -> StatusCode {
		match self {
			ServiceError::Unauthenticated | ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
			ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
			ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
			ServiceError::DuplicateKey => StatusCode::CONFLICT,
			ServiceError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
			ServiceError::PartialWriteInconsistency { .. } | ServiceError::Internal(_) | ServiceError::Configuration(_) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}
}

impl From<RepositoryError> for ServiceError {
	fn from(err: RepositoryError) -> Self {
		match err {
			RepositoryError::Connection { message } => ServiceError::StoreUnavailable(message),
			RepositoryError::DuplicateKey { .. } => ServiceError::DuplicateKey,
			RepositoryError::Query { message } => ServiceError::Internal(message),
		}
	}
}

impl From<ArticleRefError> for ServiceError {
	fn from(err: ArticleRefError) -> Self {
		ServiceError::InvalidRequest(err.to_string())
	}
}

impl From<RegistrationError> for ServiceError {
	fn from(err: RegistrationError) -> Self {
		ServiceError::InvalidRequest(err.to_string())
	}
}

impl From<JsonRejection> for ServiceError {
	fn from(err: JsonRejection) -> Self {
		ServiceError::InvalidRequest(err.body_text())
	}
}

impl IntoResponse for ServiceError {
	fn into_response(self) -> Response {
		let status = self.status();
		let message = match &self {
			ServiceError::PartialWriteInconsistency { .. } | ServiceError::Internal(_) | ServiceError::Configuration(_) => {
				tracing::error!(error = %self, "request failed");
				"Internal server error".to_string()
			}
			ServiceError::StoreUnavailable(_) => {
				tracing::warn!(error = %self, "store unavailable");
				"Service temporarily unavailable".to_string()
			}
			other => other.to_string(),
		};
		(status, Json(json!({ "success": false, "message": message }))).into_response()
	}
}

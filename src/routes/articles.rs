use axum::{
	extract::{rejection::JsonRejection, Path, State},
	Extension, Json,
};
use axum_extra::{
	headers::{authorization::Bearer, Authorization},
	TypedHeader,
};
use serde::Deserialize;

use crate::{
	bootstrap::AppState,
	common::middleware_auth::{optional_caller, AuthenticatedUser, CurrentUser},
	domain::article::entity::{ArticleMetadata, ArticleRef},
	services::response::{ServiceError, ServiceResponse},
};

/// Article reference plus whatever display metadata the client has for it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePayload {
	pub url: String,
	#[serde(flatten)]
	pub metadata: ArticleMetadata,
}

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
	#[serde(flatten)]
	pub article: ArticlePayload,
	pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct BookmarkPayload {
	pub url: String,
	pub title: String,
}

pub async fn toggle_like(
	State(state): State<AppState>,
	Extension(CurrentUser(user_id)): AuthenticatedUser,
	payload: Result<Json<ArticlePayload>, JsonRejection>,
) -> Result<ServiceResponse, ServiceError> {
	let Json(payload) = payload?;
	let url = ArticleRef::parse(&payload.url)?;
	let toggled = state.social().toggle_like(user_id, &url, &payload.metadata).await?;
	Ok(toggled.into())
}

pub async fn add_comment(
	State(state): State<AppState>,
	Extension(CurrentUser(user_id)): AuthenticatedUser,
	payload: Result<Json<CommentPayload>, JsonRejection>,
) -> Result<ServiceResponse, ServiceError> {
	let Json(payload) = payload?;
	let url = ArticleRef::parse(&payload.article.url)?;
	let added = state
		.social()
		.add_comment(user_id, &url, &payload.article.metadata, &payload.text)
		.await?;
	Ok(added.into())
}

pub async fn toggle_bookmark(
	State(state): State<AppState>,
	Extension(CurrentUser(user_id)): AuthenticatedUser,
	payload: Result<Json<BookmarkPayload>, JsonRejection>,
) -> Result<ServiceResponse, ServiceError> {
	let Json(payload) = payload?;
	let url = ArticleRef::parse(&payload.url)?;
	let toggled = state.social().toggle_bookmark(user_id, &url, &payload.title).await?;
	Ok(toggled.into())
}

/// `GET /data/:encoded_url`; the path segment arrives percent-decoded.
pub async fn social_data(
	State(state): State<AppState>,
	Path(encoded_url): Path<String>,
	bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<ServiceResponse, ServiceError> {
	let url = ArticleRef::parse(&encoded_url)?;
	let caller = optional_caller(&state, bearer);
	let data = state.queries().social_data(&url, caller).await?;
	Ok(data.into())
}

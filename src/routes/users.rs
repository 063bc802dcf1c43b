use axum::{
	extract::{rejection::JsonRejection, State},
	Extension, Json,
};
use serde::Deserialize;

use crate::{
	bootstrap::AppState,
	common::middleware_auth::{AuthenticatedUser, CurrentUser},
	domain::user::Registration,
	services::response::{ServiceError, ServiceResponse},
};

#[derive(Deserialize)]
pub struct RegisterRequest {
	pub name: String,
	pub email: String,
	pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
	pub email: String,
	pub password: String,
}

pub async fn register(
	State(state): State<AppState>,
	payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ServiceResponse, ServiceError> {
	let Json(payload) = payload?;
	let registration = Registration::try_from_parts(&payload.name, &payload.email, &payload.password)?;
	state.auth().register(registration).await?;
	Ok(ServiceResponse::Registered {
		message: "Registered successfully",
	})
}

pub async fn login(
	State(state): State<AppState>,
	payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ServiceResponse, ServiceError> {
	let Json(payload) = payload?;
	let logged_in = state.auth().login(&payload.email, &payload.password).await?;
	Ok(logged_in.into())
}

pub async fn me(
	State(state): State<AppState>,
	Extension(CurrentUser(user_id)): AuthenticatedUser,
) -> Result<ServiceResponse, ServiceError> {
	let user = state.auth().profile(&user_id).await?;
	Ok(ServiceResponse::Profile { user })
}

use axum::{
	extract::{Request, State},
	middleware::Next,
	response::Response,
	Extension,
};
use axum_extra::{
	headers::{authorization::Bearer, Authorization},
	TypedHeader,
};

use crate::{bootstrap::AppState, domain::user::UserId, services::response::ServiceError};

/// Identity of a caller whose bearer token checked out.
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub UserId);

pub type AuthenticatedUser = Extension<CurrentUser>;

/// Rejects the request with 401 unless it carries a valid bearer token.
/// Runs before the handler, so a rejected write never touches the store.
pub async fn require_bearer(
	State(state): State<AppState>,
	bearer: Option<TypedHeader<Authorization<Bearer>>>,
	mut request: Request,
	next: Next,
) -> Result<Response, ServiceError> {
	let TypedHeader(Authorization(bearer)) = bearer.ok_or(ServiceError::Unauthenticated)?;
	let user_id = state.tokens.verify(bearer.token())?;

	request.extensions_mut().insert(CurrentUser(user_id));
	Ok(next.run(request).await)
}

/// Best-effort caller identity for personalised reads. A missing or bad token
/// means "anonymous", never an error.
pub fn optional_caller(
	state: &AppState,
	bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Option<UserId> {
	let TypedHeader(Authorization(bearer)) = bearer?;
	match state.tokens.verify(bearer.token()) {
		Ok(user_id) => Some(user_id),
		Err(_) => {
			tracing::debug!("ignoring invalid bearer token on read");
			None
		}
	}
}

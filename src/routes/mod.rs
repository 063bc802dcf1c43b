mod articles;
mod home;
mod users;

use axum::{
	middleware,
	routing::{get, post},
	Router,
};

use crate::{bootstrap::AppState, common::middleware_auth::require_bearer};

pub fn create_routes(state: AppState) -> Router {
	let user_routes = Router::new()
		.route("/me", get(users::me))
		.route_layer(middleware::from_fn_with_state(state.clone(), require_bearer))
		.route("/register", post(users::register))
		.route("/login", post(users::login));

	let article_routes = Router::new()
		.route("/like", post(articles::toggle_like))
		.route("/comment", post(articles::add_comment))
		.route("/bookmark", post(articles::toggle_bookmark))
		.route_layer(middleware::from_fn_with_state(state.clone(), require_bearer))
		.route("/data/:encoded_url", get(articles::social_data));

	Router::new()
		.route("/", get(home::index))
		.route("/health", get(home::health))
		.nest("/api/v1/user", user_routes)
		.nest("/api/v1/articles", article_routes)
		.with_state(state)
}

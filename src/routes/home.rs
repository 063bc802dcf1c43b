use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

pub async fn index() -> Json<Value> {
	Json(json!({
		"message": "newsroom API is running",
		"version": env!("CARGO_PKG_VERSION"),
		"endpoints": {
			"auth": "/api/v1/user",
			"articles": "/api/v1/articles",
		}
	}))
}

pub async fn health() -> Json<Value> {
	Json(json!({
		"success": true,
		"message": "Server is running",
		"timestamp": Utc::now().to_rfc3339(),
	}))
}

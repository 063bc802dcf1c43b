use std::{net::SocketAddr, str::FromStr};

use axum::http::{header, HeaderValue, Method};
use newsroom::{bootstrap::Bootstrap, config::Config, create_routes, database, services::response::ServiceError};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
	println!("Environment Variable Is Being Set...");
	dotenv::dotenv().ok();

	// ! Tracing
	let log_level = std::env::var("LOG_LEVEL").unwrap_or("info".to_string());
	tracing_subscriber::registry()
		.with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			// axum logs rejections from built-in extractors with the `axum::rejection`
			// target, at `TRACE` level. `axum::rejection=trace` enables showing those events
			format!("{log_level},tower_http=debug,axum::rejection=trace").into()
		}))
		.with(tracing_subscriber::fmt::layer())
		.init();

	let config = Config::new()?;

	// ! Connection
	tracing::info!("Connections Are Being Pooled...");
	let pool = database::connect(&config).await?;
	database::migrate(&pool).await?;

	let state = Bootstrap::postgres(pool.clone(), &config);
	let app = create_routes(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors_layer(&config)?));

	let address = SocketAddr::from_str(&config.server_ip_port)
		.map_err(|err| ServiceError::Configuration(format!("invalid SERVER_IP_PORT `{}`: {err}", config.server_ip_port)))?;
	let listener = TcpListener::bind(address)
		.await
		.map_err(|err| ServiceError::Configuration(format!("cannot bind {address}: {err}")))?;

	tracing::info!(%address, "Start Web Server...");
	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await
		.map_err(|err| ServiceError::Internal(format!("server error: {err}")))?;

	pool.close().await;
	tracing::info!("Server shut down");
	Ok(())
}

fn cors_layer(config: &Config) -> Result<CorsLayer, ServiceError> {
	let layer = CorsLayer::new()
		.allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
		.allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

	let Some(origins) = config.cors_origins() else {
		return Ok(layer.allow_origin(Any));
	};
	let origins = origins
		.iter()
		.map(|origin| {
			origin
				.parse::<HeaderValue>()
				.map_err(|_| ServiceError::Configuration(format!("invalid origin `{origin}` in ALLOW_ORIGINS")))
		})
		.collect::<Result<Vec<_>, _>>()?;
	Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = signal::ctrl_c().await {
			tracing::error!(error = %err, "failed to install Ctrl+C handler");
			std::future::pending::<()>().await;
		}
		tracing::info!("Received Ctrl+C, shutting down");
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
				tracing::info!("Received terminate signal, shutting down");
			}
			Err(err) => {
				tracing::error!(error = %err, "failed to install SIGTERM handler");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}

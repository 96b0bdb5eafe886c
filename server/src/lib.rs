use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, classify::ServerErrorsFailureClass,
    limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer,
};
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod config;
pub mod disk;
pub mod domain;
pub mod error;
mod handlers;
mod openapi;
pub mod token;
mod user;

#[cfg(test)] // <-- not needed in integration tests
extern crate rstest;

pub use crate::config::Config;
use crate::disk::DiskStorage;
pub use crate::handlers::{IMAGE_FIELD, MAX_FILE_SIZE};

/// Room for multipart boundaries and part headers around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// State shared by all handlers.
pub struct AppState {
    pub config: Config,
    pub storage: DiskStorage,
}

pub async fn run() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "imgstore=debug,server=debug,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e}");
            return;
        }
    };

    if let Err(e) = config.ensure_upload_root() {
        tracing::error!(
            "upload directory {} cannot be created: {e}",
            config.upload_root.display()
        );
        return;
    }

    let listener = match TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("port {} cannot be bound: {e}", config.port);
            return;
        }
    };
    tracing::info!("Server is running on port {}", config.port);

    let app = create_routes(config);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {e}");
    }
}

pub fn create_routes(config: Config) -> Router {
    let files = ServeDir::new(&config.upload_root).append_index_html_on_directories(false);
    let prefix = format!("/{}", config.route_prefix());
    let state = Arc::new(AppState {
        storage: DiskStorage::new(&config.upload_root),
        config,
    });

    let router = Router::new()
        .route(
            "/upload",
            post(handlers::upload).fallback(handlers::invalid_route),
        )
        .route(
            "/delete",
            delete(handlers::delete_image).fallback(handlers::invalid_route),
        )
        .route(
            "/images",
            get(handlers::list_images).fallback(handlers::invalid_route),
        )
        .route(
            "/api-docs/openapi.json",
            get(openapi::openapi_json).fallback(handlers::invalid_route),
        )
        .nest_service(&prefix, files)
        .fallback(handlers::invalid_route)
        .with_state(state);
    with_layers(router)
}

/// Tracing, panic recovery and body limits shared by every route.
fn with_layers(router: Router) -> Router {
    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        tracing::error!("Server error: {error}");
                    },
                ))
                .layer(CatchPanicLayer::custom(error::panic_response))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(MAX_FILE_SIZE + MULTIPART_OVERHEAD))
                .into_inner(),
        )
        .layer(middleware::map_response(error::payload_too_large_response))
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
}

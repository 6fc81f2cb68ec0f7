//! HTTP server setup and configuration.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use reqwest::Client;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::forwarder::Forwarder;
use super::handlers;
use crate::auth::{DefaultCredentialChain, TokenCredential};
use crate::config::Config;
use crate::store::ConversationStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
    pub store: Arc<ConversationStore>,
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat/completions", post(handlers::chat_completions))
        .route("/api/health", get(handlers::health))
        .route(
            "/api/conversations",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .route(
            "/api/conversations/:id",
            get(handlers::get_conversation)
                .put(handlers::update_conversation)
                .delete(handlers::delete_conversation),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(handle_panic))
}

/// Convert a handler panic into the shared error envelope.
///
/// Last line of defense: a fault must not leak a stack trace to the caller
/// or take the process down with it.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    let body = serde_json::json!({
        "error": "Internal server error",
        "message": detail,
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
}

/// Build the application state and run the HTTP server until shutdown.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    // No overall client timeout: streaming responses stay open for the full
    // duration of model generation. The non-streaming path sets its own
    // per-attempt timeout.
    let client = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let credential: Arc<dyn TokenCredential> =
        Arc::new(DefaultCredentialChain::new(client.clone()));
    let config = Arc::new(config);

    let state = AppState {
        forwarder: Arc::new(Forwarder::new(client, credential, config.clone())),
        store: Arc::new(ConversationStore::new()),
    };

    let app = create_router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Starting chatrelay server");

    axum::serve(listener, app).await?;

    Ok(())
}

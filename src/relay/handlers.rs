//! HTTP request handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Path, Request, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::server::AppState;
use super::types::ChatRequest;
use crate::error::{Error, Result};
use crate::store::{Conversation, ConversationDraft, ConversationUpdate};

/// `axum::Json` with rejections converted to the shared error envelope.
///
/// Malformed request bodies must produce the same `{error, message}` shape
/// as every other failure path, not axum's plain-text rejection.
pub struct RelayJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for RelayJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(RelayJson(value)),
            Err(rejection) => Err(json_rejection_to_error(rejection)),
        }
    }
}

fn json_rejection_to_error(rejection: JsonRejection) -> Error {
    Error::BadRequest(rejection.body_text())
}

/// Handle POST /api/chat/completions
pub async fn chat_completions(
    State(state): State<AppState>,
    RelayJson(request): RelayJson<ChatRequest>,
) -> Result<Response> {
    state.forwarder.forward(request).await
}

/// Handle GET /api/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "OK",
        "message": "Server is running"
    }))
}

/// Handle GET /api/conversations
pub async fn list_conversations(State(state): State<AppState>) -> Json<Vec<Conversation>> {
    Json(state.store.list())
}

/// Handle GET /api/conversations/:id
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>> {
    state.store.get(&id).map(Json)
}

/// Handle POST /api/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    RelayJson(draft): RelayJson<ConversationDraft>,
) -> Json<Conversation> {
    let conversation = state.store.create(draft);
    tracing::info!(id = %conversation.id, title = %conversation.title, "Created conversation");
    Json(conversation)
}

/// Handle PUT /api/conversations/:id
///
/// Upsert semantics: an unknown identifier creates a record under that
/// exact id instead of failing.
pub async fn update_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    RelayJson(update): RelayJson<ConversationUpdate>,
) -> Json<Conversation> {
    Json(state.store.update(&id, update))
}

/// Handle DELETE /api/conversations/:id
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state.store.delete(&id)?;
    tracing::info!(id = %id, "Deleted conversation");
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Conversation {} deleted", id)
    })))
}

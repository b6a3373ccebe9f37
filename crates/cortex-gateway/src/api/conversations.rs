//! Conversation CRUD (`/api/conversations`).

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::{Extension, Json};
use serde::Deserialize;

use cortex_domain::error::Error;
use cortex_store::ConversationRepo;

use crate::api::middleware::AuthUser;
use crate::envelope::{self, ApiError};
use crate::state::AppState;

const DEFAULT_TITLE: &str = "新对话";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "d_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn d_limit() -> i64 {
    50
}

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(q): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let conversations = ConversationRepo::list(state.db(), user_id, q.limit, q.offset).await?;
    Ok(envelope::ok(conversations, "ok"))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
    #[serde(default)]
    pub title: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<CreateBody>,
) -> Result<Response, ApiError> {
    let title = body.title.unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let conversation = ConversationRepo::create(state.db(), user_id, &title).await?;
    Ok(envelope::created(conversation, "conversation created"))
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
    pub title: String,
}

pub async fn rename(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<RenameBody>,
) -> Result<Response, ApiError> {
    let conversation = ConversationRepo::rename(state.db(), id, user_id, &body.title).await?;
    Ok(envelope::ok(conversation, "renamed"))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    ConversationRepo::delete(state.db(), id, user_id).await?;
    let settings = None;
    if let Err(e) = state.memory().delete_conversation_memories(user_id, id, settings).await {
        tracing::warn!(error = %e, conversation_id = id, "failed to cascade-delete conversation memories");
    }
    Ok(envelope::ok(serde_json::json!({"id": id}), "deleted"))
}

#[derive(Debug, Deserialize)]
pub struct BatchDeleteBody {
    pub ids: Vec<i64>,
}

pub async fn batch_delete(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<BatchDeleteBody>,
) -> Result<Response, ApiError> {
    if body.ids.is_empty() {
        return Err(Error::Validation("ids must be non-empty".into()).into());
    }
    let deleted = ConversationRepo::delete_many(state.db(), &body.ids, user_id).await?;
    for id in &body.ids {
        if let Err(e) = state.memory().delete_conversation_memories(user_id, *id, None).await {
            tracing::warn!(error = %e, conversation_id = id, "failed to cascade-delete conversation memories");
        }
    }
    Ok(envelope::ok(serde_json::json!({"deleted": deleted}), "batch deleted"))
}

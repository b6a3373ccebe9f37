//! Message send/list/edit/delete (`/api/conversations/{id}/messages`).

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use cortex_domain::error::Error;
use cortex_domain::models::MessageRole;
use cortex_domain::tool::Message as LlmMessage;
use cortex_store::{ConversationRepo, MessageRepo};

use crate::api::middleware::AuthUser;
use crate::envelope::{self, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "d_limit")]
    pub limit: i64,
    #[serde(default)]
    pub before_id: Option<i64>,
}
fn d_limit() -> i64 {
    50
}

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(conversation_id): Path<i64>,
    Query(q): Query<ListQuery>,
) -> Result<Response, ApiError> {
    ConversationRepo::get(state.db(), conversation_id, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("conversation {conversation_id}")))?;
    let messages = MessageRepo::list(state.db(), conversation_id, q.limit, q.before_id).await?;
    Ok(envelope::ok(messages, "ok"))
}

#[derive(Debug, Deserialize)]
pub struct SendBody {
    pub content: String,
}

#[derive(Debug, Serialize)]
struct SendResponse {
    user_message_id: i64,
    assistant_message_id: i64,
    content: String,
}

/// Non-streaming send: runs the same agent turn as the SSE path but
/// returns the finished pair in one response.
pub async fn send(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(conversation_id): Path<i64>,
    Json(body): Json<SendBody>,
) -> Result<Response, ApiError> {
    let content = body.content.trim();
    if content.is_empty() {
        return Err(Error::Validation("content must not be empty".into()).into());
    }
    ConversationRepo::get(state.db(), conversation_id, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("conversation {conversation_id}")))?;

    let _permit = state
        .turn_locks()
        .acquire(conversation_id)
        .await
        .map_err(|e| Error::Agent(e.to_string()))?;

    let user_message = MessageRepo::create(state.db(), conversation_id, MessageRole::User, content).await?;

    let history_limit = state.config().agent.history_limit as i64;
    let history = MessageRepo::list(state.db(), conversation_id, history_limit + 1, None).await?;
    let history: Vec<_> = history.into_iter().filter(|m| m.id != user_message.id).collect();
    let llm_history: Vec<LlmMessage> = history
        .iter()
        .map(|m| match m.role {
            MessageRole::User => LlmMessage::user(m.content.clone()),
            MessageRole::Assistant => LlmMessage::assistant(m.content.clone()),
        })
        .collect();

    let resolved = crate::llm_resolve::resolve_default(&state, user_id).await?;
    let tool_ctx = crate::agent::tools::ToolContext {
        user_id,
        conversation_id,
        memory: state.memory(),
        llm_settings: Some(resolved.settings.clone()),
        llm: resolved.llm.clone(),
        model: resolved.model.clone(),
    };

    let final_text = crate::agent::chat_agent(
        resolved.llm.as_ref(),
        &resolved.model,
        state.config().agent.max_turns,
        state.config().agent.temperature,
        &llm_history,
        content,
        &tool_ctx,
    )
    .await;

    let assistant_message = MessageRepo::create(state.db(), conversation_id, MessageRole::Assistant, &final_text).await?;
    ConversationRepo::record_turn(state.db(), conversation_id, 2).await?;

    Ok(envelope::created(
        SendResponse {
            user_message_id: user_message.id,
            assistant_message_id: assistant_message.id,
            content: final_text,
        },
        "message sent",
    ))
}

pub async fn stream(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(conversation_id): Path<i64>,
    Json(body): Json<SendBody>,
) -> Result<Response, ApiError> {
    let content = body.content.trim();
    if content.is_empty() {
        return Err(Error::Validation("content must not be empty".into()).into());
    }
    ConversationRepo::get(state.db(), conversation_id, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("conversation {conversation_id}")))?;

    let sse = crate::streaming::stream_turn(state, user_id, conversation_id, content.to_string()).await;
    Ok(sse.into_response())
}

#[derive(Debug, Deserialize)]
pub struct EditBody {
    pub content: String,
}

pub async fn update(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path((conversation_id, message_id)): Path<(i64, i64)>,
    Json(body): Json<EditBody>,
) -> Result<Response, ApiError> {
    ConversationRepo::get(state.db(), conversation_id, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("conversation {conversation_id}")))?;
    let content = body.content.trim();
    if content.is_empty() {
        return Err(Error::Validation("content must not be empty".into()).into());
    }
    let message = MessageRepo::update_user_message(state.db(), message_id, conversation_id, content).await?;
    Ok(envelope::ok(message, "message updated"))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path((conversation_id, message_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    ConversationRepo::get(state.db(), conversation_id, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("conversation {conversation_id}")))?;
    MessageRepo::delete(state.db(), message_id, conversation_id).await?;
    ConversationRepo::record_turn(state.db(), conversation_id, -1).await?;
    Ok(envelope::ok(serde_json::json!({"id": message_id}), "message deleted"))
}

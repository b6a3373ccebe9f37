//! `GET /api/memories`, `POST /api/memories/search` — direct access to
//! the memory store, bypassing the agent loop entirely. Used by the
//! dashboard to let a user browse or search what's been remembered
//! about them.

use axum::extract::{Query, State};
use axum::response::Response;
use axum::{Extension, Json};
use serde::Deserialize;

use cortex_domain::error::Error;
use cortex_domain::models::MemoryScope;
use cortex_store::ConversationRepo;

use crate::api::middleware::AuthUser;
use crate::envelope::{self, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GetQuery {
    #[serde(default = "d_limit")]
    pub limit: u32,
    pub conversation_id: Option<i64>,
}
fn d_limit() -> u32 {
    100
}

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(q): Query<GetQuery>,
) -> Result<Response, ApiError> {
    if let Some(conv_id) = q.conversation_id {
        ConversationRepo::get(state.db(), conv_id, user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("conversation {conv_id}")))?;
    }
    let result = state.memory().get_memories(user_id, q.conversation_id, q.limit, None).await;
    Ok(envelope::ok(result, "ok"))
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub query: String,
    #[serde(default)]
    pub conversation_id: Option<i64>,
    #[serde(default = "d_limit")]
    pub limit: u32,
}

pub async fn search(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<SearchBody>,
) -> Result<Response, ApiError> {
    let query = body.query.trim();
    if query.is_empty() {
        return Err(Error::Validation("query must not be empty".into()).into());
    }

    let (scope, conversation_id) = match body.conversation_id {
        Some(conv_id) => {
            ConversationRepo::get(state.db(), conv_id, user_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("conversation {conv_id}")))?;
            (MemoryScope::Local, conv_id)
        }
        None => (MemoryScope::Global, 0),
    };

    let result = state
        .memory()
        .search_memories(user_id, conversation_id, scope, query, body.limit, None)
        .await;
    Ok(envelope::ok(result, "ok"))
}

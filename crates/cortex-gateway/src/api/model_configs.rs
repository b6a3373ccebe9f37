//! Per-user LLM provider configuration (`/api/model-configs`).

use axum::extract::{Path, State};
use axum::response::Response;
use axum::{Extension, Json};
use serde::Deserialize;

use cortex_domain::error::Error;
use cortex_store::ModelConfigRepo;

use crate::api::middleware::AuthUser;
use crate::envelope::{self, ApiError};
use crate::llm_resolve;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Response, ApiError> {
    let configs = ModelConfigRepo::list(state.db(), user_id).await?;
    Ok(envelope::ok(configs, "ok"))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
    pub provider: String,
    pub model_name: String,
    #[serde(default)]
    pub base_url: String,
    pub api_key: String,
    #[serde(default)]
    pub is_default: bool,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<CreateBody>,
) -> Result<Response, ApiError> {
    if body.provider.trim().is_empty() || body.model_name.trim().is_empty() || body.api_key.trim().is_empty() {
        return Err(Error::Validation("provider, model_name, and api_key are required".into()).into());
    }
    let encrypted = llm_resolve::encrypt(&body.api_key);
    let config = ModelConfigRepo::create(
        state.db(),
        user_id,
        body.provider.trim(),
        body.model_name.trim(),
        &body.base_url,
        &encrypted,
        body.is_default,
    )
    .await?;
    Ok(envelope::created(config, "model config created"))
}

pub async fn set_default(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let config = ModelConfigRepo::set_default(state.db(), id, user_id).await?;
    Ok(envelope::ok(config, "default model updated"))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    ModelConfigRepo::delete(state.db(), id, user_id).await?;
    Ok(envelope::ok(serde_json::json!({"id": id}), "model config deleted"))
}

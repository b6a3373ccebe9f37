//! `POST /api/auth/register`, `POST /api/auth/login`.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use cortex_domain::error::Error;
use cortex_store::UserRepo;

use crate::auth::{hash_password, issue_token, verify_password};
use crate::envelope::{self, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user_id: i64,
    username: String,
}

pub async fn register(State(state): State<AppState>, Json(body): Json<Credentials>) -> Result<Response, ApiError> {
    if body.username.trim().is_empty() || body.password.len() < 8 {
        return Err(Error::Validation("username required, password must be at least 8 characters".into()).into());
    }

    let password_hash = hash_password(&body.password)?;
    let user = UserRepo::create(state.db(), body.username.trim(), &password_hash).await?;
    let token = issue_token(user.id, &state.config().auth.jwt_secret, state.config().auth.jwt_expiration_hours)?;

    Ok(envelope::created(
        AuthResponse { token, user_id: user.id, username: user.username },
        "account created",
    ))
}

pub async fn login(State(state): State<AppState>, Json(body): Json<Credentials>) -> Result<Response, ApiError> {
    let user = UserRepo::get_by_username(state.db(), &body.username)
        .await?
        .ok_or_else(|| Error::Unauthorized("invalid username or password".into()))?;

    if !verify_password(&body.password, &user.password_hash) {
        return Err(Error::Unauthorized("invalid username or password".into()).into());
    }

    let token = issue_token(user.id, &state.config().auth.jwt_secret, state.config().auth.jwt_expiration_hours)?;
    Ok(envelope::ok(
        AuthResponse { token, user_id: user.id, username: user.username },
        "logged in",
    ))
}

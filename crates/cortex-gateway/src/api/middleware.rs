//! JWT bearer-token authentication for protected routes.
//!
//! Every protected handler reads the caller's id back out with
//! `Extension(AuthUser)` rather than re-parsing the header itself.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::verify_token;
use crate::envelope;
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

pub async fn require_auth(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Response {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return envelope::fail(axum::http::StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "missing Authorization header");
    };

    let Some(claims) = verify_token(token, &state.config().auth.jwt_secret) else {
        return envelope::fail(axum::http::StatusCode::UNAUTHORIZED, "TOKEN_INVALID", "invalid or expired token");
    };

    req.extensions_mut().insert(AuthUser(claims.user_id));
    next.run(req).await
}

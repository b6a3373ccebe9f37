pub mod auth;
pub mod conversations;
pub mod memories;
pub mod messages;
pub mod middleware;
pub mod model_configs;

use axum::middleware as axum_middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::state::AppState;

/// Public routes need no bearer token; protected routes are gated behind
/// [`middleware::require_auth`].
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    let protected = Router::new()
        .route("/api/conversations", get(conversations::list))
        .route("/api/conversations", post(conversations::create))
        .route("/api/conversations/:id", put(conversations::rename))
        .route("/api/conversations/:id", delete(conversations::delete))
        .route("/api/conversations/batch", delete(conversations::batch_delete))
        .route("/api/conversations/:id/messages", get(messages::list))
        .route("/api/conversations/:id/messages", post(messages::send))
        .route("/api/conversations/:id/messages/stream", post(messages::stream))
        .route("/api/conversations/:id/messages/:message_id", put(messages::update))
        .route("/api/conversations/:id/messages/:message_id", delete(messages::delete))
        .route("/api/memories", get(memories::list))
        .route("/api/memories/search", post(memories::search))
        .route("/api/model-configs", get(model_configs::list))
        .route("/api/model-configs", post(model_configs::create))
        .route("/api/model-configs/:id", delete(model_configs::delete))
        .route("/api/model-configs/:id/default", post(model_configs::set_default))
        .route_layer(axum_middleware::from_fn_with_state(state, middleware::require_auth));

    public
        .merge(protected)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

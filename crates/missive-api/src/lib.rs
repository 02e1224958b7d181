//! HTTP/JSON adapter over [`missive_core::Messenger`]. Every action is a
//! `POST /api/<action>`; the signing middleware resolves the caller before
//! the handler decodes the body.

pub mod auth;
pub mod conversations;
pub mod error;
pub mod messages;
pub mod middleware;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

/// Which optional routes to mount.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterOptions {
    /// Mount `POST /admin/reset`. Never set in production.
    pub admin: bool,
}

pub fn router(state: AppState, options: RouterOptions) -> Router {
    let api = Router::new()
        .route("/api/register", post(auth::register))
        .route("/api/getUser", post(auth::get_user))
        .route("/api/getDomainUser", post(auth::get_domain_user))
        .route("/api/getCompleteUser", post(auth::get_complete_user))
        .route("/api/sendMessage", post(messages::send_message))
        .route("/api/getMessages", post(messages::get_messages))
        .route("/api/getConversations", post(conversations::get_conversations))
        .route(
            "/api/getAcceptedConversations",
            post(conversations::get_accepted_conversations),
        )
        .route(
            "/api/getUnacceptedConversations",
            post(conversations::get_unaccepted_conversations),
        )
        .route("/api/acceptConversation", post(conversations::accept_conversation))
        .route("/api/markAsRead", post(conversations::mark_as_read))
        .layer(from_fn_with_state(state.clone(), middleware::authenticate));

    let mut app = Router::new().route("/health", get(health)).merge(api);

    if options.admin {
        app = app.route("/admin/reset", post(reset));
    }

    app.with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn reset(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    warn!("Resetting all tables");
    blocking(&state, |m| m.reset()).await?;
    Ok(StatusCode::NO_CONTENT)
}

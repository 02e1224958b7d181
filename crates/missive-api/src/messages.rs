use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json, extract::State, http::StatusCode};

use missive_core::Caller;
use missive_types::api::{GetMessagesRequest, SendMessageRequest, SendMessageResponse};
use missive_types::models::Message;

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

pub async fn send_message(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SendMessageResponse>), ApiError> {
    let Json(req) = payload?;
    let sent = blocking(&state, move |m| m.send_message(&caller, &req)).await?;
    Ok((StatusCode::CREATED, Json(sent)))
}

/// Newest first. Pass the last message's `timestamp` and `id` as `before`
/// and `beforeID` to get the next page.
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<GetMessagesRequest>, JsonRejection>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let Json(req) = payload?;
    let messages = blocking(&state, move |m| m.get_messages(&caller, &req)).await?;
    Ok(Json(messages))
}

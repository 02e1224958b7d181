use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json, extract::State};

use missive_core::Caller;
use missive_types::api::{ConversationRequest, ConversationsRequest, UpdatedResponse};
use missive_types::models::Conversation;

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

pub async fn get_conversations(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<ConversationsRequest>, JsonRejection>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(blocking(&state, move |m| m.get_conversations(&caller, &req)).await?))
}

pub async fn get_accepted_conversations(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<ConversationsRequest>, JsonRejection>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(
        blocking(&state, move |m| m.get_accepted_conversations(&caller, &req)).await?,
    ))
}

pub async fn get_unaccepted_conversations(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<ConversationsRequest>, JsonRejection>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(
        blocking(&state, move |m| m.get_unaccepted_conversations(&caller, &req)).await?,
    ))
}

pub async fn accept_conversation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<ConversationRequest>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let Json(req) = payload?;
    let updated = blocking(&state, move |m| m.accept_conversation(&caller, &req)).await?;
    Ok(Json(UpdatedResponse { updated }))
}

pub async fn mark_as_read(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<ConversationRequest>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let Json(req) = payload?;
    let updated = blocking(&state, move |m| m.mark_as_read(&caller, &req)).await?;
    Ok(Json(UpdatedResponse { updated }))
}

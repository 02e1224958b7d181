use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json, extract::State};

use missive_core::{Caller, Messenger};
use missive_db::Database;
use missive_types::api::{GetDomainUserRequest, GetUserRequest, RegisterRequest, RegisterResponse};
use missive_types::models::{Account, CompleteUser, DomainUser};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub messenger: Messenger<Database>,
}

impl AppStateInner {
    pub fn new(messenger: Messenger<Database>) -> AppState {
        Arc::new(Self { messenger })
    }
}

/// Run a core call off the async runtime. The store holds a blocking
/// SQLite connection.
pub(crate) async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Messenger<Database>) -> missive_core::Result<T> + Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || f(&state.messenger)).await?;
    Ok(result?)
}

pub async fn register(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Json(req) = payload?;
    let response = blocking(&state, move |m| m.register(&caller, &req)).await?;
    Ok(Json(response))
}

pub async fn get_user(
    State(state): State<AppState>,
    payload: Result<Json<GetUserRequest>, JsonRejection>,
) -> Result<Json<Account>, ApiError> {
    let Json(req) = payload?;
    blocking(&state, move |m| m.get_user(&req.address))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn get_domain_user(
    State(state): State<AppState>,
    payload: Result<Json<GetDomainUserRequest>, JsonRejection>,
) -> Result<Json<DomainUser>, ApiError> {
    let Json(req) = payload?;
    blocking(&state, move |m| m.get_domain_user(&req))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn get_complete_user(
    State(state): State<AppState>,
    payload: Result<Json<GetUserRequest>, JsonRejection>,
) -> Result<Json<CompleteUser>, ApiError> {
    let Json(req) = payload?;
    blocking(&state, move |m| m.get_complete_user(&req.address))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

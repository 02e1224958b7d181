use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use missive_core::MAX_MESSAGE_BYTES;

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

/// Header carrying `<compact-hex>:<recovery-bit>` over the raw body.
pub const SIGNATURE_HEADER: &str = "signature";

/// Room for an envelope at the message cap plus the surrounding JSON.
pub const MAX_BODY_BYTES: usize = 2 * MAX_MESSAGE_BYTES + 16 * 1024;

/// Buffer the body, recover the signer from the `SIGNATURE` header and
/// attach the resolved [`missive_core::Caller`]. Requests without the
/// header continue as anonymous; a header that fails to verify is
/// rejected here.
pub async fn authenticate(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, ApiError> {
    let (parts, body) = req.into_parts();
    let raw = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ApiError::TooLarge { max: MAX_BODY_BYTES })?;

    let header = match parts.headers.get(SIGNATURE_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| ApiError::BadRequest("SIGNATURE header is not ASCII".into()))?
                .to_string(),
        ),
        None => None,
    };

    let signed = raw.clone();
    let caller = blocking(&state, move |m| m.authenticate(&signed, header.as_deref())).await?;
    debug!(
        "{} {} from {}",
        parts.method,
        parts.uri.path(),
        caller.public_key.as_deref().unwrap_or("anonymous")
    );

    let mut req = Request::from_parts(parts, Body::from(raw));
    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

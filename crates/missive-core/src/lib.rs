//! Messaging core: request authentication, domain registration,
//! conversation state and the store-and-forward exchange.
//!
//! Everything here is transport-free. `missive-api` decodes HTTP requests
//! and calls into [`Messenger`].

pub mod auth;
pub mod conversation;
pub mod error;
pub mod exchange;
pub mod store;

use missive_crypto::signature::SignaturePolicy;

pub use auth::{Caller, authorization_message};
pub use error::{Error, Result};
pub use store::Store;

/// Upper bound on a stored message body, plaintext or envelope.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024;

pub struct Messenger<S> {
    store: S,
    policy: SignaturePolicy,
}

impl<S: Store> Messenger<S> {
    pub fn new(store: S, policy: SignaturePolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> SignaturePolicy {
        self.policy
    }

    /// Administrative reset. Callers gate this to non-production.
    pub fn reset(&self) -> Result<()> {
        self.store.reset()?;
        Ok(())
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn require_text(field: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Invalid(format!("{} must not be empty", field)));
    }
    if value.len() > max {
        return Err(Error::Invalid(format!("{} longer than {} bytes", field, max)));
    }
    Ok(())
}

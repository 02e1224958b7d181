use missive_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Signature was not produced by the claimed address")]
    AddressMismatch,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Registration belongs to domain {registered}, not {requested}")]
    DomainMismatch { registered: String, requested: String },

    #[error("Public key is already registered to another account")]
    PublicKeyInUse,

    #[error("Conversation id is in use by another pair")]
    InvalidConversation,

    #[error("Not a participant of this conversation")]
    NotParticipant,

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidSignature => Self::InvalidSignature,
            other => Self::Invalid(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Missive Crypto Library
///
/// Identities are secp256k1 key pairs. Requests are authenticated by
/// recovering the signer's public key from a compact ECDSA signature over
/// the keccak-256 hash of the raw body; accounts are Ethereum-style
/// addresses and prove key ownership with a personal-message signature.
///
/// With the `client` feature, two parties derive a shared XChaCha20-Poly1305
/// key via ECDH and exchange `"<nonce-b64>:<ciphertext-b64>"` envelopes.
/// The server never needs that half.

pub mod error;
pub mod hash;
pub mod keys;
pub mod signature;

#[cfg(feature = "client")]
pub mod cache;
#[cfg(feature = "client")]
pub mod ecdh;
#[cfg(feature = "client")]
pub mod encrypt;
#[cfg(feature = "client")]
pub mod envelope;
#[cfg(feature = "client")]
pub mod reader;

pub use error::CryptoError;
pub use k256::{PublicKey, SecretKey};

use k256::{PublicKey, SecretKey};

use crate::hash::keccak256;

/// 256-bit symmetric key shared by the two ends of a thread.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedKey(..)")
    }
}

/// keccak-256 of the ECDH x-coordinate. Either side derives the same key
/// from its own secret and the other's public key.
pub fn derive_shared_secret(secret: &SecretKey, other: &PublicKey) -> SharedKey {
    let shared = k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), other.as_affine());
    SharedKey(keccak256(shared.raw_secret_bytes()))
}

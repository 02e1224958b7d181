use chacha20poly1305::aead::OsRng;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};

use crate::error::CryptoError;
use crate::hash::keccak256;

/// Generate a fresh secp256k1 identity key.
pub fn generate_secret() -> SecretKey {
    SecretKey::random(&mut OsRng)
}

/// Decode a 32-byte hex secret key (optional `0x`).
pub fn secret_from_hex(encoded: &str) -> Result<SecretKey, CryptoError> {
    let bytes = hex::decode(strip_0x(encoded.trim())).map_err(|_| CryptoError::InvalidSecretKey)?;
    SecretKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidSecretKey)
}

pub fn secret_to_hex(secret: &SecretKey) -> String {
    hex::encode(secret.to_bytes())
}

/// Parse a SEC1 public key, compressed or uncompressed, with optional `0x`.
pub fn parse_public_key(encoded: &str) -> Result<PublicKey, CryptoError> {
    let bytes = hex::decode(strip_0x(encoded.trim())).map_err(|_| CryptoError::InvalidPublicKey)?;
    PublicKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)
}

/// Canonical form: lowercase compressed 33-byte hex, no prefix.
/// Two keys are equal iff their canonical strings are.
pub fn public_key_hex(key: &PublicKey) -> String {
    hex::encode(key.to_encoded_point(true).as_bytes())
}

/// Re-encode any accepted public key spelling into canonical form.
pub fn canonical_public_key(encoded: &str) -> Result<String, CryptoError> {
    parse_public_key(encoded).map(|key| public_key_hex(&key))
}

/// Ethereum-style account address: last 20 bytes of keccak-256 over the
/// uncompressed point without its 0x04 tag.
pub fn address_of(key: &PublicKey) -> String {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}

/// Validate and lowercase an account address.
pub fn normalize_address(address: &str) -> Result<String, CryptoError> {
    let trimmed = address.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| CryptoError::InvalidAddress(address.to_string()))?;

    if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CryptoError::InvalidAddress(address.to_string()));
    }

    Ok(format!("0x{}", body.to_ascii_lowercase()))
}

pub(crate) fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::{PublicKey, SecretKey};
use tracing::warn;

use crate::error::CryptoError;
use crate::hash::keccak256;
use crate::keys::{address_of, parse_public_key, strip_0x};

/// Header prefix that asserts a public key without proving it.
pub const DEV_BYPASS_PREFIX: &str = "FAKE:";

/// Whether `FAKE:<publicKey>` headers are honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignaturePolicy {
    #[default]
    Strict,
    /// Development and test environments only. The server refuses to start
    /// a production configuration with this policy.
    AllowDevBypass,
}

/// Resolve a `SIGNATURE` header value to the public key that signed
/// `raw_body`.
pub fn authenticate_header(
    policy: SignaturePolicy,
    raw_body: &[u8],
    header: &str,
) -> Result<PublicKey, CryptoError> {
    if let Some(asserted) = header.strip_prefix(DEV_BYPASS_PREFIX) {
        return match policy {
            SignaturePolicy::AllowDevBypass => {
                parse_public_key(asserted).map_err(|_| CryptoError::InvalidSignature)
            }
            SignaturePolicy::Strict => {
                warn!("Rejected dev-bypass signature under strict policy");
                Err(CryptoError::InvalidSignature)
            }
        };
    }

    recover_public_key(raw_body, header)
}

/// Recover the signer of `raw_body` from `"<compact-hex>:<recovery-bit>"`.
pub fn recover_public_key(raw_body: &[u8], signature: &str) -> Result<PublicKey, CryptoError> {
    let (compact, bit) = signature.split_once(':').ok_or(CryptoError::InvalidSignature)?;

    let recovery_id = match bit.trim() {
        "0" => RecoveryId::from_byte(0),
        "1" => RecoveryId::from_byte(1),
        _ => None,
    }
    .ok_or(CryptoError::InvalidSignature)?;

    let bytes = hex::decode(strip_0x(compact.trim())).map_err(|_| CryptoError::InvalidSignature)?;
    if bytes.len() != 64 {
        return Err(CryptoError::InvalidSignature);
    }
    let sig = Signature::from_slice(&bytes).map_err(|_| CryptoError::InvalidSignature)?;

    let prehash = keccak256(raw_body);
    let key = VerifyingKey::recover_from_prehash(&prehash, &sig, recovery_id)
        .map_err(|_| CryptoError::InvalidSignature)?;

    Ok(PublicKey::from(&key))
}

/// Produce a `SIGNATURE` header value for `raw_body`.
pub fn sign_request(secret: &SecretKey, raw_body: &[u8]) -> Result<String, CryptoError> {
    let signing = SigningKey::from(secret);
    let (sig, recovery_id) = signing
        .sign_prehash_recoverable(&keccak256(raw_body))
        .map_err(|_| CryptoError::InvalidSignature)?;

    Ok(format!("{}:{}", hex::encode(sig.to_bytes()), recovery_id.to_byte()))
}

// -- Personal messages (account ownership proofs) --

/// EIP-191 hash: `keccak256("\x19Ethereum Signed Message:\n" + len + message)`.
pub fn personal_message_hash(message: &str) -> [u8; 32] {
    let mut data = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    data.extend_from_slice(message.as_bytes());
    keccak256(&data)
}

/// Recover the address that signed `message` with a 65-byte `r||s||v`
/// signature. `v` may be 0/1 or 27/28.
pub fn recover_personal_signer(message: &str, signature: &str) -> Result<String, CryptoError> {
    let bytes = hex::decode(strip_0x(signature.trim())).map_err(|_| CryptoError::InvalidSignature)?;
    if bytes.len() != 65 {
        return Err(CryptoError::InvalidSignature);
    }

    let v = match bytes[64] {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(CryptoError::InvalidSignature),
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or(CryptoError::InvalidSignature)?;
    let sig = Signature::from_slice(&bytes[..64]).map_err(|_| CryptoError::InvalidSignature)?;

    let key = VerifyingKey::recover_from_prehash(&personal_message_hash(message), &sig, recovery_id)
        .map_err(|_| CryptoError::InvalidSignature)?;

    Ok(address_of(&PublicKey::from(&key)))
}

/// Sign `message` as a personal message, `v` encoded as 27/28.
pub fn sign_personal(secret: &SecretKey, message: &str) -> Result<String, CryptoError> {
    let signing = SigningKey::from(secret);
    let (sig, recovery_id) = signing
        .sign_prehash_recoverable(&personal_message_hash(message))
        .map_err(|_| CryptoError::InvalidSignature)?;

    let mut bytes = sig.to_bytes().to_vec();
    bytes.push(27 + recovery_id.to_byte());
    Ok(format!("0x{}", hex::encode(bytes)))
}

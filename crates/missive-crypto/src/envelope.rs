//! `"<nonce-b64>:<ciphertext-b64>"` message bodies.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use k256::{PublicKey, SecretKey};

use crate::ecdh::{SharedKey, derive_shared_secret};
use crate::encrypt::{decrypt_message, encrypt_message};
use crate::error::CryptoError;
use crate::keys::{parse_public_key, public_key_hex};

/// Encrypt `plaintext` under `key` and encode it as an envelope.
pub fn seal_with(key: &SharedKey, plaintext: &str) -> Result<String, CryptoError> {
    let (nonce, ciphertext) = encrypt_message(key, plaintext.as_bytes())?;
    Ok(format!("{}:{}", BASE64.encode(nonce), BASE64.encode(ciphertext)))
}

/// Split on the first `:` and decode both halves.
pub fn parse_envelope(body: &str) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let (nonce, ciphertext) = body.split_once(':').ok_or(CryptoError::InvalidEnvelope)?;
    let nonce = BASE64.decode(nonce).map_err(|_| CryptoError::InvalidEnvelope)?;
    let ciphertext = BASE64.decode(ciphertext).map_err(|_| CryptoError::InvalidEnvelope)?;
    Ok((nonce, ciphertext))
}

pub fn open_with(key: &SharedKey, body: &str) -> Result<String, CryptoError> {
    let (nonce, ciphertext) = parse_envelope(body)?;
    let plaintext = decrypt_message(key, &nonce, &ciphertext)?;
    String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
}

/// Sender side: derive the pair key and seal.
pub fn seal(secret: &SecretKey, recipient: &PublicKey, plaintext: &str) -> Result<String, CryptoError> {
    seal_with(&derive_shared_secret(secret, recipient), plaintext)
}

/// Pick whichever of the two message keys is not the reader's own.
/// A message the reader sent to themselves uses their own key.
pub fn counterpart_key(
    own: &PublicKey,
    sender_public_key: &str,
    recipient_public_key: Option<&str>,
) -> Result<PublicKey, CryptoError> {
    let own_hex = public_key_hex(own);
    let sender = parse_public_key(sender_public_key)?;

    if public_key_hex(&sender) != own_hex {
        return Ok(sender);
    }

    let recipient = recipient_public_key.ok_or(CryptoError::InvalidPublicKey)?;
    parse_public_key(recipient)
}

/// Reader side: derive the pair key from the stored keys and open.
pub fn open(
    secret: &SecretKey,
    sender_public_key: &str,
    recipient_public_key: Option<&str>,
    body: &str,
) -> Result<String, CryptoError> {
    let other = counterpart_key(&secret.public_key(), sender_public_key, recipient_public_key)?;
    open_with(&derive_shared_secret(secret, &other), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_secret;

    #[test]
    fn both_parties_open() {
        let alice = generate_secret();
        let bob = generate_secret();
        let alice_pk = public_key_hex(&alice.public_key());
        let bob_pk = public_key_hex(&bob.public_key());

        let body = seal(&alice, &bob.public_key(), "hello bob").unwrap();

        assert_eq!(open(&bob, &alice_pk, Some(&bob_pk), &body).unwrap(), "hello bob");
        assert_eq!(open(&alice, &alice_pk, Some(&bob_pk), &body).unwrap(), "hello bob");
    }

    #[test]
    fn envelope_shape() {
        let alice = generate_secret();
        let bob = generate_secret();
        let body = seal(&alice, &bob.public_key(), "x").unwrap();

        let (nonce, ciphertext) = parse_envelope(&body).unwrap();
        assert_eq!(nonce.len(), 24);
        // 1 byte plaintext + 16 byte tag
        assert_eq!(ciphertext.len(), 17);
    }

    #[test]
    fn malformed_envelopes() {
        assert_eq!(parse_envelope("no-separator"), Err(CryptoError::InvalidEnvelope));
        assert_eq!(parse_envelope("!!!:AAAA"), Err(CryptoError::InvalidEnvelope));
        assert_eq!(parse_envelope("AAAA:***"), Err(CryptoError::InvalidEnvelope));
    }

    #[test]
    fn outsider_cannot_open() {
        let alice = generate_secret();
        let bob = generate_secret();
        let eve = generate_secret();
        let alice_pk = public_key_hex(&alice.public_key());
        let bob_pk = public_key_hex(&bob.public_key());

        let body = seal(&alice, &bob.public_key(), "private").unwrap();
        assert_eq!(
            open(&eve, &alice_pk, Some(&bob_pk), &body),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn own_clear_message_has_no_counterpart() {
        let alice = generate_secret();
        let alice_pk = public_key_hex(&alice.public_key());
        assert_eq!(
            counterpart_key(&alice.public_key(), &alice_pk, None),
            Err(CryptoError::InvalidPublicKey)
        );
    }
}

use k256::{PublicKey, SecretKey};
use tracing::debug;

use missive_types::models::{Message, MessageType};

use crate::cache::{KeyCache, PlaintextCache};
use crate::ecdh::{SharedKey, derive_shared_secret};
use crate::envelope::{counterpart_key, open_with, seal_with};
use crate::error::CryptoError;
use crate::keys::{address_of, parse_public_key, public_key_hex};

const DEFAULT_KEY_CACHE: usize = 256;
const DEFAULT_PLAINTEXT_CACHE: usize = 4096;

/// A listing entry with its decoded body, or why it could not be decoded.
#[derive(Debug, Clone)]
pub struct OpenedMessage {
    pub message: Message,
    pub content: Result<String, CryptoError>,
}

/// Client session state for sealing and opening messages. Owns its caches;
/// nothing is process-global.
pub struct MessageReader {
    secret: SecretKey,
    public_key: PublicKey,
    address: String,
    keys: KeyCache,
    plaintexts: PlaintextCache,
}

impl MessageReader {
    pub fn new(secret: SecretKey) -> Self {
        Self::with_caches(
            secret,
            KeyCache::new(DEFAULT_KEY_CACHE),
            PlaintextCache::new(DEFAULT_PLAINTEXT_CACHE),
        )
    }

    pub fn with_caches(secret: SecretKey, keys: KeyCache, plaintexts: PlaintextCache) -> Self {
        let public_key = secret.public_key();
        let address = address_of(&public_key);
        Self {
            secret,
            public_key,
            address,
            keys,
            plaintexts,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key_hex(&self) -> String {
        public_key_hex(&self.public_key)
    }

    fn shared_key(&self, other: &PublicKey) -> SharedKey {
        let cache_key = (self.address.clone(), public_key_hex(other));
        match self.keys.get(&cache_key) {
            Some(hit) => hit,
            None => {
                let key = derive_shared_secret(&self.secret, other);
                self.keys.insert(cache_key, key.clone());
                key
            }
        }
    }

    /// Seal `plaintext` for the holder of `recipient_public_key`.
    pub fn seal_for(&self, recipient_public_key: &str, plaintext: &str) -> Result<String, CryptoError> {
        let recipient = parse_public_key(recipient_public_key)?;
        seal_with(&self.shared_key(&recipient), plaintext)
    }

    /// Decode one stored message. `clear` bodies pass through.
    pub fn read(&self, message: &Message) -> Result<String, CryptoError> {
        if message.kind == MessageType::Clear {
            return Ok(message.message.clone());
        }

        self.plaintexts
            .get_or_try_insert_with((message.id.clone(), message.timestamp), || {
                let other = counterpart_key(
                    &self.public_key,
                    &message.sender_public_key,
                    message.recipient_public_key.as_deref(),
                )?;
                open_with(&self.shared_key(&other), &message.message)
            })
    }

    /// Decode a whole listing; failures stay attached to their message.
    pub fn read_all(&self, messages: Vec<Message>) -> Vec<OpenedMessage> {
        messages
            .into_iter()
            .map(|message| {
                let content = self.read(&message);
                if let Err(e) = &content {
                    debug!("Could not open message {}: {}", message.id, e);
                }
                OpenedMessage { message, content }
            })
            .collect()
    }
}

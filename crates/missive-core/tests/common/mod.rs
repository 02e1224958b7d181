#![allow(dead_code)]

use missive_core::{Caller, Messenger, authorization_message};
use missive_crypto::SecretKey;
use missive_crypto::keys::{address_of, generate_secret, public_key_hex};
use missive_crypto::signature::{SignaturePolicy, sign_personal, sign_request};
use missive_db::Database;
use missive_types::api::{ConversationRequest, ConversationsRequest, RegisterRequest, SendMessageRequest};
use missive_types::models::MessageType;
use serde::Serialize;

pub const DOMAIN: &str = "test.com";
pub const NAMESPACE: &str = "dm";

pub fn messenger() -> Messenger<Database> {
    Messenger::new(Database::open_in_memory().unwrap(), SignaturePolicy::Strict)
}

pub struct User {
    pub secret: SecretKey,
    pub address: String,
    pub public_key: String,
}

impl User {
    pub fn new() -> Self {
        let secret = generate_secret();
        let public = secret.public_key();
        Self {
            address: address_of(&public),
            public_key: public_key_hex(&public),
            secret,
        }
    }

    /// Authenticate `body` exactly as the transport would: sign the bytes,
    /// then recover.
    pub fn caller<T: Serialize>(&self, m: &Messenger<Database>, body: &T) -> Caller {
        let raw = serde_json::to_vec(body).unwrap();
        let signature = sign_request(&self.secret, &raw).unwrap();
        m.authenticate(&raw, Some(&signature)).unwrap()
    }

    pub fn registration(&self, username: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            address: self.address.clone(),
            signature: sign_personal(&self.secret, &authorization_message(&self.address, &self.public_key))
                .unwrap(),
            domain: DOMAIN.into(),
            username: username.map(String::from),
            name: None,
        }
    }

    pub fn register(&self, m: &Messenger<Database>, username: &str) {
        let req = self.registration(Some(username));
        let caller = self.caller(m, &req);
        m.register(&caller, &req).unwrap();
    }

    pub fn send(
        &self,
        m: &Messenger<Database>,
        to: &User,
        kind: MessageType,
        body: &str,
        conversation_id: Option<&str>,
    ) -> missive_core::Result<missive_types::api::SendMessageResponse> {
        let req = SendMessageRequest {
            domain: DOMAIN.into(),
            namespace: NAMESPACE.into(),
            recipient: to.address.clone(),
            recipient_public_key: match kind {
                MessageType::Clear => None,
                MessageType::Encrypted => Some(to.public_key.clone()),
            },
            message: body.into(),
            kind,
            conversation_id: conversation_id.map(String::from),
            timestamp: None,
        };
        let caller = self.caller(m, &req);
        m.send_message(&caller, &req)
    }

    pub fn conversations_req(&self) -> ConversationsRequest {
        ConversationsRequest {
            domain: DOMAIN.into(),
            namespace: NAMESPACE.into(),
        }
    }

    pub fn thread_req(&self, conversation_id: &str) -> ConversationRequest {
        ConversationRequest {
            domain: DOMAIN.into(),
            namespace: NAMESPACE.into(),
            conversation_id: conversation_id.into(),
        }
    }
}

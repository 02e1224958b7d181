use serde::{Deserialize, Serialize};

use crate::models::MessageType;

/// Default page size for message listings.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 50;

/// Hard ceiling applied to any requested page size.
pub const MAX_PAGE_LIMIT: u32 = 200;

fn default_limit() -> u32 {
    DEFAULT_MESSAGE_LIMIT
}

// -- Users --

/// The caller's public key comes from the `SIGNATURE` header, not the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub address: String,
    /// 65-byte hex personal-message signature by `address` over the
    /// authorization message.
    pub signature: String,
    pub domain: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub timestamp: i64,
    /// The key actually bound on the domain. It differs from the signing
    /// key when an earlier registration already bound one.
    pub public_key: String,
    /// False when the signing key was not bound.
    pub key_bound: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetUserRequest {
    pub address: String,
}

/// Looks a registration up by address, or by username when no address is
/// given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetDomainUserRequest {
    pub domain: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

// -- Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendMessageRequest {
    pub domain: String,
    pub namespace: String,
    pub recipient: String,
    #[serde(default)]
    pub recipient_public_key: Option<String>,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Overrides the canonical pair-derived conversation id.
    #[serde(default, rename = "conversationID")]
    pub conversation_id: Option<String>,
    /// Milliseconds since the epoch; the server clock is used when absent.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub id: String,
    #[serde(rename = "conversationID")]
    pub conversation_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GetMessagesRequest {
    pub domain: String,
    pub namespace: String,
    #[serde(rename = "conversationID")]
    pub conversation_id: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor: the `timestamp` of the last message already seen.
    #[serde(default)]
    pub before: Option<i64>,
    /// The `id` of that message, so later pages keep messages sharing its
    /// timestamp. Without it everything at `before` is skipped.
    #[serde(default, rename = "beforeID")]
    pub before_id: Option<String>,
}

// -- Conversations --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationsRequest {
    pub domain: String,
    pub namespace: String,
}

/// Used by `acceptConversation` and `markAsRead`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationRequest {
    pub domain: String,
    pub namespace: String,
    #[serde(rename = "conversationID")]
    pub conversation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatedResponse {
    pub updated: bool,
}

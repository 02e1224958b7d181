use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A stable identity, independent of any domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: String,
    pub name: Option<String>,
    pub created: i64,
}

/// Public view of a domain registration. The authorizing signature is
/// kept server-side and never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainUser {
    pub address: String,
    pub domain: String,
    pub username: Option<String>,
    pub public_key: String,
    pub added: i64,
    pub last_presence: i64,
}

/// An account together with every domain it is registered on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUser {
    #[serde(flatten)]
    pub account: Account,
    pub domains: Vec<DomainUser>,
}

/// One participant's state for a thread, collapsed from (accepted, read).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationState {
    Unaccepted,
    Unread,
    Read,
}

impl ConversationState {
    pub fn from_flags(accepted: bool, read: bool) -> Self {
        match (accepted, read) {
            (false, _) => Self::Unaccepted,
            (true, false) => Self::Unread,
            (true, true) => Self::Read,
        }
    }
}

/// One participant's view of a two-party thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub domain: String,
    pub namespace: String,
    pub first: String,
    pub second: String,
    #[serde(rename = "conversationID")]
    pub conversation_id: String,
    pub last_message: i64,
    pub accepted: bool,
    pub read: bool,
    pub state: ConversationState,
}

/// Which of a participant's conversation rows a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationFilter {
    All,
    Accepted,
    Unaccepted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Clear,
    Encrypted,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Encrypted => "encrypted",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clear" => Ok(Self::Clear),
            "encrypted" => Ok(Self::Encrypted),
            other => Err(format!("unknown message type: {}", other)),
        }
    }
}

/// Messages are immutable once stored. For `Encrypted` messages `message`
/// is the `"<nonce-b64>:<ciphertext-b64>"` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub domain: String,
    pub namespace: String,
    #[serde(rename = "conversationID")]
    pub conversation_id: String,
    pub sender: String,
    pub sender_public_key: String,
    pub recipient: String,
    pub recipient_public_key: Option<String>,
    pub timestamp: i64,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub signature: String,
}

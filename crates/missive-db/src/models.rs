/// Database row types — these map directly to SQLite rows.
/// Distinct from missive-types API models to keep the DB layer independent.

pub struct AccountRow {
    pub address: String,
    pub name: Option<String>,
    pub created: i64,
}

pub struct DomainUserRow {
    pub user: String,
    pub domain: String,
    pub domain_username: Option<String>,
    pub public_key: String,
    pub signature: String,
    pub added: i64,
    pub last_presence: i64,
}

pub struct ConversationRow {
    pub domain: String,
    pub namespace: String,
    pub first: String,
    pub second: String,
    pub conversation_id: String,
    pub last_message: i64,
    pub accepted: bool,
    pub read: bool,
}

pub struct MessageRow {
    pub id: String,
    pub domain: String,
    pub namespace: String,
    pub conversation_id: String,
    pub sender: String,
    pub sender_public_key: String,
    pub recipient: String,
    pub recipient_public_key: Option<String>,
    pub timestamp: i64,
    pub message: String,
    pub kind: String,
    pub signature: String,
}

/// Input to `Database::register`.
pub struct NewRegistration<'a> {
    pub address: &'a str,
    pub name: Option<&'a str>,
    pub domain: &'a str,
    pub username: Option<&'a str>,
    pub public_key: &'a str,
    pub signature: &'a str,
    pub now: i64,
}

pub enum RegisterOutcome {
    /// The registration as stored after the upsert. Its public key may
    /// differ from the one presented if the row already existed.
    Registered(DomainUserRow),
    /// The presented key is bound to another (account, domain).
    KeyTaken,
}

pub enum SendOutcome {
    Stored,
    /// The conversation id is already used by a different pair.
    ConversationConflict,
}

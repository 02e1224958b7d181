//! The storage seam. The core only talks to a `Store`; `missive_db::Database`
//! is the SQLite driver.

use anyhow::{Result, anyhow};
use tracing::warn;

use missive_db::Database;
use missive_db::models::{
    AccountRow, ConversationRow, DomainUserRow, MessageRow, NewRegistration as RegistrationRow,
    RegisterOutcome, SendOutcome,
};
use missive_types::models::{
    Account, Conversation, ConversationFilter, ConversationState, DomainUser, Message,
};

pub struct NewRegistration<'a> {
    pub address: &'a str,
    pub name: Option<&'a str>,
    pub domain: &'a str,
    pub username: Option<&'a str>,
    pub public_key: &'a str,
    pub signature: &'a str,
    pub now: i64,
}

pub enum Registered {
    /// The registration as stored; its key is the one bound first.
    Bound(DomainUser),
    KeyTaken,
}

/// Exclusive `(timestamp, id)` cursor. `before_id` is only meaningful
/// together with `before`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub before: Option<i64>,
    pub before_id: Option<String>,
}

pub trait Store: Send + Sync {
    fn register(&self, reg: &NewRegistration<'_>) -> Result<Registered>;
    fn account(&self, address: &str) -> Result<Option<Account>>;
    fn domain_user(&self, domain: &str, address: &str) -> Result<Option<DomainUser>>;
    fn domain_user_by_username(&self, domain: &str, username: &str) -> Result<Option<DomainUser>>;
    fn domain_user_by_public_key(&self, public_key: &str) -> Result<Option<DomainUser>>;
    fn domain_users_for(&self, address: &str) -> Result<Vec<DomainUser>>;

    /// Upsert both conversation rows and insert `message` as one atomic unit.
    /// Returns false when the conversation id already names another pair.
    fn record_send(&self, message: &Message, now: i64) -> Result<bool>;
    fn messages(&self, domain: &str, namespace: &str, conversation_id: &str, page: Page) -> Result<Vec<Message>>;

    fn conversations(
        &self,
        domain: &str,
        namespace: &str,
        owner: &str,
        filter: ConversationFilter,
    ) -> Result<Vec<Conversation>>;
    fn conversation(
        &self,
        domain: &str,
        namespace: &str,
        owner: &str,
        conversation_id: &str,
    ) -> Result<Option<Conversation>>;
    fn accept_conversation(&self, domain: &str, namespace: &str, owner: &str, conversation_id: &str) -> Result<bool>;
    fn mark_as_read(&self, domain: &str, namespace: &str, owner: &str, conversation_id: &str) -> Result<bool>;

    /// Drop and recreate every table.
    fn reset(&self) -> Result<()>;
}

impl Store for Database {
    fn register(&self, reg: &NewRegistration<'_>) -> Result<Registered> {
        let row = RegistrationRow {
            address: reg.address,
            name: reg.name,
            domain: reg.domain,
            username: reg.username,
            public_key: reg.public_key,
            signature: reg.signature,
            now: reg.now,
        };
        Ok(match Database::register(self, &row)? {
            RegisterOutcome::Registered(stored) => Registered::Bound(domain_user(stored)),
            RegisterOutcome::KeyTaken => Registered::KeyTaken,
        })
    }

    fn account(&self, address: &str) -> Result<Option<Account>> {
        Ok(self.get_account(address)?.map(account))
    }

    fn domain_user(&self, domain: &str, address: &str) -> Result<Option<DomainUser>> {
        Ok(self.get_domain_user(domain, address)?.map(domain_user))
    }

    fn domain_user_by_username(&self, domain: &str, username: &str) -> Result<Option<DomainUser>> {
        Ok(self.get_domain_user_by_username(domain, username)?.map(domain_user))
    }

    fn domain_user_by_public_key(&self, public_key: &str) -> Result<Option<DomainUser>> {
        Ok(self.get_domain_user_by_public_key(public_key)?.map(domain_user))
    }

    fn domain_users_for(&self, address: &str) -> Result<Vec<DomainUser>> {
        Ok(self.get_domain_users_for(address)?.into_iter().map(domain_user).collect())
    }

    fn record_send(&self, message: &Message, now: i64) -> Result<bool> {
        let row = MessageRow {
            id: message.id.clone(),
            domain: message.domain.clone(),
            namespace: message.namespace.clone(),
            conversation_id: message.conversation_id.clone(),
            sender: message.sender.clone(),
            sender_public_key: message.sender_public_key.clone(),
            recipient: message.recipient.clone(),
            recipient_public_key: message.recipient_public_key.clone(),
            timestamp: message.timestamp,
            message: message.message.clone(),
            kind: message.kind.as_str().to_string(),
            signature: message.signature.clone(),
        };
        Ok(matches!(Database::record_send(self, &row, now)?, SendOutcome::Stored))
    }

    fn messages(&self, domain: &str, namespace: &str, conversation_id: &str, page: Page) -> Result<Vec<Message>> {
        self.get_messages(
            domain,
            namespace,
            conversation_id,
            page.limit,
            page.before,
            page.before_id.as_deref(),
        )?
            .into_iter()
            .map(message)
            .collect()
    }

    fn conversations(
        &self,
        domain: &str,
        namespace: &str,
        owner: &str,
        filter: ConversationFilter,
    ) -> Result<Vec<Conversation>> {
        Ok(self
            .get_conversations(domain, namespace, owner, filter)?
            .into_iter()
            .map(conversation)
            .collect())
    }

    fn conversation(
        &self,
        domain: &str,
        namespace: &str,
        owner: &str,
        conversation_id: &str,
    ) -> Result<Option<Conversation>> {
        Ok(self
            .get_conversation(domain, namespace, owner, conversation_id)?
            .map(conversation))
    }

    fn accept_conversation(&self, domain: &str, namespace: &str, owner: &str, conversation_id: &str) -> Result<bool> {
        Database::accept_conversation(self, domain, namespace, owner, conversation_id)
    }

    fn mark_as_read(&self, domain: &str, namespace: &str, owner: &str, conversation_id: &str) -> Result<bool> {
        Database::mark_as_read(self, domain, namespace, owner, conversation_id)
    }

    fn reset(&self) -> Result<()> {
        Database::reset(self)
    }
}

fn account(row: AccountRow) -> Account {
    Account {
        address: row.address,
        name: row.name,
        created: row.created,
    }
}

fn domain_user(row: DomainUserRow) -> DomainUser {
    DomainUser {
        address: row.user,
        domain: row.domain,
        username: row.domain_username,
        public_key: row.public_key,
        added: row.added,
        last_presence: row.last_presence,
    }
}

fn conversation(row: ConversationRow) -> Conversation {
    Conversation {
        state: ConversationState::from_flags(row.accepted, row.read),
        domain: row.domain,
        namespace: row.namespace,
        first: row.first,
        second: row.second,
        conversation_id: row.conversation_id,
        last_message: row.last_message,
        accepted: row.accepted,
        read: row.read,
    }
}

fn message(row: MessageRow) -> Result<Message> {
    let kind = row.kind.parse().map_err(|e: String| {
        warn!("Corrupt type '{}' on message '{}'", row.kind, row.id);
        anyhow!(e)
    })?;

    Ok(Message {
        id: row.id,
        domain: row.domain,
        namespace: row.namespace,
        conversation_id: row.conversation_id,
        sender: row.sender,
        sender_public_key: row.sender_public_key,
        recipient: row.recipient,
        recipient_public_key: row.recipient_public_key,
        timestamp: row.timestamp,
        message: row.message,
        kind,
        signature: row.signature,
    })
}

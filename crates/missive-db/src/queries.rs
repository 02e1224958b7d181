use crate::Database;
use crate::models::{
    AccountRow, ConversationRow, DomainUserRow, MessageRow, NewRegistration, RegisterOutcome,
    SendOutcome,
};
use anyhow::Result;
use missive_types::models::ConversationFilter;
use rusqlite::{Connection, Row, params};

const DOMAIN_USER_COLUMNS: &str =
    "user, domain, domain_username, public_key, signature, added, last_presence";

const CONVERSATION_COLUMNS: &str =
    "domain, namespace, first, second, conversation_id, last_message, accepted, read";

const MESSAGE_COLUMNS: &str = "id, domain, namespace, conversation_id, sender, sender_public_key, \
     recipient, recipient_public_key, timestamp, message, type, signature";

impl Database {
    // -- Users --

    /// Upsert the account and its registration on one domain in a single
    /// transaction. Name and username coalesce; the public key and its
    /// signature are written on first insert only.
    pub fn register(&self, reg: &NewRegistration<'_>) -> Result<RegisterOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let holder: Option<(String, String)> = tx
                .query_row(
                    "SELECT user, domain FROM domain_users WHERE public_key = ?1",
                    [reg.public_key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            if let Some((user, domain)) = holder {
                if user != reg.address || domain != reg.domain {
                    return Ok(RegisterOutcome::KeyTaken);
                }
            }

            tx.execute(
                "INSERT INTO users (address, name, created) VALUES (?1, ?2, ?3)
                 ON CONFLICT(address) DO UPDATE SET name = COALESCE(excluded.name, users.name)",
                params![reg.address, reg.name, reg.now],
            )?;

            tx.execute(
                "INSERT INTO domain_users
                    (user, domain, domain_username, public_key, signature, added, last_presence)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(user, domain) DO UPDATE SET
                    domain_username = COALESCE(excluded.domain_username, domain_users.domain_username),
                    last_presence = excluded.last_presence",
                params![reg.address, reg.domain, reg.username, reg.public_key, reg.signature, reg.now],
            )?;

            let stored = query_domain_user(&tx, reg.domain, reg.address)?
                .ok_or_else(|| anyhow::anyhow!("registration vanished inside its own transaction"))?;

            tx.commit()?;
            Ok(RegisterOutcome::Registered(stored))
        })
    }

    pub fn get_account(&self, address: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT address, name, created FROM users WHERE address = ?1",
                    [address],
                    |row| {
                        Ok(AccountRow {
                            address: row.get(0)?,
                            name: row.get(1)?,
                            created: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_domain_user(&self, domain: &str, address: &str) -> Result<Option<DomainUserRow>> {
        self.with_conn(|conn| query_domain_user(conn, domain, address))
    }

    pub fn get_domain_user_by_username(&self, domain: &str, username: &str) -> Result<Option<DomainUserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM domain_users WHERE domain = ?1 AND domain_username = ?2 ORDER BY added LIMIT 1",
                DOMAIN_USER_COLUMNS
            );
            Ok(conn.query_row(&sql, [domain, username], row_to_domain_user).optional()?)
        })
    }

    pub fn get_domain_user_by_public_key(&self, public_key: &str) -> Result<Option<DomainUserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM domain_users WHERE public_key = ?1", DOMAIN_USER_COLUMNS);
            Ok(conn.query_row(&sql, [public_key], row_to_domain_user).optional()?)
        })
    }

    pub fn get_domain_users_for(&self, address: &str) -> Result<Vec<DomainUserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM domain_users WHERE user = ?1 ORDER BY domain",
                DOMAIN_USER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([address], row_to_domain_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    /// Store one message and update both participants' conversation rows
    /// atomically. The recipient's row keeps its `accepted` flag and goes
    /// unread (new rows start unaccepted); the sender's row is marked
    /// accepted and read.
    pub fn record_send(&self, msg: &MessageRow, now: i64) -> Result<SendOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !thread_belongs_to(&tx, msg)? {
                return Ok(SendOutcome::ConversationConflict);
            }

            tx.execute(
                "INSERT INTO conversations
                    (domain, namespace, first, second, conversation_id, last_message, accepted, read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0)
                 ON CONFLICT(domain, namespace, first, conversation_id) DO UPDATE SET
                    last_message = MAX(conversations.last_message, excluded.last_message),
                    read = 0",
                params![msg.domain, msg.namespace, msg.recipient, msg.sender, msg.conversation_id, msg.timestamp],
            )?;

            tx.execute(
                "INSERT INTO conversations
                    (domain, namespace, first, second, conversation_id, last_message, accepted, read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, 1)
                 ON CONFLICT(domain, namespace, first, conversation_id) DO UPDATE SET
                    last_message = MAX(conversations.last_message, excluded.last_message),
                    accepted = 1,
                    read = 1",
                params![msg.domain, msg.namespace, msg.sender, msg.recipient, msg.conversation_id, msg.timestamp],
            )?;

            tx.execute(
                &format!(
                    "INSERT INTO messages ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    MESSAGE_COLUMNS
                ),
                params![
                    msg.id,
                    msg.domain,
                    msg.namespace,
                    msg.conversation_id,
                    msg.sender,
                    msg.sender_public_key,
                    msg.recipient,
                    msg.recipient_public_key,
                    msg.timestamp,
                    msg.message,
                    msg.kind,
                    msg.signature,
                ],
            )?;

            tx.execute(
                "UPDATE domain_users SET last_presence = MAX(last_presence, ?3)
                 WHERE user = ?1 AND domain = ?2",
                params![msg.sender, msg.domain, now],
            )?;

            tx.commit()?;
            Ok(SendOutcome::Stored)
        })
    }

    /// Newest first, ties broken by id. The cursor is the `(timestamp, id)`
    /// of the last row of the previous page and is exclusive; without an id
    /// it skips the whole `before` millisecond.
    pub fn get_messages(
        &self,
        domain: &str,
        namespace: &str,
        conversation_id: &str,
        limit: u32,
        before: Option<i64>,
        before_id: Option<&str>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM messages
                 WHERE domain = ?1 AND namespace = ?2 AND conversation_id = ?3
                   AND (?4 IS NULL OR timestamp < ?4
                        OR (timestamp = ?4 AND ?5 IS NOT NULL AND id < ?5))
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?6",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![domain, namespace, conversation_id, before, before_id, limit], row_to_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Conversations --

    pub fn get_conversations(
        &self,
        domain: &str,
        namespace: &str,
        owner: &str,
        filter: ConversationFilter,
    ) -> Result<Vec<ConversationRow>> {
        let accepted_clause = match filter {
            ConversationFilter::All => "",
            ConversationFilter::Accepted => "AND accepted = 1",
            ConversationFilter::Unaccepted => "AND accepted = 0",
        };

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM conversations
                 WHERE domain = ?1 AND namespace = ?2 AND first = ?3 {}
                 ORDER BY accepted DESC, read ASC, last_message DESC",
                CONVERSATION_COLUMNS, accepted_clause
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([domain, namespace, owner], row_to_conversation)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_conversation(
        &self,
        domain: &str,
        namespace: &str,
        owner: &str,
        conversation_id: &str,
    ) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM conversations
                 WHERE domain = ?1 AND namespace = ?2 AND first = ?3 AND conversation_id = ?4",
                CONVERSATION_COLUMNS
            );
            Ok(conn
                .query_row(&sql, [domain, namespace, owner, conversation_id], row_to_conversation)
                .optional()?)
        })
    }

    /// Returns false when `owner` has no such row.
    pub fn accept_conversation(
        &self,
        domain: &str,
        namespace: &str,
        owner: &str,
        conversation_id: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE conversations SET accepted = 1, read = 1
                 WHERE domain = ?1 AND namespace = ?2 AND first = ?3 AND conversation_id = ?4",
                [domain, namespace, owner, conversation_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Reading implies acceptance. Returns false when `owner` has no such row.
    pub fn mark_as_read(&self, domain: &str, namespace: &str, owner: &str, conversation_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE conversations SET read = 1, accepted = 1
                 WHERE domain = ?1 AND namespace = ?2 AND first = ?3 AND conversation_id = ?4",
                [domain, namespace, owner, conversation_id],
            )?;
            Ok(changed > 0)
        })
    }
}

/// A conversation id may only ever name one pair of participants.
fn thread_belongs_to(conn: &Connection, msg: &MessageRow) -> Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT first, second FROM conversations
         WHERE domain = ?1 AND namespace = ?2 AND conversation_id = ?3",
    )?;
    let pairs = stmt
        .query_map([&msg.domain, &msg.namespace, &msg.conversation_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(pairs.iter().all(|(first, second)| {
        (first == &msg.sender && second == &msg.recipient)
            || (first == &msg.recipient && second == &msg.sender)
    }))
}

fn query_domain_user(conn: &Connection, domain: &str, address: &str) -> Result<Option<DomainUserRow>> {
    let sql = format!(
        "SELECT {} FROM domain_users WHERE domain = ?1 AND user = ?2",
        DOMAIN_USER_COLUMNS
    );
    Ok(conn.query_row(&sql, [domain, address], row_to_domain_user).optional()?)
}

fn row_to_domain_user(row: &Row<'_>) -> rusqlite::Result<DomainUserRow> {
    Ok(DomainUserRow {
        user: row.get(0)?,
        domain: row.get(1)?,
        domain_username: row.get(2)?,
        public_key: row.get(3)?,
        signature: row.get(4)?,
        added: row.get(5)?,
        last_presence: row.get(6)?,
    })
}

fn row_to_conversation(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        domain: row.get(0)?,
        namespace: row.get(1)?,
        first: row.get(2)?,
        second: row.get(3)?,
        conversation_id: row.get(4)?,
        last_message: row.get(5)?,
        accepted: row.get(6)?,
        read: row.get(7)?,
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        domain: row.get(1)?,
        namespace: row.get(2)?,
        conversation_id: row.get(3)?,
        sender: row.get(4)?,
        sender_public_key: row.get(5)?,
        recipient: row.get(6)?,
        recipient_public_key: row.get(7)?,
        timestamp: row.get(8)?,
        message: row.get(9)?,
        kind: row.get(10)?,
        signature: row.get(11)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            address     TEXT PRIMARY KEY,
            name        TEXT,
            created     INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS domain_users (
            user             TEXT NOT NULL REFERENCES users(address),
            domain           TEXT NOT NULL,
            domain_username  TEXT,
            public_key       TEXT NOT NULL UNIQUE,
            signature        TEXT NOT NULL,
            added            INTEGER NOT NULL,
            last_presence    INTEGER NOT NULL,
            PRIMARY KEY (user, domain)
        );

        CREATE INDEX IF NOT EXISTS idx_domain_users_username
            ON domain_users(domain, domain_username);

        -- One row per participant per thread
        CREATE TABLE IF NOT EXISTS conversations (
            domain           TEXT NOT NULL,
            namespace        TEXT NOT NULL,
            first            TEXT NOT NULL,
            second           TEXT NOT NULL,
            conversation_id  TEXT NOT NULL,
            last_message     INTEGER NOT NULL,
            accepted         INTEGER NOT NULL DEFAULT 0,
            read             INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (domain, namespace, first, conversation_id)
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_thread
            ON conversations(domain, namespace, conversation_id);

        CREATE TABLE IF NOT EXISTS messages (
            id                    TEXT PRIMARY KEY,
            domain                TEXT NOT NULL,
            namespace             TEXT NOT NULL,
            conversation_id       TEXT NOT NULL,
            sender                TEXT NOT NULL,
            sender_public_key     TEXT NOT NULL,
            recipient             TEXT NOT NULL,
            recipient_public_key  TEXT,
            timestamp             INTEGER NOT NULL,
            message               TEXT NOT NULL,
            type                  TEXT NOT NULL CHECK (type IN ('clear', 'encrypted')),
            signature             TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_thread
            ON messages(domain, namespace, conversation_id, timestamp);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

pub fn drop_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS messages;
        DROP TABLE IF EXISTS conversations;
        DROP TABLE IF EXISTS domain_users;
        DROP TABLE IF EXISTS users;
        ",
    )?;
    Ok(())
}

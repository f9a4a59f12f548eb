use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS preferences (
            key         TEXT PRIMARY KEY,
            value       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS identities (
            uid             TEXT PRIMARY KEY,
            anonymous       INTEGER NOT NULL DEFAULT 1,
            created_at_ms   INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS channels (
            id                  TEXT PRIMARY KEY,
            name                TEXT NOT NULL CHECK (length(trim(name)) > 0),
            description         TEXT,
            created_by          TEXT,
            created_at_ms       INTEGER NOT NULL,
            last_message_text   TEXT,
            last_message_ms     INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_channels_activity
            ON channels(last_message_ms);

        -- seq records insertion order and breaks timestamp ties
        CREATE TABLE IF NOT EXISTS messages (
            seq             INTEGER PRIMARY KEY AUTOINCREMENT,
            id              TEXT NOT NULL UNIQUE,
            channel_id      TEXT NOT NULL REFERENCES channels(id),
            sender_id       TEXT NOT NULL,
            sender_name     TEXT NOT NULL,
            text            TEXT,
            image_url       TEXT,
            timestamp_ms    INTEGER NOT NULL,
            kind            TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_channel
            ON messages(channel_id, timestamp_ms, seq);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

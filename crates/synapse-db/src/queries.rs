use crate::models::{ChannelRow, IdentityRow, MessageRow};
use crate::Database;
use anyhow::{Result, bail};
use rusqlite::{Connection, Row};
use synapse_types::api::{Direction, OrderBy, SortField};

impl Database {
    // -- Preferences --

    pub fn get_preference(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM preferences WHERE key = ?1", [key], |row| row.get::<_, String>(0))
                .optional()
        })
    }

    /// Insert or overwrite a preference value.
    pub fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                (key, value),
            )?;
            Ok(())
        })
    }

    pub fn delete_preference(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM preferences WHERE key = ?1", [key])?;
            Ok(())
        })
    }

    // -- Identities --

    pub fn insert_identity(&self, row: &IdentityRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO identities (uid, anonymous, created_at_ms) VALUES (?1, ?2, ?3)",
                rusqlite::params![row.uid, row.anonymous, row.created_at_ms],
            )?;
            Ok(())
        })
    }

    pub fn get_identity(&self, uid: &str) -> Result<Option<IdentityRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT uid, anonymous, created_at_ms FROM identities WHERE uid = ?1",
                [uid],
                |row| {
                    Ok(IdentityRow {
                        uid: row.get(0)?,
                        anonymous: row.get(1)?,
                        created_at_ms: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Channels --

    pub fn insert_channel(&self, row: &ChannelRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO channels (id, name, description, created_by, created_at_ms, last_message_text, last_message_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    row.id,
                    row.name,
                    row.description,
                    row.created_by,
                    row.created_at_ms,
                    row.last_message_text,
                    row.last_message_ms,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_channel(&self, id: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, description, created_by, created_at_ms, last_message_text, last_message_ms
                 FROM channels WHERE id = ?1",
                [id],
                channel_from_row,
            )
            .optional()
        })
    }

    pub fn list_channels(&self, order: OrderBy) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| query_channels(conn, order))
    }

    /// Merge the last-message fields into a channel.
    /// Returns false when no channel has this id.
    pub fn update_channel_summary(&self, id: &str, text: &str, timestamp_ms: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE channels SET last_message_text = ?2, last_message_ms = ?3 WHERE id = ?1",
                rusqlite::params![id, text, timestamp_ms],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, row: &MessageRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, channel_id, sender_id, sender_name, text, image_url, timestamp_ms, kind)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    row.id,
                    row.channel_id,
                    row.sender_id,
                    row.sender_name,
                    row.text,
                    row.image_url,
                    row.timestamp_ms,
                    row.kind,
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_messages(&self, channel_id: &str, order: OrderBy) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, channel_id, order))
    }
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<ChannelRow> {
    Ok(ChannelRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_by: row.get(3)?,
        created_at_ms: row.get(4)?,
        last_message_text: row.get(5)?,
        last_message_ms: row.get(6)?,
    })
}

fn query_channels(conn: &Connection, order: OrderBy) -> Result<Vec<ChannelRow>> {
    let dir = sql_direction(order.direction);
    // Channels without activity always sort after the rest; rowid keeps ties in insertion order.
    let order_clause = match order.field {
        SortField::LastMessageTimestamp => {
            format!("last_message_ms IS NULL, last_message_ms {dir}, rowid ASC")
        }
        SortField::Timestamp => bail!("channels cannot be ordered by message timestamp"),
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, description, created_by, created_at_ms, last_message_text, last_message_ms
         FROM channels
         ORDER BY {order_clause}"
    ))?;

    let rows = stmt
        .query_map([], channel_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_messages(conn: &Connection, channel_id: &str, order: OrderBy) -> Result<Vec<MessageRow>> {
    let dir = sql_direction(order.direction);
    let order_clause = match order.field {
        SortField::Timestamp => format!("timestamp_ms {dir}, seq {dir}"),
        SortField::LastMessageTimestamp => bail!("messages cannot be ordered by channel activity"),
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT id, channel_id, sender_id, sender_name, text, image_url, timestamp_ms, kind
         FROM messages
         WHERE channel_id = ?1
         ORDER BY {order_clause}"
    ))?;

    let rows = stmt
        .query_map([channel_id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                channel_id: row.get(1)?,
                sender_id: row.get(2)?,
                sender_name: row.get(3)?,
                text: row.get(4)?,
                image_url: row.get(5)?,
                timestamp_ms: row.get(6)?,
                kind: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn sql_direction(direction: Direction) -> &'static str {
    match direction {
        Direction::Ascending => "ASC",
        Direction::Descending => "DESC",
    }
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

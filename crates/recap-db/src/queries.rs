use crate::Database;
use crate::models::{ChannelRow, MessageRow};
use anyhow::Result;
use recap_types::StoredMessage;
use rusqlite::Connection;

impl Database {
    // -- Monitored channels --

    /// Idempotent upsert. Returns true when the channel was newly added,
    /// false when only its display metadata was replaced.
    pub fn add_channel(
        &self,
        channel_id: &str,
        workspace_id: &str,
        display_name: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let existed: bool = conn
                .query_row(
                    "SELECT 1 FROM monitored_channels WHERE channel_id = ?1",
                    [channel_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();

            conn.execute(
                "INSERT INTO monitored_channels (channel_id, workspace_id, display_name)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(channel_id) DO UPDATE SET
                     workspace_id = excluded.workspace_id,
                     display_name = excluded.display_name",
                (channel_id, workspace_id, display_name),
            )?;

            Ok(!existed)
        })
    }

    /// Returns true when a row was actually deleted.
    pub fn remove_channel(&self, channel_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM monitored_channels WHERE channel_id = ?1",
                [channel_id],
            )?;
            Ok(deleted > 0)
        })
    }

    pub fn get_channel(&self, channel_id: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT channel_id, workspace_id, display_name, created_at
                 FROM monitored_channels WHERE channel_id = ?1",
                [channel_id],
                |row| {
                    Ok(ChannelRow {
                        channel_id: row.get(0)?,
                        workspace_id: row.get(1)?,
                        display_name: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn list_channels(&self, workspace_id: &str) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| query_channels(conn, workspace_id))
    }

    pub fn is_monitored(&self, channel_id: &str, workspace_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM monitored_channels
                     WHERE channel_id = ?1 AND workspace_id = ?2",
                    (channel_id, workspace_id),
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    // -- Messages --

    /// Append a message. Duplicate `message_id` is silently ignored so
    /// platform redelivery cannot produce a second row.
    pub fn insert_message(&self, msg: &StoredMessage) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO messages
                 (message_id, channel_id, author_name, author_id, content,
                  sent_at, date, attachments, embeds)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    msg.message_id,
                    msg.channel_id,
                    msg.author_name,
                    msg.author_id,
                    msg.content,
                    msg.sent_at.to_rfc3339(),
                    msg.date,
                    msg.attachment_count,
                    msg.embed_count,
                ],
            )?;
            Ok(())
        })
    }

    /// All messages for one channel on one date, ascending by `sent_at`.
    /// Ties fall back to rowid, i.e. insertion order, so the sort is stable.
    pub fn messages_for_date(&self, channel_id: &str, date: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages_for_date(conn, channel_id, date))
    }

    pub fn message_count_for_date(&self, channel_id: &str, date: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: u64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE channel_id = ?1 AND date = ?2",
                (channel_id, date),
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn query_channels(conn: &Connection, workspace_id: &str) -> Result<Vec<ChannelRow>> {
    let mut stmt = conn.prepare(
        "SELECT channel_id, workspace_id, display_name, created_at
         FROM monitored_channels
         WHERE workspace_id = ?1
         ORDER BY created_at ASC, channel_id ASC",
    )?;

    let rows = stmt
        .query_map([workspace_id], |row| {
            Ok(ChannelRow {
                channel_id: row.get(0)?,
                workspace_id: row.get(1)?,
                display_name: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_messages_for_date(
    conn: &Connection,
    channel_id: &str,
    date: &str,
) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT message_id, channel_id, author_name, author_id, content,
                sent_at, date, attachments, embeds
         FROM messages
         WHERE channel_id = ?1 AND date = ?2
         ORDER BY sent_at ASC, rowid ASC",
    )?;

    let rows = stmt
        .query_map((channel_id, date), |row| {
            Ok(MessageRow {
                message_id: row.get(0)?,
                channel_id: row.get(1)?,
                author_name: row.get(2)?,
                author_id: row.get(3)?,
                content: row.get(4)?,
                sent_at: row.get(5)?,
                date: row.get(6)?,
                attachments: row.get(7)?,
                embeds: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn msg(id: &str, channel: &str, secs: u32) -> StoredMessage {
        let sent_at = Utc.with_ymd_and_hms(2024, 6, 3, 9, 30, secs).unwrap();
        StoredMessage {
            message_id: id.to_string(),
            channel_id: channel.to_string(),
            author_name: "ada".to_string(),
            author_id: "u1".to_string(),
            content: format!("message {id}"),
            sent_at,
            date: StoredMessage::date_bucket(sent_at),
            attachment_count: 0,
            embed_count: 0,
        }
    }

    #[test]
    fn add_channel_reports_new_vs_replaced() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.add_channel("c1", "w1", "standup").unwrap());
        // Re-add replaces metadata only and is not "new"
        assert!(!db.add_channel("c1", "w1", "standup-renamed").unwrap());

        let rows = db.list_channels("w1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].display_name, "standup-renamed");
    }

    #[test]
    fn remove_channel_reports_deletion() {
        let db = Database::open_in_memory().unwrap();
        db.add_channel("c1", "w1", "standup").unwrap();
        assert!(db.remove_channel("c1").unwrap());
        assert!(!db.remove_channel("c1").unwrap());
        assert!(db.list_channels("w1").unwrap().is_empty());
    }

    #[test]
    fn is_monitored_scoped_to_workspace() {
        let db = Database::open_in_memory().unwrap();
        db.add_channel("c1", "w1", "standup").unwrap();
        assert!(db.is_monitored("c1", "w1").unwrap());
        assert!(!db.is_monitored("c1", "w2").unwrap());
        assert!(!db.is_monitored("c2", "w1").unwrap());
    }

    #[test]
    fn duplicate_message_id_is_ignored() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message(&msg("m1", "c1", 0)).unwrap();
        db.insert_message(&msg("m1", "c1", 5)).unwrap();

        let rows = db.messages_for_date("c1", "2024-06-03").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message_id, "m1");
    }

    #[test]
    fn messages_for_date_orders_and_filters() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message(&msg("m2", "c1", 20)).unwrap();
        db.insert_message(&msg("m1", "c1", 10)).unwrap();
        db.insert_message(&msg("m3", "c2", 15)).unwrap();

        let mut other_day = msg("m4", "c1", 0);
        other_day.sent_at = Utc.with_ymd_and_hms(2024, 6, 4, 9, 0, 0).unwrap();
        other_day.date = StoredMessage::date_bucket(other_day.sent_at);
        db.insert_message(&other_day).unwrap();

        let rows = db.messages_for_date("c1", "2024-06-03").unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.message_id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn ties_on_sent_at_keep_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message(&msg("first", "c1", 30)).unwrap();
        db.insert_message(&msg("second", "c1", 30)).unwrap();

        let rows = db.messages_for_date("c1", "2024-06-03").unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.message_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn message_count_for_date() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message(&msg("m1", "c1", 1)).unwrap();
        db.insert_message(&msg("m2", "c1", 2)).unwrap();
        assert_eq!(db.message_count_for_date("c1", "2024-06-03").unwrap(), 2);
        assert_eq!(db.message_count_for_date("c1", "2024-06-04").unwrap(), 0);
    }
}

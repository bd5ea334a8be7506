use chrono::{DateTime, NaiveDateTime, Utc};
use recap_types::StoredMessage;
use tracing::warn;

/// Database row types — these map directly to SQLite rows.
/// Distinct from recap-types domain models to keep the DB layer independent.

pub struct ChannelRow {
    pub channel_id: String,
    pub workspace_id: String,
    pub display_name: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub message_id: String,
    pub channel_id: String,
    pub author_name: String,
    pub author_id: String,
    pub content: String,
    pub sent_at: String,
    pub date: String,
    pub attachments: u32,
    pub embeds: u32,
}

impl MessageRow {
    pub fn into_message(self) -> StoredMessage {
        let sent_at = self
            .sent_at
            .parse::<DateTime<Utc>>()
            .or_else(|_| {
                // SQLite may hold timestamps as "YYYY-MM-DD HH:MM:SS" without
                // timezone. Parse as naive UTC and convert.
                NaiveDateTime::parse_from_str(&self.sent_at, "%Y-%m-%d %H:%M:%S")
                    .map(|ndt| ndt.and_utc())
            })
            .unwrap_or_else(|e| {
                warn!(
                    "Corrupt sent_at '{}' on message '{}': {}",
                    self.sent_at, self.message_id, e
                );
                DateTime::default()
            });

        StoredMessage {
            message_id: self.message_id,
            channel_id: self.channel_id,
            author_name: self.author_name,
            author_id: self.author_id,
            content: self.content,
            sent_at,
            date: self.date,
            attachment_count: self.attachments,
            embed_count: self.embeds,
        }
    }
}

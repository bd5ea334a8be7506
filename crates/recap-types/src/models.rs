use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A channel explicitly opted into message tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredChannel {
    pub channel_id: String,
    pub workspace_id: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// An observed channel message, append-only once stored.
///
/// `date` is the YYYY-MM-DD calendar day of `sent_at` in UTC. The bucket is
/// always derived in UTC so a near-midnight message lands on the same day
/// regardless of where the process runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub message_id: String,
    pub channel_id: String,
    pub author_name: String,
    pub author_id: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub date: String,
    pub attachment_count: u32,
    pub embed_count: u32,
}

impl StoredMessage {
    /// The UTC date bucket for a timestamp, as stored in the `date` column.
    pub fn date_bucket(sent_at: DateTime<Utc>) -> String {
        sent_at.format("%Y-%m-%d").to_string()
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A platform-agnostic inbound message event.
///
/// Adapters translate their platform's delivery payload into this shape;
/// the core decides whether it is stored (bot messages and messages for
/// unmonitored channels are dropped).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestEvent {
    pub message_id: String,
    pub channel_id: String,
    pub workspace_id: String,
    pub author_id: String,
    pub author_display_name: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub attachment_count: u32,
    #[serde(default)]
    pub embed_count: u32,
    #[serde(default)]
    pub is_bot: bool,
}

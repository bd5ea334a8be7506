//! Platform-agnostic tracking and summary core.
//!
//! [`Tracker`] is the single service instance the platform adapters talk to:
//! it owns the database and the summarizer, and exposes the ingestion path
//! plus the administrative and summary commands. Adapters only translate
//! payloads in and replies out.

pub mod chunk;
pub mod date;
pub mod error;
pub mod prompt;
pub mod transcript;

use std::sync::Arc;

use anyhow::anyhow;
use recap_db::Database;
use recap_llm::Summarizer;
use recap_types::{IngestEvent, StoredMessage};
use tracing::{debug, warn};

pub use error::SummaryError;

/// One entry of the `list-monitored` reply.
#[derive(Debug, Clone)]
pub struct ChannelStatus {
    pub channel_id: String,
    pub display_name: String,
    pub today_message_count: u64,
}

/// A completed summary, already chunked for platform message-size limits.
#[derive(Debug, Clone)]
pub struct SummaryReply {
    pub channel_name: String,
    pub date: String,
    pub message_count: usize,
    pub chunks: Vec<String>,
}

pub struct Tracker {
    db: Arc<Database>,
    summarizer: Arc<dyn Summarizer>,
    char_budget: usize,
}

impl Tracker {
    pub fn new(db: Arc<Database>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            db,
            summarizer,
            char_budget: transcript::DEFAULT_CHAR_BUDGET,
        }
    }

    #[cfg(test)]
    fn with_char_budget(mut self, budget: usize) -> Self {
        self.char_budget = budget;
        self
    }

    /// Ingestion path: bot messages and unmonitored channels are dropped,
    /// everything else becomes a durable row. Store failures are logged and
    /// the message dropped — a bad message never takes down the event stream,
    /// so this path has no error to return.
    pub async fn ingest(&self, event: IngestEvent) {
        if event.is_bot {
            return;
        }

        let message_id = event.message_id.clone();
        let channel_id = event.channel_id.clone();

        let db = self.db.clone();
        let result = tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
            if !db.is_monitored(&event.channel_id, &event.workspace_id)? {
                return Ok(false);
            }
            db.insert_message(&StoredMessage {
                date: StoredMessage::date_bucket(event.sent_at),
                message_id: event.message_id,
                channel_id: event.channel_id,
                author_name: event.author_display_name,
                author_id: event.author_id,
                content: event.content,
                sent_at: event.sent_at,
                attachment_count: event.attachment_count,
                embed_count: event.embed_count,
            })?;
            Ok(true)
        })
        .await;

        match result {
            Ok(Ok(true)) => debug!(%message_id, %channel_id, "message stored"),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => warn!(%message_id, %channel_id, "dropping message, store error: {e:#}"),
            Err(e) => warn!(%message_id, %channel_id, "dropping message, task error: {e}"),
        }
    }

    /// `start-monitoring`: idempotent upsert. Returns true when the channel
    /// was newly added, false when it was already monitored.
    pub async fn start_monitoring(
        &self,
        channel_id: &str,
        workspace_id: &str,
        display_name: &str,
    ) -> anyhow::Result<bool> {
        let db = self.db.clone();
        let (channel_id, workspace_id, display_name) = (
            channel_id.to_string(),
            workspace_id.to_string(),
            display_name.to_string(),
        );
        tokio::task::spawn_blocking(move || {
            db.add_channel(&channel_id, &workspace_id, &display_name)
        })
        .await
        .map_err(|e| anyhow!("task error: {e}"))?
    }

    /// `stop-monitoring`: no-op if absent. Returns true when a row was
    /// actually deleted. Already-stored history stays.
    pub async fn stop_monitoring(&self, channel_id: &str) -> anyhow::Result<bool> {
        let db = self.db.clone();
        let channel_id = channel_id.to_string();
        tokio::task::spawn_blocking(move || db.remove_channel(&channel_id))
            .await
            .map_err(|e| anyhow!("task error: {e}"))?
    }

    /// `list-monitored`: every monitored channel in the workspace with its
    /// message count for the current UTC day.
    pub async fn list_monitored(&self, workspace_id: &str) -> anyhow::Result<Vec<ChannelStatus>> {
        let db = self.db.clone();
        let workspace_id = workspace_id.to_string();
        let today = date::today();
        tokio::task::spawn_blocking(move || {
            let rows = db.list_channels(&workspace_id)?;
            rows.into_iter()
                .map(|row| {
                    let count = db.message_count_for_date(&row.channel_id, &today)?;
                    Ok(ChannelStatus {
                        channel_id: row.channel_id,
                        display_name: row.display_name,
                        today_message_count: count,
                    })
                })
                .collect()
        })
        .await
        .map_err(|e| anyhow!("task error: {e}"))?
    }

    /// The summary request pipeline: registry check, store query, transcript
    /// assembly, one best-effort summarizer call, chunked reply.
    pub async fn get_summary(
        &self,
        channel_id: &str,
        workspace_id: &str,
        date: Option<&str>,
    ) -> Result<SummaryReply, SummaryError> {
        // Date validation aborts before any store access.
        let date = date::resolve(date)?;

        let db = self.db.clone();
        let (cid, wid, date_q) = (
            channel_id.to_string(),
            workspace_id.to_string(),
            date.clone(),
        );
        let (channel_name, messages) = tokio::task::spawn_blocking(
            move || -> Result<(String, Vec<StoredMessage>), SummaryError> {
                // Registry gate first; the unmonitored path must not touch
                // the message store.
                let channel = db
                    .get_channel(&cid)?
                    .filter(|row| row.workspace_id == wid)
                    .ok_or(SummaryError::ChannelNotMonitored)?;

                let rows = db.messages_for_date(&cid, &date_q)?;
                let messages = rows.into_iter().map(|r| r.into_message()).collect();
                Ok((channel.display_name, messages))
            },
        )
        .await
        .map_err(|e| SummaryError::Store(anyhow!("task error: {e}")))??;

        if messages.is_empty() {
            // Terminal empty-result state; the summarizer is never invoked.
            return Err(SummaryError::NoMessagesFound);
        }

        let message_count = messages.len();
        let transcript = transcript::assemble(&messages, self.char_budget);
        let prompt = prompt::build(&channel_name, &date, &transcript);

        debug!(channel = %channel_id, %date, message_count, "requesting summary");

        let summary = self
            .summarizer
            .summarize(&prompt)
            .await
            .map_err(|e| SummaryError::SummarizerUnavailable(e.to_string()))?;

        Ok(SummaryReply {
            channel_name,
            date,
            message_count,
            chunks: chunk::chunk_reply(&summary),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use recap_llm::SummarizerError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockSummarizer {
        calls: AtomicUsize,
        reply: Result<String, String>,
    }

    impl MockSummarizer {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply: Ok(text.to_string()),
            })
        }

        fn failing(err: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply: Err(err.to_string()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Summarizer for MockSummarizer {
        async fn summarize(&self, _prompt: &str) -> Result<String, SummarizerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(SummarizerError::Transport(e.clone())),
            }
        }
    }

    fn tracker(summarizer: Arc<MockSummarizer>) -> Tracker {
        let db = Arc::new(Database::open_in_memory().unwrap());
        Tracker::new(db, summarizer)
    }

    fn event(id: &str, channel: &str, author: &str, minute: u32, content: &str) -> IngestEvent {
        IngestEvent {
            message_id: id.to_string(),
            channel_id: channel.to_string(),
            workspace_id: "w1".to_string(),
            author_id: format!("id-{author}"),
            author_display_name: author.to_string(),
            content: content.to_string(),
            sent_at: Utc.with_ymd_and_hms(2024, 6, 3, 9, minute, 0).unwrap(),
            attachment_count: 0,
            embed_count: 0,
            is_bot: false,
        }
    }

    #[tokio::test]
    async fn ingest_skips_bots_and_unmonitored_channels() {
        let mock = MockSummarizer::replying("ok");
        let t = tracker(mock);
        t.start_monitoring("c1", "w1", "standup").await.unwrap();

        let mut bot = event("m1", "c1", "robo", 1, "beep");
        bot.is_bot = true;
        t.ingest(bot).await;
        t.ingest(event("m2", "c9", "ada", 2, "wrong channel")).await;
        t.ingest(event("m3", "c1", "ada", 3, "kept")).await;

        let list = t.list_monitored("w1").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].today_message_count, 0); // events dated 2024-06-03, not today

        let reply = t
            .get_summary("c1", "w1", Some("2024-06-03"))
            .await
            .unwrap();
        assert_eq!(reply.message_count, 1);
    }

    #[tokio::test]
    async fn summary_for_unmonitored_channel_fails_without_summarizer_call() {
        let mock = MockSummarizer::replying("ok");
        let t = tracker(mock.clone());

        let err = t.get_summary("c1", "w1", None).await.unwrap_err();
        assert!(matches!(err, SummaryError::ChannelNotMonitored));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn summary_respects_workspace_scope() {
        let mock = MockSummarizer::replying("ok");
        let t = tracker(mock);
        t.start_monitoring("c1", "w1", "standup").await.unwrap();

        let err = t.get_summary("c1", "w2", None).await.unwrap_err();
        assert!(matches!(err, SummaryError::ChannelNotMonitored));
    }

    #[tokio::test]
    async fn summary_with_no_messages_short_circuits() {
        let mock = MockSummarizer::replying("ok");
        let t = tracker(mock.clone());
        t.start_monitoring("c1", "w1", "standup").await.unwrap();

        let err = t
            .get_summary("c1", "w1", Some("2024-06-03"))
            .await
            .unwrap_err();
        assert!(matches!(err, SummaryError::NoMessagesFound));
        assert_eq!(mock.calls(), 0, "summarizer must not be invoked");
    }

    #[tokio::test]
    async fn invalid_date_aborts_before_everything_else() {
        let mock = MockSummarizer::replying("ok");
        let t = tracker(mock.clone());

        for raw in ["2024-13-01", "not-a-date"] {
            let err = t.get_summary("c1", "w1", Some(raw)).await.unwrap_err();
            assert!(matches!(err, SummaryError::InvalidDateFormat(_)), "{raw}");
        }
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn successful_summary_is_chunked() {
        let mock = MockSummarizer::replying(&"s".repeat(2000));
        let t = tracker(mock.clone());
        t.start_monitoring("c1", "w1", "standup").await.unwrap();
        t.ingest(event("m1", "c1", "ada", 1, "shipped the thing"))
            .await;

        let reply = t
            .get_summary("c1", "w1", Some("2024-06-03"))
            .await
            .unwrap();
        assert_eq!(mock.calls(), 1);
        assert_eq!(reply.channel_name, "standup");
        assert_eq!(reply.date, "2024-06-03");
        assert_eq!(reply.chunks.len(), 2);
    }

    #[tokio::test]
    async fn summarizer_failure_surfaces_verbatim() {
        let mock = MockSummarizer::failing("quota exceeded");
        let t = tracker(mock.clone());
        t.start_monitoring("c1", "w1", "standup").await.unwrap();
        t.ingest(event("m1", "c1", "ada", 1, "hello")).await;

        let err = t
            .get_summary("c1", "w1", Some("2024-06-03"))
            .await
            .unwrap_err();
        match err {
            SummaryError::SummarizerUnavailable(msg) => {
                assert!(msg.contains("quota exceeded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(mock.calls(), 1, "exactly one best-effort call, no retry");
    }

    #[tokio::test]
    async fn redelivered_message_counts_once() {
        let mock = MockSummarizer::replying("ok");
        let t = tracker(mock);
        t.start_monitoring("c1", "w1", "standup").await.unwrap();
        t.ingest(event("m1", "c1", "ada", 1, "hello")).await;
        t.ingest(event("m1", "c1", "ada", 1, "hello")).await;

        let reply = t
            .get_summary("c1", "w1", Some("2024-06-03"))
            .await
            .unwrap();
        assert_eq!(reply.message_count, 1);
    }

    #[tokio::test]
    async fn tight_budget_still_summarizes_something() {
        let mock = MockSummarizer::replying("ok");
        let t = tracker(mock).with_char_budget(10);
        t.start_monitoring("c1", "w1", "standup").await.unwrap();
        t.ingest(event("m1", "c1", "ada", 1, "a long first message"))
            .await;

        let reply = t
            .get_summary("c1", "w1", Some("2024-06-03"))
            .await
            .unwrap();
        assert_eq!(reply.message_count, 1);
    }
}

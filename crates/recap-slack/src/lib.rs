//! Slack adapter: Events API ingestion and slash commands over HTTP.
//!
//! Thin by design — this crate only verifies request authenticity,
//! translates Slack payloads into core calls, and renders core replies as
//! Slack response JSON. All business logic lives in recap-core.

pub mod signature;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use chrono::DateTime;
use recap_core::{SummaryError, SummaryReply, Tracker};
use recap_types::IngestEvent;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct SlackState {
    pub tracker: Arc<Tracker>,
    pub signing_secret: String,
    http: reqwest::Client,
}

impl SlackState {
    pub fn new(tracker: Arc<Tracker>, signing_secret: String) -> Self {
        Self {
            tracker,
            signing_secret,
            http: reqwest::Client::new(),
        }
    }
}

pub fn router(state: SlackState) -> Router {
    Router::new()
        .route("/slack/events", post(events))
        .route("/slack/commands", post(commands))
        .with_state(state)
}

fn verify_request(state: &SlackState, headers: &HeaderMap, body: &[u8]) -> Result<(), StatusCode> {
    let timestamp = headers
        .get("x-slack-request-timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let sig = headers
        .get("x-slack-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !signature::verify(&state.signing_secret, timestamp, body, sig) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(())
}

// -- Events API --

async fn events(
    State(state): State<SlackState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, StatusCode> {
    verify_request(&state, &headers, &body)?;

    let payload: Value = serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?;

    match payload.get("type").and_then(Value::as_str) {
        Some("url_verification") => {
            let challenge = payload
                .get("challenge")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Ok(Json(json!({ "challenge": challenge })).into_response())
        }
        Some("event_callback") => {
            if let Some(event) = to_ingest_event(&payload) {
                state.tracker.ingest(event).await;
            }
            // Always 200: Slack retries on anything else and a bad message
            // must not stall the event stream.
            Ok(StatusCode::OK.into_response())
        }
        other => {
            debug!(kind = ?other, "ignoring slack payload");
            Ok(StatusCode::OK.into_response())
        }
    }
}

/// Translate an Events API `message` callback into the core event shape.
/// Subtyped messages (edits, joins, thread broadcasts) are skipped.
fn to_ingest_event(payload: &Value) -> Option<IngestEvent> {
    let event = payload.get("event")?;
    if event.get("type")?.as_str()? != "message" {
        return None;
    }
    if event.get("subtype").is_some() {
        return None;
    }

    let ts = event.get("ts")?.as_str()?;
    let channel_id = event.get("channel")?.as_str()?.to_string();
    let author_id = event.get("user")?.as_str()?.to_string();
    let workspace_id = payload
        .get("team_id")
        .or_else(|| event.get("team"))
        .and_then(Value::as_str)?
        .to_string();

    let secs = ts.split('.').next()?.parse::<i64>().ok()?;
    let sent_at = DateTime::from_timestamp(secs, 0)?;

    // Slack only carries the user id in the event; profile lookup belongs to
    // the platform client, so fall back to the id when no name is present.
    let author_display_name = event
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or(&author_id)
        .to_string();

    Some(IngestEvent {
        // ts is only unique within a channel; qualify it for the global key.
        message_id: format!("{channel_id}:{ts}"),
        channel_id,
        workspace_id,
        author_id,
        author_display_name,
        content: event
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        sent_at,
        attachment_count: event
            .get("files")
            .and_then(Value::as_array)
            .map(|f| f.len() as u32)
            .unwrap_or(0),
        embed_count: 0,
        is_bot: event.get("bot_id").is_some(),
    })
}

// -- Slash commands --

#[derive(Debug, Deserialize)]
struct SlashCommand {
    command: String,
    #[serde(default)]
    text: String,
    channel_id: String,
    team_id: String,
    #[serde(default)]
    channel_name: String,
    #[serde(default)]
    response_url: String,
}

async fn commands(
    State(state): State<SlackState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, StatusCode> {
    verify_request(&state, &headers, &body)?;

    let cmd: SlashCommand =
        serde_urlencoded::from_bytes(&body).map_err(|_| StatusCode::BAD_REQUEST)?;

    let reply = match cmd.command.as_str() {
        "/set_standup_channel" => set_standup_channel(&state, &cmd).await,
        "/remove_standup_channel" => remove_standup_channel(&state, &cmd).await,
        "/list_standup_channels" => list_standup_channels(&state, &cmd).await,
        "/ai_summary" => {
            // The summarizer call can far outlive Slack's 3-second ack
            // window; ack now and deliver through response_url.
            spawn_summary(state.clone(), cmd);
            return Ok(Json(json!({
                "response_type": "ephemeral",
                "text": "Working on it, your summary is on the way..."
            }))
            .into_response());
        }
        other => format!("Unknown command: {other}"),
    };

    Ok(Json(json!({ "response_type": "in_channel", "text": reply })).into_response())
}

async fn set_standup_channel(state: &SlackState, cmd: &SlashCommand) -> String {
    let display_name = if cmd.channel_name.is_empty() {
        cmd.channel_id.clone()
    } else {
        cmd.channel_name.clone()
    };

    match state
        .tracker
        .start_monitoring(&cmd.channel_id, &cmd.team_id, &display_name)
        .await
    {
        Ok(true) => format!(
            "📋 *Standup Channel Set!*\n\nNow monitoring messages in <#{}>\n\n\
             *What happens now:*\n\
             • All messages in this channel will be tracked\n\
             • Use `/ai_summary` to get AI-powered daily summaries\n\
             • Use `/remove_standup_channel` to stop monitoring",
            cmd.channel_id
        ),
        Ok(false) => "✅ This channel is already set as a standup channel!".to_string(),
        Err(e) => {
            warn!("start_monitoring failed: {e:#}");
            "Something went wrong saving the channel. Try again.".to_string()
        }
    }
}

async fn remove_standup_channel(state: &SlackState, cmd: &SlashCommand) -> String {
    match state.tracker.stop_monitoring(&cmd.channel_id).await {
        Ok(true) => "✅ Removed standup monitoring from this channel.".to_string(),
        Ok(false) => "This channel is not set as a standup channel.".to_string(),
        Err(e) => {
            warn!("stop_monitoring failed: {e:#}");
            "Something went wrong removing the channel. Try again.".to_string()
        }
    }
}

async fn list_standup_channels(state: &SlackState, cmd: &SlashCommand) -> String {
    match state.tracker.list_monitored(&cmd.team_id).await {
        Ok(channels) if channels.is_empty() => {
            "No standup channels configured. Use `/set_standup_channel` to add one.".to_string()
        }
        Ok(channels) => {
            let lines: Vec<String> = channels
                .iter()
                .map(|c| {
                    format!(
                        "• <#{}> ({} messages today)",
                        c.channel_id, c.today_message_count
                    )
                })
                .collect();
            format!(
                "📋 *Standup Channels*\n\nChannels currently being monitored:\n\n{}",
                lines.join("\n")
            )
        }
        Err(e) => {
            warn!("list_monitored failed: {e:#}");
            "Something went wrong listing channels. Try again.".to_string()
        }
    }
}

fn spawn_summary(state: SlackState, cmd: SlashCommand) {
    tokio::spawn(async move {
        let date_arg = cmd.text.split_whitespace().next().map(ToString::to_string);
        let result = state
            .tracker
            .get_summary(&cmd.channel_id, &cmd.team_id, date_arg.as_deref())
            .await;

        let text = match result {
            Ok(reply) => render_summary(&cmd.channel_id, &reply),
            Err(e) => error_reply(&e),
        };

        let payload = json!({ "response_type": "in_channel", "text": text });
        if let Err(e) = state.http.post(&cmd.response_url).json(&payload).send().await {
            warn!(channel = %cmd.channel_id, "failed to deliver summary reply: {e}");
        }
    });
}

fn render_summary(channel_id: &str, reply: &SummaryReply) -> String {
    format!(
        "🤖 *AI-Powered Daily Summary*\n\n*Date:* {}\n*Channel:* <#{}>\n*Messages Analyzed:* {}\n\n*Summary:*\n{}",
        reply.date,
        channel_id,
        reply.message_count,
        reply.chunks.join("\n")
    )
}

fn error_reply(err: &SummaryError) -> String {
    match err {
        SummaryError::ChannelNotMonitored => {
            "This channel is not set as a standup channel. Use `/set_standup_channel` first."
                .to_string()
        }
        SummaryError::InvalidDateFormat(_) => {
            "Invalid date format. Use YYYY-MM-DD format.".to_string()
        }
        SummaryError::NoMessagesFound => "No messages found for that date in this channel.".to_string(),
        SummaryError::SummarizerUnavailable(msg) => format!("Error generating AI summary: {msg}"),
        SummaryError::Store(e) => {
            warn!("summary store error: {e:#}");
            "Something went wrong fetching messages. Try again.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_event_translates() {
        let payload = json!({
            "type": "event_callback",
            "team_id": "T123",
            "event": {
                "type": "message",
                "channel": "C42",
                "user": "U7",
                "text": "shipped it",
                "ts": "1717406400.000200",
                "files": [{}, {}]
            }
        });

        let event = to_ingest_event(&payload).unwrap();
        assert_eq!(event.message_id, "C42:1717406400.000200");
        assert_eq!(event.channel_id, "C42");
        assert_eq!(event.workspace_id, "T123");
        assert_eq!(event.content, "shipped it");
        assert_eq!(event.attachment_count, 2);
        assert!(!event.is_bot);
        assert_eq!(event.sent_at.timestamp(), 1_717_406_400);
    }

    #[test]
    fn subtyped_and_bot_events_are_skipped_or_flagged() {
        let edited = json!({
            "type": "event_callback",
            "team_id": "T123",
            "event": {
                "type": "message",
                "subtype": "message_changed",
                "channel": "C42",
                "user": "U7",
                "ts": "1717406400.000200"
            }
        });
        assert!(to_ingest_event(&edited).is_none());

        let bot = json!({
            "type": "event_callback",
            "team_id": "T123",
            "event": {
                "type": "message",
                "channel": "C42",
                "user": "U7",
                "bot_id": "B1",
                "text": "beep",
                "ts": "1717406400.000200"
            }
        });
        assert!(to_ingest_event(&bot).unwrap().is_bot);
    }

    #[test]
    fn non_message_events_are_ignored() {
        let reaction = json!({
            "type": "event_callback",
            "team_id": "T123",
            "event": { "type": "reaction_added", "user": "U7" }
        });
        assert!(to_ingest_event(&reaction).is_none());
    }
}

//! Discord adapter: interactions webhook for slash commands, plus a
//! message-relay endpoint for ingestion.
//!
//! Gateway delivery and interaction signing sit with the platform client in
//! front of this service; this crate only translates payloads into core
//! calls and core replies into interaction responses.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::{DateTime, Utc};
use recap_core::{SummaryError, SummaryReply, Tracker};
use recap_types::IngestEvent;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

// Interaction types / response types from the Discord API.
const INTERACTION_PING: u64 = 1;
const INTERACTION_APPLICATION_COMMAND: u64 = 2;
const RESPONSE_PONG: u64 = 1;
const RESPONSE_CHANNEL_MESSAGE: u64 = 4;
const RESPONSE_DEFERRED_CHANNEL_MESSAGE: u64 = 5;

// Permission bitfield flag from the Discord API.
const MANAGE_CHANNELS: u64 = 1 << 4;

const API_BASE: &str = "https://discord.com/api/v10";

#[derive(Clone)]
pub struct DiscordState {
    pub tracker: Arc<Tracker>,
    http: reqwest::Client,
}

impl DiscordState {
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self {
            tracker,
            http: reqwest::Client::new(),
        }
    }
}

pub fn router(state: DiscordState) -> Router {
    Router::new()
        .route("/discord/interactions", post(interactions))
        .route("/discord/events", post(events))
        .with_state(state)
}

// -- Ingestion relay --

/// A relayed MESSAGE_CREATE payload, in Discord's own field names.
#[derive(Debug, Deserialize)]
struct MessageCreate {
    id: String,
    channel_id: String,
    guild_id: String,
    author: MessageAuthor,
    #[serde(default)]
    content: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    attachments: Vec<Value>,
    #[serde(default)]
    embeds: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct MessageAuthor {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default)]
    bot: bool,
}

async fn events(
    State(state): State<DiscordState>,
    Json(msg): Json<MessageCreate>,
) -> impl IntoResponse {
    let author_display_name = msg
        .author
        .global_name
        .clone()
        .unwrap_or_else(|| msg.author.username.clone());

    state
        .tracker
        .ingest(IngestEvent {
            message_id: msg.id,
            channel_id: msg.channel_id,
            workspace_id: msg.guild_id,
            author_id: msg.author.id,
            author_display_name,
            content: msg.content,
            sent_at: msg.timestamp,
            attachment_count: msg.attachments.len() as u32,
            embed_count: msg.embeds.len() as u32,
            is_bot: msg.author.bot,
        })
        .await;

    StatusCode::NO_CONTENT
}

// -- Interactions --

async fn interactions(
    State(state): State<DiscordState>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    match payload.get("type").and_then(Value::as_u64) {
        Some(INTERACTION_PING) => Ok(Json(json!({ "type": RESPONSE_PONG }))),
        Some(INTERACTION_APPLICATION_COMMAND) => handle_command(state, &payload).await,
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

async fn handle_command(state: DiscordState, payload: &Value) -> Result<Json<Value>, StatusCode> {
    let name = payload
        .pointer("/data/name")
        .and_then(Value::as_str)
        .ok_or(StatusCode::BAD_REQUEST)?;
    let channel_id = payload
        .get("channel_id")
        .and_then(Value::as_str)
        .ok_or(StatusCode::BAD_REQUEST)?
        .to_string();
    let guild_id = payload
        .get("guild_id")
        .and_then(Value::as_str)
        .ok_or(StatusCode::BAD_REQUEST)?
        .to_string();

    let content = match name {
        "set_standup_channel" if !has_manage_channels(payload) => {
            "You need 'Manage Channels' permission to set standup channels.".to_string()
        }
        "remove_standup_channel" if !has_manage_channels(payload) => {
            "You need 'Manage Channels' permission to modify standup channels.".to_string()
        }
        "set_standup_channel" => {
            let channel_name = payload
                .pointer("/channel/name")
                .and_then(Value::as_str)
                .unwrap_or(&channel_id);
            match state
                .tracker
                .start_monitoring(&channel_id, &guild_id, channel_name)
                .await
            {
                Ok(true) => format!(
                    "📋 **Standup Channel Set!**\nNow monitoring messages in <#{channel_id}>\n\
                     • All messages in this channel will be tracked\n\
                     • Use `/ai_summary` to get AI-powered daily summaries\n\
                     • Use `/remove_standup_channel` to stop monitoring"
                ),
                Ok(false) => "✅ This channel is already set as a standup channel!".to_string(),
                Err(e) => {
                    warn!("start_monitoring failed: {e:#}");
                    "Something went wrong saving the channel. Try again.".to_string()
                }
            }
        }
        "remove_standup_channel" => match state.tracker.stop_monitoring(&channel_id).await {
            Ok(true) => "✅ Removed standup monitoring from this channel.".to_string(),
            Ok(false) => "This channel is not set as a standup channel.".to_string(),
            Err(e) => {
                warn!("stop_monitoring failed: {e:#}");
                "Something went wrong removing the channel. Try again.".to_string()
            }
        },
        "list_standup_channels" => match state.tracker.list_monitored(&guild_id).await {
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
                    "📋 **Standup Channels**\nChannels currently being monitored:\n{}",
                    lines.join("\n")
                )
            }
            Err(e) => {
                warn!("list_monitored failed: {e:#}");
                "Something went wrong listing channels. Try again.".to_string()
            }
        },
        "ai_summary" => {
            // Summaries outlive the 3-second interaction window: defer now,
            // deliver through the interaction followup webhook.
            let target = summary_target(payload, &channel_id);
            spawn_summary(state, payload, target, guild_id);
            return Ok(Json(json!({ "type": RESPONSE_DEFERRED_CHANNEL_MESSAGE })));
        }
        other => format!("Unknown command: {other}"),
    };

    Ok(Json(json!({
        "type": RESPONSE_CHANNEL_MESSAGE,
        "data": { "content": content }
    })))
}

/// The channel a summary is requested for: the `channel` command option when
/// given, otherwise the channel the command was invoked in.
fn summary_target(payload: &Value, invoking_channel: &str) -> String {
    option_str(payload, "channel").unwrap_or_else(|| invoking_channel.to_string())
}

/// True when the invoking member's permission bitfield carries
/// Manage Channels. Missing member data (e.g. DMs) counts as denied.
fn has_manage_channels(payload: &Value) -> bool {
    payload
        .pointer("/member/permissions")
        .and_then(Value::as_str)
        .and_then(|bits| bits.parse::<u64>().ok())
        .is_some_and(|bits| bits & MANAGE_CHANNELS != 0)
}

fn option_str(payload: &Value, name: &str) -> Option<String> {
    payload
        .pointer("/data/options")?
        .as_array()?
        .iter()
        .find(|o| o.get("name").and_then(Value::as_str) == Some(name))?
        .get("value")?
        .as_str()
        .map(ToString::to_string)
}

fn spawn_summary(state: DiscordState, payload: &Value, channel_id: String, guild_id: String) {
    let date_arg = option_str(payload, "date");
    let application_id = payload
        .get("application_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let token = payload
        .get("token")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    tokio::spawn(async move {
        let result = state
            .tracker
            .get_summary(&channel_id, &guild_id, date_arg.as_deref())
            .await;

        let body = match result {
            Ok(reply) => summary_followup(&channel_id, &reply),
            Err(e) => json!({ "content": error_reply(&e) }),
        };

        let url = format!("{API_BASE}/webhooks/{application_id}/{token}");
        if let Err(e) = state.http.post(&url).json(&body).send().await {
            warn!(channel = %channel_id, "failed to deliver summary followup: {e}");
        }
    });
}

/// Embed with one field per summary chunk, as field values cap at 1024
/// characters.
fn summary_followup(channel_id: &str, reply: &SummaryReply) -> Value {
    let fields: Vec<Value> = reply
        .chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let name = if reply.chunks.len() > 1 {
                format!("Summary {}", i + 1)
            } else {
                "Summary".to_string()
            };
            json!({ "name": name, "value": chunk, "inline": false })
        })
        .collect();

    json!({
        "embeds": [{
            "title": "🤖 AI-Powered Daily Summary",
            "description": format!(
                "**Date:** {}\n**Channel:** <#{}>\n**Messages Analyzed:** {}",
                reply.date, channel_id, reply.message_count
            ),
            "fields": fields
        }]
    })
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

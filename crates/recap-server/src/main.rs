use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use recap_core::Tracker;
use recap_discord::DiscordState;
use recap_llm::GeminiClient;
use recap_slack::SlackState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recap=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("RECAP_DB_PATH").unwrap_or_else(|_| "standup_messages.db".into());
    let host = std::env::var("RECAP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("RECAP_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let gemini_api_key = std::env::var("GEMINI_API_KEY")
        .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY is not set"))?;
    let gemini_model = std::env::var("GEMINI_MODEL").ok();
    let slack_signing_secret = std::env::var("SLACK_SIGNING_SECRET")
        .map_err(|_| anyhow::anyhow!("SLACK_SIGNING_SECRET is not set"))?;

    // Init database
    let db = Arc::new(recap_db::Database::open(&PathBuf::from(&db_path))?);

    // One shared core service, injected into both adapters
    let summarizer = Arc::new(GeminiClient::new(gemini_api_key, gemini_model));
    let tracker = Arc::new(Tracker::new(db, summarizer));

    let app = Router::new()
        .merge(recap_slack::router(SlackState::new(
            tracker.clone(),
            slack_signing_secret,
        )))
        .merge(recap_discord::router(DiscordState::new(tracker)))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Recap server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

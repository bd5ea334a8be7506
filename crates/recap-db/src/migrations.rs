use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS monitored_channels (
            channel_id      TEXT PRIMARY KEY,
            workspace_id    TEXT NOT NULL,
            display_name    TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages (
            message_id      TEXT PRIMARY KEY,
            channel_id      TEXT NOT NULL,
            author_name     TEXT NOT NULL,
            author_id       TEXT NOT NULL,
            content         TEXT NOT NULL,
            sent_at         TEXT NOT NULL,
            date            TEXT NOT NULL,
            attachments     INTEGER NOT NULL DEFAULT 0,
            embeds          INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_messages_date_channel
            ON messages(date, channel_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

/// Everything a summary request can fail with. All variants are converted
/// to a one-line user-facing reply at the adapter boundary; none propagate
/// as an unhandled fault.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("channel is not monitored")]
    ChannelNotMonitored,

    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),

    /// A valid empty-result terminal state, not a fault — the requested day
    /// simply has no stored messages.
    #[error("no messages found")]
    NoMessagesFound,

    #[error("summarizer unavailable: {0}")]
    SummarizerUnavailable(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

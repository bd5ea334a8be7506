pub mod events;
pub mod models;

pub use events::IngestEvent;
pub use models::{MonitoredChannel, StoredMessage};

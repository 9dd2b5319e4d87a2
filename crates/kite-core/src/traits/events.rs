//! Event sink trait for the audit side channel.

use async_trait::async_trait;
use tracing::info;

use crate::events::DomainEvent;
use crate::result::AppResult;

/// Receives domain events after the primary operation has committed.
///
/// Publication is best effort: callers log and discard the error instead of
/// failing the operation that produced the event.
#[async_trait]
pub trait EventSink: Send + Sync + std::fmt::Debug + 'static {
    /// Deliver one event.
    async fn publish(&self, event: DomainEvent) -> AppResult<()>;
}

/// Sink that writes every event to the tracing log and nothing else.
#[derive(Debug, Clone, Default)]
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        let payload = serde_json::to_string(&event.payload)?;
        info!(
            event_id = %event.id,
            actor_id = ?event.actor_id,
            payload = %payload,
            "Domain event"
        );
        Ok(())
    }
}

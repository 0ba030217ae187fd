//! Catalog events and the broadcast event bus.
//!
//! The orchestrator emits an event after each cataloged item and after each
//! stored embedding set. Downstream consumers (SSE, webhooks, search index
//! refreshers) subscribe independently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ContentType;

/// Versioned wrapper around a [`CatalogEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    /// Namespaced event type (e.g., `"content.cataloged"`).
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub payload: CatalogEvent,
}

impl EventEnvelope {
    pub fn new(payload: CatalogEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: payload.namespaced_event_type().to_string(),
            occurred_at: Utc::now(),
            payload,
        }
    }
}

/// Domain events produced by the cataloging pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum CatalogEvent {
    /// Tags were stored for a content item.
    ContentCataloged {
        content_id: String,
        content_type: ContentType,
        term_ids: Vec<Uuid>,
        embedding_generated: bool,
    },
    /// Chunk embeddings were stored for a content item.
    EmbeddingGenerated {
        content_id: String,
        content_type: ContentType,
        chunk_count: usize,
    },
}

impl CatalogEvent {
    pub fn namespaced_event_type(&self) -> &'static str {
        match self {
            CatalogEvent::ContentCataloged { .. } => "content.cataloged",
            CatalogEvent::EmbeddingGenerated { .. } => "embedding.generated",
        }
    }

    pub fn content_id(&self) -> &str {
        match self {
            CatalogEvent::ContentCataloged { content_id, .. }
            | CatalogEvent::EmbeddingGenerated { content_id, .. } => content_id,
        }
    }
}

/// Broadcast bus for [`CatalogEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: CatalogEvent) {
        let envelope = EventEnvelope::new(event);
        let subscriber_count = self.tx.receiver_count();
        tracing::debug!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count,
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}

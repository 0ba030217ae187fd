//! # tessera-core
//!
//! Core types, traits, and abstractions for the tessera cataloging pipeline.
//!
//! This crate provides the foundational data structures and the collaborator
//! traits (inference backends, vocabulary/metadata/vector/content
//! repositories) that the other tessera crates depend on.
//!
//! ## Logging
//!
//! Every crate logs through `tracing` with the same structured fields:
//! `subsystem` ("api", "catalog", "db", "inference"), `component`, `op`,
//! then entity fields such as `content_id` and `content_type`, and
//! measurements such as `duration_ms`, `chunk_count` and `result_count`.
//! Calls over their slow threshold add `slow = true`.
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, best-effort stage skipped |
//! | INFO  | Lifecycle events, pipeline completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (individual matches, chunks) |

pub mod defaults;
pub mod error;
pub mod events;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{CatalogEvent, EventBus, EventEnvelope};
pub use models::*;
pub use traits::*;

/// Vector type used for embeddings (pgvector compatible).
pub use pgvector::Vector;

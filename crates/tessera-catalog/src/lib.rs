//! # tessera-catalog
//!
//! The content cataloging and semantic indexing pipeline.
//!
//! This crate provides:
//! - LLM concept extraction with fail-soft response parsing
//! - Tiered concept → vocabulary term matching
//! - In-memory vocabulary hierarchy expansion
//! - Tag persistence and hierarchy-aware tag filtering
//! - Sentence-aware text chunking with exact source offsets
//! - Embedding generation, storage, and similarity search
//! - The orchestrator that runs the four-stage `categorize()` pipeline
//! - In-memory repositories for tests and embedded use
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tessera_catalog::{CatalogConfig, CatalogOrchestrator};
//!
//! let orchestrator = CatalogOrchestrator::from_parts(
//!     generation, embedding, vocabulary, metadata, vectors, content,
//!     CatalogConfig::default(),
//! );
//! let result = orchestrator
//!     .categorize("blob-1", "Hope carries us through loss.", ContentType::ThoughtBlob, None)
//!     .await?;
//! ```

pub mod chunker;
pub mod config;
pub mod embedding;
pub mod extractor;
pub mod hierarchy;
pub mod matcher;
pub mod memory;
pub mod metadata;
pub mod orchestrator;

pub use chunker::chunk_text;
pub use config::CatalogConfig;
pub use embedding::EmbeddingPipeline;
pub use extractor::{parse_concepts, LlmConceptExtractor};
pub use hierarchy::VocabularyTree;
pub use matcher::{match_against, VocabularyMatcher};
pub use metadata::MetadataStore;
pub use orchestrator::CatalogOrchestrator;

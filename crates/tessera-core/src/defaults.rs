//! Default values shared across tessera crates.
//!
//! Crates reference these constants instead of repeating literals, so a
//! tuning change happens in exactly one place.

// =============================================================================
// CHUNKING
// =============================================================================

/// Default token budget per chunk.
pub const CHUNK_MAX_TOKENS: usize = 1000;

/// Characters per token used by the chunk budget heuristic.
pub const CHARS_PER_TOKEN: usize = 4;

// =============================================================================
// EMBEDDINGS
// =============================================================================

/// Default embedding model.
pub const EMBED_MODEL: &str = "text-embedding-3-small";

/// Embedding dimension of the default model.
pub const EMBED_DIMENSION: usize = 1536;

// =============================================================================
// GENERATION
// =============================================================================

/// Default generation model used for concept extraction.
pub const GEN_MODEL: &str = "gpt-4o-mini";

/// Default OpenAI-compatible endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// HTTP timeout for inference requests (seconds).
pub const INFERENCE_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// MATCHING
// =============================================================================

/// Confidence for a case-insensitive match on the term text.
pub const CONFIDENCE_EXACT: f32 = 0.95;

/// Confidence for a case-insensitive match on a synonym.
pub const CONFIDENCE_SYNONYM: f32 = 0.85;

/// Confidence for substring containment in either direction.
pub const CONFIDENCE_PARENT: f32 = 0.70;

// =============================================================================
// SEARCH
// =============================================================================

/// Minimum cosine similarity for a search hit.
pub const SEARCH_THRESHOLD: f32 = 0.7;

/// Maximum number of search hits.
pub const SEARCH_LIMIT: i64 = 10;

/// Candidate pool for a search that is then narrowed by a tag filter.
pub const TAGGED_SEARCH_LIMIT: i64 = 50;

// =============================================================================
// PIPELINE
// =============================================================================

/// Concurrent pipelines in a batch categorize call.
pub const BATCH_CONCURRENCY: usize = 4;

/// Broadcast buffer for catalog events.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP port for the API binary.
pub const SERVER_PORT: u16 = 3000;

//! Core traits for tessera collaborators.
//!
//! The cataloging pipeline depends only on these abstractions, so the
//! persistence and inference layers can be swapped for fakes in tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    CatalogTerm, ContentItem, ContentMetadataRecord, ContentType, EmbeddingChunk, Result,
    SearchSimilarRequest, SimilarContent, Vector, VocabularySet, VocabularyTerm,
};

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for generating text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a batch of texts. Output order matches input order.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Embedding vector dimension.
    fn dimension(&self) -> usize;

    /// Model name.
    fn model_name(&self) -> &str;
}

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a response for a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with a system prompt.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Model name.
    fn model_name(&self) -> &str;
}

/// Combined inference backend.
#[async_trait]
pub trait InferenceBackend: EmbeddingBackend + GenerationBackend {
    /// Check if the backend is reachable.
    async fn health_check(&self) -> Result<bool>;
}

/// Turns free text into candidate concept strings.
#[async_trait]
pub trait ConceptExtractor: Send + Sync {
    /// Extract 3-5 concepts. Malformed model output yields an empty list.
    async fn extract_concepts(&self, text: &str) -> Result<Vec<String>>;
}

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

/// Read access to the controlled vocabulary.
#[async_trait]
pub trait VocabularyRepository: Send + Sync {
    /// All terms, optionally scoped to one vocabulary set.
    async fn list_terms(&self, vocabulary_set_id: Option<Uuid>) -> Result<Vec<VocabularyTerm>>;

    /// All vocabulary sets.
    async fn list_sets(&self) -> Result<Vec<VocabularySet>>;

    /// Number of terms across all sets.
    async fn count_terms(&self) -> Result<i64>;
}

/// Storage for content ↔ term tags.
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// Insert records as one atomic batch, skipping existing
    /// `(content_id, vocabulary_term_id)` pairs. Returns rows inserted.
    async fn insert_batch(&self, records: &[ContentMetadataRecord]) -> Result<u64>;

    /// Atomically replace every tag of `content_id` with `records`.
    async fn replace_for_content(
        &self,
        content_id: &str,
        records: &[ContentMetadataRecord],
    ) -> Result<()>;

    /// Distinct content ids tagged with any of `term_ids`, sorted.
    async fn content_ids_for_terms(&self, term_ids: &[Uuid]) -> Result<Vec<String>>;

    /// Tags stored for one content item, highest confidence first.
    async fn terms_for_content(&self, content_id: &str) -> Result<Vec<CatalogTerm>>;
}

/// Storage and nearest-neighbour search for chunk embeddings.
#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Upsert chunks keyed by chunk id, removing stale indices of the
    /// same content in the same transaction.
    async fn upsert_chunks(
        &self,
        content_id: &str,
        content_type: ContentType,
        chunks: &[EmbeddingChunk],
    ) -> Result<()>;

    /// Cosine similarity search.
    async fn search(&self, req: &SearchSimilarRequest) -> Result<Vec<SimilarContent>>;

    /// Stored chunks of one content item, ordered by index.
    async fn list_for_content(&self, content_id: &str) -> Result<Vec<EmbeddingChunk>>;

    /// Remove all chunks of `content_id`. Returns rows deleted.
    async fn delete_for_content(&self, content_id: &str) -> Result<u64>;
}

/// Read access to the external content store.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetch current content text. Returns `Error::NotFound` when absent.
    async fn fetch(&self, content_id: &str) -> Result<ContentItem>;
}

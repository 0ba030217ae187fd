//! The cataloging pipeline.
//!
//! `categorize` runs four ordered stages for one content item:
//!
//! 1. extract concepts (fatal, `Error::Extraction`)
//! 2. match concepts to vocabulary terms (fatal, `Error::Matching`)
//! 3. store tags (fatal, `Error::Persistence`)
//! 4. chunk, embed and store vectors (best effort)
//!
//! A failure in stage 4 is logged at WARN and reported only through
//! `CatalogResult::embedding_generated`. Stage 3 is one idempotent batch,
//! so a caller may simply retry a failed call.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use tessera_core::{
    CatalogEvent, CatalogResult, CatalogTerm, ConceptExtractor, ContentItem, ContentRepository,
    ContentType, EmbeddingBackend, Error, EventBus, GenerationBackend, MetadataRepository,
    Result, VectorRepository, VocabularyRepository,
};

use crate::config::CatalogConfig;
use crate::embedding::EmbeddingPipeline;
use crate::extractor::LlmConceptExtractor;
use crate::matcher::{dedupe_by_term, VocabularyMatcher};
use crate::metadata::MetadataStore;

/// How stage 3 writes tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagWrite {
    /// Add to existing tags, skipping duplicates.
    Append,
    /// Replace the content's tag set.
    Replace,
}

/// Runs the extraction → matching → tagging → embedding pipeline.
#[derive(Clone)]
pub struct CatalogOrchestrator {
    extractor: Arc<dyn ConceptExtractor>,
    matcher: VocabularyMatcher,
    metadata: MetadataStore,
    pipeline: EmbeddingPipeline,
    content: Arc<dyn ContentRepository>,
    events: Option<EventBus>,
}

impl CatalogOrchestrator {
    pub fn new(
        extractor: Arc<dyn ConceptExtractor>,
        matcher: VocabularyMatcher,
        metadata: MetadataStore,
        pipeline: EmbeddingPipeline,
        content: Arc<dyn ContentRepository>,
    ) -> Self {
        Self {
            extractor,
            matcher,
            metadata,
            pipeline,
            content,
            events: None,
        }
    }

    /// Wire the standard components from raw collaborators.
    pub fn from_parts(
        generation: Arc<dyn GenerationBackend>,
        embedding: Arc<dyn EmbeddingBackend>,
        vocabulary: Arc<dyn VocabularyRepository>,
        metadata: Arc<dyn MetadataRepository>,
        vectors: Arc<dyn VectorRepository>,
        content: Arc<dyn ContentRepository>,
        config: CatalogConfig,
    ) -> Self {
        Self::new(
            Arc::new(LlmConceptExtractor::new(generation)),
            VocabularyMatcher::new(vocabulary.clone()),
            MetadataStore::new(metadata, vocabulary),
            EmbeddingPipeline::new(embedding, vectors, content.clone(), config),
            content,
        )
    }

    /// Publish pipeline events on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.pipeline = self.pipeline.with_event_bus(bus.clone());
        self.events = Some(bus);
        self
    }

    pub fn matcher(&self) -> &VocabularyMatcher {
        &self.matcher
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn pipeline(&self) -> &EmbeddingPipeline {
        &self.pipeline
    }

    /// Catalog one content item.
    #[instrument(
        skip(self, content, content_type),
        fields(subsystem = "catalog", component = "orchestrator", op = "categorize", content_type = %content_type)
    )]
    pub async fn categorize(
        &self,
        content_id: &str,
        content: &str,
        content_type: ContentType,
        vocabulary_set_id: Option<Uuid>,
    ) -> Result<CatalogResult> {
        self.run(
            content_id,
            content,
            content_type,
            vocabulary_set_id,
            TagWrite::Append,
        )
        .await
    }

    /// Re-run the pipeline on the stored text of `content_id`, replacing
    /// its tags and embeddings.
    #[instrument(
        skip(self),
        fields(subsystem = "catalog", component = "orchestrator", op = "recatalog")
    )]
    pub async fn recatalog(
        &self,
        content_id: &str,
        vocabulary_set_id: Option<Uuid>,
    ) -> Result<CatalogResult> {
        let item = self.content.fetch(content_id).await?;
        self.run(
            &item.content_id,
            &item.text,
            item.content_type,
            vocabulary_set_id,
            TagWrite::Replace,
        )
        .await
    }

    /// Catalog many items with at most `concurrency` pipelines in flight,
    /// defaulting to the configured `batch_concurrency`.
    ///
    /// Returns one result per item, in input order. A failed item does not
    /// affect the others.
    pub async fn categorize_batch(
        &self,
        items: Vec<ContentItem>,
        vocabulary_set_id: Option<Uuid>,
        concurrency: Option<usize>,
    ) -> Vec<Result<CatalogResult>> {
        let start = Instant::now();
        let total = items.len();
        let concurrency = concurrency
            .unwrap_or(self.pipeline.config().batch_concurrency)
            .max(1);

        let mut results: Vec<(usize, Result<CatalogResult>)> =
            stream::iter(items.into_iter().enumerate())
                .map(|(index, item)| async move {
                    let result = self
                        .categorize(
                            &item.content_id,
                            &item.text,
                            item.content_type,
                            vocabulary_set_id,
                        )
                        .await;
                    (index, result)
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;
        results.sort_by_key(|(index, _)| *index);

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        info!(
            subsystem = "catalog",
            component = "orchestrator",
            op = "categorize_batch",
            input_count = total,
            concurrency,
            failed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch cataloged"
        );

        results.into_iter().map(|(_, r)| r).collect()
    }

    async fn run(
        &self,
        content_id: &str,
        content: &str,
        content_type: ContentType,
        vocabulary_set_id: Option<Uuid>,
        write: TagWrite,
    ) -> Result<CatalogResult> {
        if content_id.trim().is_empty() {
            return Err(Error::InvalidInput("content_id must not be empty".to_string()));
        }
        let start = Instant::now();

        // Stage 1
        let concepts = self
            .extractor
            .extract_concepts(content)
            .await
            .map_err(|e| e.into_extraction())?;
        debug!(content_id, concept_count = concepts.len(), "Stage 1 complete");

        // Stage 2
        let matches = dedupe_by_term(
            self.matcher
                .match_concepts(&concepts, vocabulary_set_id)
                .await?,
        );
        debug!(content_id, match_count = matches.len(), "Stage 2 complete");

        // Stage 3
        match write {
            TagWrite::Append => {
                self.metadata
                    .store_metadata(content_id, content_type, &matches)
                    .await?;
            }
            TagWrite::Replace => {
                self.metadata
                    .replace_metadata(content_id, content_type, &matches)
                    .await?;
            }
        }

        // Stage 4
        let embedding_generated = match self
            .pipeline
            .process_content(content_id, content_type, content)
            .await
        {
            Ok(chunk_count) => {
                debug!(content_id, chunk_count, "Stage 4 complete");
                true
            }
            Err(e) => {
                warn!(
                    content_id,
                    content_type = %content_type,
                    op = "generate_embedding",
                    error = %e,
                    "Embedding generation failed, continuing without embedding"
                );
                false
            }
        };

        let terms: Vec<CatalogTerm> = matches.iter().map(CatalogTerm::from).collect();

        if let Some(bus) = &self.events {
            bus.emit(CatalogEvent::ContentCataloged {
                content_id: content_id.to_string(),
                content_type,
                term_ids: terms.iter().map(|t| t.term_id).collect(),
                embedding_generated,
            });
        }

        info!(
            content_id,
            result_count = terms.len(),
            embedding_generated,
            duration_ms = start.elapsed().as_millis() as u64,
            "Content cataloged"
        );

        Ok(CatalogResult {
            content_id: content_id.to_string(),
            terms,
            embedding_generated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        InMemoryContentRepository, InMemoryMetadataRepository, InMemoryVectorRepository,
        InMemoryVocabularyRepository,
    };
    use tessera_inference::mock::MockInferenceBackend;

    struct Fixture {
        vocab: Arc<InMemoryVocabularyRepository>,
        metadata: Arc<InMemoryMetadataRepository>,
        vectors: Arc<InMemoryVectorRepository>,
        orchestrator: CatalogOrchestrator,
    }

    fn fixture(backend: MockInferenceBackend) -> Fixture {
        fixture_with(backend, CatalogConfig::default())
    }

    fn fixture_with(backend: MockInferenceBackend, config: CatalogConfig) -> Fixture {
        let backend = Arc::new(backend);
        let vocab = Arc::new(InMemoryVocabularyRepository::new());
        let metadata = Arc::new(InMemoryMetadataRepository::new(vocab.clone()));
        let vectors = Arc::new(InMemoryVectorRepository::new());
        let content = Arc::new(InMemoryContentRepository::new());

        let set = vocab.insert_set("emotions");
        vocab.insert_term(set, "hope", None, &[]);
        vocab.insert_term(set, "grief", None, &["loss"]);

        let orchestrator = CatalogOrchestrator::from_parts(
            backend.clone(),
            backend,
            vocab.clone(),
            metadata.clone(),
            vectors.clone(),
            content,
            config,
        );
        Fixture {
            vocab,
            metadata,
            vectors,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn test_categorize_happy_path() {
        let f = fixture(MockInferenceBackend::new().with_fixed_response(r#"["hope", "loss", "tax"]"#));

        let result = f
            .orchestrator
            .categorize("c1", "Hope after loss.", ContentType::ThoughtBlob, None)
            .await
            .unwrap();

        assert_eq!(result.content_id, "c1");
        assert_eq!(result.terms.len(), 2);
        assert!(result.embedding_generated);
        assert_eq!(f.metadata.records().len(), 2);
        assert_eq!(f.vectors.chunk_count(), 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_non_fatal() {
        let f = fixture(
            MockInferenceBackend::new()
                .with_fixed_response(r#"["hope"]"#)
                .with_failing_embeddings(),
        );

        let result = f
            .orchestrator
            .categorize("c1", "Hope.", ContentType::ThoughtBlob, None)
            .await
            .unwrap();

        assert!(!result.embedding_generated);
        assert!(!result.terms.is_empty());
        assert_eq!(f.metadata.records().len(), 1);
    }

    #[tokio::test]
    async fn test_extraction_failure_is_fatal() {
        let f = fixture(MockInferenceBackend::new().with_failing_generation());

        let err = f
            .orchestrator
            .categorize("c1", "Hope.", ContentType::ThoughtBlob, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert!(err.is_fatal_stage());
        assert_eq!(f.vectors.chunk_count(), 0);
    }

    #[tokio::test]
    async fn test_matching_failure_is_fatal() {
        let f = fixture(MockInferenceBackend::new().with_fixed_response(r#"["hope"]"#));
        f.vocab.set_unavailable(true);

        let err = f
            .orchestrator
            .categorize("c1", "Hope.", ContentType::ThoughtBlob, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Matching(_)));
    }

    #[tokio::test]
    async fn test_persistence_failure_is_fatal_and_skips_embedding() {
        let f = fixture(MockInferenceBackend::new().with_fixed_response(r#"["hope"]"#));
        f.metadata.set_fail_writes(true);

        let err = f
            .orchestrator
            .categorize("c1", "Hope.", ContentType::ThoughtBlob, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert_eq!(f.vectors.chunk_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_content_id_rejected() {
        let f = fixture(MockInferenceBackend::new());
        let err = f
            .orchestrator
            .categorize("  ", "Hope.", ContentType::ThoughtBlob, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_duplicate_concepts_collapse_to_one_tag() {
        let f = fixture(MockInferenceBackend::new().with_fixed_response(r#"["loss", "grief"]"#));

        let result = f
            .orchestrator
            .categorize("c1", "Grief.", ContentType::ThoughtBlob, None)
            .await
            .unwrap();

        assert_eq!(result.terms.len(), 1);
        assert_eq!(result.terms[0].confidence, 0.95);
    }

    #[tokio::test]
    async fn test_empty_text_reports_no_embedding_and_keeps_vectors() {
        let f = fixture(MockInferenceBackend::new().with_fixed_response(r#"["hope"]"#));
        f.orchestrator
            .categorize("c1", "Hope is light.", ContentType::ThoughtBlob, None)
            .await
            .unwrap();
        assert_eq!(f.vectors.chunk_count(), 1);

        let result = f
            .orchestrator
            .categorize("c1", "", ContentType::ThoughtBlob, None)
            .await
            .unwrap();

        assert!(!result.embedding_generated);
        assert_eq!(f.vectors.chunk_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_defaults_to_configured_concurrency() {
        let f = fixture_with(
            MockInferenceBackend::new()
                .with_fixed_response(r#"["hope"]"#)
                .with_latency_ms(20),
            CatalogConfig {
                batch_concurrency: 1,
                ..Default::default()
            },
        );
        let items: Vec<ContentItem> = (0..3)
            .map(|i| ContentItem {
                content_id: format!("c{}", i),
                text: "Hope.".to_string(),
                content_type: ContentType::ThoughtBlob,
            })
            .collect();

        let start = Instant::now();
        let results = f.orchestrator.categorize_batch(items, None, None).await;

        // One generate and one embed call per item, run one item at a time
        assert!(start.elapsed().as_millis() >= 120);
        assert!(results.iter().all(|r| r.is_ok()));
    }
}

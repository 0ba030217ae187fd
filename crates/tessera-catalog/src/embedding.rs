//! Embedding generation, storage, and similarity search.
//!
//! `process_content` is the write path: chunk the text, embed every chunk in
//! one backend call, and upsert the chunk rows. Storage is keyed by
//! `{content_id}_{chunk_index}`, so re-running on unchanged text converges
//! to the same chunk set.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use tessera_core::{
    CatalogEvent, ContentRepository, ContentType, EmbeddingBackend, EmbeddingChunk, Error,
    EventBus, Result, SearchSimilarRequest, SimilarContent, TextChunk, Vector, VectorRepository,
};

use crate::chunker::chunk_text;
use crate::config::CatalogConfig;

/// Embedding calls slower than this log a WARN.
const SLOW_EMBED_MS: u64 = 5_000;

#[derive(Clone)]
pub struct EmbeddingPipeline {
    backend: Arc<dyn EmbeddingBackend>,
    vectors: Arc<dyn VectorRepository>,
    content: Arc<dyn ContentRepository>,
    config: CatalogConfig,
    events: Option<EventBus>,
}

impl EmbeddingPipeline {
    pub fn new(
        backend: Arc<dyn EmbeddingBackend>,
        vectors: Arc<dyn VectorRepository>,
        content: Arc<dyn ContentRepository>,
        config: CatalogConfig,
    ) -> Self {
        Self {
            backend,
            vectors,
            content,
            config,
            events: None,
        }
    }

    /// Emit `EmbeddingGenerated` on `bus` after each successful store.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Embed a single text.
    pub async fn generate_embedding(&self, text: &str) -> Result<Vector> {
        let mut vectors = self.generate_embeddings(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("Backend returned no embedding".to_string()))
    }

    /// Embed a batch of texts with one backend call.
    ///
    /// The result has one vector per input, in input order, each of the
    /// backend's declared dimension.
    #[instrument(
        skip(self, texts),
        fields(subsystem = "catalog", component = "embedding", op = "generate_embeddings", input_count = texts.len())
    )]
    pub async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let vectors = self
            .backend
            .embed_texts(texts)
            .await
            .map_err(|e| e.into_embedding())?;

        if vectors.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        let expected = self.backend.dimension();
        if let Some((i, v)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.as_slice().len() != expected)
        {
            return Err(Error::Embedding(format!(
                "Embedding {} has dimension {}, expected {}",
                i,
                v.as_slice().len(),
                expected
            )));
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        if duration_ms > SLOW_EMBED_MS {
            warn!(
                model = self.backend.model_name(),
                duration_ms,
                slow = true,
                "Slow embedding batch"
            );
        } else {
            debug!(model = self.backend.model_name(), duration_ms, "Embeddings generated");
        }
        Ok(vectors)
    }

    /// Persist chunks for `content_id`, replacing any previous chunk set.
    pub async fn store_embedding(
        &self,
        content_id: &str,
        content_type: ContentType,
        chunks: &[EmbeddingChunk],
    ) -> Result<()> {
        self.vectors
            .upsert_chunks(content_id, content_type, chunks)
            .await
    }

    /// Nearest-neighbour search over stored chunks.
    #[instrument(
        skip(self, req),
        fields(subsystem = "catalog", component = "embedding", op = "search_similar", threshold = req.threshold, limit = req.limit)
    )]
    pub async fn search_similar(&self, req: &SearchSimilarRequest) -> Result<Vec<SimilarContent>> {
        let start = Instant::now();
        let hits = self.vectors.search(req).await?;
        debug!(
            result_count = hits.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Similarity search complete"
        );
        Ok(hits)
    }

    /// Embed `query` and search with the configured threshold.
    ///
    /// `limit` falls back to the configured search limit.
    pub async fn search_text(
        &self,
        query: &str,
        limit: Option<i64>,
        content_type: Option<ContentType>,
    ) -> Result<Vec<SimilarContent>> {
        let vector = self.generate_embedding(query).await?;
        let req = SearchSimilarRequest::new(vector)
            .with_threshold(self.config.search_threshold)
            .with_limit(limit.unwrap_or(self.config.search_limit))
            .with_content_type(content_type);
        self.search_similar(&req).await
    }

    pub async fn delete_embeddings_for_content(&self, content_id: &str) -> Result<u64> {
        self.vectors.delete_for_content(content_id).await
    }

    /// Chunk, embed, and store `text`. Returns the number of chunks stored.
    ///
    /// Text that yields no chunks is an `Error::Embedding` and leaves the
    /// stored chunks untouched.
    #[instrument(
        skip_all,
        fields(subsystem = "catalog", component = "embedding", op = "process_content", content_id = %content_id, content_type = %content_type)
    )]
    pub async fn process_content(
        &self,
        content_id: &str,
        content_type: ContentType,
        text: &str,
    ) -> Result<usize> {
        let chunks = self.chunk(content_id, text)?;
        self.embed_and_store(content_id, content_type, chunks).await
    }

    /// Rebuild the embeddings of `content_id` from its current stored text.
    ///
    /// Returns `Error::NotFound` when the content no longer exists.
    #[instrument(
        skip(self),
        fields(subsystem = "catalog", component = "embedding", op = "reprocess_content")
    )]
    pub async fn reprocess_content(&self, content_id: &str) -> Result<usize> {
        let item = self.content.fetch(content_id).await?;
        let chunks = self.chunk(&item.content_id, &item.text)?;

        let removed = self.delete_embeddings_for_content(content_id).await?;
        let chunk_count = self
            .embed_and_store(&item.content_id, item.content_type, chunks)
            .await?;

        info!(removed, chunk_count, "Embeddings reprocessed");
        Ok(chunk_count)
    }

    fn chunk(&self, content_id: &str, text: &str) -> Result<Vec<TextChunk>> {
        let chunks = chunk_text(text, self.config.chunk_max_tokens);
        if chunks.is_empty() {
            return Err(Error::Embedding(format!(
                "No text to embed for content {}",
                content_id
            )));
        }
        Ok(chunks)
    }

    async fn embed_and_store(
        &self,
        content_id: &str,
        content_type: ContentType,
        chunks: Vec<TextChunk>,
    ) -> Result<usize> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.generate_embeddings(&texts).await?;

        let embedded: Vec<EmbeddingChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddingChunk {
                content_id: content_id.to_string(),
                chunk_index: chunk.index,
                text: chunk.text,
                vector,
                start_position: chunk.start_position,
                end_position: chunk.end_position,
            })
            .collect();

        self.store_embedding(content_id, content_type, &embedded)
            .await
            .map_err(|e| e.into_embedding())?;

        let chunk_count = embedded.len();
        if let Some(bus) = &self.events {
            bus.emit(CatalogEvent::EmbeddingGenerated {
                content_id: content_id.to_string(),
                content_type,
                chunk_count,
            });
        }
        debug!(chunk_count, "Content embedded");
        Ok(chunk_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryContentRepository, InMemoryVectorRepository};
    use tessera_inference::mock::MockInferenceBackend;

    struct Fixture {
        backend: Arc<MockInferenceBackend>,
        vectors: Arc<InMemoryVectorRepository>,
        content: Arc<InMemoryContentRepository>,
        pipeline: EmbeddingPipeline,
    }

    fn fixture_with(backend: MockInferenceBackend, config: CatalogConfig) -> Fixture {
        let backend = Arc::new(backend);
        let vectors = Arc::new(InMemoryVectorRepository::new());
        let content = Arc::new(InMemoryContentRepository::new());
        let pipeline =
            EmbeddingPipeline::new(backend.clone(), vectors.clone(), content.clone(), config);
        Fixture {
            backend,
            vectors,
            content,
            pipeline,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockInferenceBackend::new(), CatalogConfig::default())
    }

    fn small_chunks() -> CatalogConfig {
        CatalogConfig {
            chunk_max_tokens: 4,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_generate_embeddings_single_call_in_order() {
        let f = fixture();
        let texts = vec!["alpha".to_string(), "beta".to_string()];

        let vectors = f.pipeline.generate_embeddings(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(f.backend.embed_call_count(), 1);
        assert_eq!(vectors[1], f.pipeline.generate_embedding("beta").await.unwrap());
    }

    #[tokio::test]
    async fn test_generate_embeddings_empty_makes_no_call() {
        let f = fixture();
        assert!(f.pipeline.generate_embeddings(&[]).await.unwrap().is_empty());
        assert_eq!(f.backend.embed_call_count(), 0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_embedding_error() {
        let f = fixture_with(
            MockInferenceBackend::new().with_dimension(16).with_embedding_len(8),
            CatalogConfig::default(),
        );
        let err = f.pipeline.generate_embedding("text").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert!(err.to_string().contains("dimension 8"));
    }

    #[tokio::test]
    async fn test_process_content_stores_every_chunk() {
        let f = fixture_with(MockInferenceBackend::new(), small_chunks());
        let text = "First sentence here. Second sentence here. Third one.";

        let count = f
            .pipeline
            .process_content("c1", ContentType::ThoughtBlob, text)
            .await
            .unwrap();

        let stored = f.vectors.list_for_content("c1").await.unwrap();
        assert!(count > 1);
        assert_eq!(stored.len(), count);
        assert_eq!(f.backend.embed_call_count(), 1);
        for chunk in &stored {
            assert_eq!(&text[chunk.start_position..chunk.end_position], chunk.text);
        }
    }

    #[tokio::test]
    async fn test_process_content_emits_event() {
        let f = fixture();
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let pipeline = f.pipeline.clone().with_event_bus(bus);

        pipeline
            .process_content("c1", ContentType::VoiceRecording, "Hello there.")
            .await
            .unwrap();

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event_type, "embedding.generated");
        assert_eq!(envelope.payload.content_id(), "c1");
    }

    #[tokio::test]
    async fn test_store_failure_is_embedding_error() {
        let f = fixture();
        f.vectors.set_fail_writes(true);
        let err = f
            .pipeline
            .process_content("c1", ContentType::ThoughtBlob, "Hello.")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_reprocess_is_idempotent_and_shrinks() {
        let f = fixture_with(MockInferenceBackend::new(), small_chunks());
        f.content.insert(
            "c1",
            "One sentence here. Two sentence here. Three sentences here.",
            ContentType::ThoughtBlob,
        );

        let first = f.pipeline.reprocess_content("c1").await.unwrap();
        let snapshot = f.vectors.list_for_content("c1").await.unwrap();
        let second = f.pipeline.reprocess_content("c1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(snapshot, f.vectors.list_for_content("c1").await.unwrap());

        f.content.insert("c1", "Short.", ContentType::ThoughtBlob);
        assert_eq!(f.pipeline.reprocess_content("c1").await.unwrap(), 1);
        assert_eq!(f.vectors.list_for_content("c1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_keeps_existing_chunks() {
        let f = fixture();
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let pipeline = f.pipeline.clone().with_event_bus(bus);

        pipeline
            .process_content("c1", ContentType::ThoughtBlob, "Hope is light.")
            .await
            .unwrap();
        rx.recv().await.unwrap();

        let err = pipeline
            .process_content("c1", ContentType::ThoughtBlob, "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert_eq!(f.vectors.list_for_content("c1").await.unwrap().len(), 1);
        assert!(rx.try_recv().is_err());

        f.content.insert("c1", "", ContentType::ThoughtBlob);
        let err = pipeline.reprocess_content("c1").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert_eq!(f.vectors.list_for_content("c1").await.unwrap().len(), 1);
        assert_eq!(f.backend.embed_call_count(), 1);
    }

    #[tokio::test]
    async fn test_reprocess_missing_content_is_not_found() {
        let f = fixture();
        let err = f.pipeline.reprocess_content("missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_search_text_threshold_filters_everything() {
        let f = fixture_with(
            MockInferenceBackend::new(),
            CatalogConfig {
                search_threshold: 0.9,
                ..Default::default()
            },
        );
        // Stored vector has cosine 0.5 to the query's embedding
        let query_vec = f.pipeline.generate_embedding("query").await.unwrap();
        let q = query_vec.as_slice();
        let orthogonal = orthogonal_unit(q);
        let stored: Vec<f32> = q
            .iter()
            .zip(&orthogonal)
            .map(|(a, b)| 0.5 * a + (0.75f32).sqrt() * b)
            .collect();
        f.vectors
            .upsert_chunks(
                "far",
                ContentType::ThoughtBlob,
                &[EmbeddingChunk {
                    content_id: "far".to_string(),
                    chunk_index: 0,
                    text: "far".to_string(),
                    vector: Vector::from(stored),
                    start_position: 0,
                    end_position: 3,
                }],
            )
            .await
            .unwrap();

        assert!(f.pipeline.search_text("query", None, None).await.unwrap().is_empty());

        let lenient = SearchSimilarRequest::new(query_vec).with_threshold(0.4);
        assert_eq!(f.pipeline.search_similar(&lenient).await.unwrap().len(), 1);
    }

    /// Unit vector orthogonal to unit vector `q` (Gram-Schmidt on a basis axis).
    fn orthogonal_unit(q: &[f32]) -> Vec<f32> {
        let axis = q
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i)
            .unwrap();
        let mut v: Vec<f32> = q.iter().map(|x| -x * q[axis]).collect();
        v[axis] += 1.0;
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter().map(|x| x / norm).collect()
    }
}

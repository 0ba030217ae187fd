//! Mock inference backend for deterministic testing.
//!
//! Generates reproducible embeddings from text and returns canned
//! generation responses. Failures can be forced per operation so callers
//! can exercise their error paths.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tessera_inference::mock::MockInferenceBackend;
//! use tessera_core::EmbeddingBackend;
//!
//! let backend = MockInferenceBackend::new()
//!     .with_dimension(8)
//!     .with_fixed_response(r#"["hope", "loss"]"#);
//!
//! let vectors = backend.embed_texts(&["text".to_string()]).await.unwrap();
//! assert_eq!(vectors[0].as_slice().len(), 8);
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tessera_core::{EmbeddingBackend, Error, GenerationBackend, InferenceBackend, Result, Vector};

/// Mock inference backend for testing.
#[derive(Clone)]
pub struct MockInferenceBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    fixed_responses: HashMap<String, String>,
    default_response: String,
    latency_ms: u64,
    failure_rate: f64,
    fail_generation: bool,
    fail_embeddings: bool,
    embedding_len: Option<usize>,
}

/// One recorded backend call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
    pub timestamp: std::time::Instant,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: 16,
            fixed_responses: HashMap::new(),
            default_response: "[]".to_string(),
            latency_ms: 0,
            failure_rate: 0.0,
            fail_generation: false,
            fail_embeddings: false,
            embedding_len: None,
        }
    }
}

impl MockInferenceBackend {
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        Arc::make_mut(&mut self.config).dimension = dimension;
        self
    }

    /// Set the response returned for any prompt without a mapping.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Return `output` when the user prompt equals `input`.
    pub fn with_response_mapping(
        mut self,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .fixed_responses
            .insert(input.into(), output.into());
        self
    }

    /// Set simulated latency for all operations.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Set random failure rate (0.0 - 1.0) across all operations.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Make every generation call fail.
    pub fn with_failing_generation(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_generation = true;
        self
    }

    /// Make every embedding call fail.
    pub fn with_failing_embeddings(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_embeddings = true;
        self
    }

    /// Emit vectors of `len` values while still reporting the configured
    /// dimension, to exercise dimension checks.
    pub fn with_embedding_len(mut self, len: usize) -> Self {
        Arc::make_mut(&mut self.config).embedding_len = Some(len);
        self
    }

    fn calls(&self) -> MutexGuard<'_, Vec<MockCall>> {
        self.call_log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls().clone()
    }

    pub fn clear_calls(&self) {
        self.calls().clear()
    }

    /// Number of embedding batches requested.
    pub fn embed_call_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.operation == "embed")
            .count()
    }

    /// Number of generation calls.
    pub fn generate_call_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.operation == "generate")
            .count()
    }

    fn log_call(&self, operation: &str, input: &str) {
        self.calls().push(MockCall {
            operation: operation.to_string(),
            input: input.to_string(),
            timestamp: std::time::Instant::now(),
        });
    }

    fn should_fail(&self) -> bool {
        use rand::Rng;
        if self.config.failure_rate > 0.0 {
            rand::thread_rng().gen::<f64>() < self.config.failure_rate
        } else {
            false
        }
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }
    }
}

impl Default for MockInferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingBackend for MockInferenceBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        self.log_call("embed", &texts.join("\n"));
        self.simulate_latency().await;

        if self.config.fail_embeddings || self.should_fail() {
            return Err(Error::Embedding("Simulated embedding failure".to_string()));
        }

        let len = self.config.embedding_len.unwrap_or(self.config.dimension);
        Ok(texts
            .iter()
            .map(|t| Vector::from(MockEmbeddingGenerator::generate(t, len)))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

#[async_trait]
impl GenerationBackend for MockInferenceBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.log_call("generate", prompt);
        self.simulate_latency().await;

        if self.config.fail_generation || self.should_fail() {
            return Err(Error::Inference("Simulated generation failure".to_string()));
        }

        Ok(self
            .config
            .fixed_responses
            .get(prompt)
            .unwrap_or(&self.config.default_response)
            .clone())
    }

    fn model_name(&self) -> &str {
        "mock-gen"
    }
}

#[async_trait]
impl InferenceBackend for MockInferenceBackend {
    async fn health_check(&self) -> Result<bool> {
        Ok(!self.config.fail_generation && !self.config.fail_embeddings)
    }
}

/// Deterministic embedding generator.
pub struct MockEmbeddingGenerator;

impl MockEmbeddingGenerator {
    /// Generate a unit vector from text. The same text always yields the
    /// same vector.
    pub fn generate(text: &str, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0; dimension];
        if dimension == 0 {
            return vec;
        }

        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % dimension;
            vec[idx] += 0.1;
        }

        Self::normalize(&mut vec);
        vec
    }

    fn normalize(vec: &mut [f32]) {
        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vec.iter_mut().for_each(|x| *x /= magnitude);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_embed() {
        let backend = MockInferenceBackend::new().with_dimension(128);

        let vectors = backend.embed_texts(&["test".to_string()]).await.unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].as_slice().len(), 128);
        assert_eq!(backend.dimension(), 128);
    }

    #[tokio::test]
    async fn test_mock_backend_deterministic() {
        let backend = MockInferenceBackend::new();
        let texts = vec!["grief and hope".to_string()];

        let e1 = backend.embed_texts(&texts).await.unwrap();
        let e2 = backend.embed_texts(&texts).await.unwrap();
        assert_eq!(e1, e2, "Embeddings should be deterministic");
    }

    #[tokio::test]
    async fn test_mock_backend_response_mapping() {
        let backend = MockInferenceBackend::new()
            .with_fixed_response("default")
            .with_response_mapping("hello", "world");

        assert_eq!(backend.generate("hello").await.unwrap(), "world");
        assert_eq!(backend.generate("other").await.unwrap(), "default");
    }

    #[tokio::test]
    async fn test_mock_backend_call_logging() {
        let backend = MockInferenceBackend::new();

        backend.embed_texts(&["a".to_string()]).await.unwrap();
        backend.embed_texts(&["b".to_string()]).await.unwrap();
        backend.generate("prompt").await.unwrap();

        assert_eq!(backend.embed_call_count(), 2);
        assert_eq!(backend.generate_call_count(), 1);
        assert_eq!(backend.get_calls().len(), 3);

        backend.clear_calls();
        assert!(backend.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_forced_failures() {
        let backend = MockInferenceBackend::new().with_failing_embeddings();
        let err = backend.embed_texts(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert!(backend.generate("still works").await.is_ok());

        let backend = MockInferenceBackend::new().with_failing_generation();
        let err = backend.generate("x").await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
        assert!(!backend.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_failure_rate_one_always_fails() {
        let backend = MockInferenceBackend::new().with_failure_rate(1.0);
        assert!(backend.embed_texts(&["x".to_string()]).await.is_err());
    }

    #[tokio::test]
    async fn test_embedding_len_override() {
        let backend = MockInferenceBackend::new()
            .with_dimension(8)
            .with_embedding_len(4);
        let vectors = backend.embed_texts(&["x".to_string()]).await.unwrap();
        assert_eq!(vectors[0].as_slice().len(), 4);
        assert_eq!(backend.dimension(), 8);
    }

    #[test]
    fn test_embedding_generator_normalized() {
        let embedding = MockEmbeddingGenerator::generate("test", 128);
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.01, "Should be normalized");
    }

    #[tokio::test]
    async fn test_mock_backend_latency_simulation() {
        let backend = MockInferenceBackend::new().with_latency_ms(20);

        let start = std::time::Instant::now();
        backend.generate("test").await.unwrap();
        assert!(start.elapsed().as_millis() >= 20, "Should simulate latency");
    }
}

//! OpenAI-compatible inference backend.
//!
//! Works with any endpoint that speaks the OpenAI `/chat/completions` and
//! `/embeddings` protocol: OpenAI itself, Azure OpenAI, vLLM, LocalAI, or
//! Ollama in compatibility mode.
//!
//! # Example
//!
//! ```rust,no_run
//! use tessera_inference::openai::{OpenAIBackend, OpenAIConfig};
//! use tessera_core::GenerationBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = OpenAIConfig {
//!         base_url: "http://localhost:11434/v1".to_string(),
//!         api_key: None,
//!         embed_model: "nomic-embed-text".to_string(),
//!         gen_model: "llama3".to_string(),
//!         embed_dimension: 768,
//!         timeout_seconds: 120,
//!     };
//!     let backend = OpenAIBackend::new(config).unwrap();
//!     let reply = backend.generate("Name three colors").await.unwrap();
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{OpenAIBackend, OpenAIConfig};
pub use error::{to_tessera_error, OpenAIErrorCode};
pub use types::*;

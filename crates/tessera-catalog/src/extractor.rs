//! LLM-backed concept extraction.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

use tessera_core::{ConceptExtractor, GenerationBackend, Result};

/// Instruction sent as the system prompt on every extraction call.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a cataloging assistant. \
Read the user's text and extract between 3 and 5 key concepts, themes or emotions it expresses. \
Use short lowercase noun phrases of one to three words. \
Respond with ONLY a JSON array of strings, for example [\"hope\", \"loss\", \"journey\"]. \
Do not add explanations or any other text.";

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$").expect("valid fence regex")
});

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("valid quoted-string regex"));

/// Extracts concepts with a single generation call per text.
pub struct LlmConceptExtractor {
    backend: Arc<dyn GenerationBackend>,
}

impl LlmConceptExtractor {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ConceptExtractor for LlmConceptExtractor {
    #[instrument(
        skip(self, text),
        fields(subsystem = "catalog", component = "extractor", op = "extract_concepts", prompt_len = text.len())
    )]
    async fn extract_concepts(&self, text: &str) -> Result<Vec<String>> {
        let start = Instant::now();
        let raw = self
            .backend
            .generate_with_system(EXTRACTION_SYSTEM_PROMPT, text)
            .await
            .map_err(|e| e.into_extraction())?;

        let concepts = parse_concepts(&raw);
        debug!(
            model = self.backend.model_name(),
            response_len = raw.len(),
            concept_count = concepts.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Concepts extracted"
        );
        Ok(concepts)
    }
}

/// Parse a model response into concepts.
///
/// Tries a strict JSON string array first (after stripping a Markdown code
/// fence), then falls back to collecting every double-quoted substring.
/// Never fails: unusable output yields an empty list.
pub fn parse_concepts(raw: &str) -> Vec<String> {
    let body = CODE_FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
        .trim();

    let parsed = match serde_json::from_str::<Vec<String>>(body) {
        Ok(list) => list,
        Err(_) => salvage_quoted(body),
    };

    parsed
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn salvage_quoted(body: &str) -> Vec<String> {
    QUOTED
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| {
            let quoted = format!("\"{}\"", m.as_str());
            serde_json::from_str::<String>(&quoted).unwrap_or_else(|_| m.as_str().to_string())
        })
        .collect()
}

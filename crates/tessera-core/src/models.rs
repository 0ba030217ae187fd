//! Core data models for tessera.
//!
//! These types are shared across all tessera crates and represent the
//! vocabulary, content, tagging and embedding entities of the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::defaults;
use crate::Error;
use pgvector::Vector;

// =============================================================================
// VOCABULARY TYPES
// =============================================================================

/// A curated term in a controlled vocabulary.
///
/// Terms form an acyclic tree through `parent_id`. Term text is unique
/// within its vocabulary set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyTerm {
    pub id: Uuid,
    pub term: String,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub vocabulary_set_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named group of vocabulary terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularySet {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A vocabulary term with its children, for browse views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyNode {
    pub id: Uuid,
    pub term: String,
    pub synonyms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub children: Vec<VocabularyNode>,
}

// =============================================================================
// CONTENT TYPES
// =============================================================================

/// Kind of content being cataloged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    ThoughtBlob,
    VoiceRecording,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::ThoughtBlob => "thought_blob",
            ContentType::VoiceRecording => "voice_recording",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thought_blob" => Ok(ContentType::ThoughtBlob),
            "voice_recording" => Ok(ContentType::VoiceRecording),
            other => Err(Error::InvalidInput(format!(
                "Unknown content type: {}",
                other
            ))),
        }
    }
}

/// A piece of content owned by the external content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub content_id: String,
    pub text: String,
    pub content_type: ContentType,
}

// =============================================================================
// MATCHING & TAGGING TYPES
// =============================================================================

/// Which rule produced a concept match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Concept equals the term text (case-insensitive).
    Exact,
    /// Concept equals one of the term's synonyms.
    Synonym,
    /// Concept and term contain one another.
    Parent,
}

impl MatchType {
    /// Confidence assigned to this tier.
    pub fn confidence(&self) -> f32 {
        match self {
            MatchType::Exact => defaults::CONFIDENCE_EXACT,
            MatchType::Synonym => defaults::CONFIDENCE_SYNONYM,
            MatchType::Parent => defaults::CONFIDENCE_PARENT,
        }
    }
}

/// A concept resolved to a vocabulary term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptMatch {
    pub concept: String,
    pub term_id: Uuid,
    pub term: String,
    pub confidence: f32,
    pub match_type: MatchType,
}

/// One persisted content ↔ term tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadataRecord {
    pub content_id: String,
    pub content_type: ContentType,
    pub vocabulary_term_id: Uuid,
    pub confidence: f32,
}

impl ContentMetadataRecord {
    pub fn from_match(content_id: &str, content_type: ContentType, m: &ConceptMatch) -> Self {
        Self {
            content_id: content_id.to_string(),
            content_type,
            vocabulary_term_id: m.term_id,
            confidence: m.confidence,
        }
    }
}

/// A term attached to content, as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTerm {
    pub term_id: Uuid,
    pub term: String,
    pub confidence: f32,
}

impl From<&ConceptMatch> for CatalogTerm {
    fn from(m: &ConceptMatch) -> Self {
        Self {
            term_id: m.term_id,
            term: m.term.clone(),
            confidence: m.confidence,
        }
    }
}

/// Outcome of cataloging one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResult {
    pub content_id: String,
    pub terms: Vec<CatalogTerm>,
    pub embedding_generated: bool,
}

// =============================================================================
// CHUNKING & EMBEDDING TYPES
// =============================================================================

/// A contiguous slice of source text produced by the chunker.
///
/// `start_position` and `end_position` are byte offsets, so
/// `&source[start_position..end_position] == text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
    pub start_position: usize,
    pub end_position: usize,
}

/// An embedded chunk ready for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingChunk {
    pub content_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub vector: Vector,
    pub start_position: usize,
    pub end_position: usize,
}

impl EmbeddingChunk {
    /// Storage key for this chunk.
    pub fn chunk_id(&self) -> String {
        chunk_id(&self.content_id, self.chunk_index)
    }
}

/// Build the storage key for chunk `index` of `content_id`.
pub fn chunk_id(content_id: &str, index: usize) -> String {
    format!("{}_{}", content_id, index)
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarContent {
    pub content_id: String,
    pub chunk_text: String,
    pub similarity: f32,
    pub start_position: usize,
    pub end_position: usize,
}

/// Parameters for a nearest-neighbour query.
#[derive(Debug, Clone)]
pub struct SearchSimilarRequest {
    pub vector: Vector,
    /// Minimum cosine similarity (inclusive).
    pub threshold: f32,
    pub limit: i64,
    pub exclude_content_ids: Vec<String>,
    pub content_type: Option<ContentType>,
}

impl SearchSimilarRequest {
    pub fn new(vector: Vector) -> Self {
        Self {
            vector,
            threshold: defaults::SEARCH_THRESHOLD,
            limit: defaults::SEARCH_LIMIT,
            exclude_content_ids: Vec::new(),
            content_type: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_exclusions(mut self, content_ids: Vec<String>) -> Self {
        self.exclude_content_ids = content_ids;
        self
    }

    pub fn with_content_type(mut self, content_type: Option<ContentType>) -> Self {
        self.content_type = content_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&ContentType::ThoughtBlob).unwrap(),
            "\"thought_blob\""
        );
        assert_eq!(
            serde_json::to_string(&ContentType::VoiceRecording).unwrap(),
            "\"voice_recording\""
        );
    }

    #[test]
    fn test_content_type_from_str() {
        assert_eq!(
            "voice_recording".parse::<ContentType>().unwrap(),
            ContentType::VoiceRecording
        );
        assert!("podcast".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_match_type_confidence_tiers() {
        assert!(MatchType::Exact.confidence() > MatchType::Synonym.confidence());
        assert!(MatchType::Synonym.confidence() > MatchType::Parent.confidence());
        assert_eq!(MatchType::Parent.confidence(), 0.70);
    }

    #[test]
    fn test_chunk_id_format() {
        let chunk = EmbeddingChunk {
            content_id: "blob-42".to_string(),
            chunk_index: 3,
            text: "hello".to_string(),
            vector: Vector::from(vec![0.0, 1.0]),
            start_position: 0,
            end_position: 5,
        };
        assert_eq!(chunk.chunk_id(), "blob-42_3");
    }

    #[test]
    fn test_catalog_result_is_camel_case() {
        let result = CatalogResult {
            content_id: "c1".to_string(),
            terms: vec![CatalogTerm {
                term_id: Uuid::nil(),
                term: "hope".to_string(),
                confidence: 0.95,
            }],
            embedding_generated: true,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["contentId"], "c1");
        assert_eq!(json["embeddingGenerated"], true);
        assert_eq!(json["terms"][0]["term"], "hope");
        assert!(json["terms"][0].get("termId").is_some());
    }

    #[test]
    fn test_search_request_defaults() {
        let req = SearchSimilarRequest::new(Vector::from(vec![1.0]));
        assert_eq!(req.threshold, 0.7);
        assert_eq!(req.limit, 10);
        assert!(req.exclude_content_ids.is_empty());
        assert!(req.content_type.is_none());
    }
}

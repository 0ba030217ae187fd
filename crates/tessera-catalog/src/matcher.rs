//! Concept → vocabulary term matching.
//!
//! Each concept is tested against the vocabulary snapshot with three rules
//! in strict priority order; the first rule with any hit wins:
//!
//! | Rule    | Test (case-insensitive)                  | Confidence |
//! |---------|------------------------------------------|------------|
//! | exact   | concept == term                          | 0.95       |
//! | synonym | concept == one of the term's synonyms    | 0.85       |
//! | parent  | concept contains term or term contains concept | 0.70 |
//!
//! Within a rule, terms are scanned in (term text, id) order so results
//! are stable for a fixed snapshot. Concepts without a hit are dropped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};
use uuid::Uuid;

use tessera_core::{
    ConceptMatch, MatchType, Result, VocabularyNode, VocabularyRepository, VocabularyTerm,
};

use crate::hierarchy::VocabularyTree;

/// Resolves free-form concepts to controlled vocabulary terms.
#[derive(Clone)]
pub struct VocabularyMatcher {
    vocabulary: Arc<dyn VocabularyRepository>,
}

impl VocabularyMatcher {
    pub fn new(vocabulary: Arc<dyn VocabularyRepository>) -> Self {
        Self { vocabulary }
    }

    /// Match concepts against the terms of `vocabulary_set_id` (or all sets).
    #[instrument(
        skip(self, concepts),
        fields(subsystem = "catalog", component = "matcher", op = "match_concepts", concept_count = concepts.len())
    )]
    pub async fn match_concepts(
        &self,
        concepts: &[String],
        vocabulary_set_id: Option<Uuid>,
    ) -> Result<Vec<ConceptMatch>> {
        let start = Instant::now();
        let terms = self
            .vocabulary
            .list_terms(vocabulary_set_id)
            .await
            .map_err(|e| e.into_matching())?;

        let matches = match_against(concepts, &terms);
        debug!(
            match_count = matches.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Concepts matched"
        );
        Ok(matches)
    }

    /// Load the vocabulary snapshot as a tree.
    pub async fn load_tree(&self, vocabulary_set_id: Option<Uuid>) -> Result<VocabularyTree> {
        let terms = self.vocabulary.list_terms(vocabulary_set_id).await?;
        Ok(VocabularyTree::from_terms(terms))
    }

    /// Roots plus every transitive descendant.
    pub async fn expand_hierarchy(
        &self,
        root_ids: &[Uuid],
        vocabulary_set_id: Option<Uuid>,
    ) -> Result<HashSet<Uuid>> {
        if root_ids.is_empty() {
            return Ok(HashSet::new());
        }
        Ok(self.load_tree(vocabulary_set_id).await?.expand(root_ids))
    }

    /// Nested term forest for browse views.
    pub async fn vocabulary_forest(
        &self,
        vocabulary_set_id: Option<Uuid>,
    ) -> Result<Vec<VocabularyNode>> {
        Ok(self.load_tree(vocabulary_set_id).await?.forest())
    }
}

struct LoweredTerm<'a> {
    term: &'a VocabularyTerm,
    text: String,
    synonyms: Vec<String>,
}

/// Pure matching over a term snapshot.
pub fn match_against(concepts: &[String], terms: &[VocabularyTerm]) -> Vec<ConceptMatch> {
    let mut sorted: Vec<&VocabularyTerm> = terms.iter().collect();
    sorted.sort_by(|a, b| a.term.cmp(&b.term).then(a.id.cmp(&b.id)));

    let lowered: Vec<LoweredTerm<'_>> = sorted
        .into_iter()
        .map(|term| LoweredTerm {
            term,
            text: term.term.to_lowercase(),
            synonyms: term.synonyms.iter().map(|s| s.to_lowercase()).collect(),
        })
        .collect();

    concepts
        .iter()
        .filter_map(|concept| match_one(concept, &lowered))
        .collect()
}

fn match_one(concept: &str, terms: &[LoweredTerm<'_>]) -> Option<ConceptMatch> {
    let needle = concept.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let hit = terms
        .iter()
        .find(|t| t.text == needle)
        .map(|t| (t, MatchType::Exact))
        .or_else(|| {
            terms
                .iter()
                .find(|t| t.synonyms.iter().any(|s| *s == needle))
                .map(|t| (t, MatchType::Synonym))
        })
        .or_else(|| {
            terms
                .iter()
                .find(|t| {
                    !t.text.is_empty() && (needle.contains(&t.text) || t.text.contains(&needle))
                })
                .map(|t| (t, MatchType::Parent))
        });

    hit.map(|(t, match_type)| ConceptMatch {
        concept: concept.to_string(),
        term_id: t.term.id,
        term: t.term.term.clone(),
        confidence: match_type.confidence(),
        match_type,
    })
}

/// Collapse matches that resolved to the same term, keeping the highest
/// confidence. First-seen order is preserved.
pub fn dedupe_by_term(matches: Vec<ConceptMatch>) -> Vec<ConceptMatch> {
    let mut position: HashMap<Uuid, usize> = HashMap::new();
    let mut out: Vec<ConceptMatch> = Vec::with_capacity(matches.len());

    for m in matches {
        match position.get(&m.term_id) {
            Some(&i) => {
                if m.confidence > out[i].confidence {
                    out[i] = m;
                }
            }
            None => {
                position.insert(m.term_id, out.len());
                out.push(m);
            }
        }
    }
    out
}

//! Tag persistence and hierarchy-aware tag filtering.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};
use uuid::Uuid;

use tessera_core::{
    CatalogTerm, ConceptMatch, ContentMetadataRecord, ContentType, MetadataRepository, Result,
    VocabularyRepository,
};

use crate::hierarchy::VocabularyTree;

#[derive(Clone)]
pub struct MetadataStore {
    repo: Arc<dyn MetadataRepository>,
    vocabulary: Arc<dyn VocabularyRepository>,
}

impl MetadataStore {
    pub fn new(repo: Arc<dyn MetadataRepository>, vocabulary: Arc<dyn VocabularyRepository>) -> Self {
        Self { repo, vocabulary }
    }

    fn records(
        content_id: &str,
        content_type: ContentType,
        matches: &[ConceptMatch],
    ) -> Vec<ContentMetadataRecord> {
        matches
            .iter()
            .map(|m| ContentMetadataRecord::from_match(content_id, content_type, m))
            .collect()
    }

    /// Write one tag per match as a single atomic batch.
    ///
    /// Existing `(content_id, term)` pairs are skipped, so retrying a failed
    /// call never duplicates rows. Returns the number of rows inserted.
    #[instrument(
        skip(self, matches),
        fields(subsystem = "catalog", component = "metadata", op = "store_metadata", match_count = matches.len())
    )]
    pub async fn store_metadata(
        &self,
        content_id: &str,
        content_type: ContentType,
        matches: &[ConceptMatch],
    ) -> Result<u64> {
        if matches.is_empty() {
            return Ok(0);
        }

        let start = Instant::now();
        let records = Self::records(content_id, content_type, matches);
        let inserted = self
            .repo
            .insert_batch(&records)
            .await
            .map_err(|e| e.into_persistence())?;

        debug!(
            result_count = inserted,
            duration_ms = start.elapsed().as_millis() as u64,
            "Metadata stored"
        );
        Ok(inserted)
    }

    /// Replace every tag of `content_id` with `matches` in one transaction.
    #[instrument(
        skip(self, matches),
        fields(subsystem = "catalog", component = "metadata", op = "replace_metadata", match_count = matches.len())
    )]
    pub async fn replace_metadata(
        &self,
        content_id: &str,
        content_type: ContentType,
        matches: &[ConceptMatch],
    ) -> Result<()> {
        let records = Self::records(content_id, content_type, matches);
        self.repo
            .replace_for_content(content_id, &records)
            .await
            .map_err(|e| e.into_persistence())
    }

    /// Content ids tagged with any of `term_ids` or their descendants.
    ///
    /// Sorted and distinct. An empty input yields an empty output.
    #[instrument(
        skip(self, term_ids),
        fields(subsystem = "catalog", component = "metadata", op = "filter_by_terms", input_count = term_ids.len())
    )]
    pub async fn filter_by_terms(&self, term_ids: &[Uuid]) -> Result<Vec<String>> {
        if term_ids.is_empty() {
            return Ok(Vec::new());
        }

        let tree = VocabularyTree::from_terms(self.vocabulary.list_terms(None).await?);
        let mut expanded: Vec<Uuid> = tree.expand(term_ids).into_iter().collect();
        expanded.sort();

        let mut ids = self.repo.content_ids_for_terms(&expanded).await?;
        ids.sort();
        ids.dedup();

        debug!(
            expanded_count = expanded.len(),
            result_count = ids.len(),
            "Tag filter resolved"
        );
        Ok(ids)
    }

    pub async fn terms_for_content(&self, content_id: &str) -> Result<Vec<CatalogTerm>> {
        self.repo.terms_for_content(content_id).await
    }
}

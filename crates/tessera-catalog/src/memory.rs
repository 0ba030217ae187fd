//! In-memory repository implementations.
//!
//! These back the pipeline in tests and in embedded setups without a
//! database. Semantics mirror the PostgreSQL repositories: batch inserts are
//! all-or-nothing and skip existing `(content_id, term)` pairs, chunk upserts
//! drop stale indices, and search is brute-force cosine similarity.
//!
//! Failure switches (`set_unavailable`, `set_fail_writes`) let tests drive
//! each pipeline stage into its error path.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use tessera_core::{
    CatalogTerm, ContentItem, ContentMetadataRecord, ContentRepository, ContentType,
    EmbeddingChunk, Error, MetadataRepository, Result, SearchSimilarRequest, SimilarContent,
    VectorRepository, VocabularyRepository, VocabularySet, VocabularyTerm,
};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// VOCABULARY
// =============================================================================

#[derive(Default)]
pub struct InMemoryVocabularyRepository {
    sets: RwLock<Vec<VocabularySet>>,
    terms: RwLock<Vec<VocabularyTerm>>,
    unavailable: AtomicBool,
}

impl InMemoryVocabularyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_set(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        write(&self.sets).push(VocabularySet {
            id,
            name: name.to_string(),
            description: None,
        });
        id
    }

    pub fn insert_term(
        &self,
        vocabulary_set_id: Uuid,
        term: &str,
        parent_id: Option<Uuid>,
        synonyms: &[&str],
    ) -> Uuid {
        let id = Uuid::new_v4();
        write(&self.terms).push(VocabularyTerm {
            id,
            term: term.to_string(),
            parent_id,
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            vocabulary_set_id,
            description: None,
        });
        id
    }

    /// Make every read fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Internal("simulated vocabulary outage".to_string()));
        }
        Ok(())
    }

    fn term_snapshot(&self) -> HashMap<Uuid, VocabularyTerm> {
        read(&self.terms).iter().map(|t| (t.id, t.clone())).collect()
    }
}

#[async_trait]
impl VocabularyRepository for InMemoryVocabularyRepository {
    async fn list_terms(&self, vocabulary_set_id: Option<Uuid>) -> Result<Vec<VocabularyTerm>> {
        self.check_available()?;
        let mut terms: Vec<VocabularyTerm> = read(&self.terms)
            .iter()
            .filter(|t| vocabulary_set_id.map_or(true, |set| t.vocabulary_set_id == set))
            .cloned()
            .collect();
        terms.sort_by(|a, b| a.term.cmp(&b.term).then(a.id.cmp(&b.id)));
        Ok(terms)
    }

    async fn list_sets(&self) -> Result<Vec<VocabularySet>> {
        self.check_available()?;
        let mut sets = read(&self.sets).clone();
        sets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sets)
    }

    async fn count_terms(&self) -> Result<i64> {
        self.check_available()?;
        Ok(read(&self.terms).len() as i64)
    }
}

// =============================================================================
// METADATA
// =============================================================================

pub struct InMemoryMetadataRepository {
    vocabulary: Arc<InMemoryVocabularyRepository>,
    records: RwLock<Vec<ContentMetadataRecord>>,
    fail_writes: AtomicBool,
}

impl InMemoryMetadataRepository {
    /// Term names for `terms_for_content` and foreign-key checks come from
    /// `vocabulary`.
    pub fn new(vocabulary: Arc<InMemoryVocabularyRepository>) -> Self {
        Self {
            vocabulary,
            records: RwLock::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every stored record.
    pub fn records(&self) -> Vec<ContentMetadataRecord> {
        read(&self.records).clone()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Internal("simulated metadata write failure".to_string()));
        }
        Ok(())
    }

    /// Validate a batch and drop pairs already present (in storage or earlier
    /// in the batch).
    fn prepare(
        &self,
        existing: &[ContentMetadataRecord],
        records: &[ContentMetadataRecord],
    ) -> Result<Vec<ContentMetadataRecord>> {
        let known = self.vocabulary.term_snapshot();
        let mut fresh: Vec<ContentMetadataRecord> = Vec::new();

        for record in records {
            if !known.contains_key(&record.vocabulary_term_id) {
                return Err(Error::InvalidInput(format!(
                    "Unknown vocabulary term: {}",
                    record.vocabulary_term_id
                )));
            }
            if !(0.0..=1.0).contains(&record.confidence) {
                return Err(Error::InvalidInput(format!(
                    "Confidence out of range: {}",
                    record.confidence
                )));
            }
            let same = |r: &ContentMetadataRecord| {
                r.content_id == record.content_id
                    && r.vocabulary_term_id == record.vocabulary_term_id
            };
            if !existing.iter().any(same) && !fresh.iter().any(same) {
                fresh.push(record.clone());
            }
        }
        Ok(fresh)
    }
}

#[async_trait]
impl MetadataRepository for InMemoryMetadataRepository {
    async fn insert_batch(&self, records: &[ContentMetadataRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        self.check_writable()?;

        let mut stored = write(&self.records);
        let fresh = self.prepare(&stored, records)?;
        let inserted = fresh.len() as u64;
        stored.extend(fresh);
        Ok(inserted)
    }

    async fn replace_for_content(
        &self,
        content_id: &str,
        records: &[ContentMetadataRecord],
    ) -> Result<()> {
        self.check_writable()?;

        let mut stored = write(&self.records);
        let kept: Vec<ContentMetadataRecord> = stored
            .iter()
            .filter(|r| r.content_id != content_id)
            .cloned()
            .collect();
        let fresh = self.prepare(&kept, records)?;
        *stored = kept;
        stored.extend(fresh);
        Ok(())
    }

    async fn content_ids_for_terms(&self, term_ids: &[Uuid]) -> Result<Vec<String>> {
        let mut ids: Vec<String> = read(&self.records)
            .iter()
            .filter(|r| term_ids.contains(&r.vocabulary_term_id))
            .map(|r| r.content_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn terms_for_content(&self, content_id: &str) -> Result<Vec<CatalogTerm>> {
        let known = self.vocabulary.term_snapshot();
        let mut terms: Vec<CatalogTerm> = read(&self.records)
            .iter()
            .filter(|r| r.content_id == content_id)
            .filter_map(|r| {
                known.get(&r.vocabulary_term_id).map(|t| CatalogTerm {
                    term_id: t.id,
                    term: t.term.clone(),
                    confidence: r.confidence,
                })
            })
            .collect();
        terms.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.term.cmp(&b.term))
        });
        Ok(terms)
    }
}

// =============================================================================
// VECTORS
// =============================================================================

#[derive(Debug, Clone)]
struct StoredChunk {
    content_type: ContentType,
    chunk: EmbeddingChunk,
}

#[derive(Default)]
pub struct InMemoryVectorRepository {
    chunks: RwLock<BTreeMap<String, StoredChunk>>,
    fail_writes: AtomicBool,
}

impl InMemoryVectorRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn chunk_count(&self) -> usize {
        read(&self.chunks).len()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorRepository for InMemoryVectorRepository {
    async fn upsert_chunks(
        &self,
        content_id: &str,
        content_type: ContentType,
        chunks: &[EmbeddingChunk],
    ) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Internal("simulated vector write failure".to_string()));
        }

        let mut stored = write(&self.chunks);
        for chunk in chunks {
            stored.insert(
                chunk.chunk_id(),
                StoredChunk {
                    content_type,
                    chunk: chunk.clone(),
                },
            );
        }
        stored.retain(|_, s| {
            s.chunk.content_id != content_id || s.chunk.chunk_index < chunks.len()
        });
        Ok(())
    }

    async fn search(&self, req: &SearchSimilarRequest) -> Result<Vec<SimilarContent>> {
        let query = req.vector.as_slice();
        let mut hits: Vec<SimilarContent> = read(&self.chunks)
            .values()
            .filter(|s| !req.exclude_content_ids.contains(&s.chunk.content_id))
            .filter(|s| req.content_type.map_or(true, |t| t == s.content_type))
            .map(|s| SimilarContent {
                content_id: s.chunk.content_id.clone(),
                chunk_text: s.chunk.text.clone(),
                similarity: cosine_similarity(query, s.chunk.vector.as_slice()),
                start_position: s.chunk.start_position,
                end_position: s.chunk.end_position,
            })
            .filter(|hit| hit.similarity >= req.threshold)
            .collect();

        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(req.limit.max(0) as usize);
        Ok(hits)
    }

    async fn list_for_content(&self, content_id: &str) -> Result<Vec<EmbeddingChunk>> {
        let mut chunks: Vec<EmbeddingChunk> = read(&self.chunks)
            .values()
            .filter(|s| s.chunk.content_id == content_id)
            .map(|s| s.chunk.clone())
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn delete_for_content(&self, content_id: &str) -> Result<u64> {
        let mut stored = write(&self.chunks);
        let before = stored.len();
        stored.retain(|_, s| s.chunk.content_id != content_id);
        Ok((before - stored.len()) as u64)
    }
}

// =============================================================================
// CONTENT
// =============================================================================

#[derive(Default)]
pub struct InMemoryContentRepository {
    items: RwLock<HashMap<String, ContentItem>>,
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, content_id: &str, text: &str, content_type: ContentType) {
        write(&self.items).insert(
            content_id.to_string(),
            ContentItem {
                content_id: content_id.to_string(),
                text: text.to_string(),
                content_type,
            },
        );
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn fetch(&self, content_id: &str) -> Result<ContentItem> {
        read(&self.items)
            .get(content_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Content not found: {}", content_id)))
    }
}

//! Integration tests for the PostgreSQL repositories.
//!
//! These need a PostgreSQL instance with pgvector. Run with:
//! `DATABASE_URL=postgres://... cargo test -p tessera-db -- --ignored`

use tessera_core::{
    ContentMetadataRecord, ContentRepository, ContentType, EmbeddingChunk, Error,
    MetadataRepository, SearchSimilarRequest, Vector, VectorRepository, VocabularyRepository,
};
use tessera_db::test_fixtures::{
    seed_term, seed_thought_blob, seed_vocabulary_set, unique_content_id, TestDatabase,
};
use uuid::Uuid;

const DIM: usize = 1536;

async fn connect() -> TestDatabase {
    dotenvy::dotenv().ok();
    TestDatabase::new().await
}

/// Unit vector along `axis`.
fn axis_vector(axis: usize) -> Vector {
    let mut v = vec![0.0f32; DIM];
    v[axis] = 1.0;
    Vector::from(v)
}

/// Unit vector with the given cosine similarity to `axis_vector(0)`.
fn vector_with_similarity(similarity: f32) -> Vector {
    let mut v = vec![0.0f32; DIM];
    v[0] = similarity;
    v[1] = (1.0 - similarity * similarity).sqrt();
    Vector::from(v)
}

fn chunk(content_id: &str, index: usize, text: &str, vector: Vector) -> EmbeddingChunk {
    EmbeddingChunk {
        content_id: content_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        vector,
        start_position: index * 10,
        end_position: index * 10 + text.len(),
    }
}

fn record(content_id: &str, term_id: Uuid, confidence: f32) -> ContentMetadataRecord {
    ContentMetadataRecord {
        content_id: content_id.to_string(),
        content_type: ContentType::ThoughtBlob,
        vocabulary_term_id: term_id,
        confidence,
    }
}

// =============================================================================
// VOCABULARY
// =============================================================================

#[tokio::test]
#[ignore]
async fn test_list_terms_scoped_to_set() {
    let test_db = connect().await;
    let set_a = seed_vocabulary_set(&test_db.pool, "set-a").await;
    let set_b = seed_vocabulary_set(&test_db.pool, "set-b").await;

    let emotion = seed_term(&test_db.pool, set_a, "emotion", None, &[]).await;
    seed_term(&test_db.pool, set_a, "grief", Some(emotion), &["loss", "mourning"]).await;
    seed_term(&test_db.pool, set_b, "journey", None, &[]).await;

    let terms = test_db.db.vocabulary.list_terms(Some(set_a)).await.unwrap();
    assert_eq!(terms.len(), 2);
    assert_eq!(terms[0].term, "emotion");
    assert_eq!(terms[1].term, "grief");
    assert_eq!(terms[1].parent_id, Some(emotion));
    assert_eq!(terms[1].synonyms, vec!["loss", "mourning"]);

    let sets = test_db.db.vocabulary.list_sets().await.unwrap();
    assert!(sets.iter().any(|s| s.id == set_b));
    assert!(test_db.db.vocabulary.count_terms().await.unwrap() >= 3);
}

// =============================================================================
// METADATA
// =============================================================================

#[tokio::test]
#[ignore]
async fn test_insert_batch_is_conflict_tolerant() {
    let test_db = connect().await;
    let set_id = seed_vocabulary_set(&test_db.pool, "tags").await;
    let hope = seed_term(&test_db.pool, set_id, "hope", None, &[]).await;
    let grief = seed_term(&test_db.pool, set_id, "grief", None, &[]).await;
    let content_id = unique_content_id("blob");

    let records = vec![record(&content_id, hope, 0.95), record(&content_id, grief, 0.85)];

    let first = test_db.db.metadata.insert_batch(&records).await.unwrap();
    let second = test_db.db.metadata.insert_batch(&records).await.unwrap();
    assert_eq!(first, 2);
    assert_eq!(second, 0, "Retry must not duplicate rows");

    let terms = test_db.db.metadata.terms_for_content(&content_id).await.unwrap();
    assert_eq!(terms.len(), 2);
    assert_eq!(terms[0].term, "hope", "Highest confidence first");
}

#[tokio::test]
#[ignore]
async fn test_insert_batch_empty_is_noop() {
    let test_db = connect().await;
    assert_eq!(test_db.db.metadata.insert_batch(&[]).await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn test_insert_batch_unknown_term_rolls_back() {
    let test_db = connect().await;
    let set_id = seed_vocabulary_set(&test_db.pool, "atomic").await;
    let hope = seed_term(&test_db.pool, set_id, "hope", None, &[]).await;
    let content_id = unique_content_id("blob");

    let records = vec![
        record(&content_id, hope, 0.95),
        record(&content_id, Uuid::new_v4(), 0.7),
    ];

    let err = test_db.db.metadata.insert_batch(&records).await.unwrap_err();
    assert!(matches!(err, Error::Database(_)));

    let terms = test_db.db.metadata.terms_for_content(&content_id).await.unwrap();
    assert!(terms.is_empty(), "Batch must be all-or-nothing");
}

#[tokio::test]
#[ignore]
async fn test_replace_for_content_swaps_tags() {
    let test_db = connect().await;
    let set_id = seed_vocabulary_set(&test_db.pool, "replace").await;
    let hope = seed_term(&test_db.pool, set_id, "hope", None, &[]).await;
    let grief = seed_term(&test_db.pool, set_id, "grief", None, &[]).await;
    let content_id = unique_content_id("blob");

    test_db
        .db
        .metadata
        .insert_batch(&[record(&content_id, hope, 0.95)])
        .await
        .unwrap();
    test_db
        .db
        .metadata
        .replace_for_content(&content_id, &[record(&content_id, grief, 0.85)])
        .await
        .unwrap();

    let terms = test_db.db.metadata.terms_for_content(&content_id).await.unwrap();
    assert_eq!(terms.len(), 1);
    assert_eq!(terms[0].term_id, grief);
}

#[tokio::test]
#[ignore]
async fn test_content_ids_for_terms_distinct_sorted() {
    let test_db = connect().await;
    let set_id = seed_vocabulary_set(&test_db.pool, "filter").await;
    let hope = seed_term(&test_db.pool, set_id, "hope", None, &[]).await;
    let grief = seed_term(&test_db.pool, set_id, "grief", None, &[]).await;

    let prefix = unique_content_id("f");
    let a = format!("{}-a", prefix);
    let b = format!("{}-b", prefix);

    test_db
        .db
        .metadata
        .insert_batch(&[
            record(&b, hope, 0.95),
            record(&b, grief, 0.85),
            record(&a, grief, 0.70),
        ])
        .await
        .unwrap();

    let ids = test_db
        .db
        .metadata
        .content_ids_for_terms(&[hope, grief])
        .await
        .unwrap();
    assert_eq!(ids, vec![a, b]);

    assert!(test_db
        .db
        .metadata
        .content_ids_for_terms(&[])
        .await
        .unwrap()
        .is_empty());
}

// =============================================================================
// VECTORS
// =============================================================================

#[tokio::test]
#[ignore]
async fn test_upsert_removes_stale_chunks() {
    let test_db = connect().await;
    let content_id = unique_content_id("vec");

    let three = vec![
        chunk(&content_id, 0, "one", axis_vector(0)),
        chunk(&content_id, 1, "two", axis_vector(1)),
        chunk(&content_id, 2, "three", axis_vector(2)),
    ];
    test_db
        .db
        .vectors
        .upsert_chunks(&content_id, ContentType::ThoughtBlob, &three)
        .await
        .unwrap();

    let one = vec![chunk(&content_id, 0, "only", axis_vector(3))];
    test_db
        .db
        .vectors
        .upsert_chunks(&content_id, ContentType::ThoughtBlob, &one)
        .await
        .unwrap();

    let stored = test_db.db.vectors.list_for_content(&content_id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "only");
    assert_eq!(stored[0].chunk_id(), format!("{}_0", content_id));
}

#[tokio::test]
#[ignore]
async fn test_search_threshold_and_exclusions() {
    let test_db = connect().await;
    let near = unique_content_id("near");
    let far = unique_content_id("far");

    test_db
        .db
        .vectors
        .upsert_chunks(
            &near,
            ContentType::ThoughtBlob,
            &[chunk(&near, 0, "near text", vector_with_similarity(0.95))],
        )
        .await
        .unwrap();
    test_db
        .db
        .vectors
        .upsert_chunks(
            &far,
            ContentType::VoiceRecording,
            &[chunk(&far, 0, "far text", vector_with_similarity(0.5))],
        )
        .await
        .unwrap();

    let req = SearchSimilarRequest::new(axis_vector(0)).with_threshold(0.9);
    let hits = test_db.db.vectors.search(&req).await.unwrap();
    assert!(hits.iter().any(|h| h.content_id == near));
    assert!(hits.iter().all(|h| h.content_id != far));
    assert!(hits.iter().all(|h| h.similarity >= 0.9));

    let req = SearchSimilarRequest::new(axis_vector(0))
        .with_threshold(0.9)
        .with_exclusions(vec![near.clone()]);
    let hits = test_db.db.vectors.search(&req).await.unwrap();
    assert!(hits.iter().all(|h| h.content_id != near));

    let req = SearchSimilarRequest::new(axis_vector(0))
        .with_threshold(0.4)
        .with_content_type(Some(ContentType::VoiceRecording));
    let hits = test_db.db.vectors.search(&req).await.unwrap();
    assert!(hits.iter().any(|h| h.content_id == far));
    assert!(hits.iter().all(|h| h.content_id != near));

    test_db.db.vectors.delete_for_content(&near).await.unwrap();
    test_db.db.vectors.delete_for_content(&far).await.unwrap();
}

// =============================================================================
// CONTENT
// =============================================================================

#[tokio::test]
#[ignore]
async fn test_fetch_thought_blob_and_missing() {
    let test_db = connect().await;
    let id = seed_thought_blob(&test_db.pool, "Hope carries us.").await;

    let item = test_db.db.content.fetch(&id).await.unwrap();
    assert_eq!(item.text, "Hope carries us.");
    assert_eq!(item.content_type, ContentType::ThoughtBlob);

    let err = test_db
        .db
        .content
        .fetch(&unique_content_id("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

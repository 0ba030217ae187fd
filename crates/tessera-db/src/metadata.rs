//! Content ↔ vocabulary term tag repository.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use tessera_core::{CatalogTerm, ContentMetadataRecord, Error, MetadataRepository, Result};

/// PostgreSQL implementation of [`MetadataRepository`].
#[derive(Clone)]
pub struct PgMetadataRepository {
    pool: Pool<Postgres>,
}

impl PgMetadataRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert tags within an existing transaction as one statement.
    ///
    /// Pairs that already exist are skipped, so replaying the same batch
    /// leaves the table unchanged.
    pub async fn insert_batch_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        records: &[ContentMetadataRecord],
    ) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut content_ids = Vec::with_capacity(records.len());
        let mut content_types = Vec::with_capacity(records.len());
        let mut term_ids = Vec::with_capacity(records.len());
        let mut confidences = Vec::with_capacity(records.len());

        for record in records {
            content_ids.push(record.content_id.clone());
            content_types.push(record.content_type.as_str().to_string());
            term_ids.push(record.vocabulary_term_id);
            confidences.push(record.confidence);
        }

        let result = sqlx::query(
            "INSERT INTO content_metadata (content_id, content_type, vocabulary_term_id, confidence)
             SELECT * FROM UNNEST($1::text[], $2::text[], $3::uuid[], $4::real[])
             ON CONFLICT (content_id, vocabulary_term_id) DO NOTHING",
        )
        .bind(&content_ids)
        .bind(&content_types)
        .bind(&term_ids)
        .bind(&confidences)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl MetadataRepository for PgMetadataRepository {
    async fn insert_batch(&self, records: &[ContentMetadataRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let inserted = self.insert_batch_tx(&mut tx, records).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "metadata",
            op = "insert_batch",
            record_count = records.len(),
            inserted,
            "Stored content tags"
        );
        Ok(inserted)
    }

    async fn replace_for_content(
        &self,
        content_id: &str,
        records: &[ContentMetadataRecord],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM content_metadata WHERE content_id = $1")
            .bind(content_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        self.insert_batch_tx(&mut tx, records).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn content_ids_for_terms(&self, term_ids: &[Uuid]) -> Result<Vec<String>> {
        if term_ids.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT content_id
             FROM content_metadata
             WHERE vocabulary_term_id = ANY($1)
             ORDER BY content_id",
        )
        .bind(term_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(ids)
    }

    async fn terms_for_content(&self, content_id: &str) -> Result<Vec<CatalogTerm>> {
        let rows = sqlx::query(
            "SELECT cm.vocabulary_term_id, cv.term, cm.confidence
             FROM content_metadata cm
             JOIN controlled_vocabulary cv ON cv.id = cm.vocabulary_term_id
             WHERE cm.content_id = $1
             ORDER BY cm.confidence DESC, cv.term",
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| CatalogTerm {
                term_id: row.get("vocabulary_term_id"),
                term: row.get("term"),
                confidence: row.get("confidence"),
            })
            .collect())
    }
}

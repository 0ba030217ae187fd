//! Chunk embedding storage and cosine similarity search.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;

use tessera_core::{
    ContentType, EmbeddingChunk, Error, Result, SearchSimilarRequest, SimilarContent,
    VectorRepository,
};

/// PostgreSQL implementation of [`VectorRepository`].
#[derive(Clone)]
pub struct PgVectorRepository {
    pool: Pool<Postgres>,
}

impl PgVectorRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Upsert chunks within an existing transaction.
    ///
    /// Rows of `content_id` whose index is at or beyond `chunks.len()` are
    /// removed so a shorter re-chunk leaves no stale tail.
    pub async fn upsert_chunks_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        content_id: &str,
        content_type: ContentType,
        chunks: &[EmbeddingChunk],
    ) -> Result<()> {
        for chunk in chunks {
            sqlx::query(
                "INSERT INTO embeddings
                    (content_id, content_type, chunk_id, chunk_index, chunk_text,
                     embedding, start_position, end_position)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (chunk_id) DO UPDATE SET
                    content_type = EXCLUDED.content_type,
                    chunk_text = EXCLUDED.chunk_text,
                    embedding = EXCLUDED.embedding,
                    start_position = EXCLUDED.start_position,
                    end_position = EXCLUDED.end_position,
                    updated_at = now()",
            )
            .bind(content_id)
            .bind(content_type.as_str())
            .bind(chunk.chunk_id())
            .bind(chunk.chunk_index as i32)
            .bind(&chunk.text)
            .bind(&chunk.vector)
            .bind(chunk.start_position as i64)
            .bind(chunk.end_position as i64)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        }

        sqlx::query("DELETE FROM embeddings WHERE content_id = $1 AND chunk_index >= $2")
            .bind(content_id)
            .bind(chunks.len() as i32)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

        Ok(())
    }
}

#[async_trait]
impl VectorRepository for PgVectorRepository {
    async fn upsert_chunks(
        &self,
        content_id: &str,
        content_type: ContentType,
        chunks: &[EmbeddingChunk],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.upsert_chunks_tx(&mut tx, content_id, content_type, chunks)
            .await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "vectors",
            op = "upsert_chunks",
            content_id,
            chunk_count = chunks.len(),
            "Stored chunk embeddings"
        );
        Ok(())
    }

    async fn search(&self, req: &SearchSimilarRequest) -> Result<Vec<SimilarContent>> {
        let content_type = req.content_type.map(|t| t.as_str());

        let rows = sqlx::query(
            "SELECT content_id, chunk_text, start_position, end_position,
                    (1.0 - (embedding <=> $1::vector))::real AS similarity
             FROM embeddings
             WHERE 1.0 - (embedding <=> $1::vector) >= $2
               AND NOT (content_id = ANY($3))
               AND ($4::text IS NULL OR content_type = $4)
             ORDER BY embedding <=> $1::vector, content_id, chunk_index
             LIMIT $5",
        )
        .bind(&req.vector)
        .bind(req.threshold as f64)
        .bind(&req.exclude_content_ids)
        .bind(content_type)
        .bind(req.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| SimilarContent {
                content_id: row.get("content_id"),
                chunk_text: row.get("chunk_text"),
                similarity: row.get("similarity"),
                start_position: row.get::<i64, _>("start_position") as usize,
                end_position: row.get::<i64, _>("end_position") as usize,
            })
            .collect())
    }

    async fn list_for_content(&self, content_id: &str) -> Result<Vec<EmbeddingChunk>> {
        let rows = sqlx::query(
            "SELECT content_id, chunk_index, chunk_text, embedding, start_position, end_position
             FROM embeddings
             WHERE content_id = $1
             ORDER BY chunk_index",
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| EmbeddingChunk {
                content_id: row.get("content_id"),
                chunk_index: row.get::<i32, _>("chunk_index") as usize,
                text: row.get("chunk_text"),
                vector: row.get::<Vector, _>("embedding"),
                start_position: row.get::<i64, _>("start_position") as usize,
                end_position: row.get::<i64, _>("end_position") as usize,
            })
            .collect())
    }

    async fn delete_for_content(&self, content_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM embeddings WHERE content_id = $1")
            .bind(content_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

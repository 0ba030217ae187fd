//! Controlled vocabulary repository.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tessera_core::{Error, Result, VocabularyRepository, VocabularySet, VocabularyTerm};

/// PostgreSQL implementation of [`VocabularyRepository`].
#[derive(Clone)]
pub struct PgVocabularyRepository {
    pool: Pool<Postgres>,
}

impl PgVocabularyRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn term_from_row(row: &sqlx::postgres::PgRow) -> VocabularyTerm {
    VocabularyTerm {
        id: row.get("id"),
        term: row.get("term"),
        parent_id: row.get("parent_id"),
        synonyms: row.get("synonyms"),
        vocabulary_set_id: row.get("vocabulary_set_id"),
        description: row.get("description"),
    }
}

#[async_trait]
impl VocabularyRepository for PgVocabularyRepository {
    async fn list_terms(&self, vocabulary_set_id: Option<Uuid>) -> Result<Vec<VocabularyTerm>> {
        let rows = sqlx::query(
            "SELECT id, vocabulary_set_id, term, parent_id, synonyms, description
             FROM controlled_vocabulary
             WHERE ($1::uuid IS NULL OR vocabulary_set_id = $1)
             ORDER BY term, id",
        )
        .bind(vocabulary_set_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(term_from_row).collect())
    }

    async fn list_sets(&self) -> Result<Vec<VocabularySet>> {
        let rows = sqlx::query(
            "SELECT id, name, description
             FROM vocabulary_sets
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| VocabularySet {
                id: row.get("id"),
                name: row.get("name"),
                description: row.get("description"),
            })
            .collect())
    }

    async fn count_terms(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM controlled_vocabulary")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }
}

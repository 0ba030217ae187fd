//! Read access to thought blobs and voice recording transcripts.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use tessera_core::{ContentItem, ContentRepository, ContentType, Error, Result};

/// PostgreSQL implementation of [`ContentRepository`].
///
/// Looks up `thought_blobs` first, then `voice_recordings`. A recording
/// without a transcript has nothing to catalog and reads as not found.
#[derive(Clone)]
pub struct PgContentRepository {
    pool: Pool<Postgres>,
}

impl PgContentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn fetch(&self, content_id: &str) -> Result<ContentItem> {
        let blob: Option<String> =
            sqlx::query_scalar("SELECT content FROM thought_blobs WHERE id = $1")
                .bind(content_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;

        if let Some(text) = blob {
            return Ok(ContentItem {
                content_id: content_id.to_string(),
                text,
                content_type: ContentType::ThoughtBlob,
            });
        }

        let transcript: Option<Option<String>> =
            sqlx::query_scalar("SELECT transcript FROM voice_recordings WHERE id = $1")
                .bind(content_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;

        match transcript.flatten() {
            Some(text) => Ok(ContentItem {
                content_id: content_id.to_string(),
                text,
                content_type: ContentType::VoiceRecording,
            }),
            None => Err(Error::NotFound(format!("Content {}", content_id))),
        }
    }
}

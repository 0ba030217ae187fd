//! # tessera-db
//!
//! PostgreSQL + pgvector persistence for tessera.
//!
//! This crate provides:
//! - Connection pool management
//! - Read access to the controlled vocabulary
//! - Content ↔ term tag storage with conflict-tolerant batch inserts
//! - Chunk embedding storage and cosine similarity search
//! - Read access to thought blobs and voice recording transcripts
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_db::{Database, VocabularyRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/tessera").await?;
//!     let terms = db.vocabulary.list_terms(None).await?;
//!     println!("{} vocabulary terms", terms.len());
//!     Ok(())
//! }
//! ```

pub mod content;
pub mod metadata;
pub mod pool;
pub mod test_fixtures;
pub mod vectors;
pub mod vocabulary;

// Re-export core types
pub use tessera_core::*;

pub use content::PgContentRepository;
pub use metadata::PgMetadataRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use vectors::PgVectorRepository;
pub use vocabulary::PgVocabularyRepository;

/// Database handle bundling the pool and every repository.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub vocabulary: PgVocabularyRepository,
    pub metadata: PgMetadataRepository,
    pub vectors: PgVectorRepository,
    pub content: PgContentRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            vocabulary: PgVocabularyRepository::new(pool.clone()),
            metadata: PgMetadataRepository::new(pool.clone()),
            vectors: PgVectorRepository::new(pool.clone()),
            content: PgContentRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

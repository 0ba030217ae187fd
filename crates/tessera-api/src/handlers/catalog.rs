//! Cataloging and vocabulary endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use tessera_core::{CatalogResult, CatalogTerm, ContentType, VocabularyNode, VocabularySet};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizeRequest {
    pub content_id: Option<String>,
    pub content: Option<String>,
    pub content_type: Option<ContentType>,
    pub vocabulary_set_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizeResponse {
    pub content_id: String,
    pub terms: Vec<CatalogTerm>,
    /// Whether chunk embeddings were stored.
    pub embedding: bool,
}

impl From<CatalogResult> for CategorizeResponse {
    fn from(result: CatalogResult) -> Self {
        Self {
            content_id: result.content_id,
            terms: result.terms,
            embedding: result.embedding_generated,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyQuery {
    pub vocabulary_set_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyResponse {
    pub vocabulary_sets: Vec<VocabularySet>,
    pub terms: Vec<VocabularyNode>,
}

/// Catalog one content item.
pub async fn categorize(
    State(state): State<AppState>,
    body: Result<Json<CategorizeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let content_id = body
        .content_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("contentId and content are required"))?;
    let content = body
        .content
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("contentId and content are required"))?;
    let content_type = body.content_type.unwrap_or_default();

    let result = state
        .orchestrator
        .categorize(&content_id, &content, content_type, body.vocabulary_set_id)
        .await?;

    Ok(Json(CategorizeResponse::from(result)))
}

/// Re-run the pipeline on the stored text of a content item.
pub async fn recatalog(
    State(state): State<AppState>,
    Path(content_id): Path<String>,
    Query(query): Query<VocabularyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .orchestrator
        .recatalog(&content_id, query.vocabulary_set_id)
        .await?;

    info!(
        content_id = %result.content_id,
        result_count = result.terms.len(),
        "Content recataloged"
    );
    Ok(Json(CategorizeResponse::from(result)))
}

/// Vocabulary sets plus the nested term forest.
pub async fn vocabulary(
    State(state): State<AppState>,
    Query(query): Query<VocabularyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let vocabulary_sets = state.vocabulary.list_sets().await?;
    let terms = state
        .orchestrator
        .matcher()
        .vocabulary_forest(query.vocabulary_set_id)
        .await?;

    Ok(Json(VocabularyResponse {
        vocabulary_sets,
        terms,
    }))
}

//! Content discovery and embedding maintenance endpoints.

use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use tessera_catalog::VocabularyTree;
use tessera_core::{defaults, ContentType, SimilarContent};

use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuery {
    /// Comma-separated vocabulary term names.
    pub tags: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub content_type: Option<ContentType>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQueryResponse {
    pub content_ids: Vec<String>,
    /// Matching chunks, best first. Empty for tag-only queries.
    pub results: Vec<SimilarContent>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprocessResponse {
    pub content_id: String,
    pub chunk_count: usize,
}

fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Find content by tag (hierarchy-expanded) and/or semantic search.
///
/// With both filters, search hits are restricted to tagged content, drawn
/// from a candidate pool of at least `TAGGED_SEARCH_LIMIT` hits. Tag names
/// that match no vocabulary term match no content.
pub async fn query_content(
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let tags = query.tags.as_deref().map(parse_tags).unwrap_or_default();
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if tags.is_empty() && search.is_none() {
        return Err(ApiError::bad_request("tags or search is required"));
    }
    if matches!(query.limit, Some(l) if l < 1) {
        return Err(ApiError::bad_request("limit must be at least 1"));
    }

    let tagged: Option<Vec<String>> = if tags.is_empty() {
        None
    } else {
        let tree = VocabularyTree::from_terms(state.vocabulary.list_terms(None).await?);
        let term_ids: Vec<Uuid> = tags
            .iter()
            .filter_map(|name| tree.find_by_name(name).map(|t| t.id))
            .collect();
        debug!(
            tag_count = tags.len(),
            resolved = term_ids.len(),
            "Tag names resolved"
        );
        Some(
            state
                .orchestrator
                .metadata()
                .filter_by_terms(&term_ids)
                .await?,
        )
    };

    let response = match (search, tagged) {
        (Some(q), tagged) => {
            let pipeline = state.orchestrator.pipeline();
            let limit = query.limit.unwrap_or(pipeline.config().search_limit);
            let search_limit = if tagged.is_some() {
                limit.max(defaults::TAGGED_SEARCH_LIMIT)
            } else {
                limit
            };

            let mut results = pipeline
                .search_text(q, Some(search_limit), query.content_type)
                .await?;
            if let Some(ids) = tagged {
                let allowed: HashSet<String> = ids.into_iter().collect();
                results.retain(|hit| allowed.contains(&hit.content_id));
            }
            results.truncate(limit as usize);

            let mut seen = HashSet::new();
            let content_ids = results
                .iter()
                .filter(|hit| seen.insert(hit.content_id.clone()))
                .map(|hit| hit.content_id.clone())
                .collect();
            ContentQueryResponse {
                content_ids,
                results,
            }
        }
        (None, tagged) => {
            let mut content_ids = tagged.unwrap_or_default();
            if let Some(limit) = query.limit {
                content_ids.truncate(limit as usize);
            }
            ContentQueryResponse {
                content_ids,
                results: Vec::new(),
            }
        }
    };

    Ok(Json(response))
}

/// Rebuild the chunk embeddings of a content item from its stored text.
pub async fn reprocess(
    State(state): State<AppState>,
    Path(content_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let chunk_count = state
        .orchestrator
        .pipeline()
        .reprocess_content(&content_id)
        .await?;

    Ok(Json(ReprocessResponse {
        content_id,
        chunk_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags(" hope, grief ,,"), vec!["hope", "grief"]);
        assert!(parse_tags(" , ").is_empty());
    }
}

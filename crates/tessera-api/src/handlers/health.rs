//! Health check.

use axum::{extract::State, response::IntoResponse, Json};
use tracing::warn;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let inference = match state.inference.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            warn!(error = %e, "Inference health check failed");
            false
        }
    };
    let vocabulary_terms = match state.vocabulary.count_terms().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Vocabulary count failed");
            None
        }
    };

    let status = if inference && vocabulary_terms.is_some() {
        "healthy"
    } else {
        "degraded"
    };

    Json(serde_json::json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "inference": inference,
        "vocabularyTerms": vocabulary_terms,
    }))
}

//! # tessera-api
//!
//! HTTP surface for the tessera cataloging pipeline.
//!
//! The binary in `main.rs` wires PostgreSQL and OpenAI collaborators into an
//! [`AppState`]; tests build the same router over in-memory repositories.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    http::Request,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use tessera_catalog::CatalogOrchestrator;
use tessera_core::{InferenceBackend, VocabularyRepository};

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: CatalogOrchestrator,
    pub vocabulary: Arc<dyn VocabularyRepository>,
    /// Used by `/health` only; the pipeline holds its own handles.
    pub inference: Arc<dyn InferenceBackend>,
}

/// Request ids are time-ordered UUIDv7 values.
#[derive(Clone, Copy, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v1/catalog/categorize",
            post(handlers::catalog::categorize),
        )
        .route(
            "/api/v1/catalog/recatalog/:content_id",
            post(handlers::catalog::recatalog),
        )
        .route(
            "/api/v1/catalog/vocabulary",
            get(handlers::catalog::vocabulary),
        )
        .route(
            "/api/v1/embeddings/reprocess/:content_id",
            post(handlers::content::reprocess),
        )
        .route("/api/v1/content", get(handlers::content::query_content))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

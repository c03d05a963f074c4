//! Request routing: the one document path, everything else from disk.

use crate::render::RenderedDocument;
use crate::server::NOT_FOUND_BODY;
use crate::server::artifact::TemporaryArtifact;

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::handler::HandlerWithoutStateExt;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use log::{debug, warn};
use tokio::sync::watch;
use tower_http::services::ServeDir;

/// Where the primary handler gets the document from.
#[derive(Clone)]
pub(crate) enum DocumentSource {
    Memory(RenderedDocument),
    TempFile(Arc<TemporaryArtifact>),
}

#[derive(Clone)]
pub(crate) struct ServeState {
    source: DocumentSource,
    fetched: Arc<watch::Sender<bool>>,
}

impl ServeState {
    pub(crate) fn new(source: DocumentSource, fetched: watch::Sender<bool>) -> Self {
        Self {
            source,
            fetched: Arc::new(fetched),
        }
    }
}

/// Router serving `served_path` from `state` and the rest from `working_directory`.
pub(crate) fn router(served_path: &str, working_directory: &Path, state: ServeState) -> Router {
    let static_files =
        ServeDir::new(working_directory).not_found_service(not_found.into_service());

    Router::new()
        .route(served_path, get(serve_document))
        .with_state(state)
        .fallback_service(static_files)
}

async fn serve_document(State(state): State<ServeState>) -> Response {
    let body = match &state.source {
        DocumentSource::Memory(document) => document.to_string(),
        DocumentSource::TempFile(artifact) => match artifact.consume().await {
            Some(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Some(Err(e)) => {
                warn!("Failed to read temporary document: {e}");
                return not_found().await.into_response();
            }
            None => {
                debug!("Temporary document already served");
                return not_found().await.into_response();
            }
        },
    };

    state.fetched.send_replace(true);
    Html(body).into_response()
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

//! HTTP front-end serving pages as JSON

use anyhow::Result;
use axum::{
    extract::{Path as UrlPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::cache::{ContentStore, MissingResource, StoreError};
use crate::content::PageError;
use crate::JsonPages;

/// Request failures, mapped onto HTTP statuses
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Page not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Page(#[from] PageError),

    #[error("Request worker failed")]
    Worker(#[from] tokio::task::JoinError),
}

impl MissingResource for HttpError {
    fn missing(path: &str, _cause: StoreError) -> Self {
        HttpError::NotFound(path.to_string())
    }
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{:#}", anyhow::Error::from(self));
            return (status, Json(json!({ "error": "internal server error" }))).into_response();
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the router over a shared store
pub fn router(store: Arc<ContentStore>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/*path", get(page_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Start the server
pub async fn start(app: &JsonPages, ip: &str, port: u16, watch: bool) -> Result<()> {
    let router = router(Arc::clone(&app.store));

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    tracing::info!("Serving pages from {:?}", app.root_dir);
    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    if watch {
        let root_dir = app.root_dir.clone();
        let store = Arc::clone(&app.store);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_invalidate(root_dir, store) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

async fn index_handler(
    State(store): State<Arc<ContentStore>>,
) -> Result<Json<Map<String, Value>>, HttpError> {
    serve(store, String::new()).await
}

async fn page_handler(
    State(store): State<Arc<ContentStore>>,
    UrlPath(path): UrlPath<String>,
) -> Result<Json<Map<String, Value>>, HttpError> {
    serve(store, path).await
}

/// Run the blocking lookup off the async workers
async fn serve(store: Arc<ContentStore>, path: String) -> Result<Json<Map<String, Value>>, HttpError> {
    tokio::task::spawn_blocking(move || page_json(&store, &path)).await?
}

fn page_json(store: &ContentStore, path: &str) -> Result<Json<Map<String, Value>>, HttpError> {
    let page = store.get_or_fail::<HttpError>(path)?;
    Ok(Json(page.content()?.clone()))
}

/// Drop cached pages as soon as their files change, instead of waiting for
/// the next lookup to notice a new mtime
fn watch_and_invalidate(root_dir: PathBuf, store: Arc<ContentStore>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(200), tx)?;
    debouncer
        .watcher()
        .watch(&root_dir, RecursiveMode::Recursive)?;
    tracing::debug!("Watching: {:?}", root_dir);

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                for event in events {
                    if store.invalidate_file(&event.path) {
                        tracing::info!("Page changed: {}", event.path.display());
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

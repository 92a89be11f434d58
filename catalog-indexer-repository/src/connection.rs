//! Process-wide shared connection to the search engine.
//!
//! The handle is created lazily on first use, reused by every subsequent
//! caller, and closed explicitly at process shutdown. Initialization is
//! single-flight: concurrent first-use requests wait on the same guard
//! instead of racing to create duplicate connections.

use std::env;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use crate::opensearch::OpenSearchClient;

/// Environment variable naming the search engine URL.
pub const OPENSEARCH_URL_VAR: &str = "OPENSEARCH_URL";

/// Default search engine URL when the environment does not name one.
pub const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

static SHARED: Mutex<Option<Arc<OpenSearchClient>>> = Mutex::const_new(None);

/// Get the shared engine client, creating and verifying it on first use.
///
/// The URL is read from `OPENSEARCH_URL` (default `http://localhost:9200`).
/// The first caller pings the engine before the handle is published; an
/// unreachable engine surfaces as [`SearchError::ConnectionError`] and
/// leaves the slot empty so a later call can retry.
pub async fn shared_client() -> Result<Arc<OpenSearchClient>, SearchError> {
    let mut slot = SHARED.lock().await;

    if let Some(client) = slot.as_ref() {
        return Ok(Arc::clone(client));
    }

    let url = env::var(OPENSEARCH_URL_VAR).unwrap_or_else(|_| DEFAULT_OPENSEARCH_URL.to_string());
    let client = Arc::new(OpenSearchClient::new(&url)?);

    if !client.health_check().await? {
        return Err(SearchError::connection(format!(
            "search engine at {} did not answer ping",
            url
        )));
    }

    info!(url = %url, "Connected to search engine");
    *slot = Some(Arc::clone(&client));
    Ok(client)
}

/// Drop the shared engine client.
///
/// Callers still holding an `Arc` keep a working handle; the next call to
/// [`shared_client`] establishes a fresh connection.
pub async fn close_shared_client() {
    let mut slot = SHARED.lock().await;
    if slot.take().is_some() {
        info!("Closed shared search engine connection");
    }
}

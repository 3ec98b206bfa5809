use std::sync::Arc;

use sqlx::SqlitePool;

use crate::agent::llm::LlmClient;
use crate::agent::search::SearchClient;
use crate::document::DocumentStore;

/// Shared handles, cloned per request. The model and search clients
/// are built once at startup from the configuration and reused;
/// pipeline invocations carry no state of their own.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub documents: DocumentStore,
    pub llm: Arc<LlmClient>,
    pub search: Arc<SearchClient>,
}

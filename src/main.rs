mod agent;
mod config;
mod db;
mod document;
mod error;
mod models;
mod routes;
mod state;

use std::sync::Arc;

use axum::http::{HeaderName, Request};
use config::Config;
use document::DocumentStore;
use sqlx::sqlite::SqlitePoolOptions;
use state::AppState;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    // Provider credentials are required up front; a missing value is a
    // startup failure, not a per-request one.
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    std::fs::create_dir_all(&config.data_dir)?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await?;
    db::init_db(&pool).await?;

    let bind_addr = config.bind.parse().map_err(|_| "invalid WHITEBOARD_BIND")?;

    let llm = Arc::new(agent::llm::LlmClient::new(&config)?);
    let search = Arc::new(agent::search::SearchClient::new(&config)?);
    let documents = DocumentStore::new(&config.data_dir);

    let state = AppState {
        pool,
        documents,
        llm,
        search,
    };

    let trace_layer = TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
        let request_id = req
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "http",
            method = %req.method(),
            uri = %req.uri(),
            request_id = %request_id
        )
    });

    // Last layer is outermost: the request id must be set before the trace
    // span captures it.
    let app = routes::router(state)
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(trace_layer)
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid));

    tracing::info!("Whiteboard server listening on {}", bind_addr);
    axum::Server::bind(&bind_addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

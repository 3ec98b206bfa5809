pub mod edge;
pub mod node;
pub mod whiteboard;

use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/whiteboard/create", post(whiteboard::create))
        .route("/whiteboard/all", get(whiteboard::list))
        .route("/whiteboard/:whiteboard_id", get(whiteboard::fetch))
        .route("/whiteboard/:whiteboard_id/update", post(whiteboard::update))
        .route("/whiteboard/:whiteboard_id/delete", post(whiteboard::delete))
        .route(
            "/whiteboard/:whiteboard_id/questions",
            post(whiteboard::related_questions),
        )
        .route(
            "/whiteboard/:whiteboard_id/insights",
            post(whiteboard::related_insights),
        )
        .route("/whiteboard/:whiteboard_id/answer", post(whiteboard::answer))
        .route(
            "/whiteboard/:whiteboard_id/answer/stream",
            post(whiteboard::answer_stream),
        )
        .route("/whiteboard/:whiteboard_id/search", post(whiteboard::search))
        .route("/node/create", post(node::create))
        .route("/node/:node_id", get(node::fetch))
        .route("/node/:node_id/update", post(node::update))
        .route("/node/:node_id/delete", post(node::delete))
        .route("/node/all/:whiteboard_id", get(node::list))
        .route("/edge/create", post(edge::create))
        .route("/edge/:edge_id", get(edge::fetch))
        .route("/edge/:edge_id/update", post(edge::update))
        .route("/edge/:edge_id/delete", post(edge::delete))
        .route("/edge/all/:whiteboard_id", get(edge::list))
        .with_state(state)
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

use axum::extract::{Json, Path, State};
use serde_json::json;

use crate::db::{self, EdgeRecord};
use crate::error::AppError;
use crate::models::{CreateEdgeRequest, EdgeListResponse, UpdateEdgeRequest};
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateEdgeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let whiteboard_id = payload
        .whiteboard_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("whiteboard_id is required".to_string()))?;
    let source_id = payload
        .source_id
        .ok_or_else(|| AppError::BadRequest("source_id is required".to_string()))?;
    let target_id = payload
        .target_id
        .ok_or_else(|| AppError::BadRequest("target_id is required".to_string()))?;

    if db::get_node(&state.pool, source_id).await?.is_none()
        || db::get_node(&state.pool, target_id).await?.is_none()
    {
        return Err(AppError::NotFound);
    }

    let edge_id = db::create_edge(
        &state.pool,
        whiteboard_id,
        source_id,
        target_id,
        payload.extra_metadata,
        payload.ui_attributes,
    )
    .await?;

    Ok(Json(json!({ "id": edge_id })))
}

pub async fn fetch(
    State(state): State<AppState>,
    Path(edge_id): Path<i64>,
) -> Result<Json<EdgeRecord>, AppError> {
    let edge = db::get_edge(&state.pool, edge_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(edge))
}

pub async fn update(
    State(state): State<AppState>,
    Path(edge_id): Path<i64>,
    Json(payload): Json<UpdateEdgeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let found = db::update_edge(
        &state.pool,
        edge_id,
        payload.extra_metadata,
        payload.ui_attributes,
    )
    .await?;
    if !found {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({ "id": edge_id })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(edge_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !db::delete_edge(&state.pool, edge_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({ "id": edge_id })))
}

pub async fn list(
    State(state): State<AppState>,
    Path(whiteboard_id): Path<String>,
) -> Result<Json<EdgeListResponse>, AppError> {
    let edges = db::list_edges(&state.pool, &whiteboard_id).await?;
    Ok(Json(EdgeListResponse { edges }))
}

use axum::extract::{Json, Path, State};
use serde_json::json;

use crate::db::{self, NodeRecord};
use crate::error::AppError;
use crate::models::{CreateNodeRequest, NodeListResponse, UpdateNodeRequest};
use crate::state::AppState;

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            tracing::error!("{} is required", field);
            AppError::BadRequest(format!("{} is required", field))
        })
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateNodeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let whiteboard_id = required(&payload.whiteboard_id, "whiteboard_id")?;
    let content = required(&payload.content, "content")?;
    let status = required(&payload.status, "status")?;
    let created_by = required(&payload.created_by, "created_by")?;

    if db::get_whiteboard(&state.pool, whiteboard_id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let node_id = db::create_node(
        &state.pool,
        whiteboard_id,
        content,
        status,
        created_by,
        payload.extra_metadata,
        payload.ui_attributes,
    )
    .await?;

    Ok(Json(json!({ "id": node_id })))
}

pub async fn fetch(
    State(state): State<AppState>,
    Path(node_id): Path<i64>,
) -> Result<Json<NodeRecord>, AppError> {
    let node = db::get_node(&state.pool, node_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(node))
}

pub async fn update(
    State(state): State<AppState>,
    Path(node_id): Path<i64>,
    Json(payload): Json<UpdateNodeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let content = required(&payload.content, "content")?;
    let status = required(&payload.status, "status")?;

    let found = db::update_node(
        &state.pool,
        node_id,
        content,
        status,
        payload.extra_metadata,
        payload.ui_attributes,
    )
    .await?;
    if !found {
        return Err(AppError::NotFound);
    }

    Ok(Json(json!({ "id": node_id })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(node_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !db::delete_node(&state.pool, node_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({ "id": node_id })))
}

pub async fn list(
    State(state): State<AppState>,
    Path(whiteboard_id): Path<String>,
) -> Result<Json<NodeListResponse>, AppError> {
    let nodes = db::list_nodes(&state.pool, &whiteboard_id).await?;
    Ok(Json(NodeListResponse { nodes }))
}

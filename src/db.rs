//! Relational store for whiteboard, node and edge records.
//!
//! Rows are soft-deleted: `deleted_at` is set instead of removing the
//! row, reads filter on `deleted_at IS NULL`, and deleting a
//! whiteboard (or node) cascades the soft delete to everything that
//! hangs off it.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct WhiteboardRecord {
    pub id: String,
    pub name: String,
    pub extra_metadata: Value,
    pub ui_attributes: Value,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeRecord {
    pub id: i64,
    pub whiteboard_id: String,
    pub content: String,
    pub status: String,
    pub created_by: String,
    pub extra_metadata: Value,
    pub ui_attributes: Value,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeRecord {
    pub id: i64,
    pub whiteboard_id: String,
    pub source_id: i64,
    pub target_id: i64,
    pub extra_metadata: Value,
    pub ui_attributes: Value,
    pub created_at: i64,
    pub updated_at: i64,
}

pub async fn init_db(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS whiteboards (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            extra_metadata TEXT NOT NULL DEFAULT '{}',
            ui_attributes TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER
        );
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create whiteboards table: {}", e)))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS nodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            whiteboard_id TEXT NOT NULL,
            content TEXT NOT NULL,
            status TEXT NOT NULL,
            created_by TEXT NOT NULL,
            extra_metadata TEXT NOT NULL DEFAULT '{}',
            ui_attributes TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER
        );
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create nodes table: {}", e)))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS edges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            whiteboard_id TEXT NOT NULL,
            source_id INTEGER NOT NULL,
            target_id INTEGER NOT NULL,
            extra_metadata TEXT NOT NULL DEFAULT '{}',
            ui_attributes TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER
        );
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create edges table: {}", e)))?;

    Ok(())
}

fn decode_json(raw: String, column: &str) -> Result<Value, AppError> {
    serde_json::from_str(&raw)
        .map_err(|e| AppError::Internal(format!("decode {} column: {}", column, e)))
}

fn encode_json(value: &Option<Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "{}".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Whiteboards

pub async fn create_whiteboard(
    pool: &SqlitePool,
    id: Option<String>,
    name: &str,
    ui_attributes: Option<Value>,
) -> Result<String, AppError> {
    let whiteboard_id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let now = Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO whiteboards (id, name, extra_metadata, ui_attributes, created_at, updated_at)
        VALUES (?1, ?2, '{}', ?3, ?4, ?4);
        "#,
    )
    .bind(&whiteboard_id)
    .bind(name)
    .bind(encode_json(&ui_attributes))
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create whiteboard: {}", e)))?;

    Ok(whiteboard_id)
}

pub async fn get_whiteboard(
    pool: &SqlitePool,
    whiteboard_id: &str,
) -> Result<Option<WhiteboardRecord>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT id, name, extra_metadata, ui_attributes, created_at, updated_at
        FROM whiteboards
        WHERE id = ?1 AND deleted_at IS NULL;
        "#,
    )
    .bind(whiteboard_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Internal(format!("query whiteboard: {}", e)))?;

    row.map(whiteboard_from_row).transpose()
}

pub async fn list_whiteboards(pool: &SqlitePool) -> Result<Vec<WhiteboardRecord>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, extra_metadata, ui_attributes, created_at, updated_at
        FROM whiteboards
        WHERE deleted_at IS NULL
        ORDER BY created_at DESC;
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Internal(format!("list whiteboards: {}", e)))?;

    rows.into_iter().map(whiteboard_from_row).collect()
}

fn whiteboard_from_row(row: sqlx::sqlite::SqliteRow) -> Result<WhiteboardRecord, AppError> {
    Ok(WhiteboardRecord {
        id: row.get("id"),
        name: row.get("name"),
        extra_metadata: decode_json(row.get("extra_metadata"), "extra_metadata")?,
        ui_attributes: decode_json(row.get("ui_attributes"), "ui_attributes")?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

pub async fn update_whiteboard(
    pool: &SqlitePool,
    whiteboard_id: &str,
    name: Option<&str>,
    ui_attributes: Option<Value>,
) -> Result<bool, AppError> {
    let now = Utc::now().timestamp();

    if let Some(name) = name {
        let result = sqlx::query(
            r#"
            UPDATE whiteboards SET name = ?2, updated_at = ?3
            WHERE id = ?1 AND deleted_at IS NULL;
            "#,
        )
        .bind(whiteboard_id)
        .bind(name)
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| AppError::Internal(format!("update whiteboard name: {}", e)))?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
    }

    if let Some(ui_attributes) = ui_attributes {
        let result = sqlx::query(
            r#"
            UPDATE whiteboards SET ui_attributes = ?2, updated_at = ?3
            WHERE id = ?1 AND deleted_at IS NULL;
            "#,
        )
        .bind(whiteboard_id)
        .bind(ui_attributes.to_string())
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| AppError::Internal(format!("update whiteboard ui: {}", e)))?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Bumps `updated_at` after a document full-replace write.
pub async fn touch_whiteboard(pool: &SqlitePool, whiteboard_id: &str) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE whiteboards SET updated_at = ?2
        WHERE id = ?1 AND deleted_at IS NULL;
        "#,
    )
    .bind(whiteboard_id)
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("touch whiteboard: {}", e)))?;
    Ok(result.rows_affected() > 0)
}

/// Soft-deletes the whiteboard and cascades to its nodes and edges.
pub async fn delete_whiteboard(pool: &SqlitePool, whiteboard_id: &str) -> Result<bool, AppError> {
    let now = Utc::now().timestamp();

    let result = sqlx::query(
        r#"
        UPDATE whiteboards SET deleted_at = ?2, updated_at = ?2
        WHERE id = ?1 AND deleted_at IS NULL;
        "#,
    )
    .bind(whiteboard_id)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("delete whiteboard: {}", e)))?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query(
        r#"
        UPDATE nodes SET deleted_at = ?2, updated_at = ?2
        WHERE whiteboard_id = ?1 AND deleted_at IS NULL;
        "#,
    )
    .bind(whiteboard_id)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("cascade delete nodes: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE edges SET deleted_at = ?2, updated_at = ?2
        WHERE whiteboard_id = ?1 AND deleted_at IS NULL;
        "#,
    )
    .bind(whiteboard_id)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("cascade delete edges: {}", e)))?;

    Ok(true)
}

// ---------------------------------------------------------------------------
// Nodes

#[allow(clippy::too_many_arguments)]
pub async fn create_node(
    pool: &SqlitePool,
    whiteboard_id: &str,
    content: &str,
    status: &str,
    created_by: &str,
    extra_metadata: Option<Value>,
    ui_attributes: Option<Value>,
) -> Result<i64, AppError> {
    let now = Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        INSERT INTO nodes (whiteboard_id, content, status, created_by,
                           extra_metadata, ui_attributes, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);
        "#,
    )
    .bind(whiteboard_id)
    .bind(content)
    .bind(status)
    .bind(created_by)
    .bind(encode_json(&extra_metadata))
    .bind(encode_json(&ui_attributes))
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create node: {}", e)))?;

    Ok(result.last_insert_rowid())
}

pub async fn get_node(pool: &SqlitePool, node_id: i64) -> Result<Option<NodeRecord>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT id, whiteboard_id, content, status, created_by,
               extra_metadata, ui_attributes, created_at, updated_at
        FROM nodes
        WHERE id = ?1 AND deleted_at IS NULL;
        "#,
    )
    .bind(node_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Internal(format!("query node: {}", e)))?;

    row.map(node_from_row).transpose()
}

pub async fn list_nodes(
    pool: &SqlitePool,
    whiteboard_id: &str,
) -> Result<Vec<NodeRecord>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT id, whiteboard_id, content, status, created_by,
               extra_metadata, ui_attributes, created_at, updated_at
        FROM nodes
        WHERE whiteboard_id = ?1 AND deleted_at IS NULL
        ORDER BY updated_at ASC, id ASC;
        "#,
    )
    .bind(whiteboard_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Internal(format!("list nodes: {}", e)))?;

    rows.into_iter().map(node_from_row).collect()
}

fn node_from_row(row: sqlx::sqlite::SqliteRow) -> Result<NodeRecord, AppError> {
    Ok(NodeRecord {
        id: row.get("id"),
        whiteboard_id: row.get("whiteboard_id"),
        content: row.get("content"),
        status: row.get("status"),
        created_by: row.get("created_by"),
        extra_metadata: decode_json(row.get("extra_metadata"), "extra_metadata")?,
        ui_attributes: decode_json(row.get("ui_attributes"), "ui_attributes")?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

pub async fn update_node(
    pool: &SqlitePool,
    node_id: i64,
    content: &str,
    status: &str,
    extra_metadata: Option<Value>,
    ui_attributes: Option<Value>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE nodes
        SET content = ?2, status = ?3, extra_metadata = ?4, ui_attributes = ?5, updated_at = ?6
        WHERE id = ?1 AND deleted_at IS NULL;
        "#,
    )
    .bind(node_id)
    .bind(content)
    .bind(status)
    .bind(encode_json(&extra_metadata))
    .bind(encode_json(&ui_attributes))
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("update node: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

/// Soft-deletes the node and every edge touching it.
pub async fn delete_node(pool: &SqlitePool, node_id: i64) -> Result<bool, AppError> {
    let now = Utc::now().timestamp();

    let result = sqlx::query(
        r#"
        UPDATE nodes SET deleted_at = ?2, updated_at = ?2
        WHERE id = ?1 AND deleted_at IS NULL;
        "#,
    )
    .bind(node_id)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("delete node: {}", e)))?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query(
        r#"
        UPDATE edges SET deleted_at = ?2, updated_at = ?2
        WHERE (source_id = ?1 OR target_id = ?1) AND deleted_at IS NULL;
        "#,
    )
    .bind(node_id)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("cascade delete node edges: {}", e)))?;

    Ok(true)
}

// ---------------------------------------------------------------------------
// Edges

pub async fn create_edge(
    pool: &SqlitePool,
    whiteboard_id: &str,
    source_id: i64,
    target_id: i64,
    extra_metadata: Option<Value>,
    ui_attributes: Option<Value>,
) -> Result<i64, AppError> {
    let now = Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        INSERT INTO edges (whiteboard_id, source_id, target_id,
                           extra_metadata, ui_attributes, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6);
        "#,
    )
    .bind(whiteboard_id)
    .bind(source_id)
    .bind(target_id)
    .bind(encode_json(&extra_metadata))
    .bind(encode_json(&ui_attributes))
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create edge: {}", e)))?;

    Ok(result.last_insert_rowid())
}

pub async fn get_edge(pool: &SqlitePool, edge_id: i64) -> Result<Option<EdgeRecord>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT id, whiteboard_id, source_id, target_id,
               extra_metadata, ui_attributes, created_at, updated_at
        FROM edges
        WHERE id = ?1 AND deleted_at IS NULL;
        "#,
    )
    .bind(edge_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Internal(format!("query edge: {}", e)))?;

    row.map(edge_from_row).transpose()
}

pub async fn list_edges(
    pool: &SqlitePool,
    whiteboard_id: &str,
) -> Result<Vec<EdgeRecord>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT id, whiteboard_id, source_id, target_id,
               extra_metadata, ui_attributes, created_at, updated_at
        FROM edges
        WHERE whiteboard_id = ?1 AND deleted_at IS NULL
        ORDER BY id ASC;
        "#,
    )
    .bind(whiteboard_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Internal(format!("list edges: {}", e)))?;

    rows.into_iter().map(edge_from_row).collect()
}

fn edge_from_row(row: sqlx::sqlite::SqliteRow) -> Result<EdgeRecord, AppError> {
    Ok(EdgeRecord {
        id: row.get("id"),
        whiteboard_id: row.get("whiteboard_id"),
        source_id: row.get("source_id"),
        target_id: row.get("target_id"),
        extra_metadata: decode_json(row.get("extra_metadata"), "extra_metadata")?,
        ui_attributes: decode_json(row.get("ui_attributes"), "ui_attributes")?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

pub async fn update_edge(
    pool: &SqlitePool,
    edge_id: i64,
    extra_metadata: Option<Value>,
    ui_attributes: Option<Value>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE edges
        SET extra_metadata = ?2, ui_attributes = ?3, updated_at = ?4
        WHERE id = ?1 AND deleted_at IS NULL;
        "#,
    )
    .bind(edge_id)
    .bind(encode_json(&extra_metadata))
    .bind(encode_json(&ui_attributes))
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("update edge: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_edge(pool: &SqlitePool, edge_id: i64) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE edges SET deleted_at = ?2, updated_at = ?2
        WHERE id = ?1 AND deleted_at IS NULL;
        "#,
    )
    .bind(edge_id)
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("delete edge: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        // A single connection so every query sees the same in-memory db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("connect in-memory sqlite");
        init_db(&pool).await.expect("init schema");
        pool
    }

    #[tokio::test]
    async fn whiteboard_create_and_fetch() {
        let pool = test_pool().await;
        let id = create_whiteboard(&pool, None, "travel plans", None)
            .await
            .expect("create");

        let record = get_whiteboard(&pool, &id)
            .await
            .expect("query")
            .expect("present");
        assert_eq!(record.name, "travel plans");
        assert_eq!(record.ui_attributes, serde_json::json!({}));
    }

    #[tokio::test]
    async fn delete_whiteboard_cascades_to_nodes_and_edges() {
        let pool = test_pool().await;
        let wb = create_whiteboard(&pool, None, "board", None)
            .await
            .expect("create whiteboard");
        let n1 = create_node(&pool, &wb, "hi", "active", "user", None, None)
            .await
            .expect("create node");
        let n2 = create_node(&pool, &wb, "there", "active", "agent", None, None)
            .await
            .expect("create node");
        let edge = create_edge(&pool, &wb, n1, n2, None, None)
            .await
            .expect("create edge");

        assert!(delete_whiteboard(&pool, &wb).await.expect("delete"));

        assert!(get_whiteboard(&pool, &wb).await.expect("query").is_none());
        assert!(get_node(&pool, n1).await.expect("query").is_none());
        assert!(get_node(&pool, n2).await.expect("query").is_none());
        assert!(get_edge(&pool, edge).await.expect("query").is_none());

        // Second delete finds nothing left to delete.
        assert!(!delete_whiteboard(&pool, &wb).await.expect("redelete"));
    }

    #[tokio::test]
    async fn delete_node_cascades_to_touching_edges() {
        let pool = test_pool().await;
        let wb = create_whiteboard(&pool, None, "board", None)
            .await
            .expect("create whiteboard");
        let n1 = create_node(&pool, &wb, "a", "active", "user", None, None)
            .await
            .expect("node");
        let n2 = create_node(&pool, &wb, "b", "active", "user", None, None)
            .await
            .expect("node");
        let n3 = create_node(&pool, &wb, "c", "active", "user", None, None)
            .await
            .expect("node");
        let touching = create_edge(&pool, &wb, n1, n2, None, None)
            .await
            .expect("edge");
        let unrelated = create_edge(&pool, &wb, n2, n3, None, None)
            .await
            .expect("edge");

        assert!(delete_node(&pool, n1).await.expect("delete"));

        assert!(get_edge(&pool, touching).await.expect("query").is_none());
        assert!(get_edge(&pool, unrelated).await.expect("query").is_some());
    }

    #[tokio::test]
    async fn list_nodes_orders_by_update_time_then_insertion() {
        let pool = test_pool().await;
        let wb = create_whiteboard(&pool, None, "board", None)
            .await
            .expect("create whiteboard");
        let first = create_node(&pool, &wb, "first", "active", "user", None, None)
            .await
            .expect("node");
        let second = create_node(&pool, &wb, "second", "active", "user", None, None)
            .await
            .expect("node");

        let nodes = list_nodes(&pool, &wb).await.expect("list");
        let ids: Vec<i64> = nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn update_edge_replaces_metadata() {
        let pool = test_pool().await;
        let wb = create_whiteboard(&pool, None, "board", None)
            .await
            .expect("create whiteboard");
        let n1 = create_node(&pool, &wb, "a", "active", "user", None, None)
            .await
            .expect("node");
        let n2 = create_node(&pool, &wb, "b", "active", "user", None, None)
            .await
            .expect("node");
        let edge = create_edge(&pool, &wb, n1, n2, None, None)
            .await
            .expect("edge");

        let meta = serde_json::json!({"weight": 3});
        assert!(update_edge(&pool, edge, Some(meta.clone()), None)
            .await
            .expect("update"));
        let record = get_edge(&pool, edge).await.expect("query").expect("present");
        assert_eq!(record.extra_metadata, meta);
    }
}

//! Per-whiteboard graph document store.
//!
//! Each whiteboard owns exactly one JSON document holding its full
//! node/edge graph. The document is created empty when the whiteboard
//! is created, fully replaced on every update (no partial patches) and
//! removed when the whiteboard is deleted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// `{"graph": {"nodes": [...], "edges": [...]}}` — the exact persisted
/// shape; reads and writes must round-trip it unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphDocument {
    pub graph: Graph,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Node content is polymorphic on the wire: either a plain string or a
/// question/answer object. Matching on the variant replaces any
/// dynamic shape inspection downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NodeContent {
    Plain(String),
    Qa {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        question: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub content: NodeContent,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_by: String,
    /// Opaque: clients write timestamps in whatever shape they like
    /// (date-only strings, epochs, RFC 3339) and read back the same
    /// bytes. Anyone wanting an instant parses downstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Value>,
    #[serde(default)]
    pub extra_metadata: Value,
    #[serde(default)]
    pub ui_attributes: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub target_id: String,
    #[serde(default)]
    pub extra_metadata: Value,
    #[serde(default)]
    pub ui_attributes: Value,
}

#[derive(Clone)]
pub struct DocumentStore {
    data_dir: PathBuf,
}

impl DocumentStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn path(&self, whiteboard_id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", whiteboard_id))
    }

    /// Writes an empty graph document for a freshly created whiteboard.
    pub async fn create(&self, whiteboard_id: &str) -> Result<(), AppError> {
        self.update(whiteboard_id, &GraphDocument::default()).await
    }

    pub async fn load(&self, whiteboard_id: &str) -> Result<GraphDocument, AppError> {
        let path = self.path(whiteboard_id);
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound
            } else {
                AppError::Internal(format!("read document {}: {}", path.display(), e))
            }
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::Internal(format!("decode document {}: {}", path.display(), e)))
    }

    /// Full replace: the caller supplies the complete graph on every
    /// write, so a failure before this point never corrupts the
    /// existing document.
    pub async fn update(
        &self,
        whiteboard_id: &str,
        document: &GraphDocument,
    ) -> Result<(), AppError> {
        let path = self.path(whiteboard_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("create data dir: {}", e)))?;
        }
        let raw = serde_json::to_string_pretty(document)
            .map_err(|e| AppError::Internal(format!("encode document: {}", e)))?;
        tokio::fs::write(&path, raw)
            .await
            .map_err(|e| AppError::Internal(format!("write document {}: {}", path.display(), e)))
    }

    pub async fn delete(&self, whiteboard_id: &str) -> Result<(), AppError> {
        let path = self.path(whiteboard_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(format!(
                "remove document {}: {}",
                path.display(),
                e
            ))),
        }
    }

    #[allow(dead_code)]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document() -> GraphDocument {
        GraphDocument {
            graph: Graph {
                nodes: vec![
                    GraphNode {
                        id: "n1".to_string(),
                        kind: "text".to_string(),
                        content: NodeContent::Plain("hello".to_string()),
                        status: "active".to_string(),
                        created_by: "user".to_string(),
                        updated_at: None,
                        extra_metadata: json!({}),
                        ui_attributes: json!({"position": {"x": 10, "y": 20}}),
                    },
                    GraphNode {
                        id: "n2".to_string(),
                        kind: "text".to_string(),
                        content: NodeContent::Qa {
                            question: Some("where?".to_string()),
                            answer: None,
                        },
                        status: "active".to_string(),
                        created_by: "agent".to_string(),
                        updated_at: None,
                        extra_metadata: json!({}),
                        ui_attributes: json!({}),
                    },
                ],
                edges: vec![GraphEdge {
                    id: "e1".to_string(),
                    source_id: "n1".to_string(),
                    target_id: "n2".to_string(),
                    extra_metadata: json!({}),
                    ui_attributes: json!({}),
                }],
            },
        }
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::new(dir.path());
        let document = sample_document();

        store.update("wb1", &document).await.expect("write");
        let loaded = store.load("wb1").await.expect("read");
        assert_eq!(loaded, document);
    }

    #[tokio::test]
    async fn create_writes_empty_graph() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::new(dir.path());

        store.create("wb1").await.expect("create");
        let loaded = store.load("wb1").await.expect("read");
        assert!(loaded.graph.nodes.is_empty());
        assert!(loaded.graph.edges.is_empty());
    }

    #[tokio::test]
    async fn load_missing_document_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::new(dir.path());

        match store.load("absent").await {
            Err(AppError::NotFound) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::new(dir.path());

        store.create("wb1").await.expect("create");
        store.delete("wb1").await.expect("delete");
        assert!(matches!(store.load("wb1").await, Err(AppError::NotFound)));

        // Deleting again is a no-op, mirroring cascade cleanup paths.
        store.delete("wb1").await.expect("idempotent delete");
    }

    #[test]
    fn node_content_decodes_both_wire_shapes() {
        let plain: GraphNode =
            serde_json::from_value(json!({"id": "a", "type": "text", "content": "hi"}))
                .expect("plain node");
        assert_eq!(plain.content, NodeContent::Plain("hi".to_string()));

        let qa: GraphNode = serde_json::from_value(
            json!({"id": "b", "type": "text", "content": {"question": "where?", "answer": "Yunnan"}}),
        )
        .expect("qa node");
        assert_eq!(
            qa.content,
            NodeContent::Qa {
                question: Some("where?".to_string()),
                answer: Some("Yunnan".to_string()),
            }
        );
    }

    #[test]
    fn updated_at_passes_through_unmodified() {
        // Clients write timestamps in several shapes; none of them may
        // be rejected or re-normalized on the way back out.
        for raw in [
            json!("2022-01-01"),
            json!(1700000000),
            json!("2024-01-01T00:00:00+00:00"),
        ] {
            let node: GraphNode = serde_json::from_value(json!({
                "id": "a",
                "type": "text",
                "content": "hi",
                "updated_at": raw,
            }))
            .expect("decode node");
            assert_eq!(node.updated_at, Some(raw.clone()));

            let encoded = serde_json::to_value(&node).expect("encode node");
            assert_eq!(encoded["updated_at"], raw);
        }
    }

    #[test]
    fn plain_content_serializes_as_bare_string() {
        let node = sample_document().graph.nodes[0].clone();
        let value = serde_json::to_value(&node).expect("encode");
        assert_eq!(value["content"], json!("hello"));
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::pipeline::RelatedQuestion;
use crate::db::{EdgeRecord, NodeRecord, WhiteboardRecord};
use crate::document::GraphDocument;

#[derive(Debug, Deserialize)]
pub struct CreateWhiteboardRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub ui_attributes: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWhiteboardRequest {
    pub name: Option<String>,
    pub ui_attributes: Option<Value>,
    /// Full replacement graph; partial patches are not supported.
    pub data: Option<GraphDocument>,
}

#[derive(Debug, Serialize)]
pub struct WhiteboardDetailResponse {
    #[serde(flatten)]
    pub whiteboard: WhiteboardRecord,
    pub data: GraphDocument,
}

#[derive(Debug, Serialize)]
pub struct WhiteboardListResponse {
    pub whiteboards: Vec<WhiteboardRecord>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNodeRequest {
    pub whiteboard_id: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
    pub created_by: Option<String>,
    pub extra_metadata: Option<Value>,
    pub ui_attributes: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNodeRequest {
    pub content: Option<String>,
    pub status: Option<String>,
    pub extra_metadata: Option<Value>,
    pub ui_attributes: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct NodeListResponse {
    pub nodes: Vec<NodeRecord>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEdgeRequest {
    pub whiteboard_id: Option<String>,
    pub source_id: Option<i64>,
    pub target_id: Option<i64>,
    pub extra_metadata: Option<Value>,
    pub ui_attributes: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEdgeRequest {
    pub extra_metadata: Option<Value>,
    pub ui_attributes: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct EdgeListResponse {
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AgentTaskRequest {
    pub target_language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RelatedQuestionsResponse {
    pub related_questions: Vec<RelatedQuestion>,
}

#[derive(Debug, Serialize)]
pub struct RelatedInsightsResponse {
    pub related_insights: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    pub limit: Option<usize>,
    pub summarize: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

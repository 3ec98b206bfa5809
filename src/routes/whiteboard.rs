use std::convert::Infallible;

use axum::extract::{Json, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::Stream;
use futures_util::StreamExt;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;

use crate::agent::pipeline::{self, DEFAULT_SUMMARY_TOP_N};
use crate::agent::transcript::{build_transcript, render_transcript};
use crate::db;
use crate::error::AppError;
use crate::models::{
    AgentTaskRequest, AnswerResponse, CreateWhiteboardRequest, RelatedInsightsResponse,
    RelatedQuestionsResponse, SearchRequest, SearchResponse, UpdateWhiteboardRequest,
    WhiteboardDetailResponse, WhiteboardListResponse,
};
use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 5;

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateWhiteboardRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::BadRequest("name is required".to_string()))?;

    let whiteboard_id =
        db::create_whiteboard(&state.pool, payload.id, name, payload.ui_attributes).await?;
    state.documents.create(&whiteboard_id).await?;

    tracing::info!(whiteboard_id = %whiteboard_id, "whiteboard created");
    Ok(Json(json!({ "id": whiteboard_id })))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<WhiteboardListResponse>, AppError> {
    let whiteboards = db::list_whiteboards(&state.pool).await?;
    Ok(Json(WhiteboardListResponse { whiteboards }))
}

pub async fn fetch(
    State(state): State<AppState>,
    Path(whiteboard_id): Path<String>,
) -> Result<Json<WhiteboardDetailResponse>, AppError> {
    let whiteboard = db::get_whiteboard(&state.pool, &whiteboard_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let data = state.documents.load(&whiteboard_id).await?;

    Ok(Json(WhiteboardDetailResponse { whiteboard, data }))
}

pub async fn update(
    State(state): State<AppState>,
    Path(whiteboard_id): Path<String>,
    Json(payload): Json<UpdateWhiteboardRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if db::get_whiteboard(&state.pool, &whiteboard_id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    db::update_whiteboard(
        &state.pool,
        &whiteboard_id,
        payload.name.as_deref(),
        payload.ui_attributes,
    )
    .await?;

    // The caller supplies the complete graph; the document is replaced
    // wholesale, never patched.
    if let Some(data) = payload.data {
        state.documents.update(&whiteboard_id, &data).await?;
        db::touch_whiteboard(&state.pool, &whiteboard_id).await?;
    }

    Ok(Json(json!({ "id": whiteboard_id })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(whiteboard_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if db::get_whiteboard(&state.pool, &whiteboard_id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    // Document first: its removal is idempotent, so a failed request
    // can be retried, whereas soft-deleting the records first would
    // strand the document on a later I/O error.
    state.documents.delete(&whiteboard_id).await?;
    db::delete_whiteboard(&state.pool, &whiteboard_id).await?;

    tracing::info!(whiteboard_id = %whiteboard_id, "whiteboard deleted");
    Ok(Json(json!({ "id": whiteboard_id })))
}

async fn transcript_text(state: &AppState, whiteboard_id: &str) -> Result<String, AppError> {
    let document = state.documents.load(whiteboard_id).await?;
    Ok(render_transcript(&build_transcript(&document)))
}

pub async fn related_questions(
    State(state): State<AppState>,
    Path(whiteboard_id): Path<String>,
    payload: Option<Json<AgentTaskRequest>>,
) -> Result<Json<RelatedQuestionsResponse>, AppError> {
    let transcript = transcript_text(&state, &whiteboard_id).await?;
    let target_language = payload.as_ref().and_then(|p| p.target_language.as_deref());

    let related_questions =
        pipeline::related_questions(state.llm.as_ref(), &transcript, target_language).await?;
    Ok(Json(RelatedQuestionsResponse { related_questions }))
}

pub async fn related_insights(
    State(state): State<AppState>,
    Path(whiteboard_id): Path<String>,
    payload: Option<Json<AgentTaskRequest>>,
) -> Result<Json<RelatedInsightsResponse>, AppError> {
    let transcript = transcript_text(&state, &whiteboard_id).await?;
    let target_language = payload.as_ref().and_then(|p| p.target_language.as_deref());

    let related_insights =
        pipeline::related_insights(state.llm.as_ref(), &transcript, target_language).await?;
    Ok(Json(RelatedInsightsResponse { related_insights }))
}

pub async fn answer(
    State(state): State<AppState>,
    Path(whiteboard_id): Path<String>,
) -> Result<Json<AnswerResponse>, AppError> {
    let transcript = transcript_text(&state, &whiteboard_id).await?;
    let answer = pipeline::direct_answer(state.llm.as_ref(), &transcript).await?;
    Ok(Json(AnswerResponse { answer }))
}

/// Streams the answer as server-sent events; the client disconnecting
/// drops the stream and with it the model-side receiver, which stops
/// further fragment emission.
pub async fn answer_stream(
    State(state): State<AppState>,
    Path(whiteboard_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let transcript = transcript_text(&state, &whiteboard_id).await?;
    let receiver = pipeline::direct_answer_stream(state.llm.as_ref(), &transcript).await?;

    let stream = ReceiverStream::new(receiver).map(|item| {
        let event = match item {
            Ok(fragment) => Event::default().data(fragment),
            // Terminal provider failure: a named event, so the client
            // can tell it apart from a normally finished stream.
            Err(e) => Event::default().event("error").data(e.to_string()),
        };
        Ok(event)
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::new()))
}

pub async fn search(
    State(state): State<AppState>,
    Path(whiteboard_id): Path<String>,
    payload: Option<Json<SearchRequest>>,
) -> Result<Json<SearchResponse>, AppError> {
    let transcript = transcript_text(&state, &whiteboard_id).await?;
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    let limit = request.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    let results = pipeline::gather(
        state.llm.as_ref(),
        state.search.as_ref(),
        &transcript,
        limit,
    )
    .await?;

    let summary = if request.summarize.unwrap_or(false) {
        Some(pipeline::summarize(state.llm.as_ref(), &results, DEFAULT_SUMMARY_TOP_N).await?)
    } else {
        None
    };

    Ok(Json(SearchResponse {
        results: results.iter().map(|r| r.to_response()).collect(),
        summary,
    }))
}

//! Task orchestration: transcript in, structured result out.
//!
//! Each task is one sequential chain — render prompt, await the model,
//! decode the reply — with no state shared between invocations. The
//! search-grounded flow additionally fans out to the search provider,
//! strictly one query at a time so the model-assigned query order is
//! preserved and gathering can stop early.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::agent::llm::{ChatMessage, LanguageModel};
use crate::agent::parser;
use crate::agent::prompts;
use crate::agent::search::SearchProvider;
use crate::error::AppError;

/// How many results a summary draws from when the caller does not say.
pub const DEFAULT_SUMMARY_TOP_N: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelatedQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    WebPage,
    Video,
}

/// Ephemeral: lives for the duration of one search-and-summarize
/// request, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub kind: SearchKind,
    pub name: String,
    pub url: String,
    pub snippet: String,
}

impl SearchResult {
    /// Wire shape for the HTTP surface: pages carry `snippet`, videos
    /// carry `description`.
    pub fn to_response(&self) -> Value {
        match self.kind {
            SearchKind::WebPage => json!({
                "type": "search-webPage",
                "name": self.name,
                "url": self.url,
                "snippet": self.snippet,
            }),
            SearchKind::Video => json!({
                "type": "search-video",
                "name": self.name,
                "url": self.url,
                "description": self.snippet,
            }),
        }
    }
}

pub async fn related_questions(
    llm: &impl LanguageModel,
    transcript: &str,
    target_language: Option<&str>,
) -> Result<Vec<RelatedQuestion>, AppError> {
    let prompt = prompts::related_questions(transcript, target_language);
    let reply = llm.complete(&[ChatMessage::user(prompt)]).await?;
    Ok(parser::parse_object_array(&reply)?)
}

pub async fn related_insights(
    llm: &impl LanguageModel,
    transcript: &str,
    target_language: Option<&str>,
) -> Result<Vec<String>, AppError> {
    let prompt = prompts::related_insights(transcript, target_language);
    let reply = llm.complete(&[ChatMessage::user(prompt)]).await?;
    Ok(parser::parse_string_array(&reply)?)
}

/// Free-text task: the reply is returned unparsed.
pub async fn direct_answer(llm: &impl LanguageModel, transcript: &str) -> Result<String, AppError> {
    let prompt = prompts::direct_answer(transcript);
    llm.complete(&[ChatMessage::user(prompt)]).await
}

/// Streaming variant of [`direct_answer`]; fragments arrive in order,
/// a mid-stream provider failure arrives as a terminal `Err` item, and
/// dropping the receiver cancels emission.
pub async fn direct_answer_stream(
    llm: &impl LanguageModel,
    transcript: &str,
) -> Result<mpsc::Receiver<Result<String, AppError>>, AppError> {
    let prompt = prompts::direct_answer(transcript);
    llm.stream(&[ChatMessage::user(prompt)]).await
}

/// Derives search queries from the transcript, issues them in model
/// order and aggregates page and video results. Gathering stops as
/// soon as `limit` results have accumulated; the query that crosses
/// the threshold keeps all of its results.
pub async fn gather(
    llm: &impl LanguageModel,
    search: &impl SearchProvider,
    transcript: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, AppError> {
    let prompt = prompts::search_keywords(transcript);
    let reply = llm.complete(&[ChatMessage::user(prompt)]).await?;
    let queries = parser::parse_string_array(&reply)?;

    let mut results = Vec::new();
    for query in &queries {
        let response = search.search(query).await?;
        extract_results(&response, &mut results);
        if results.len() >= limit {
            break;
        }
    }

    Ok(results)
}

/// Pulls usable results out of one raw provider response, in response
/// order. Entries missing a required field are skipped rather than
/// failing the whole request.
fn extract_results(response: &Value, results: &mut Vec<SearchResult>) {
    if let Some(pages) = response["webPages"]["value"].as_array() {
        for page in pages {
            let (Some(name), Some(url)) = (page["name"].as_str(), page["url"].as_str()) else {
                continue;
            };
            results.push(SearchResult {
                kind: SearchKind::WebPage,
                name: name.to_string(),
                url: url.to_string(),
                snippet: page["snippet"].as_str().unwrap_or_default().to_string(),
            });
        }
    }

    if let Some(videos) = response["videos"]["value"].as_array() {
        for video in videos {
            let (Some(name), Some(url)) = (video["name"].as_str(), video["contentUrl"].as_str())
            else {
                continue;
            };
            results.push(SearchResult {
                kind: SearchKind::Video,
                name: name.to_string(),
                url: url.to_string(),
                snippet: video["description"].as_str().unwrap_or_default().to_string(),
            });
        }
    }
}

/// Asks the model for a free-text response grounded in the first
/// `top_n` gathered results.
pub async fn summarize(
    llm: &impl LanguageModel,
    results: &[SearchResult],
    top_n: usize,
) -> Result<String, AppError> {
    let block = render_results_block(results, top_n);
    let prompt = prompts::search_summary(&block);
    llm.complete(&[ChatMessage::user(prompt)]).await
}

fn render_results_block(results: &[SearchResult], top_n: usize) -> String {
    let mut block = String::new();
    for result in results.iter().take(top_n) {
        block.push_str(&format!("Title: {}\n", result.name));
        block.push_str(&format!("URL: {}\n", result.url));
        match result.kind {
            SearchKind::WebPage => block.push_str(&format!("Snippet: {}\n", result.snippet)),
            SearchKind::Video => block.push_str(&format!("Description: {}\n", result.snippet)),
        }
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fake model: pops canned replies in order and records the
    /// prompts it was sent.
    struct FakeModel {
        replies: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeModel {
        fn new(replies: Vec<&str>) -> Self {
            let mut replies: Vec<String> = replies.into_iter().map(String::from).collect();
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AppError> {
            self.prompts
                .lock()
                .unwrap()
                .push(messages.last().map(|m| m.content.clone()).unwrap_or_default());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| AppError::Upstream("no canned reply left".to_string()))
        }

        async fn stream(
            &self,
            messages: &[ChatMessage],
        ) -> Result<mpsc::Receiver<Result<String, AppError>>, AppError> {
            let reply = self.complete(messages).await?;
            let (tx, rx) = mpsc::channel(8);
            tokio::spawn(async move {
                let mid = reply.len() / 2;
                let _ = tx.send(Ok(reply[..mid].to_string())).await;
                let _ = tx.send(Ok(reply[mid..].to_string())).await;
            });
            Ok(rx)
        }
    }

    /// Fake model whose stream fails partway through, the way a
    /// provider error frame or dropped connection would.
    struct InterruptedModel;

    #[async_trait]
    impl LanguageModel for InterruptedModel {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, AppError> {
            Err(AppError::Upstream("not a completion model".to_string()))
        }

        async fn stream(
            &self,
            _messages: &[ChatMessage],
        ) -> Result<mpsc::Receiver<Result<String, AppError>>, AppError> {
            let (tx, rx) = mpsc::channel(8);
            tokio::spawn(async move {
                let _ = tx.send(Ok("partial ".to_string())).await;
                let _ = tx
                    .send(Err(AppError::Upstream("rate limited".to_string())))
                    .await;
            });
            Ok(rx)
        }
    }

    /// Fake search provider: three web pages per query, names tagged
    /// with the query so source order is checkable.
    struct FakeSearch {
        calls: AtomicUsize,
    }

    impl FakeSearch {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for FakeSearch {
        async fn search(&self, query: &str) -> Result<Value, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let pages: Vec<Value> = (0..3)
                .map(|i| {
                    json!({
                        "name": format!("{} result {}", query, i),
                        "url": format!("https://example.com/{}/{}", query, i),
                        "snippet": format!("about {}", query),
                    })
                })
                .collect();
            Ok(json!({ "webPages": { "value": pages } }))
        }
    }

    #[tokio::test]
    async fn gather_stops_once_limit_is_reached() {
        let llm = FakeModel::new(vec![r#"["q1", "q2", "q3"]"#]);
        let search = FakeSearch::new();

        let results = gather(&llm, &search, "user: hi", 5).await.expect("gather");

        // 3 + 3 >= 5 after the second query; the third is never sent
        // and the crossing query's results are kept whole.
        assert_eq!(results.len(), 6);
        assert_eq!(search.calls.load(Ordering::SeqCst), 2);
        assert_eq!(results[0].name, "q1 result 0");
        assert_eq!(results[3].name, "q2 result 0");
        assert_eq!(results[5].name, "q2 result 2");
    }

    #[tokio::test]
    async fn gather_extracts_videos_with_content_url() {
        struct VideoSearch;

        #[async_trait]
        impl SearchProvider for VideoSearch {
            async fn search(&self, _query: &str) -> Result<Value, AppError> {
                Ok(json!({
                    "videos": { "value": [
                        {
                            "name": "intro video",
                            "contentUrl": "https://videos.example.com/1",
                            "description": "a short intro",
                        },
                        // Missing contentUrl: skipped, not fatal.
                        { "name": "broken entry" },
                    ]}
                }))
            }
        }

        let llm = FakeModel::new(vec![r#"["tutorial"]"#]);
        let results = gather(&llm, &VideoSearch, "user: hi", 5)
            .await
            .expect("gather");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind, SearchKind::Video);
        assert_eq!(results[0].url, "https://videos.example.com/1");
        let wire = results[0].to_response();
        assert_eq!(wire["type"], "search-video");
        assert_eq!(wire["description"], "a short intro");
    }

    #[tokio::test]
    async fn gather_propagates_malformed_keyword_reply() {
        let llm = FakeModel::new(vec!["sorry, I cannot help with that"]);
        let search = FakeSearch::new();

        let err = gather(&llm, &search, "user: hi", 5).await.unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn summarize_uses_only_the_top_n_results() {
        let llm = FakeModel::new(vec!["here is a summary"]);
        let results: Vec<SearchResult> = (0..7)
            .map(|i| SearchResult {
                kind: SearchKind::WebPage,
                name: format!("title {}", i),
                url: format!("https://example.com/{}", i),
                snippet: format!("snippet {}", i),
            })
            .collect();

        let summary = summarize(&llm, &results, DEFAULT_SUMMARY_TOP_N)
            .await
            .expect("summarize");
        assert_eq!(summary, "here is a summary");

        let prompt = llm.last_prompt();
        assert!(prompt.contains("Title: title 4"));
        assert!(!prompt.contains("title 5"));
        assert!(prompt.contains("Snippet: snippet 0"));
    }

    #[tokio::test]
    async fn related_questions_decodes_fenced_reply() {
        let llm = FakeModel::new(vec![
            "```json\n[{\"question\": \"Which city?\", \"type\": \"text\"}]\n```",
        ]);

        let questions = related_questions(&llm, "user: trip ideas", None)
            .await
            .expect("questions");
        assert_eq!(
            questions,
            vec![RelatedQuestion {
                question: "Which city?".to_string(),
                kind: "text".to_string(),
                options: None,
            }]
        );
    }

    #[tokio::test]
    async fn related_insights_rejects_object_reply() {
        let llm = FakeModel::new(vec![r#"{"insights": ["a"]}"#]);

        let err = related_insights(&llm, "user: hi", None).await.unwrap_err();
        assert!(matches!(err, AppError::Parse(parser::ParseError::ShapeMismatch { .. })));
    }

    #[tokio::test]
    async fn direct_answer_returns_reply_unparsed() {
        let llm = FakeModel::new(vec!["Day 1: arrive in Kunming..."]);

        let answer = direct_answer(&llm, "user: plan my trip").await.expect("answer");
        assert_eq!(answer, "Day 1: arrive in Kunming...");
        assert!(llm.last_prompt().contains("user: plan my trip"));
    }

    #[tokio::test]
    async fn direct_answer_stream_delivers_ordered_fragments() {
        let llm = FakeModel::new(vec!["streamed answer"]);

        let mut rx = direct_answer_stream(&llm, "user: hi").await.expect("stream");
        let mut collected = String::new();
        while let Some(fragment) = rx.recv().await {
            collected.push_str(&fragment.expect("fragment"));
        }
        assert_eq!(collected, "streamed answer");
    }

    #[tokio::test]
    async fn direct_answer_stream_surfaces_midstream_failure() {
        let mut rx = direct_answer_stream(&InterruptedModel, "user: hi")
            .await
            .expect("stream");

        let mut fragments = Vec::new();
        let mut failure = None;
        while let Some(item) = rx.recv().await {
            match item {
                Ok(fragment) => fragments.push(fragment),
                Err(e) => failure = Some(e),
            }
        }

        // A provider failure must be distinguishable from a normally
        // finished stream, not just a closed channel.
        assert_eq!(fragments, vec!["partial ".to_string()]);
        match failure {
            Some(AppError::Upstream(message)) => assert!(message.contains("rate limited")),
            other => panic!("expected upstream failure, got {:?}", other),
        }
    }
}

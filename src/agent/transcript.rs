//! Linearizes a whiteboard graph into an ordered chat transcript.
//!
//! Nodes are consumed in the order they appear in the document (the
//! writer sorts upstream by update time), so the transcript is a pure
//! function of the document content at the moment of read.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::document::{GraphDocument, NodeContent};

/// Speaker labels are fed to the model as text, not an enum, so an
/// unrecognized `created_by` value is kept verbatim rather than
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Speaker {
    User,
    Agent,
    Other(String),
}

impl Speaker {
    fn from_label(label: &str) -> Self {
        match label {
            "user" => Speaker::User,
            "agent" | "bot" => Speaker::Agent,
            other => Speaker::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => f.write_str("user"),
            Speaker::Agent => f.write_str("agent"),
            Speaker::Other(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// The document stores `updated_at` as an opaque value; only RFC 3339
/// strings yield a typed instant here, anything else is simply absent.
fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// One utterance per plain text node; a question/answer node yields
/// the question (agent) then the answer (user). Nodes of other kinds,
/// or with neither side present, contribute nothing.
pub fn build_transcript(document: &GraphDocument) -> Vec<Utterance> {
    let mut utterances = Vec::new();

    for node in &document.graph.nodes {
        if node.kind != "text" {
            continue;
        }
        let timestamp = parse_timestamp(node.updated_at.as_ref());
        match &node.content {
            NodeContent::Plain(text) => {
                utterances.push(Utterance {
                    speaker: Speaker::from_label(&node.created_by),
                    content: text.clone(),
                    timestamp,
                });
            }
            NodeContent::Qa { question, answer } => {
                if let Some(question) = question {
                    utterances.push(Utterance {
                        speaker: Speaker::Agent,
                        content: question.clone(),
                        timestamp,
                    });
                }
                if let Some(answer) = answer {
                    utterances.push(Utterance {
                        speaker: Speaker::User,
                        content: answer.clone(),
                        timestamp,
                    });
                }
            }
        }
    }

    utterances
}

/// The textual transcript is the only representation the prompt layer
/// consumes.
pub fn render_transcript(utterances: &[Utterance]) -> String {
    utterances
        .iter()
        .map(|u| format!("{}: {}", u.speaker, u.content))
        .collect::<Vec<_>>()
        .join("\n")
}

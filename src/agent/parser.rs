//! Decodes structured values out of raw model text.
//!
//! Models asked for JSON frequently wrap it in a markdown code fence;
//! the only tolerated deviation is exactly that wrapping. Anything
//! else fails loudly — a reply that cannot be decoded propagates as an
//! error instead of degrading to an empty or partial result.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("model returned malformed JSON: {0}")]
    MalformedJson(String),
    #[error("model returned {got} where {expected} was expected")]
    ShapeMismatch {
        expected: &'static str,
        got: &'static str,
    },
}

/// Strips a leading and trailing code fence marker, nothing more. The
/// fence line's language tag (```json) is discarded with the marker.
/// Deliberately not a markdown parser: interior fences are left alone.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => "",
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn decode(raw: &str) -> Result<Value, ParseError> {
    let text = strip_code_fences(raw);
    serde_json::from_str(text).map_err(|e| ParseError::MalformedJson(e.to_string()))
}

/// Decodes a JSON array of strings.
pub fn parse_string_array(raw: &str) -> Result<Vec<String>, ParseError> {
    let value = decode(raw)?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(ParseError::ShapeMismatch {
                expected: "an array of strings",
                got: kind_of(&other),
            })
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(ParseError::ShapeMismatch {
                expected: "an array of strings",
                got: kind_of(&other),
            }),
        })
        .collect()
}

/// Decodes a JSON array of objects into the requested element type.
pub fn parse_object_array<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, ParseError> {
    let value = decode(raw)?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(ParseError::ShapeMismatch {
                expected: "an array of objects",
                got: kind_of(&other),
            })
        }
    };

    items
        .into_iter()
        .map(|item| {
            if !item.is_object() {
                return Err(ParseError::ShapeMismatch {
                    expected: "an array of objects",
                    got: kind_of(&item),
                });
            }
            serde_json::from_value(item).map_err(|e| ParseError::MalformedJson(e.to_string()))
        })
        .collect()
}

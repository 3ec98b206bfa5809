//! Conversation pipeline: graph document → transcript → prompt →
//! model → parsed result, with optional search grounding.

pub mod llm;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod search;
pub mod transcript;

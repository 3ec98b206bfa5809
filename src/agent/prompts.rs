//! Instruction templates for each agent task.
//!
//! Every JSON-producing variant embeds an explicit output-format
//! example so the reply can be decoded by the response parser. Each
//! function is a pure function of its inputs.

const DEFAULT_LANGUAGE: &str = "the dominant language of the chat history";

fn language_clause(target_language: Option<&str>) -> String {
    match target_language {
        Some(language) => format!("Write in {}.", language),
        None => format!("Write in {}.", DEFAULT_LANGUAGE),
    }
}

/// Clarifying questions the agent still needs answered, as a JSON
/// array of `{question, type, options?}` objects.
pub fn related_questions(transcript: &str, target_language: Option<&str>) -> String {
    format!(
        r#"Based on the provided chat history, generate a list of the most relevant questions to gather information from the user that will directly improve the quality of the agent's future responses. Avoid questions whose answers are already present in the chat history; focus on gaps in understanding, user preferences, and specifics that enable more personalized assistance. {language} Only output the JSON array.

Chat History:
{transcript}

Output Format (JSON):
[
    {{
        "question": "Question 1",
        "type": "text/multiple-choice/etc.",
        "options": ["Option 1", "Option 2"]
    }},
    {{
        "question": "Question 2",
        "type": "text/multiple-choice/etc.",
        "options": ["Option 1", "Option 2"]
    }}
]
"#,
        language = language_clause(target_language),
        transcript = transcript,
    )
}

/// A mixed list of insights and actionable suggestions, as a flat JSON
/// array of strings.
pub fn related_insights(transcript: &str, target_language: Option<&str>) -> String {
    format!(
        r#"Based on the provided chat history, generate a mix of high-quality insights and actionable suggestions reflecting different perspectives and directions. Insights should be thought-provoking, concise and unique; suggestions should be practical, specific and directly applicable. Avoid redundancy and irrelevant information. {language} Only output the JSON array.

Chat History:
{transcript}

Output Format (JSON):
[
    "insight 1",
    "suggestion 1",
    "insight 2",
    "suggestion 2"
]
"#,
        language = language_clause(target_language),
        transcript = transcript,
    )
}

/// Free-text task: infer the user's intent and produce the single most
/// useful complete output (a plan, an analysis, ...). Not JSON.
pub fn direct_answer(transcript: &str) -> String {
    format!(
        r#"Based on the provided chat history, infer the user's intent and purpose behind the conversation. Determine the most likely desired output the user is seeking, such as a travel plan for travel-related discussions or an analysis report for product analysis conversations, and produce that output completely. The language of the output should match the language of the chat history. Respond with the inferred output directly, nothing else.

Chat History:
{transcript}
"#,
        transcript = transcript,
    )
}

/// Search query strings derived from the conversation, as a JSON array
/// of strings, most useful first.
pub fn search_keywords(transcript: &str) -> String {
    format!(
        r#"Based on the provided chat history, infer the user's intent and purpose behind the conversation. You cannot access the internet directly, but you can help by generating search queries a search engine can answer. Output the queries as a JSON array of strings, most useful first, in the same language as the chat history. Only output the JSON array.

Chat History:
{transcript}

Output Format (JSON):
[
    "query 1",
    "query 2",
    "query 3"
]
"#,
        transcript = transcript,
    )
}

/// Free-text synthesis of already-gathered search results.
pub fn search_summary(results_block: &str) -> String {
    format!(
        r#"Based on the search results provided, generate a suitable response that addresses the user's query. The response should be relevant, concise and informative, incorporating the key points from the retrieved information, presented clearly with the user's likely needs in mind. The language of the output should match the language of the search results.

Search Results:
{results_block}
"#,
        results_block = results_block,
    )
}

//! Core data models for the research agent loop

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Query =================
//

/// Immutable input for one agent run. Created once per session; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub ticker: Option<String>,
    pub date_range: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ticker: None,
            date_range: None,
        }
    }

    /// Render the query as the opening user turn, folding structured
    /// parameters into the text so the reasoner sees them.
    pub fn render(&self) -> String {
        let mut out = self.text.clone();
        if let Some(ticker) = &self.ticker {
            out.push_str(&format!("\n[ticker: {}]", ticker));
        }
        if let Some(range) = &self.date_range {
            out.push_str(&format!("\n[date range: {}]", range));
        }
        out
    }
}

//
// ================= Turns =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    Tool,
    System,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::Tool => "tool",
            TurnRole::System => "system",
        };
        write!(f, "{}", s)
    }
}

/// One step of the loop. Turns are append-only; the ordered sequence of
/// turns forms the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub ordinal: u32,
    pub role: TurnRole,
    pub content: TurnContent,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnContent {
    Text { text: String },
    ToolCall(ToolCall),
    ToolResult(ToolResult),
}

//
// ================= Tool I/O =================
//

/// A requested tool invocation. The correlation id links the eventual
/// result turn back to the turn that requested it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: Uuid,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Outcome of a dispatched tool call, success or failure wrapped as content.
/// Invariant: at most one result per call id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: Uuid,
    pub tool_name: String,
    pub success: bool,
    pub content: serde_json::Value,
}

/// One ranked search hit returned by the search tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSnippet {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

//
// ================= Reasoner =================
//

/// Strict tagged variant for reasoner output. Parsing the raw model text
/// into this shape happens in exactly one adapter, keeping the loop free
/// of string handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReasonerResponse {
    FinalAnswer { text: String },
    ToolRequest { tool_name: String, arguments: serde_json::Value },
}

//
// ================= Outcome =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown/unregistered tool, or tool retries exhausted repeatedly
    ToolUnavailable,
    /// Non-retryable error from either upstream client (e.g. auth)
    UpstreamFailure,
    /// Step limit reached without a final answer
    BudgetExceeded,
    /// Total time budget exceeded
    Timeout,
    /// Malformed reasoner output beyond the recoverable limit
    ParseFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ToolUnavailable => "tool_unavailable",
            ErrorKind::UpstreamFailure => "upstream_failure",
            ErrorKind::BudgetExceeded => "budget_exceeded",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ParseFailure => "parse_failure",
        };
        write!(f, "{}", s)
    }
}

/// Terminal value of one run: a final answer or a failure with kind and
/// human-readable message. Exactly one is produced per query; no partial
/// answer is returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentOutcome {
    Answer { text: String },
    Failure { kind: ErrorKind, message: String },
}

impl AgentOutcome {
    pub fn is_answer(&self) -> bool {
        matches!(self, AgentOutcome::Answer { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_render_includes_parameters() {
        let query = Query {
            text: "What is AAPL's latest closing price?".to_string(),
            ticker: Some("AAPL".to_string()),
            date_range: Some("2025-08".to_string()),
        };

        let rendered = query.render();
        assert!(rendered.starts_with("What is AAPL's latest closing price?"));
        assert!(rendered.contains("[ticker: AAPL]"));
        assert!(rendered.contains("[date range: 2025-08]"));
    }

    #[test]
    fn test_reasoner_response_roundtrip() {
        let request = ReasonerResponse::ToolRequest {
            tool_name: "search".to_string(),
            arguments: json!({"query": "AAPL latest closing price"}),
        };

        let encoded = serde_json::to_string(&request).unwrap();
        assert!(encoded.contains("\"type\":\"tool_request\""));

        let decoded: ReasonerResponse = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_outcome_serialization_tags_status() {
        let outcome = AgentOutcome::Failure {
            kind: ErrorKind::BudgetExceeded,
            message: "no final answer within 8 steps".to_string(),
        };

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["kind"], "budget_exceeded");
    }
}

//! Reasoner trait and response parsing
//!
//! The reasoner sees the full transcript and replies with either a final
//! answer or a tool request. Raw model text is parsed into the strict
//! tagged variant here, in one place.

use crate::error::AgentError;
use crate::models::ReasonerResponse;
use crate::transcript::Transcript;
use crate::Result;
use async_trait::async_trait;

pub mod gemini;
pub use gemini::GeminiReasoner;

/// Corrective instruction appended as a system turn after the reasoner
/// produces output that fits neither variant.
pub const FORMAT_CORRECTION: &str = "Your previous reply was not valid. Respond with ONLY one \
JSON object, either {\"type\": \"final_answer\", \"text\": \"...\"} or \
{\"type\": \"tool_request\", \"tool_name\": \"...\", \"arguments\": {...}}. No other text.";

/// Trait for the reasoning capability (LLM controlled)
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Produce the next response for the given transcript.
    async fn complete(&self, transcript: &Transcript) -> Result<ReasonerResponse>;
}

/// Parse raw model text into the tagged variant.
///
/// Accepts a bare JSON object or one wrapped in a markdown fence, and a
/// couple of common key aliases the model tends to emit. Anything else is
/// a recoverable `MalformedResponse`.
pub fn parse_reasoner_output(raw: &str) -> Result<ReasonerResponse> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let value: serde_json::Value = serde_json::from_str(cleaned)
        .map_err(|e| AgentError::MalformedResponse(format!("{} | raw={}", e, raw)))?;

    let kind = value
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AgentError::MalformedResponse(format!("missing 'type' | raw={}", raw)))?;

    match kind {
        "final_answer" => {
            let text = value
                .get("text")
                .or_else(|| value.get("answer"))
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    AgentError::MalformedResponse(format!(
                        "final_answer without 'text' | raw={}",
                        raw
                    ))
                })?;
            Ok(ReasonerResponse::FinalAnswer {
                text: text.to_string(),
            })
        }
        "tool_request" => {
            let tool_name = value
                .get("tool_name")
                .or_else(|| value.get("tool"))
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    AgentError::MalformedResponse(format!(
                        "tool_request without 'tool_name' | raw={}",
                        raw
                    ))
                })?;
            let arguments = value
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({}));

            if !arguments.is_object() {
                return Err(AgentError::MalformedResponse(format!(
                    "tool_request arguments must be an object | raw={}",
                    raw
                )));
            }

            Ok(ReasonerResponse::ToolRequest {
                tool_name: tool_name.to_string(),
                arguments,
            })
        }
        other => Err(AgentError::MalformedResponse(format!(
            "unknown response type '{}' | raw={}",
            other, raw
        ))),
    }
}

/// Mock reasoner for development & testing.
/// Keeps the loop functional without LLM dependency.
pub struct MockReasoner;

#[async_trait]
impl Reasoner for MockReasoner {
    async fn complete(&self, transcript: &Transcript) -> Result<ReasonerResponse> {
        use crate::models::TurnContent;

        let last_user = transcript
            .turns()
            .iter()
            .rev()
            .find_map(|t| match &t.content {
                TurnContent::Text { text } if t.role == crate::models::TurnRole::User => {
                    Some(text.clone())
                }
                _ => None,
            })
            .unwrap_or_default();

        Ok(ReasonerResponse::FinalAnswer {
            text: format!("[mock] No live reasoner configured. Query was: {}", last_user),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_final_answer() {
        let parsed =
            parse_reasoner_output(r#"{"type": "final_answer", "text": "AAPL closed at $190.12"}"#)
                .unwrap();
        assert_eq!(
            parsed,
            ReasonerResponse::FinalAnswer {
                text: "AAPL closed at $190.12".to_string()
            }
        );
    }

    #[test]
    fn test_parse_tool_request_with_fence_and_alias() {
        let raw = "```json\n{\"type\": \"tool_request\", \"tool\": \"search\", \"arguments\": {\"query\": \"AAPL latest closing price\"}}\n```";
        let parsed = parse_reasoner_output(raw).unwrap();
        assert_eq!(
            parsed,
            ReasonerResponse::ToolRequest {
                tool_name: "search".to_string(),
                arguments: json!({"query": "AAPL latest closing price"}),
            }
        );
    }

    #[test]
    fn test_parse_rejects_free_text() {
        let result = parse_reasoner_output("Sure! Let me look into Apple's stock for you.");
        assert!(matches!(result, Err(AgentError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let result = parse_reasoner_output(r#"{"type": "plan", "steps": []}"#);
        assert!(matches!(result, Err(AgentError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_rejects_non_object_arguments() {
        let result = parse_reasoner_output(
            r#"{"type": "tool_request", "tool_name": "search", "arguments": "AAPL"}"#,
        );
        assert!(matches!(result, Err(AgentError::MalformedResponse(_))));
    }
}

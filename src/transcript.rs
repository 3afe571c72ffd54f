//! Append-only transcript of one agent run
//!
//! The transcript is exclusively owned by one loop instance for the
//! lifetime of one query, so no synchronization is needed.

use crate::models::{ToolCall, ToolResult, Turn, TurnContent, TurnRole};
use chrono::Utc;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    fn push(&mut self, role: TurnRole, content: TurnContent) {
        let ordinal = self.turns.len() as u32;
        self.turns.push(Turn {
            ordinal,
            role,
            content,
            created_at: Utc::now(),
        });
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(TurnRole::User, TurnContent::Text { text: text.into() });
    }

    pub fn push_assistant_text(&mut self, text: impl Into<String>) {
        self.push(TurnRole::Assistant, TurnContent::Text { text: text.into() });
    }

    /// Corrective instruction injected after a recoverable parse failure.
    pub fn push_system(&mut self, text: impl Into<String>) {
        self.push(TurnRole::System, TurnContent::Text { text: text.into() });
    }

    pub fn push_tool_call(&mut self, call: ToolCall) {
        self.push(TurnRole::Assistant, TurnContent::ToolCall(call));
    }

    pub fn push_tool_result(&mut self, result: ToolResult) {
        debug_assert!(
            !self.has_result_for(result.call_id),
            "duplicate tool result for call {}",
            result.call_id
        );
        self.push(TurnRole::Tool, TurnContent::ToolResult(result));
    }

    pub fn has_result_for(&self, call_id: Uuid) -> bool {
        self.turns.iter().any(|t| {
            matches!(&t.content, TurnContent::ToolResult(r) if r.call_id == call_id)
        })
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ordinals_are_assigned_in_append_order() {
        let mut transcript = Transcript::new();
        transcript.push_user("what moved the market today?");
        transcript.push_assistant_text("looking that up");
        transcript.push_system("respond in the required format");

        let ordinals: Vec<u32> = transcript.turns().iter().map(|t| t.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn test_tool_result_correlation() {
        let mut transcript = Transcript::new();
        let call = ToolCall::new("search", json!({"query": "AAPL price"}));
        let call_id = call.call_id;

        transcript.push_tool_call(call);
        assert!(!transcript.has_result_for(call_id));

        transcript.push_tool_result(ToolResult {
            call_id,
            tool_name: "search".to_string(),
            success: true,
            content: json!([{"title": "AAPL", "url": "u", "snippet": "s"}]),
        });

        assert!(transcript.has_result_for(call_id));
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[0].role, TurnRole::Assistant);
        assert_eq!(transcript.turns()[1].role, TurnRole::Tool);
    }
}

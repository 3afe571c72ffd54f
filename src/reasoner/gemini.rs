//! Gemini-backed reasoner
//!
//! Renders the transcript into a generateContent request and parses the
//! model's reply into the tagged response variant. Uses a long-lived
//! reqwest::Client for connection pooling.

use crate::error::AgentError;
use crate::models::{ReasonerResponse, TurnContent, TurnRole};
use crate::reasoner::{parse_reasoner_output, Reasoner};
use crate::tools::ToolSpec;
use crate::transcript::Transcript;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const DEFAULT_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

pub struct GeminiReasoner {
    client: Client,
    api_key: String,
    base_url: String,
    tool_specs: Vec<ToolSpec>,
}

impl GeminiReasoner {
    pub fn new(api_key: String, tool_specs: Vec<ToolSpec>) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            tool_specs,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// System prompt: persona, available tools, today's date, and the
    /// strict output contract.
    fn build_system_prompt(&self) -> String {
        let mut tool_lines = String::new();
        for spec in &self.tool_specs {
            tool_lines.push_str(&format!("- {}: {}\n", spec.name, spec.description));
        }

        format!(
            r#"You are a financial research agent. Today's date is {today}.

You answer the user's research query step by step. At each step you either
request a tool or give the final answer.

Available tools:
{tools}
Tool input guidance:
- search: {{ "query": "<search query>", "max_results": <optional, 1-10> }}

Respond with ONLY one JSON object, no explanation text:
- To call a tool: {{"type": "tool_request", "tool_name": "search", "arguments": {{ ... }}}}
- To finish:      {{"type": "final_answer", "text": "<answer for the user>"}}

Rules:
- Use a tool when you need current data; do not invent prices or figures.
- Give the final answer as soon as you have enough information."#,
            today = chrono::Utc::now().format("%Y-%m-%d"),
            tools = tool_lines,
        )
    }

    fn build_request(&self, transcript: &Transcript) -> GeminiRequest {
        let mut contents = Vec::with_capacity(transcript.len());

        for turn in transcript.turns() {
            let (role, text) = match (&turn.role, &turn.content) {
                (TurnRole::User, TurnContent::Text { text }) => ("user", text.clone()),
                (TurnRole::Assistant, TurnContent::Text { text }) => ("model", text.clone()),
                (TurnRole::Assistant, TurnContent::ToolCall(call)) => (
                    "model",
                    serde_json::json!({
                        "type": "tool_request",
                        "tool_name": call.tool_name,
                        "arguments": call.arguments,
                    })
                    .to_string(),
                ),
                (TurnRole::Tool, TurnContent::ToolResult(result)) => (
                    "user",
                    format!(
                        "[tool result: {} ({})]\n{}",
                        result.tool_name,
                        if result.success { "ok" } else { "failed" },
                        result.content
                    ),
                ),
                (TurnRole::System, TurnContent::Text { text }) => {
                    ("user", format!("[system] {}", text))
                }
                // Remaining combinations do not occur; render defensively as user text.
                (_, content) => (
                    "user",
                    serde_json::to_string(content).unwrap_or_default(),
                ),
            };

            contents.push(Content {
                role: role.to_string(),
                parts: vec![Part { text }],
            });
        }

        GeminiRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: 0.2,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: self.build_system_prompt(),
                }],
            },
        }
    }
}

#[async_trait]
impl Reasoner for GeminiReasoner {
    async fn complete(&self, transcript: &Transcript) -> Result<ReasonerResponse> {
        if self.api_key.is_empty() {
            return Err(AgentError::Reasoner(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.base_url, self.api_key);
        let request = self.build_request(transcript);

        debug!(turns = transcript.len(), "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                if e.is_timeout() || e.is_connect() {
                    AgentError::Transient(format!("Gemini API unreachable: {}", e))
                } else {
                    AgentError::Reasoner(format!("Gemini API error: {}", e))
                }
            })?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(AgentError::Transient(format!(
                "Gemini API returned {}",
                status
            )));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(AgentError::Reasoner(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response envelope: {}", e);
            AgentError::Reasoner(format!("Gemini envelope parse error: {}", e))
        })?;

        let raw = gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| AgentError::Reasoner("Empty response from Gemini".to_string()))?;

        info!("Gemini response received");

        parse_reasoner_output(&raw)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<Part>,
}

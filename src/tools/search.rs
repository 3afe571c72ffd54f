//! HTTP-backed web search tool
//!
//! Issues a single query against a Tavily-style search API and returns
//! ranked snippets. Uses a long-lived reqwest::Client for connection
//! pooling.

use crate::error::AgentError;
use crate::models::{ResultSnippet, ToolCall};
use crate::tools::Tool;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
const DEFAULT_MAX_RESULTS: u32 = 7;
const MAX_RESULTS_CAP: u32 = 10;

pub struct WebSearchTool {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WebSearchTool {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
        }
    }

    pub fn from_env() -> Self {
        let api_key = env::var("SEARCH_API_KEY")
            .or_else(|_| env::var("TAVILY_API_KEY"))
            .unwrap_or_default();
        let base_url = env::var("SEARCH_API_BASE_URL").ok();

        if api_key.is_empty() {
            warn!("SEARCH_API_KEY not configured; search calls will fail");
        }

        Self::new(api_key, base_url)
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<ResultSnippet>> {
        if self.api_key.is_empty() {
            return Err(AgentError::Tool(
                "SEARCH_API_KEY (or TAVILY_API_KEY) is not configured".to_string(),
            ));
        }

        let url = format!("{}/search", self.base_url);
        let request = SearchRequest {
            api_key: &self.api_key,
            query,
            max_results,
        };

        debug!(query, max_results, "Calling search API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    AgentError::Transient(format!("Search API unreachable: {}", e))
                } else {
                    AgentError::Tool(format!("Search API request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Tool(format!("Invalid search response: {}", e)))?;

        Ok(parse_search_response(body))
    }
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "search"
    }

    fn description(&self) -> &'static str {
        "Search the web for real-time financial information, news, and market data"
    }

    async fn execute(&self, call: &ToolCall) -> Result<serde_json::Value> {
        let (query, max_results) = validate_arguments(&call.arguments)?;
        let snippets = self.search(&query, max_results).await?;

        debug!(
            call_id = %call.call_id,
            result_count = snippets.len(),
            "Search completed"
        );

        Ok(json!({ "results": snippets }))
    }
}

/// Arguments are constrained to a non-empty query string and an optional
/// result-count cap.
fn validate_arguments(arguments: &serde_json::Value) -> Result<(String, u32)> {
    let query = arguments
        .get("query")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AgentError::InvalidToolInput(
                "Expected a non-empty 'query' string in search arguments".to_string(),
            )
        })?;

    let max_results = arguments
        .get("max_results")
        .and_then(|v| v.as_u64())
        .map(|v| (v as u32).clamp(1, MAX_RESULTS_CAP))
        .unwrap_or(DEFAULT_MAX_RESULTS);

    Ok((query.to_string(), max_results))
}

/// 5xx and 429 are retryable; everything else (bad key, bad request) is not.
fn status_error(status: reqwest::StatusCode, body: &str) -> AgentError {
    if status.is_server_error() || status.as_u16() == 429 {
        AgentError::Transient(format!("Search API returned {}", status))
    } else {
        AgentError::Tool(format!("Search API returned {}: {}", status, body))
    }
}

fn parse_search_response(body: SearchResponse) -> Vec<ResultSnippet> {
    body.results
        .into_iter()
        .map(|r| ResultSnippet {
            title: r.title.unwrap_or_else(|| "Untitled".to_string()),
            url: r.url.unwrap_or_default(),
            snippet: r.content.unwrap_or_default(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    title: Option<String>,
    url: Option<String>,
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_arguments_requires_query() {
        assert!(validate_arguments(&json!({})).is_err());
        assert!(validate_arguments(&json!({"query": ""})).is_err());
        assert!(validate_arguments(&json!({"query": "   "})).is_err());

        let (query, max_results) =
            validate_arguments(&json!({"query": "AAPL latest closing price"})).unwrap();
        assert_eq!(query, "AAPL latest closing price");
        assert_eq!(max_results, 7);
    }

    #[test]
    fn test_validate_arguments_caps_result_count() {
        let (_, max_results) =
            validate_arguments(&json!({"query": "nvda earnings", "max_results": 50})).unwrap();
        assert_eq!(max_results, MAX_RESULTS_CAP);

        let (_, max_results) =
            validate_arguments(&json!({"query": "nvda earnings", "max_results": 3})).unwrap();
        assert_eq!(max_results, 3);
    }

    #[test]
    fn test_parse_search_response_preserves_order() {
        let body: SearchResponse = serde_json::from_value(json!({
            "results": [
                {"title": "First", "url": "https://a", "content": "alpha"},
                {"title": null, "url": "https://b", "content": "beta"}
            ]
        }))
        .unwrap();

        let snippets = parse_search_response(body);
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].title, "First");
        assert_eq!(snippets[0].snippet, "alpha");
        assert_eq!(snippets[1].title, "Untitled");
        assert_eq!(snippets[1].url, "https://b");
    }

    #[test]
    fn test_rate_limit_and_server_errors_are_transient() {
        use reqwest::StatusCode;

        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(status_error(StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(status_error(StatusCode::INTERNAL_SERVER_ERROR, "").is_transient());
        assert!(!status_error(StatusCode::UNAUTHORIZED, "bad key").is_transient());
        assert!(!status_error(StatusCode::BAD_REQUEST, "").is_transient());
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_fast() {
        let tool = WebSearchTool::new(String::new(), None);
        let call = ToolCall::new("search", json!({"query": "AAPL"}));

        let result = tool.execute(&call).await;
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.to_lowercase().contains("not configured"));
    }
}

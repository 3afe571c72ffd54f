//! Error types for the financial research agent

use std::time::Duration;
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Core Loop Errors
    // =============================

    #[error("Reasoner error: {0}")]
    Reasoner(String),

    #[error("Malformed reasoner output: {0}")]
    MalformedResponse(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    #[error("Transient upstream failure: {0}")]
    Transient(String),

    #[error("Step timed out after {0:?}")]
    StepTimeout(Duration),

    #[error("Total time budget exhausted")]
    DeadlineExceeded,

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Whether the error is worth retrying with backoff.
    ///
    /// Network timeouts, connection failures and 5xx-equivalent responses
    /// are transient; everything else (auth, bad input, parse failures)
    /// is not.
    pub fn is_transient(&self) -> bool {
        match self {
            AgentError::Transient(_) | AgentError::StepTimeout(_) => true,
            AgentError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }
}

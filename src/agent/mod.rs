//! Agent loop - drives the reasoning/tool-use cycle
//!
//! REASON → DISPATCH → OBSERVE → REASON … → ANSWER | FAIL
//!
//! One loop instance executes one query as a sequence of suspend points:
//! each reasoner or tool call is a bounded request/response exchange. The
//! transcript is exclusively owned by the run, so no locks are needed.

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::models::{AgentOutcome, ErrorKind, Query, ReasonerResponse, ToolCall, ToolResult};
use crate::reasoner::{Reasoner, FORMAT_CORRECTION};
use crate::tools::ToolRegistry;
use crate::transcript::Transcript;
use crate::Result;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of a run plus the frozen transcript and timing, for callers
/// that surface the reasoning trail (API layer, CLI).
#[derive(Debug)]
pub struct RunReport {
    pub outcome: AgentOutcome,
    pub transcript: Transcript,
    pub reasoning_steps: u32,
    pub elapsed_ms: u64,
}

/// Drives a bounded dialogue between the reasoner and the tool registry
/// until a final answer is produced or a budget is exhausted.
pub struct AgentLoop {
    reasoner: Arc<dyn Reasoner>,
    tools: ToolRegistry,
}

impl AgentLoop {
    pub fn new(reasoner: Arc<dyn Reasoner>, tools: ToolRegistry) -> Self {
        Self { reasoner, tools }
    }

    /// Run one query to completion. Exactly one outcome is produced.
    pub async fn run(&self, query: Query, config: &AgentConfig) -> AgentOutcome {
        self.run_detailed(query, config).await.outcome
    }

    /// Run one query and return the outcome together with the transcript.
    pub async fn run_detailed(&self, query: Query, config: &AgentConfig) -> RunReport {
        let started = Instant::now();
        let deadline = started + config.total_timeout;

        let mut transcript = Transcript::new();
        transcript.push_user(query.render());

        let mut steps: u32 = 0;
        let mut consecutive_errors: u32 = 0;

        info!(query = %query.text, max_steps = config.max_steps, "Agent run starting");

        let outcome = loop {
            if steps >= config.max_steps {
                break failure(
                    ErrorKind::BudgetExceeded,
                    format!(
                        "no final answer within {} reasoning steps",
                        config.max_steps
                    ),
                );
            }
            if Instant::now() >= deadline {
                break timeout_failure(config);
            }

            steps += 1;
            debug!(step = steps, state = "reasoning", "Requesting reasoner response");

            let response = self
                .call_with_budget(config, deadline, || self.reasoner.complete(&transcript))
                .await;

            match response {
                Ok(ReasonerResponse::FinalAnswer { text }) => {
                    info!(step = steps, "Final answer received");
                    transcript.push_assistant_text(text.clone());
                    break AgentOutcome::Answer { text };
                }

                Ok(ReasonerResponse::ToolRequest {
                    tool_name,
                    arguments,
                }) => {
                    let call = ToolCall::new(tool_name.clone(), arguments);
                    let call_id = call.call_id;
                    transcript.push_tool_call(call.clone());

                    let Some(tool) = self.tools.get(&tool_name) else {
                        warn!(tool = %tool_name, "Reasoner requested unregistered tool");
                        transcript.push_tool_result(ToolResult {
                            call_id,
                            tool_name: tool_name.clone(),
                            success: false,
                            content: json!({
                                "error": format!(
                                    "unknown tool '{}'; available tools: {:?}",
                                    tool_name,
                                    self.tools.list()
                                )
                            }),
                        });

                        consecutive_errors += 1;
                        if consecutive_errors >= config.consecutive_error_limit {
                            break failure(
                                ErrorKind::ToolUnavailable,
                                format!(
                                    "reasoner requested unavailable tools {} times in a row (last: '{}')",
                                    consecutive_errors, tool_name
                                ),
                            );
                        }
                        continue;
                    };

                    debug!(step = steps, state = "dispatching", tool = %tool_name, call_id = %call_id, "Dispatching tool call");

                    let result = self
                        .call_with_budget(config, deadline, || tool.execute(&call))
                        .await;

                    match result {
                        Ok(content) => {
                            transcript.push_tool_result(ToolResult {
                                call_id,
                                tool_name: tool_name.clone(),
                                success: true,
                                content,
                            });
                            consecutive_errors = 0;
                        }
                        Err(AgentError::DeadlineExceeded) => break timeout_failure(config),
                        Err(e) => {
                            // Degraded continuation: the failure goes into the
                            // transcript and the reasoner decides what to do next.
                            warn!(tool = %tool_name, error = %e, "Tool call failed");
                            transcript.push_tool_result(ToolResult {
                                call_id,
                                tool_name: tool_name.clone(),
                                success: false,
                                content: json!({ "error": e.to_string() }),
                            });

                            consecutive_errors += 1;
                            if consecutive_errors >= config.consecutive_error_limit {
                                break failure(
                                    ErrorKind::ToolUnavailable,
                                    format!(
                                        "tool calls failed {} times in a row (last: '{}': {})",
                                        consecutive_errors, tool_name, e
                                    ),
                                );
                            }
                        }
                    }
                }

                Err(AgentError::MalformedResponse(msg)) => {
                    warn!(step = steps, "Malformed reasoner output: {}", msg);
                    transcript.push_system(FORMAT_CORRECTION);

                    consecutive_errors += 1;
                    if consecutive_errors >= config.consecutive_error_limit {
                        break failure(
                            ErrorKind::ParseFailure,
                            format!(
                                "reasoner output was unparseable {} times in a row",
                                consecutive_errors
                            ),
                        );
                    }
                }

                Err(AgentError::DeadlineExceeded) => break timeout_failure(config),

                Err(e) => {
                    break failure(
                        ErrorKind::UpstreamFailure,
                        format!("reasoner failed: {}", e),
                    );
                }
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            AgentOutcome::Answer { .. } => {
                info!(steps, elapsed_ms, "Agent run succeeded");
            }
            AgentOutcome::Failure { kind, message } => {
                warn!(steps, elapsed_ms, kind = %kind, "Agent run failed: {}", message);
            }
        }

        RunReport {
            outcome,
            transcript,
            reasoning_steps: steps,
            elapsed_ms,
        }
    }

    /// Execute one upstream call under the per-step timeout and the run
    /// deadline, retrying transient failures with bounded backoff.
    ///
    /// Returns `DeadlineExceeded` when the total budget runs out mid-call;
    /// the in-flight request is abandoned.
    async fn call_with_budget<T, F, Fut>(
        &self,
        config: &AgentConfig,
        deadline: Instant,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(AgentError::DeadlineExceeded);
            }
            let remaining = deadline - now;
            let budget = config.step_timeout.min(remaining);

            match tokio::time::timeout(budget, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if e.is_transient() && attempt + 1 < config.retry.max_attempts => {
                    let delay = config
                        .retry
                        .delay_for(attempt)
                        .min(deadline.saturating_duration_since(Instant::now()));
                    warn!(attempt, error = %e, "Transient upstream failure, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Ok(Err(e)) => return Err(e),
                Err(_elapsed) => {
                    if remaining <= config.step_timeout {
                        return Err(AgentError::DeadlineExceeded);
                    }
                    if attempt + 1 < config.retry.max_attempts {
                        warn!(attempt, "Step timed out, retrying");
                        attempt += 1;
                    } else {
                        return Err(AgentError::StepTimeout(config.step_timeout));
                    }
                }
            }
        }
    }
}

fn failure(kind: ErrorKind, message: String) -> AgentOutcome {
    AgentOutcome::Failure { kind, message }
}

fn timeout_failure(config: &AgentConfig) -> AgentOutcome {
    failure(
        ErrorKind::Timeout,
        format!(
            "total time budget of {:?} exhausted",
            config.total_timeout
        ),
    )
}

//! Financial Research Agent
//!
//! The reasoning-and-tool-use loop behind an autonomous financial
//! research agent:
//! - Iterates between a reasoning service and external tools
//! - Keeps an append-only transcript per query
//! - Enforces step and wall-clock budgets with bounded retries
//! - Produces exactly one outcome per query, answer or typed failure
//!
//! LOOP:
//! REASON → DISPATCH → OBSERVE → REASON … → ANSWER | FAIL

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod reasoner;
pub mod tools;
pub mod transcript;

pub use error::Result;

// Re-export common types
pub use config::AgentConfig;
pub use models::*;
pub use transcript::Transcript;

use financial_research_agent::{
    agent::AgentLoop,
    config::AgentConfig,
    models::{AgentOutcome, Query},
    reasoner::{GeminiReasoner, MockReasoner, Reasoner},
    tools::create_default_registry,
};
use std::env;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("Financial research agent starting");

    let registry = create_default_registry();

    let reasoner: Arc<dyn Reasoner> = match env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => {
            Arc::new(GeminiReasoner::new(key, registry.specs()))
        }
        _ => {
            info!("GEMINI_API_KEY not set, using mock reasoner");
            Arc::new(MockReasoner)
        }
    };

    let agent = AgentLoop::new(reasoner, registry);
    let config = AgentConfig::from_env();

    let text = env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let text = if text.trim().is_empty() {
        "What is AAPL's latest closing price?".to_string()
    } else {
        text
    };

    info!(query = %text, "Running agent");

    let report = agent.run_detailed(Query::new(text), &config).await;

    println!("\n=== AGENT RESULT ===");
    println!("Steps: {}  Elapsed: {} ms", report.reasoning_steps, report.elapsed_ms);
    match report.outcome {
        AgentOutcome::Answer { text } => {
            println!("\n{}", text);
            Ok(())
        }
        AgentOutcome::Failure { kind, message } => {
            eprintln!("\nRun failed ({}): {}", kind, message);
            Err(format!("{}: {}", kind, message).into())
        }
    }
}

use financial_research_agent::{
    agent::AgentLoop,
    api,
    config::AgentConfig,
    reasoner::GeminiReasoner,
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

    let registry = create_default_registry();
    let api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
    let reasoner = Arc::new(GeminiReasoner::new(api_key, registry.specs()));

    let agent = Arc::new(AgentLoop::new(reasoner, registry));
    let config = AgentConfig::from_env();

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    info!("Starting research agent API on port {}", port);

    api::start_server(agent, config, port).await
}

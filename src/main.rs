use anyhow::Result;
use meet_agent::{AgentSession, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cfg = Config::load()?;

    info!("meet-agent v0.1.0");
    info!("Agent name: {}", cfg.agent_name);

    let session = AgentSession::new(cfg);
    session.run().await
}

//! `dbclaw agent`: one prompt through the role-scoped database agents.

use dbclaw_agent::{AgentOptions, AgentSession, SessionEvent};
use dbclaw_config::AppConfig;
use tracing::{debug, warn};

pub async fn run(prompt: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let connection_string = config.database.require_connection_string()?;

    let options = AgentOptions::from_config(&config.agent, connection_string)?;
    let session = AgentSession::new(&config.agent, options);
    let prompt = prompt.unwrap_or_else(|| config.agent.default_prompt.clone());

    println!("=== dbclaw agent ({}) ===", config.database.name);

    let summary = session
        .run(&prompt, |event| match event {
            SessionEvent::Text { text } => println!("Claude: {text}"),
            SessionEvent::ToolUse { name, input } => {
                debug!(tool = %name, input = %input, "Tool call");
            }
            SessionEvent::Completed(_) => {}
        })
        .await?;

    match summary {
        Some(summary) => {
            if summary.is_error {
                warn!(session = ?summary.session_id, "Agent session ended with an error");
            }
            if let Some(cost) = summary.billable() {
                println!("\nCost: ${cost:.4}");
            }
        }
        None => warn!("Agent runtime produced no result message"),
    }
    println!();

    Ok(())
}

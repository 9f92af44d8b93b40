//! `dbclaw roles`: show which role may call which operation.

use dbclaw_agent::RoleRegistry;
use dbclaw_config::AppConfig;

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = RoleRegistry::from_config(&config.agent.roles)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&registry.agents_json())?);
        return Ok(());
    }

    println!("🔐 Roles");
    println!("========\n");
    for role in registry.roles() {
        println!("  {} ({})", role.name, role.model);
        println!("    {}", role.description);
        for op in &role.tools {
            let marker = if op.is_mutating() { "✏️ " } else { "👁 " };
            println!("    {marker} {op}");
        }
        println!();
    }

    let ungated = registry.ungated();
    if !ungated.is_empty() {
        let names: Vec<&str> = ungated.iter().map(|op| op.as_str()).collect();
        println!("  ⚠️  No role may call: {}", names.join(", "));
    }

    Ok(())
}

//! `dbclaw onboard`: write a default config file.

use dbclaw_config::{AppConfig, CONNECTION_STRING_ENV};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🦀 dbclaw — First-Time Setup");
    println!("============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Put {CONNECTION_STRING_ENV}=<uri> in a .env file or your environment");
    println!("   2. Run: dbclaw doctor");
    println!("   3. Run: dbclaw load --limit 100 --dry-run");
    println!("   4. Run: dbclaw load, then dbclaw agent\n");

    Ok(())
}

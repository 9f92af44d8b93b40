//! `dbclaw doctor`: Diagnose configuration and credentials.

use dbclaw_agent::RoleRegistry;
use dbclaw_config::{AppConfig, CONNECTION_STRING_ENV, HF_TOKEN_ENV};
use dbclaw_core::store::DocumentStore;
use dbclaw_store::MongoStore;
use tracing::warn;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 dbclaw Doctor — System Diagnostics");
    println!("=====================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults (run `dbclaw onboard`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    match RoleRegistry::from_config(&config.agent.roles) {
        Ok(registry) => println!("  ✅ {} role(s) defined", registry.roles().len()),
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    if config.dataset.token.is_some() {
        println!("  ✅ {HF_TOKEN_ENV} set");
    } else {
        println!("  ⚠️  {HF_TOKEN_ENV} not set (fine for public datasets)");
    }

    match config.database.require_connection_string() {
        Ok(uri) => {
            println!("  ✅ {CONNECTION_STRING_ENV} set");
            match MongoStore::connect(uri, &config.database).await {
                Ok(store) => {
                    println!("  ✅ Database reachable");
                    if !close_cleanly(&store).await {
                        issues += 1;
                    }
                }
                Err(e) => {
                    println!("  ❌ {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    if on_path(&config.agent.command) {
        println!("  ✅ Agent runtime '{}' found", config.agent.command);
    } else {
        println!("  ⚠️  Agent runtime '{}' not on PATH", config.agent.command);
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Close a store opened for a check. Returns false if closing failed.
async fn close_cleanly(store: &dyn DocumentStore) -> bool {
    match store.close().await {
        Ok(()) => true,
        Err(e) => {
            warn!(store = store.name(), error = %e, "Failed to close store cleanly");
            println!("  ⚠️  Closing the database connection failed: {e}");
            false
        }
    }
}

fn on_path(program: &str) -> bool {
    let path = std::path::Path::new(program);
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dbclaw_core::error::StoreError;
    use dbclaw_core::value::Document;
    use dbclaw_store::InMemoryStore;

    /// A store whose shutdown always fails.
    struct StuckStore;

    #[async_trait]
    impl DocumentStore for StuckStore {
        fn name(&self) -> &str {
            "stuck"
        }

        fn database(&self) -> &str {
            "db"
        }

        async fn collection_names(&self) -> Result<Vec<String>, StoreError> {
            Ok(vec![])
        }

        async fn drop_collection(&self, _collection: &str) -> Result<(), StoreError> {
            Ok(())
        }

        async fn insert_many(
            &self,
            _collection: &str,
            documents: Vec<Document>,
        ) -> Result<usize, StoreError> {
            Ok(documents.len())
        }

        async fn count(&self, _collection: &str) -> Result<u64, StoreError> {
            Ok(0)
        }

        async fn close(&self) -> Result<(), StoreError> {
            Err(StoreError::Connection("shutdown timed out".into()))
        }
    }

    #[tokio::test]
    async fn close_failure_is_reported() {
        assert!(!close_cleanly(&StuckStore).await);
    }

    #[tokio::test]
    async fn clean_close_passes() {
        let store = InMemoryStore::new("db");
        assert!(close_cleanly(&store).await);
        assert_eq!(store.close_calls(), 1);
    }

    #[test]
    fn explicit_path_is_checked_directly() {
        assert!(!on_path("/nonexistent/dbclaw-runtime"));
    }
}

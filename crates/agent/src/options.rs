//! Session options and their rendering into runtime command-line flags.

use crate::query_tool::QueryToolServer;
use crate::roles::RoleRegistry;
use dbclaw_config::AgentConfig;
use dbclaw_core::error::AgentError;

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub roles: RoleRegistry,
    pub query_tool: QueryToolServer,
    pub permission_mode: String,
    pub setting_sources: Vec<String>,
}

impl AgentOptions {
    pub fn from_config(config: &AgentConfig, connection_string: &str) -> Result<Self, AgentError> {
        Ok(Self {
            roles: RoleRegistry::from_config(&config.roles)?,
            query_tool: QueryToolServer::from_config(&config.query_tool, connection_string),
            permission_mode: config.permission_mode.clone(),
            setting_sources: config.setting_sources.clone(),
        })
    }

    /// Flags for one non-interactive run of `prompt`.
    ///
    /// The prompt always comes last, after `--`, so a prompt starting with a
    /// dash is not read as a flag.
    pub fn to_args(&self, prompt: &str) -> Vec<String> {
        let mut args = vec![
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
            "--permission-mode".to_string(),
            self.permission_mode.clone(),
        ];
        if !self.setting_sources.is_empty() {
            args.push("--setting-sources".into());
            args.push(self.setting_sources.join(","));
        }
        args.push("--agents".into());
        args.push(self.roles.agents_json().to_string());
        args.push("--mcp-config".into());
        args.push(self.query_tool.mcp_config().to_string());
        args.push("--print".into());
        args.push("--".into());
        args.push(prompt.to_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> AgentOptions {
        AgentOptions::from_config(&AgentConfig::default(), "mongodb://localhost").unwrap()
    }

    fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn prompt_is_last_after_separator() {
        let args = options().to_args("-rf everything");
        let n = args.len();
        assert_eq!(args[n - 2], "--");
        assert_eq!(args[n - 1], "-rf everything");
    }

    #[test]
    fn stream_json_and_permission_mode() {
        let args = options().to_args("hi");
        assert_eq!(flag_value(&args, "--output-format"), Some("stream-json"));
        assert_eq!(flag_value(&args, "--permission-mode"), Some("bypassPermissions"));
        assert_eq!(flag_value(&args, "--setting-sources"), Some("user,project"));
        assert!(args.contains(&"--verbose".to_string()));
    }

    #[test]
    fn agents_and_mcp_config_are_valid_json() {
        let args = options().to_args("hi");
        let agents: serde_json::Value =
            serde_json::from_str(flag_value(&args, "--agents").unwrap()).unwrap();
        assert!(agents.get("database_writer").is_some());
        let mcp: serde_json::Value =
            serde_json::from_str(flag_value(&args, "--mcp-config").unwrap()).unwrap();
        assert_eq!(mcp["mcpServers"]["mongodb"]["type"], "stdio");
    }

    #[test]
    fn empty_setting_sources_omits_flag() {
        let mut opts = options();
        opts.setting_sources.clear();
        assert!(!opts.to_args("hi").contains(&"--setting-sources".to_string()));
    }

    #[test]
    fn invalid_roles_fail_construction() {
        let mut config = AgentConfig::default();
        config.roles[0].tools.push("format-disk".into());
        assert!(AgentOptions::from_config(&config, "mongodb://localhost").is_err());
    }
}

//! Configuration loading, validation, and management for dbclaw.
//!
//! Loads configuration from `~/.dbclaw/config.toml` with environment
//! variable overrides. Validates all settings at startup. The resulting
//! `AppConfig` is handed explicitly to each flow; nothing downstream reads
//! the environment on its own.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the database credential.
pub const CONNECTION_STRING_ENV: &str = "MONGODB_CONNECTION_STRING";

/// Environment variable holding an optional Hugging Face access token.
pub const HF_TOKEN_ENV: &str = "HF_TOKEN";

/// The root configuration structure.
///
/// Maps directly to `~/.dbclaw/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source dataset settings
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Target document database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// CSV mirror settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Agent dispatch settings
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Hugging Face dataset identifier
    #[serde(default = "default_dataset_name")]
    pub name: String,

    /// Split to load from every config
    #[serde(default = "default_split")]
    pub split: String,

    /// Collection and CSV names are `<collection_prefix>_<config>`
    #[serde(default = "default_collection_prefix")]
    pub collection_prefix: String,

    /// Base URL of the datasets-server API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Rows requested per page (the server caps this at 100)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Keep only the first N rows of each config. None = all rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_limit: Option<usize>,

    /// Only load these configs. Empty = every config the dataset lists.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configs: Vec<String>,

    /// Access token for gated datasets (usually from `HF_TOKEN`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_dataset_name() -> String {
    "cfahlgren1/hub-stats".into()
}
fn default_split() -> String {
    "train".into()
}
fn default_collection_prefix() -> String {
    "hub_stats".into()
}
fn default_endpoint() -> String {
    "https://datasets-server.huggingface.co".into()
}
fn default_page_size() -> usize {
    100
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            name: default_dataset_name(),
            split: default_split(),
            collection_prefix: default_collection_prefix(),
            endpoint: default_endpoint(),
            page_size: default_page_size(),
            row_limit: None,
            configs: vec![],
            token: None,
        }
    }
}

impl std::fmt::Debug for DatasetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetConfig")
            .field("name", &self.name)
            .field("split", &self.split)
            .field("collection_prefix", &self.collection_prefix)
            .field("endpoint", &self.endpoint)
            .field("page_size", &self.page_size)
            .field("row_limit", &self.row_limit)
            .field("configs", &self.configs)
            .field("token", &redact(&self.token))
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string (usually from `MONGODB_CONNECTION_STRING`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,

    /// Database that receives the collections
    #[serde(default = "default_database_name")]
    pub name: String,

    /// Upper bound on server selection when connecting
    #[serde(default = "default_timeout_ms")]
    pub server_selection_timeout_ms: u64,

    #[serde(default = "default_true")]
    pub tls: bool,

    /// Accept any server certificate. Development only.
    #[serde(default = "default_true")]
    pub tls_allow_invalid_certificates: bool,
}

fn default_database_name() -> String {
    "huggingface_data".into()
}
fn default_timeout_ms() -> u64 {
    5000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            name: default_database_name(),
            server_selection_timeout_ms: default_timeout_ms(),
            tls: true,
            tls_allow_invalid_certificates: true,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("connection_string", &redact(&self.connection_string))
            .field("name", &self.name)
            .field("server_selection_timeout_ms", &self.server_selection_timeout_ms)
            .field("tls", &self.tls)
            .field(
                "tls_allow_invalid_certificates",
                &self.tls_allow_invalid_certificates,
            )
            .finish()
    }
}

impl DatabaseConfig {
    /// The credential, or a fatal configuration error if it is unset or blank.
    pub fn require_connection_string(&self) -> Result<&str, ConfigError> {
        match self.connection_string.as_deref() {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(ConfigError::MissingCredential {
                var: CONNECTION_STRING_ENV,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory receiving `<collection>.csv` files
    #[serde(default = "default_export_dir")]
    pub dir: PathBuf,
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_export_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent runtime executable
    #[serde(default = "default_agent_command")]
    pub command: String,

    /// Extra arguments placed before the generated ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Prompt used when `--prompt` is not given
    #[serde(default = "default_prompt")]
    pub default_prompt: String,

    #[serde(default = "default_permission_mode")]
    pub permission_mode: String,

    /// Which settings files the runtime folds into its system prompt
    #[serde(default = "default_setting_sources")]
    pub setting_sources: Vec<String>,

    /// The external query tool the agent talks to
    #[serde(default)]
    pub query_tool: QueryToolConfig,

    /// Permission-scoped roles
    #[serde(default = "default_roles")]
    pub roles: Vec<RoleConfig>,
}

fn default_agent_command() -> String {
    "claude".into()
}
fn default_prompt() -> String {
    "Return all collections in the database".into()
}
fn default_permission_mode() -> String {
    "bypassPermissions".into()
}
fn default_setting_sources() -> Vec<String> {
    vec!["user".into(), "project".into()]
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: default_agent_command(),
            args: vec![],
            default_prompt: default_prompt(),
            permission_mode: default_permission_mode(),
            setting_sources: default_setting_sources(),
            query_tool: QueryToolConfig::default(),
            roles: default_roles(),
        }
    }
}

/// A stdio plugin server the agent runtime launches on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryToolConfig {
    /// Server name as the agent runtime will see it
    #[serde(default = "default_query_tool_name")]
    pub name: String,

    #[serde(default = "default_query_tool_command")]
    pub command: String,

    #[serde(default = "default_query_tool_args")]
    pub args: Vec<String>,

    /// Env var the server reads the database credential from
    #[serde(default = "default_query_tool_env")]
    pub connection_env: String,
}

fn default_query_tool_name() -> String {
    "mongodb".into()
}
fn default_query_tool_command() -> String {
    "npx".into()
}
fn default_query_tool_args() -> Vec<String> {
    vec!["-y".into(), "mongodb-mcp-server@latest".into()]
}
fn default_query_tool_env() -> String {
    "MDB_MCP_CONNECTION_STRING".into()
}

impl Default for QueryToolConfig {
    fn default() -> Self {
        Self {
            name: default_query_tool_name(),
            command: default_query_tool_command(),
            args: default_query_tool_args(),
            connection_env: default_query_tool_env(),
        }
    }
}

/// One permission-scoped agent role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// System prompt for the role
    #[serde(default)]
    pub prompt: String,

    /// Query-tool operations this role may call
    #[serde(default)]
    pub tools: Vec<String>,

    #[serde(default = "default_role_model")]
    pub model: String,
}

fn default_role_model() -> String {
    "sonnet".into()
}

fn default_roles() -> Vec<RoleConfig> {
    vec![
        RoleConfig {
            name: "database_reader".into(),
            description: "Reads a MongoDB database".into(),
            prompt: concat!(
                "You are a database reader. You are able to list all databases and ",
                "collections in an existing MongoDB database instance, count the number ",
                "of documents in a collection, and get the schema and storage size of a ",
                "collection."
            )
            .into(),
            tools: vec![
                "list-databases".into(),
                "list-collections".into(),
                "count".into(),
                "collection-schema".into(),
                "collection-storage-size".into(),
            ],
            model: default_role_model(),
        },
        RoleConfig {
            name: "database_writer".into(),
            description: "Writes to a MongoDB database".into(),
            prompt: concat!(
                "You are a database writer. You are able to insert, update, or delete ",
                "data in an existing MongoDB database instance. You are also able to ",
                "create search indexes on the database."
            )
            .into(),
            tools: vec![
                "insert-many".into(),
                "create-index".into(),
                "update-many".into(),
                "drop-database".into(),
                "drop-collection".into(),
            ],
            model: default_role_model(),
        },
        RoleConfig {
            name: "database_querier".into(),
            description: "Queries a MongoDB database".into(),
            prompt: concat!(
                "You are a database querier. You are able to query a MongoDB database ",
                "instance and return the results in a structured format."
            )
            .into(),
            tools: vec!["find".into()],
            model: default_role_model(),
        },
    ]
}

impl AppConfig {
    /// Load configuration from the default path (~/.dbclaw/config.toml),
    /// then apply environment overrides:
    /// - `MONGODB_CONNECTION_STRING`
    /// - `HF_TOKEN`
    /// - `DBCLAW_DATASET`, `DBCLAW_DATABASE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// Every variable that is set wins over the file; unset ones leave the
    /// file value in place.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(uri) = lookup(CONNECTION_STRING_ENV) {
            self.database.connection_string = Some(uri);
        }
        if let Some(token) = lookup(HF_TOKEN_ENV) {
            self.dataset.token = Some(token);
        }
        if let Some(name) = lookup("DBCLAW_DATASET") {
            self.dataset.name = name;
        }
        if let Some(name) = lookup("DBCLAW_DATABASE") {
            self.database.name = name;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".dbclaw")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dataset.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "dataset.name must not be empty".into(),
            ));
        }

        if self.dataset.collection_prefix.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "dataset.collection_prefix must not be empty".into(),
            ));
        }

        if !(1..=100).contains(&self.dataset.page_size) {
            return Err(ConfigError::ValidationError(
                "dataset.page_size must be between 1 and 100".into(),
            ));
        }

        if self.database.server_selection_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "database.server_selection_timeout_ms must be > 0".into(),
            ));
        }

        if self.agent.roles.is_empty() {
            return Err(ConfigError::ValidationError(
                "agent.roles must declare at least one role".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error(
        "{var} environment variable not set. Please create a .env file or set the environment variable."
    )]
    MissingCredential { var: &'static str },
}

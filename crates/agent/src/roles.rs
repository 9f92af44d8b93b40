//! Role table: which agent role may call which query-tool operation.
//!
//! The table is data: it comes from `AgentConfig::roles` and is validated
//! here once. Rules:
//! - at least one role, names unique and non-empty
//! - every listed tool is a known `QueryOperation`
//! - an operation belongs to at most one role

use dbclaw_config::RoleConfig;
use dbclaw_core::error::AgentError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The fixed operation catalog of the external query tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryOperation {
    ListDatabases,
    ListCollections,
    Count,
    CollectionSchema,
    CollectionStorageSize,
    Find,
    InsertMany,
    CreateIndex,
    UpdateMany,
    DropCollection,
    DropDatabase,
}

impl QueryOperation {
    pub const ALL: [QueryOperation; 11] = [
        Self::ListDatabases,
        Self::ListCollections,
        Self::Count,
        Self::CollectionSchema,
        Self::CollectionStorageSize,
        Self::Find,
        Self::InsertMany,
        Self::CreateIndex,
        Self::UpdateMany,
        Self::DropCollection,
        Self::DropDatabase,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListDatabases => "list-databases",
            Self::ListCollections => "list-collections",
            Self::Count => "count",
            Self::CollectionSchema => "collection-schema",
            Self::CollectionStorageSize => "collection-storage-size",
            Self::Find => "find",
            Self::InsertMany => "insert-many",
            Self::CreateIndex => "create-index",
            Self::UpdateMany => "update-many",
            Self::DropCollection => "drop-collection",
            Self::DropDatabase => "drop-database",
        }
    }

    /// Operations that change data or schema.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            Self::InsertMany
                | Self::CreateIndex
                | Self::UpdateMany
                | Self::DropCollection
                | Self::DropDatabase
        )
    }
}

impl fmt::Display for QueryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryOperation {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| AgentError::InvalidRoles(format!("unknown operation '{s}'")))
    }
}

/// A validated role.
#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub name: String,
    pub description: String,
    pub prompt: String,
    pub tools: Vec<QueryOperation>,
    pub model: String,
}

impl Role {
    pub fn allows(&self, operation: QueryOperation) -> bool {
        self.tools.contains(&operation)
    }
}

/// Result of checking a role against an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionCheck {
    Allowed,
    Denied {
        role: String,
        operation: QueryOperation,
        /// The role that does own the operation, if any
        owner: Option<String>,
    },
    UnknownRole(String),
}

#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: Vec<Role>,
}

impl RoleRegistry {
    /// Validate a role table from configuration.
    pub fn from_config(roles: &[RoleConfig]) -> Result<Self, AgentError> {
        if roles.is_empty() {
            return Err(AgentError::InvalidRoles("no roles declared".into()));
        }

        let mut owners: HashMap<QueryOperation, &str> = HashMap::new();
        let mut validated: Vec<Role> = Vec::with_capacity(roles.len());

        for role in roles {
            if role.name.trim().is_empty() {
                return Err(AgentError::InvalidRoles("role with empty name".into()));
            }
            if validated.iter().any(|r| r.name == role.name) {
                return Err(AgentError::InvalidRoles(format!(
                    "role '{}' declared twice",
                    role.name
                )));
            }

            let mut tools = Vec::with_capacity(role.tools.len());
            for tool in &role.tools {
                let op: QueryOperation = tool.parse()?;
                if let Some(owner) = owners.insert(op, &role.name) {
                    if owner != role.name {
                        return Err(AgentError::InvalidRoles(format!(
                            "operation '{op}' granted to both '{owner}' and '{}'",
                            role.name
                        )));
                    }
                    continue;
                }
                tools.push(op);
            }

            validated.push(Role {
                name: role.name.clone(),
                description: role.description.clone(),
                prompt: role.prompt.clone(),
                tools,
                model: role.model.clone(),
            });
        }

        Ok(Self { roles: validated })
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }

    /// The role an operation is gated to.
    pub fn owner_of(&self, operation: QueryOperation) -> Option<&Role> {
        self.roles.iter().find(|r| r.allows(operation))
    }

    /// Operations no role may call.
    pub fn ungated(&self) -> Vec<QueryOperation> {
        QueryOperation::ALL
            .into_iter()
            .filter(|op| self.owner_of(*op).is_none())
            .collect()
    }

    pub fn check(&self, role: &str, operation: QueryOperation) -> PermissionCheck {
        let Some(r) = self.get(role) else {
            return PermissionCheck::UnknownRole(role.to_string());
        };
        if r.allows(operation) {
            PermissionCheck::Allowed
        } else {
            PermissionCheck::Denied {
                role: role.to_string(),
                operation,
                owner: self.owner_of(operation).map(|o| o.name.clone()),
            }
        }
    }

    /// Like `check`, as a `Result`.
    pub fn authorize(&self, role: &str, operation: QueryOperation) -> Result<(), AgentError> {
        match self.check(role, operation) {
            PermissionCheck::Allowed => Ok(()),
            PermissionCheck::Denied { role, operation, .. } => Err(AgentError::PermissionDenied {
                role,
                operation: operation.to_string(),
            }),
            PermissionCheck::UnknownRole(role) => {
                Err(AgentError::InvalidRoles(format!("unknown role '{role}'")))
            }
        }
    }

    /// The role table in the agent runtime's `--agents` shape.
    pub fn agents_json(&self) -> serde_json::Value {
        let agents: serde_json::Map<String, serde_json::Value> = self
            .roles
            .iter()
            .map(|r| {
                (
                    r.name.clone(),
                    serde_json::json!({
                        "description": r.description,
                        "prompt": r.prompt,
                        "tools": r.tools.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
                        "model": r.model,
                    }),
                )
            })
            .collect();
        serde_json::Value::Object(agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbclaw_config::AgentConfig;

    fn defaults() -> RoleRegistry {
        RoleRegistry::from_config(&AgentConfig::default().roles).unwrap()
    }

    fn role(name: &str, tools: &[&str]) -> RoleConfig {
        RoleConfig {
            name: name.into(),
            description: String::new(),
            prompt: String::new(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            model: "sonnet".into(),
        }
    }

    #[test]
    fn every_operation_has_exactly_one_default_owner() {
        let registry = defaults();
        assert!(registry.ungated().is_empty());
        for op in QueryOperation::ALL {
            let owners = registry.roles().iter().filter(|r| r.allows(op)).count();
            assert_eq!(owners, 1, "{op} should have one owner");
        }
    }

    #[test]
    fn default_roles_split_read_write_query() {
        let registry = defaults();
        let reader = registry.get("database_reader").unwrap();
        assert!(reader.tools.iter().all(|op| !op.is_mutating()));
        let writer = registry.get("database_writer").unwrap();
        assert!(writer.tools.iter().all(|op| op.is_mutating()));
        assert_eq!(
            registry.get("database_querier").unwrap().tools,
            vec![QueryOperation::Find]
        );
    }

    #[test]
    fn writer_cannot_find() {
        let registry = defaults();
        assert_eq!(
            registry.check("database_writer", QueryOperation::Find),
            PermissionCheck::Denied {
                role: "database_writer".into(),
                operation: QueryOperation::Find,
                owner: Some("database_querier".into()),
            }
        );
        assert!(matches!(
            registry.authorize("database_writer", QueryOperation::Find),
            Err(AgentError::PermissionDenied { .. })
        ));
        assert!(
            registry
                .authorize("database_writer", QueryOperation::DropDatabase)
                .is_ok()
        );
    }

    #[test]
    fn unknown_role_reported() {
        assert_eq!(
            defaults().check("admin", QueryOperation::Count),
            PermissionCheck::UnknownRole("admin".into())
        );
    }

    #[test]
    fn operation_names_round_trip() {
        for op in QueryOperation::ALL {
            assert_eq!(op.as_str().parse::<QueryOperation>().unwrap(), op);
        }
        assert!("drop-everything".parse::<QueryOperation>().is_err());
    }

    #[test]
    fn unknown_tool_rejected() {
        let err = RoleRegistry::from_config(&[role("r", &["shell"])]).unwrap_err();
        assert!(err.to_string().contains("shell"));
    }

    #[test]
    fn shared_operation_rejected() {
        let result = RoleRegistry::from_config(&[role("a", &["find"]), role("b", &["find"])]);
        assert!(matches!(result, Err(AgentError::InvalidRoles(_))));
    }

    #[test]
    fn duplicate_role_rejected() {
        let result = RoleRegistry::from_config(&[role("a", &["find"]), role("a", &["count"])]);
        assert!(result.is_err());
    }

    #[test]
    fn empty_table_rejected() {
        assert!(RoleRegistry::from_config(&[]).is_err());
    }

    #[test]
    fn repeated_tool_in_one_role_is_collapsed() {
        let registry = RoleRegistry::from_config(&[role("a", &["find", "find"])]).unwrap();
        assert_eq!(registry.get("a").unwrap().tools, vec![QueryOperation::Find]);
    }

    #[test]
    fn agents_json_shape() {
        let json = defaults().agents_json();
        let reader = &json["database_reader"];
        assert_eq!(reader["model"], "sonnet");
        assert_eq!(reader["tools"][0], "list-databases");
        assert_eq!(json["database_querier"]["tools"], serde_json::json!(["find"]));
    }
}

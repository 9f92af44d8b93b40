//! Role-scoped agent dispatch.
//!
//! dbclaw does not run a model loop itself. It declares a fixed set of
//! roles (`roles`), points the agent runtime at the database query tool
//! (`query_tool`), and streams the runtime's output back (`session`).

pub mod message;
pub mod options;
pub mod query_tool;
pub mod roles;
pub mod session;

pub use message::{AgentMessage, CostSummary, SessionEvent};
pub use options::AgentOptions;
pub use query_tool::QueryToolServer;
pub use roles::{PermissionCheck, QueryOperation, Role, RoleRegistry};
pub use session::AgentSession;

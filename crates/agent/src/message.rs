//! Messages on the agent runtime's stdout, one JSON object per line.
//!
//! Only three things matter downstream: assistant text, tool calls, and the
//! final result with its cost. Everything else parses into `Unknown` or is
//! dropped by `into_events`.

use serde::{Deserialize, Serialize};

/// One line of runtime output.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    System {
        #[serde(default)]
        subtype: Option<String>,
    },
    Assistant {
        message: AssistantBody,
    },
    User {
        #[serde(default)]
        message: serde_json::Value,
    },
    Result(ResultMessage),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantBody {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultMessage {
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub total_cost_usd: Option<f64>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub num_turns: Option<u32>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// End-of-session metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostSummary {
    pub total_cost_usd: Option<f64>,
    pub duration_ms: Option<u64>,
    pub num_turns: Option<u32>,
    pub is_error: bool,
    pub session_id: Option<String>,
}

impl CostSummary {
    /// The cost, if one was reported and it is above zero.
    pub fn billable(&self) -> Option<f64> {
        self.total_cost_usd.filter(|c| *c > 0.0)
    }
}

impl From<ResultMessage> for CostSummary {
    fn from(r: ResultMessage) -> Self {
        Self {
            total_cost_usd: r.total_cost_usd,
            duration_ms: r.duration_ms,
            num_turns: r.num_turns,
            is_error: r.is_error,
            session_id: r.session_id,
        }
    }
}

/// What a session surfaces to its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A text block from the assistant.
    Text { text: String },
    /// The assistant invoked a tool (possibly via a sub-agent).
    ToolUse {
        name: String,
        input: serde_json::Value,
    },
    /// The session ended.
    Completed(CostSummary),
}

pub fn parse_line(line: &str) -> Result<AgentMessage, serde_json::Error> {
    serde_json::from_str(line)
}

impl AgentMessage {
    pub fn into_events(self) -> Vec<SessionEvent> {
        match self {
            Self::Assistant { message } => message
                .content
                .into_iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(SessionEvent::Text { text }),
                    ContentBlock::ToolUse { name, input, .. } => {
                        Some(SessionEvent::ToolUse { name, input })
                    }
                    ContentBlock::Thinking { .. } | ContentBlock::Other => None,
                })
                .collect(),
            Self::Result(result) => vec![SessionEvent::Completed(result.into())],
            Self::System { .. } | Self::User { .. } | Self::Unknown => vec![],
        }
    }
}

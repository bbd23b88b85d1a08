//! Observational events emitted while an agent runs.

use super::entities::AgentStatus;
use super::value_objects::AgentId;
use crate::util::now_millis;
use serde::{Deserialize, Serialize};

/// Event envelope: which agent, when, what.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub agent_id: AgentId,
    /// Epoch milliseconds
    pub timestamp: u64,
    #[serde(flatten)]
    pub kind: AgentEventKind,
}

impl AgentEvent {
    pub fn new(agent_id: AgentId, kind: AgentEventKind) -> Self {
        Self {
            agent_id,
            timestamp: now_millis(),
            kind,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.kind.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AgentEventKind {
    StepStart {
        step: u32,
    },
    Thought {
        step: u32,
        text: String,
    },
    Action {
        step: u32,
        tool: String,
        arguments: serde_json::Value,
    },
    Observation {
        step: u32,
        tool: String,
        success: bool,
        summary: String,
    },
    StepEnd {
        step: u32,
        input_tokens: u64,
        output_tokens: u64,
        cost: f64,
    },
    Progress {
        steps: u32,
        total_tokens: u64,
        cost: f64,
        elapsed_ms: u64,
    },
    Status {
        from: AgentStatus,
        to: AgentStatus,
    },
}

impl AgentEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentEventKind::StepStart { .. } => "step_start",
            AgentEventKind::Thought { .. } => "thought",
            AgentEventKind::Action { .. } => "action",
            AgentEventKind::Observation { .. } => "observation",
            AgentEventKind::StepEnd { .. } => "step_end",
            AgentEventKind::Progress { .. } => "progress",
            AgentEventKind::Status { .. } => "status",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_type_and_data() {
        let event = AgentEvent {
            agent_id: AgentId::new("a1"),
            timestamp: 42,
            kind: AgentEventKind::StepStart { step: 1 },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "step_start");
        assert_eq!(json["agent_id"], "a1");
        assert_eq!(json["timestamp"], 42);
        assert_eq!(json["data"]["step"], 1);
        assert_eq!(event.event_type(), "step_start");
    }
}

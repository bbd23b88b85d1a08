//! Agent domain entities

use super::budget::{AgentBudget, BudgetUsage, BudgetViolation};
use super::value_objects::AgentId;
use crate::core::error::DomainError;
use crate::role::{AgentRole, RoleConfig};
use crate::session::entities::Message;
use crate::session::response::TokenUsage;
use crate::tool::entities::ToolCall;
use crate::tool::value_objects::ToolResult;
use serde::{Deserialize, Serialize};

/// Lifecycle of an agent run.
///
/// ```text
/// idle → reasoning → acting → observing ─┬→ reasoning
///   │        │          │                ├→ completed
///   │        │          │                ├→ failed
///   │        │          │                ├→ interrupted
///   └────────┴──────────┴────────────────┴→ paused → reasoning
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Reasoning,
    Acting,
    Observing,
    /// Yielded at an iteration boundary; resumable
    Paused,
    Completed,
    Failed,
    Interrupted,
}

impl AgentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Reasoning => "reasoning",
            AgentStatus::Acting => "acting",
            AgentStatus::Observing => "observing",
            AgentStatus::Paused => "paused",
            AgentStatus::Completed => "completed",
            AgentStatus::Failed => "failed",
            AgentStatus::Interrupted => "interrupted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentStatus::Completed | AgentStatus::Failed | AgentStatus::Interrupted
        )
    }

    pub fn can_transition_to(&self, next: AgentStatus) -> bool {
        use AgentStatus::*;
        match self {
            Idle => matches!(next, Reasoning | Paused | Failed | Interrupted),
            Reasoning => matches!(next, Acting | Completed | Failed | Interrupted),
            Acting => matches!(next, Observing | Failed | Interrupted),
            Observing => matches!(next, Reasoning | Paused | Completed | Failed | Interrupted),
            Paused => matches!(next, Reasoning | Failed | Interrupted),
            Completed | Failed | Interrupted => false,
        }
    }

    /// Validated transition.
    pub fn transition(self, next: AgentStatus) -> Result<AgentStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the agent decided to do in one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentAction {
    ToolCall(ToolCall),
    Finish { response: String },
}

impl AgentAction {
    pub fn is_finish(&self) -> bool {
        matches!(self, AgentAction::Finish { .. })
    }

    pub fn tool_name(&self) -> Option<&str> {
        match self {
            AgentAction::ToolCall(call) => Some(&call.tool_name),
            AgentAction::Finish { .. } => None,
        }
    }
}

/// A tool call paired with its observed result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExchange {
    pub call: ToolCall,
    pub result: ToolResult,
}

/// One reason → act → observe iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    /// 1-based, strictly increasing within a run
    pub step_number: u32,
    /// Epoch milliseconds when the step started
    pub timestamp: u64,
    pub thought: String,
    pub action: AgentAction,
    pub observation: Option<ToolResult>,
    /// Further tool calls issued in the same response, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional: Vec<ToolExchange>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

impl AgentStep {
    /// Every tool call made in this step, primary first.
    pub fn exchanges(&self) -> Vec<(&ToolCall, Option<&ToolResult>)> {
        let mut out = Vec::with_capacity(1 + self.additional.len());
        if let AgentAction::ToolCall(call) = &self.action {
            out.push((call, self.observation.as_ref()));
        }
        out.extend(self.additional.iter().map(|e| (&e.call, Some(&e.result))));
        out
    }
}

/// Agent settings. Immutable once built; see [`AgentConfig::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub role: AgentRole,
    pub temperature: Option<f32>,
    /// Replaces the generated system prompt when set
    pub system_prompt: Option<String>,
    pub budget: AgentBudget,
    /// Model hint from the role, for provider selection
    pub model_hint: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "agent".to_string(),
            role: AgentRole::General,
            temperature: None,
            system_prompt: None,
            budget: AgentBudget::default(),
            model_hint: None,
        }
    }
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, role: AgentRole) -> Self {
        Self {
            name: name.into(),
            role,
            ..Default::default()
        }
    }

    /// Config seeded from a role profile: role budget and model hint.
    pub fn for_role(name: impl Into<String>, role_config: &RoleConfig) -> Self {
        Self {
            name: name.into(),
            role: role_config.role.clone(),
            budget: role_config.default_budget,
            model_hint: role_config.recommended_model.clone(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_budget(mut self, budget: AgentBudget) -> Self {
        self.budget = budget;
        self
    }

    /// New config with every field set in `patch` replaced.
    pub fn apply(&self, patch: AgentConfigPatch) -> Result<AgentConfig, DomainError> {
        if let Some(t) = patch.temperature
            && !(0.0..=2.0).contains(&t)
        {
            return Err(DomainError::InvalidConfig(format!(
                "temperature {} is outside 0.0..=2.0",
                t
            )));
        }
        Ok(AgentConfig {
            name: patch.name.unwrap_or_else(|| self.name.clone()),
            role: patch.role.unwrap_or_else(|| self.role.clone()),
            temperature: patch.temperature.or(self.temperature),
            system_prompt: patch.system_prompt.or_else(|| self.system_prompt.clone()),
            budget: patch.budget.unwrap_or(self.budget),
            model_hint: self.model_hint.clone(),
        })
    }
}

/// Partial update for [`AgentConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfigPatch {
    pub name: Option<String>,
    pub role: Option<AgentRole>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
    pub budget: Option<AgentBudget>,
}

/// Terminal summary of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_id: AgentId,
    pub role: AgentRole,
    pub success: bool,
    pub status: AgentStatus,
    pub response: String,
    pub steps: Vec<AgentStep>,
    pub total_tokens: TokenUsage,
    pub cost: f64,
    pub duration_ms: u64,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_violation: Option<BudgetViolation>,
}

impl AgentResult {
    /// Failed result for an agent that never ran (e.g. its dependency failed).
    pub fn not_started(role: AgentRole, reason: impl Into<String>) -> Self {
        Self {
            agent_id: AgentId::generate(),
            role,
            success: false,
            status: AgentStatus::Failed,
            response: String::new(),
            steps: Vec::new(),
            total_tokens: TokenUsage::default(),
            cost: 0.0,
            duration_ms: 0,
            error: Some(reason.into()),
            budget_violation: None,
        }
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Every tool exchange across all steps, in execution order.
    pub fn tool_exchanges(&self) -> impl Iterator<Item = (&ToolCall, Option<&ToolResult>)> {
        self.steps.iter().flat_map(|s| s.exchanges())
    }
}

/// Serializable pause/resume payload. Holds no live handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub agent_id: AgentId,
    pub task: String,
    pub status: AgentStatus,
    pub config: AgentConfig,
    pub steps: Vec<AgentStep>,
    /// Cumulative counters, including elapsed wall-clock time
    pub usage: BudgetUsage,
    pub messages: Vec<Message>,
}

impl AgentState {
    pub fn new(agent_id: AgentId, task: impl Into<String>, config: AgentConfig) -> Self {
        Self {
            agent_id,
            task: task.into(),
            status: AgentStatus::Idle,
            config,
            steps: Vec::new(),
            usage: BudgetUsage::default(),
            messages: Vec::new(),
        }
    }

    pub fn step_count(&self) -> u32 {
        self.steps.len() as u32
    }

    pub fn total_tokens(&self) -> TokenUsage {
        TokenUsage::new(self.usage.input_tokens, self.usage.output_tokens)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::ToolAccessLevel;

    #[test]
    fn happy_path_transitions() {
        let path = [
            AgentStatus::Idle,
            AgentStatus::Reasoning,
            AgentStatus::Acting,
            AgentStatus::Observing,
            AgentStatus::Reasoning,
            AgentStatus::Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn terminal_states_are_final() {
        for terminal in [AgentStatus::Completed, AgentStatus::Failed, AgentStatus::Interrupted] {
            assert!(terminal.is_terminal());
            assert!(terminal.transition(AgentStatus::Reasoning).is_err());
        }
        assert!(!AgentStatus::Paused.is_terminal());
    }

    #[test]
    fn pause_only_at_boundaries() {
        assert!(AgentStatus::Observing.can_transition_to(AgentStatus::Paused));
        assert!(AgentStatus::Idle.can_transition_to(AgentStatus::Paused));
        assert!(!AgentStatus::Acting.can_transition_to(AgentStatus::Paused));
        assert!(AgentStatus::Paused.can_transition_to(AgentStatus::Reasoning));
    }

    #[test]
    fn config_patch_replaces_only_set_fields() {
        let config = AgentConfig::new("coder", AgentRole::General).with_temperature(0.2);
        let patched = config
            .apply(AgentConfigPatch {
                role: Some(AgentRole::Tester),
                budget: Some(AgentBudget::default().with_max_iterations(3)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(patched.name, "coder");
        assert_eq!(patched.role, AgentRole::Tester);
        assert_eq!(patched.temperature, Some(0.2));
        assert_eq!(patched.budget.max_iterations, Some(3));
    }

    #[test]
    fn config_patch_rejects_bad_temperature() {
        let err = AgentConfig::default()
            .apply(AgentConfigPatch {
                temperature: Some(7.0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfig(_)));
    }

    #[test]
    fn for_role_takes_budget_and_model_hint() {
        let role = RoleConfig::new(AgentRole::Rush, "quick", ToolAccessLevel::All)
            .with_model("fast")
            .with_budget(AgentBudget::default().with_max_iterations(5));
        let config = AgentConfig::for_role("rusher", &role);
        assert_eq!(config.role, AgentRole::Rush);
        assert_eq!(config.model_hint.as_deref(), Some("fast"));
        assert_eq!(config.budget.max_iterations, Some(5));
    }

    #[test]
    fn state_survives_json() {
        let mut state = AgentState::new(AgentId::new("a1"), "fix it", AgentConfig::default());
        state.usage.record_step(10, 5, 0.5);
        state.status = AgentStatus::Paused;
        state.messages.push(Message::user("fix it"));
        let restored = AgentState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.total_tokens().total(), 15);
    }
}

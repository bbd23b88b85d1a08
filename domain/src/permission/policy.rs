//! Permission policy: maps an assessed request to allow / deny / ask.

use crate::tool::entities::{RiskLevel, ToolCall};
use serde::{Deserialize, Serialize};

/// Outcome of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    Allow,
    Deny,
    /// Defer to an interactive collaborator
    Ask,
}

impl PermissionDecision {
    pub fn as_str(&self) -> &str {
        match self {
            PermissionDecision::Allow => "allow",
            PermissionDecision::Deny => "deny",
            PermissionDecision::Ask => "ask",
        }
    }
}

impl std::fmt::Display for PermissionDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the request originates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionContext {
    pub agent_id: Option<String>,
    pub role: Option<String>,
    pub cwd: Option<String>,
}

/// A proposed tool invocation, with its assessed risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub tool_name: String,
    /// Command line or target path, whichever describes the call best
    pub subject: Option<String>,
    pub arguments: serde_json::Value,
    pub risk: RiskLevel,
    /// Name of the escalation rule that set `risk`, if any
    pub risk_reason: Option<String>,
    pub context: PermissionContext,
}

impl PermissionRequest {
    pub fn from_call(call: &ToolCall, risk: RiskLevel) -> Self {
        let subject = call
            .get_string("command")
            .or_else(|| call.get_string("path"))
            .map(str::to_string);
        let arguments = serde_json::to_value(&call.arguments).unwrap_or(serde_json::Value::Null);
        Self {
            tool_name: call.tool_name.clone(),
            subject,
            arguments,
            risk,
            risk_reason: None,
            context: PermissionContext::default(),
        }
    }

    pub fn with_risk_reason(mut self, reason: Option<String>) -> Self {
        self.risk_reason = reason;
        self
    }

    pub fn with_context(mut self, context: PermissionContext) -> Self {
        self.context = context;
        self
    }

    /// Short description for logs and prompts, e.g. `run_command(cargo test)`.
    pub fn describe(&self) -> String {
        match &self.subject {
            Some(subject) => format!("{}({})", self.tool_name, subject),
            None => self.tool_name.clone(),
        }
    }
}

/// Decision plus the reason it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionResult {
    pub decision: PermissionDecision,
    pub reason: String,
    pub risk: RiskLevel,
}

impl PermissionResult {
    pub fn allow(reason: impl Into<String>, risk: RiskLevel) -> Self {
        Self {
            decision: PermissionDecision::Allow,
            reason: reason.into(),
            risk,
        }
    }

    pub fn deny(reason: impl Into<String>, risk: RiskLevel) -> Self {
        Self {
            decision: PermissionDecision::Deny,
            reason: reason.into(),
            risk,
        }
    }

    pub fn ask(reason: impl Into<String>, risk: RiskLevel) -> Self {
        Self {
            decision: PermissionDecision::Ask,
            reason: reason.into(),
            risk,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.decision == PermissionDecision::Allow
    }
}

/// Configurable acceptance policy.
///
/// List entries are either a bare tool name (`read_file`) or a tool name with
/// a subject prefix (`run_command:cargo test`), which matches when the
/// request's command or path starts with that prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionPolicy {
    /// Requests at or below this risk are allowed without asking
    pub accept_risk_level: RiskLevel,
    /// Requests at or above this risk are denied outright (`None` disables)
    pub block_risk_level: Option<RiskLevel>,
    pub always_accept: Vec<String>,
    pub always_deny: Vec<String>,
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self {
            accept_risk_level: RiskLevel::Low,
            block_risk_level: Some(RiskLevel::Critical),
            always_accept: Vec::new(),
            always_deny: Vec::new(),
        }
    }
}

impl PermissionPolicy {
    pub fn with_accept_risk_level(mut self, level: RiskLevel) -> Self {
        self.accept_risk_level = level;
        self
    }

    pub fn with_block_risk_level(mut self, level: Option<RiskLevel>) -> Self {
        self.block_risk_level = level;
        self
    }

    pub fn with_always_accept(mut self, entry: impl Into<String>) -> Self {
        self.always_accept.push(entry.into());
        self
    }

    pub fn with_always_deny(mut self, entry: impl Into<String>) -> Self {
        self.always_deny.push(entry.into());
        self
    }

    /// Evaluate a request.
    ///
    /// Order: explicit deny list, hard block level, explicit accept list,
    /// acceptance threshold, otherwise ask. An accept entry never overrides
    /// the block level.
    pub fn evaluate(&self, request: &PermissionRequest) -> PermissionResult {
        let risk = request.risk;

        if let Some(entry) = self.always_deny.iter().find(|e| entry_matches(e, request)) {
            return PermissionResult::deny(format!("matches always-deny entry '{}'", entry), risk);
        }

        if let Some(block) = self.block_risk_level
            && risk >= block
        {
            return PermissionResult::deny(
                format!("risk {} is at or above block level {}", risk, block),
                risk,
            );
        }

        if let Some(entry) = self.always_accept.iter().find(|e| accept_entry_matches(e, request)) {
            return PermissionResult::allow(format!("matches always-accept entry '{}'", entry), risk);
        }

        if risk <= self.accept_risk_level {
            return PermissionResult::allow(
                format!("risk {} is within accepted level {}", risk, self.accept_risk_level),
                risk,
            );
        }

        PermissionResult::ask(
            format!(
                "risk {} exceeds accepted level {}",
                risk, self.accept_risk_level
            ),
            risk,
        )
    }
}

/// Shell syntax that starts another command or redirects output.
const SHELL_CONTROL: &[&str] = &[";", "&", "|", "`", "$(", "\n", "\r", ">", "<"];

fn entry_matches(entry: &str, request: &PermissionRequest) -> bool {
    match entry.split_once(':') {
        Some((tool, prefix)) => {
            tool.trim() == request.tool_name
                && request
                    .subject
                    .as_deref()
                    .is_some_and(|s| s.trim_start().starts_with(prefix.trim()))
        }
        None => entry.trim() == request.tool_name,
    }
}

/// Like [`entry_matches`], but a prefix entry only covers the subject when
/// the remainder is plain arguments, so `cargo test` does not also accept
/// `cargo test; rm -rf /`.
fn accept_entry_matches(entry: &str, request: &PermissionRequest) -> bool {
    if !entry_matches(entry, request) {
        return false;
    }
    let Some((_, prefix)) = entry.split_once(':') else {
        return true;
    };
    let subject = request.subject.as_deref().unwrap_or_default().trim_start();
    let rest = &subject[prefix.trim().len()..];
    !SHELL_CONTROL.iter().any(|c| rest.contains(c))
}

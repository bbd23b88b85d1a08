//! Permission manager
//!
//! Gate between the agent loop and the tool registry. Each proposed call is
//! assessed for risk, evaluated against the [`PermissionPolicy`], and, when
//! the policy answers `Ask`, resolved through a [`PermissionPrompt`]. Every
//! decision is logged under the `conductor::permission` target and kept in an
//! in-memory audit trail.

use crate::ports::permission_prompt::{AutoDenyPrompt, PermissionPrompt};
use conductor_domain::util::now_millis;
use conductor_domain::{
    PermissionContext, PermissionDecision, PermissionPolicy, PermissionRequest, PermissionResult,
    RiskAssessor, RiskLevel, ToolCall, ToolError, ToolResult,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Audit trail entries kept before the oldest are discarded.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// Who reached a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Policy,
    /// Named [`PermissionPrompt`] resolved an `Ask`
    Prompt(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: u64,
    pub tool_name: String,
    pub subject: Option<String>,
    pub risk: RiskLevel,
    pub decision: PermissionDecision,
    pub reason: String,
    pub source: DecisionSource,
    pub agent_id: Option<String>,
    pub role: Option<String>,
}

pub struct PermissionManager {
    assessor: RiskAssessor,
    policy: PermissionPolicy,
    prompt: Arc<dyn PermissionPrompt>,
    audit: Mutex<VecDeque<AuditEntry>>,
    audit_capacity: usize,
}

impl Default for PermissionManager {
    fn default() -> Self {
        Self::new(RiskAssessor::new(), PermissionPolicy::default())
    }
}

impl PermissionManager {
    /// Manager with the given assessor and policy; `Ask` is denied until a
    /// prompt is configured.
    pub fn new(assessor: RiskAssessor, policy: PermissionPolicy) -> Self {
        Self {
            assessor,
            policy,
            prompt: Arc::new(AutoDenyPrompt),
            audit: Mutex::new(VecDeque::new()),
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn PermissionPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_audit_capacity(mut self, capacity: usize) -> Self {
        self.audit_capacity = capacity.max(1);
        self
    }

    pub fn policy(&self) -> &PermissionPolicy {
        &self.policy
    }

    pub fn assessor(&self) -> &RiskAssessor {
        &self.assessor
    }

    /// Build a request for `call`, with its assessed risk.
    pub fn request_for(&self, call: &ToolCall, context: PermissionContext) -> PermissionRequest {
        let (risk, reason) = self.assessor.assess_with_reason(&call.tool_name, &call.arguments);
        PermissionRequest::from_call(call, risk)
            .with_risk_reason(reason)
            .with_context(context)
    }

    /// Evaluate `request` against `policy` without prompting.
    pub fn check(&self, request: &PermissionRequest, policy: &PermissionPolicy) -> PermissionResult {
        let result = policy.evaluate(request);
        self.record(request, &result, DecisionSource::Policy);
        result
    }

    /// Final allow/deny for `call` under the manager's own policy, asking the
    /// prompt when the policy defers.
    pub async fn authorize(&self, call: &ToolCall, context: PermissionContext) -> PermissionResult {
        let request = self.request_for(call, context);
        let result = self.check(&request, &self.policy);
        if result.decision != PermissionDecision::Ask {
            return result;
        }

        let approved = self.prompt.ask(&request).await;
        let source = DecisionSource::Prompt(self.prompt.name().to_string());
        let resolved = if approved {
            PermissionResult::allow(format!("approved by {}", self.prompt.name()), request.risk)
        } else {
            PermissionResult::deny(format!("rejected by {}", self.prompt.name()), request.risk)
        };
        self.record(&request, &resolved, source);
        resolved
    }

    /// Failed tool result standing in for a denied call.
    pub fn denied_result(call: &ToolCall, result: &PermissionResult) -> ToolResult {
        ToolResult::failure(
            &call.tool_name,
            ToolError::permission_denied(format!("{} (risk: {})", result.reason, result.risk)),
        )
    }

    /// Snapshot of the audit trail, oldest first.
    pub fn audit_trail(&self) -> Vec<AuditEntry> {
        match self.audit.lock() {
            Ok(audit) => audit.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    fn record(&self, request: &PermissionRequest, result: &PermissionResult, source: DecisionSource) {
        match result.decision {
            PermissionDecision::Deny => warn!(
                target: "conductor::permission",
                tool = %request.tool_name,
                subject = request.subject.as_deref().unwrap_or(""),
                risk = %result.risk,
                decision = %result.decision,
                reason = %result.reason,
                "Tool call denied"
            ),
            _ => info!(
                target: "conductor::permission",
                tool = %request.tool_name,
                subject = request.subject.as_deref().unwrap_or(""),
                risk = %result.risk,
                decision = %result.decision,
                reason = %result.reason,
                "Permission decision"
            ),
        }

        let entry = AuditEntry {
            timestamp: now_millis(),
            tool_name: request.tool_name.clone(),
            subject: request.subject.clone(),
            risk: result.risk,
            decision: result.decision,
            reason: result.reason.clone(),
            source,
            agent_id: request.context.agent_id.clone(),
            role: request.context.role.clone(),
        };
        let mut audit = match self.audit.lock() {
            Ok(audit) => audit,
            Err(poisoned) => poisoned.into_inner(),
        };
        if audit.len() >= self.audit_capacity {
            audit.pop_front();
        }
        audit.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::permission_prompt::AutoApprovePrompt;
    use conductor_domain::tool::value_objects::codes;

    fn command(cmd: &str) -> ToolCall {
        ToolCall::new("run_command").with_arg("command", cmd)
    }

    #[test]
    fn medium_acceptance_asks_for_high_risk() {
        let manager = PermissionManager::default();
        let policy = PermissionPolicy::default().with_accept_risk_level(RiskLevel::Medium);
        let request = PermissionRequest::from_call(&command("deploy"), RiskLevel::High);

        let result = manager.check(&request, &policy);
        assert_eq!(result.decision, PermissionDecision::Ask);
        assert_eq!(result.risk, RiskLevel::High);
    }

    #[test]
    fn low_risk_is_allowed_by_default() {
        let manager = PermissionManager::default();
        let request = manager.request_for(
            &ToolCall::new("read_file").with_arg("path", "src/lib.rs"),
            PermissionContext::default(),
        );
        let result = manager.check(&request, manager.policy());
        assert!(result.is_allowed());
    }

    #[test]
    fn always_deny_beats_low_risk() {
        let manager = PermissionManager::default();
        let policy = PermissionPolicy::default().with_always_deny("read_file");
        let request = manager.request_for(
            &ToolCall::new("read_file").with_arg("path", "src/lib.rs"),
            PermissionContext::default(),
        );
        assert_eq!(manager.check(&request, &policy).decision, PermissionDecision::Deny);
    }

    #[tokio::test]
    async fn ask_is_resolved_by_prompt() {
        let approving = PermissionManager::default().with_prompt(Arc::new(AutoApprovePrompt));
        let result = approving
            .authorize(&command("cargo build"), PermissionContext::default())
            .await;
        assert!(result.is_allowed());
        assert!(result.reason.contains("auto_approve"));

        let denying = PermissionManager::default();
        let result = denying
            .authorize(&command("cargo build"), PermissionContext::default())
            .await;
        assert_eq!(result.decision, PermissionDecision::Deny);
    }

    #[tokio::test]
    async fn critical_commands_are_blocked_even_with_approving_prompt() {
        let manager = PermissionManager::default().with_prompt(Arc::new(AutoApprovePrompt));
        let result = manager
            .authorize(&command("sudo rm -rf /"), PermissionContext::default())
            .await;
        assert_eq!(result.decision, PermissionDecision::Deny);
        assert_eq!(result.risk, RiskLevel::Critical);
    }

    #[tokio::test]
    async fn audit_trail_records_policy_and_prompt_decisions() {
        let manager = PermissionManager::default().with_prompt(Arc::new(AutoApprovePrompt));
        let context = PermissionContext {
            agent_id: Some("agent-1".into()),
            role: Some("tester".into()),
            cwd: None,
        };
        manager.authorize(&command("cargo test"), context).await;

        let trail = manager.audit_trail();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].decision, PermissionDecision::Ask);
        assert_eq!(trail[0].source, DecisionSource::Policy);
        assert_eq!(trail[1].decision, PermissionDecision::Allow);
        assert_eq!(trail[1].source, DecisionSource::Prompt("auto_approve".into()));
        assert_eq!(trail[1].agent_id.as_deref(), Some("agent-1"));
        assert_eq!(trail[1].subject.as_deref(), Some("cargo test"));
    }

    #[test]
    fn audit_trail_is_bounded() {
        let manager = PermissionManager::default().with_audit_capacity(2);
        let request = PermissionRequest::from_call(&command("ls"), RiskLevel::Low);
        for _ in 0..5 {
            manager.check(&request, manager.policy());
        }
        assert_eq!(manager.audit_trail().len(), 2);
    }

    #[test]
    fn denied_result_carries_code_and_reason() {
        let call = command("rm -rf /");
        let result = PermissionManager::denied_result(
            &call,
            &PermissionResult::deny("blocked", RiskLevel::Critical),
        );
        assert!(!result.is_success());
        let err = result.error().unwrap();
        assert_eq!(err.code, codes::PERMISSION_DENIED);
        assert!(err.message.contains("blocked"));
    }
}

//! Permission configuration from TOML (`[permissions]` section)

use conductor_application::{AutoApprovePrompt, AutoDenyPrompt, PermissionPrompt};
use conductor_domain::{ConfigIssue, ConfigIssueCode, PermissionPolicy, RiskLevel};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// How `ask` decisions are answered when no interactive front-end exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    AutoApprove,
    #[default]
    AutoDeny,
}

impl PromptMode {
    pub fn as_str(&self) -> &str {
        match self {
            PromptMode::AutoApprove => "auto_approve",
            PromptMode::AutoDeny => "auto_deny",
        }
    }

    pub fn prompt(&self) -> Arc<dyn PermissionPrompt> {
        match self {
            PromptMode::AutoApprove => Arc::new(AutoApprovePrompt),
            PromptMode::AutoDeny => Arc::new(AutoDenyPrompt),
        }
    }
}

impl FromStr for PromptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "auto_approve" | "approve" | "yes" => Ok(PromptMode::AutoApprove),
            "auto_deny" | "auto_reject" | "deny" | "no" => Ok(PromptMode::AutoDeny),
            other => Err(format!("unknown prompt mode '{}'", other)),
        }
    }
}

/// Raw permission configuration from TOML
///
/// # Example
///
/// ```toml
/// [permissions]
/// accept_risk_level = "medium"     # low, medium, high, critical
/// block_risk_level = "critical"    # or "none" to never block
/// always_accept = ["run_command:cargo test"]
/// always_deny = ["run_command:git push"]
/// prompt = "auto_deny"             # auto_approve, auto_deny
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePermissionsConfig {
    pub accept_risk_level: String,
    pub block_risk_level: String,
    pub always_accept: Vec<String>,
    pub always_deny: Vec<String>,
    pub prompt: String,
}

impl Default for FilePermissionsConfig {
    fn default() -> Self {
        Self {
            accept_risk_level: "low".to_string(),
            block_risk_level: "critical".to_string(),
            always_accept: Vec::new(),
            always_deny: Vec::new(),
            prompt: "auto_deny".to_string(),
        }
    }
}

fn parse_level(field: &str, value: &str, fallback: RiskLevel) -> (RiskLevel, Option<ConfigIssue>) {
    match value.parse::<RiskLevel>() {
        Ok(level) => (level, None),
        Err(_) => (
            fallback,
            Some(ConfigIssue::warning(
                ConfigIssueCode::UnknownRiskLevel,
                format!(
                    "permissions.{}: unknown value '{}', falling back to '{}'",
                    field, value, fallback
                ),
            )),
        ),
    }
}

impl FilePermissionsConfig {
    pub fn to_policy(&self) -> (PermissionPolicy, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let defaults = PermissionPolicy::default();

        let (accept, issue) = parse_level("accept_risk_level", &self.accept_risk_level, defaults.accept_risk_level);
        issues.extend(issue);

        let block = match self.block_risk_level.trim().to_lowercase().as_str() {
            "none" | "off" | "" => None,
            value => {
                let (level, issue) = parse_level("block_risk_level", value, RiskLevel::Critical);
                issues.extend(issue);
                Some(level)
            }
        };

        if let Some(block) = block
            && block <= accept
        {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::BlockBelowAccept,
                format!(
                    "permissions: block level '{}' is not above accept level '{}'; requests at '{}' and above are denied",
                    block, accept, block
                ),
            ));
        }

        let policy = PermissionPolicy {
            accept_risk_level: accept,
            block_risk_level: block,
            always_accept: self.always_accept.clone(),
            always_deny: self.always_deny.clone(),
        };
        (policy, issues)
    }

    pub fn parse_prompt_mode(&self) -> (PromptMode, Vec<ConfigIssue>) {
        match self.prompt.parse::<PromptMode>() {
            Ok(mode) => (mode, vec![]),
            Err(_) => (
                PromptMode::default(),
                vec![ConfigIssue::warning(
                    ConfigIssueCode::UnknownPromptMode,
                    format!(
                        "permissions.prompt: unknown value '{}', falling back to 'auto_deny'",
                        self.prompt
                    ),
                )],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_domain_default() {
        let (policy, issues) = FilePermissionsConfig::default().to_policy();
        assert!(issues.is_empty());
        assert_eq!(policy, PermissionPolicy::default());
    }

    #[test]
    fn none_disables_blocking() {
        let config = FilePermissionsConfig {
            accept_risk_level: "medium".into(),
            block_risk_level: "none".into(),
            ..Default::default()
        };
        let (policy, issues) = config.to_policy();
        assert!(issues.is_empty());
        assert_eq!(policy.accept_risk_level, RiskLevel::Medium);
        assert_eq!(policy.block_risk_level, None);
    }

    #[test]
    fn unknown_levels_fall_back_with_warning() {
        let config = FilePermissionsConfig {
            accept_risk_level: "sometimes".into(),
            ..Default::default()
        };
        let (policy, issues) = config.to_policy();
        assert_eq!(policy.accept_risk_level, RiskLevel::Low);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConfigIssueCode::UnknownRiskLevel);
    }

    #[test]
    fn block_at_accept_level_is_flagged() {
        let config = FilePermissionsConfig {
            accept_risk_level: "high".into(),
            block_risk_level: "medium".into(),
            ..Default::default()
        };
        let (_, issues) = config.to_policy();
        assert_eq!(issues[0].code, ConfigIssueCode::BlockBelowAccept);
    }

    #[test]
    fn prompt_mode_aliases() {
        assert_eq!("auto-approve".parse::<PromptMode>().unwrap(), PromptMode::AutoApprove);
        assert_eq!("auto_reject".parse::<PromptMode>().unwrap(), PromptMode::AutoDeny);

        let config = FilePermissionsConfig {
            prompt: "ask-me".into(),
            ..Default::default()
        };
        let (mode, issues) = config.parse_prompt_mode();
        assert_eq!(mode, PromptMode::AutoDeny);
        assert_eq!(issues[0].code, ConfigIssueCode::UnknownPromptMode);
    }
}

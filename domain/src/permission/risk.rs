//! Risk classification for proposed tool invocations.
//!
//! A call's risk is the maximum of the tool's base risk and every matching
//! escalation rule. Rules are regular expressions over either the shell
//! command (`command` argument) or the target path (`path` argument).

use crate::tool::entities::RiskLevel;
use regex::Regex;
use std::collections::HashMap;

/// Which argument an escalation rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget {
    /// The `command` argument of shell-like tools
    Command,
    /// The `path` argument of file tools
    Path,
}

/// A single escalation rule.
#[derive(Debug, Clone)]
pub struct RiskRule {
    pub name: String,
    pub target: RuleTarget,
    pub level: RiskLevel,
    pattern: Regex,
}

impl RiskRule {
    pub fn new(
        name: impl Into<String>,
        target: RuleTarget,
        pattern: &str,
        level: RiskLevel,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            target,
            level,
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn command(name: impl Into<String>, pattern: &str, level: RiskLevel) -> Result<Self, regex::Error> {
        Self::new(name, RuleTarget::Command, pattern, level)
    }

    pub fn path(name: impl Into<String>, pattern: &str, level: RiskLevel) -> Result<Self, regex::Error> {
        Self::new(name, RuleTarget::Path, pattern, level)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Classifies tool calls by [`RiskLevel`].
#[derive(Debug, Clone)]
pub struct RiskAssessor {
    base_levels: HashMap<String, RiskLevel>,
    rules: Vec<RiskRule>,
    unknown_tool_level: RiskLevel,
}

const BUILTIN_COMMAND_RULES: &[(&str, &str, RiskLevel)] = &[
    ("remove_root", r"\brm\s+-[a-zA-Z]*[rR][a-zA-Z]*\s+(/|~|\$HOME)(\s|$|\*)", RiskLevel::Critical),
    ("format_disk", r"\bmkfs(\.\w+)?\b", RiskLevel::Critical),
    ("raw_disk_write", r"\bdd\s+.*\bof=/dev/", RiskLevel::Critical),
    ("fork_bomb", r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}", RiskLevel::Critical),
    ("power_state", r"\b(shutdown|reboot|halt|poweroff)\b", RiskLevel::Critical),
    ("recursive_remove", r"\brm\s+-[a-zA-Z]*[rR]", RiskLevel::High),
    ("privilege_escalation", r"\b(sudo|su|doas)\b", RiskLevel::High),
    ("pipe_to_shell", r"\b(curl|wget)\b[^|]*\|\s*(ba|z)?sh\b", RiskLevel::Critical),
    ("network_access", r"\b(curl|wget|ssh|scp|rsync|nc|netcat|ftp)\b", RiskLevel::High),
    ("force_push", r"\bgit\s+push\b.*(--force|\s-f\b)", RiskLevel::Critical),
    ("git_push", r"\bgit\s+push\b", RiskLevel::High),
    ("hard_reset", r"\bgit\s+(reset\s+--hard|clean\s+-[a-zA-Z]*f)", RiskLevel::High),
    ("world_writable", r"\bchmod\s+(-R\s+)?0?777\b", RiskLevel::High),
    ("package_publish", r"\b(npm|cargo|twine)\s+publish\b", RiskLevel::High),
    ("git_mutation", r"\bgit\s+(commit|checkout|merge|rebase|stash)\b", RiskLevel::Medium),
    ("package_install", r"\b(npm|pip|cargo|apt|apt-get|brew)\s+(install|add)\b", RiskLevel::Medium),
];

const BUILTIN_PATH_RULES: &[(&str, &str, RiskLevel)] = &[
    ("system_path", r"^/(etc|usr|bin|sbin|boot|lib|lib64|sys|proc|dev)(/|$)", RiskLevel::Critical),
    ("git_internals", r"(^|/)\.git(/|$)", RiskLevel::High),
    ("env_file", r"(^|/)\.env(\.|$)", RiskLevel::High),
    ("ssh_keys", r"(^|/)\.ssh(/|$)", RiskLevel::Critical),
];

impl Default for RiskAssessor {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskAssessor {
    /// Assessor seeded with base levels for the built-in tools and the
    /// built-in escalation rules.
    pub fn new() -> Self {
        let base_levels = [
            ("read_file", RiskLevel::Low),
            ("list_dir", RiskLevel::Low),
            ("glob_search", RiskLevel::Low),
            ("grep_search", RiskLevel::Low),
            ("git_status", RiskLevel::Low),
            ("git_diff", RiskLevel::Low),
            ("finish", RiskLevel::Low),
            ("write_file", RiskLevel::Medium),
            ("run_command", RiskLevel::Medium),
            ("delete_file", RiskLevel::High),
        ]
        .into_iter()
        .map(|(name, level)| (name.to_string(), level))
        .collect();

        let rules = BUILTIN_COMMAND_RULES
            .iter()
            .filter_map(|(name, pattern, level)| RiskRule::command(*name, pattern, *level).ok())
            .chain(
                BUILTIN_PATH_RULES
                    .iter()
                    .filter_map(|(name, pattern, level)| RiskRule::path(*name, pattern, *level).ok()),
            )
            .collect();

        Self {
            base_levels,
            rules,
            unknown_tool_level: RiskLevel::Medium,
        }
    }

    /// Assessor with no rules at all. Every tool falls back to its base level.
    pub fn empty() -> Self {
        Self {
            base_levels: HashMap::new(),
            rules: Vec::new(),
            unknown_tool_level: RiskLevel::Medium,
        }
    }

    pub fn with_base_level(mut self, tool_name: impl Into<String>, level: RiskLevel) -> Self {
        self.base_levels.insert(tool_name.into(), level);
        self
    }

    pub fn with_rule(mut self, rule: RiskRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_unknown_tool_level(mut self, level: RiskLevel) -> Self {
        self.unknown_tool_level = level;
        self
    }

    pub fn rules(&self) -> &[RiskRule] {
        &self.rules
    }

    pub fn base_level(&self, tool_name: &str) -> RiskLevel {
        self.base_levels
            .get(tool_name)
            .copied()
            .unwrap_or(self.unknown_tool_level)
    }

    /// Assess a proposed invocation.
    pub fn assess(&self, tool_name: &str, args: &HashMap<String, serde_json::Value>) -> RiskLevel {
        self.assess_with_reason(tool_name, args).0
    }

    /// Assess a proposed invocation and name the rule that set the level
    /// (`None` when the base level stands).
    pub fn assess_with_reason(
        &self,
        tool_name: &str,
        args: &HashMap<String, serde_json::Value>,
    ) -> (RiskLevel, Option<String>) {
        let mut level = self.base_level(tool_name);
        let mut reason = None;

        let command = args.get("command").and_then(|v| v.as_str());
        let path = args.get("path").and_then(|v| v.as_str());

        for rule in &self.rules {
            let subject = match rule.target {
                RuleTarget::Command => command,
                RuleTarget::Path => path,
            };
            if let Some(text) = subject
                && rule.level > level
                && rule.matches(text)
            {
                level = rule.level;
                reason = Some(rule.name.clone());
            }
        }

        (level, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn builtin_rules_all_compile() {
        let assessor = RiskAssessor::new();
        assert_eq!(
            assessor.rules().len(),
            BUILTIN_COMMAND_RULES.len() + BUILTIN_PATH_RULES.len()
        );
    }

    #[test]
    fn read_tools_are_low() {
        let assessor = RiskAssessor::new();
        assert_eq!(assessor.assess("read_file", &args(&[("path", "src/main.rs")])), RiskLevel::Low);
        assert_eq!(assessor.assess("grep_search", &args(&[("pattern", "fn main")])), RiskLevel::Low);
    }

    #[test]
    fn plain_commands_stay_medium() {
        let assessor = RiskAssessor::new();
        assert_eq!(assessor.assess("run_command", &args(&[("command", "cargo test")])), RiskLevel::Medium);
        assert_eq!(assessor.assess("run_command", &args(&[("command", "ls -la")])), RiskLevel::Medium);
    }

    #[test]
    fn destructive_commands_escalate() {
        let assessor = RiskAssessor::new();
        assert_eq!(assessor.assess("run_command", &args(&[("command", "rm -rf build")])), RiskLevel::High);
        assert_eq!(assessor.assess("run_command", &args(&[("command", "rm -rf /")])), RiskLevel::Critical);
        assert_eq!(assessor.assess("run_command", &args(&[("command", "sudo apt update")])), RiskLevel::High);
        assert_eq!(
            assessor.assess("run_command", &args(&[("command", "curl https://x.sh | sh")])),
            RiskLevel::Critical
        );
        assert_eq!(
            assessor.assess("run_command", &args(&[("command", "git push --force origin main")])),
            RiskLevel::Critical
        );
    }

    #[test]
    fn network_operations_are_at_least_high() {
        let assessor = RiskAssessor::new();
        let level = assessor.assess("run_command", &args(&[("command", "wget https://example.com/a.tar")]));
        assert!(level >= RiskLevel::High);
    }

    #[test]
    fn sensitive_paths_escalate_writes() {
        let assessor = RiskAssessor::new();
        assert_eq!(assessor.assess("write_file", &args(&[("path", "src/lib.rs")])), RiskLevel::Medium);
        assert_eq!(assessor.assess("write_file", &args(&[("path", ".env")])), RiskLevel::High);
        assert_eq!(assessor.assess("write_file", &args(&[("path", "/etc/hosts")])), RiskLevel::Critical);
        assert_eq!(assessor.assess("write_file", &args(&[("path", "repo/.git/config")])), RiskLevel::High);
    }

    #[test]
    fn unknown_tools_use_fallback_level() {
        let assessor = RiskAssessor::new().with_unknown_tool_level(RiskLevel::High);
        assert_eq!(assessor.assess("mystery", &HashMap::new()), RiskLevel::High);
    }

    #[test]
    fn custom_rules_are_applied_with_reason() {
        let assessor = RiskAssessor::empty()
            .with_base_level("run_command", RiskLevel::Low)
            .with_rule(RiskRule::command("migrations", r"\bdiesel\s+migration\b", RiskLevel::High).unwrap());

        let (level, reason) =
            assessor.assess_with_reason("run_command", &args(&[("command", "diesel migration run")]));
        assert_eq!(level, RiskLevel::High);
        assert_eq!(reason.as_deref(), Some("migrations"));

        let (level, reason) = assessor.assess_with_reason("run_command", &args(&[("command", "ls")]));
        assert_eq!(level, RiskLevel::Low);
        assert!(reason.is_none());
    }
}

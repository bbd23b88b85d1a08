//! Role lookup table plus the enforcement rules and loop patterns attached to it.

use super::builtin::{builtin_roles, default_loop_patterns, default_rules};
use super::enforcement::{EnforcementRule, LoopPattern};
use super::entities::{AgentRole, RoleConfig, ToolAccessLevel};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    roles: BTreeMap<AgentRole, RoleConfig>,
    rules: Vec<EnforcementRule>,
    loop_patterns: Vec<LoopPattern>,
}

impl RoleRegistry {
    /// Empty registry: no roles, rules or patterns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the nine built-in roles, default enforcement
    /// rules and the refactor → test → review loop pattern.
    pub fn with_builtin_roles() -> Self {
        let mut registry = Self::new();
        for config in builtin_roles() {
            registry.register(config);
        }
        registry.rules = default_rules();
        registry.loop_patterns = default_loop_patterns();
        registry
    }

    /// Add or replace a role profile.
    pub fn register(&mut self, config: RoleConfig) {
        self.roles.insert(config.role.clone(), config);
    }

    pub fn get(&self, role: &AgentRole) -> Option<&RoleConfig> {
        self.roles.get(role)
    }

    pub fn has(&self, role: &AgentRole) -> bool {
        self.roles.contains_key(role)
    }

    pub fn get_or_err(&self, role: &AgentRole) -> Result<&RoleConfig, RoleError> {
        self.get(role)
            .ok_or_else(|| RoleError::UnknownRole(role.to_string()))
    }

    /// Every registered profile, ordered by role.
    pub fn roles(&self) -> Vec<&RoleConfig> {
        self.roles.values().collect()
    }

    pub fn tool_access_description(&self, level: ToolAccessLevel) -> &'static str {
        level.description()
    }

    /// The subset of `available` tool names the role may call.
    pub fn allowed_tools(&self, role: &AgentRole, available: &[&str]) -> Result<Vec<String>, RoleError> {
        let config = self.get_or_err(role)?;
        Ok(available
            .iter()
            .filter(|name| config.permits(name))
            .map(|name| name.to_string())
            .collect())
    }

    pub fn rules(&self) -> &[EnforcementRule] {
        &self.rules
    }

    pub fn add_rule(&mut self, rule: EnforcementRule) {
        self.rules.push(rule);
    }

    pub fn loop_patterns(&self) -> &[LoopPattern] {
        &self.loop_patterns
    }

    pub fn register_loop_pattern(&mut self, pattern: LoopPattern) {
        self.loop_patterns.retain(|p| p.name != pattern.name);
        self.loop_patterns.push(pattern);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::budget::AgentBudget;
    use crate::role::enforcement::{EnforcementTiming, EnforcementTrigger};

    const ALL_TOOLS: &[&str] = &[
        "read_file",
        "write_file",
        "list_dir",
        "delete_file",
        "run_command",
        "glob_search",
        "grep_search",
        "git_status",
        "git_diff",
    ];

    #[test]
    fn builtin_registry_has_all_roles() {
        let registry = RoleRegistry::with_builtin_roles();
        for role in AgentRole::BUILTIN {
            assert!(registry.has(&role), "missing {}", role);
        }
        assert_eq!(registry.roles().len(), 9);
        assert!(!registry.rules().is_empty());
        assert_eq!(registry.loop_patterns().len(), 1);
    }

    #[test]
    fn unknown_role_errors() {
        let registry = RoleRegistry::with_builtin_roles();
        let custom = AgentRole::Custom("migrator".into());
        assert!(!registry.has(&custom));
        assert_eq!(
            registry.get_or_err(&custom).unwrap_err(),
            RoleError::UnknownRole("migrator".into())
        );
    }

    #[test]
    fn custom_roles_can_be_registered() {
        let mut registry = RoleRegistry::with_builtin_roles();
        let custom = AgentRole::Custom("migrator".into());
        registry.register(
            RoleConfig::new(custom.clone(), "runs migrations", ToolAccessLevel::ReadOnly)
                .allow("run_command")
                .with_budget(AgentBudget::default().with_max_iterations(4)),
        );
        let tools = registry.allowed_tools(&custom, ALL_TOOLS).unwrap();
        assert!(tools.contains(&"run_command".to_string()));
        assert!(!tools.contains(&"write_file".to_string()));
    }

    #[test]
    fn read_only_roles_get_no_write_tools() {
        let registry = RoleRegistry::with_builtin_roles();
        let tools = registry.allowed_tools(&AgentRole::Finder, ALL_TOOLS).unwrap();
        assert_eq!(tools, vec!["read_file", "list_dir", "glob_search", "grep_search"]);
    }

    #[test]
    fn security_role_forbidden_tools_win() {
        let registry = RoleRegistry::with_builtin_roles();
        let tools = registry.allowed_tools(&AgentRole::Security, ALL_TOOLS).unwrap();
        assert!(tools.contains(&"git_diff".to_string()));
        assert!(!tools.contains(&"write_file".to_string()));
        assert!(!tools.contains(&"run_command".to_string()));
    }

    #[test]
    fn access_descriptions_are_human_readable() {
        let registry = RoleRegistry::new();
        assert!(registry
            .tool_access_description(ToolAccessLevel::ReadOnly)
            .starts_with("Read-only"));
    }

    #[test]
    fn added_rules_follow_defaults() {
        let mut registry = RoleRegistry::with_builtin_roles();
        let before = registry.rules().len();
        registry.add_rule(EnforcementRule::new(
            "librarian-first",
            EnforcementTrigger::Always,
            AgentRole::Librarian,
            EnforcementTiming::Before,
            "Gather docs before anything else",
        ));
        assert_eq!(registry.rules().len(), before + 1);
        assert_eq!(registry.rules()[before].name, "librarian-first");
    }

    #[test]
    fn loop_patterns_replace_by_name() {
        let mut registry = RoleRegistry::with_builtin_roles();
        registry.register_loop_pattern(LoopPattern::new(
            "refactor-test-review",
            vec![AgentRole::Refactoring, AgentRole::Tester],
            2,
        ));
        assert_eq!(registry.loop_patterns().len(), 1);
        assert_eq!(registry.loop_patterns()[0].max_iterations, 2);
    }
}

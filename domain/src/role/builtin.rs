//! Built-in role profiles, enforcement rules and loop patterns.

use super::enforcement::{
    EnforcementRule, EnforcementTiming, EnforcementTrigger, LoopPattern, StateCondition,
    TriggerCategory,
};
use super::entities::{AgentRole, RoleConfig, ToolAccessLevel};
use crate::agent::budget::AgentBudget;

fn budget(iterations: u32) -> AgentBudget {
    AgentBudget::default().with_max_iterations(iterations)
}

pub fn builtin_roles() -> Vec<RoleConfig> {
    vec![
        RoleConfig::new(
            AgentRole::Finder,
            "Locates files, symbols and call sites relevant to a task",
            ToolAccessLevel::ReadOnly,
        )
        .with_model("fast")
        .with_budget(budget(15))
        .with_system_prompt(
            "You find things. Report exact file paths and line numbers. Do not propose changes.",
        ),
        RoleConfig::new(
            AgentRole::Thinker,
            "Analyses problems and designs solutions without editing code",
            ToolAccessLevel::ReadOnly,
        )
        .with_model("reasoning")
        .with_budget(budget(20))
        .with_system_prompt(
            "You analyse and design. Explain trade-offs and give a concrete recommendation.",
        ),
        RoleConfig::new(
            AgentRole::Librarian,
            "Reads documentation and gathers reference material",
            ToolAccessLevel::ReadOnly,
        )
        .with_model("fast")
        .with_budget(budget(15))
        .with_system_prompt("You research. Quote the relevant passages and cite their files."),
        RoleConfig::new(
            AgentRole::Refactoring,
            "Restructures code while preserving behaviour",
            ToolAccessLevel::ReadWriteBash,
        )
        .with_model("balanced")
        .forbid("delete_file")
        .with_budget(budget(30))
        .with_system_prompt(
            "You refactor. Keep behaviour identical and run the build or tests after each change.",
        ),
        RoleConfig::new(
            AgentRole::Reviewer,
            "Reviews changes for correctness, clarity and style",
            ToolAccessLevel::ReadGit,
        )
        .with_model("reasoning")
        .with_budget(budget(15))
        .with_system_prompt(
            "You review. List concrete problems with file and line. Say \"LGTM\" if there are none.",
        ),
        RoleConfig::new(
            AgentRole::Tester,
            "Writes and runs tests",
            ToolAccessLevel::ReadWriteBash,
        )
        .with_model("balanced")
        .with_budget(budget(25))
        .with_system_prompt("You test. Add focused tests, run them and report the results."),
        RoleConfig::new(
            AgentRole::Security,
            "Audits changes for vulnerabilities and unsafe practices",
            ToolAccessLevel::ReadGit,
        )
        .with_model("reasoning")
        .forbid("write_file")
        .forbid("delete_file")
        .with_budget(budget(20))
        .with_system_prompt(
            "You audit security. Report each issue with severity and location. \
             Say \"No security issues\" if you find none.",
        ),
        RoleConfig::new(
            AgentRole::Rush,
            "Makes small, quick changes on a tight budget",
            ToolAccessLevel::All,
        )
        .with_model("fast")
        .with_budget(budget(8))
        .with_system_prompt("Be quick. Make the smallest change that solves the task."),
        RoleConfig::new(
            AgentRole::General,
            "General-purpose coding agent",
            ToolAccessLevel::All,
        )
        .with_model("balanced")
        .with_budget(budget(40)),
    ]
}

pub fn default_rules() -> Vec<EnforcementRule> {
    vec![
        EnforcementRule::new(
            "security-after-auth",
            EnforcementTrigger::Category(TriggerCategory::Auth),
            AgentRole::Security,
            EnforcementTiming::After,
            "Security review of authentication-related changes",
        ),
        EnforcementRule::new(
            "security-after-dependency-change",
            EnforcementTrigger::Category(TriggerCategory::DependencyChange),
            AgentRole::Security,
            EnforcementTiming::After,
            "Security review of dependency changes",
        ),
        EnforcementRule::new(
            "tester-after-code-change",
            EnforcementTrigger::Category(TriggerCategory::CodeChange),
            AgentRole::Tester,
            EnforcementTiming::After,
            "Run and extend tests covering the changes",
        ),
        EnforcementRule::new(
            "reviewer-after-refactor",
            EnforcementTrigger::Category(TriggerCategory::Refactor),
            AgentRole::Reviewer,
            EnforcementTiming::After,
            "Review the refactoring",
        ),
    ]
}

pub fn default_loop_patterns() -> Vec<LoopPattern> {
    vec![
        LoopPattern::new(
            "refactor-test-review",
            vec![AgentRole::Refactoring, AgentRole::Tester, AgentRole::Reviewer],
            3,
        )
        .with_break_condition(StateCondition::NoReviewComments),
    ]
}

//! Enforcement: mandatory follow-up tasks and loop bounding.
//!
//! A rule fires when its trigger matches the plan (a keyword category over
//! task descriptions and roles, or `Always`) and its optional condition
//! holds over the workflow's shared state. Firing rules inject a task for
//! their role before or after the existing tasks, unless the plan already
//! has a task with that role.

use super::entities::AgentRole;
use super::registry::RoleRegistry;
use crate::workflow::context::{SharedState, WorkflowContext};
use crate::workflow::entities::{WorkflowPlan, WorkflowTask};
use serde::{Deserialize, Serialize};

/// Named event categories a plan can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCategory {
    CodeChange,
    FileWrite,
    DependencyChange,
    Auth,
    TestChange,
    Refactor,
    Documentation,
    Database,
}

impl TriggerCategory {
    pub fn as_str(&self) -> &str {
        match self {
            TriggerCategory::CodeChange => "code_change",
            TriggerCategory::FileWrite => "file_write",
            TriggerCategory::DependencyChange => "dependency_change",
            TriggerCategory::Auth => "auth",
            TriggerCategory::TestChange => "test_change",
            TriggerCategory::Refactor => "refactor",
            TriggerCategory::Documentation => "documentation",
            TriggerCategory::Database => "database",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            TriggerCategory::CodeChange => &[
                "implement", "add ", "fix", "change", "modify", "update", "feature", "bug",
                "refactor", "rewrite",
            ],
            TriggerCategory::FileWrite => &["write", "create", "edit", "generate", "save"],
            TriggerCategory::DependencyChange => &[
                "dependency", "dependencies", "upgrade", "cargo.toml", "package.json",
                "requirements.txt", "bump",
            ],
            TriggerCategory::Auth => &[
                "auth", "login", "logout", "password", "credential", "token", "session",
                "oauth", "jwt", "permission",
            ],
            TriggerCategory::TestChange => &["test", "coverage", "fixture"],
            TriggerCategory::Refactor => &[
                "refactor", "restructure", "rename", "extract", "clean up", "cleanup",
            ],
            TriggerCategory::Documentation => &["document", "readme", "docs", "docstring"],
            TriggerCategory::Database => &["database", "migration", "schema", "sql", "query"],
        }
    }

    fn implied_by_role(&self, role: &AgentRole) -> bool {
        match self {
            TriggerCategory::CodeChange => matches!(role, AgentRole::Refactoring | AgentRole::Rush),
            TriggerCategory::FileWrite | TriggerCategory::Refactor => {
                matches!(role, AgentRole::Refactoring)
            }
            TriggerCategory::TestChange => matches!(role, AgentRole::Tester),
            TriggerCategory::Documentation => matches!(role, AgentRole::Librarian),
            _ => false,
        }
    }

    /// Whether a single task falls into this category.
    pub fn matches_task(&self, task: &WorkflowTask) -> bool {
        if self.implied_by_role(&task.role) {
            return true;
        }
        let lower = task.description.to_lowercase();
        self.keywords().iter().any(|k| lower.contains(k))
    }
}

impl std::fmt::Display for TriggerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementTrigger {
    Always,
    Category(TriggerCategory),
}

impl EnforcementTrigger {
    pub fn matches(&self, plan: &WorkflowPlan) -> bool {
        match self {
            EnforcementTrigger::Always => true,
            EnforcementTrigger::Category(category) => {
                plan.tasks.iter().any(|t| category.matches_task(t))
            }
        }
    }
}

/// Where an injected task goes relative to the existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementTiming {
    Before,
    After,
}

/// Predicate over [`SharedState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateCondition {
    FilesModified,
    SecurityIssuesFound,
    NoSecurityIssues,
    TestsRun,
    TestsNotRun,
    ReviewCommentsPresent,
    NoReviewComments,
}

impl StateCondition {
    pub fn holds(&self, state: &SharedState) -> bool {
        match self {
            StateCondition::FilesModified => !state.files_modified.is_empty(),
            StateCondition::SecurityIssuesFound => !state.security_issues.is_empty(),
            StateCondition::NoSecurityIssues => state.security_issues.is_empty(),
            StateCondition::TestsRun => !state.tests_run.is_empty(),
            StateCondition::TestsNotRun => state.tests_run.is_empty(),
            StateCondition::ReviewCommentsPresent => !state.review_comments.is_empty(),
            StateCondition::NoReviewComments => state.review_comments.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcementRule {
    pub name: String,
    pub trigger: EnforcementTrigger,
    pub role: AgentRole,
    pub timing: EnforcementTiming,
    #[serde(default)]
    pub condition: Option<StateCondition>,
    pub description: String,
}

impl EnforcementRule {
    pub fn new(
        name: impl Into<String>,
        trigger: EnforcementTrigger,
        role: AgentRole,
        timing: EnforcementTiming,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            trigger,
            role,
            timing,
            condition: None,
            description: description.into(),
        }
    }

    pub fn with_condition(mut self, condition: StateCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn applies(&self, plan: &WorkflowPlan, context: &WorkflowContext) -> bool {
        self.trigger.matches(plan)
            && self
                .condition
                .is_none_or(|c| c.holds(&context.shared_state))
    }
}

/// Cyclic collaboration pattern, e.g. refactor → test → review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopPattern {
    pub name: String,
    pub roles: Vec<AgentRole>,
    pub max_iterations: u32,
    #[serde(default)]
    pub break_condition: Option<StateCondition>,
}

impl LoopPattern {
    pub fn new(name: impl Into<String>, roles: Vec<AgentRole>, max_iterations: u32) -> Self {
        Self {
            name: name.into(),
            roles,
            max_iterations,
            break_condition: None,
        }
    }

    pub fn with_break_condition(mut self, condition: StateCondition) -> Self {
        self.break_condition = Some(condition);
        self
    }

    /// How many consecutive times the pattern repeats at the tail of
    /// `call_stack`.
    pub fn repetitions(&self, call_stack: &[AgentRole]) -> u32 {
        let len = self.roles.len();
        if len == 0 {
            return 0;
        }
        let mut count = 0;
        let mut end = call_stack.len();
        while end >= len && call_stack[end - len..end] == self.roles[..] {
            count += 1;
            end -= len;
        }
        count
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopMatch {
    pub pattern: String,
    pub repetitions: u32,
    pub max_iterations: u32,
}

/// A task an enforcement rule wants added.
#[derive(Debug, Clone, PartialEq)]
pub struct EnforcementAddition {
    pub rule: String,
    pub role: AgentRole,
    pub timing: EnforcementTiming,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnforcementCheck {
    /// At least one rule matched the plan
    pub triggered: bool,
    pub triggered_rules: Vec<String>,
    /// Additions left after dropping roles the plan already has
    pub agents_to_add: Vec<EnforcementAddition>,
}

/// Applies enforcement rules and loop patterns to plans.
#[derive(Debug, Clone)]
pub struct EnforcementEngine {
    rules: Vec<EnforcementRule>,
    loop_patterns: Vec<LoopPattern>,
    skip: bool,
}

impl EnforcementEngine {
    /// Engine using the registry's rules and loop patterns.
    pub fn new(registry: &RoleRegistry) -> Self {
        Self {
            rules: registry.rules().to_vec(),
            loop_patterns: registry.loop_patterns().to_vec(),
            skip: false,
        }
    }

    /// Additional ad hoc rules, evaluated after the registry's.
    pub fn with_rules(mut self, extra: Vec<EnforcementRule>) -> Self {
        self.rules.extend(extra);
        self
    }

    /// Disable all injection (dry runs).
    pub fn skip_enforcement(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    pub fn rules(&self) -> &[EnforcementRule] {
        &self.rules
    }

    pub fn check_enforcement(&self, plan: &WorkflowPlan, context: &WorkflowContext) -> EnforcementCheck {
        if self.skip {
            return EnforcementCheck::default();
        }

        let mut check = EnforcementCheck::default();
        for rule in &self.rules {
            if !rule.applies(plan, context) {
                continue;
            }
            check.triggered = true;
            check.triggered_rules.push(rule.name.clone());

            let already_planned = plan.has_role(&rule.role)
                || check.agents_to_add.iter().any(|a| a.role == rule.role);
            if already_planned {
                continue;
            }
            check.agents_to_add.push(EnforcementAddition {
                rule: rule.name.clone(),
                role: rule.role.clone(),
                timing: rule.timing,
                description: format!("{}: {}", rule.description, plan.original_task),
            });
        }
        check
    }

    /// New plan with the triggered tasks injected.
    pub fn enforce(&self, plan: &WorkflowPlan, context: &WorkflowContext) -> WorkflowPlan {
        let check = self.check_enforcement(plan, context);
        if check.agents_to_add.is_empty() {
            return plan.clone();
        }

        let original_ids: Vec<String> = plan.tasks.iter().map(|t| t.id.clone()).collect();
        let mut taken: Vec<String> = original_ids.clone();
        let mut before = Vec::new();
        let mut after = Vec::new();

        for addition in check.agents_to_add {
            let id = unique_id(&format!("enforce-{}", addition.role), &taken);
            taken.push(id.clone());
            let task = WorkflowTask::new(id, addition.description, addition.role).with_complexity(0.3);
            match addition.timing {
                EnforcementTiming::Before => before.push(task),
                EnforcementTiming::After => {
                    let task = original_ids
                        .iter()
                        .fold(task, |t, dep| t.depends_on(dep.clone()));
                    after.push(task);
                }
            }
        }

        let mut tasks: Vec<WorkflowTask> = Vec::with_capacity(plan.tasks.len() + before.len() + after.len());
        tasks.extend(before.iter().cloned());
        for task in &plan.tasks {
            let task = if task.is_root() {
                before.iter().fold(task.clone(), |t, b| t.depends_on(b.id.clone()))
            } else {
                task.clone()
            };
            tasks.push(task);
        }
        tasks.extend(after);

        let mut enforced = plan.clone();
        enforced.tasks = tasks;
        enforced.recompute_complexity();
        enforced
    }

    /// Tasks owed by conditional rules whose condition now holds over the
    /// live `context`. Each depends on every task already in `plan`. Only
    /// `After` rules qualify mid-run; a `Before` task can no longer precede
    /// work that has started.
    pub fn follow_ups(&self, plan: &WorkflowPlan, context: &WorkflowContext) -> Vec<WorkflowTask> {
        if self.skip {
            return Vec::new();
        }

        let mut taken: Vec<String> = plan.tasks.iter().map(|t| t.id.clone()).collect();
        let mut added: Vec<WorkflowTask> = Vec::new();
        for rule in &self.rules {
            if rule.condition.is_none()
                || rule.timing != EnforcementTiming::After
                || !rule.applies(plan, context)
                || plan.has_role(&rule.role)
                || added.iter().any(|t| t.role == rule.role)
            {
                continue;
            }
            let id = unique_id(&format!("enforce-{}", rule.role), &taken);
            taken.push(id.clone());
            let task = WorkflowTask::new(
                id,
                format!("{}: {}", rule.description, plan.original_task),
                rule.role.clone(),
            )
            .with_complexity(0.3);
            let task = plan
                .tasks
                .iter()
                .fold(task, |t, dep| t.depends_on(dep.id.clone()));
            added.push(task);
        }
        added
    }

    /// The registered pattern repeating at the tail of `call_stack`, with the
    /// most repetitions.
    pub fn detect_loop(&self, call_stack: &[AgentRole]) -> Option<LoopMatch> {
        self.loop_patterns
            .iter()
            .map(|p| (p, p.repetitions(call_stack)))
            .filter(|(_, reps)| *reps > 0)
            .max_by_key(|(_, reps)| *reps)
            .map(|(p, reps)| LoopMatch {
                pattern: p.name.clone(),
                repetitions: reps,
                max_iterations: p.max_iterations,
            })
    }

    /// Whether the detected loop should stop: its cap is reached or its
    /// break condition holds.
    pub fn should_break_loop(&self, call_stack: &[AgentRole], state: &SharedState) -> bool {
        self.loop_patterns.iter().any(|p| {
            let reps = p.repetitions(call_stack);
            reps > 0
                && (reps >= p.max_iterations || p.break_condition.is_some_and(|c| c.holds(state)))
        })
    }

    pub fn loop_pattern(&self, name: &str) -> Option<&LoopPattern> {
        self.loop_patterns.iter().find(|p| p.name == name)
    }
}

fn unique_id(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|t| t == base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

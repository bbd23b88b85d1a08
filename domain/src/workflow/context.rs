//! Shared state for one workflow run.

use crate::agent::entities::{AgentResult, AgentStatus};
use crate::core::string::truncate;
use crate::role::AgentRole;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const TEST_COMMAND_MARKERS: &[&str] = &[
    "cargo test",
    "cargo nextest",
    "npm test",
    "npm run test",
    "pnpm test",
    "yarn test",
    "pytest",
    "go test",
    "jest",
    "vitest",
    "make test",
];

const NO_FINDINGS_MARKERS: &[&str] = &[
    "no issues",
    "no security issues",
    "no vulnerabilities",
    "no problems found",
    "lgtm",
    "looks good",
    "no comments",
];

/// Facts accumulated across agents, visible to enforcement conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedState {
    pub files_modified: Vec<String>,
    pub tests_run: Vec<String>,
    pub security_issues: Vec<String>,
    pub review_comments: Vec<String>,
}

impl SharedState {
    pub fn record_file(&mut self, path: impl Into<String>) {
        push_unique(&mut self.files_modified, path.into());
    }

    pub fn record_test(&mut self, command: impl Into<String>) {
        push_unique(&mut self.tests_run, command.into());
    }

    pub fn record_security_issue(&mut self, issue: impl Into<String>) {
        self.security_issues.push(issue.into());
    }

    pub fn record_review_comment(&mut self, comment: impl Into<String>) {
        self.review_comments.push(comment.into());
    }
}

/// Workflow-wide context: shared state, per-task results and the order in
/// which roles completed (used for loop detection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowContext {
    pub shared_state: SharedState,
    pub agent_results: HashMap<String, AgentResult>,
    pub call_stack: Vec<AgentRole>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished task into the context.
    ///
    /// Successful `write_file`/`delete_file` calls mark files modified,
    /// `run_command` calls that look like test runs mark tests run, and the
    /// final responses of security and reviewer agents are recorded as
    /// findings unless they report none.
    pub fn record_result(&mut self, task_id: impl Into<String>, result: AgentResult) {
        for (call, outcome) in result.tool_exchanges() {
            let succeeded = outcome.is_some_and(|r| r.is_success());
            match call.tool_name.as_str() {
                "write_file" | "delete_file" if succeeded => {
                    if let Some(path) = call.get_string("path") {
                        self.shared_state.record_file(path);
                    }
                }
                "run_command" => {
                    if let Some(cmd) = call.get_string("command")
                        && is_test_command(cmd)
                    {
                        self.shared_state.record_test(cmd);
                    }
                }
                _ => {}
            }
        }

        if result.status == AgentStatus::Completed && !reports_no_findings(&result.response) {
            match result.role {
                AgentRole::Security => self
                    .shared_state
                    .record_security_issue(truncate(&result.response, 500)),
                AgentRole::Reviewer => self
                    .shared_state
                    .record_review_comment(truncate(&result.response, 500)),
                _ => {}
            }
        }

        if result.status != AgentStatus::Failed || !result.steps.is_empty() {
            self.call_stack.push(result.role.clone());
        }
        self.agent_results.insert(task_id.into(), result);
    }

    pub fn result(&self, task_id: &str) -> Option<&AgentResult> {
        self.agent_results.get(task_id)
    }

    /// Context handed to a task: the outcome of each of its dependencies.
    pub fn summary_for(&self, task_ids: &[String]) -> String {
        let mut sections = Vec::new();
        for id in task_ids {
            let Some(result) = self.agent_results.get(id) else {
                continue;
            };
            let body = if result.success {
                truncate(&result.response, 2_000)
            } else {
                format!(
                    "FAILED: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                )
            };
            sections.push(format!("### {} ({})\n{}", id, result.role, body));
        }
        if !self.shared_state.files_modified.is_empty() {
            sections.push(format!(
                "### Files modified so far\n{}",
                self.shared_state.files_modified.join("\n")
            ));
        }
        sections.join("\n\n")
    }
}

fn is_test_command(command: &str) -> bool {
    let lower = command.to_lowercase();
    TEST_COMMAND_MARKERS.iter().any(|m| lower.contains(m))
}

fn reports_no_findings(response: &str) -> bool {
    let lower = response.to_lowercase();
    lower.trim().is_empty() || NO_FINDINGS_MARKERS.iter().any(|m| lower.contains(m))
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

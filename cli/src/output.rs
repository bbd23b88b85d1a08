//! Human-readable result formatting

use conductor_application::WorkflowResult;
use conductor_domain::{AgentResult, WorkflowPlan};
use std::fmt::Write;

pub fn format_agent_result(result: &AgentResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Agent {} ({}) {} after {} step(s)",
        result.agent_id,
        result.role,
        result.status,
        result.steps.len()
    );
    let _ = writeln!(
        out,
        "Tokens: {} in / {} out, cost {:.4}, {} ms",
        result.total_tokens.input_tokens,
        result.total_tokens.output_tokens,
        result.cost,
        result.duration_ms
    );
    if let Some(error) = &result.error {
        let _ = writeln!(out, "Error: {}", error);
    }
    if !result.response.is_empty() {
        let _ = writeln!(out, "\n{}", result.response);
    }
    out
}

pub fn format_plan(plan: &WorkflowPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Plan {} ({}): {}", plan.id, plan.execution_mode, plan.description);
    for task in &plan.tasks {
        let deps = if task.depends_on.is_empty() {
            String::new()
        } else {
            format!(" <- {}", task.depends_on.join(", "))
        };
        let _ = writeln!(out, "  [{}] {} ({}){}", task.id, task.description, task.role, deps);
    }
    out
}

pub fn format_workflow_result(result: &WorkflowResult) -> String {
    let mut out = format_plan(&result.plan);
    out.push('\n');
    for task in &result.plan.tasks {
        match result.result(&task.id) {
            Some(r) => {
                let _ = writeln!(out, "{:<12} {}", task.id, r.status);
                if let Some(error) = &r.error {
                    let _ = writeln!(out, "{:<12} {}", "", error);
                }
            }
            None => {
                let _ = writeln!(out, "{:<12} not run", task.id);
            }
        }
    }
    let outcome = if result.interrupted {
        "interrupted"
    } else if result.success {
        "succeeded"
    } else {
        "failed"
    };
    let _ = writeln!(
        out,
        "\nWorkflow {}: {} in / {} out tokens, cost {:.4}, {} ms",
        outcome,
        result.total_tokens.input_tokens,
        result.total_tokens.output_tokens,
        result.total_cost,
        result.duration_ms
    );
    out
}

//! Workflow plan parsing from provider responses.
//!
//! Accepts a fenced ` ```json ` / ` ```plan ` block, a bare JSON document, or
//! the outermost `{ ... }` object embedded in prose. Field names are read
//! leniently (`depends_on`/`dependsOn`, `role`/`suggested_role`, numeric ids).

use super::entities::{
    ExecutionMode, WorkflowPlan, WorkflowTask, clamp_complexity,
};
use crate::role::AgentRole;
use crate::util::generate_id;
use serde_json::Value;

/// Pull a JSON document out of free-form response text.
pub fn extract_json_block(response: &str) -> Option<Value> {
    let mut in_block = false;
    let mut current = String::new();

    for line in response.lines() {
        let trimmed = line.trim();
        if !in_block && (trimmed == "```json" || trimmed == "```plan") {
            in_block = true;
            current.clear();
        } else if in_block && trimmed == "```" {
            in_block = false;
            if let Ok(parsed) = serde_json::from_str::<Value>(&current) {
                return Some(parsed);
            }
        } else if in_block {
            current.push_str(line);
            current.push('\n');
        }
    }

    if let Ok(parsed) = serde_json::from_str::<Value>(response.trim()) {
        return Some(parsed);
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

/// Parse a plan out of a provider response. `None` when nothing usable is
/// found; structural validation is left to [`WorkflowPlan::validate`].
pub fn parse_workflow_plan(response: &str, original_task: &str) -> Option<WorkflowPlan> {
    let json = extract_json_block(response)?;
    parse_workflow_plan_json(&json, original_task)
}

/// Build a plan from an already-parsed JSON value.
///
/// Expected schema:
/// ```json
/// {
///   "description": "string",
///   "execution_mode": "sequential | dag",
///   "tasks": [
///     {"id": "task-1", "description": "...", "role": "finder",
///      "complexity": 0.3, "depends_on": [], "parallelizable": true}
///   ]
/// }
/// ```
pub fn parse_workflow_plan_json(json: &Value, original_task: &str) -> Option<WorkflowPlan> {
    let tasks_json = json.get("tasks").and_then(Value::as_array)?;
    if tasks_json.is_empty() {
        return None;
    }

    let mut tasks = Vec::with_capacity(tasks_json.len());
    for (index, task_json) in tasks_json.iter().enumerate() {
        let id = task_json
            .get("id")
            .and_then(json_value_to_string)
            .unwrap_or_else(|| format!("task-{}", index + 1));
        let description = task_json.get("description").and_then(Value::as_str)?;

        let role = first_str(task_json, &["role", "suggested_role", "suggestedRole"])
            .and_then(AgentRole::builtin)
            .unwrap_or(AgentRole::General);

        let mut task = WorkflowTask::new(id, description, role);
        if let Some(c) = task_json.get("complexity").and_then(Value::as_f64) {
            task.complexity = clamp_complexity(c);
        }
        if let Some(p) = task_json.get("parallelizable").and_then(Value::as_bool) {
            task.parallelizable = p;
        }
        let deps = task_json
            .get("depends_on")
            .or_else(|| task_json.get("dependsOn"))
            .and_then(Value::as_array);
        for dep in deps.into_iter().flatten() {
            if let Some(dep) = json_value_to_string(dep) {
                task = task.depends_on(dep);
            }
        }
        tasks.push(task);
    }

    let execution_mode = first_str(json, &["execution_mode", "executionMode", "mode"])
        .and_then(|m| m.parse::<ExecutionMode>().ok())
        .unwrap_or_else(|| {
            if tasks.iter().any(|t| !t.depends_on.is_empty()) || tasks.len() > 1 {
                ExecutionMode::Dag
            } else {
                ExecutionMode::Sequential
            }
        });

    let description = json
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or(original_task);

    let mut plan = WorkflowPlan::new(
        format!("plan-{}", generate_id()),
        original_task,
        description,
        tasks,
        execution_mode,
    );
    if let Some(c) = json.get("complexity").and_then(Value::as_f64) {
        plan.complexity = clamp_complexity(c);
    }
    Some(plan)
}

/// Deterministic single-task plan covering the whole input.
pub fn fallback_plan(task: &str) -> WorkflowPlan {
    let role = AgentRole::infer_from_text(task);
    WorkflowPlan::new(
        format!("plan-{}", generate_id()),
        task,
        task,
        vec![WorkflowTask::new("task-1", task, role).with_parallelizable(false)],
        ExecutionMode::Sequential,
    )
}

fn first_str<'a>(json: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| json.get(*k).and_then(Value::as_str))
}

fn json_value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json_block() {
        let response = r#"Here is the plan:

```json
{
  "description": "Find then analyse",
  "execution_mode": "dag",
  "tasks": [
    {"id": "task-1", "description": "Find usages", "role": "finder", "complexity": 0.2},
    {"id": "task-2", "description": "Analyse", "role": "thinker", "depends_on": ["task-1"]}
  ]
}
```
"#;
        let plan = parse_workflow_plan(response, "original").unwrap();
        assert_eq!(plan.description, "Find then analyse");
        assert_eq!(plan.original_task, "original");
        assert_eq!(plan.execution_mode, ExecutionMode::Dag);
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[0].role, AgentRole::Finder);
        assert_eq!(plan.tasks[1].depends_on, vec!["task-1"]);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn parses_plan_block_with_camel_case_and_numeric_ids() {
        let response = "```plan\n{\"tasks\": [{\"id\": 1, \"description\": \"a\", \"suggestedRole\": \"tester\"}, {\"id\": 2, \"description\": \"b\", \"dependsOn\": [1]}], \"executionMode\": \"sequential\"}\n```";
        let plan = parse_workflow_plan(response, "t").unwrap();
        assert_eq!(plan.tasks[0].id, "1");
        assert_eq!(plan.tasks[0].role, AgentRole::Tester);
        assert_eq!(plan.tasks[1].depends_on, vec!["1"]);
        assert_eq!(plan.execution_mode, ExecutionMode::Sequential);
    }

    #[test]
    fn parses_object_embedded_in_prose() {
        let response = "Sure! {\"tasks\": [{\"description\": \"only\"}]} Hope that helps.";
        let plan = parse_workflow_plan(response, "t").unwrap();
        assert_eq!(plan.tasks[0].id, "task-1");
        assert_eq!(plan.tasks[0].role, AgentRole::General);
    }

    #[test]
    fn unknown_roles_map_to_general_and_complexity_clamps() {
        let json = serde_json::json!({
            "tasks": [{"id": "x", "description": "d", "role": "wizard", "complexity": 9.0}]
        });
        let plan = parse_workflow_plan_json(&json, "t").unwrap();
        assert_eq!(plan.tasks[0].role, AgentRole::General);
        assert_eq!(plan.tasks[0].complexity, 1.0);
    }

    #[test]
    fn unusable_responses_yield_none() {
        assert!(parse_workflow_plan("I cannot help with that.", "t").is_none());
        assert!(parse_workflow_plan("{\"tasks\": []}", "t").is_none());
        assert!(parse_workflow_plan("{\"tasks\": [{\"id\": \"a\"}]}", "t").is_none());
    }

    #[test]
    fn fallback_is_single_sequential_task() {
        let plan = fallback_plan("Write tests for the tokenizer");
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].id, "task-1");
        assert_eq!(plan.tasks[0].description, "Write tests for the tokenizer");
        assert_eq!(plan.tasks[0].role, AgentRole::Tester);
        assert_eq!(plan.execution_mode, ExecutionMode::Sequential);
        assert!(plan.validate().is_ok());
    }
}

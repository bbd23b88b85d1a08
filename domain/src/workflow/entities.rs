//! Workflow plan entities: a DAG of role-tagged tasks.

use crate::role::AgentRole;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// How the orchestrator schedules a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One task at a time in declaration order; the first failure halts the rest
    #[default]
    Sequential,
    /// Ready tasks run concurrently, bounded by their dependencies
    #[serde(alias = "parallel")]
    Dag,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Dag => "dag",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "serial" => Ok(ExecutionMode::Sequential),
            "dag" | "parallel" | "graph" => Ok(ExecutionMode::Dag),
            other => Err(format!("unknown execution mode: {}", other)),
        }
    }
}

/// One unit of work in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTask {
    pub id: String,
    pub description: String,
    pub role: AgentRole,
    /// Estimated difficulty in `0.0..=1.0`
    pub complexity: f64,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default = "default_parallelizable")]
    pub parallelizable: bool,
}

fn default_parallelizable() -> bool {
    true
}

impl WorkflowTask {
    pub fn new(id: impl Into<String>, description: impl Into<String>, role: AgentRole) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            role,
            complexity: 0.5,
            depends_on: Vec::new(),
            parallelizable: true,
        }
    }

    /// Sets complexity, clamped into `0.0..=1.0` (NaN becomes 0.5).
    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = clamp_complexity(complexity);
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.depends_on.contains(&id) {
            self.depends_on.push(id);
        }
        self
    }

    pub fn with_parallelizable(mut self, parallelizable: bool) -> Self {
        self.parallelizable = parallelizable;
        self
    }

    pub fn is_root(&self) -> bool {
        self.depends_on.is_empty()
    }
}

pub fn clamp_complexity(value: f64) -> f64 {
    if value.is_nan() { 0.5 } else { value.clamp(0.0, 1.0) }
}

/// Structural problems in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("plan has no tasks")]
    Empty,

    #[error("duplicate task id '{0}'")]
    DuplicateTaskId(String),

    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("task '{0}' depends on itself")]
    SelfDependency(String),

    #[error("cyclic dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),
}

/// A decomposed task graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPlan {
    pub id: String,
    pub original_task: String,
    pub description: String,
    pub tasks: Vec<WorkflowTask>,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    pub complexity: f64,
}

impl WorkflowPlan {
    pub fn new(
        id: impl Into<String>,
        original_task: impl Into<String>,
        description: impl Into<String>,
        tasks: Vec<WorkflowTask>,
        execution_mode: ExecutionMode,
    ) -> Self {
        let complexity = mean_complexity(&tasks);
        Self {
            id: id.into(),
            original_task: original_task.into(),
            description: description.into(),
            tasks,
            execution_mode,
            complexity,
        }
    }

    pub fn task(&self, id: &str) -> Option<&WorkflowTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn has_role(&self, role: &AgentRole) -> bool {
        self.tasks.iter().any(|t| &t.role == role)
    }

    pub fn task_ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.id.as_str()).collect()
    }

    /// Check ids, dependency references and acyclicity.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.tasks.is_empty() {
            return Err(PlanError::Empty);
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.id.as_str()) {
                return Err(PlanError::DuplicateTaskId(task.id.clone()));
            }
        }

        for task in &self.tasks {
            for dep in &task.depends_on {
                if dep == &task.id {
                    return Err(PlanError::SelfDependency(task.id.clone()));
                }
                if !seen.contains(dep.as_str()) {
                    return Err(PlanError::UnknownDependency {
                        task: task.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        if let Some(cycle) = self.find_cycle() {
            return Err(PlanError::CyclicDependency(cycle));
        }

        Ok(())
    }

    /// Task ids in an order where every task follows its dependencies.
    /// Ties keep declaration order.
    pub fn topological_order(&self) -> Result<Vec<String>, PlanError> {
        self.validate()?;

        let mut remaining: HashMap<&str, usize> = self
            .tasks
            .iter()
            .map(|t| {
                let distinct: HashSet<&str> = t.depends_on.iter().map(String::as_str).collect();
                (t.id.as_str(), distinct.len())
            })
            .collect();
        let mut order = Vec::with_capacity(self.tasks.len());
        let mut placed = HashSet::new();

        while order.len() < self.tasks.len() {
            let next = self
                .tasks
                .iter()
                .find(|t| !placed.contains(t.id.as_str()) && remaining[t.id.as_str()] == 0);
            let Some(task) = next else {
                // unreachable after validate(); report the leftover ids
                let rest = self
                    .tasks
                    .iter()
                    .filter(|t| !placed.contains(t.id.as_str()))
                    .map(|t| t.id.clone())
                    .collect();
                return Err(PlanError::CyclicDependency(rest));
            };
            placed.insert(task.id.as_str());
            order.push(task.id.clone());
            for other in &self.tasks {
                if other.depends_on.iter().any(|d| d == &task.id)
                    && let Some(count) = remaining.get_mut(other.id.as_str())
                {
                    *count -= 1;
                }
            }
        }

        Ok(order)
    }

    /// Ids of tasks that (transitively) depend on `id`.
    pub fn dependents_of(&self, id: &str) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        let mut frontier = vec![id.to_string()];
        while let Some(current) = frontier.pop() {
            for task in &self.tasks {
                if task.depends_on.contains(&current) && !result.contains(&task.id) {
                    result.push(task.id.clone());
                    frontier.push(task.id.clone());
                }
            }
        }
        result
    }

    pub fn recompute_complexity(&mut self) {
        self.complexity = mean_complexity(&self.tasks);
    }

    fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let index: HashMap<&str, usize> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();
        let mut marks = vec![Mark::Unvisited; self.tasks.len()];
        let mut path: Vec<usize> = Vec::new();

        fn visit(
            node: usize,
            plan: &WorkflowPlan,
            index: &HashMap<&str, usize>,
            marks: &mut [Mark],
            path: &mut Vec<usize>,
        ) -> Option<Vec<String>> {
            marks[node] = Mark::InProgress;
            path.push(node);
            for dep in &plan.tasks[node].depends_on {
                let Some(&next) = index.get(dep.as_str()) else {
                    continue;
                };
                match marks[next] {
                    Mark::InProgress => {
                        let start = path.iter().position(|&n| n == next).unwrap_or(0);
                        let mut cycle: Vec<String> = path[start..]
                            .iter()
                            .map(|&n| plan.tasks[n].id.clone())
                            .collect();
                        cycle.push(plan.tasks[next].id.clone());
                        return Some(cycle);
                    }
                    Mark::Unvisited => {
                        if let Some(cycle) = visit(next, plan, index, marks, path) {
                            return Some(cycle);
                        }
                    }
                    Mark::Done => {}
                }
            }
            path.pop();
            marks[node] = Mark::Done;
            None
        }

        for start in 0..self.tasks.len() {
            if marks[start] == Mark::Unvisited
                && let Some(cycle) = visit(start, self, &index, &mut marks, &mut path)
            {
                return Some(cycle);
            }
        }
        None
    }
}

fn mean_complexity(tasks: &[WorkflowTask]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    tasks.iter().map(|t| t.complexity).sum::<f64>() / tasks.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(tasks: Vec<WorkflowTask>) -> WorkflowPlan {
        WorkflowPlan::new("plan-1", "do things", "test plan", tasks, ExecutionMode::Dag)
    }

    #[test]
    fn valid_dag_passes() {
        let p = plan(vec![
            WorkflowTask::new("task-1", "find", AgentRole::Finder),
            WorkflowTask::new("task-2", "think", AgentRole::Thinker).depends_on("task-1"),
        ]);
        assert!(p.validate().is_ok());
        assert_eq!(p.topological_order().unwrap(), vec!["task-1", "task-2"]);
    }

    #[test]
    fn cycle_is_rejected_with_path() {
        let p = plan(vec![
            WorkflowTask::new("a", "a", AgentRole::General).depends_on("c"),
            WorkflowTask::new("b", "b", AgentRole::General).depends_on("a"),
            WorkflowTask::new("c", "c", AgentRole::General).depends_on("b"),
        ]);
        match p.validate() {
            Err(PlanError::CyclicDependency(ids)) => {
                assert_eq!(ids.first(), ids.last());
                assert!(ids.contains(&"a".to_string()));
                assert!(ids.contains(&"b".to_string()));
                assert!(ids.contains(&"c".to_string()));
            }
            other => panic!("expected cycle, got {:?}", other),
        }
        assert!(p.topological_order().is_err());
    }

    #[test]
    fn structural_errors() {
        assert_eq!(plan(vec![]).validate(), Err(PlanError::Empty));

        let dup = plan(vec![
            WorkflowTask::new("x", "1", AgentRole::General),
            WorkflowTask::new("x", "2", AgentRole::General),
        ]);
        assert_eq!(dup.validate(), Err(PlanError::DuplicateTaskId("x".into())));

        let dangling = plan(vec![WorkflowTask::new("x", "1", AgentRole::General).depends_on("ghost")]);
        assert!(matches!(
            dangling.validate(),
            Err(PlanError::UnknownDependency { .. })
        ));

        let selfish = plan(vec![WorkflowTask::new("x", "1", AgentRole::General).depends_on("x")]);
        assert_eq!(selfish.validate(), Err(PlanError::SelfDependency("x".into())));
    }

    #[test]
    fn topological_order_respects_declaration_ties() {
        let p = plan(vec![
            WorkflowTask::new("late", "l", AgentRole::General).depends_on("root"),
            WorkflowTask::new("root", "r", AgentRole::General),
            WorkflowTask::new("other", "o", AgentRole::General),
        ]);
        assert_eq!(p.topological_order().unwrap(), vec!["root", "late", "other"]);
    }

    #[test]
    fn repeated_dependency_is_not_a_cycle() {
        // deserialized plans can repeat an id; the builder cannot
        let mut b = WorkflowTask::new("b", "b", AgentRole::General);
        b.depends_on = vec!["a".to_string(), "a".to_string()];
        let p = plan(vec![WorkflowTask::new("a", "a", AgentRole::General), b]);
        assert!(p.validate().is_ok());
        assert_eq!(p.topological_order().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn dependents_are_transitive() {
        let p = plan(vec![
            WorkflowTask::new("a", "a", AgentRole::General),
            WorkflowTask::new("b", "b", AgentRole::General).depends_on("a"),
            WorkflowTask::new("c", "c", AgentRole::General).depends_on("b"),
            WorkflowTask::new("d", "d", AgentRole::General),
        ]);
        let mut deps = p.dependents_of("a");
        deps.sort();
        assert_eq!(deps, vec!["b", "c"]);
    }

    #[test]
    fn complexity_is_clamped() {
        let t = WorkflowTask::new("a", "a", AgentRole::General).with_complexity(3.5);
        assert_eq!(t.complexity, 1.0);
        let t = WorkflowTask::new("a", "a", AgentRole::General).with_complexity(-1.0);
        assert_eq!(t.complexity, 0.0);
        let t = WorkflowTask::new("a", "a", AgentRole::General).with_complexity(f64::NAN);
        assert_eq!(t.complexity, 0.5);
    }
}

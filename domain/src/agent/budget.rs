//! Resource caps for a single agent run.
//!
//! A budget is checked only at iteration boundaries: the agent compares the
//! accumulated [`BudgetUsage`] against its [`AgentBudget`] before starting
//! the next reasoning step and terminates with the violation's reason.

use serde::{Deserialize, Serialize};

/// Optional caps on one agent run. All unset means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentBudget {
    pub max_iterations: Option<u32>,
    /// Input plus output tokens
    pub max_tokens: Option<u64>,
    /// Currency units as reported by the provider's cost function
    pub max_cost: Option<f64>,
    /// Wall-clock milliseconds, including time spent before a pause
    pub max_duration_ms: Option<u64>,
}

impl AgentBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = Some(n);
        self
    }

    pub fn with_max_tokens(mut self, n: u64) -> Self {
        self.max_tokens = Some(n);
        self
    }

    pub fn with_max_cost(mut self, cost: f64) -> Self {
        self.max_cost = Some(cost);
        self
    }

    pub fn with_max_duration_ms(mut self, ms: u64) -> Self {
        self.max_duration_ms = Some(ms);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_iterations.is_none()
            && self.max_tokens.is_none()
            && self.max_cost.is_none()
            && self.max_duration_ms.is_none()
    }

    /// Fill every unset cap from `defaults` (typically a role's budget).
    pub fn merge_defaults(self, defaults: &AgentBudget) -> Self {
        Self {
            max_iterations: self.max_iterations.or(defaults.max_iterations),
            max_tokens: self.max_tokens.or(defaults.max_tokens),
            max_cost: self.max_cost.or(defaults.max_cost),
            max_duration_ms: self.max_duration_ms.or(defaults.max_duration_ms),
        }
    }

    /// Milliseconds left before the duration cap, if one is set.
    pub fn remaining_duration_ms(&self, elapsed_ms: u64) -> Option<u64> {
        self.max_duration_ms.map(|limit| limit.saturating_sub(elapsed_ms))
    }

    /// [`check`](Self::check) without the iteration cap, for spend incurred
    /// by a step that has not been recorded yet.
    pub fn check_spend(&self, usage: &BudgetUsage) -> Option<BudgetViolation> {
        AgentBudget {
            max_iterations: None,
            ..*self
        }
        .check(usage)
    }

    /// First cap that `usage` has reached, if any.
    ///
    /// Iterations trip once the completed count reaches the cap, so a cap of
    /// `N` allows exactly `N` steps. The other dimensions trip once usage
    /// exceeds the cap.
    pub fn check(&self, usage: &BudgetUsage) -> Option<BudgetViolation> {
        if let Some(limit) = self.max_iterations
            && usage.iterations >= limit
        {
            return Some(BudgetViolation::Iterations { limit });
        }
        if let Some(limit) = self.max_tokens
            && usage.total_tokens() > limit
        {
            return Some(BudgetViolation::Tokens {
                limit,
                used: usage.total_tokens(),
            });
        }
        if let Some(limit) = self.max_cost
            && usage.cost > limit
        {
            return Some(BudgetViolation::Cost {
                limit,
                used: usage.cost,
            });
        }
        if let Some(limit) = self.max_duration_ms
            && usage.elapsed_ms > limit
        {
            return Some(BudgetViolation::Duration {
                limit_ms: limit,
                elapsed_ms: usage.elapsed_ms,
            });
        }
        None
    }
}

/// Cumulative consumption of one agent run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetUsage {
    pub iterations: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
    pub elapsed_ms: u64,
}

impl BudgetUsage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn record_step(&mut self, input_tokens: u64, output_tokens: u64, cost: f64) {
        self.iterations += 1;
        self.add_spend(input_tokens, output_tokens, cost);
    }

    /// Tokens and cost that did not produce a recorded step.
    pub fn add_spend(&mut self, input_tokens: u64, output_tokens: u64, cost: f64) {
        self.input_tokens += input_tokens;
        self.output_tokens += output_tokens;
        self.cost += cost;
    }
}

/// Which cap was hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dimension", rename_all = "snake_case")]
pub enum BudgetViolation {
    Iterations { limit: u32 },
    Tokens { limit: u64, used: u64 },
    Cost { limit: f64, used: f64 },
    Duration { limit_ms: u64, elapsed_ms: u64 },
}

impl BudgetViolation {
    /// Terminal reason reported on the agent result.
    pub fn reason(&self) -> &'static str {
        match self {
            BudgetViolation::Iterations { .. } => "Maximum iterations reached",
            _ => "Budget exceeded",
        }
    }

    pub fn dimension(&self) -> &'static str {
        match self {
            BudgetViolation::Iterations { .. } => "iterations",
            BudgetViolation::Tokens { .. } => "tokens",
            BudgetViolation::Cost { .. } => "cost",
            BudgetViolation::Duration { .. } => "duration",
        }
    }
}

impl std::fmt::Display for BudgetViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetViolation::Iterations { limit } => {
                write!(f, "{} ({})", self.reason(), limit)
            }
            BudgetViolation::Tokens { limit, used } => {
                write!(f, "{}: {} tokens used, limit {}", self.reason(), used, limit)
            }
            BudgetViolation::Cost { limit, used } => {
                write!(f, "{}: cost {:.6} over limit {:.6}", self.reason(), used, limit)
            }
            BudgetViolation::Duration {
                limit_ms,
                elapsed_ms,
            } => write!(
                f,
                "{}: {}ms elapsed, limit {}ms",
                self.reason(),
                elapsed_ms,
                limit_ms
            ),
        }
    }
}

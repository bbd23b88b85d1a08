//! Agent configuration from TOML (`[agent]` section)

use conductor_application::AgentOptions;
use conductor_domain::{AgentBudget, ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

/// Raw agent configuration from TOML
///
/// # Example
///
/// ```toml
/// [agent]
/// max_iterations = 25
/// max_tokens = 200000
/// max_cost = 2.5
/// max_duration_ms = 600000
/// temperature = 0.2
/// ```
///
/// Budget caps left unset here are unbounded unless a role supplies one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    pub max_iterations: Option<u32>,
    pub max_tokens: Option<u64>,
    pub max_cost: Option<f64>,
    pub max_duration_ms: Option<u64>,
    /// Sampling temperature, 0.0..=2.0
    pub temperature: Option<f32>,
    /// Longest tool observation fed back to the model, in bytes
    pub max_observation_bytes: usize,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: Some(25),
            max_tokens: None,
            max_cost: None,
            max_duration_ms: None,
            temperature: None,
            max_observation_bytes: AgentOptions::default().max_observation_bytes,
        }
    }
}

impl FileAgentConfig {
    pub fn to_budget(&self) -> AgentBudget {
        AgentBudget {
            max_iterations: self.max_iterations,
            max_tokens: self.max_tokens,
            max_cost: self.max_cost,
            max_duration_ms: self.max_duration_ms,
        }
    }

    /// Temperature, dropped with an issue when out of range.
    pub fn parse_temperature(&self) -> (Option<f32>, Vec<ConfigIssue>) {
        match self.temperature {
            Some(t) if !(0.0..=2.0).contains(&t) => (
                None,
                vec![ConfigIssue::warning(
                    ConfigIssueCode::InvalidTemperature,
                    format!("agent.temperature: {} is outside 0.0..=2.0, ignoring it", t),
                )],
            ),
            other => (other, vec![]),
        }
    }

    pub fn to_agent_options(&self, command_timeout_ms: Option<u64>) -> AgentOptions {
        AgentOptions {
            max_observation_bytes: self.max_observation_bytes,
            command_timeout_ms,
            ..AgentOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_maps_every_cap() {
        let config = FileAgentConfig {
            max_iterations: Some(5),
            max_tokens: Some(1000),
            max_cost: Some(0.5),
            max_duration_ms: Some(60_000),
            ..Default::default()
        };
        let budget = config.to_budget();
        assert_eq!(budget.max_iterations, Some(5));
        assert_eq!(budget.max_tokens, Some(1000));
        assert_eq!(budget.max_cost, Some(0.5));
        assert_eq!(budget.max_duration_ms, Some(60_000));
    }

    #[test]
    fn out_of_range_temperature_is_dropped() {
        let config = FileAgentConfig {
            temperature: Some(3.5),
            ..Default::default()
        };
        let (temperature, issues) = config.parse_temperature();
        assert!(temperature.is_none());
        assert_eq!(issues[0].code, ConfigIssueCode::InvalidTemperature);

        let config = FileAgentConfig {
            temperature: Some(0.7),
            ..Default::default()
        };
        assert_eq!(config.parse_temperature(), (Some(0.7), vec![]));
    }
}

//! Tool domain traits
//!
//! Contains pure domain logic for validating tool calls against their
//! definitions. The async `Tool` trait lives in the application layer (ports).

use super::entities::{ToolCall, ToolDefinition, ToolParameter};

/// Validator for tool calls
///
/// A pure domain trait that validates tool calls against their definitions
/// without any I/O operations.
pub trait ToolValidator {
    /// Validate a tool call against its definition
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), String>;
}

/// Default implementation of ToolValidator
///
/// Checks required parameters, rejects unknown parameters, and checks each
/// supplied value against the parameter's type hint.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), String> {
        for param in &definition.parameters {
            if param.required && !call.arguments.contains_key(&param.name) {
                return Err(format!(
                    "Missing required parameter '{}' for tool '{}'",
                    param.name, definition.name
                ));
            }
        }

        for (arg_name, value) in &call.arguments {
            let Some(param) = definition.parameter(arg_name) else {
                return Err(format!(
                    "Unknown parameter '{}' for tool '{}'",
                    arg_name, definition.name
                ));
            };
            if !type_matches(param, value) {
                return Err(format!(
                    "Parameter '{}' for tool '{}' must be of type {}",
                    arg_name, definition.name, param.param_type
                ));
            }
        }

        Ok(())
    }
}

fn type_matches(param: &ToolParameter, value: &serde_json::Value) -> bool {
    // Optional parameters may be sent as explicit nulls by some providers.
    if value.is_null() {
        return !param.required;
    }
    match param.param_type.as_str() {
        "string" | "path" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::{RiskLevel, ToolParameter};

    #[test]
    fn test_validator_missing_required() {
        let validator = DefaultToolValidator;
        let definition = ToolDefinition::new("test", "test tool", RiskLevel::Low)
            .with_parameter(ToolParameter::new("required_param", "A required param", true));

        let call = ToolCall::new("test");
        let result = validator.validate(&call, &definition);
        assert!(result.unwrap_err().contains("Missing required parameter"));
    }

    #[test]
    fn test_validator_unknown_param() {
        let validator = DefaultToolValidator;
        let definition = ToolDefinition::new("test", "test tool", RiskLevel::Low)
            .with_parameter(ToolParameter::new("known_param", "A known param", false));

        let call = ToolCall::new("test").with_arg("unknown_param", "value");
        let result = validator.validate(&call, &definition);
        assert!(result.unwrap_err().contains("Unknown parameter"));
    }

    #[test]
    fn test_validator_type_mismatch() {
        let validator = DefaultToolValidator;
        let definition = ToolDefinition::new("run", "run", RiskLevel::Medium).with_parameter(
            ToolParameter::new("timeout_ms", "Timeout", false).with_type("integer"),
        );

        let call = ToolCall::new("run").with_arg("timeout_ms", "soon");
        assert!(validator.validate(&call, &definition).unwrap_err().contains("integer"));

        let call = ToolCall::new("run").with_arg("timeout_ms", 500);
        assert!(validator.validate(&call, &definition).is_ok());

        let call = ToolCall::new("run").with_arg("timeout_ms", serde_json::Value::Null);
        assert!(validator.validate(&call, &definition).is_ok());
    }

    #[test]
    fn test_validator_valid_call() {
        let validator = DefaultToolValidator;
        let definition = ToolDefinition::new("test", "test tool", RiskLevel::Low)
            .with_parameter(ToolParameter::new("param1", "First param", true))
            .with_parameter(ToolParameter::new("param2", "Second param", false));

        let call = ToolCall::new("test")
            .with_arg("param1", "value1")
            .with_arg("param2", "value2");

        assert!(validator.validate(&call, &definition).is_ok());
    }
}

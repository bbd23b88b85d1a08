//! Prompt templates for the agent loop

use crate::role::RoleConfig;
use crate::tool::FINISH_TOOL;
use crate::tool::entities::ToolSpec;

/// Templates for generating agent prompts
pub struct AgentPromptTemplate;

impl AgentPromptTemplate {
    /// System prompt for an agent with the given tools and (optional) role
    /// profile.
    pub fn agent_system(tool_spec: &ToolSpec, role: Option<&RoleConfig>) -> String {
        let tool_descriptions = tool_spec
            .all()
            .map(|t| {
                let params = t
                    .parameters
                    .iter()
                    .map(|p| {
                        let required = if p.required { " (required)" } else { "" };
                        format!("    - {} ({}): {}{}", p.name, p.param_type, p.description, required)
                    })
                    .collect::<Vec<_>>()
                    .join("\n");

                format!(
                    "- **{}**: {}\n  Risk: {}\n  Parameters:\n{}",
                    t.name, t.description, t.risk_level, params
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let role_section = match role {
            Some(config) => {
                let mut section = format!(
                    "## Your Role: {}\n\n{}\n\nTool access: {}",
                    config.role,
                    config.description,
                    config.access_level.description()
                );
                if !config.system_prompt.is_empty() {
                    section.push_str("\n\n");
                    section.push_str(&config.system_prompt);
                }
                section
            }
            None => String::new(),
        };

        format!(
            r#"You are an autonomous coding agent working inside a software project.

You work in a loop: think about the next step, call exactly one tool, read its
result, and continue until the task is done.

{role_section}

## Available Tools

{tool_descriptions}

## Guidelines

1. **Investigate first**: read the relevant files before changing them
2. **Small steps**: one tool call per turn, then look at the result
3. **Verify**: after editing, run the build or the tests when you can
4. **Recover**: a failed tool call is information; adjust and try again
5. **Stay in scope**: only do what the task asks

## Finishing

When the task is complete, call the `{finish}` tool with your final answer in
its `response` argument. Replying without any tool call also ends the task.
"#,
            role_section = role_section,
            tool_descriptions = tool_descriptions,
            finish = FINISH_TOOL,
        )
    }

    /// First user message for a task, with the outcome of prerequisite tasks.
    pub fn task(task: &str, context_summary: Option<&str>) -> String {
        match context_summary {
            Some(summary) if !summary.trim().is_empty() => format!(
                "## Task\n\n{}\n\n## Results From Prerequisite Tasks\n\n{}",
                task, summary
            ),
            _ => format!("## Task\n\n{}", task),
        }
    }

    /// Message sent back to the provider after the agent was resumed.
    pub fn resumed() -> &'static str {
        "The run was paused and has now resumed. Continue from where you left off."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::{AgentRole, ToolAccessLevel};
    use crate::tool::entities::{RiskLevel, ToolDefinition, ToolParameter};

    #[test]
    fn system_prompt_lists_tools_and_role() {
        let spec = ToolSpec::new().register(
            ToolDefinition::new("read_file", "Read a file", RiskLevel::Low)
                .with_parameter(ToolParameter::new("path", "File path", true)),
        );
        let role = RoleConfig::new(AgentRole::Finder, "Finds things", ToolAccessLevel::ReadOnly)
            .with_system_prompt("Report exact paths.");

        let prompt = AgentPromptTemplate::agent_system(&spec, Some(&role));
        assert!(prompt.contains("**read_file**"));
        assert!(prompt.contains("path (string): File path (required)"));
        assert!(prompt.contains("Your Role: finder"));
        assert!(prompt.contains("Report exact paths."));
        assert!(prompt.contains("`finish`"));
    }

    #[test]
    fn task_prompt_includes_context_only_when_present() {
        assert_eq!(AgentPromptTemplate::task("do it", None), "## Task\n\ndo it");
        assert_eq!(AgentPromptTemplate::task("do it", Some("  ")), "## Task\n\ndo it");
        assert!(AgentPromptTemplate::task("do it", Some("found x")).contains("found x"));
    }
}

//! Prompt templates for task decomposition

use crate::role::RoleConfig;

pub struct DecomposerPromptTemplate;

impl DecomposerPromptTemplate {
    pub fn system(roles: &[&RoleConfig]) -> String {
        let role_list = roles
            .iter()
            .map(|r| format!("- `{}`: {}", r.role, r.description))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are a planning assistant that breaks software engineering tasks into
small subtasks for specialised agents.

## Available Roles

{role_list}

## Output Format

Respond with a single JSON object inside a ```json fenced block:

```json
{{
  "description": "one-line summary of the plan",
  "execution_mode": "dag",
  "complexity": 0.5,
  "tasks": [
    {{
      "id": "task-1",
      "description": "what this agent must do",
      "role": "finder",
      "complexity": 0.3,
      "depends_on": [],
      "parallelizable": true
    }}
  ]
}}
```

Rules:
- ids are unique; `depends_on` only names ids from this plan
- no dependency cycles
- use "sequential" only when every task must run strictly in order
- complexity is between 0.0 and 1.0
- keep the plan short; a simple task needs a single subtask"#,
            role_list = role_list
        )
    }

    pub fn user(task: &str) -> String {
        format!("Decompose this task:\n\n{}", task)
    }
}

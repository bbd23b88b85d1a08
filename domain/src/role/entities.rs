//! Role entities: who an agent is and which tools it may touch.

use crate::agent::budget::AgentBudget;
use crate::tool::FINISH_TOOL;
use serde::{Deserialize, Serialize};

/// Specialisation of an agent.
///
/// The nine built-in roles are a closed set; `Custom` covers roles
/// registered at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentRole {
    /// Locates files, symbols and call sites
    Finder,
    /// Analyses and designs; does not edit
    Thinker,
    /// Reads documentation and gathers reference material
    Librarian,
    Refactoring,
    Reviewer,
    Tester,
    Security,
    /// Small, quick changes with a tight budget
    Rush,
    General,
    Custom(String),
}

impl AgentRole {
    pub const BUILTIN: [AgentRole; 9] = [
        AgentRole::Finder,
        AgentRole::Thinker,
        AgentRole::Librarian,
        AgentRole::Refactoring,
        AgentRole::Reviewer,
        AgentRole::Tester,
        AgentRole::Security,
        AgentRole::Rush,
        AgentRole::General,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            AgentRole::Finder => "finder",
            AgentRole::Thinker => "thinker",
            AgentRole::Librarian => "librarian",
            AgentRole::Refactoring => "refactoring",
            AgentRole::Reviewer => "reviewer",
            AgentRole::Tester => "tester",
            AgentRole::Security => "security",
            AgentRole::Rush => "rush",
            AgentRole::General => "general",
            AgentRole::Custom(name) => name,
        }
    }

    /// Built-in role by name (case-insensitive, a few common synonyms).
    pub fn builtin(name: &str) -> Option<AgentRole> {
        match name.trim().to_ascii_lowercase().as_str() {
            "finder" | "explorer" => Some(AgentRole::Finder),
            "thinker" | "architect" | "planner" => Some(AgentRole::Thinker),
            "librarian" | "researcher" => Some(AgentRole::Librarian),
            "refactoring" | "refactor" | "refactorer" => Some(AgentRole::Refactoring),
            "reviewer" | "review" => Some(AgentRole::Reviewer),
            "tester" | "test" | "qa" => Some(AgentRole::Tester),
            "security" | "auditor" => Some(AgentRole::Security),
            "rush" => Some(AgentRole::Rush),
            "general" | "coder" | "implementer" => Some(AgentRole::General),
            _ => None,
        }
    }

    /// Parse any role name; unknown names become `Custom`.
    pub fn parse(name: &str) -> AgentRole {
        Self::builtin(name).unwrap_or_else(|| AgentRole::Custom(name.trim().to_string()))
    }

    /// Best-guess role for a free-text task description.
    pub fn infer_from_text(text: &str) -> AgentRole {
        let lower = text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if has(&["security", "vulnerab", "audit", "cve", "injection"]) {
            AgentRole::Security
        } else if has(&["test", "coverage", "spec "]) {
            AgentRole::Tester
        } else if has(&["review", "critique"]) {
            AgentRole::Reviewer
        } else if has(&["refactor", "rename", "clean up", "cleanup", "extract"]) {
            AgentRole::Refactoring
        } else if has(&["find ", "locate", "where is", "search for", "which files"]) {
            AgentRole::Finder
        } else if has(&["document", "docs", "research", "look up"]) {
            AgentRole::Librarian
        } else if has(&["design", "architect", "analy", "investigate", "explain"]) {
            AgentRole::Thinker
        } else if has(&["typo", "quick", "trivial", "bump"]) {
            AgentRole::Rush
        } else {
            AgentRole::General
        }
    }
}

impl From<String> for AgentRole {
    fn from(s: String) -> Self {
        AgentRole::parse(&s)
    }
}

impl From<AgentRole> for String {
    fn from(role: AgentRole) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse tool policy attached to a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolAccessLevel {
    ReadOnly,
    ReadWrite,
    ReadGit,
    ReadWriteBash,
    All,
}

const READ_TOOLS: &[&str] = &["read_file", "list_dir", "glob_search", "grep_search"];
const WRITE_TOOLS: &[&str] = &["write_file", "delete_file"];
const GIT_TOOLS: &[&str] = &["git_status", "git_diff"];
const SHELL_TOOLS: &[&str] = &["run_command"];

impl ToolAccessLevel {
    pub fn as_str(&self) -> &str {
        match self {
            ToolAccessLevel::ReadOnly => "read_only",
            ToolAccessLevel::ReadWrite => "read_write",
            ToolAccessLevel::ReadGit => "read_git",
            ToolAccessLevel::ReadWriteBash => "read_write_bash",
            ToolAccessLevel::All => "all",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolAccessLevel::ReadOnly => "Read-only access: can read, list and search files",
            ToolAccessLevel::ReadWrite => {
                "Read-write access: can read, search, create, modify and delete files"
            }
            ToolAccessLevel::ReadGit => {
                "Read and git access: can read and search files and inspect git status and diffs"
            }
            ToolAccessLevel::ReadWriteBash => {
                "Read, write and shell access: can modify files, run commands and inspect git"
            }
            ToolAccessLevel::All => "Full access: every registered tool",
        }
    }

    /// Whether the level grants the named built-in tool.
    ///
    /// `All` grants every name, including tools registered at runtime.
    pub fn permits(&self, tool_name: &str) -> bool {
        let in_set = |set: &[&str]| set.contains(&tool_name);
        match self {
            ToolAccessLevel::ReadOnly => in_set(READ_TOOLS),
            ToolAccessLevel::ReadWrite => in_set(READ_TOOLS) || in_set(WRITE_TOOLS),
            ToolAccessLevel::ReadGit => in_set(READ_TOOLS) || in_set(GIT_TOOLS),
            ToolAccessLevel::ReadWriteBash => {
                in_set(READ_TOOLS) || in_set(WRITE_TOOLS) || in_set(GIT_TOOLS) || in_set(SHELL_TOOLS)
            }
            ToolAccessLevel::All => true,
        }
    }
}

impl std::fmt::Display for ToolAccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capability profile for one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleConfig {
    pub role: AgentRole,
    pub description: String,
    /// Model hint for provider selection (e.g. "fast", "reasoning")
    pub recommended_model: Option<String>,
    pub access_level: ToolAccessLevel,
    /// Tools granted on top of the access level
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    /// Tools withheld regardless of level or allow list
    #[serde(default)]
    pub forbidden_tools: Vec<String>,
    #[serde(default)]
    pub default_budget: AgentBudget,
    /// Appended to the agent's base system prompt
    #[serde(default)]
    pub system_prompt: String,
}

impl RoleConfig {
    pub fn new(role: AgentRole, description: impl Into<String>, access_level: ToolAccessLevel) -> Self {
        Self {
            role,
            description: description.into(),
            recommended_model: None,
            access_level,
            allowed_tools: Vec::new(),
            forbidden_tools: Vec::new(),
            default_budget: AgentBudget::default(),
            system_prompt: String::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.recommended_model = Some(model.into());
        self
    }

    pub fn allow(mut self, tool: impl Into<String>) -> Self {
        self.allowed_tools.push(tool.into());
        self
    }

    pub fn forbid(mut self, tool: impl Into<String>) -> Self {
        self.forbidden_tools.push(tool.into());
        self
    }

    pub fn with_budget(mut self, budget: AgentBudget) -> Self {
        self.default_budget = budget;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Whether this role may call `tool_name`. Deny beats allow; the finish
    /// signal is always available.
    pub fn permits(&self, tool_name: &str) -> bool {
        if tool_name == FINISH_TOOL {
            return true;
        }
        if self.forbidden_tools.iter().any(|t| t == tool_name) {
            return false;
        }
        self.allowed_tools.iter().any(|t| t == tool_name) || self.access_level.permits(tool_name)
    }
}

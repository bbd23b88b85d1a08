//! Search tools: glob_search, grep_search
//!
//! Both walk the tree through the executor rather than the host
//! filesystem. VCS and build directories are skipped.

use super::{executor_failure, truncate_output};
use async_trait::async_trait;
use conductor_application::{Executor, ExecutorError, Tool, ToolContext};
use conductor_domain::tool::{
    entities::{RiskLevel, ToolCall, ToolDefinition, ToolParameter},
    value_objects::{ToolError, ToolResult, ToolResultMetadata},
};
use glob::{MatchOptions, Pattern};
use regex::RegexBuilder;
use std::time::Instant;

pub const GLOB_SEARCH: &str = "glob_search";
pub const GREP_SEARCH: &str = "grep_search";

/// Maximum number of results to return
const MAX_RESULTS: usize = 1000;

/// Upper bound on files visited by one walk
const MAX_WALK_FILES: usize = 20_000;

/// Files larger than this are not grepped (5 MB)
const MAX_GREP_FILE_SIZE: u64 = 5 * 1024 * 1024;

const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A file found by [`walk`], relative to the walk base.
struct WalkedFile {
    relative: String,
    path: String,
    size: Option<u64>,
}

fn join(base: &str, name: &str) -> String {
    if base.is_empty() || base == "." {
        name.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}

/// Every file under `base`, depth first, sorted within each directory.
async fn walk(executor: &dyn Executor, base: &str) -> Result<Vec<WalkedFile>, ExecutorError> {
    let mut files = Vec::new();
    let mut stack = vec![String::new()];

    while let Some(relative_dir) = stack.pop() {
        let dir = join(base, &relative_dir);
        let entries = match executor.list_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if relative_dir.is_empty() => return Err(e),
            Err(_) => continue,
        };
        for entry in entries.into_iter().rev() {
            let relative = join(&relative_dir, &entry.name);
            if entry.is_dir {
                if !SKIPPED_DIRS.contains(&entry.name.as_str()) {
                    stack.push(relative);
                }
            } else {
                files.push(WalkedFile {
                    path: join(base, &relative),
                    relative,
                    size: entry.size,
                });
                if files.len() >= MAX_WALK_FILES {
                    return Ok(files);
                }
            }
        }
    }
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

fn max_results(call: &ToolCall) -> usize {
    call.get_i64("max_results")
        .filter(|n| *n > 0)
        .map(|n| n as usize)
        .unwrap_or(MAX_RESULTS)
        .min(MAX_RESULTS)
}

pub struct GlobSearchTool {
    definition: ToolDefinition,
}

impl GlobSearchTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new(
                GLOB_SEARCH,
                "Search for files matching a glob pattern (e.g., '**/*.rs', 'src/*.txt')",
                RiskLevel::Low,
            )
            .with_parameter(ToolParameter::new("pattern", "Glob pattern to match files", true).with_type("string"))
            .with_parameter(
                ToolParameter::new("base_dir", "Base directory to search from (default: current dir)", false)
                    .with_type("path"),
            )
            .with_parameter(
                ToolParameter::new("max_results", "Maximum number of results to return (default: 1000)", false)
                    .with_type("integer"),
            ),
        }
    }
}

impl Default for GlobSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GlobSearchTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let started = Instant::now();
        let pattern = match call.require_string("pattern") {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(GLOB_SEARCH, ToolError::invalid_argument(e)),
        };
        let pattern = match Pattern::new(pattern.trim_start_matches("./")) {
            Ok(p) => p,
            Err(e) => {
                return ToolResult::failure(
                    GLOB_SEARCH,
                    ToolError::invalid_argument(format!("Invalid glob pattern: {}", e)),
                );
            }
        };
        let base = call.get_string("base_dir").unwrap_or(".");
        let limit = max_results(call);

        let files = match walk(ctx.executor.as_ref(), base).await {
            Ok(files) => files,
            Err(e) => return executor_failure(GLOB_SEARCH, base, e),
        };

        let matches: Vec<&str> = files
            .iter()
            .filter(|f| pattern.matches_with(&f.relative, MATCH_OPTIONS))
            .map(|f| f.path.as_str())
            .collect();
        let match_count = matches.len().min(limit);

        let output = if matches.is_empty() {
            "No files found matching the pattern".to_string()
        } else {
            let mut output = matches[..match_count].join("\n");
            if matches.len() > limit {
                output.push_str(&format!("\n... (limited to {} results)", limit));
            }
            output
        };

        ToolResult::success(GLOB_SEARCH, output).with_metadata(ToolResultMetadata {
            duration_ms: Some(started.elapsed().as_millis() as u64),
            match_count: Some(match_count),
            ..Default::default()
        })
    }
}

pub struct GrepSearchTool {
    definition: ToolDefinition,
}

impl GrepSearchTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new(
                GREP_SEARCH,
                "Search for a regex pattern within file contents",
                RiskLevel::Low,
            )
            .with_parameter(ToolParameter::new("pattern", "Regex pattern to search for", true).with_type("string"))
            .with_parameter(
                ToolParameter::new("path", "File or directory to search in (default: current dir)", false)
                    .with_type("path"),
            )
            .with_parameter(
                ToolParameter::new("file_pattern", "Glob pattern to filter file names (e.g., '*.rs')", false)
                    .with_type("string"),
            )
            .with_parameter(
                ToolParameter::new("case_insensitive", "Perform case-insensitive search", false)
                    .with_type("boolean"),
            )
            .with_parameter(
                ToolParameter::new("max_results", "Maximum number of matching lines (default: 1000)", false)
                    .with_type("integer"),
            ),
        }
    }
}

impl Default for GrepSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GrepSearchTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let started = Instant::now();
        let pattern = match call.require_string("pattern") {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(GREP_SEARCH, ToolError::invalid_argument(e)),
        };
        let regex = match RegexBuilder::new(pattern)
            .case_insensitive(call.get_bool("case_insensitive").unwrap_or(false))
            .build()
        {
            Ok(r) => r,
            Err(e) => {
                return ToolResult::failure(
                    GREP_SEARCH,
                    ToolError::invalid_argument(format!("Invalid regex: {}", e)),
                );
            }
        };
        let file_pattern = match call.get_string("file_pattern").map(Pattern::new).transpose() {
            Ok(p) => p,
            Err(e) => {
                return ToolResult::failure(
                    GREP_SEARCH,
                    ToolError::invalid_argument(format!("Invalid file pattern: {}", e)),
                );
            }
        };
        let path = call.get_string("path").unwrap_or(".");
        let limit = max_results(call);
        let executor = ctx.executor.as_ref();

        // A readable path is a single file; anything else is walked as a directory.
        let targets: Vec<(String, Option<String>)> = match executor.read_file(path).await {
            Ok(content) => vec![(path.to_string(), Some(content))],
            Err(ExecutorError::NotFound(_)) => {
                return ToolResult::failure(GREP_SEARCH, ToolError::not_found(path));
            }
            Err(ExecutorError::PathEscape(p)) => {
                return executor_failure(GREP_SEARCH, path, ExecutorError::PathEscape(p));
            }
            Err(_) => match walk(executor, path).await {
                Ok(files) => files
                    .into_iter()
                    .filter(|f| f.size.is_none_or(|s| s <= MAX_GREP_FILE_SIZE))
                    .filter(|f| {
                        file_pattern.as_ref().is_none_or(|p| {
                            let name = f.relative.rsplit('/').next().unwrap_or(&f.relative);
                            p.matches(name)
                        })
                    })
                    .map(|f| (f.path, None))
                    .collect(),
                Err(e) => return executor_failure(GREP_SEARCH, path, e),
            },
        };

        let mut lines = Vec::new();
        let mut files_matched = 0;
        'files: for (file, content) in targets {
            let content = match content {
                Some(c) => c,
                // unreadable or binary files are skipped
                None => match executor.read_file(&file).await {
                    Ok(c) => c,
                    Err(_) => continue,
                },
            };
            let mut matched = false;
            for (number, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    matched = true;
                    lines.push(format!("{}:{}: {}", file, number + 1, line));
                    if lines.len() > limit {
                        break 'files;
                    }
                }
            }
            if matched {
                files_matched += 1;
            }
        }

        let match_count = lines.len().min(limit);
        let output = if lines.is_empty() {
            format!("No matches found for pattern '{}'", pattern)
        } else {
            let mut output = lines[..match_count].join("\n");
            if lines.len() > limit {
                output.push_str(&format!("\n... (limited to {} results)", limit));
            }
            output
        };

        ToolResult::success(GREP_SEARCH, truncate_output(output)).with_metadata(ToolResultMetadata {
            duration_ms: Some(started.elapsed().as_millis() as u64),
            match_count: Some(match_count),
            exit_code: Some(if files_matched > 0 { 0 } else { 1 }),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context;
    use conductor_domain::tool::value_objects::codes;
    use serde_json::json;

    async fn seeded() -> (tempfile::TempDir, ToolContext) {
        let (dir, ctx) = context().await;
        for (path, content) in [
            ("Cargo.toml", "[package]\nname = \"demo\"\n"),
            ("src/main.rs", "fn main() {\n    println!(\"Hello\");\n}\n"),
            ("src/lib/util.rs", "pub fn hello() {}\n"),
            ("target/debug/build.rs", "fn main() {}\n"),
            ("docs/guide.md", "Say hello to the world\n"),
        ] {
            ctx.executor.write_file(path, content).await.unwrap();
        }
        (dir, ctx)
    }

    #[tokio::test]
    async fn glob_matches_recursively_and_skips_build_dirs() {
        let (_dir, ctx) = seeded().await;
        let call = ToolCall::new(GLOB_SEARCH).with_arg("pattern", "**/*.rs");
        let result = GlobSearchTool::new().execute(&call, &ctx).await;

        assert_eq!(result.to_observation_text(), "src/lib/util.rs\nsrc/main.rs");
        assert_eq!(result.metadata.match_count, Some(2));
    }

    #[tokio::test]
    async fn single_star_does_not_cross_directories() {
        let (_dir, ctx) = seeded().await;
        let call = ToolCall::new(GLOB_SEARCH).with_arg("pattern", "*.toml");
        let result = GlobSearchTool::new().execute(&call, &ctx).await;
        assert_eq!(result.to_observation_text(), "Cargo.toml");
    }

    #[tokio::test]
    async fn glob_respects_base_dir_and_limit() {
        let (_dir, ctx) = seeded().await;
        let call = ToolCall::new(GLOB_SEARCH)
            .with_arg("pattern", "**/*.rs")
            .with_arg("base_dir", "src")
            .with_arg("max_results", json!(1));
        let result = GlobSearchTool::new().execute(&call, &ctx).await;

        let text = result.to_observation_text();
        assert!(text.starts_with("src/lib/util.rs"));
        assert!(text.contains("limited to 1 results"));
    }

    #[tokio::test]
    async fn invalid_glob_is_rejected() {
        let (_dir, ctx) = context().await;
        let call = ToolCall::new(GLOB_SEARCH).with_arg("pattern", "[");
        let result = GlobSearchTool::new().execute(&call, &ctx).await;
        assert_eq!(result.error().unwrap().code, codes::INVALID_ARGUMENT);
    }

    #[tokio::test]
    async fn grep_reports_file_and_line() {
        let (_dir, ctx) = seeded().await;
        let call = ToolCall::new(GREP_SEARCH)
            .with_arg("pattern", "hello")
            .with_arg("case_insensitive", true);
        let result = GrepSearchTool::new().execute(&call, &ctx).await;

        assert_eq!(
            result.to_observation_text(),
            "docs/guide.md:1: Say hello to the world\nsrc/lib/util.rs:1: pub fn hello() {}\nsrc/main.rs:2:     println!(\"Hello\");"
        );
        assert_eq!(result.metadata.match_count, Some(3));
    }

    #[tokio::test]
    async fn grep_filters_by_file_pattern() {
        let (_dir, ctx) = seeded().await;
        let call = ToolCall::new(GREP_SEARCH)
            .with_arg("pattern", "fn main")
            .with_arg("file_pattern", "*.rs");
        let result = GrepSearchTool::new().execute(&call, &ctx).await;
        assert_eq!(result.to_observation_text(), "src/main.rs:1: fn main() {");
    }

    #[tokio::test]
    async fn grep_single_file() {
        let (_dir, ctx) = seeded().await;
        let call = ToolCall::new(GREP_SEARCH)
            .with_arg("pattern", "name")
            .with_arg("path", "Cargo.toml");
        let result = GrepSearchTool::new().execute(&call, &ctx).await;
        assert_eq!(result.to_observation_text(), "Cargo.toml:2: name = \"demo\"");
    }

    #[tokio::test]
    async fn grep_without_matches() {
        let (_dir, ctx) = seeded().await;
        let call = ToolCall::new(GREP_SEARCH).with_arg("pattern", "zzz");
        let result = GrepSearchTool::new().execute(&call, &ctx).await;
        assert!(result.is_success());
        assert_eq!(result.metadata.exit_code, Some(1));
        assert!(result.to_observation_text().starts_with("No matches"));
    }

    #[tokio::test]
    async fn grep_missing_path_is_not_found() {
        let (_dir, ctx) = context().await;
        let call = ToolCall::new(GREP_SEARCH)
            .with_arg("pattern", "x")
            .with_arg("path", "missing");
        let result = GrepSearchTool::new().execute(&call, &ctx).await;
        assert_eq!(result.error().unwrap().code, codes::NOT_FOUND);
    }
}

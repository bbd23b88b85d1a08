//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for conductor
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(author, version, about = "Autonomous coding agents with sandboxed execution")]
#[command(long_about = r#"
Conductor runs LLM-backed coding agents that reason, call tools and observe
the results until their task is done. Tasks can be decomposed into a plan of
role-specialised subtasks and executed as a dependency graph.

Configuration files are loaded from (lowest to highest priority):
1. ~/.config/conductor/config.toml   Global config
2. ./conductor.toml                  Project-level config
3. --config <path>                   Explicit config file
4. CONDUCTOR_* environment variables (e.g. CONDUCTOR_EXECUTOR__MODE=docker)

Example:
  conductor --script replay.json run "Fix the failing parser test"
  conductor --script replay.json plan "Add OAuth login"
  conductor --script replay.json --executor docker workflow "Refactor the cache layer"
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Replay model responses from a JSON script
    #[arg(long, global = true, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Override the executor mode (native, docker)
    #[arg(long, global = true, value_name = "MODE")]
    pub executor: Option<String>,

    /// Override the workspace directory
    #[arg(long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single agent on a task
    Run {
        task: String,

        /// Role profile for the agent
        #[arg(short, long, default_value = "general")]
        role: String,
    },

    /// Decompose a task into a workflow plan and print it
    Plan {
        task: String,

        /// Print the plan without enforcement additions
        #[arg(long)]
        no_enforce: bool,
    },

    /// Decompose a task and execute the resulting workflow
    Workflow {
        task: String,

        /// Cap on concurrently running agents
        #[arg(long, value_name = "N")]
        max_concurrency: Option<usize>,

        /// Execute the plan without enforcement rules
        #[arg(long)]
        skip_enforcement: bool,
    },

    /// Show configuration sources and the merged configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_role() {
        let cli = Cli::parse_from(["conductor", "--script", "s.json", "run", "fix it", "--role", "tester"]);
        assert_eq!(cli.script, Some(PathBuf::from("s.json")));
        match cli.command {
            Command::Run { task, role } => {
                assert_eq!(task, "fix it");
                assert_eq!(role, "tester");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["conductor", "workflow", "x", "--max-concurrency", "2", "-vv", "--json"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Command::Workflow {
                max_concurrency: Some(2),
                skip_enforcement: false,
                ..
            }
        ));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

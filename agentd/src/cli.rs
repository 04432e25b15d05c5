//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Autonomous LLM-driven task execution agent.
#[derive(Parser)]
#[command(name = "agentd", about = "Autonomous task execution agent with sandboxed actions and webhook reporting")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true, help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP service (default when no subcommand is given)
    Serve,

    /// Probe a running instance's /health endpoint; useful as a container liveness check
    Healthcheck {
        /// Base URL of the running instance
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["agentd"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_serve() {
        let cli = Cli::parse_from(["agentd", "serve"]);
        assert!(matches!(cli.command, Some(Command::Serve)));
    }

    #[test]
    fn test_cli_parse_healthcheck_default_url() {
        let cli = Cli::parse_from(["agentd", "healthcheck"]);
        assert!(matches!(cli.command, Some(Command::Healthcheck { ref url }) if url == "http://127.0.0.1:8080"));
    }

    #[test]
    fn test_cli_with_config_and_log_level() {
        let cli = Cli::parse_from(["agentd", "-c", "/etc/agentd.yml", "-l", "debug", "serve"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/agentd.yml")));
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }
}

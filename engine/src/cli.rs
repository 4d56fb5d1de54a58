//! CLI interface for Kiln
//!
//! Commands and global flags, defined with clap's derive API.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Kiln code-generation assistant
///
/// Generates multi-file projects from a prompt, edits and runs them, and
/// publishes them to a remote repository, driven by natural language.
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run interactive setup wizard
    Setup,

    /// Start an interactive agent session ('exit' to quit)
    Agent,

    /// Send a single request to the agent
    Ask {
        /// The request, e.g. "add a /health route to app.py"
        prompt: String,
    },

    /// Generate a new project from a prompt
    Generate {
        /// What to build
        prompt: String,

        /// Run the main file after generation
        #[arg(long)]
        run: bool,

        /// Also write the project as a zip archive to this path
        #[arg(long, value_name = "PATH")]
        zip: Option<PathBuf>,
    },

    /// Show the conversation history
    History {
        /// Number of turns to show (default: 20)
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Clear the conversation history
    Forget,

    /// List generated projects
    Projects,

    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: SocketAddr,
    },

    /// Run system diagnostics
    Doctor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["kiln", "doctor"]);
        assert!(matches!(cli.command, Command::Doctor));
        assert!(!cli.json);
        assert!(cli.log.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["kiln", "--json", "--log", "debug", "projects"]);
        assert!(cli.json);
        assert_eq!(cli.log, Some("debug".to_string()));
    }

    #[test]
    fn test_ask_command() {
        let cli = Cli::parse_from(["kiln", "ask", "edit app.py to add a /health route"]);
        if let Command::Ask { prompt } = cli.command {
            assert_eq!(prompt, "edit app.py to add a /health route");
        } else {
            panic!("Expected Ask command");
        }
    }

    #[test]
    fn test_generate_flags() {
        let cli = Cli::parse_from([
            "kiln",
            "generate",
            "a flask app with a login page",
            "--run",
            "--zip",
            "out.zip",
        ]);
        if let Command::Generate { prompt, run, zip } = cli.command {
            assert_eq!(prompt, "a flask app with a login page");
            assert!(run);
            assert_eq!(zip, Some(PathBuf::from("out.zip")));
        } else {
            panic!("Expected Generate command");
        }
    }

    #[test]
    fn test_history_command() {
        let cli = Cli::parse_from(["kiln", "history", "--limit", "5"]);
        if let Command::History { limit } = cli.command {
            assert_eq!(limit, 5);
        } else {
            panic!("Expected History command");
        }
    }

    #[test]
    fn test_serve_default_addr() {
        let cli = Cli::parse_from(["kiln", "serve"]);
        if let Command::Serve { addr } = cli.command {
            assert_eq!(addr, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
        } else {
            panic!("Expected Serve command");
        }
    }
}

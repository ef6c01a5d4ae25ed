//! CLI argument definitions using clap
//!
//! Commands:
//! - aerodb-periods replay --workload <path> [--config <path>]
//! - aerodb-periods check --workload <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aerodb-periods - system-versioned temporal tables over an in-memory host
#[derive(Parser, Debug)]
#[command(name = "aerodb-periods")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a workload and print the final live and history contents
    Replay {
        /// Path to the workload file
        #[arg(long)]
        workload: PathBuf,

        /// Path to the engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a workload and its catalog without running it
    Check {
        /// Path to the workload file
        #[arg(long)]
        workload: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

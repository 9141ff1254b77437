use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Raid - orchestrate development environments across repositories
///
/// raid clones the repositories declared in a profile and runs named
/// environments (variables plus tasks) declared in the profile or in each
/// repository's own raid.yaml.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default is $HOME/.raid/config.toml)
    #[arg(short, long, global = true, env = "RAID_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage profiles
    #[command(subcommand)]
    Profile(ProfileAction),

    /// Clone every repository of the active profile
    ///
    /// Repositories already present as git work trees are skipped.
    Install {
        /// Maximum number of concurrent clones (0 = unlimited)
        #[arg(short, long, value_name = "N", default_value_t = 0)]
        threads: usize,
    },

    /// Execute an environment from the active profile and its repositories
    Env {
        /// Environment name (matched case-insensitively)
        #[arg(value_name = "NAME")]
        name: String,

        /// Maximum number of environments executed at once (0 = unlimited)
        #[arg(short, long, value_name = "N", default_value_t = 1)]
        threads: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    /// Add profile(s) from a YAML (.yaml, .yml) or JSON (.json) file
    Add {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// List profiles
    #[command(visible_alias = "ls")]
    List,

    /// Switch the active profile
    Use {
        #[arg(value_name = "PROFILE")]
        name: String,
    },

    /// Remove profile(s)
    #[command(visible_alias = "rm")]
    Remove {
        #[arg(value_name = "PROFILE", required = true)]
        names: Vec<String>,
    },
}

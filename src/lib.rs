// Public API
pub mod cli;
pub mod commands;

// Core domain types
pub mod environment;
pub mod error;
pub mod executor;
pub mod installers;
mod pool;
pub mod profile;
pub mod store;
mod ui;
mod util;
mod workspace;

// Re-export main types
pub use environment::{resolve, EnvironmentMatch, Scope};
pub use error::{AggregateError, RaidError, RepositoryFailure};
pub use executor::EnvironmentExecutor;
pub use installers::{Cloner, ConcurrentInstaller, InstallOutcome, InstallReport};
pub use profile::{
    extract_profiles, read_profiles, Environment, EnvironmentVariable, Profile, ProfileFormat,
    Repository, Task, TaskKind,
};
pub use store::ProfileStore;
pub use workspace::{Workspace, WorkspacePath};

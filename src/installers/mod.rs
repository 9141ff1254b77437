use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AggregateError, RaidError, RepositoryFailure, Result};
use crate::pool::run_bounded;
use crate::profile::{Profile, Repository};
use crate::ui;

mod git;
pub use git::{is_work_tree, GitCli};

/// Backend that materialises a repository at a destination path.
pub trait Cloner: Send + Sync {
    fn clone_repository(&self, url: &str, destination: &Path) -> Result<()>;
}

/// What happened to one declared repository.
#[derive(Debug)]
pub enum InstallOutcome {
    Cloned,
    /// The destination already holds a git work tree.
    Skipped,
    Failed(RaidError),
}

impl InstallOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, InstallOutcome::Failed(_))
    }
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallOutcome::Cloned => write!(f, "cloned"),
            InstallOutcome::Skipped => write!(f, "skipped"),
            InstallOutcome::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

#[derive(Debug)]
pub struct RepositoryOutcome {
    pub name: String,
    pub path: PathBuf,
    pub outcome: InstallOutcome,
}

/// Per-repository outcomes of one install run, in declaration order.
#[derive(Debug, Default)]
pub struct InstallReport {
    pub outcomes: Vec<RepositoryOutcome>,
}

impl InstallReport {
    pub fn count(&self, predicate: impl Fn(&InstallOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|entry| predicate(&entry.outcome))
            .count()
    }

    pub fn outcome(&self, name: &str) -> Option<&InstallOutcome> {
        self.outcomes
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.outcome)
    }

    /// Succeeds when nothing failed; otherwise every failure is returned together.
    pub fn into_result(self) -> Result<Self> {
        if !self.outcomes.iter().any(|entry| entry.outcome.is_failure()) {
            return Ok(self);
        }

        let failures = self
            .outcomes
            .into_iter()
            .filter_map(|entry| match entry.outcome {
                InstallOutcome::Failed(error) => Some(RepositoryFailure {
                    name: entry.name,
                    error,
                }),
                _ => None,
            })
            .collect();
        Err(RaidError::Aggregate(AggregateError { failures }))
    }
}

/// Clones every repository of a profile in parallel.
pub struct ConcurrentInstaller {
    cloner: Arc<dyn Cloner>,
    max_concurrency: usize,
}

impl ConcurrentInstaller {
    /// Installer backed by the `git` command line; `0` means unbounded.
    pub fn new(max_concurrency: usize) -> Self {
        Self::with_cloner(Arc::new(GitCli::default()), max_concurrency)
    }

    pub fn with_cloner(cloner: Arc<dyn Cloner>, max_concurrency: usize) -> Self {
        Self {
            cloner,
            max_concurrency,
        }
    }

    /// Install the profile and fail with an aggregate error if any repository failed.
    pub fn install(&self, profile: &Profile) -> Result<InstallReport> {
        self.run(profile)?.into_result()
    }

    /// Attempt every repository and report each outcome without judging the run.
    pub fn run(&self, profile: &Profile) -> Result<InstallReport> {
        info!(
            profile = %profile.name,
            repositories = profile.repositories.len(),
            max_concurrency = self.max_concurrency,
            "installing profile"
        );

        if profile.repositories.is_empty() {
            ui::info("No repositories to install.");
            return Ok(InstallReport::default());
        }
        if self.max_concurrency > 0 {
            ui::info(format!(
                "Installing {} repositories, at most {} at a time",
                profile.repositories.len(),
                self.max_concurrency
            ));
        }

        let cloner = Arc::clone(&self.cloner);
        let outcomes = run_bounded(
            "install",
            profile.repositories.clone(),
            self.max_concurrency,
            move |repository| install_repository(cloner.as_ref(), repository),
        )?;

        Ok(InstallReport { outcomes })
    }
}

fn install_repository(cloner: &dyn Cloner, repository: Repository) -> RepositoryOutcome {
    let path = repository.expanded_path();
    let outcome = install_into(cloner, &repository, &path);
    RepositoryOutcome {
        name: repository.name,
        path,
        outcome,
    }
}

fn install_into(cloner: &dyn Cloner, repository: &Repository, path: &Path) -> InstallOutcome {
    if path.exists() {
        if is_work_tree(path) {
            debug!(repository = %repository.name, path = %path.display(), "already installed");
            ui::success(
                "Skipped",
                format!("'{}' already exists at {}", repository.name, path.display()),
            );
            return InstallOutcome::Skipped;
        }
        let error = RaidError::PathConflict {
            path: path.to_path_buf(),
        };
        ui::error(format!("'{}': {error}", repository.name));
        return InstallOutcome::Failed(error);
    }

    if repository.url.trim().is_empty() {
        let error = RaidError::Parse(format!(
            "repository '{}' has no url to clone from",
            repository.name
        ));
        ui::error(&error);
        return InstallOutcome::Failed(error);
    }

    let progress = ui::Progress::new("Cloning", format!("'{}' into {}", repository.name, path.display()));

    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            let error = RaidError::io("failed to create directory", parent, err);
            progress.fail("Failed", &error);
            return InstallOutcome::Failed(error);
        }
    }

    match cloner.clone_repository(&repository.url, path) {
        Ok(()) => {
            progress.success("Cloned", None);
            InstallOutcome::Cloned
        }
        Err(error) => {
            progress.fail("Failed", &error);
            InstallOutcome::Failed(error)
        }
    }
}

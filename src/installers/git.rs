use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

use super::Cloner;
use crate::error::{RaidError, Result};

/// Whether `path` is the root of a non-bare git repository.
pub fn is_work_tree(path: &Path) -> bool {
    git2::Repository::open(path)
        .map(|repo| !repo.is_bare())
        .unwrap_or(false)
}

/// Clones by shelling out to the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: OsString,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::with_program("git")
    }
}

impl GitCli {
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Cloner for GitCli {
    fn clone_repository(&self, url: &str, destination: &Path) -> Result<()> {
        debug!(url, destination = %destination.display(), "running git clone");

        let output = Command::new(&self.program)
            .arg("clone")
            .arg("--quiet")
            .arg(url)
            .arg(destination)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| {
                let program = self.program.to_string_lossy();
                if err.kind() == io::ErrorKind::NotFound {
                    RaidError::ExternalTool(format!("'{program}' was not found on PATH"))
                } else {
                    RaidError::ExternalTool(format!("failed to run '{program}': {err}"))
                }
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        Err(RaidError::ExternalTool(if stderr.is_empty() {
            format!("git clone of {url} exited with {}", output.status)
        } else {
            format!("git clone of {url} exited with {}: {stderr}", output.status)
        }))
    }
}

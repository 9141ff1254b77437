use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

use crate::environment::{EnvironmentMatch, Scope};
use crate::error::{RaidError, Result};
use crate::pool::run_bounded;
use crate::profile::{Environment, EnvironmentVariable, Task, TaskKind};
use crate::ui;
use crate::util::path::expand;

/// Serializes every write to the process environment.
static PROCESS_ENV: Mutex<()> = Mutex::new(());

/// Applies variables and runs the tasks of resolved environments.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentExecutor {
    max_concurrency: usize,
}

impl Default for EnvironmentExecutor {
    fn default() -> Self {
        Self::new(1)
    }
}

impl EnvironmentExecutor {
    /// `max_concurrency` bounds how many environments run at once; `0` is unbounded.
    pub fn new(max_concurrency: usize) -> Self {
        Self { max_concurrency }
    }

    /// Run every match to completion and return the first error in resolution order.
    ///
    /// A failing task stops the rest of its own environment only.
    pub fn execute(&self, matches: Vec<EnvironmentMatch>) -> Result<()> {
        let results = run_bounded("env", matches, self.max_concurrency, |matched| {
            run_environment(&matched)
        })?;

        match results.into_iter().find_map(Result::err) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Apply one environment's variables, then run its tasks in order.
pub fn run_environment(matched: &EnvironmentMatch) -> Result<()> {
    let environment = &matched.environment;
    info!(environment = %environment.name, scope = %matched.scope, "executing environment");
    let progress = ui::Progress::new(
        "Running",
        format!("environment '{}' from {}", environment.name, matched.scope),
    );

    let result = apply_variables(&environment.variables).and_then(|()| {
        environment
            .tasks
            .iter()
            .enumerate()
            .try_for_each(|(index, task)| run_task(&matched.scope, environment, index + 1, task))
    });

    match result {
        Ok(()) => {
            progress.success("Finished", None);
            Ok(())
        }
        Err(err) => {
            progress.fail("Failed", &err);
            Err(err)
        }
    }
}

/// Write `variables` into the process environment.
///
/// The values stay set for the rest of the process lifetime.
pub fn apply_variables(variables: &[EnvironmentVariable]) -> Result<()> {
    for variable in variables {
        if variable.name.is_empty()
            || variable.name.contains(['=', '\0'])
            || variable.value.contains('\0')
        {
            return Err(RaidError::Parse(format!(
                "invalid environment variable '{}'",
                variable.name
            )));
        }
    }

    let _guard = PROCESS_ENV.lock().unwrap_or_else(PoisonError::into_inner);
    for variable in variables {
        debug!(name = %variable.name, value = %variable.value, "setting environment variable");
        env::set_var(&variable.name, &variable.value);
    }
    Ok(())
}

fn run_task(scope: &Scope, environment: &Environment, index: usize, task: &Task) -> Result<()> {
    let failure = |reason: String| RaidError::Task {
        environment: environment.name.clone(),
        index,
        reason,
    };

    let mut command = match task.task_kind()? {
        TaskKind::Shell => {
            let cmd = task
                .cmd
                .as_deref()
                .filter(|cmd| !cmd.trim().is_empty())
                .ok_or_else(|| failure("shell task requires a 'cmd' field".to_string()))?;
            ui::status("Task", format!("{index}: {cmd}"));
            shell_command(cmd)
        }
        TaskKind::Script => {
            let raw = task
                .path
                .as_deref()
                .filter(|path| !path.trim().is_empty())
                .ok_or_else(|| failure("script task requires a 'path' field".to_string()))?;
            let script = resolve_script(raw, scope.root()).map_err(failure)?;
            ensure_executable(&script).map_err(failure)?;
            ui::status("Task", format!("{index}: {}", script.display()));
            Command::new(script)
        }
    };

    if let Some(root) = scope.root().filter(|root| root.is_dir()) {
        command.current_dir(root);
    }
    // Passed explicitly as well, so concurrent environments cannot see each other's values.
    command.envs(
        environment
            .variables
            .iter()
            .map(|variable| (variable.name.as_str(), variable.value.as_str())),
    );

    let status = command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|err| failure(format!("failed to start: {err}")))?;

    if !status.success() {
        return Err(failure(format!("exited with {status}")));
    }
    Ok(())
}

#[cfg(unix)]
fn shell_command(cmd: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd);
    command
}

#[cfg(windows)]
fn shell_command(cmd: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(cmd);
    command
}

fn resolve_script(raw: &str, root: Option<&Path>) -> std::result::Result<PathBuf, String> {
    let path = expand(raw);
    let path = if path.is_absolute() {
        path
    } else {
        let base = match root {
            Some(root) => root.to_path_buf(),
            None => env::current_dir()
                .map_err(|err| format!("failed to determine current directory: {err}"))?,
        };
        base.join(path)
    };

    if !path.is_file() {
        return Err(format!("script file not found: {}", path.display()));
    }
    Ok(path)
}

#[cfg(unix)]
fn ensure_executable(path: &Path) -> std::result::Result<(), String> {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|err| format!("failed to inspect script: {err}"))?;
    let mut permissions = metadata.permissions();
    let mode = permissions.mode();
    if mode & 0o111 == 0o111 {
        return Ok(());
    }
    permissions.set_mode(mode | 0o755);
    fs::set_permissions(path, permissions)
        .map_err(|err| format!("failed to make script executable: {err}"))
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> std::result::Result<(), String> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn environment(name: &str, variables: &[(&str, &str)], tasks: Vec<Task>) -> Environment {
        Environment {
            name: name.to_string(),
            tasks,
            variables: variables
                .iter()
                .map(|(name, value)| EnvironmentVariable {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    fn profile_match(environment: Environment) -> EnvironmentMatch {
        EnvironmentMatch {
            scope: Scope::Profile,
            environment,
        }
    }

    fn repository_match(root: &Path, environment: Environment) -> EnvironmentMatch {
        EnvironmentMatch {
            scope: Scope::Repository {
                name: "repo".to_string(),
                root: root.to_path_buf(),
            },
            environment,
        }
    }

    #[test]
    #[serial]
    fn test_tasks_observe_variables() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out.txt");
        let dev = environment(
            "dev",
            &[("RAID_TEST_FOO", "bar")],
            vec![Task::shell(format!("printf %s \"$RAID_TEST_FOO\" > {}", out.display()))],
        );

        EnvironmentExecutor::default()
            .execute(vec![profile_match(dev)])
            .unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "bar");
        assert_eq!(env::var("RAID_TEST_FOO").unwrap(), "bar");
        env::remove_var("RAID_TEST_FOO");
    }

    #[test]
    fn test_tasks_run_in_declared_order() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("log.txt");
        let tasks = (1..=4)
            .map(|n| Task::shell(format!("echo {n} >> {}", log.display())))
            .collect();

        EnvironmentExecutor::new(0)
            .execute(vec![profile_match(environment("dev", &[], tasks))])
            .unwrap();

        assert_eq!(fs::read_to_string(&log).unwrap(), "1\n2\n3\n4\n");
    }

    #[test]
    fn test_failed_task_stops_its_environment() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("after");
        let dev = environment(
            "dev",
            &[],
            vec![
                Task::shell("exit 3"),
                Task::shell(format!("touch {}", marker.display())),
            ],
        );

        let err = EnvironmentExecutor::default()
            .execute(vec![profile_match(dev)])
            .unwrap_err();

        match err {
            RaidError::Task {
                environment, index, ..
            } => {
                assert_eq!(environment, "dev");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!marker.exists());
    }

    #[test]
    fn test_failure_does_not_stop_other_environments() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("second-ran");
        let failing = environment("ci", &[], vec![Task::shell("false")]);
        let passing = environment("ci", &[], vec![Task::shell(format!("touch {}", marker.display()))]);

        let err = EnvironmentExecutor::new(2)
            .execute(vec![profile_match(failing), repository_match(temp.path(), passing)])
            .unwrap_err();

        assert!(matches!(err, RaidError::Task { .. }));
        assert!(marker.exists());
    }

    #[test]
    fn test_unknown_task_kind() {
        let task = Task {
            kind: "Docker".to_string(),
            cmd: Some("run".to_string()),
            path: None,
        };
        let err = EnvironmentExecutor::default()
            .execute(vec![profile_match(environment("dev", &[], vec![task]))])
            .unwrap_err();
        assert!(matches!(err, RaidError::TaskKind { ref kind } if kind == "Docker"));
    }

    #[test]
    fn test_shell_task_requires_cmd() {
        let task = Task {
            kind: "shell".to_string(),
            cmd: None,
            path: None,
        };
        let err = EnvironmentExecutor::default()
            .execute(vec![profile_match(environment("dev", &[], vec![task]))])
            .unwrap_err();
        assert!(err.to_string().contains("requires a 'cmd' field"));
    }

    #[test]
    fn test_script_resolves_against_repository_and_becomes_executable() {
        let temp = TempDir::new().unwrap();
        let scripts = temp.path().join("scripts");
        fs::create_dir_all(&scripts).unwrap();
        let script = scripts.join("setup.sh");
        fs::write(&script, "#!/bin/sh\npwd > ran.txt\n").unwrap();

        let dev = environment("dev", &[], vec![Task::script("scripts/setup.sh")]);
        EnvironmentExecutor::default()
            .execute(vec![repository_match(temp.path(), dev)])
            .unwrap();

        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
        let ran = fs::read_to_string(temp.path().join("ran.txt")).unwrap();
        assert_eq!(
            PathBuf::from(ran.trim()).canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_missing_script() {
        let temp = TempDir::new().unwrap();
        let dev = environment("dev", &[], vec![Task::script("nope.sh")]);
        let err = EnvironmentExecutor::default()
            .execute(vec![repository_match(temp.path(), dev)])
            .unwrap_err();
        assert!(err.to_string().contains("script file not found"));
    }

    #[test]
    #[serial]
    fn test_concurrent_environments_keep_their_own_values() {
        let temp = TempDir::new().unwrap();
        let matches = (0..4)
            .map(|n| {
                let out = temp.path().join(format!("scope-{n}"));
                let value = format!("value-{n}");
                repository_match(
                    temp.path(),
                    environment(
                        "ci",
                        &[("RAID_TEST_SCOPE", value.as_str())],
                        vec![Task::shell(format!("printf %s \"$RAID_TEST_SCOPE\" > {}", out.display()))],
                    ),
                )
            })
            .collect();

        EnvironmentExecutor::new(0).execute(matches).unwrap();

        for n in 0..4 {
            let seen = fs::read_to_string(temp.path().join(format!("scope-{n}"))).unwrap();
            assert_eq!(seen, format!("value-{n}"));
        }
        env::remove_var("RAID_TEST_SCOPE");
    }

    #[test]
    fn test_invalid_variable_name() {
        let err = apply_variables(&[EnvironmentVariable {
            name: "BAD=NAME".to_string(),
            value: "x".to_string(),
        }])
        .unwrap_err();
        assert!(err.to_string().contains("invalid environment variable"));
    }
}

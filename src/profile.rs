use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RaidError, Result};
use crate::util::path::expand;

/// Separator between documents in a multi-profile YAML file.
const YAML_SEPARATOR: &str = "---";

/// A named bundle of repository and environment declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<Repository>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<Environment>,
}

impl Profile {
    /// First environment whose name matches `name`, ignoring case.
    ///
    /// Case folding covers the full Unicode range, not just ASCII.
    pub fn environment(&self, name: &str) -> Option<&Environment> {
        let wanted = name.to_lowercase();
        self.environments
            .iter()
            .find(|env| env.name.to_lowercase() == wanted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    /// Raw destination; may contain `~` or `$VAR` and is only expanded when used.
    pub path: String,
    /// Clone source. Repository-local configs may leave it out; installing
    /// such a repository fails for that repository alone.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl Repository {
    pub fn expanded_path(&self) -> PathBuf {
        expand(&self.path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<EnvironmentVariable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task type as written in the file; checked when the task runs.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Task {
    pub fn shell(cmd: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::Shell.to_string(),
            cmd: Some(cmd.into()),
            path: None,
        }
    }

    pub fn script(path: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::Script.to_string(),
            cmd: None,
            path: Some(path.into()),
        }
    }

    pub fn task_kind(&self) -> Result<TaskKind> {
        TaskKind::from_name(&self.kind).ok_or_else(|| RaidError::TaskKind {
            kind: self.kind.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Shell,
    Script,
}

impl TaskKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "shell" => Some(TaskKind::Shell),
            "script" => Some(TaskKind::Script),
            _ => None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Shell => write!(f, "Shell"),
            TaskKind::Script => write!(f, "Script"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

/// Supported profile file encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFormat {
    Yaml,
    Json,
}

impl ProfileFormat {
    /// Pick the format from a file extension (`.yaml`, `.yml`, `.json`).
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Ok(ProfileFormat::Yaml),
            "json" => Ok(ProfileFormat::Json),
            _ => Err(RaidError::Format {
                extension: if extension.is_empty() {
                    String::new()
                } else {
                    format!(".{extension}")
                },
            }),
        }
    }
}

/// Parse every profile contained in `contents`.
///
/// YAML input may hold several documents separated by `---` lines; blank
/// documents are ignored. JSON input is either one profile object or an
/// array of them. Any undecodable document or missing `name` fails the
/// whole extraction.
pub fn extract_profiles(contents: &str, format: ProfileFormat) -> Result<Vec<Profile>> {
    let profiles = match format {
        ProfileFormat::Yaml => extract_yaml(contents)?,
        ProfileFormat::Json => extract_json(contents)?,
    };

    if profiles.is_empty() {
        return Err(RaidError::Parse("no profiles found".to_string()));
    }

    Ok(profiles)
}

/// Read `path` and extract its profiles, choosing the format by extension.
pub fn read_profiles(path: &Path) -> Result<Vec<Profile>> {
    let format = ProfileFormat::from_path(path)?;
    let contents =
        fs::read_to_string(path).map_err(|err| RaidError::io("failed to read profile file", path, err))?;

    extract_profiles(&contents, format).map_err(|err| match err {
        RaidError::Parse(message) => RaidError::Parse(format!("{}: {message}", path.display())),
        other => other,
    })
}

/// Serialize profiles back into the multi-document form `extract_profiles` reads.
pub fn serialize_profiles(profiles: &[Profile], format: ProfileFormat) -> Result<String> {
    match format {
        ProfileFormat::Yaml => {
            let mut documents = Vec::with_capacity(profiles.len());
            for profile in profiles {
                let document = serde_yaml::to_string(profile)
                    .map_err(|err| RaidError::Parse(format!("failed to encode YAML: {err}")))?;
                documents.push(document);
            }
            Ok(documents.join(&format!("{YAML_SEPARATOR}\n")))
        }
        ProfileFormat::Json => serde_json::to_string_pretty(profiles)
            .map_err(|err| RaidError::Parse(format!("failed to encode JSON: {err}"))),
    }
}

fn extract_yaml(contents: &str) -> Result<Vec<Profile>> {
    let mut profiles = Vec::new();

    for (index, document) in split_documents(contents).into_iter().enumerate() {
        if document.trim().is_empty() {
            continue;
        }

        let profile: Profile = serde_yaml::from_str(&document).map_err(|err| {
            RaidError::Parse(format!("invalid YAML document {}: {err}", index + 1))
        })?;
        profiles.push(require_name(profile)?);
    }

    Ok(profiles)
}

fn split_documents(contents: &str) -> Vec<String> {
    let mut documents = vec![String::new()];
    for line in contents.lines() {
        if line.trim_end() == YAML_SEPARATOR {
            documents.push(String::new());
            continue;
        }
        if let Some(current) = documents.last_mut() {
            current.push_str(line);
            current.push('\n');
        }
    }
    documents
}

fn extract_json(contents: &str) -> Result<Vec<Profile>> {
    let value: serde_json::Value = serde_json::from_str(contents)
        .map_err(|err| RaidError::Parse(format!("invalid JSON format: {err}")))?;
    let invalid = |err: serde_json::Error| RaidError::Parse(format!("invalid JSON profile: {err}"));

    match value {
        serde_json::Value::Object(_) => {
            let profile: Profile = serde_json::from_value(value).map_err(invalid)?;
            Ok(vec![require_name(profile)?])
        }
        serde_json::Value::Array(_) => {
            let profiles: Vec<Profile> = serde_json::from_value(value).map_err(invalid)?;
            profiles.into_iter().map(require_name).collect()
        }
        _ => Err(RaidError::Parse(
            "expected a profile object or an array of profiles".to_string(),
        )),
    }
}

fn require_name(profile: Profile) -> Result<Profile> {
    if profile.name.trim().is_empty() {
        return Err(RaidError::Parse(
            "profile is missing required 'name' field".to_string(),
        ));
    }
    Ok(profile)
}

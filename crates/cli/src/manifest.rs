use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MANIFEST_NAME: &str = "scopeargs.json";

/// Declarative description of a command-line application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_keyword: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_on_incorrect_arguments: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_command: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub single_command: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupManifest>,

    #[serde(default)]
    pub commands: Vec<CommandManifest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Commands assigned to this group. Overrides a command's own `group`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionManifest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgumentManifest>,
}

/// How a bound value is rendered in JSON output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionManifest {
    /// Every accepted spelling; the first is canonical.
    pub names: Vec<String>,
    /// `global`, `group` or `command` (default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Values consumed after the name. Defaults to 1, or 0 for booleans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arity: Option<usize>,
    #[serde(default, rename = "type")]
    pub kind: ValueKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentManifest {
    /// Position of a fixed argument. Defaults to its index in the list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub catch_all: bool,
    #[serde(default, rename = "type")]
    pub kind: ValueKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub path: PathBuf,
    pub manifest: Manifest,
}

pub fn load_manifest(manifest_path: Option<&Path>) -> Result<LoadedManifest> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let path = match manifest_path {
        Some(p) => resolve_against(&cwd, p),
        None => cwd.join(DEFAULT_MANIFEST_NAME),
    };

    if !path.exists() {
        bail!(
            "declaration file not found: {} (run `scopeargs init` to create one)",
            path.display()
        );
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read declaration file: {}", path.display()))?;
    let manifest: Manifest = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse declaration JSON: {}", path.display()))?;

    tracing::debug!(path = %path.display(), commands = manifest.commands.len(), "loaded declaration file");
    Ok(LoadedManifest { path, manifest })
}

pub fn write_default_manifest(project_dir: &Path, overwrite: bool) -> Result<PathBuf> {
    let dest = project_dir.join(DEFAULT_MANIFEST_NAME);
    if dest.exists() && !overwrite {
        bail!("{} already exists in {}", DEFAULT_MANIFEST_NAME, project_dir.display());
    }

    let project_name = guess_project_name(project_dir).unwrap_or_else(|| "my-cli".to_string());
    let manifest = sample_manifest(&project_name);

    let bytes = serde_json::to_vec_pretty(&manifest).context("failed to serialize declaration")?;
    let mut out = String::from_utf8(bytes).context("declaration is not valid UTF-8")?;
    out.push('\n');

    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, out.as_bytes())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if overwrite && dest.exists() {
        fs::remove_file(&dest).with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    fs::rename(&tmp, &dest)
        .with_context(|| format!("failed to move {} into place", dest.display()))?;
    Ok(dest)
}

/// A small git-like application exercising every scope.
pub fn sample_manifest(name: &str) -> Manifest {
    let verbose = OptionManifest {
        names: vec!["-v".to_string(), "--verbose".to_string()],
        scope: Some("global".to_string()),
        kind: ValueKind::Boolean,
        description: "Print more output".to_string(),
        ..Default::default()
    };

    Manifest {
        name: name.to_string(),
        description: "Sample multi-command application".to_string(),
        groups: vec![GroupManifest {
            name: "remote".to_string(),
            description: "Manage tracked repositories".to_string(),
            commands: vec!["remote-add".to_string()],
        }],
        commands: vec![
            CommandManifest {
                name: "status".to_string(),
                description: "Show the working tree status".to_string(),
                options: vec![
                    verbose.clone(),
                    OptionManifest {
                        names: vec!["-d".to_string(), "--depth".to_string()],
                        kind: ValueKind::Integer,
                        title: "depth".to_string(),
                        description: "How deep to look".to_string(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            CommandManifest {
                name: "remote-add".to_string(),
                description: "Add a remote".to_string(),
                options: vec![
                    verbose,
                    OptionManifest {
                        names: vec!["-t".to_string(), "--track".to_string()],
                        scope: Some("group".to_string()),
                        title: "branch".to_string(),
                        description: "Branch to track".to_string(),
                        ..Default::default()
                    },
                    OptionManifest {
                        names: vec!["-f".to_string(), "--fetch".to_string()],
                        kind: ValueKind::Boolean,
                        description: "Fetch after adding".to_string(),
                        ..Default::default()
                    },
                    OptionManifest {
                        names: vec!["-m".to_string(), "--mirror".to_string()],
                        allowed_values: vec!["fetch".to_string(), "push".to_string()],
                        description: "Set up as a mirror".to_string(),
                        ..Default::default()
                    },
                ],
                arguments: vec![
                    ArgumentManifest {
                        order: Some(0),
                        required: true,
                        title: "name".to_string(),
                        ..Default::default()
                    },
                    ArgumentManifest {
                        order: Some(1),
                        required: true,
                        title: "url".to_string(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            CommandManifest {
                name: "add".to_string(),
                description: "Add file contents to the index".to_string(),
                arguments: vec![ArgumentManifest {
                    catch_all: true,
                    title: "paths".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn guess_project_name(project_dir: &Path) -> Option<String> {
    // For `.` or other non-meaningful paths, try the current directory name.
    let file_name = project_dir.file_name().and_then(|s| s.to_str());
    let direct = file_name.filter(|s| !s.is_empty() && *s != "." && *s != "..");
    if let Some(name) = direct {
        return Some(name.to_string());
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.file_name()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(|s| s.to_string())
}

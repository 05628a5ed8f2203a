use std::path::{Path, PathBuf};

use crate::error::DflockError;
use crate::utils::debug_log;

pub const DEFAULT_UPSTREAM: &str = "main";
pub const DEFAULT_LOCAL: &str = "main";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_BRANCH_TEMPLATE: &str = "{}";
pub const DEFAULT_EDITOR: &str = "nano";

/// Name of the config file looked up in the repository root and the home directory.
pub const CONFIG_FILE_NAME: &str = ".dflock";

const KEY_UPSTREAM: &str = "dflock.upstream";
const KEY_LOCAL: &str = "dflock.local";
const KEY_REMOTE: &str = "dflock.remote";
const KEY_BRANCH_TEMPLATE: &str = "dflock.branch-template";
const KEY_ANCHOR_COMMIT: &str = "dflock.anchor-commit";
const KEY_EDITOR: &str = "dflock.editor";

/// Which commit of a delta its branch name is derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnchorCommit {
    First,
    Last,
}

impl AnchorCommit {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorCommit::First => "first",
            AnchorCommit::Last => "last",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "first" => Some(AnchorCommit::First),
            "last" => Some(AnchorCommit::Last),
            _ => None,
        }
    }
}

impl Default for AnchorCommit {
    fn default() -> Self {
        AnchorCommit::First
    }
}

/// Immutable settings threaded through every plan operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub local: String,
    pub upstream: String,
    /// Empty when working without a remote
    pub remote: String,
    pub branch_template: String,
    pub anchor_commit: AnchorCommit,
    pub editor: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            local: DEFAULT_LOCAL.to_string(),
            upstream: DEFAULT_UPSTREAM.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            branch_template: DEFAULT_BRANCH_TEMPLATE.to_string(),
            anchor_commit: AnchorCommit::default(),
            editor: DEFAULT_EDITOR.to_string(),
        }
    }
}

/// Raw values read from one config file. Missing keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub upstream: Option<String>,
    pub local: Option<String>,
    pub remote: Option<String>,
    pub branch_template: Option<String>,
    pub anchor_commit: Option<String>,
    pub editor: Option<String>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self, DflockError> {
        let file =
            gix_config::File::from_path_no_includes(path.to_path_buf(), gix_config::Source::Local)
                .map_err(|e| DflockError::GixError(format!("{}: {}", path.display(), e)))?;
        let get = |key: &str| file.string(key).map(|v| v.to_string());

        Ok(FileConfig {
            upstream: get(KEY_UPSTREAM),
            local: get(KEY_LOCAL),
            remote: get(KEY_REMOTE),
            branch_template: get(KEY_BRANCH_TEMPLATE),
            anchor_commit: get(KEY_ANCHOR_COMMIT),
            editor: get(KEY_EDITOR),
        })
    }

    /// Values from `other` win over values in `self`.
    pub fn overlay(self, other: FileConfig) -> FileConfig {
        FileConfig {
            upstream: other.upstream.or(self.upstream),
            local: other.local.or(self.local),
            remote: other.remote.or(self.remote),
            branch_template: other.branch_template.or(self.branch_template),
            anchor_commit: other.anchor_commit.or(self.anchor_commit),
            editor: other.editor.or(self.editor),
        }
    }
}

impl Config {
    /// Load configuration for a repository.
    ///
    /// With an explicit path only that file is read. Otherwise `~/.dflock` is read first and
    /// `<toplevel>/.dflock` is layered on top of it. Files that don't exist are skipped.
    pub fn load(explicit: Option<&Path>, toplevel: Option<&Path>) -> Result<Self, DflockError> {
        let mut merged = FileConfig::default();
        for path in config_paths(explicit, toplevel)? {
            if !path.exists() {
                continue;
            }
            debug_log(&format!("Reading config from {}", path.display()));
            merged = merged.overlay(FileConfig::from_path(&path)?);
        }
        Config::from_file_config(merged)
    }

    /// Fill defaults and validate.
    pub fn from_file_config(file: FileConfig) -> Result<Self, DflockError> {
        let defaults = Config::default();

        let anchor_commit = match file.anchor_commit {
            Some(raw) => AnchorCommit::parse(&raw).ok_or_else(|| {
                DflockError::Config(format!(
                    "anchor-commit must be \"first\" or \"last\", got \"{}\"",
                    raw
                ))
            })?,
            None => defaults.anchor_commit,
        };

        let branch_template = file.branch_template.unwrap_or(defaults.branch_template);
        if !branch_template.contains("{}") {
            return Err(DflockError::Config(format!(
                "branch-template must contain a \"{{}}\" placeholder, got \"{}\"",
                branch_template
            )));
        }

        Ok(Config {
            local: file.local.unwrap_or(defaults.local),
            upstream: file.upstream.unwrap_or(defaults.upstream),
            remote: file.remote.unwrap_or(defaults.remote),
            branch_template,
            anchor_commit,
            editor: file.editor.unwrap_or(defaults.editor),
        })
    }

    /// The ref the local branch is compared against: `<remote>/<upstream>`, or just the
    /// upstream branch when no remote is configured.
    pub fn upstream_name(&self) -> String {
        if self.remote.is_empty() {
            self.upstream.clone()
        } else {
            format!("{}/{}", self.remote, self.upstream)
        }
    }
}

fn config_paths(explicit: Option<&Path>, toplevel: Option<&Path>) -> Result<Vec<PathBuf>, DflockError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(DflockError::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let mut paths = Vec::new();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(CONFIG_FILE_NAME));
    }
    if let Some(root) = toplevel {
        paths.push(root.join(CONFIG_FILE_NAME));
    }
    Ok(paths)
}

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::Command as CargoCommand;
use tempfile::TempDir;

pub const UPSTREAM: &str = "upstream";
pub const LOCAL: &str = "local";
pub const BRANCH_TEMPLATE: &str = "test/{}";

/// A throwaway git repository with an isolated home directory.
pub struct TestRepo {
    dir: TempDir,
    home: TempDir,
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create repo dir");
        let home = tempfile::tempdir().expect("failed to create home dir");
        let repo = TestRepo { dir, home };
        repo.git(&["init", "--quiet"]).expect("git init failed");
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/trunk"])
            .expect("failed to name initial branch");
        repo.git(&["config", "user.email", "you@example.com"])
            .expect("failed to set user.email");
        repo.git(&["config", "user.name", "Your Name"])
            .expect("failed to set user.name");
        repo.git(&["config", "commit.gpgsign", "false"])
            .expect("failed to disable signing");
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    fn git_command(&self) -> Command {
        let mut command = Command::new("git");
        command
            .current_dir(self.path())
            .env("HOME", self.home())
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE");
        command
    }

    pub fn git(&self, args: &[&str]) -> Result<String, String> {
        let output = self
            .git_command()
            .args(args)
            .output()
            .unwrap_or_else(|e| panic!("failed to run git {:?}: {}", args, e));
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if output.status.success() {
            Ok(stdout)
        } else {
            Err(stderr)
        }
    }

    pub fn write_file(&self, name: &str, contents: &str) {
        fs::write(self.path().join(name), contents).expect("failed to write file");
    }

    pub fn read_file(&self, name: &str) -> String {
        fs::read_to_string(self.path().join(name)).expect("failed to read file")
    }

    /// Write `files`, commit them with `message` and return the new sha.
    pub fn commit(&self, files: &[(&str, &str)], message: &str) -> String {
        for (name, contents) in files {
            self.write_file(name, contents);
            self.git(&["add", name]).expect("git add failed");
        }
        self.git(&["commit", "--quiet", "-m", message])
            .expect("git commit failed");
        self.rev_parse("HEAD")
    }

    /// Create `name` at HEAD without leaving the current branch.
    pub fn create_branch(&self, name: &str) {
        self.git(&["checkout", "--quiet", "-b", name])
            .expect("git checkout -b failed");
        self.git(&["checkout", "--quiet", "-"])
            .expect("git checkout - failed");
    }

    pub fn checkout(&self, name: &str) {
        self.git(&["checkout", "--quiet", name])
            .expect("git checkout failed");
    }

    pub fn rev_parse(&self, rev: &str) -> String {
        self.git(&["rev-parse", rev])
            .expect("git rev-parse failed")
            .trim()
            .to_string()
    }

    pub fn branches(&self) -> Vec<String> {
        self.git(&["for-each-ref", "--format=%(refname:short)", "refs/heads/"])
            .expect("git for-each-ref failed")
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Subjects of the commits on `branch` that are not on the upstream, oldest first.
    pub fn subjects(&self, branch: &str) -> Vec<String> {
        let range = format!("{}..{}", UPSTREAM, branch);
        let mut subjects: Vec<String> = self
            .git(&["log", "--format=%s", &range])
            .expect("git log failed")
            .lines()
            .map(str::to_string)
            .collect();
        subjects.reverse();
        subjects
    }

    /// Write the dflock config used by every test into the isolated home directory.
    pub fn write_config(&self) -> PathBuf {
        self.write_config_with("")
    }

    pub fn write_config_with(&self, extra: &str) -> PathBuf {
        let path = self.home().join(".dflock");
        let contents = format!(
            "[dflock]\n\tupstream = {}\n\tlocal = {}\n\tremote =\n\tbranch-template = {}\n{}",
            UPSTREAM, LOCAL, BRANCH_TEMPLATE, extra
        );
        fs::write(&path, contents).expect("failed to write config");
        path
    }

    /// A `dfl` invocation running inside this repository.
    pub fn dfl(&self) -> CargoCommand {
        let mut command = CargoCommand::cargo_bin("dfl").expect("dfl binary not built");
        command
            .current_dir(self.path())
            .env("HOME", self.home())
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env_remove("DFLOCK_DEBUG");
        command
    }
}

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output};

use crate::error::DflockError;
use crate::git::Vcs;
use crate::plan::commit::Commit;
use crate::utils::debug_log;

/// Command used to invoke git.
pub const GIT_CMD: &str = "git";

/// Separates sha and subject in `git log` output.
const LOG_FORMAT: &str = "--format=%H%x09%s";

/// A git working tree driven through the git CLI.
#[derive(Debug, Clone)]
pub struct Repository {
    global_args: Vec<String>,
    workdir: PathBuf,
}

impl Repository {
    fn new(workdir: PathBuf) -> Self {
        let global_args = vec!["-C".to_string(), workdir.to_string_lossy().to_string()];
        Repository {
            global_args,
            workdir,
        }
    }

    // Util for preparing global args for execution
    pub fn global_args_for_exec(&self) -> Vec<String> {
        let mut args = self.global_args.clone();
        if !args.iter().any(|arg| arg == "--no-pager") {
            args.push("--no-pager".to_string());
        }
        args
    }

    /// Execute an arbitrary git command and return stdout as string
    pub fn git(&self, args: &[&str]) -> Result<String, DflockError> {
        let output = self.exec(args)?;
        Ok(String::from_utf8(output.stdout)?)
    }

    /// Execute a git command and return stdout followed by stderr.
    ///
    /// Commands like `push` report progress on stderr only.
    pub fn git_combined(&self, args: &[&str]) -> Result<String, DflockError> {
        let output = self.exec(args)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(format!("{}{}", stdout, stderr))
    }

    fn exec(&self, args: &[&str]) -> Result<Output, DflockError> {
        let mut full_args = self.global_args_for_exec();
        full_args.extend(args.iter().map(|s| s.to_string()));
        exec_git(&full_args)
    }

    /// Run git attached to the terminal, for commands the user drives (`rebase -i`, `log`).
    pub fn run_interactive(&self, args: &[&str]) -> Result<ExitStatus, DflockError> {
        let mut full_args = self.global_args.clone();
        full_args.extend(args.iter().map(|s| s.to_string()));
        debug_log(&format!("git {}", full_args.join(" ")));
        Ok(Command::new(GIT_CMD).args(&full_args).status()?)
    }

    // Get the path of the working directory for this repository.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// True when tracked files have no staged or unstaged modifications.
    pub fn is_work_tree_clean(&self) -> Result<bool, DflockError> {
        let status = self.git(&["status", "--untracked-files=no", "--porcelain"])?;
        Ok(status.trim().is_empty())
    }

    /// `local` has diverged from `upstream` when `upstream` is not one of its ancestors.
    pub fn have_diverged(&self, upstream: &str, local: &str) -> Result<bool, DflockError> {
        match self.exec(&["merge-base", "--is-ancestor", upstream, local]) {
            Ok(_) => Ok(false),
            Err(e) if e.git_exit_code() == Some(1) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Short name of the remote-tracking branch configured for `branch`, if any.
    pub fn remote_tracking_branch(&self, branch: &str) -> Result<Option<String>, DflockError> {
        let refname = format!("refs/heads/{}", branch);
        let output = self.git(&["for-each-ref", "--format=%(upstream:short)", &refname])?;
        let tracking = output.trim();
        if tracking.is_empty() {
            Ok(None)
        } else {
            Ok(Some(tracking.to_string()))
        }
    }

    /// Run `git push` with `args` and return everything git printed.
    pub fn push(&self, args: &[String]) -> Result<String, DflockError> {
        let mut push_args = vec!["push"];
        push_args.extend(args.iter().map(String::as_str));
        self.git_combined(&push_args)
    }

    pub fn rev_parse(&self, rev: &str) -> Result<String, DflockError> {
        Ok(self.git(&["rev-parse", rev])?.trim().to_string())
    }
}

impl Vcs for Repository {
    fn current_branch(&self) -> Result<Option<String>, DflockError> {
        let branch = self.git(&["branch", "--show-current"])?;
        let branch = branch.trim();
        if branch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(branch.to_string()))
        }
    }

    fn head_commit(&self) -> Result<String, DflockError> {
        self.rev_parse("HEAD")
    }

    fn local_branches(&self) -> Result<BTreeSet<String>, DflockError> {
        let output = self.git(&["for-each-ref", "--format=%(refname:short)", "refs/heads/"])?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn object_exists(&self, rev: &str) -> Result<bool, DflockError> {
        match self.exec(&["rev-parse", "--verify", "--quiet", rev]) {
            Ok(_) => Ok(true),
            Err(DflockError::GitCliError {
                code: Some(1) | Some(128),
                ..
            }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn checkout(&self, rev: &str) -> Result<(), DflockError> {
        self.git(&["checkout", "--quiet", rev])?;
        Ok(())
    }

    fn detach_head(&self) -> Result<(), DflockError> {
        self.git(&["checkout", "--quiet", "--detach"])?;
        Ok(())
    }

    fn create_branch(&self, name: &str) -> Result<(), DflockError> {
        self.git(&["checkout", "--quiet", "-b", name])?;
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<(), DflockError> {
        self.git(&["branch", "-D", name])?;
        Ok(())
    }

    fn cherry_pick(&self, shas: &[&str]) -> Result<(), DflockError> {
        let mut args = vec!["cherry-pick"];
        args.extend_from_slice(shas);
        self.git(&args)?;
        Ok(())
    }

    fn abort_cherry_pick(&self) -> Result<(), DflockError> {
        self.git(&["cherry-pick", "--abort"])?;
        Ok(())
    }

    fn log(&self, rev: &str, max_count: Option<usize>) -> Result<Vec<Commit>, DflockError> {
        let max_count_arg = max_count.map(|n| format!("--max-count={}", n));
        let mut args = vec!["log", "--no-merges", LOG_FORMAT];
        if let Some(arg) = max_count_arg.as_deref() {
            args.push(arg);
        }
        args.push(rev);
        args.push("--");
        let output = self.git(&args)?;
        Ok(parse_log_output(&output))
    }
}

/// Parse `%H%x09%s` lines (newest first) into commits, oldest first.
fn parse_log_output(output: &str) -> Vec<Commit> {
    let mut commits: Vec<Commit> = output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.split_once('\t') {
            Some((sha, subject)) => Commit::new(sha.trim(), subject),
            None => Commit::new(line.trim(), ""),
        })
        .collect();
    commits.reverse();
    commits
}

/// Find the repository containing `path`.
pub fn find_repository_in_path(path: &Path) -> Result<Repository, DflockError> {
    let args = vec![
        "-C".to_string(),
        path.to_string_lossy().to_string(),
        "rev-parse".to_string(),
        "--show-toplevel".to_string(),
    ];
    let output = match exec_git(&args) {
        Ok(output) => output,
        Err(DflockError::GitCliError { code: Some(128), .. }) => {
            return Err(DflockError::precondition("No git repository detected."));
        }
        Err(e) => return Err(e),
    };
    let toplevel = String::from_utf8(output.stdout)?.trim().to_string();
    if toplevel.is_empty() {
        // Inside a .git directory or a bare repository: no work tree to operate on
        return Err(DflockError::precondition("No git repository detected."));
    }
    debug_log(&format!("Found repository at {}", toplevel));
    Ok(Repository::new(PathBuf::from(toplevel)))
}

/// Helper to execute a git command
pub fn exec_git(args: &[String]) -> Result<Output, DflockError> {
    debug_log(&format!("git {}", args.join(" ")));
    let output = Command::new(GIT_CMD)
        .args(args)
        .output()
        .map_err(DflockError::IoError)?;

    if !output.status.success() {
        return Err(DflockError::GitCliError {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            args: args.to_vec(),
        });
    }

    Ok(output)
}

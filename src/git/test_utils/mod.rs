//! An in-memory commit graph implementing [`Vcs`], for exercising the plan core without git.
//!
//! History is linear per commit (single parent). Trees are flat maps of file name to contents,
//! which is enough to model cherry-pick conflicts: picking a commit conflicts when a file it
//! changes no longer holds the contents the commit was made against.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use sha2::{Digest, Sha256};

use crate::error::DflockError;
use crate::git::Vcs;
use crate::plan::commit::Commit;

#[derive(Debug, Clone)]
struct StoredCommit {
    message: String,
    parent: Option<String>,
    tree: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Head {
    Branch(String),
    Detached(String),
}

#[derive(Debug)]
struct State {
    commits: HashMap<String, StoredCommit>,
    branches: BTreeMap<String, String>,
    head: Head,
    counter: u64,
    /// HEAD sha before an unfinished cherry-pick
    cherry_pick_origin: Option<String>,
}

#[derive(Debug)]
pub struct MemoryRepo {
    state: RefCell<State>,
}

impl Default for MemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn git_failure(args: &[&str], code: i32, stderr: impl Into<String>) -> DflockError {
    DflockError::GitCliError {
        code: Some(code),
        stdout: String::new(),
        stderr: stderr.into(),
        args: args.iter().map(|s| s.to_string()).collect(),
    }
}

impl State {
    fn resolve(&self, rev: &str) -> Option<String> {
        if rev == "HEAD" {
            return self.head_sha();
        }
        let branch = rev.strip_prefix("refs/heads/").unwrap_or(rev);
        if let Some(sha) = self.branches.get(branch) {
            return Some(sha.clone());
        }
        if rev.len() < 4 {
            return None;
        }
        let mut matches = self.commits.keys().filter(|sha| sha.starts_with(rev));
        match (matches.next(), matches.next()) {
            (Some(sha), None) => Some(sha.clone()),
            _ => None,
        }
    }

    fn head_sha(&self) -> Option<String> {
        match &self.head {
            Head::Branch(name) => self.branches.get(name).cloned(),
            Head::Detached(sha) => Some(sha.clone()),
        }
    }

    fn set_head_sha(&mut self, sha: String) {
        match &self.head {
            Head::Branch(name) => {
                self.branches.insert(name.clone(), sha);
            }
            Head::Detached(_) => self.head = Head::Detached(sha),
        }
    }

    fn head_tree(&self) -> BTreeMap<String, String> {
        self.head_sha()
            .and_then(|sha| self.commits.get(&sha))
            .map(|c| c.tree.clone())
            .unwrap_or_default()
    }

    fn new_commit(
        &mut self,
        message: &str,
        parent: Option<String>,
        tree: BTreeMap<String, String>,
    ) -> String {
        self.counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(self.counter.to_le_bytes());
        hasher.update(message.as_bytes());
        let digest = hasher.finalize();
        let sha: String = digest
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>()
            .chars()
            .take(40)
            .collect();
        self.commits.insert(
            sha.clone(),
            StoredCommit {
                message: message.to_string(),
                parent,
                tree,
            },
        );
        sha
    }

    /// First-parent history from `sha`, newest first.
    fn ancestry(&self, sha: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = Some(sha.to_string());
        while let Some(sha) = current {
            current = self.commits.get(&sha).and_then(|c| c.parent.clone());
            out.push(sha);
        }
        out
    }

    fn pick(&mut self, sha: &str) -> Result<(), String> {
        let picked = self
            .commits
            .get(sha)
            .cloned()
            .ok_or_else(|| format!("fatal: bad revision '{}'", sha))?;
        let base = picked
            .parent
            .as_ref()
            .and_then(|p| self.commits.get(p))
            .map(|c| c.tree.clone())
            .unwrap_or_default();
        let mut tree = self.head_tree();
        for (file, contents) in &picked.tree {
            if base.get(file) == Some(contents) {
                continue;
            }
            let current = tree.get(file);
            if current != Some(contents) && current != base.get(file) {
                return Err(format!(
                    "error: could not apply {}... {}\nCONFLICT (content): Merge conflict in {}",
                    &sha[..7],
                    picked.message,
                    file
                ));
            }
            tree.insert(file.clone(), contents.clone());
        }
        let parent = self.head_sha();
        let new_sha = self.new_commit(&picked.message, parent, tree);
        self.set_head_sha(new_sha);
        Ok(())
    }
}

impl MemoryRepo {
    /// An empty repository with `main` checked out and no commits yet.
    pub fn new() -> Self {
        MemoryRepo {
            state: RefCell::new(State {
                commits: HashMap::new(),
                branches: BTreeMap::new(),
                head: Head::Branch("main".to_string()),
                counter: 0,
                cherry_pick_origin: None,
            }),
        }
    }

    /// Commit `files` on top of HEAD and return the new sha.
    pub fn commit(&self, files: &[(&str, &str)], message: &str) -> String {
        let mut state = self.state.borrow_mut();
        let mut tree = state.head_tree();
        for (file, contents) in files {
            tree.insert(file.to_string(), contents.to_string());
        }
        let parent = state.head_sha();
        let sha = state.new_commit(message, parent, tree);
        state.set_head_sha(sha.clone());
        sha
    }

    /// Create a branch at HEAD without switching to it.
    pub fn create_branch_here(&self, name: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(sha) = state.head_sha() {
            state.branches.insert(name.to_string(), sha);
        }
    }

    /// Contents of `file` at `rev`.
    pub fn file_at(&self, rev: &str, file: &str) -> Option<String> {
        let state = self.state.borrow();
        let sha = state.resolve(rev)?;
        state.commits.get(&sha)?.tree.get(file).cloned()
    }

    pub fn is_cherry_pick_in_progress(&self) -> bool {
        self.state.borrow().cherry_pick_origin.is_some()
    }
}

impl Vcs for MemoryRepo {
    fn current_branch(&self) -> Result<Option<String>, DflockError> {
        match &self.state.borrow().head {
            Head::Branch(name) => Ok(Some(name.clone())),
            Head::Detached(_) => Ok(None),
        }
    }

    fn head_commit(&self) -> Result<String, DflockError> {
        self.state.borrow().head_sha().ok_or_else(|| {
            git_failure(
                &["rev-parse", "HEAD"],
                128,
                "fatal: ambiguous argument 'HEAD'",
            )
        })
    }

    fn local_branches(&self) -> Result<BTreeSet<String>, DflockError> {
        Ok(self.state.borrow().branches.keys().cloned().collect())
    }

    fn object_exists(&self, rev: &str) -> Result<bool, DflockError> {
        Ok(self.state.borrow().resolve(rev).is_some())
    }

    fn checkout(&self, rev: &str) -> Result<(), DflockError> {
        let mut state = self.state.borrow_mut();
        let branch = rev.strip_prefix("refs/heads/").unwrap_or(rev);
        if state.branches.contains_key(branch) {
            state.head = Head::Branch(branch.to_string());
            return Ok(());
        }
        match state.resolve(rev) {
            Some(sha) => {
                state.head = Head::Detached(sha);
                Ok(())
            }
            None => Err(git_failure(
                &["checkout", "--quiet", rev],
                1,
                format!(
                    "error: pathspec '{}' did not match any file(s) known to git",
                    rev
                ),
            )),
        }
    }

    fn detach_head(&self) -> Result<(), DflockError> {
        let mut state = self.state.borrow_mut();
        let sha = state.head_sha().ok_or_else(|| {
            git_failure(
                &["checkout", "--quiet", "--detach"],
                128,
                "fatal: You are on a branch yet to be born",
            )
        })?;
        state.head = Head::Detached(sha);
        Ok(())
    }

    fn create_branch(&self, name: &str) -> Result<(), DflockError> {
        let mut state = self.state.borrow_mut();
        let args = ["checkout", "--quiet", "-b", name];
        if state.branches.contains_key(name) {
            return Err(git_failure(
                &args,
                128,
                format!("fatal: a branch named '{}' already exists", name),
            ));
        }
        let sha = state
            .head_sha()
            .ok_or_else(|| git_failure(&args, 128, "fatal: not a valid object name: 'HEAD'"))?;
        state.branches.insert(name.to_string(), sha);
        state.head = Head::Branch(name.to_string());
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<(), DflockError> {
        let mut state = self.state.borrow_mut();
        let args = ["branch", "-D", name];
        if state.head == Head::Branch(name.to_string()) {
            return Err(git_failure(
                &args,
                1,
                format!("error: cannot delete branch '{}' used by worktree", name),
            ));
        }
        if state.branches.remove(name).is_none() {
            return Err(git_failure(
                &args,
                1,
                format!("error: branch '{}' not found", name),
            ));
        }
        Ok(())
    }

    fn cherry_pick(&self, shas: &[&str]) -> Result<(), DflockError> {
        let mut state = self.state.borrow_mut();
        let mut args = vec!["cherry-pick"];
        args.extend_from_slice(shas);
        if state.cherry_pick_origin.is_some() {
            return Err(git_failure(
                &args,
                128,
                "error: cherry-pick is already in progress",
            ));
        }
        let origin = state
            .head_sha()
            .ok_or_else(|| git_failure(&args, 128, "fatal: empty commit set passed"))?;
        let mut resolved = Vec::with_capacity(shas.len());
        for sha in shas {
            let full = state
                .resolve(sha)
                .ok_or_else(|| git_failure(&args, 128, format!("fatal: bad revision '{}'", sha)))?;
            resolved.push(full);
        }
        for sha in resolved {
            if let Err(stderr) = state.pick(&sha) {
                state.cherry_pick_origin = Some(origin);
                return Err(git_failure(&args, 1, stderr));
            }
        }
        Ok(())
    }

    fn abort_cherry_pick(&self) -> Result<(), DflockError> {
        let mut state = self.state.borrow_mut();
        match state.cherry_pick_origin.take() {
            Some(origin) => {
                state.set_head_sha(origin);
                Ok(())
            }
            None => Err(git_failure(
                &["cherry-pick", "--abort"],
                128,
                "error: no cherry-pick or revert in progress",
            )),
        }
    }

    fn log(&self, rev: &str, max_count: Option<usize>) -> Result<Vec<Commit>, DflockError> {
        let state = self.state.borrow();
        let unknown = |r: &str| {
            git_failure(
                &["log", rev],
                128,
                format!("fatal: ambiguous argument '{}': unknown revision", r),
            )
        };
        let (exclude, include) = match rev.split_once("..") {
            Some((from, to)) => {
                let from = state.resolve(from).ok_or_else(|| unknown(from))?;
                (state.ancestry(&from), to)
            }
            None => (Vec::new(), rev),
        };
        let tip = state.resolve(include).ok_or_else(|| unknown(include))?;
        let mut commits: Vec<Commit> = state
            .ancestry(&tip)
            .into_iter()
            .filter(|sha| !exclude.contains(sha))
            .take(max_count.unwrap_or(usize::MAX))
            .filter_map(|sha| {
                state
                    .commits
                    .get(&sha)
                    .map(|c| Commit::new(sha.clone(), c.message.clone()))
            })
            .collect();
        commits.reverse();
        Ok(commits)
    }
}

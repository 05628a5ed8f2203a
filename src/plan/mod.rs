pub mod build;
pub mod codec;
pub mod commit;
pub mod delta;
pub mod naming;
pub mod reconstruct;
pub mod topo;
pub mod write;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;
use crate::error::DflockError;
use crate::git::{ReturnToHead, Vcs};
use crate::utils::debug_log;

pub use codec::{INSTRUCTIONS, PlanCommand, iterate_plan};
pub use commit::Commit;
pub use delta::{Delta, DeltaId, DeltaTree};
pub use naming::{derive_branch_name, derive_commit_branch_name};

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w-]+$").unwrap());
static INDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^b?([0-9]+)$").unwrap());

/// Plan operations bound to a repository and its configuration.
pub struct Planner<'a, V: Vcs + ?Sized> {
    vcs: &'a V,
    config: &'a Config,
}

impl<'a, V: Vcs + ?Sized> Planner<'a, V> {
    pub fn new(vcs: &'a V, config: &'a Config) -> Self {
        Planner { vcs, config }
    }

    fn branch_name(&self, commit: &Commit) -> String {
        derive_commit_branch_name(commit, &self.config.branch_template)
    }

    /// Commits on local that aren't on upstream, oldest first.
    ///
    /// Fails when either ref is missing or two commits share a message.
    pub fn local_commits(&self) -> Result<Vec<Commit>, DflockError> {
        let upstream = self.config.upstream_name();
        if !self.vcs.object_exists(&upstream)? {
            return Err(DflockError::precondition(format!(
                "Upstream {} does not exist",
                upstream
            )));
        }
        if !self.vcs.object_exists(&self.config.local)? {
            return Err(DflockError::precondition(format!(
                "Local {} does not exist",
                self.config.local
            )));
        }
        let commits = self.vcs.commits_between(&upstream, &self.config.local)?;
        let messages: HashSet<&str> = commits.iter().map(|c| c.message.as_str()).collect();
        if messages.len() != commits.len() {
            return Err(DflockError::precondition(
                "Duplicate commit messages found in local commits.",
            ));
        }
        debug_log(&format!("{} local commits", commits.len()));
        Ok(commits)
    }

    /// The tip of the upstream, which deltas are replayed on.
    pub fn upstream_root(&self) -> Result<Commit, DflockError> {
        let upstream = self.config.upstream_name();
        self.vcs
            .last_n_commits(&upstream, 1)?
            .pop()
            .ok_or_else(|| {
                DflockError::precondition(format!("Upstream {} does not exist", upstream))
            })
    }

    pub fn build_tree(&self, stack: bool) -> Result<DeltaTree, DflockError> {
        build::build_tree(&self.local_commits()?, self.config, stack)
    }

    pub fn reconstruct_tree(&self) -> Result<DeltaTree, DflockError> {
        let commits = self.local_commits()?;
        let branches = self.vcs.local_branches()?;
        let root = self.upstream_root()?;
        reconstruct::reconstruct_tree(self.vcs, &commits, &branches, self.config, &root)
    }

    pub fn parse_plan(&self, plan: &str) -> Result<DeltaTree, DflockError> {
        codec::parse_plan(plan, &self.local_commits()?, self.config)
    }

    pub fn render_plan(&self, tree: &DeltaTree) -> Result<String, DflockError> {
        Ok(codec::render_plan(tree, &self.local_commits()?))
    }

    /// Write every branch of `tree`, returning to the current HEAD afterwards.
    pub fn write_plan(&self, tree: &DeltaTree) -> Result<BTreeMap<String, bool>, DflockError> {
        let _guard = ReturnToHead::new(self.vcs)?;
        write::write_plan(self.vcs, tree)
    }

    /// Names of existing branches that belong to local commits, in commit order.
    pub fn delta_branches(&self) -> Result<Vec<String>, DflockError> {
        let branches = self.vcs.local_branches()?;
        Ok(self
            .local_commits()?
            .iter()
            .map(|c| self.branch_name(c))
            .filter(|name| branches.contains(name))
            .collect())
    }

    /// Existing branches whose name some local commit would produce.
    pub fn hot_branches(&self) -> Result<BTreeSet<String>, DflockError> {
        let names: BTreeSet<String> = self
            .local_commits()?
            .iter()
            .map(|c| self.branch_name(c))
            .collect();
        let branches = self.vcs.local_branches()?;
        Ok(branches.intersection(&names).cloned().collect())
    }

    /// Delete hot branches that aren't part of `tree`.
    pub fn prune_local_branches(&self, tree: &DeltaTree) -> Result<Vec<String>, DflockError> {
        let mut pruned = Vec::new();
        for branch in self.hot_branches()? {
            if tree.contains(&branch) {
                continue;
            }
            println!("pruning {}", branch);
            self.vcs.delete_branch(&branch)?;
            pruned.push(branch);
        }
        Ok(pruned)
    }
}

/// Resolve a user-supplied reference to one of `branches`.
///
/// `3` or `b3` picks by index. Anything else must be a case-insensitive substring of exactly one
/// branch name.
pub fn resolve_delta(reference: &str, branches: &[String]) -> Result<String, DflockError> {
    let reference = reference.trim();
    if !REFERENCE_RE.is_match(reference) {
        return Err(DflockError::Generic(format!("Invalid name: {}", reference)));
    }
    if let Some(index) = INDEX_RE
        .captures(reference)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
    {
        if let Some(branch) = branches.get(index) {
            return Ok(branch.clone());
        }
    }
    let needle = reference.to_lowercase();
    let matching: Vec<&String> = branches
        .iter()
        .filter(|b| b.to_lowercase().contains(&needle))
        .collect();
    match matching.as_slice() {
        [only] => Ok((*only).clone()),
        _ => Err(DflockError::Generic(format!(
            "Could not match {} to a unique branch",
            reference
        ))),
    }
}

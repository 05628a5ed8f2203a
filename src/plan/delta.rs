use std::collections::HashMap;
use std::fmt;

use crate::config::{AnchorCommit, Config};
use crate::error::DflockError;
use crate::plan::commit::Commit;
use crate::plan::naming::derive_commit_branch_name;

/// Index of a delta inside its [`DeltaTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeltaId(usize);

impl DeltaId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A run of local commits replayed onto a target branch as one reviewable branch.
#[derive(Debug, Clone)]
pub struct Delta {
    /// Oldest first, never empty
    pub commits: Vec<Commit>,
    /// `None` targets the upstream
    pub target: Option<DeltaId>,
    pub branch_name: String,
    pub target_branch_name: String,
}

impl PartialEq for Delta {
    fn eq(&self, other: &Self) -> bool {
        self.commits == other.commits
            && self.branch_name == other.branch_name
            && self.target_branch_name == other.target_branch_name
    }
}

impl Eq for Delta {}

impl Delta {
    pub fn full_branch_name(&self) -> String {
        format!("refs/heads/{}", self.branch_name)
    }

    pub fn shas(&self) -> Vec<&str> {
        self.commits.iter().map(|c| c.sha.as_str()).collect()
    }

    pub fn first_commit(&self) -> &Commit {
        &self.commits[0]
    }

    pub fn last_commit(&self) -> &Commit {
        &self.commits[self.commits.len() - 1]
    }

    pub fn contains(&self, commit: &Commit) -> bool {
        self.commits.contains(commit)
    }

    /// Shell commands that replay this delta by hand.
    pub fn create_instructions(&self) -> String {
        format!(
            "git checkout {}\ngit checkout -b temporary-investigation-branch\ngit cherry-pick {}",
            self.target_branch_name,
            self.shas().join(" ")
        )
    }

    /// Arguments for `git push` that force-push this branch to `remote`.
    ///
    /// With `gitlab_merge_request` GitLab push options open a merge request against the target.
    pub fn force_push_args(&self, remote: &str, gitlab_merge_request: bool) -> Vec<String> {
        let full = self.full_branch_name();
        let mut args = vec![
            "--force".to_string(),
            "--set-upstream".to_string(),
            remote.to_string(),
            format!("{}:{}", full, full),
        ];
        if gitlab_merge_request {
            args.push("--push-option".to_string());
            args.push("merge_request.create".to_string());
            if self.target.is_some() {
                args.push("--push-option".to_string());
                args.push(format!("merge_request.target={}", self.target_branch_name));
            }
        }
        args
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Branch {} with commits:", self.branch_name)?;
        for commit in &self.commits {
            write!(f, "\n\t{}", commit.short_message())?;
        }
        Ok(())
    }
}

/// Deltas keyed by branch name, stored in insertion order.
///
/// Targets are ids into the same tree, so a target always precedes the deltas that point at it.
#[derive(Debug, Clone, Default)]
pub struct DeltaTree {
    deltas: Vec<Delta>,
    by_name: HashMap<String, DeltaId>,
}

impl DeltaTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a delta made of `commits`, naming it from its anchor commit.
    pub fn add(
        &mut self,
        commits: Vec<Commit>,
        target: Option<DeltaId>,
        config: &Config,
    ) -> Result<DeltaId, DflockError> {
        let anchor = match config.anchor_commit {
            AnchorCommit::First => commits.first(),
            AnchorCommit::Last => commits.last(),
        }
        .ok_or_else(|| DflockError::plan("a branch needs at least one commit"))?;
        let branch_name = derive_commit_branch_name(anchor, &config.branch_template);
        let target_branch_name = match target {
            Some(id) => self.get(id).branch_name.clone(),
            None => config.upstream_name(),
        };
        Ok(self.insert(Delta {
            commits,
            target,
            branch_name,
            target_branch_name,
        }))
    }

    /// Add a single-commit delta.
    pub fn add_commit(
        &mut self,
        commit: Commit,
        target: Option<DeltaId>,
        config: &Config,
    ) -> Result<DeltaId, DflockError> {
        self.add(vec![commit], target, config)
    }

    /// Insert `delta`, replacing any delta with the same branch name in place.
    pub fn insert(&mut self, delta: Delta) -> DeltaId {
        if let Some(&id) = self.by_name.get(&delta.branch_name) {
            self.deltas[id.0] = delta;
            return id;
        }
        let id = DeltaId(self.deltas.len());
        self.by_name.insert(delta.branch_name.clone(), id);
        self.deltas.push(delta);
        id
    }

    pub fn get(&self, id: DeltaId) -> &Delta {
        &self.deltas[id.0]
    }

    pub fn get_by_name(&self, branch_name: &str) -> Option<&Delta> {
        self.by_name.get(branch_name).map(|id| self.get(*id))
    }

    pub fn id_of(&self, branch_name: &str) -> Option<DeltaId> {
        self.by_name.get(branch_name).copied()
    }

    pub fn contains(&self, branch_name: &str) -> bool {
        self.by_name.contains_key(branch_name)
    }

    pub fn target_of(&self, delta: &Delta) -> Option<&Delta> {
        delta.target.map(|id| self.get(id))
    }

    /// The id at arena position `index`, if there is one.
    pub fn id_at(&self, index: usize) -> Option<DeltaId> {
        (index < self.deltas.len()).then_some(DeltaId(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeltaId, &Delta)> {
        self.deltas.iter().enumerate().map(|(i, d)| (DeltaId(i), d))
    }

    pub fn deltas(&self) -> impl Iterator<Item = &Delta> {
        self.deltas.iter()
    }

    pub fn branch_names(&self) -> Vec<&str> {
        self.deltas.iter().map(|d| d.branch_name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

impl PartialEq for DeltaTree {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .deltas()
                .all(|d| other.get_by_name(&d.branch_name) == Some(d))
    }
}

impl Eq for DeltaTree {}

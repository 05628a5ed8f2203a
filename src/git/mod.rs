pub mod refs;
pub mod repository;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

use std::collections::BTreeSet;

use crate::error::DflockError;
use crate::plan::commit::Commit;

pub use refs::{ReturnToHead, TemporaryBranch};
pub use repository::{Repository, find_repository_in_path};

/// The version-control operations the plan core relies on.
///
/// `Repository` implements this by shelling out to git; `test_utils::MemoryRepo` implements it
/// over an in-memory commit graph.
pub trait Vcs {
    /// Name of the checked out branch, `None` on a detached HEAD.
    fn current_branch(&self) -> Result<Option<String>, DflockError>;

    /// Full sha of the commit HEAD points at.
    fn head_commit(&self) -> Result<String, DflockError>;

    fn local_branches(&self) -> Result<BTreeSet<String>, DflockError>;

    fn object_exists(&self, rev: &str) -> Result<bool, DflockError>;

    fn checkout(&self, rev: &str) -> Result<(), DflockError>;

    fn detach_head(&self) -> Result<(), DflockError>;

    /// Create a branch at HEAD and check it out.
    fn create_branch(&self, name: &str) -> Result<(), DflockError>;

    /// Force-delete a branch.
    fn delete_branch(&self, name: &str) -> Result<(), DflockError>;

    /// Replay `shas` in order on top of HEAD. A conflict leaves the cherry-pick in progress
    /// and returns the git failure.
    fn cherry_pick(&self, shas: &[&str]) -> Result<(), DflockError>;

    fn abort_cherry_pick(&self) -> Result<(), DflockError>;

    /// Non-merge commits reachable from `rev` (a revision or an `a..b` range), oldest first.
    /// `max_count` keeps only the newest commits.
    fn log(&self, rev: &str, max_count: Option<usize>) -> Result<Vec<Commit>, DflockError>;

    /// Commits reachable from `to` but not from `from`, oldest first.
    fn commits_between(&self, from: &str, to: &str) -> Result<Vec<Commit>, DflockError> {
        self.log(&format!("{}..{}", from, to), None)
    }

    /// At most `n` commits leading up to and including `rev`, oldest first.
    fn last_n_commits(&self, rev: &str, n: usize) -> Result<Vec<Commit>, DflockError> {
        self.log(rev, Some(n))
    }
}

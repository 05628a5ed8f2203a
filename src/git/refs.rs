use uuid::Uuid;

use crate::error::DflockError;
use crate::git::Vcs;
use crate::utils::{debug_log, warn};

/// Prefix of the scratch branches cherry-picks are replayed on.
pub const TEMPORARY_BRANCH_PREFIX: &str = "dflock-tmp-";

/// Where HEAD pointed when a guard was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OriginalHead {
    Branch(String),
    Detached(String),
}

/// Restores the original branch (or detached commit) when dropped.
pub struct ReturnToHead<'a, V: Vcs + ?Sized> {
    vcs: &'a V,
    original: OriginalHead,
}

impl<'a, V: Vcs + ?Sized> ReturnToHead<'a, V> {
    pub fn new(vcs: &'a V) -> Result<Self, DflockError> {
        let original = match vcs.current_branch()? {
            Some(branch) => OriginalHead::Branch(branch),
            None => OriginalHead::Detached(vcs.head_commit()?),
        };
        debug_log(&format!("Will return to {:?}", original));
        Ok(ReturnToHead { vcs, original })
    }
}

impl<V: Vcs + ?Sized> Drop for ReturnToHead<'_, V> {
    fn drop(&mut self) {
        let rev = match &self.original {
            OriginalHead::Branch(branch) => branch,
            OriginalHead::Detached(sha) => sha,
        };
        if let Err(e) = self.vcs.checkout(rev) {
            warn(&format!("failed to return to {}: {}", rev, e));
        }
    }
}

/// A uniquely named scratch branch, created at HEAD and checked out.
///
/// On drop HEAD is detached if the branch is still checked out, then the branch is deleted.
pub struct TemporaryBranch<'a, V: Vcs + ?Sized> {
    vcs: &'a V,
    name: String,
}

impl<'a, V: Vcs + ?Sized> TemporaryBranch<'a, V> {
    pub fn new(vcs: &'a V) -> Result<Self, DflockError> {
        let name = format!("{}{}", TEMPORARY_BRANCH_PREFIX, Uuid::new_v4().simple());
        vcs.create_branch(&name)?;
        debug_log(&format!("Created temporary branch {}", name));
        Ok(TemporaryBranch { vcs, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn cleanup(&self) -> Result<(), DflockError> {
        if self.vcs.current_branch()?.as_deref() == Some(self.name.as_str()) {
            self.vcs.detach_head()?;
        }
        self.vcs.delete_branch(&self.name)
    }
}

impl<V: Vcs + ?Sized> Drop for TemporaryBranch<'_, V> {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn(&format!(
                "failed to delete temporary branch {}: {}",
                self.name, e
            ));
        }
    }
}

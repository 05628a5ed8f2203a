use std::collections::BTreeMap;

use crate::error::DflockError;
use crate::git::{TemporaryBranch, Vcs};
use crate::plan::delta::{Delta, DeltaTree};
use crate::plan::topo::topo_sort;
use crate::utils::{debug_log, warn};

/// Create or recreate a branch for every delta in `tree`.
///
/// Targets are written before the deltas on top of them. Each delta is replayed on a temporary
/// branch off its target and only then moved to its real name, so a failed cherry-pick never
/// leaves a half-written branch behind. HEAD is left wherever the last checkout put it; callers
/// hold a `ReturnToHead` guard.
///
/// Returns, per branch name, whether an existing branch was replaced.
pub fn write_plan<V: Vcs + ?Sized>(
    vcs: &V,
    tree: &DeltaTree,
) -> Result<BTreeMap<String, bool>, DflockError> {
    let mut updated = BTreeMap::new();
    for id in topo_sort(tree)? {
        let delta = tree.get(id);
        debug_log(&format!("Writing {}", delta));
        vcs.checkout(&delta.target_branch_name)?;

        let _scratch = TemporaryBranch::new(vcs)?;
        cherry_pick(vcs, delta)?;

        let recreated = vcs.object_exists(&delta.full_branch_name())?;
        if recreated {
            vcs.delete_branch(&delta.branch_name)?;
        }
        vcs.create_branch(&delta.branch_name)?;
        updated.insert(delta.branch_name.clone(), recreated);
    }
    Ok(updated)
}

fn cherry_pick<V: Vcs + ?Sized>(vcs: &V, delta: &Delta) -> Result<(), DflockError> {
    let shas = delta.shas();
    if let Err(e) = vcs.cherry_pick(&shas) {
        debug_log(&format!("Cherry-pick for {} failed: {}", delta.branch_name, e));
        if vcs.abort_cherry_pick().is_err() {
            warn("Failed to abort cherry-pick.");
        }
        return Err(DflockError::CherryPickFailed {
            branch: delta.branch_name.clone(),
            hints: vec![format!(
                "To reproduce the failed cherry-pick, run the following commands:\n\n{}",
                delta.create_instructions()
            )],
        });
    }
    Ok(())
}

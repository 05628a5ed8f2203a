use crate::config::Config;
use crate::error::DflockError;
use crate::plan::commit::Commit;
use crate::plan::delta::DeltaTree;

/// Put every local commit in its own delta.
///
/// With `stack` each delta targets the previous commit's delta, forming a single chain on top of
/// the upstream. Otherwise every delta targets the upstream directly.
pub fn build_tree(
    local_commits: &[Commit],
    config: &Config,
    stack: bool,
) -> Result<DeltaTree, DflockError> {
    let mut tree = DeltaTree::new();
    let mut target = None;
    for commit in local_commits {
        let id = tree.add_commit(commit.clone(), target, config)?;
        if stack {
            target = Some(id);
        }
    }
    Ok(tree)
}

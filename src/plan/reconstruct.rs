//! Recover the last applied plan from branch names alone.
//!
//! Every managed branch is named after one commit of its delta (the anchor), and names only
//! depend on commit messages. So a local commit whose derived name exists as a branch marks a
//! delta, and the rest of the delta is found by walking that branch and matching commit messages
//! against local history.

use std::collections::{BTreeSet, HashMap};

use crate::config::{AnchorCommit, Config};
use crate::error::DflockError;
use crate::git::Vcs;
use crate::plan::commit::Commit;
use crate::plan::delta::{DeltaId, DeltaTree};
use crate::plan::naming::derive_commit_branch_name;
use crate::utils::{debug_log, warn};

/// Shared state of one reconstruction pass.
struct Reconstruction<'a, V: Vcs + ?Sized> {
    vcs: &'a V,
    local_commits: &'a [Commit],
    by_message: HashMap<&'a str, &'a Commit>,
    config: &'a Config,
    upstream_root: &'a Commit,
    tree: DeltaTree,
}

/// Infer the current delta tree from local history and existing branches.
///
/// `upstream_root` is the commit the deltas were replayed on, the tip of the upstream branch.
pub fn reconstruct_tree<V: Vcs + ?Sized>(
    vcs: &V,
    local_commits: &[Commit],
    local_branches: &BTreeSet<String>,
    config: &Config,
    upstream_root: &Commit,
) -> Result<DeltaTree, DflockError> {
    if let Some(clash) = local_commits
        .iter()
        .find(|c| c.message == upstream_root.message)
    {
        return Err(DflockError::plan(format!(
            "ambiguous commit message: local commit {} has the same message as upstream commit {}",
            clash.short_str(),
            upstream_root.short_sha()
        ))
        .with_hint(format!(
            "reword the local commit with `git rebase --interactive {} {}`",
            config.upstream_name(),
            config.local
        )));
    }

    let mut state = Reconstruction {
        vcs,
        local_commits,
        by_message: local_commits
            .iter()
            .map(|c| (c.message.as_str(), c))
            .collect(),
        config,
        upstream_root,
        tree: DeltaTree::new(),
    };

    // Oldest first so targets are built before the deltas that point at them
    for (i, commit) in local_commits.iter().enumerate() {
        let branch_name = derive_commit_branch_name(commit, &config.branch_template);
        if !local_branches.contains(&branch_name) {
            continue;
        }
        debug_log(&format!("Reconstructing {} from {}", branch_name, commit.short_str()));
        let (commits, target) = match config.anchor_commit {
            AnchorCommit::Last => state.infer_from_last(&branch_name, i)?,
            AnchorCommit::First => state.infer_from_first(&branch_name, i)?,
        };
        state.tree.add(commits, target, config)?;
    }

    Ok(state.tree)
}

impl<V: Vcs + ?Sized> Reconstruction<'_, V> {
    fn derive(&self, commit: &Commit) -> String {
        derive_commit_branch_name(commit, &self.config.branch_template)
    }

    fn local_commit(&self, message: &str) -> Option<Commit> {
        self.by_message.get(message).map(|c| (*c).clone())
    }

    /// The branch is named after its newest commit. Walk back from the tip until reaching
    /// another delta (the target) or a commit that isn't local.
    fn infer_from_last(
        &self,
        branch_name: &str,
        index: usize,
    ) -> Result<(Vec<Commit>, Option<DeltaId>), DflockError> {
        let candidates = self.vcs.last_n_commits(branch_name, index + 1)?;
        match candidates.last() {
            Some(tip) if self.derive(tip) == branch_name => {}
            _ => {
                return Err(corrupted_branch(
                    branch_name,
                    "does not match the branch name expected based on its last commit",
                ));
            }
        }

        let mut commits = Vec::new();
        let mut target = None;
        for candidate in candidates.iter().rev() {
            let candidate_name = self.derive(candidate);
            if candidate_name != branch_name && self.tree.contains(&candidate_name) {
                target = self.tree.id_of(&candidate_name);
                break;
            }
            match self.local_commit(&candidate.message) {
                Some(local) => commits.insert(0, local),
                None => {
                    if candidate.message != self.upstream_root.message {
                        warn(&format!(
                            "unknown commit message encountered: {}",
                            candidate.short_message()
                        ));
                    }
                    break;
                }
            }
        }
        Ok((commits, target))
    }

    /// The branch is named after its oldest commit. The commit right before it is either the
    /// upstream root or the last commit of the target delta.
    fn infer_from_first(
        &self,
        branch_name: &str,
        index: usize,
    ) -> Result<(Vec<Commit>, Option<DeltaId>), DflockError> {
        let window = self.local_commits.len() - index + 1;
        let candidates = self.vcs.last_n_commits(branch_name, window)?;
        let start = candidates
            .iter()
            .position(|c| self.derive(c) == branch_name)
            .ok_or_else(|| {
                corrupted_branch(branch_name, "does not contain the commit it is named after")
            })?;

        let mut target = None;
        if start > 0 {
            let preceding = &candidates[start - 1];
            if preceding.sha != self.upstream_root.sha {
                target = self
                    .tree
                    .iter()
                    .find(|(_, delta)| delta.last_commit().message == preceding.message)
                    .map(|(id, _)| id);
            }
        }

        let mut commits = Vec::new();
        for candidate in &candidates[start..] {
            match self.local_commit(&candidate.message) {
                Some(local) => commits.push(local),
                None => {
                    warn(&format!(
                        "unknown commit message encountered: {}",
                        candidate.short_message()
                    ));
                    break;
                }
            }
        }
        Ok((commits, target))
    }
}

fn corrupted_branch(branch_name: &str, problem: &str) -> DflockError {
    DflockError::precondition(format!(
        "Invalid state: dflock-managed branch {} {}.",
        branch_name, problem
    ))
    .with_hint(format!(
        "Run `git branch -D {}` to remove the offending branch.",
        branch_name
    ))
    .with_hint("Or run `dfl reset` if you'd like to start with a clean slate.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::ReturnToHead;
    use crate::git::test_utils::MemoryRepo;
    use crate::plan::build::build_tree;
    use crate::plan::codec::{parse_plan, render_plan};
    use crate::plan::naming::derive_branch_name;
    use crate::plan::write::write_plan;
    use rstest::rstest;

    fn config(anchor_commit: AnchorCommit) -> Config {
        Config {
            upstream: "upstream".to_string(),
            local: "local".to_string(),
            remote: String::new(),
            branch_template: "test/{}".to_string(),
            anchor_commit,
            ..Config::default()
        }
    }

    /// Upstream holds one commit "0", local adds `changes` on top of it.
    fn repo_with(changes: &[(&str, &str, &str)]) -> (MemoryRepo, Vec<Commit>) {
        let repo = MemoryRepo::new();
        repo.commit(&[("a", "a")], "0");
        repo.create_branch_here("upstream");
        for (file, contents, message) in changes {
            repo.commit(&[(*file, *contents)], message);
        }
        repo.create_branch_here("local");
        let commits = repo.commits_between("upstream", "local").unwrap();
        (repo, commits)
    }

    fn independent_commits() -> (MemoryRepo, Vec<Commit>) {
        repo_with(&[("a", "b", "1"), ("b", "b", "2"), ("c", "c", "3"), ("d", "d", "4")])
    }

    fn serial_commits() -> (MemoryRepo, Vec<Commit>) {
        repo_with(&[("a", "b", "1"), ("a", "c", "2"), ("a", "d", "3"), ("a", "e", "4")])
    }

    fn dag_commits() -> (MemoryRepo, Vec<Commit>) {
        repo_with(&[("a", "b", "1"), ("a", "c", "2"), ("b", "a", "3"), ("a", "d", "4")])
    }

    fn upstream_root(repo: &MemoryRepo) -> Commit {
        repo.last_n_commits("upstream", 1).unwrap().remove(0)
    }

    fn reconstruct(repo: &MemoryRepo, commits: &[Commit], config: &Config) -> Result<DeltaTree, DflockError> {
        let branches = repo.local_branches().unwrap();
        reconstruct_tree(repo, commits, &branches, config, &upstream_root(repo))
    }

    fn write(repo: &MemoryRepo, tree: &DeltaTree) {
        let _guard = ReturnToHead::new(repo).unwrap();
        write_plan(repo, tree).unwrap();
    }

    fn plan_for(commits: &[Commit], tokens: &[&str]) -> String {
        commits
            .iter()
            .zip(tokens)
            .map(|(c, t)| format!("{} {}", t, c.short_str()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[rstest]
    #[case(AnchorCommit::First)]
    #[case(AnchorCommit::Last)]
    fn test_dag_is_stable(#[case] anchor: AnchorCommit) {
        let config = config(anchor);
        let (repo, commits) = dag_commits();
        let plan = plan_for(&commits, &["b0", "b0", "b1", "b2@b0"]);
        let tree = parse_plan(&plan, &commits, &config).unwrap();
        write(&repo, &tree);

        let reconstructed = reconstruct(&repo, &commits, &config).unwrap();
        assert_eq!(reconstructed, tree);
        assert_eq!(render_plan(&reconstructed, &commits), plan);

        let mut expected = DeltaTree::new();
        let b0 = expected
            .add(vec![commits[0].clone(), commits[1].clone()], None, &config)
            .unwrap();
        expected.add_commit(commits[2].clone(), None, &config).unwrap();
        expected.add_commit(commits[3].clone(), Some(b0), &config).unwrap();
        assert_eq!(reconstructed, expected);

        let anchor_message = match anchor {
            AnchorCommit::First => &commits[0].message,
            AnchorCommit::Last => &commits[1].message,
        };
        assert!(reconstructed.contains(&derive_branch_name(anchor_message, "test/{}")));
    }

    #[rstest]
    #[case(AnchorCommit::First)]
    #[case(AnchorCommit::Last)]
    fn test_stack_is_stable(#[case] anchor: AnchorCommit) {
        let config = config(anchor);
        let (repo, commits) = serial_commits();
        let tree = build_tree(&commits, &config, true).unwrap();
        write(&repo, &tree);

        let reconstructed = reconstruct(&repo, &commits, &config).unwrap();
        assert_eq!(reconstructed, tree);
        assert_eq!(
            render_plan(&reconstructed, &commits),
            plan_for(&commits, &["b0", "b1@b0", "b2@b1", "b3@b2"])
        );
    }

    #[rstest]
    #[case(AnchorCommit::First)]
    #[case(AnchorCommit::Last)]
    fn test_independent_is_stable(#[case] anchor: AnchorCommit) {
        let config = config(anchor);
        let (repo, commits) = independent_commits();
        let tree = build_tree(&commits, &config, false).unwrap();
        write(&repo, &tree);

        let reconstructed = reconstruct(&repo, &commits, &config).unwrap();
        assert_eq!(reconstructed, tree);
        assert_eq!(
            render_plan(&reconstructed, &commits),
            plan_for(&commits, &["b0", "b1", "b2", "b3"])
        );
    }

    #[rstest]
    #[case(AnchorCommit::First)]
    #[case(AnchorCommit::Last)]
    fn test_partial_skip_is_stable(#[case] anchor: AnchorCommit) {
        let config = config(anchor);
        let (repo, commits) = independent_commits();
        let plan = plan_for(&commits, &["b0", "s", "b0", "b1@b0"]);
        let tree = parse_plan(&plan, &commits, &config).unwrap();
        write(&repo, &tree);

        let reconstructed = reconstruct(&repo, &commits, &config).unwrap();
        assert_eq!(reconstructed, tree);
        assert_eq!(render_plan(&reconstructed, &commits), plan);
    }

    #[test]
    fn test_no_branches_yields_empty_tree() {
        let (repo, commits) = dag_commits();
        let tree = reconstruct(&repo, &commits, &config(AnchorCommit::First)).unwrap();
        assert!(tree.is_empty());
    }

    #[rstest]
    #[case(AnchorCommit::First)]
    #[case(AnchorCommit::Last)]
    fn test_branch_at_wrong_commit_is_fatal(#[case] anchor: AnchorCommit) {
        let config = config(anchor);
        let (repo, commits) = independent_commits();
        // a branch named after the first local commit that points at the upstream
        repo.checkout("upstream").unwrap();
        repo.create_branch_here(&derive_branch_name(&commits[0].message, "test/{}"));
        repo.checkout("local").unwrap();

        match reconstruct(&repo, &commits, &config) {
            Err(err @ DflockError::Precondition { .. }) => {
                assert!(err.to_string().starts_with("Invalid state"));
                assert!(err.hints().iter().any(|h| h.contains("dfl reset")));
            }
            other => panic!("expected precondition error, got {:?}", other),
        }
    }

    #[rstest]
    #[case(AnchorCommit::First)]
    #[case(AnchorCommit::Last)]
    fn test_unknown_commit_truncates_delta(#[case] anchor: AnchorCommit) {
        let config = config(anchor);
        let (repo, commits) = independent_commits();
        let name = derive_branch_name(&commits[1].message, "test/{}");

        // the branch carries a commit that is no longer in local history
        repo.checkout("upstream").unwrap();
        repo.create_branch(&name).unwrap();
        repo.commit(&[("z", "z")], "reworded");
        repo.cherry_pick(&[commits[1].sha.as_str()]).unwrap();
        repo.checkout("local").unwrap();

        let tree = reconstruct(&repo, &commits, &config).unwrap();
        let delta = tree.get_by_name(&name).unwrap();
        assert_eq!(delta.commits, vec![commits[1].clone()]);
        assert_eq!(delta.target, None);
    }

    #[test]
    fn test_local_message_matching_upstream_root_is_rejected() {
        let (repo, commits) = repo_with(&[("a", "b", "0"), ("b", "b", "1")]);
        let err = reconstruct(&repo, &commits, &config(AnchorCommit::First)).unwrap_err();
        assert!(matches!(err, DflockError::Plan { .. }));
        assert!(err.to_string().starts_with("ambiguous commit message"));
    }
}

//! The plan text format.
//!
//! A plan has one line per local commit, oldest first:
//!
//! ```text
//! b0 1a2b3c4d Add parser
//! b0 5e6f7a8b Parse numbers
//! s 9c0d1e2f Unrelated cleanup
//! b1@b0 3a4b5c6d Use the parser
//! ```
//!
//! `s` skips a commit, `b<label>` puts it in the branch with that label and `b<label>@b<target>`
//! additionally makes the branch target another labelled branch. Labels are digit strings and may
//! be empty. Blank lines and lines starting with `#` are ignored.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;
use crate::error::DflockError;
use crate::plan::commit::Commit;
use crate::plan::delta::{DeltaId, DeltaTree};

static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^b([0-9]*)(@b?([0-9]*))?$").unwrap());

/// Appended below the plan when it is opened in the editor.
pub const INSTRUCTIONS: &str = "

# Edit branch-creation plan.
#
# Commands:
# b<label> <commit> = use commit in labeled branch
# b<label>@b<target-label> <commit> = use commit in labeled branch off branch
#                                     with target-label
# s <commit> = do not use commit
#
# If you delete a line, the commit will not be used (equivalent to \"s\")
# If you remove everything, nothing will be changed
#
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanCommand {
    Skip,
    Include {
        label: String,
        target_label: Option<String>,
    },
}

/// One meaningful line of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLine {
    pub command: PlanCommand,
    pub sha: String,
}

/// Consecutive plan lines sharing a label.
#[derive(Debug)]
struct CommitList {
    label: String,
    target_label: Option<String>,
    commits: Vec<Commit>,
}

/// Lines of `plan` that are neither blank nor comments.
pub fn iterate_plan(plan: &str) -> impl Iterator<Item = &str> {
    plan.lines()
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
}

pub fn parse_command(token: &str) -> Result<PlanCommand, DflockError> {
    if token == "s" {
        return Ok(PlanCommand::Skip);
    }
    let captures = INCLUDE_RE
        .captures(token)
        .ok_or_else(|| DflockError::Parsing(format!("unrecognized command: {}", token)))?;
    let label = captures
        .get(1)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let target_label = captures.get(3).map(|m| m.as_str().to_string());
    Ok(PlanCommand::Include {
        label,
        target_label,
    })
}

pub fn tokenize_plan(plan: &str) -> Result<Vec<PlanLine>, DflockError> {
    iterate_plan(plan)
        .map(|line| {
            let mut words = line.split_whitespace();
            match (words.next(), words.next()) {
                (Some(command), Some(sha)) => Ok(PlanLine {
                    command: parse_command(command)?,
                    sha: sha.to_string(),
                }),
                _ => Err(DflockError::Parsing(
                    "each line should contain at least a command and a commit SHA".to_string(),
                )),
            }
        })
        .collect()
}

/// Parse a (possibly hand-edited) plan into a delta tree.
pub fn parse_plan(
    plan: &str,
    local_commits: &[Commit],
    config: &Config,
) -> Result<DeltaTree, DflockError> {
    let lines = tokenize_plan(plan)?;
    let commit_lists = make_commit_lists(&lines, local_commits)?;
    build_dag(commit_lists, config)
}

fn make_commit_lists(
    lines: &[PlanLine],
    local_commits: &[Commit],
) -> Result<Vec<CommitList>, DflockError> {
    let mut lists: Vec<CommitList> = Vec::new();
    let mut cursor = local_commits.iter();

    for line in lines {
        let PlanCommand::Include {
            label,
            target_label,
        } = &line.command
        else {
            continue;
        };

        let commit = cursor
            .by_ref()
            .find(|c| c.sha.starts_with(&line.sha))
            .ok_or_else(|| DflockError::plan("cannot match commits in plan to local commits"))?;

        let extends_last = lists.last().is_some_and(|list| &list.label == label);
        if !extends_last {
            lists.push(CommitList {
                label: label.clone(),
                target_label: None,
                commits: Vec::new(),
            });
        }
        let Some(list) = lists.last_mut() else {
            continue;
        };
        list.commits.push(commit.clone());

        if let Some(target) = target_label {
            match &list.target_label {
                None => list.target_label = Some(target.clone()),
                Some(existing) if existing != target => {
                    return Err(DflockError::plan(format!(
                        "multiple targets specified for b{}",
                        list.label
                    )));
                }
                Some(_) => {}
            }
        }
    }

    Ok(lists)
}

fn display_label(label: &Option<String>) -> String {
    match label {
        Some(label) => format!("b{}", label),
        None => "upstream".to_string(),
    }
}

/// Turn commit lists into deltas, enforcing the shape a single linear history can express.
///
/// A list may target the upstream, the target of the previous list, or any list in the run of
/// lists that share that target. A list's own label becomes a valid target for the lists after it
/// until a list with a different target closes the run.
fn build_dag(commit_lists: Vec<CommitList>, config: &Config) -> Result<DeltaTree, DflockError> {
    let rebase_hint = format!(
        "re-order commits with `git rebase --interactive {} {}`",
        config.upstream_name(),
        config.local
    );

    let mut tree = DeltaTree::new();
    let mut built: HashMap<String, DeltaId> = HashMap::new();
    let mut last_target_label: Option<String> = None;
    let mut valid_target_labels: HashSet<Option<String>> = HashSet::from([None]);

    for list in commit_lists {
        if !valid_target_labels.contains(&list.target_label) {
            return Err(DflockError::plan(format!(
                "invalid target for \"b{}\": \"{}\"",
                list.label,
                display_label(&list.target_label)
            ))
            .with_hint(rebase_hint));
        }
        if built.contains_key(&list.label) {
            return Err(DflockError::plan(format!(
                "non-contiguous commits for branch b{}",
                list.label
            ))
            .with_hint(rebase_hint));
        }

        let target = match &list.target_label {
            Some(label) => Some(*built.get(label).ok_or_else(|| {
                DflockError::plan(format!("invalid target for \"b{}\": \"b{}\"", list.label, label))
            })?),
            None => None,
        };

        if list.target_label != last_target_label {
            last_target_label = list.target_label.clone();
            valid_target_labels = HashSet::from([last_target_label.clone()]);
        }
        valid_target_labels.insert(Some(list.label.clone()));

        let id = tree.add(list.commits, target, config)?;
        built.insert(list.label, id);
    }

    Ok(tree)
}

/// Render `tree` as a plan over `local_commits`.
///
/// Deltas are numbered by the position of their first commit in local history.
pub fn render_plan(tree: &DeltaTree, local_commits: &[Commit]) -> String {
    let position = |commit: &Commit| {
        local_commits
            .iter()
            .position(|c| c == commit)
            .unwrap_or(usize::MAX)
    };
    let mut sorted: Vec<DeltaId> = tree.iter().map(|(id, _)| id).collect();
    sorted.sort_by_key(|id| position(tree.get(*id).first_commit()));
    let index_of = |id: DeltaId| sorted.iter().position(|s| *s == id);

    local_commits
        .iter()
        .map(|commit| {
            let owner = sorted
                .iter()
                .enumerate()
                .find(|(_, id)| tree.get(**id).contains(commit));
            let command = match owner {
                Some((index, id)) => {
                    let delta = tree.get(*id);
                    match delta.target.and_then(index_of) {
                        Some(target_index) => format!("b{}@b{}", index, target_index),
                        None => format!("b{}", index),
                    }
                }
                None => "s".to_string(),
            };
            format!("{} {}", command, commit.short_str())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnchorCommit;
    use crate::plan::build::build_tree;

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

    fn local_commits() -> Vec<Commit> {
        ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, m)| Commit::new(i.to_string(), *m))
            .collect()
    }

    fn parse(plan: &str) -> Result<DeltaTree, DflockError> {
        parse_plan(plan, &local_commits(), &config(AnchorCommit::First))
    }

    fn assert_plan_error(plan: &str, expected: &str) {
        match parse(plan) {
            Err(DflockError::Plan { message, .. }) => assert!(
                message.contains(expected),
                "expected {:?} in {:?}",
                expected,
                message
            ),
            other => panic!("expected plan error for {:?}, got {:?}", plan, other),
        }
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("s").unwrap(), PlanCommand::Skip);
        assert_eq!(
            parse_command("b").unwrap(),
            PlanCommand::Include {
                label: String::new(),
                target_label: None
            }
        );
        assert_eq!(
            parse_command("b1@").unwrap(),
            PlanCommand::Include {
                label: "1".to_string(),
                target_label: Some(String::new())
            }
        );
        assert_eq!(
            parse_command("b2@1").unwrap(),
            PlanCommand::Include {
                label: "2".to_string(),
                target_label: Some("1".to_string())
            }
        );
        assert_eq!(
            parse_command("b12@b3").unwrap(),
            PlanCommand::Include {
                label: "12".to_string(),
                target_label: Some("3".to_string())
            }
        );
    }

    #[test]
    fn test_syntax_errors() {
        for plan in ["s 0 a\na 1 b\ns 2 v", "b@s 0 a", "s 0 a\nb\ns 2 v", "u 0 a", "bx 0 a"] {
            assert!(
                matches!(parse(plan), Err(DflockError::Parsing(_))),
                "{:?} should not parse",
                plan
            );
        }
        let err = parse("s 0 a\nb\ns 2 v").unwrap_err();
        assert_eq!(
            err.to_string(),
            "each line should contain at least a command and a commit SHA"
        );
        assert_eq!(parse("x 0").unwrap_err().to_string(), "unrecognized command: x");
    }

    #[test]
    fn test_unmatched_commits() {
        assert_plan_error("s 0 a\nb1 a\ns 2 v", "cannot match");
        // out of order
        assert_plan_error("b 1 a\nb 0 foo", "cannot match");
    }

    #[test]
    fn test_invalid_targets() {
        // branch split around a branch targeting it
        assert_plan_error("b 0 a\nb1@b 1 foo\nb  2 v", "invalid target");
        // target defined later
        assert_plan_error("b@b1 0 a\nb1 1 foo", "invalid target");
        // crossing branches
        assert_plan_error("b 0 a\nb1@b 1 foo\nb2 2 v", "invalid target");
    }

    #[test]
    fn test_invalid_target_hint() {
        let err = parse("b 0 a\nb1@b 1 foo\nb2 2 v").unwrap_err();
        assert_eq!(
            err.hints(),
            &["re-order commits with `git rebase --interactive upstream local`".to_string()]
        );
    }

    #[test]
    fn test_conflicting_targets() {
        assert_plan_error("b 0 a\nb1 1\nb2@b 2 v\nb2@b1 3", "multiple targets");
    }

    #[test]
    fn test_non_contiguous_label() {
        assert_plan_error("b0 0 a\nb1 1 b\nb0 2 c", "non-contiguous");
    }

    #[test]
    fn test_equivalent_plans() {
        for anchor in [AnchorCommit::First, AnchorCommit::Last] {
            let config = config(anchor);
            let commits = local_commits();
            let mut expected = DeltaTree::new();
            expected.add_commit(commits[2].clone(), None, &config).unwrap();

            for plan in [
                "s 0 a\ns 1 b\nb0 2 v",
                "s 0 a\nb0 2 v",
                "b0 2 v",
                "b 2 v",
                "b 2",
                "# comment\n\nb 2\n",
            ] {
                assert_eq!(parse_plan(plan, &commits, &config).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_empty_plans() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("s 0 a\ns 1 b\ns 2 v").unwrap().is_empty());
    }

    #[test]
    fn test_optional_target_specifications() {
        for anchor in [AnchorCommit::First, AnchorCommit::Last] {
            let config = config(anchor);
            let commits = local_commits();
            let (a, b, c) = (commits[0].clone(), commits[1].clone(), commits[2].clone());

            let mut expected = DeltaTree::new();
            let b0 = expected.add(vec![a], None, &config).unwrap();
            expected.add(vec![b, c], Some(b0), &config).unwrap();

            for plan in [
                "b 0 a\nb1@b 1 b\nb1 2 v",
                "b 0 a\nb1 1 b\nb1@b 2 v",
                "b 0 a\nb1@b 1 b\nb1@b 2 v",
                "b 0 a\nb1@ 1 b\nb1@b 2 v",
            ] {
                assert_eq!(parse_plan(plan, &commits, &config).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_partial_skip() {
        let config = config(AnchorCommit::First);
        let commits = local_commits();
        let mut expected = DeltaTree::new();
        expected
            .add(vec![commits[0].clone(), commits[2].clone()], None, &config)
            .unwrap();
        assert_eq!(parse("b 0 a\ns 1 foo\nb 2 v").unwrap(), expected);
    }

    #[test]
    fn test_chain() {
        let config = config(AnchorCommit::First);
        let commits = local_commits();
        let mut expected = DeltaTree::new();
        let b0 = expected.add_commit(commits[0].clone(), None, &config).unwrap();
        let b1 = expected.add_commit(commits[1].clone(), Some(b0), &config).unwrap();
        expected.add_commit(commits[2].clone(), Some(b1), &config).unwrap();

        assert_eq!(parse("b0 0 a\nb1@b0 1 foo\nb2@b1 2 v").unwrap(), expected);
        assert_eq!(parse("b 0 a\nb1@b 1 foo\nb2@1 2 v").unwrap(), expected);
    }

    #[test]
    fn test_siblings_share_a_target() {
        let tree = parse("b0 0\nb1@b0 1\nb2@b0 2\nb3@b2 3").unwrap();
        let names: Vec<_> = tree.deltas().map(|d| d.target_branch_name.clone()).collect();
        assert_eq!(names[1], tree.branch_names()[0]);
        assert_eq!(names[2], tree.branch_names()[0]);
        assert_eq!(names[3], tree.branch_names()[2]);
    }

    #[test]
    fn test_render_flat_and_stacked() {
        let config = config(AnchorCommit::First);
        let commits = local_commits();

        let flat = build_tree(&commits, &config, false).unwrap();
        assert_eq!(render_plan(&flat, &commits), "b0 0 a\nb1 1 b\nb2 2 c\nb3 3 d");

        let stacked = build_tree(&commits, &config, true).unwrap();
        let rendered = render_plan(&stacked, &commits);
        assert_eq!(rendered, "b0 0 a\nb1@b0 1 b\nb2@b1 2 c\nb3@b2 3 d");
        assert_eq!(parse_plan(&rendered, &commits, &config).unwrap(), stacked);
    }

    #[test]
    fn test_render_round_trip_with_skips() {
        let commits = local_commits();
        for anchor in [AnchorCommit::First, AnchorCommit::Last] {
            let config = config(anchor);
            let plan = "b0 0 a\ns 1 b\nb0 2 c\nb1@b0 3 d";
            let tree = parse_plan(plan, &commits, &config).unwrap();
            let rendered = render_plan(&tree, &commits);
            assert_eq!(rendered, plan);
            assert_eq!(parse_plan(&rendered, &commits, &config).unwrap(), tree);
        }
    }

    #[test]
    fn test_render_empty_tree() {
        let commits = local_commits();
        assert_eq!(
            render_plan(&DeltaTree::new(), &commits),
            "s 0 a\ns 1 b\ns 2 c\ns 3 d"
        );
    }
}

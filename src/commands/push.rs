use clap::Args;

use crate::commands::{Context, guards};
use crate::error::DflockError;
use crate::plan::{Delta, resolve_delta};
use crate::utils::confirm;

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Deltas to push, by index (`2`, `b2`) or unique part of the branch name. Defaults to all
    pub delta_references: Vec<String>,

    /// Also detect the current plan and write branches
    #[arg(short, long)]
    pub write: bool,

    /// Choose which branches to push
    #[arg(short, long)]
    pub interactive: bool,

    /// Use GitLab push options to create a merge request
    #[arg(short = 'm', long)]
    pub gitlab_merge_request: bool,
}

pub fn handle_push(ctx: &Context, args: &PushArgs) -> Result<(), DflockError> {
    guards::remote_set(ctx)?;
    if args.write {
        guards::clean_work_tree(ctx)?;
        guards::no_hot_branch(ctx)?;
        guards::undiverged(ctx)?;
    }
    let planner = ctx.planner();
    let tree = planner.reconstruct_tree()?;
    if args.write {
        planner.write_plan(&tree)?;
    }

    let deltas: Vec<&Delta> = if args.delta_references.is_empty() {
        tree.deltas().collect()
    } else {
        let branches: Vec<String> = tree.branch_names().iter().map(|s| s.to_string()).collect();
        let mut selected = Vec::new();
        for reference in &args.delta_references {
            let name = resolve_delta(reference, &branches)?;
            if let Some(delta) = tree.get_by_name(&name) {
                selected.push(delta);
            }
        }
        selected
    };

    let remote = &ctx.config.remote;
    for delta in deltas {
        if args.interactive
            && !confirm(&format!("Push {} to {}?", delta.branch_name, remote), true)?
        {
            continue;
        }
        println!("Pushing {}.", delta.branch_name);
        let output = ctx
            .repo
            .push(&delta.force_push_args(remote, args.gitlab_merge_request))?;
        println!("{}", output);
    }
    println!("Delta branches updated.");
    Ok(())
}

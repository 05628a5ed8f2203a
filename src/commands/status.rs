use clap::Args;
use serde::Serialize;

use crate::commands::{Context, guards};
use crate::error::DflockError;
use crate::git::Vcs;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the target of each branch
    #[arg(short = 't', long)]
    pub show_targets: bool,

    /// Print status as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PushState {
    UpToDate,
    Diverged,
    NotPushed,
}

#[derive(Serialize, Debug)]
struct DeltaStatus {
    index: usize,
    branch: String,
    push_state: PushState,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
}

#[derive(Serialize, Debug)]
struct StatusOutput {
    on_local: bool,
    diverged: bool,
    deltas: Vec<DeltaStatus>,
}

pub fn handle_status(ctx: &Context, args: &StatusArgs) -> Result<(), DflockError> {
    guards::refs_exist(ctx)?;
    let output = collect_status(ctx, args.show_targets)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if output.on_local {
        println!("On local branch.");
    } else {
        println!("NOT on local branch.");
    }
    if output.diverged {
        println!("Local and upstream have diverged");
    }
    if !output.deltas.is_empty() {
        println!("\nDeltas:");
        for delta in &output.deltas {
            let suffix = match delta.push_state {
                PushState::UpToDate => "",
                PushState::Diverged => " (diverged)",
                PushState::NotPushed => " (not pushed)",
            };
            println!(
                "{:>4}: {}{}",
                format!("b{}", delta.index),
                delta.branch,
                suffix
            );
            if let Some(target) = &delta.target {
                println!("{}@ {}", " ".repeat(6), target);
            }
        }
    }
    Ok(())
}

fn collect_status(ctx: &Context, show_targets: bool) -> Result<StatusOutput, DflockError> {
    let planner = ctx.planner();
    let diverged = ctx
        .repo
        .have_diverged(&ctx.config.upstream_name(), &ctx.config.local)?;
    let on_local = ctx.repo.current_branch()?.as_deref() == Some(ctx.config.local.as_str());
    let branches = planner.delta_branches()?;
    let tree = if show_targets && !branches.is_empty() {
        Some(planner.reconstruct_tree()?)
    } else {
        None
    };

    let mut deltas = Vec::with_capacity(branches.len());
    for (index, branch) in branches.into_iter().enumerate() {
        let push_state = push_state(ctx, &branch)?;
        let target = tree
            .as_ref()
            .and_then(|t| t.get_by_name(&branch))
            .map(|d| d.target_branch_name.clone());
        deltas.push(DeltaStatus {
            index,
            branch,
            push_state,
            target,
        });
    }

    Ok(StatusOutput {
        on_local,
        diverged,
        deltas,
    })
}

fn push_state(ctx: &Context, branch: &str) -> Result<PushState, DflockError> {
    match ctx.repo.remote_tracking_branch(branch)? {
        None => Ok(PushState::NotPushed),
        Some(tracking) => {
            if ctx.repo.rev_parse(&tracking)? == ctx.repo.rev_parse(branch)? {
                Ok(PushState::UpToDate)
            } else {
                Ok(PushState::Diverged)
            }
        }
    }
}

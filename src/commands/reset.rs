use clap::Args;

use crate::commands::Context;
use crate::error::DflockError;
use crate::git::Vcs;
use crate::utils::confirm;

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Delete every dflock-managed branch.
pub fn handle_reset(ctx: &Context, args: &ResetArgs) -> Result<(), DflockError> {
    let branches = ctx.planner().delta_branches()?;
    if branches.is_empty() {
        println!("No active branches found");
        return Ok(());
    }
    if !args.yes {
        println!("This will delete the following branches:");
        for branch in &branches {
            println!("{}", branch);
        }
        if !confirm("Continue?", false)? {
            return Ok(());
        }
    }
    for branch in &branches {
        ctx.repo.delete_branch(branch)?;
    }
    Ok(())
}

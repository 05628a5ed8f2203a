use clap::Args;

use crate::commands::{Context, run_git_attached};
use crate::error::DflockError;
use crate::plan::resolve_delta;

#[derive(Args, Debug)]
pub struct CheckoutArgs {
    /// `local` (or the local branch name), a delta index such as `b1`, or a unique part of a
    /// delta branch name
    pub delta_reference: String,
}

pub fn handle_checkout(ctx: &Context, args: &CheckoutArgs) -> Result<(), DflockError> {
    let reference = args.delta_reference.as_str();
    let branch = if reference == "local" || reference == ctx.config.local {
        ctx.config.local.clone()
    } else {
        let branches = ctx.planner().delta_branches()?;
        resolve_delta(reference, &branches)?
    };
    run_git_attached(ctx, &["checkout", &branch])
}

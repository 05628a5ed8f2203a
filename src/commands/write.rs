use crate::commands::{Context, guards};
use crate::error::DflockError;
use crate::utils::debug_log;

/// Rewrite the current plan's branches on top of the latest local commits.
pub fn handle_write(ctx: &Context) -> Result<(), DflockError> {
    guards::clean_work_tree(ctx)?;
    guards::no_hot_branch(ctx)?;
    guards::undiverged(ctx)?;

    let planner = ctx.planner();
    let tree = planner.reconstruct_tree()?;
    let updated = planner.write_plan(&tree)?;
    debug_log(&format!("Rewrote {} branches", updated.len()));
    println!("Delta branches updated.");
    Ok(())
}

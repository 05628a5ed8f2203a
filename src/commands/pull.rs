use crate::commands::{Context, guards, run_git_attached};
use crate::error::DflockError;

/// `git pull --rebase <remote> <upstream>` on the local branch.
pub fn handle_pull(ctx: &Context) -> Result<(), DflockError> {
    guards::on_local(ctx)?;
    guards::remote_set(ctx)?;
    run_git_attached(
        ctx,
        &["pull", "--rebase", &ctx.config.remote, &ctx.config.upstream],
    )
}

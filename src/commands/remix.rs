use crate::commands::{Context, guards, run_git_attached};
use crate::error::DflockError;

/// `git rebase -i <upstream>` on the local branch.
pub fn handle_remix(ctx: &Context) -> Result<(), DflockError> {
    guards::clean_work_tree(ctx)?;
    guards::undiverged(ctx)?;
    guards::on_local(ctx)?;
    run_git_attached(ctx, &["rebase", "-i", &ctx.config.upstream_name()])
}

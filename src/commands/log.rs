use crate::commands::{Context, guards, run_git_attached};
use crate::error::DflockError;
use crate::git::Vcs;
use crate::utils::warn;

/// `git log <local> ^<upstream>`
pub fn handle_log(ctx: &Context) -> Result<(), DflockError> {
    guards::undiverged(ctx)?;
    if ctx.repo.current_branch()?.as_deref() != Some(ctx.config.local.as_str()) {
        warn("not on local branch.");
    }
    let exclude = format!("^{}", ctx.config.upstream_name());
    run_git_attached(ctx, &["log", &ctx.config.local, &exclude])
}

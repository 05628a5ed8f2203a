//! Checks commands run before touching any branch.

use crate::commands::Context;
use crate::error::DflockError;
use crate::git::Vcs;

pub fn clean_work_tree(ctx: &Context) -> Result<(), DflockError> {
    if !ctx.repo.is_work_tree_clean()? {
        return Err(DflockError::precondition("Work tree not clean."));
    }
    Ok(())
}

/// Rewriting branches would fail if one of them is checked out.
pub fn no_hot_branch(ctx: &Context) -> Result<(), DflockError> {
    let current = ctx.repo.current_branch()?;
    let hot = ctx.planner().hot_branches()?;
    if current.is_some_and(|branch| hot.contains(&branch)) {
        return Err(DflockError::precondition(
            "please switch to a branch not managed by dflock before continuing",
        ));
    }
    Ok(())
}

pub fn refs_exist(ctx: &Context) -> Result<(), DflockError> {
    let upstream = ctx.config.upstream_name();
    if !ctx.repo.object_exists(&upstream)? {
        return Err(DflockError::precondition(format!(
            "Upstream {} does not exist",
            upstream
        )));
    }
    if !ctx.repo.object_exists(&ctx.config.local)? {
        return Err(DflockError::precondition(format!(
            "Local {} does not exist",
            ctx.config.local
        )));
    }
    Ok(())
}

/// The upstream must be an ancestor of local.
pub fn undiverged(ctx: &Context) -> Result<(), DflockError> {
    refs_exist(ctx)?;
    if ctx
        .repo
        .have_diverged(&ctx.config.upstream_name(), &ctx.config.local)?
    {
        let pull = if ctx.config.remote.is_empty() {
            format!("git rebase {}", ctx.config.upstream)
        } else {
            format!("git pull --rebase {} {}", ctx.config.remote, ctx.config.upstream)
        };
        return Err(
            DflockError::precondition("Your local and upstream have diverged.").with_hint(format!(
                "Use `dfl pull` or `{}` to pull upstream changes into your local branch.",
                pull
            )),
        );
    }
    Ok(())
}

pub fn on_local(ctx: &Context) -> Result<(), DflockError> {
    if ctx.repo.current_branch()?.as_deref() != Some(ctx.config.local.as_str()) {
        return Err(DflockError::precondition(format!(
            "You must be on your local branch: {}",
            ctx.config.local
        )));
    }
    Ok(())
}

pub fn remote_set(ctx: &Context) -> Result<(), DflockError> {
    if ctx.config.remote.is_empty() {
        return Err(DflockError::precondition("Remote must be set."));
    }
    Ok(())
}

pub mod checkout;
pub mod guards;
pub mod log;
pub mod plan;
pub mod pull;
pub mod push;
pub mod remix;
pub mod reset;
pub mod status;
pub mod write;

use std::path::Path;

use crate::config::Config;
use crate::error::DflockError;
use crate::git::{Repository, find_repository_in_path};
use crate::plan::Planner;
use crate::utils::debug_log;

/// The repository and configuration a command runs against.
pub struct Context {
    pub repo: Repository,
    pub config: Config,
}

impl Context {
    /// Find the repository around the current directory and load its configuration.
    pub fn open(config_path: Option<&Path>) -> Result<Self, DflockError> {
        let cwd = std::env::current_dir()?;
        let repo = find_repository_in_path(&cwd)?;
        let config = Config::load(config_path, Some(repo.workdir()))?;
        debug_log(&format!("Loaded config: {:?}", config));
        Ok(Context { repo, config })
    }

    pub fn planner(&self) -> Planner<'_, Repository> {
        Planner::new(&self.repo, &self.config)
    }
}

/// Run git attached to the terminal and fail if it exits unsuccessfully.
pub fn run_git_attached(ctx: &Context, args: &[&str]) -> Result<(), DflockError> {
    let status = ctx.repo.run_interactive(args)?;
    if !status.success() {
        return Err(DflockError::Generic(format!(
            "git {} exited with {}",
            args.join(" "),
            status
        )));
    }
    Ok(())
}

/// Print an error and its hints the way every command reports failure.
pub fn report_error(err: &DflockError) {
    for hint in err.hints() {
        eprintln!("Hint: {}", hint);
    }
    eprintln!("Error: {}", err);
}

use clap::{Args, ValueEnum};

use crate::commands::{Context, guards};
use crate::error::DflockError;
use crate::plan::{DeltaTree, INSTRUCTIONS, iterate_plan};
use crate::utils::edit_interactively;

/// How the initial plan is produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Use the last applied plan
    #[default]
    Detect,
    /// Put each commit in a branch on top of the previous commit's branch
    Stack,
    /// Put each commit in its own branch off the upstream
    Flat,
    /// Start from an empty plan
    Empty,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[arg(value_enum, default_value_t = Strategy::Detect)]
    pub strategy: Strategy,

    /// Always edit the plan before executing it
    #[arg(short, long)]
    pub edit: bool,

    /// Only show the plan without executing it
    #[arg(short, long)]
    pub show: bool,
}

pub fn handle_plan(ctx: &Context, args: &PlanArgs) -> Result<(), DflockError> {
    guards::clean_work_tree(ctx)?;
    guards::no_hot_branch(ctx)?;
    guards::undiverged(ctx)?;

    let planner = ctx.planner();
    let tree = match args.strategy {
        Strategy::Detect => planner.reconstruct_tree()?,
        Strategy::Stack => planner.build_tree(true)?,
        Strategy::Flat => planner.build_tree(false)?,
        Strategy::Empty => DeltaTree::new(),
    };
    let plan = planner.render_plan(&tree)?;

    let open_editor = (args.edit || args.strategy == Strategy::Detect) && !args.show;
    let plan = if open_editor {
        let edited = edit_interactively(&format!("{}{}", plan, INSTRUCTIONS), &ctx.config.editor)?;
        let edited = iterate_plan(&edited).collect::<Vec<_>>().join("\n");
        if edited.trim().is_empty() {
            println!("Aborting.");
            return Ok(());
        }
        edited
    } else {
        plan
    };
    println!("{}\n", plan);

    if args.show {
        return Ok(());
    }

    let tree = planner.parse_plan(&plan)?;
    planner.write_plan(&tree)?;
    println!("Branches updated. Run `dfl push` to push them to a remote.");
    planner.prune_local_branches(&tree)?;
    Ok(())
}

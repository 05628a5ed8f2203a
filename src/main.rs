use std::path::PathBuf;

use clap::{Parser, Subcommand};

use dflock::commands::checkout::{CheckoutArgs, handle_checkout};
use dflock::commands::log::handle_log;
use dflock::commands::plan::{PlanArgs, handle_plan};
use dflock::commands::pull::handle_pull;
use dflock::commands::push::{PushArgs, handle_push};
use dflock::commands::remix::handle_remix;
use dflock::commands::reset::{ResetArgs, handle_reset};
use dflock::commands::status::{StatusArgs, handle_status};
use dflock::commands::write::handle_write;
use dflock::commands::{Context, report_error};
use dflock::error::DflockError;

#[derive(Parser)]
#[command(name = "dfl", version)]
#[command(about = "Split a local branch into reviewable delta branches", long_about = None)]
struct Cli {
    /// Read configuration from this file instead of ~/.dflock and .dflock
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create, edit and write a plan of delta branches
    Plan(PlanArgs),
    /// Force-push delta branches to the remote
    Push(PushArgs),
    /// Show the local branch and delta branches
    Status(StatusArgs),
    /// Rewrite delta branches from the current plan
    Write,
    /// Delete all delta branches
    Reset(ResetArgs),
    /// Check out the local branch or a delta branch
    Checkout(CheckoutArgs),
    /// Interactively rebase the local branch onto upstream
    Remix,
    /// Pull upstream changes into the local branch
    Pull,
    /// Show commits on local that are not on upstream
    Log,
}

fn run(cli: Cli) -> Result<(), DflockError> {
    let ctx = Context::open(cli.config.as_deref())?;
    match &cli.command {
        Command::Plan(args) => handle_plan(&ctx, args),
        Command::Push(args) => handle_push(&ctx, args),
        Command::Status(args) => handle_status(&ctx, args),
        Command::Write => handle_write(&ctx),
        Command::Reset(args) => handle_reset(&ctx, args),
        Command::Checkout(args) => handle_checkout(&ctx, args),
        Command::Remix => handle_remix(&ctx),
        Command::Pull => handle_pull(&ctx),
        Command::Log => handle_log(&ctx),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        report_error(&e);
        std::process::exit(1);
    }
}

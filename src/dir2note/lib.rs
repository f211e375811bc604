pub mod args;
pub mod config;
pub mod draft;
pub mod errors;
pub mod importer;
pub mod planner;
pub mod progress;
pub mod record;
pub mod store;
pub mod sync;
#[doc(hidden)]
pub mod testing;
pub mod walker;

use std::time::Duration;

use clap::Parser;
use env_logger::Env;

use args::Cli;
use errors::Result;
use progress::{istty, pretty_line};
use store::{DryRun, NoteStore, Retrying, ScriptBridge};
use sync::{install_interrupt_handler, interrupt_flag, sync_tree, Summary, SyncOptions};
use walker::JunkFilter;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn print_summary(summary: &Summary, dry_run: bool) -> Result<()> {
    let tty = istty();
    if dry_run {
        pretty_line("would create: ", &format!("{}, ", summary.planned(planner::Action::Create)), tty)?;
        pretty_line("would update: ", &format!("{}, ", summary.planned(planner::Action::Update)), tty)?;
    } else {
        pretty_line("created: ", &format!("{}, ", summary.counters.created), tty)?;
        pretty_line("updated: ", &format!("{}, ", summary.counters.updated), tty)?;
    }
    pretty_line("unchanged: ", &format!("{}, ", summary.skipped), tty)?;
    pretty_line("failed: ", &format!("{}\n", summary.failed), tty)?;
    if summary.interrupted {
        println!("interrupted; run again to pick up the remaining files");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = config::load(&cli.config)?;
    let options = SyncOptions {
        notebook: cli.notebook.clone().or(config.notebook.clone()),
        junk: JunkFilter::new(&config.junk_patterns)?,
        progress: config.progress && !cli.no_progress,
        dry_run: cli.dry_run,
    };

    install_interrupt_handler();
    let bridge = Retrying::new(ScriptBridge::new(&config.osascript),
                               config.retries,
                               Duration::from_millis(config.retry_backoff_ms));
    let mut store: Box<dyn NoteStore> = if cli.dry_run {
        Box::new(DryRun::new(bridge))
    } else {
        Box::new(bridge)
    };

    let summary = sync_tree(&cli.path, &mut *store, &options, interrupt_flag())?;
    print_summary(&summary, cli.dry_run)?;

    if summary.failed > 0 {
        log::warn!("{} files failed to import", summary.failed);
        if cli.strict {
            return Err(errors::Error::from(format!("{} files failed to import", summary.failed)));
        }
    }
    Ok(())
}

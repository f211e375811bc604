use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "dir2note")]
#[command(version)]
#[command(about = "import every file under a directory as its own note, with the file attached", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Root directory to import
    pub path: PathBuf,

    /// Target notebook; defaults to a local notebook named "<root dir>: <date>"
    #[arg(short, long)]
    pub notebook: Option<String>,

    /// Config file to use
    #[arg(short, long, env = "DIR2NOTE_CONFIG")]
    pub config: Option<String>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Don't draw the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Exit with an error if any file failed to import
    #[arg(long)]
    pub strict: bool,

    /// Show what would be imported without touching any notes or records
    #[arg(long)]
    pub dry_run: bool,
}

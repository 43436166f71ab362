use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Command-line arguments of the filestack binary
#[derive(Parser)]
#[clap(
    version,
    about = "Flat-file content engine for a small blog: posts, pages, menu and trash"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Path to the posts directory, overriding the configuration
    #[clap(long, value_parser)]
    pub posts_dir: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

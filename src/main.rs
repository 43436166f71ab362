use std::path::PathBuf;

use clap::Parser;
use directories::ProjectDirs;
use log::{debug, error, info};

use filestack::{App, Catalog, Cli, Config, Result};

pub fn initialize_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    debug!("Logger initialized");
}

/// Config file given on the command line, else the per-user config file when
/// it exists, else the built-in defaults.
fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::load(&path);
    }
    let user_config = ProjectDirs::from("org", "filestack", "filestack")
        .map(|dirs| dirs.config_dir().join("config.json"))
        .filter(|path| path.exists());
    match user_config {
        Some(path) => Config::load(&path),
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config)?;
    if let Some(posts_dir) = cli.posts_dir {
        config.posts_dir = posts_dir;
    }
    config.validate()?;

    let catalog = Catalog::open(&config)?;
    App::new(catalog, config, cli.verbose).run(cli.command)
}

fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);
    info!("filestack starting up");

    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("{} {}", console::style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

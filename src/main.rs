//! Whereabouts - visibility-aware location tracking coordinator
//!
//! This is the binary entry point. All logic lives in the libraries.

use std::path::PathBuf;

use clap::Parser;
use whereabouts_app::config;

/// Whereabouts - visibility-aware location tracking coordinator
#[derive(Parser, Debug)]
#[command(name = "whereabouts")]
#[command(about = "Visibility-aware location tracking coordinator", long_about = None)]
struct Args {
    /// Directory holding config.toml and the tracking preference
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Run in headless mode (stdin commands, JSON events on stdout).
    /// This is the default and currently the only mode.
    #[arg(long)]
    headless: bool,

    /// Write a default config.toml into the data directory and exit
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let data_dir = args.data_dir.unwrap_or_else(config::default_data_dir);

    if args.init {
        let path = config::init_data_dir(&data_dir)?;
        eprintln!("Config written to {}", path.display());
        return Ok(());
    }

    whereabouts_core::logging::init(&data_dir)?;

    tracing::debug!(
        "Data dir: {} (headless flag: {})",
        data_dir.display(),
        args.headless
    );

    whereabouts::run_headless(&data_dir).await?;
    Ok(())
}

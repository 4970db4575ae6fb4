use anyhow::Context;
use clap::{Parser, Subcommand};
use slipway_core::cli::conf::{ConfigCmd, DEFAULT_CONFIG_PATH};
use slipway_core::conf::load_config;
use slipway_core::logging::init_logging;
use slipway_core::server;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "slipway",
    version,
    about = "Slipway: Pingora-based rewriting web proxy"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Configuration tooling
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },

    /// Run the proxy (default)
    Run {
        /// Path to the config file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Command::Config { cmd }) => slipway_core::cli::conf::run(cmd),
        Some(Command::Run { config }) => run(&config),
        None => run(Path::new(DEFAULT_CONFIG_PATH)),
    };

    if let Err(e) = result {
        eprintln!("slipway: {e:#}");
        std::process::exit(1);
    }
}

fn run(path: &Path) -> anyhow::Result<()> {
    init_logging();

    let cfg = load_config(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;

    server::run(cfg)
}

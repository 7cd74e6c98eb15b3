// Line-oriented chess engine front end

mod deadlock_detector;
mod stdin_reader;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use fishbridge_cli::handler::{Flow, Session};
use fishbridge_cli::logging;
use fishbridge_cli::output::Output;
use fishbridge_core::{Bridge, BridgeConfig};
use std::path::PathBuf;
use stdin_reader::spawn_stdin_reader;

const CHANNEL_SIZE: usize = 1024;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    logging::init(args.debug);

    // stdout carries protocol lines only; diagnostics go to stderr
    if let Err(e) = run(&args) {
        log::error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    deadlock_detector::install();

    let config = match &args.config {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    let bridge = Bridge::new(config).context("starting bridge")?;
    log::info!("{}", bridge.info());

    let out = Output::stdout();
    let mut session = Session::new(bridge, out.clone());

    let (cmd_tx, cmd_rx) = bounded(CHANNEL_SIZE);
    let _stdin_handle = spawn_stdin_reader(cmd_tx, out).context("spawning stdin reader")?;

    for cmd in cmd_rx.iter() {
        if session.handle(cmd)? == Flow::Quit {
            break;
        }
    }
    // Dropping the session stops a search still running after EOF
    log::debug!("Command loop finished");
    Ok(())
}

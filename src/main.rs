//! iscsi-top
//!
//! Live view of a running iSCSI target: open connections and per-core
//! task throughput, read from the target's shared memory.
//!
//! Usage:
//!   iscsi-top                  # attach to instance 0
//!   iscsi-top -i 2             # attach to instance 2
//!   iscsi-top -c top.toml      # custom layout / region directory
//!
//! Keyboard:
//!   d  - Change refresh delay (1-10 seconds)
//!   q  - Quit
//!
//! Environment:
//!   ISCSI_TOP_CONFIG - Path to TOML config file (default: iscsi_top.toml)
//!   RUST_LOG         - Log filter, written to stderr (default: warn)

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use iscsi_top::telemetry::RegionAttacher;
use iscsi_top::tui::{InteractiveController, StdinConsole, Termios};
use iscsi_top::{Dashboard, DashboardConfig, TopConfig};

#[derive(Parser, Debug)]
#[command(name = "iscsi-top", version)]
#[command(about = "Live connection and throughput view of a running iSCSI target")]
struct Args {
    /// Instance ID of the target to attach to
    #[arg(short, long, default_value = "0")]
    instance: u32,

    /// Path to TOML configuration file
    #[arg(short, long, env = "ISCSI_TOP_CONFIG")]
    config: Option<PathBuf>,
}

fn print_usage() {
    eprintln!("{}", Args::command().render_help());
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

fn load_config(args: &Args) -> Result<TopConfig> {
    match &args.config {
        Some(path) => TopConfig::load(path)
            .with_context(|| format!("Cannot load config {}", path.display())),
        None => TopConfig::from_env(),
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => {
                    print_usage();
                    ExitCode::from(1)
                }
            };
        }
    };

    init_tracing();

    // Everything that can fail before the terminal is touched.
    let startup = load_config(&args).and_then(|config| {
        let attacher = RegionAttacher::new(config.region_source(), config.layout);
        let dashboard = Dashboard::attach(&attacher, args.instance)?;
        Ok((config, attacher, dashboard))
    });
    let (config, attacher, mut dashboard) = match startup {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("{:#}", e);
            print_usage();
            return ExitCode::from(1);
        }
    };

    let dashboard_config = DashboardConfig::new(args.instance, config.initial_delay());
    info!(
        instance = dashboard_config.instance_id,
        delay = %dashboard_config.delay,
        "attached to target"
    );

    let mut controller = InteractiveController::new(dashboard_config);
    let mut stdout = io::stdout().lock();
    let result = controller.run(&mut StdinConsole, Termios::stdin(), &mut stdout, |out, delay| {
        dashboard.refresh(out, delay)
    });

    dashboard.detach(&attacher);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Terminal I/O failed: {}", e);
            ExitCode::from(1)
        }
    }
}

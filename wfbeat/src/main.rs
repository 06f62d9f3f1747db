//! Process entry point, grounded in `main.cpp`'s startup ordering:
//! `clap::Parser` for argument parsing and `simplelog` for logger
//! initialization.

mod channel_control;
mod cli;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use wifibeat_core::{BeatInfo, Settings, Topology};

use channel_control::ShellChannelControl;
use cli::Cli;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maps the YAML `logging.level` vocabulary onto `log::LevelFilter`
/// (§4.14): `notice` has no direct equivalent and collapses onto `Info`;
/// `alert` collapses onto `Error`, same as `critical`.
fn level_filter(level: &str) -> LevelFilter {
    match level {
        "debug" => LevelFilter::Debug,
        "notice" => LevelFilter::Info,
        "warning" | "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "critical" | "alert" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

fn init_logger(level: LevelFilter) {
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("failed to initialize logger");
}

fn write_pid_file(path: &std::path::Path) -> std::io::Result<()> {
    std::fs::write(path, format!("{}\n", std::process::id()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load(&cli.config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logger(level_filter(&settings.logging_level));

    if cli.dump_config {
        println!("{settings:#?}");
        return ExitCode::SUCCESS;
    }

    if settings.indexers.is_empty() {
        log::error!("no indexer endpoint configured; nothing to ship documents to");
        return ExitCode::FAILURE;
    }

    if !settings.channel_hopping.is_empty() {
        let is_root = unsafe { libc::geteuid() } == 0;
        if !is_root && !cli.no_daemon {
            log::error!("capturing from an interface requires root privileges");
            return ExitCode::FAILURE;
        }
        for iface in settings.channel_hopping.keys() {
            if let Err(e) = channel_control::prepare_interface(iface) {
                log::warn!("could not prepare interface '{iface}' for monitor mode: {e}");
            }
        }
    }

    let pid_path = cli.pid_path();
    if cli.writes_pid_file() {
        if let Err(e) = write_pid_file(&pid_path) {
            log::error!("failed to write PID file '{}': {e}", pid_path.display());
            return ExitCode::FAILURE;
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let signal_flag = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || {
        signal_flag.store(false, Ordering::SeqCst);
    }) {
        log::error!("failed to install signal handler: {e}");
        cleanup_pid_file(&cli, &pid_path);
        return ExitCode::FAILURE;
    }

    let beat = BeatInfo::current(VERSION);
    let mut topology = Topology::build(&settings, cli.pcap_prefix.as_deref(), beat, || {
        Box::new(ShellChannelControl::default())
    });

    if let Err(e) = topology.init() {
        log::error!("topology initialization failed: {e}");
        cleanup_pid_file(&cli, &pid_path);
        return ExitCode::FAILURE;
    }

    if let Err(e) = topology.start() {
        log::error!("topology failed to start: {e}");
        cleanup_pid_file(&cli, &pid_path);
        return ExitCode::FAILURE;
    }

    log::info!(
        "wfbeat running with {} indexer branch(es)",
        topology.indexer_count()
    );

    while running.load(Ordering::SeqCst) && !topology.can_stop() {
        std::thread::sleep(Duration::from_secs(1));
    }

    topology.stop();
    cleanup_pid_file(&cli, &pid_path);
    ExitCode::SUCCESS
}

fn cleanup_pid_file(cli: &Cli, pid_path: &std::path::Path) {
    if cli.writes_pid_file() {
        let _ = std::fs::remove_file(pid_path);
    }
}

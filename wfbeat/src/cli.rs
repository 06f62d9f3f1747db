//! Command-line surface: a flat `clap::Parser` derive struct,
//! collapsing the original's subcommands into the flag-only surface
//! `main.cpp` exposes: `-h/--help`, `-v/--version`, `-c/--config`,
//! `-f/--no-daemon`, `-d/--dump-config`, `-p/--pid`, `-n/--no-pid`,
//! `-a/--pcap-prefix`.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "wfbeat",
    about = "Captures 802.11 frames, parses them, and ships documents to an indexer.",
    disable_version_flag = true
)]
pub struct Cli {
    /// Print the version and exit.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// Path to the YAML settings file.
    #[arg(short = 'c', long = "config", default_value = "/etc/wifibeat.yml")]
    pub config: PathBuf,

    /// Run in the foreground; also suppresses PID-file writing.
    #[arg(short = 'f', long = "no-daemon")]
    pub no_daemon: bool,

    /// Parse the configuration, print it, and exit.
    #[arg(short = 'd', long = "dump-config")]
    pub dump_config: bool,

    /// PID-file path (ignored with --no-daemon).
    #[arg(short = 'p', long = "pid")]
    pub pid: Option<PathBuf>,

    /// Suppress PID-file writing.
    #[arg(short = 'n', long = "no-pid")]
    pub no_pid: bool,

    /// Overrides `wifibeat.output.pcap.prefix`.
    #[arg(short = 'a', long = "pcap-prefix")]
    pub pcap_prefix: Option<String>,
}

impl Cli {
    pub fn writes_pid_file(&self) -> bool {
        !self.no_daemon && !self.no_pid
    }

    pub fn pid_path(&self) -> PathBuf {
        self.pid
            .clone()
            .unwrap_or_else(|| PathBuf::from("/var/run/wfbeat.pid"))
    }
}

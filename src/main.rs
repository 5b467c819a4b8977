//! DriveStash: browse drives, collect files across folders, and export
//! them as one zip archive.
//!
//! Thin binary entry point. All logic lives in the `drivestash-core`
//! and `drivestash-cli` crates.

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use drivestash_cli::commands::{self, DeviceFilter};
use drivestash_core::config::Config;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "drivestash", version, about = "Browse drives and export files as a zip archive")]
struct Cli {
    /// JSON configuration file. Falls back to $DRIVESTASH_CONFIG.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// More log output (debug level).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List fixed roots offered for browsing.
    Roots,
    /// List fixed roots and removable devices.
    Devices,
    /// List the visible entries of one directory.
    Ls {
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Only show entries whose name contains this text (any case).
        #[arg(long)]
        filter: Option<String>,
    },
    /// List every visible file below a directory, with sizes.
    Files { dir: PathBuf },
    /// Show the size of each path.
    Size {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the SHA-512 digest of each file.
    Hash {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Export files and directories into a new zip archive.
    Archive {
        /// Directory the archive is written to.
        #[arg(long, short)]
        dest: PathBuf,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only listings and JSON.
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let config = Config::resolve(cli.config.as_deref()).map_err(|e| {
        tracing::error!("{e}");
        anyhow!(e.user_message())
    })?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Roots => commands::devices(&config, DeviceFilter::Fixed, cli.json, &mut out),
        Command::Devices => commands::devices(&config, DeviceFilter::All, cli.json, &mut out),
        Command::Ls { dir, filter } => commands::ls(&dir, filter.as_deref(), cli.json, &mut out),
        Command::Files { dir } => commands::files(&config, &dir, cli.json, &mut out),
        Command::Size { paths } => commands::size(&paths, cli.json, &mut out),
        Command::Hash { paths } => commands::hash(&paths, cli.json, &mut out),
        Command::Archive { dest, paths } => commands::archive(
            &config,
            &dest,
            &paths,
            cli.json,
            &mut out,
            &mut io::stderr(),
        ),
    }
}

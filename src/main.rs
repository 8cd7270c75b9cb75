//! `gitfs <remote_url> <mount_point> [-o KEY=VALUE,...]`
//!
//! Parses the two positionals plus the `-o` option bag into a
//! [`gitfs::config::MountOptions`], initializes logging, and hands off to
//! [`gitfs::mount::run`].

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use gitfs::config::MountOptions;
use gitfs::{mount, telemetry};

#[derive(Parser)]
#[command(
    name = "gitfs",
    version,
    disable_version_flag = true,
    about = "FUSE filesystem exposing a git repository as a writable branch-tip view plus a read-only history view"
)]
struct Cli {
    /// Print version and exit.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: (),

    /// Git remote URL to clone and track.
    remote_url: String,

    /// Where to mount the filesystem.
    mount_point: PathBuf,

    /// Mount options, e.g. `-o branch=main,foreground,max_size=20`.
    #[arg(short = 'o', value_name = "KEY=VALUE,...")]
    options: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut opts = MountOptions::new(cli.remote_url, cli.mount_point);
    for raw in &cli.options {
        if let Err(err) = opts.apply_options(raw) {
            eprintln!("gitfs: {err}");
            return ExitCode::FAILURE;
        }
    }

    let _guard = match telemetry::init(&opts.log, &opts.log_level, opts.debug) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("gitfs: failed to initialize logging: {err}");
            return ExitCode::FAILURE;
        }
    };

    match mount::run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "mount failed");
            eprintln!("gitfs: {err}");
            ExitCode::FAILURE
        }
    }
}

//! Command line parser.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tally_observability::{LogArgs, MetricsArgs};

use crate::config::DEFAULT_CONFIG_FILE;

/// Tally - score tracker for rotating challenge maps
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Logging configuration.
    #[command(flatten)]
    pub(crate) logs: LogArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub(crate) command: Commands,
}

/// Tally commands.
#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Track the configured players until interrupted.
    Run(RunArgs),
    /// Print the effective configuration as TOML.
    Config(ConfigArgs),
    /// Ingest a single score file with notifications enabled.
    Replay(ReplayArgs),
}

/// Location of the configuration file.
#[derive(Debug, Args)]
pub(crate) struct ConfigArgs {
    /// Path to the TOML config file. Ignored when it does not exist.
    #[arg(long, short = 'c', value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub(crate) config: PathBuf,
}

/// Arguments for the 'run' command.
#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[command(flatten)]
    pub(crate) config: ConfigArgs,

    /// Directory of the score log, overriding `tracker.score_dir`.
    #[arg(long, value_name = "DIR")]
    pub(crate) score_dir: Option<PathBuf>,

    /// Start with score recording turned off.
    #[arg(long)]
    pub(crate) no_record: bool,

    /// Metrics exporter configuration.
    #[command(flatten)]
    pub(crate) metrics: MetricsArgs,
}

/// Arguments for the 'replay' command.
#[derive(Debug, Args)]
pub(crate) struct ReplayArgs {
    #[command(flatten)]
    pub(crate) config: ConfigArgs,

    /// Directory of the score log, overriding `tracker.score_dir`.
    #[arg(long, value_name = "DIR")]
    pub(crate) score_dir: Option<PathBuf>,

    /// Score JSON file to ingest.
    #[arg(value_name = "FILE")]
    pub(crate) file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "tally",
            "-vv",
            "run",
            "--config",
            "custom.toml",
            "--score-dir",
            "/var/lib/tally",
            "--no-record",
            "--metrics.addr",
            "127.0.0.1:9100",
        ])
        .unwrap();

        assert_eq!(cli.logs.verbosity, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config.config, PathBuf::from("custom.toml"));
        assert_eq!(args.score_dir, Some(PathBuf::from("/var/lib/tally")));
        assert!(args.no_record);
        assert!(args.metrics.addr.is_some());
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["tally", "config"]).unwrap();
        let Commands::Config(args) = cli.command else {
            panic!("expected config command");
        };
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_replay_requires_file() {
        assert!(Cli::try_parse_from(["tally", "replay"]).is_err());
        let cli = Cli::try_parse_from(["tally", "replay", "scores/101.json"]).unwrap();
        let Commands::Replay(args) = cli.command else {
            panic!("expected replay command");
        };
        assert_eq!(args.file, PathBuf::from("scores/101.json"));
    }
}

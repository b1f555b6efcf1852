//! Command-line interface definitions.
//!
//! Every option overrides the matching key of the YAML config file; options
//! left unset keep the file's (or the built-in default) value.

use crate::config::{Config, Quality};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Download yesterday's replays for the tracked teams.
///
/// # Examples
///
/// ```sh
/// # Defaults: 湖人, 勇士, 独行侠 into /downloads
/// nba_video_downloader
///
/// # Local test run with a config file and a different root
/// nba_video_downloader -c nba.yaml --download-root ./downloads --quality 480p
///
/// # Sort-prefix and prune the download root
/// nba_video_downloader tidy --all
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to a YAML config file
    #[arg(short, long, env = "NBA_DL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Root directory for match directories
    #[arg(short, long, env = "NBA_DL_ROOT", global = true)]
    pub download_root: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, env = "NBA_DL_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Tracked team name (repeat for several); replaces the configured list
    #[arg(short, long = "team")]
    pub teams: Vec<String>,

    /// How many days back the target date is
    #[arg(long)]
    pub days: Option<u32>,

    /// Preferred video quality
    #[arg(short, long, value_enum)]
    pub quality: Option<Quality>,

    /// Downloader attempts per video
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Path to the you-get executable
    #[arg(long)]
    pub downloader: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Find and download the target day's matches (default)
    Run,
    /// Add sort prefixes to match directories and prune old ones
    Tidy {
        /// Rename directories of every date, not just the target date
        #[arg(long)]
        all: bool,
    },
}

impl Cli {
    /// Apply command-line overrides on top of a loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.download_root {
            config.download_root = root.clone();
        }
        if !self.teams.is_empty() {
            config.teams = self.teams.clone();
        }
        if let Some(days) = self.days {
            config.days_to_look_back = days;
        }
        if let Some(quality) = self.quality {
            config.preferred_quality = quality;
        }
        if let Some(attempts) = self.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(program) = &self.downloader {
            config.downloader_program = program.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_run() {
        let cli = Cli::parse_from(["nba_video_downloader"]);
        assert!(cli.command.is_none());
        assert!(cli.teams.is_empty());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "nba_video_downloader",
            "-d",
            "/tmp/nba",
            "--team",
            "湖人",
            "--team",
            "凯尔特人",
            "--days",
            "2",
            "-q",
            "720p",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.download_root, PathBuf::from("/tmp/nba"));
        assert_eq!(config.teams, vec!["湖人".to_string(), "凯尔特人".to_string()]);
        assert_eq!(config.days_to_look_back, 2);
        assert_eq!(config.preferred_quality, Quality::P720);
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_cli_tidy_subcommand() {
        let cli = Cli::parse_from(["nba_video_downloader", "tidy", "--all", "-d", "/srv/nba"]);
        assert_eq!(cli.command, Some(Command::Tidy { all: true }));
        assert_eq!(cli.download_root, Some(PathBuf::from("/srv/nba")));
    }
}

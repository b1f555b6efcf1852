//! Runtime configuration.
//!
//! A [`Config`] is built exactly once in `main` (YAML file, then CLI
//! overrides, then [`Config::validate`]) and handed by reference to every
//! component. Nothing re-reads it afterwards.

use crate::error::{Error, Result};
use crate::matching::lookback_target;
use chrono::Local;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Video quality tier passed to the external downloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Quality {
    #[serde(rename = "1080p")]
    #[value(name = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    #[value(name = "720p")]
    P720,
    #[serde(rename = "480p")]
    #[value(name = "480p")]
    P480,
}

impl Quality {
    /// The `you-get` format flag for this tier.
    pub fn downloader_arg(self) -> &'static str {
        match self {
            Quality::P1080 => "--format=dash-flv1080",
            Quality::P720 => "--format=dash-flv720",
            Quality::P480 => "--format=dash-flv480",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Tracked team display names, in priority order.
    pub teams: Vec<String>,
    /// Listing page URL.
    pub base_url: String,
    pub days_to_look_back: u32,
    pub download_root: PathBuf,
    pub preferred_quality: Quality,
    /// Downloader attempts per link, including the first one.
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    /// Files at least this large are treated as already downloaded.
    pub min_existing_bytes: u64,
    pub downloader_program: PathBuf,
    /// Fail the run instead of falling back when no headless browser starts.
    pub require_scripted_rendering: bool,
    /// Also collect localized QQ links (the downloader rejects them).
    pub include_secondary_sources: bool,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub render_settle_secs: u64,
    pub progress_log_interval_secs: u64,
    pub save_listing_html: bool,
    pub write_report: bool,
    pub max_kept_directories: usize,
    /// Sort-prefix the target day's directories after a run. Later runs
    /// for the same day find and reuse the prefixed directory.
    pub tidy_after_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            teams: vec!["湖人".to_string(), "勇士".to_string(), "独行侠".to_string()],
            base_url: "https://www.yoozhibo.net/lanqiu/nba/video-p1.html".to_string(),
            days_to_look_back: 1,
            download_root: PathBuf::from("/downloads"),
            preferred_quality: Quality::P1080,
            max_attempts: 3,
            retry_delay_secs: 5,
            min_existing_bytes: 1024 * 1024,
            downloader_program: PathBuf::from("you-get"),
            require_scripted_rendering: false,
            include_secondary_sources: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            render_settle_secs: 2,
            progress_log_interval_secs: 5,
            save_listing_html: false,
            write_report: true,
            max_kept_directories: 50,
            tidy_after_run: false,
        }
    }
}

impl Config {
    /// Load a YAML config file. Missing keys take their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&raw)?;
        info!("Loaded configuration file");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.teams.iter().all(|t| t.trim().is_empty()) {
            return Err(Error::Config("at least one team must be tracked".into()));
        }
        if self.days_to_look_back < 1 {
            return Err(Error::Config("days_to_look_back must be >= 1".into()));
        }
        if lookback_target(Local::now().date_naive(), self.days_to_look_back).is_none() {
            return Err(Error::Config(format!(
                "days_to_look_back {} is out of calendar range",
                self.days_to_look_back
            )));
        }
        if self.max_attempts < 1 {
            return Err(Error::Config("max_attempts must be >= 1".into()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("base_url {:?}: {e}", self.base_url)))?;
        Ok(())
    }
}

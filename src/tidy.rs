//! Download root maintenance.
//!
//! Match directories are renamed to `{prefix}_{M月D号}_{teams}` where the
//! prefix is `9999 - (month * 31 + day)`, so a plain name sort lists the
//! newest match first. Once more than a configured number of directories
//! exist, the ones with the largest prefix (oldest dates) are deleted.
//! Like date matching, this ignores the year.

use crate::error::Result;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

static DATE_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)月(\d+)号").expect("static regex"));

static MATCH_DIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{4}_)?(\d+月\d+号)_?(.+)$").expect("static regex"));

const UNKNOWN_PREFIX: &str = "0000";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TidyReport {
    pub renamed: Vec<(String, String)>,
    pub removed: Vec<String>,
}

/// Four-digit sort prefix for a `M月D号` date, `0000` if unparsable.
pub fn sort_prefix(date: &str) -> String {
    let Some(caps) = DATE_PART.captures(date) else {
        return UNKNOWN_PREFIX.to_string();
    };
    let (Ok(month), Ok(day)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
        return UNKNOWN_PREFIX.to_string();
    };
    let ordinal = month.saturating_mul(31).saturating_add(day);
    format!("{:04}", 9999u32.saturating_sub(ordinal))
}

/// `(date_part, tidied_name)` for a match directory name, `None` for
/// anything else.
pub fn tidied_name(dirname: &str) -> Option<(String, String)> {
    let caps = MATCH_DIR.captures(dirname)?;
    let date = caps[1].to_string();
    let name = format!("{}_{}_{}", sort_prefix(&date), date, &caps[2]);
    Some((date, name))
}

/// The directory that currently holds the files of `dir`: `dir` itself
/// when it exists, else its sort-prefixed sibling left by an earlier tidy,
/// else `dir`.
///
/// # Arguments
///
/// * `dir` - Un-prefixed match directory, as built by the naming rules
///
/// # Returns
///
/// The path downloads and existing-file checks should use.
pub async fn current_directory(dir: &Path) -> PathBuf {
    if fs::metadata(dir).await.is_ok_and(|m| m.is_dir()) {
        return dir.to_path_buf();
    }
    let tidied = dir
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(tidied_name)
        .map(|(_, name)| dir.with_file_name(name));
    match tidied {
        Some(path) if fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) => {
            debug!(path = %path.display(), "Using tidied match directory");
            path
        }
        _ => dir.to_path_buf(),
    }
}

fn retention_key(dirname: &str) -> &str {
    match dirname.split('_').next() {
        Some(head) if !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()) => head,
        _ => UNKNOWN_PREFIX,
    }
}

async fn list_directories(root: &Path) -> Result<Vec<String>> {
    let mut entries = fs::read_dir(root).await?;
    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !name.starts_with('.') {
            dirs.push(name);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Rename match directories to their sort-prefixed form.
///
/// # Arguments
///
/// * `root` - Download root holding the match directories
/// * `only` - Limit renaming to directories of this date
///
/// # Returns
///
/// * `Ok(Vec<(old, new)>)` for every directory renamed
/// * `Err(Error::Io)` if the root cannot be listed; single rename failures
///   are logged and skipped
#[instrument(level = "info", skip_all, fields(root = %root.display()))]
pub async fn rename_directories(root: &Path, only: Option<NaiveDate>) -> Result<Vec<(String, String)>> {
    let wanted = only.map(|d| format!("{}月{}号", d.month(), d.day()));
    let mut renamed = Vec::new();

    for dirname in list_directories(root).await? {
        let Some((date, new_name)) = tidied_name(&dirname) else {
            debug!(%dirname, "Not a match directory");
            continue;
        };
        if wanted.as_deref().is_some_and(|w| w != date) {
            debug!(%dirname, "Not the target date");
            continue;
        }
        if new_name == dirname {
            continue;
        }
        match fs::rename(root.join(&dirname), root.join(&new_name)).await {
            Ok(()) => {
                info!(from = %dirname, to = %new_name, "Renamed match directory");
                renamed.push((dirname, new_name));
            }
            Err(e) => warn!(%dirname, error = %e, "Rename failed"),
        }
    }
    Ok(renamed)
}

/// Delete the oldest directories until at most `max_kept` remain.
#[instrument(level = "info", skip_all, fields(root = %root.display(), max_kept))]
pub async fn prune_directories(root: &Path, max_kept: usize) -> Result<Vec<String>> {
    let mut dirs = list_directories(root).await?;
    if dirs.len() <= max_kept {
        return Ok(Vec::new());
    }
    dirs.sort_by(|a, b| retention_key(b).cmp(retention_key(a)));
    let excess = dirs.len() - max_kept;

    let mut removed = Vec::with_capacity(excess);
    for dirname in dirs.into_iter().take(excess) {
        match fs::remove_dir_all(root.join(&dirname)).await {
            Ok(()) => {
                info!(%dirname, "Removed old directory");
                removed.push(dirname);
            }
            Err(e) => warn!(%dirname, error = %e, "Failed to remove directory"),
        }
    }
    Ok(removed)
}

/// Rename then prune the download root.
///
/// # Arguments
///
/// * `root` - Download root holding the match directories
/// * `only` - Rename only directories of this date; `None` renames all
/// * `max_kept` - How many directories survive pruning
///
/// # Returns
///
/// * `Ok(TidyReport)` with every rename and removal performed
/// * `Err(Error::Io)` if the root cannot be listed
pub async fn tidy(root: &Path, only: Option<NaiveDate>, max_kept: usize) -> Result<TidyReport> {
    let renamed = rename_directories(root, only).await?;
    let removed = prune_directories(root, max_kept).await?;
    info!(renamed = renamed.len(), removed = removed.len(), "Tidy complete");
    Ok(TidyReport { renamed, removed })
}

//! JSON run report.
//!
//! Each run writes `{download_root}/.reports/{target_date}.json`. A rerun for
//! the same target date replaces the previous report. The directory is
//! hidden so directory maintenance never counts it as a match directory.

use crate::error::Result;
use crate::models::RunSummary;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub const REPORT_DIR: &str = ".reports";

/// Write a [`RunSummary`] and return the path written.
#[instrument(level = "info", skip_all, fields(root = %download_root.display()))]
pub async fn write_report(summary: &RunSummary, download_root: &Path) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(summary)?;

    let report_dir = download_root.join(REPORT_DIR);
    if let Err(e) = fs::create_dir_all(&report_dir).await {
        error!(dir = %report_dir.display(), error = %e, "Failed to create report dir");
        return Err(e.into());
    }

    let path = report_dir.join(format!("{}.json", summary.target_date));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote run report");
    Ok(path)
}

//! External downloader invocation with fixed-delay retries.
//!
//! # Architecture
//!
//! - [`MediaDownload`]: one attempt at saving one link to disk
//! - [`YouGet`]: drives the `you-get` executable
//! - [`RetryDownload`]: decorator that repeats any [`MediaDownload`] up to a
//!   bounded number of attempts, sleeping the same delay between attempts
//!
//! [`already_downloaded`] is checked by the pipeline before any attempt.

use crate::config::{Config, Quality};
use crate::error::{Error, Result};
use crate::models::{DownloadOutcome, DownloadTask, LinkStatus, SourceType};
use crate::utils::truncate_for_log;
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Lines of stderr kept for the failure report.
const STDERR_TAIL_LINES: usize = 20;
const FAILURE_MARKER: &str = "[Failed]";

/// One download attempt.
pub trait MediaDownload {
    async fn download(&self, task: &DownloadTask) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct YouGet {
    program: PathBuf,
    quality: Quality,
    progress_interval: Duration,
}

impl YouGet {
    pub fn new(program: impl Into<PathBuf>, quality: Quality, progress_interval: Duration) -> Self {
        Self {
            program: program.into(),
            quality,
            progress_interval,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.downloader_program.clone(),
            config.preferred_quality,
            Duration::from_secs(config.progress_log_interval_secs),
        )
    }

    fn command(&self, task: &DownloadTask) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--debug")
            .arg("-o")
            .arg(&task.target_directory)
            .arg("-O")
            .arg(&task.target_filename)
            .arg(self.quality.downloader_arg())
            .arg(&task.link.url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl MediaDownload for YouGet {
    #[instrument(level = "info", skip_all, fields(url = %task.link.url, file = %task.target_filename))]
    async fn download(&self, task: &DownloadTask) -> Result<()> {
        if task.link.source_type != SourceType::Primary {
            return Err(Error::UnsupportedSource(format!("{:?}", task.link.source_type)));
        }
        tokio::fs::create_dir_all(&task.target_directory).await?;
        info!(
            dir = %task.target_directory.display(),
            program = %self.program.display(),
            "Starting downloader"
        );

        let mut child = self
            .command(task)
            .spawn()
            .map_err(|e| Error::Download(format!("cannot start {}: {e}", self.program.display())))?;

        let stderr_reader = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                let mut saw_failure = false;
                let mut lines = BufReader::new(stderr).split(b'\n');
                loop {
                    match lines.next_segment().await {
                        Ok(Some(raw)) => {
                            let line = String::from_utf8_lossy(&raw).into_owned();
                            saw_failure |= line.contains(FAILURE_MARKER);
                            if tail.len() == STDERR_TAIL_LINES {
                                tail.pop_front();
                            }
                            tail.push_back(line);
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!(error = %e, "Stopped reading downloader stderr");
                            break;
                        }
                    }
                }
                (Vec::from(tail), saw_failure)
            })
        });

        let mut saw_failure = false;
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).split(b'\n');
            let mut last_logged: Option<Instant> = None;
            loop {
                match lines.next_segment().await {
                    Ok(Some(raw)) => {
                        let line = String::from_utf8_lossy(&raw);
                        saw_failure |= line.contains(FAILURE_MARKER);
                        if last_logged.is_none_or(|t| t.elapsed() >= self.progress_interval) {
                            debug!(progress = %truncate_for_log(&line, 200), "Downloader output");
                            last_logged = Some(Instant::now());
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "Stopped reading downloader stdout");
                        break;
                    }
                }
            }
        }

        let status = child.wait().await?;
        let (stderr_tail, stderr_failure) = match stderr_reader {
            Some(handle) => handle.await.unwrap_or_default(),
            None => (Vec::new(), false),
        };

        if status.success() && !saw_failure && !stderr_failure {
            info!("Downloader finished");
            return Ok(());
        }
        let tail = stderr_tail.join("\n");
        warn!(%status, stderr = %truncate_for_log(&tail, 2000), "Downloader reported failure");
        Err(Error::Download(format!("{} exited with {status}", self.program.display())))
    }
}

/// Bounded fixed-delay retry around any [`MediaDownload`].
pub struct RetryDownload<T> {
    inner: T,
    max_attempts: u32,
    delay: Duration,
}

impl<T> RetryDownload<T> {
    pub fn new(inner: T, max_attempts: u32, delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for RetryDownload<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryDownload")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .finish()
    }
}

impl<T: MediaDownload> RetryDownload<T> {
    /// Attempt `task` until it succeeds or attempts run out. Unsupported
    /// sources fail immediately.
    #[instrument(level = "info", skip_all, fields(file = %task.target_filename))]
    pub async fn download(&self, task: &DownloadTask) -> DownloadOutcome {
        let t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.inner.download(task).await {
                Ok(()) => {
                    info!(attempt, elapsed_ms = t0.elapsed().as_millis() as u64, "Download succeeded");
                    return DownloadOutcome {
                        status: LinkStatus::Downloaded,
                        attempts: attempt,
                        error: None,
                    };
                }
                Err(e) => {
                    let permanent = matches!(e, Error::UnsupportedSource(_));
                    if permanent || attempt >= self.max_attempts {
                        error!(
                            attempt,
                            max = self.max_attempts,
                            elapsed_ms = t0.elapsed().as_millis() as u64,
                            error = %e,
                            "Download gave up"
                        );
                        return DownloadOutcome {
                            status: LinkStatus::Failed,
                            attempts: attempt,
                            error: Some(e.to_string()),
                        };
                    }
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        delay = ?self.delay,
                        error = %e,
                        "Download attempt failed; retrying"
                    );
                    sleep(self.delay).await;
                }
            }
        }
    }
}

/// True when `dir` already holds a file named `stem.<ext>` (or `stem`) of
/// at least `min_bytes`.
pub async fn already_downloaded(dir: &Path, stem: &str, min_bytes: u64) -> bool {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return false;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.file_stem().and_then(|s| s.to_str()) != Some(stem) {
            continue;
        }
        if let Ok(meta) = entry.metadata().await {
            if meta.is_file() && meta.len() >= min_bytes {
                debug!(path = %path.display(), bytes = meta.len(), "Found existing download");
                return true;
            }
        }
    }
    false
}

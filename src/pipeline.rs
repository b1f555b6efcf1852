//! The download orchestrator.
//!
//! One run walks `Discover → Filter → per match {ResolveLinks → per link
//! {BuildTask → DispatchWithRetry}} → Summarize`, strictly one match and one
//! link at a time. Only a listing fetch failure (or a missing renderer that
//! the config requires) aborts the run; everything else is recorded in the
//! [`RunSummary`].

use crate::config::Config;
use crate::downloader::{already_downloaded, MediaDownload, RetryDownload};
use crate::error::{Error, Result};
use crate::fetch::{FetchMode, PageFetch};
use crate::matching::{parse_month_day, DateMatcher, TrackedTeams};
use crate::models::{DownloadOutcome, DownloadTask, LinkReport, MatchCandidate, MatchReport, RunSummary};
use crate::naming;
use crate::scrapers::{detail, listing};
use crate::tidy;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub struct Pipeline<'a, F, D> {
    config: &'a Config,
    fetcher: &'a F,
    downloader: RetryDownload<D>,
    teams: TrackedTeams,
    dates: DateMatcher,
}

impl<'a, F: PageFetch, D: MediaDownload> Pipeline<'a, F, D> {
    pub fn new(config: &'a Config, fetcher: &'a F, downloader: D, dates: DateMatcher) -> Self {
        let downloader = RetryDownload::new(
            downloader,
            config.max_attempts,
            Duration::from_secs(config.retry_delay_secs),
        );
        Self {
            config,
            fetcher,
            downloader,
            teams: TrackedTeams::new(config.teams.iter().cloned()),
            dates,
        }
    }

    /// Scripted rendering for the listing when available, explicit plain
    /// fallback otherwise.
    fn listing_mode(&self) -> Result<FetchMode> {
        if self.fetcher.supports(FetchMode::Scripted) {
            return Ok(FetchMode::Scripted);
        }
        if self.config.require_scripted_rendering {
            return Err(Error::RenderingUnavailable(
                "listing page needs a headless browser".into(),
            ));
        }
        warn!("Scripted rendering unavailable; fetching listing page as plain HTML");
        Ok(FetchMode::Plain)
    }

    /// Fetch and parse the listing page.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<MatchCandidate>)` every well-formed entry, unfiltered
    /// * `Err(Error::ListingUnavailable)` when the page cannot be fetched
    /// * `Err(Error::RenderingUnavailable)` when scripted rendering is
    ///   required but no browser is available
    #[instrument(level = "info", skip(self))]
    pub async fn discover(&self) -> Result<Vec<MatchCandidate>> {
        let base_url = Url::parse(&self.config.base_url)?;
        let mode = self.listing_mode()?;
        let html = self
            .fetcher
            .fetch(&self.config.base_url, mode)
            .await
            .map_err(|e| Error::ListingUnavailable(e.to_string()))?;

        if self.config.save_listing_html {
            let path = self.config.download_root.join("debug_page.html");
            match tokio::fs::write(&path, &html).await {
                Ok(()) => debug!(path = %path.display(), "Saved listing markup"),
                Err(e) => warn!(path = %path.display(), error = %e, "Could not save listing markup"),
            }
        }

        listing::parse_listing(&html, &base_url, &self.teams)
    }

    /// Keep candidates accepted by both the date and the team check.
    pub fn filter(&self, candidates: Vec<MatchCandidate>) -> Vec<MatchCandidate> {
        candidates
            .into_iter()
            .filter(|c| self.dates.accepts(c) && self.teams.accepts(c))
            .inspect(|c| info!(title = %c.title, date = %c.title_date, "Found match"))
            .collect()
    }

    #[instrument(level = "info", skip_all, fields(title = %candidate.title))]
    async fn process_match(&self, candidate: &MatchCandidate) -> MatchReport {
        let date_text = naming_date(candidate);
        let base = naming::base_name(date_text, &candidate.title, &self.teams);
        let directory = tidy::current_directory(&naming::match_directory(
            &self.config.download_root,
            date_text,
            &candidate.title,
            &self.teams,
        ))
        .await;

        let links = match detail::resolve_links(
            self.fetcher,
            &candidate.detail_url,
            self.config.include_secondary_sources,
        )
        .await
        {
            Ok(links) => links,
            Err(e) => {
                error!(error = %e, "Failed to get video links for match");
                return MatchReport {
                    title: candidate.title.clone(),
                    detail_url: candidate.detail_url.clone(),
                    directory,
                    links: Vec::new(),
                    error: Some(e.to_string()),
                    success: false,
                };
            }
        };

        let mut reports = Vec::with_capacity(links.len());
        for link in links {
            let task = DownloadTask {
                target_directory: directory.clone(),
                target_filename: naming::file_name(&base, link.quarter),
                link,
            };
            let outcome = if already_downloaded(
                &task.target_directory,
                &task.target_filename,
                self.config.min_existing_bytes,
            )
            .await
            {
                info!(file = %task.target_filename, "Already downloaded; skipping");
                DownloadOutcome::already_present()
            } else {
                self.downloader.download(&task).await
            };
            if !outcome.is_success() {
                error!(label = %task.link.raw_label, url = %task.link.url, "Failed to download video");
            }
            reports.push(LinkReport {
                url: task.link.url,
                filename: task.target_filename,
                quarter: task.link.quarter,
                outcome,
            });
        }

        let success = reports.iter().all(|r| r.outcome.is_success());
        MatchReport {
            title: candidate.title.clone(),
            detail_url: candidate.detail_url.clone(),
            directory,
            links: reports,
            error: None,
            success,
        }
    }

    /// Run the whole pipeline once for the target day.
    ///
    /// Matches and links are processed one at a time. A failing match is
    /// recorded and the run moves on to the next one.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` with a report for every eligible match
    /// * `Err(_)` only when discovery fails, before anything is downloaded
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self) -> Result<RunSummary> {
        info!(
            base_url = %self.config.base_url,
            root = %self.config.download_root.display(),
            teams = %self.teams.names().iter().join(", "),
            target = %self.dates.target(),
            "Starting run"
        );

        let candidates = self.discover().await?;
        let eligible = self.filter(candidates);
        if eligible.is_empty() {
            info!("No matches found for the target date");
        } else {
            info!(count = eligible.len(), "Matches to download");
        }

        let matches: Vec<MatchReport> = stream::iter(eligible)
            .then(move |candidate| async move { self.process_match(&candidate).await })
            .collect()
            .await;

        for report in matches.iter().filter(|m| !m.success) {
            error!(title = %report.title, "Failed to process match");
        }

        let summary = RunSummary {
            target_date: self.dates.target(),
            eligible: matches.len(),
            successful: matches.iter().filter(|m| m.success).count(),
            matches,
        };
        info!(eligible = summary.eligible, successful = summary.successful, "Run complete");
        Ok(summary)
    }
}

/// The first parsable date text of a candidate, the title date otherwise.
fn naming_date(candidate: &MatchCandidate) -> &str {
    candidate
        .date_texts()
        .into_iter()
        .find(|t| parse_month_day(t).is_some())
        .unwrap_or(&candidate.title_date)
}

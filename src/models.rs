//! Data models shared by the pipeline stages.
//!
//! - [`MatchCandidate`]: one entry scraped from the listing page
//! - [`VideoLink`]: one downloadable anchor from a match's detail page
//! - [`DownloadTask`]: a link bound to its target directory and filename
//! - [`DownloadOutcome`], [`MatchReport`], [`RunSummary`]: results, serialized
//!   into the run report

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::path::PathBuf;

/// One match entry from the listing page. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    /// `"{team1}vs{team2}"` when two teams were identified, else the raw title.
    pub title: String,
    /// Title text exactly as scraped.
    pub raw_title: String,
    /// Absolute detail page URL.
    pub detail_url: String,
    /// Text of the separate date label element.
    pub raw_date_text: String,
    /// First whitespace-delimited token of the raw title.
    pub title_date: String,
}

impl MatchCandidate {
    /// Date texts to try when matching, title date first.
    pub fn date_texts(&self) -> [&str; 2] {
        [self.title_date.as_str(), self.raw_date_text.as_str()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Weibo-hosted video, the only kind the downloader accepts.
    Primary,
    /// Localized QQ video.
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
    #[serde(rename = "OT")]
    Ot,
}

impl Quarter {
    /// Markers searched for in anchor text, first match wins.
    pub const ALL: [Quarter; 5] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4, Quarter::Ot];

    /// The text marker this quarter is detected by.
    pub fn marker(self) -> &'static str {
        match self {
            Quarter::Q1 => "第一节",
            Quarter::Q2 => "第二节",
            Quarter::Q3 => "第三节",
            Quarter::Q4 => "第四节",
            Quarter::Ot => "加时",
        }
    }

    /// Suffix used in filenames.
    pub fn label(self) -> &'static str {
        match self {
            Quarter::Q1 => "1",
            Quarter::Q2 => "2",
            Quarter::Q3 => "3",
            Quarter::Q4 => "4",
            Quarter::Ot => "OT",
        }
    }

    pub fn detect(text: &str) -> Option<Quarter> {
        Quarter::ALL.into_iter().find(|q| text.contains(q.marker()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoLink {
    pub source_type: SourceType,
    pub url: String,
    pub raw_label: String,
    pub quarter: Option<Quarter>,
    pub priority: u8,
}

impl VideoLink {
    /// Priority descending, then the raw quarter marker ascending
    /// (code-point order, an unlabeled link sorts first among ties).
    fn sort_key(&self) -> (Reverse<u8>, &'static str) {
        (Reverse(self.priority), self.quarter.map(Quarter::marker).unwrap_or(""))
    }
}

/// Stable in-place ordering of resolved links.
pub fn sort_links(links: &mut [VideoLink]) {
    links.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub link: VideoLink,
    pub target_directory: PathBuf,
    /// Filename without extension.
    pub target_filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Downloaded,
    AlreadyPresent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    pub status: LinkStatus,
    /// Downloader invocations made; zero when the file was already present.
    pub attempts: u32,
    pub error: Option<String>,
}

impl DownloadOutcome {
    pub fn already_present() -> Self {
        Self {
            status: LinkStatus::AlreadyPresent,
            attempts: 0,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != LinkStatus::Failed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkReport {
    pub url: String,
    pub filename: String,
    pub quarter: Option<Quarter>,
    pub outcome: DownloadOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub title: String,
    pub detail_url: String,
    pub directory: PathBuf,
    pub links: Vec<LinkReport>,
    /// Set when link resolution failed.
    pub error: Option<String>,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub target_date: NaiveDate,
    pub eligible: usize,
    pub successful: usize,
    pub matches: Vec<MatchReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn link(priority: u8, quarter: Option<Quarter>, url: &str) -> VideoLink {
        VideoLink {
            source_type: SourceType::Primary,
            url: url.to_string(),
            raw_label: String::new(),
            quarter,
            priority,
        }
    }

    #[test]
    fn test_high_priority_sorts_first_regardless_of_quarter() {
        let mut links = vec![
            link(1, None, "a"),
            link(2, Some(Quarter::Q1), "b"),
            link(1, Some(Quarter::Q2), "c"),
        ];
        sort_links(&mut links);
        let order: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let mut links = vec![link(1, None, "first"), link(1, None, "second")];
        sort_links(&mut links);
        assert_eq!(links[0].url, "first");
        assert_eq!(links[1].url, "second");
    }

    #[test]
    fn test_quarter_tie_break_is_code_point_order() {
        // 一 (U+4E00) < 三 (U+4E09) < 二 (U+4E8C) < 四 (U+56DB)
        let mut links = vec![
            link(1, Some(Quarter::Q4), "q4"),
            link(1, Some(Quarter::Q2), "q2"),
            link(1, Some(Quarter::Q3), "q3"),
            link(1, Some(Quarter::Q1), "q1"),
        ];
        sort_links(&mut links);
        let order: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(order, vec!["q1", "q3", "q2", "q4"]);
    }

    #[test]
    fn test_quarter_detection() {
        assert_eq!(Quarter::detect("微博 国语 第一节"), Some(Quarter::Q1));
        assert_eq!(Quarter::detect("微博 加时"), Some(Quarter::Ot));
        assert_eq!(Quarter::detect("微博 全场"), None);
        assert_eq!(Quarter::Ot.label(), "OT");
        assert_eq!(Quarter::Q3.label(), "3");
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = DownloadOutcome::already_present();
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("already_present"));
        assert!(outcome.is_success());
    }
}

//! Run output beyond the downloaded media.
//!
//! - [`json`]: writes the [`RunSummary`](crate::models::RunSummary) of a run
//!
//! # Output Structure
//!
//! ```text
//! download_root/
//! ├── .reports/
//! │   └── 2025-01-05.json
//! ├── 1月5号湖人vs勇士/
//! │   ├── 1月5号湖人vs勇士_1.mp4
//! │   └── 1月5号湖人vs勇士_2.mp4
//! └── nba_downloader.log
//! ```

pub mod json;

//! Error taxonomy for the downloader pipeline.
//!
//! Only a few variants are terminal for a run: [`Error::ListingUnavailable`],
//! [`Error::RenderingUnavailable`] and [`Error::Config`]. Everything else is
//! caught by the stage that produced it and recorded against a single match
//! or link.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A single page could not be fetched.
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Scripted rendering was required but no headless browser is available.
    #[error("scripted rendering unavailable: {0}")]
    RenderingUnavailable(String),

    /// The listing page could not be fetched; nothing else can run.
    #[error("listing page unavailable: {0}")]
    ListingUnavailable(String),

    /// The detail page yielded no qualifying video links.
    #[error("no video links found at {0}")]
    NoLinks(String),

    /// One downloader attempt failed.
    #[error("download failed: {0}")]
    Download(String),

    #[error("unsupported video source: {0}")]
    UnsupportedSource(String),

    #[error("invalid selector: {0}")]
    Selector(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let e = Error::Fetch {
            url: "https://example.com/a".to_string(),
            reason: "HTTP 503".to_string(),
        };
        assert_eq!(e.to_string(), "failed to fetch https://example.com/a: HTTP 503");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: Error = io.into();
        assert!(matches!(e, Error::Io(_)));
    }
}

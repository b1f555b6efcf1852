//! Page fetching strategies.
//!
//! The listing page is filled in by client-side script, so it needs a real
//! browser ([`ScriptedFetcher`], driven through `headless_chrome`). Detail
//! pages are static and go through plain HTTP ([`PlainFetcher`]). The
//! [`Fetcher`] bundle always carries the plain strategy and carries the
//! scripted one only when a browser could be launched; callers ask
//! [`PageFetch::supports`] and pick a mode explicitly.

use crate::config::Config;
use crate::error::{Error, Result};
use headless_chrome::{Browser, LaunchOptions};
use rand::{rng, Rng};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Execute the page's scripts before reading the markup.
    Scripted,
    Plain,
}

/// Something that turns a URL into raw markup.
pub trait PageFetch {
    fn supports(&self, mode: FetchMode) -> bool;

    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct PlainFetcher {
    client: reqwest::Client,
}

impl PlainFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    #[instrument(level = "info", skip(self))]
    pub async fn get(&self, url: &str) -> Result<String> {
        let fetch_err = |reason: String| Error::Fetch {
            url: url.to_string(),
            reason,
        };
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }
        let body = resp.text().await.map_err(|e| fetch_err(e.to_string()))?;
        debug!(bytes = body.len(), "Fetched page over HTTP");
        Ok(body)
    }
}

/// A long-lived headless Chrome instance, one tab per fetch.
pub struct ScriptedFetcher {
    browser: Browser,
    user_agent: String,
    settle: Duration,
}

impl std::fmt::Debug for ScriptedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedFetcher")
            .field("user_agent", &self.user_agent)
            .field("settle", &self.settle)
            .finish()
    }
}

impl ScriptedFetcher {
    pub fn launch(user_agent: &str, settle: Duration) -> Result<Self> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some((1920, 1080)))
            .build()
            .map_err(|e| Error::RenderingUnavailable(e.to_string()))?;
        let browser =
            Browser::new(options).map_err(|e| Error::RenderingUnavailable(e.to_string()))?;
        info!("Headless browser launched");
        Ok(Self {
            browser,
            user_agent: user_agent.to_string(),
            settle,
        })
    }

    #[instrument(level = "info", skip(self))]
    pub async fn get(&self, url: &str) -> Result<String> {
        let browser = self.browser.clone();
        let user_agent = self.user_agent.clone();
        let target = url.to_string();
        let jitter_ms: u64 = rng().random_range(0..=1000);
        let settle = self.settle + Duration::from_millis(jitter_ms);
        let t0 = Instant::now();

        let rendered = tokio::task::spawn_blocking(move || -> std::result::Result<String, String> {
            let tab = browser.new_tab().map_err(|e| e.to_string())?;
            close_after(
                || {
                    tab.set_user_agent(&user_agent, None, None)
                        .map_err(|e| e.to_string())?;
                    tab.navigate_to(&target).map_err(|e| e.to_string())?;
                    tab.wait_until_navigated().map_err(|e| e.to_string())?;
                    std::thread::sleep(settle);
                    tab.get_content().map_err(|e| e.to_string())
                },
                || tab.close(true),
            )
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|inner| inner)
        .map_err(|reason| Error::Fetch {
            url: url.to_string(),
            reason,
        })?;

        debug!(
            bytes = rendered.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page through headless browser"
        );
        Ok(rendered)
    }
}

/// Run `steps` on an open tab, then `close` it whether or not the steps
/// succeeded. A failed close is only logged.
fn close_after<T, C, E: std::fmt::Display>(
    steps: impl FnOnce() -> std::result::Result<T, String>,
    close: impl FnOnce() -> std::result::Result<C, E>,
) -> std::result::Result<T, String> {
    let outcome = steps();
    if let Err(e) = close() {
        debug!(error = %e, "Could not close browser tab");
    }
    outcome
}

/// The fetch capability handed to the pipeline.
#[derive(Debug)]
pub struct Fetcher {
    plain: PlainFetcher,
    scripted: Option<ScriptedFetcher>,
}

impl Fetcher {
    pub fn new(plain: PlainFetcher, scripted: Option<ScriptedFetcher>) -> Self {
        Self { plain, scripted }
    }

    /// Build both strategies. A browser launch failure is terminal only
    /// when the config requires scripted rendering.
    pub fn from_config(config: &Config) -> Result<Self> {
        let plain = PlainFetcher::new(
            &config.user_agent,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        let scripted = match ScriptedFetcher::launch(
            &config.user_agent,
            Duration::from_secs(config.render_settle_secs),
        ) {
            Ok(s) => Some(s),
            Err(e) if config.require_scripted_rendering => return Err(e),
            Err(e) => {
                warn!(error = %e, "Headless browser unavailable; only plain fetching is possible");
                None
            }
        };
        Ok(Self::new(plain, scripted))
    }
}

impl PageFetch for Fetcher {
    fn supports(&self, mode: FetchMode) -> bool {
        match mode {
            FetchMode::Plain => true,
            FetchMode::Scripted => self.scripted.is_some(),
        }
    }

    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<String> {
        match (mode, &self.scripted) {
            (FetchMode::Scripted, Some(scripted)) => scripted.get(url).await,
            (FetchMode::Scripted, None) => Err(Error::RenderingUnavailable(
                "no headless browser was launched".into(),
            )),
            (FetchMode::Plain, _) => self.plain.get(url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> PlainFetcher {
        PlainFetcher::new("nba-test-agent", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_plain_fetch_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/video-1.html")
            .match_header("user-agent", "nba-test-agent")
            .with_status(200)
            .with_body("<html><body>ok</body></html>")
            .create_async()
            .await;

        let body = plain()
            .get(&format!("{}/video-1.html", server.url()))
            .await
            .unwrap();
        assert!(body.contains("ok"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_plain_fetch_non_success_is_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let err = plain()
            .get(&format!("{}/missing", server.url()))
            .await
            .unwrap_err();
        match err {
            Error::Fetch { reason, .. } => assert!(reason.contains("404")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tab_is_closed_when_steps_fail() {
        let closed = std::cell::Cell::new(false);
        let outcome: std::result::Result<String, String> = close_after(
            || Err("navigation timed out".to_string()),
            || -> std::result::Result<bool, String> {
                closed.set(true);
                Ok(true)
            },
        );
        assert_eq!(outcome.unwrap_err(), "navigation timed out");
        assert!(closed.get());
    }

    #[test]
    fn test_failed_close_keeps_rendered_content() {
        let outcome = close_after(
            || Ok("<html></html>".to_string()),
            || -> std::result::Result<bool, String> { Err("tab already gone".into()) },
        );
        assert_eq!(outcome.unwrap(), "<html></html>");
    }

    #[tokio::test]
    async fn test_fetcher_without_browser_refuses_scripted() {
        let fetcher = Fetcher::new(plain(), None);
        assert!(fetcher.supports(FetchMode::Plain));
        assert!(!fetcher.supports(FetchMode::Scripted));
        let err = fetcher
            .fetch("http://127.0.0.1:9/never", FetchMode::Scripted)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RenderingUnavailable(_)));
    }
}

//! Detail page link resolution.
//!
//! Video anchors sit in two containers, `#lx` (full replays) and `#jj`
//! (highlights), as `li.cd a`. Weibo anchors are the primary source; an
//! anchor marked `国语` is the Mandarin commentary track and ranks above the
//! rest.

use super::listing::{element_text, selector};
use crate::error::{Error, Result};
use crate::fetch::{FetchMode, PageFetch};
use crate::models::{sort_links, Quarter, SourceType, VideoLink};
use scraper::Html;
use tracing::{debug, error, info, instrument};
use url::Url;

const PRIMARY_SELECTOR: &str = "#lx li.cd a, #jj li.cd a";
const SECONDARY_SELECTOR: &str = "#lx li.cd a";

const PRIMARY_MARKER: &str = "微博";
const SECONDARY_MARKER: &str = "QQ";
const LOCALIZED_MARKER: &str = "国语";

/// Extract and rank every qualifying anchor in `html`.
pub fn parse_detail(html: &str, page_url: &Url, include_secondary: bool) -> Result<Vec<VideoLink>> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    let primary = selector(PRIMARY_SELECTOR)?;
    for anchor in document.select(&primary) {
        let text = element_text(&anchor);
        if !text.contains(PRIMARY_MARKER) {
            continue;
        }
        let Some(url) = anchor.value().attr("href").and_then(|h| page_url.join(h).ok()) else {
            debug!(%text, "Primary anchor without usable href");
            continue;
        };
        let priority = if text.contains(LOCALIZED_MARKER) { 2 } else { 1 };
        info!(%url, priority, "Found primary video");
        links.push(VideoLink {
            source_type: SourceType::Primary,
            url: url.to_string(),
            quarter: Quarter::detect(&text),
            raw_label: text,
            priority,
        });
    }

    if include_secondary {
        let secondary = selector(SECONDARY_SELECTOR)?;
        for anchor in document.select(&secondary) {
            let text = element_text(&anchor);
            if !(text.contains(SECONDARY_MARKER) && text.contains(LOCALIZED_MARKER)) {
                continue;
            }
            let Some(url) = anchor.value().attr("href").and_then(|h| page_url.join(h).ok()) else {
                continue;
            };
            info!(%url, "Found secondary video");
            links.push(VideoLink {
                source_type: SourceType::Secondary,
                url: url.to_string(),
                quarter: Quarter::detect(&text),
                raw_label: text,
                priority: 1,
            });
        }
    }

    sort_links(&mut links);
    Ok(links)
}

/// Fetch a detail page over plain HTTP and resolve its links.
///
/// # Arguments
///
/// * `fetcher` - Page fetcher; only [`FetchMode::Plain`] is used
/// * `detail_url` - Absolute URL of the match's detail page
/// * `include_secondary` - Also collect localized QQ anchors
///
/// # Returns
///
/// * `Ok(Vec<VideoLink>)` non-empty, highest priority first
/// * `Err(Error::NoLinks)` when the page is unreachable or has no
///   qualifying anchors
#[instrument(level = "info", skip(fetcher))]
pub async fn resolve_links<F: PageFetch>(
    fetcher: &F,
    detail_url: &str,
    include_secondary: bool,
) -> Result<Vec<VideoLink>> {
    let page_url = Url::parse(detail_url)?;
    let html = match fetcher.fetch(detail_url, FetchMode::Plain).await {
        Ok(html) => html,
        Err(e) => {
            error!(error = %e, "Detail page fetch failed");
            return Err(Error::NoLinks(detail_url.to_string()));
        }
    };
    let links = parse_detail(&html, &page_url, include_secondary)?;
    if links.is_empty() {
        return Err(Error::NoLinks(detail_url.to_string()));
    }
    info!(count = links.len(), "Resolved video links");
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::file_name;
    use pretty_assertions::assert_eq;

    const DETAIL: &str = r#"
        <html><body>
          <div id="lx"><ul>
            <li class="cd"><a href="https://weibo.com/tv/show/1">微博 第二节</a></li>
            <li class="cd"><a href="https://weibo.com/tv/show/2">微博 国语 第一节</a></li>
            <li class="cd"><a href="https://v.qq.com/x/3">QQ 国语 第一节</a></li>
            <li class="cd"><a href="https://v.qq.com/x/4">QQ 英文 第一节</a></li>
            <li class="cd"><a>微博 第三节</a></li>
          </ul></div>
          <div id="jj"><ul>
            <li class="cd"><a href="/play/5">微博 集锦</a></li>
          </ul></div>
          <div id="other"><ul>
            <li class="cd"><a href="https://weibo.com/tv/show/6">微博 第四节</a></li>
          </ul></div>
        </body></html>
    "#;

    fn page() -> Url {
        Url::parse("https://www.yoozhibo.net/lanqiu/nba/video-1001.html").unwrap()
    }

    #[test]
    fn test_localized_link_ranks_first() {
        let links = parse_detail(DETAIL, &page(), false).unwrap();
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://weibo.com/tv/show/2",
                "https://www.yoozhibo.net/play/5",
                "https://weibo.com/tv/show/1",
            ]
        );
        assert_eq!(links[0].priority, 2);
        assert_eq!(links[0].quarter, Some(Quarter::Q1));
        assert_eq!(links[1].quarter, None);
        assert!(links.iter().all(|l| l.source_type == SourceType::Primary));
    }

    #[test]
    fn test_quarter_filenames_follow_order() {
        let html = r#"<div id="lx">
            <li class="cd"><a href="https://weibo.com/a">微博 第二节</a></li>
            <li class="cd"><a href="https://weibo.com/b">微博 国语 第一节</a></li></div>"#;
        let links = parse_detail(html, &page(), false).unwrap();
        let names: Vec<String> = links
            .iter()
            .map(|l| file_name("1月5号湖人vs勇士", l.quarter))
            .collect();
        assert_eq!(names, vec!["1月5号湖人vs勇士_1", "1月5号湖人vs勇士_2"]);
    }

    #[test]
    fn test_secondary_links_only_when_enabled() {
        let links = parse_detail(DETAIL, &page(), true).unwrap();
        let secondary: Vec<&VideoLink> = links
            .iter()
            .filter(|l| l.source_type == SourceType::Secondary)
            .collect();
        assert_eq!(secondary.len(), 1);
        assert_eq!(secondary[0].url, "https://v.qq.com/x/3");
        assert_eq!(secondary[0].priority, 1);
    }

    #[test]
    fn test_page_without_markers_is_empty() {
        let html = r#"<div id="lx"><li class="cd"><a href="/x">腾讯 第一节</a></li></div>"#;
        assert!(parse_detail(html, &page(), false).unwrap().is_empty());
    }
}

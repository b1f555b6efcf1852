//! Listing page parser.
//!
//! The listing renders one `li.c` per match inside `.wrap-body`, each with
//! an `<em>` date label and an anchor to a `/video-…` detail page whose text
//! looks like `01月05日 NBA常规赛 湖人 vs 勇士 录像`.

use crate::error::{Error, Result};
use crate::matching::TrackedTeams;
use crate::models::MatchCandidate;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

const ITEM_SELECTOR: &str = ".wrap-body li.c";
const DATE_SELECTOR: &str = "em";
const LINK_SELECTOR: &str = r#"a[href*="/video-"]"#;

/// Titles shorter than `<date> <league> <team> vs <team>` are not matches.
const MIN_TITLE_TOKENS: usize = 4;

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Selector(format!("{css}: {e}")))
}

pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Shorten a title to `"{team1}vs{team2}"`.
///
/// Two or more tracked teams win, in configured order. Otherwise the tokens
/// directly around the first literal `vs` are used, and failing that the
/// title is returned unchanged.
pub fn simplify_title(title: &str, teams: &TrackedTeams) -> String {
    if let [first, second, ..] = teams.present_in(title).as_slice() {
        return format!("{first}vs{second}");
    }
    let Some(idx) = title.find("vs") else {
        return title.to_string();
    };
    let before = title[..idx].split_whitespace().last().unwrap_or_default();
    let after = title[idx + 2..].split_whitespace().next().unwrap_or_default();
    format!("{before}vs{after}")
}

/// Parse every well-formed match entry of a listing page.
///
/// An entry needs a date element, a `/video-` anchor with a resolvable
/// href, and a title of at least four tokens. Anything else is skipped.
///
/// # Arguments
///
/// * `html` - The rendered listing markup
/// * `base_url` - URL the page was fetched from, for resolving hrefs
/// * `teams` - Tracked teams, used to simplify titles
///
/// # Returns
///
/// * `Ok(Vec<MatchCandidate>)` in page order, possibly empty
/// * `Err(Error::Selector)` only if a selector fails to compile
#[instrument(level = "info", skip_all, fields(%base_url))]
pub fn parse_listing(html: &str, base_url: &Url, teams: &TrackedTeams) -> Result<Vec<MatchCandidate>> {
    let document = Html::parse_document(html);
    let item_selector = selector(ITEM_SELECTOR)?;
    let date_selector = selector(DATE_SELECTOR)?;
    let link_selector = selector(LINK_SELECTOR)?;

    let mut candidates = Vec::new();
    for item in document.select(&item_selector) {
        let Some(date_elem) = item.select(&date_selector).next() else {
            debug!("No date element found");
            continue;
        };
        let raw_date_text = element_text(&date_elem);

        let Some(link_elem) = item.select(&link_selector).next() else {
            debug!(date = %raw_date_text, "No detail link found");
            continue;
        };
        let raw_title = element_text(&link_elem);

        let tokens: Vec<&str> = raw_title.split_whitespace().collect();
        if tokens.len() < MIN_TITLE_TOKENS {
            debug!(title = %raw_title, "Title too short; skipping");
            continue;
        }
        let title_date = tokens[0].to_string();

        let Some(href) = link_elem.value().attr("href") else {
            continue;
        };
        let detail_url = match base_url.join(href) {
            Ok(u) => u.to_string(),
            Err(e) => {
                debug!(%href, error = %e, "Unresolvable detail href");
                continue;
            }
        };

        let title = simplify_title(&raw_title, teams);
        debug!(%title, %title_date, %raw_date_text, "Parsed listing entry");
        candidates.push(MatchCandidate {
            title,
            raw_title,
            detail_url,
            raw_date_text,
            title_date,
        });
    }

    info!(count = candidates.len(), "Parsed listing entries");
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::DateMatcher;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const LISTING: &str = r#"
        <html><body><div class="wrap-body"><ul>
          <li class="c"><em>01-05</em>
            <a href="/lanqiu/nba/video-1001.html">01月05日 NBA常规赛 湖人 vs 勇士 录像</a></li>
          <li class="c"><em>01-05</em>
            <a href="/lanqiu/nba/video-1002.html">01月05日 NBA常规赛 湖人 vs 快船 录像</a></li>
          <li class="c">
            <a href="/lanqiu/nba/video-1003.html">01月05日 NBA常规赛 勇士 vs 太阳 录像</a></li>
          <li class="c"><em>01-05</em>
            <a href="/lanqiu/nba/news-1004.html">01月05日 NBA常规赛 独行侠 vs 雷霆 录像</a></li>
          <li class="c"><em>01-05</em>
            <a href="/lanqiu/nba/video-1005.html">湖人 vs 勇士</a></li>
          <li class="c"><em>01-04</em>
            <a href="/lanqiu/nba/video-1006.html">01月04日 NBA常规赛 凯尔特人 vs 热火 录像</a></li>
        </ul></div></body></html>
    "#;

    fn teams() -> TrackedTeams {
        TrackedTeams::new(["湖人", "勇士"])
    }

    fn base() -> Url {
        Url::parse("https://www.yoozhibo.net/lanqiu/nba/video-p1.html").unwrap()
    }

    #[test]
    fn test_parse_listing_skips_malformed_entries() {
        let candidates = parse_listing(LISTING, &base(), &teams()).unwrap();
        let urls: Vec<&str> = candidates.iter().map(|c| c.detail_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.yoozhibo.net/lanqiu/nba/video-1001.html",
                "https://www.yoozhibo.net/lanqiu/nba/video-1002.html",
                "https://www.yoozhibo.net/lanqiu/nba/video-1006.html",
            ]
        );
    }

    #[test]
    fn test_two_tracked_teams_simplify_title() {
        let candidates = parse_listing(LISTING, &base(), &teams()).unwrap();
        let first = &candidates[0];
        assert_eq!(first.title, "湖人vs勇士");
        assert_eq!(first.title_date, "01月05日");
        assert_eq!(first.raw_date_text, "01-05");
        assert_eq!(first.raw_title, "01月05日 NBA常规赛 湖人 vs 勇士 录像");
    }

    #[test]
    fn test_vs_fallback_for_single_tracked_team() {
        let candidates = parse_listing(LISTING, &base(), &teams()).unwrap();
        assert_eq!(candidates[1].title, "湖人vs快船");
        assert_eq!(candidates[2].title, "凯尔特人vs热火");
    }

    #[test]
    fn test_simplify_title_without_vs() {
        assert_eq!(simplify_title("01月05日 NBA 全明星 正赛", &teams()), "01月05日 NBA 全明星 正赛");
        assert_eq!(simplify_title("勇士 对阵 湖人 录像", &teams()), "湖人vs勇士");
    }

    #[test]
    fn test_yesterday_entry_is_accepted() {
        let html = r#"<div class="wrap-body"><li class="c"><em>01-05</em>
            <a href="/video-9.html">01月05日 NBA常规赛 湖人 vs 勇士 录像</a></li></div>"#;
        let teams = teams();
        let candidates = parse_listing(html, &base(), &teams).unwrap();
        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.title, "湖人vs勇士");

        let today = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let dates = DateMatcher::new(today, 1).unwrap();
        assert!(dates.accepts(candidate));
        assert!(teams.accepts(candidate));
    }
}

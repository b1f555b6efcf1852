//! Page scrapers for the replay site.
//!
//! Scraping happens in two phases, mirroring the site's structure:
//!
//! 1. **Listing**: [`listing::parse_listing`] turns the (script-rendered)
//!    listing page into [`MatchCandidate`](crate::models::MatchCandidate)s
//! 2. **Detail**: [`detail::resolve_links`] fetches one match's detail page
//!    and returns its ranked [`VideoLink`](crate::models::VideoLink)s
//!
//! Both parsers skip malformed entries with a `debug!` line instead of
//! failing; only fetch failures surface as errors.

pub mod detail;
pub mod listing;

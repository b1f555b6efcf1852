//! Filesystem naming for match directories and per-link files.
//!
//! Directories are `{M}月{D}号{team1}vs{team2}` under the download root and
//! files are the same base name plus an optional `_{quarter}` suffix. Every
//! name passes through [`sanitize`], which strips (never replaces) the
//! characters `< > : " / \ | ? *`.

use crate::matching::{parse_month_day, TrackedTeams};
use crate::models::Quarter;
use std::path::{Path, PathBuf};

const ILLEGAL: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

pub fn sanitize(name: &str) -> String {
    name.chars().filter(|c| !ILLEGAL.contains(c)).collect()
}

/// `1月5号` for any parsable rendering; the raw text otherwise.
pub fn format_date(date_text: &str) -> String {
    match parse_month_day(date_text) {
        Some((month, day)) => format!("{month}月{day}号"),
        None => date_text.trim().to_string(),
    }
}

/// `"{team1}vs{team2}"` from the first two tracked teams in the title, or
/// the title itself when fewer than two are present.
pub fn team_string(title: &str, teams: &TrackedTeams) -> String {
    match teams.present_in(title).as_slice() {
        [first, second, ..] => format!("{first}vs{second}"),
        _ => title.to_string(),
    }
}

/// Sanitized base name shared by the directory and its files.
///
/// # Arguments
///
/// * `date_text` - The candidate's date text, in any parsable rendering
/// * `title` - The candidate's simplified title
/// * `teams` - Tracked teams, for the `{team1}vs{team2}` part
///
/// # Returns
///
/// `{M}月{D}号{teams}` with illegal characters stripped, e.g.
/// `1月5号湖人vs勇士`.
pub fn base_name(date_text: &str, title: &str, teams: &TrackedTeams) -> String {
    sanitize(&format!("{}{}", format_date(date_text), team_string(title, teams)))
}

/// [`base_name`] joined onto the download root.
pub fn match_directory(root: &Path, date_text: &str, title: &str, teams: &TrackedTeams) -> PathBuf {
    root.join(base_name(date_text, title, teams))
}

/// `{base}_{1|2|3|4|OT}`, or `base` alone for an unlabeled link.
pub fn file_name(base: &str, quarter: Option<Quarter>) -> String {
    match quarter {
        Some(q) => sanitize(&format!("{base}_{}", q.label())),
        None => sanitize(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn teams() -> TrackedTeams {
        TrackedTeams::new(["湖人", "勇士", "独行侠"])
    }

    #[test]
    fn test_sanitize_strips_illegal_characters() {
        assert_eq!(sanitize(r#"a<b>c:d"e/f\g|h?i*j"#), "abcdefghij");
        assert_eq!(sanitize("湖人vs勇士"), "湖人vs勇士");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for raw in [r#"1月5号 湖人/勇士?"#, "***", "plain", r#"<>:"/\|?*"#] {
            let once = sanitize(raw);
            assert_eq!(sanitize(&once), once);
            assert!(!once.chars().any(|c| ILLEGAL.contains(&c)));
        }
    }

    #[test]
    fn test_distinct_names_may_collapse() {
        assert_eq!(sanitize("a/b"), sanitize("a|b"));
    }

    #[test]
    fn test_format_date_is_never_zero_padded() {
        assert_eq!(format_date("01月05日"), "1月5号");
        assert_eq!(format_date("1月5号"), "1月5号");
        assert_eq!(format_date("12月25日"), "12月25号");
        assert_eq!(format_date("昨天"), "昨天");
    }

    #[test]
    fn test_team_string() {
        assert_eq!(team_string("湖人vs勇士", &teams()), "湖人vs勇士");
        assert_eq!(team_string("勇士 对 湖人", &teams()), "湖人vs勇士");
        assert_eq!(team_string("湖人vs快船", &teams()), "湖人vs快船");
    }

    #[test]
    fn test_match_directory() {
        let dir = match_directory(Path::new("/downloads"), "01月05日", "湖人vs勇士", &teams());
        assert_eq!(dir, PathBuf::from("/downloads/1月5号湖人vs勇士"));
    }

    #[test]
    fn test_directory_name_is_sanitized() {
        let base = base_name("01月05日", "热火/快船?", &teams());
        assert_eq!(base, "1月5号热火快船");
    }

    #[test]
    fn test_file_names() {
        assert_eq!(file_name("1月5号湖人vs勇士", Some(Quarter::Q1)), "1月5号湖人vs勇士_1");
        assert_eq!(file_name("1月5号湖人vs勇士", Some(Quarter::Q2)), "1月5号湖人vs勇士_2");
        assert_eq!(file_name("1月5号湖人vs勇士", Some(Quarter::Ot)), "1月5号湖人vs勇士_OT");
        assert_eq!(file_name("1月5号湖人vs勇士", None), "1月5号湖人vs勇士");
    }
}

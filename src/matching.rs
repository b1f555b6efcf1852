//! Candidate acceptance: the target-date check and the tracked-team check.

use crate::error::{Error, Result};
use crate::models::MatchCandidate;
use chrono::{Datelike, Days, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static MONTH_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})月(\d{1,2})(?:日|号)").expect("static regex"));

static NUMERIC_MONTH_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})(\d{2})$").expect("static regex"));

/// Extract `(month, day)` from texts such as `01月05日`, `1月5号` or `0105`.
///
/// Returns `None` for anything unparsable or out of calendar range.
pub fn parse_month_day(text: &str) -> Option<(u32, u32)> {
    let text = text.trim();
    let caps = MONTH_DAY
        .captures(text)
        .or_else(|| NUMERIC_MONTH_DAY.captures(text))?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some((month, day))
}

/// The day `days_to_look_back` days before `today`, `None` when that falls
/// outside the representable calendar.
pub fn lookback_target(today: NaiveDate, days_to_look_back: u32) -> Option<NaiveDate> {
    today.checked_sub_days(Days::new(u64::from(days_to_look_back)))
}

/// Decides whether a date text denotes the single target day
/// `today - lookback`. Years are not compared.
#[derive(Debug, Clone, Copy)]
pub struct DateMatcher {
    target: NaiveDate,
}

impl DateMatcher {
    /// Build a matcher for `today - days_to_look_back`.
    ///
    /// # Arguments
    ///
    /// * `today` - The calendar day the lookback counts back from
    /// * `days_to_look_back` - How many days back the target day is
    ///
    /// # Returns
    ///
    /// * `Ok(DateMatcher)` for a representable target day
    /// * `Err(Error::Config)` when the lookback leaves the calendar range
    pub fn new(today: NaiveDate, days_to_look_back: u32) -> Result<Self> {
        let target = lookback_target(today, days_to_look_back).ok_or_else(|| {
            Error::Config(format!(
                "days_to_look_back {days_to_look_back} reaches before the earliest representable date"
            ))
        })?;
        Ok(Self { target })
    }

    /// Anchored on the local calendar date.
    pub fn from_now(days_to_look_back: u32) -> Result<Self> {
        Self::new(Local::now().date_naive(), days_to_look_back)
    }

    pub fn target(&self) -> NaiveDate {
        self.target
    }

    pub fn matches(&self, text: &str) -> bool {
        match parse_month_day(text) {
            Some((month, day)) => month == self.target.month() && day == self.target.day(),
            None => false,
        }
    }

    /// True when either the title date or the label date is the target.
    pub fn accepts(&self, candidate: &MatchCandidate) -> bool {
        let hit = candidate.date_texts().iter().any(|t| self.matches(t));
        debug!(title = %candidate.raw_title, target = %self.target, hit, "Date check");
        hit
    }
}

/// Ordered set of team names the run cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedTeams {
    names: Vec<String>,
}

impl TrackedTeams {
    /// Blank names are dropped and duplicates keep their first position.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.into().trim().to_string();
            if !name.is_empty() && !out.contains(&name) {
                out.push(name);
            }
        }
        Self { names: out }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Every tracked name that is a literal substring of `title`, in
    /// configured order.
    pub fn present_in<'a>(&'a self, title: &str) -> Vec<&'a str> {
        self.names
            .iter()
            .filter(|name| title.contains(name.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn any_in(&self, title: &str) -> bool {
        self.names.iter().any(|name| title.contains(name.as_str()))
    }

    /// True when the candidate's full raw title names a tracked team.
    pub fn accepts(&self, candidate: &MatchCandidate) -> bool {
        self.any_in(&candidate.raw_title)
    }
}

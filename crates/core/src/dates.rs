//! Relative due-date phrases and their resolution to calendar dates.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Relative phrases recognized in capture text, in matching priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuePhrase {
    Tomorrow,
    ThisWeekend,
    NextWeek,
}

impl DuePhrase {
    pub const PRIORITY: [DuePhrase; 3] = [
        DuePhrase::Tomorrow,
        DuePhrase::ThisWeekend,
        DuePhrase::NextWeek,
    ];

    /// Literal tokens for the phrase. Matching is exact and case-sensitive.
    pub fn tokens(&self) -> &'static [&'static str] {
        match self {
            DuePhrase::Tomorrow => &["明日", "tomorrow"],
            DuePhrase::ThisWeekend => &["今週末", "this weekend"],
            DuePhrase::NextWeek => &["来週", "next week"],
        }
    }

    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            DuePhrase::Tomorrow => today + Duration::days(1),
            DuePhrase::ThisWeekend => next_weekday(today, Weekday::Sat),
            DuePhrase::NextWeek => next_weekday(today, Weekday::Mon),
        }
    }

    /// Look up a phrase by one of its tokens.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|phrase| phrase.tokens().contains(&token))
    }
}

/// The first `weekday` strictly after `today`; never `today` itself.
pub fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let mut days_ahead = (weekday.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    if days_ahead == 0 {
        days_ahead = 7;
    }
    today + Duration::days(days_ahead)
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Parse an explicit due value: `YYYY-MM-DD` or one of the phrase tokens.
pub fn parse_due(spec: &str, today: NaiveDate) -> Option<NaiveDate> {
    let trimmed = spec.trim();
    if let Some(phrase) = DuePhrase::from_token(trimmed) {
        return Some(phrase.resolve(today));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

//! Rule-based date phrase interpreter (English and Turkish).
//!
//! Best effort only: the first rule that matches anywhere in the phrase wins,
//! and anything unrecognised yields `None` rather than an error.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::vocabulary::CASE_SUFFIXES;

static ENGLISH_MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("jan", 1),
    ("february", 2),
    ("feb", 2),
    ("march", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("may", 5),
    ("june", 6),
    ("jun", 6),
    ("july", 7),
    ("jul", 7),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sept", 9),
    ("sep", 9),
    ("october", 10),
    ("oct", 10),
    ("november", 11),
    ("nov", 11),
    ("december", 12),
    ("dec", 12),
];

static TURKISH_MONTHS: &[(&str, u32)] = &[
    ("ocak", 1),
    ("şubat", 2),
    ("mart", 3),
    ("nisan", 4),
    ("mayıs", 5),
    ("haziran", 6),
    ("temmuz", 7),
    ("ağustos", 8),
    ("eylül", 9),
    ("ekim", 10),
    ("kasım", 11),
    ("aralık", 12),
];

static WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
    ("pazartesi", Weekday::Mon),
    ("salı", Weekday::Tue),
    ("çarşamba", Weekday::Wed),
    ("perşembe", Weekday::Thu),
    ("cuma", Weekday::Fri),
    ("cumartesi", Weekday::Sat),
    ("pazar", Weekday::Sun),
];

/// Longest words first so `cumartesi` is tried before `cuma`.
fn alternation<'a>(words: impl Iterator<Item = &'a str>) -> String {
    let mut words: Vec<&str> = words.collect();
    words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

struct DatePatterns {
    iso: Regex,
    numeric: Regex,
    day_month: Regex,
    month_day: Regex,
    range: Regex,
    day_after_tomorrow: Regex,
    tomorrow: Regex,
    today: Regex,
    in_days: Regex,
    days_later: Regex,
    weekday: Regex,
    next_week: Regex,
}

static PATTERNS: LazyLock<DatePatterns> = LazyLock::new(|| {
    let english = alternation(ENGLISH_MONTHS.iter().map(|(w, _)| *w));
    let turkish = alternation(TURKISH_MONTHS.iter().map(|(w, _)| *w));
    let suffixes = CASE_SUFFIXES;
    // Only Turkish names take case endings; every month name must end a word
    let month = format!(r"(?:(?P<tr>{turkish})(?:{suffixes})?|(?P<en>{english}))\b");
    let any_month = format!(r"(?:(?:{turkish})(?:{suffixes})?|(?:{english}))\b");
    let weekdays = alternation(WEEKDAYS.iter().map(|(w, _)| *w));
    let mk = |p: &str| Regex::new(p).expect("Invalid date regex");

    DatePatterns {
        iso: mk(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b"),
        numeric: mk(r"\b(\d{1,2})[./](\d{1,2})[./](\d{4})\b"),
        day_month: mk(&format!(
            r"\b(?P<day>\d{{1,2}})(?:st|nd|rd|th|\.)?\s+(?:of\s+)?{month}(?:\s+(?P<year>\d{{4}})\b)?"
        )),
        month_day: mk(&format!(
            r"\b{month}\s+(?P<day>\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(?P<year>\d{{4}})\b)?"
        )),
        range: mk(&format!(
            r"(?s)\b(\d{{1,2}}\s+{any_month}).*?\b(\d{{1,2}}\s+{any_month})"
        )),
        day_after_tomorrow: mk(r"\bday\s+after\s+tomorrow\b|\böbür\s+gün|\byarından\s+sonra"),
        tomorrow: mk(r"\btomorrow\b|\byarın"),
        today: mk(r"\btoday\b|\bbugün"),
        in_days: mk(r"\bin\s+(\d{1,3})\s+(days?|weeks?)\b"),
        days_later: mk(r"\b(\d{1,3})\s+(gün|hafta)\s+sonra"),
        weekday: mk(&format!(
            r"(?:\b(next|this|coming|gelecek|haftaya|önümüzdeki|bu)\s+)?\b({weekdays})"
        )),
        next_week: mk(r"\bnext\s+week\b|\bgelecek\s+hafta|\bhaftaya\b"),
    }
});

fn month_number(caps: &Captures<'_>) -> Option<u32> {
    let (table, word) = match (caps.name("tr"), caps.name("en")) {
        (Some(m), _) => (TURKISH_MONTHS, m.as_str()),
        (None, Some(m)) => (ENGLISH_MONTHS, m.as_str()),
        (None, None) => return None,
    };
    table.iter().find(|(w, _)| *w == word).map(|(_, m)| *m)
}

fn weekday_named(word: &str) -> Option<Weekday> {
    WEEKDAYS.iter().find(|(w, _)| *w == word).map(|(_, d)| *d)
}

fn number<T: std::str::FromStr>(caps: &Captures<'_>, group: usize) -> Option<T> {
    caps.get(group)?.as_str().parse().ok()
}

fn named_number<T: std::str::FromStr>(caps: &Captures<'_>, name: &str) -> Option<T> {
    caps.name(name)?.as_str().parse().ok()
}

/// Day and month with an optional year; without a year, the nearest
/// occurrence on or after `today`.
fn calendar_date(year: Option<i32>, month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(year) = year {
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    NaiveDate::from_ymd_opt(today.year(), month, day)
        .filter(|d| *d >= today)
        .or_else(|| NaiveDate::from_ymd_opt(today.year() + 1, month, day))
}

/// Next `target` weekday. `include_today` allows a zero-day offset.
fn upcoming_weekday(today: NaiveDate, target: Weekday, include_today: bool) -> NaiveDate {
    let current = today.weekday().num_days_from_monday() as i64;
    let wanted = target.num_days_from_monday() as i64;
    let mut ahead = (wanted - current + 7) % 7;
    if ahead == 0 && !include_today {
        ahead = 7;
    }
    today + Duration::days(ahead)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DateInterpreter;

impl DateInterpreter {
    pub fn new() -> Self {
        Self
    }

    /// Interpret the first recognisable date expression in `phrase`.
    pub fn interpret(&self, phrase: &str, today: NaiveDate) -> Option<NaiveDate> {
        let text = phrase.trim().to_lowercase();
        let p = &*PATTERNS;

        if let Some(caps) = p.iso.captures(&text) {
            return NaiveDate::from_ymd_opt(number(&caps, 1)?, number(&caps, 2)?, number(&caps, 3)?);
        }

        if let Some(caps) = p.numeric.captures(&text) {
            // Day first, as written in Turkey and most of Europe
            return NaiveDate::from_ymd_opt(number(&caps, 3)?, number(&caps, 2)?, number(&caps, 1)?);
        }

        if let Some(caps) = p.day_month.captures(&text).or_else(|| p.month_day.captures(&text)) {
            let month = month_number(&caps)?;
            return calendar_date(
                named_number(&caps, "year"),
                month,
                named_number(&caps, "day")?,
                today,
            );
        }

        if p.day_after_tomorrow.is_match(&text) {
            return Some(today + Duration::days(2));
        }
        if p.tomorrow.is_match(&text) {
            return Some(today + Duration::days(1));
        }
        if p.today.is_match(&text) {
            return Some(today);
        }

        if let Some(caps) = p.in_days.captures(&text) {
            let n: i64 = number(&caps, 1)?;
            let unit = if caps.get(2)?.as_str().starts_with("week") { 7 } else { 1 };
            return Some(today + Duration::days(n * unit));
        }
        if let Some(caps) = p.days_later.captures(&text) {
            let n: i64 = number(&caps, 1)?;
            let unit = if caps.get(2)?.as_str() == "hafta" { 7 } else { 1 };
            return Some(today + Duration::days(n * unit));
        }

        if let Some(caps) = p.weekday.captures(&text) {
            let target = weekday_named(caps.get(2)?.as_str())?;
            let include_today = matches!(caps.get(1).map(|m| m.as_str()), Some("this" | "bu"));
            return Some(upcoming_weekday(today, target, include_today));
        }

        if p.next_week.is_match(&text) {
            return Some(today + Duration::days(7));
        }

        None
    }

    /// Split a "day month ... day month" range into its two halves.
    pub fn find_range(&self, text: &str) -> Option<(String, String)> {
        let lower = text.to_lowercase();
        let caps = PATTERNS.range.captures(&lower)?;
        Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().to_string()))
    }
}

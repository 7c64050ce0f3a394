use chrono::{Local, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

use crate::dates::DateInterpreter;
use crate::error::{Result, TravelAgentError};
use crate::locations::normalize_place;
use crate::models::{Intent, ParsedIntent};
use crate::vocabulary::{CASE_SUFFIXES, Vocabulary};

/// Upper bound the flight-offers provider accepts for one search
const MAX_ADULTS: u32 = 9;

static PARTY_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d{1,2})\s*(?:adults?|people|persons?|passengers?|travell?ers?|yetişkin|kişi)",
    )
    .expect("Invalid party size regex")
});

/// Whole-word alternation; the keyword itself is capture group 1 and may be
/// followed by one of `suffixes`.
fn keyword_regex<'a>(
    words: impl Iterator<Item = &'a str>,
    suffixes: Option<&str>,
) -> Result<Option<Regex>> {
    let mut words: Vec<&str> = words.filter(|w| !w.is_empty()).collect();
    if words.is_empty() {
        return Ok(None);
    }
    words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    let alts = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = match suffixes {
        Some(suffixes) => format!(r"\b({alts})(?:{suffixes})?\b"),
        None => format!(r"\b({alts})\b"),
    };
    Regex::new(&pattern)
        .map(Some)
        .map_err(|e| TravelAgentError::Config(format!("Invalid vocabulary pattern: {e}")))
}

/// Keyword and pattern based intent parser.
///
/// Pure text-to-struct: no external calls, and date interpretation failures
/// only leave the date fields unset.
#[derive(Debug, Clone)]
pub struct IntentParser {
    places: Option<Regex>,
    currency_codes: Option<Regex>,
    currency_aliases: Vec<(String, String)>,
    flight_keywords: Vec<String>,
    dates: DateInterpreter,
    default_currency: String,
}

impl IntentParser {
    pub fn new(vocabulary: &Vocabulary, default_currency: impl Into<String>) -> Result<Self> {
        let place_keywords: Vec<String> = vocabulary
            .places
            .iter()
            .map(|p| normalize_place(&p.keyword))
            .collect();
        let places = keyword_regex(place_keywords.iter().map(String::as_str), Some(CASE_SUFFIXES))?;
        let currency_codes =
            keyword_regex(vocabulary.currency_codes.iter().map(String::as_str), None)?;

        Ok(Self {
            places,
            currency_codes,
            currency_aliases: vocabulary
                .currency_aliases
                .iter()
                .map(|(alias, code)| (alias.to_lowercase(), code.clone()))
                .collect(),
            flight_keywords: vocabulary
                .flight_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            dates: DateInterpreter::new(),
            default_currency: default_currency.into(),
        })
    }

    pub fn parse(&self, message: &str) -> ParsedIntent {
        self.parse_at(message, Local::now().date_naive())
    }

    /// Parse relative to a fixed `today`, for relative date phrases.
    pub fn parse_at(&self, message: &str, today: NaiveDate) -> ParsedIntent {
        let lower = normalize_place(message);

        let (origin, destination) = self.extract_places(&lower);
        if !self.has_flight_keyword(&lower) || (origin.is_none() && destination.is_none()) {
            tracing::debug!(
                "Classified as chitchat (places found: {})",
                origin.is_some() || destination.is_some()
            );
            return ParsedIntent::chitchat(self.default_currency.clone());
        }

        let (date_from, date_to) = self.extract_dates(&lower, today);
        let parsed = ParsedIntent {
            intent: Intent::FlightSearch,
            origin,
            destination,
            date_from,
            date_to,
            adults: self.extract_adults(&lower),
            currency: self
                .extract_currency(message, &lower)
                .unwrap_or_else(|| self.default_currency.clone()),
        };
        tracing::debug!("Parsed flight intent: {:?}", parsed);
        parsed
    }

    /// First match is the origin, second the destination; a single match is
    /// taken as the destination.
    fn extract_places(&self, lower: &str) -> (Option<String>, Option<String>) {
        let Some(places) = &self.places else {
            return (None, None);
        };
        let mut found = places
            .captures_iter(lower)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()));
        match (found.next(), found.next()) {
            (Some(first), Some(second)) => (Some(first), Some(second)),
            (Some(only), None) => (None, Some(only)),
            _ => (None, None),
        }
    }

    fn extract_dates(&self, lower: &str, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        if let Some((first, second)) = self.dates.find_range(lower) {
            let from = self.dates.interpret(&first, today);
            // Second half anchored on the first so the range never runs backwards
            let to = self.dates.interpret(&second, from.unwrap_or(today));
            return (from, to);
        }
        (self.dates.interpret(lower, today), None)
    }

    fn extract_adults(&self, lower: &str) -> u32 {
        PARTY_SIZE_RE
            .captures(lower)
            .and_then(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
            .map(|n| n.clamp(1, MAX_ADULTS))
            .unwrap_or(1)
    }

    /// Codes only count when written upper-case ("TRY" yes, "try" no).
    fn extract_currency(&self, message: &str, lower: &str) -> Option<String> {
        if let Some(m) = self
            .currency_codes
            .as_ref()
            .and_then(|re| re.captures(message)?.get(1))
        {
            return Some(m.as_str().to_string());
        }
        self.currency_aliases
            .iter()
            .find(|(alias, _)| lower.contains(alias.as_str()))
            .map(|(_, code)| code.clone())
    }

    fn has_flight_keyword(&self, lower: &str) -> bool {
        self.flight_keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> IntentParser {
        IntentParser::new(&Vocabulary::default(), "EUR").expect("default vocabulary should build")
    }

    // Monday
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_flight_from_istanbul_to_london_next_friday() {
        let parsed = parser().parse_at("Find me a flight from Istanbul to London next Friday", today());
        assert_eq!(parsed.intent, Intent::FlightSearch);
        assert_eq!(parsed.origin.as_deref(), Some("istanbul"));
        assert_eq!(parsed.destination.as_deref(), Some("london"));
        assert_eq!(parsed.date_from, Some(ymd(2026, 10, 23)));
        assert_eq!(parsed.date_to, None);
        assert_eq!(parsed.adults, 1);
        assert_eq!(parsed.currency, "EUR");
    }

    #[test]
    fn test_fly_to_paris_on_15_september() {
        let parsed = parser().parse_at("I want to fly to Paris on 15 September", today());
        assert_eq!(parsed.intent, Intent::FlightSearch);
        assert_eq!(parsed.origin, None);
        assert_eq!(parsed.destination.as_deref(), Some("paris"));
        assert_eq!(parsed.date_from, Some(ymd(2027, 9, 15)));
        assert_eq!(parsed.date_to, None);
    }

    #[test]
    fn test_greeting_is_chitchat() {
        let parsed = parser().parse_at("Hello, how are you?", today());
        assert_eq!(parsed, ParsedIntent::chitchat("EUR"));
    }

    #[test]
    fn test_no_location_is_chitchat_even_with_flight_words() {
        for msg in [
            "I need a flight ticket",
            "can I fly next friday?",
            "uçak bileti almak istiyorum",
        ] {
            let parsed = parser().parse_at(msg, today());
            assert_eq!(parsed.intent, Intent::Chitchat, "{msg}");
            assert!(parsed.date_from.is_none(), "{msg}");
        }
    }

    #[test]
    fn test_city_without_flight_keyword_is_chitchat() {
        let parsed = parser().parse_at("Tell me about Paris and Berlin", today());
        assert_eq!(parsed, ParsedIntent::chitchat("EUR"));
    }

    #[test]
    fn test_single_city_is_destination() {
        let parsed = parser().parse_at("any flights to Berlin?", today());
        assert_eq!(parsed.intent, Intent::FlightSearch);
        assert_eq!(parsed.origin, None);
        assert_eq!(parsed.destination.as_deref(), Some("berlin"));
    }

    #[test]
    fn test_place_must_start_a_word() {
        let parsed = parser().parse_at("a comparison of flight prices", today());
        assert_eq!(parsed.intent, Intent::Chitchat);
    }

    #[test]
    fn test_place_must_end_a_word() {
        let parsed = parser().parse_at("I need a flight from Romania to Paris", today());
        assert_eq!(parsed.intent, Intent::FlightSearch);
        assert_eq!(parsed.origin, None);
        assert_eq!(parsed.destination.as_deref(), Some("paris"));

        let parsed = parser().parse_at("book a romantic flight to Paris", today());
        assert_eq!(parsed.origin, None);
        assert_eq!(parsed.destination.as_deref(), Some("paris"));

        let parsed = parser().parse_at("Berliner flights to Rome", today());
        assert_eq!(parsed.origin, None);
        assert_eq!(parsed.destination.as_deref(), Some("rome"));
    }

    #[test]
    fn test_turkish_suffix_without_apostrophe() {
        let parsed = parser().parse_at("paristen ankaraya uçak bileti", today());
        assert_eq!(parsed.origin.as_deref(), Some("paris"));
        assert_eq!(parsed.destination.as_deref(), Some("ankara"));
    }

    #[test]
    fn test_number_before_word_is_not_a_date() {
        let parsed = parser().parse_at("flight for 2 juniors to Paris", today());
        assert_eq!(parsed.intent, Intent::FlightSearch);
        assert_eq!(parsed.date_from, None);
        assert_eq!(parsed.date_to, None);
        assert_eq!(parsed.adults, 1);
    }

    #[test]
    fn test_turkish_range_with_suffixes() {
        let parsed = parser().parse_at(
            "İstanbul'dan Londra'ya 10 eylül ile 15 eylül arası uçak bileti",
            today(),
        );
        assert_eq!(parsed.intent, Intent::FlightSearch);
        assert_eq!(parsed.origin.as_deref(), Some("istanbul"));
        assert_eq!(parsed.destination.as_deref(), Some("londra"));
        assert_eq!(parsed.date_from, Some(ymd(2027, 9, 10)));
        assert_eq!(parsed.date_to, Some(ymd(2027, 9, 15)));
    }

    #[test]
    fn test_range_across_new_year_runs_forward() {
        let parsed = parser().parse_at("flight to Paris from 20 december to 3 january", today());
        assert_eq!(parsed.date_from, Some(ymd(2026, 12, 20)));
        assert_eq!(parsed.date_to, Some(ymd(2027, 1, 3)));
    }

    #[test]
    fn test_range_half_that_fails_stays_unset() {
        let parsed = parser().parse_at("fly to Rome 31 february until 4 march", today());
        assert_eq!(parsed.date_from, None);
        assert_eq!(parsed.date_to, Some(ymd(2027, 3, 4)));
    }

    #[test]
    fn test_multi_word_city() {
        let parsed = parser().parse_at("flight from London to New York tomorrow", today());
        assert_eq!(parsed.origin.as_deref(), Some("london"));
        assert_eq!(parsed.destination.as_deref(), Some("new york"));
        assert_eq!(parsed.date_from, Some(ymd(2026, 10, 20)));
    }

    #[test]
    fn test_party_size_and_currency() {
        let parsed = parser().parse_at("flight for 3 adults from Berlin to Rome in USD", today());
        assert_eq!(parsed.adults, 3);
        assert_eq!(parsed.currency, "USD");

        let parsed = parser().parse_at("2 kişi ankara izmir uçak, fiyat lira olsun", today());
        assert_eq!(parsed.adults, 2);
        assert_eq!(parsed.currency, "TRY");

        let parsed = parser().parse_at("flight for 40 passengers to Paris", today());
        assert_eq!(parsed.adults, MAX_ADULTS);
    }

    #[test]
    fn test_lowercase_currency_word_is_not_a_code() {
        let parsed = parser().parse_at("try to find a flight to Paris", today());
        assert_eq!(parsed.currency, "EUR");
    }

    #[test]
    fn test_custom_vocabulary() {
        let mut vocab = Vocabulary::default();
        vocab.flight_keywords = vec!["vol".to_string()];
        let parser = IntentParser::new(&vocab, "CHF").unwrap();
        let parsed = parser.parse_at("un vol pour Paris", today());
        assert_eq!(parsed.intent, Intent::FlightSearch);
        assert_eq!(parsed.currency, "CHF");
        assert_eq!(parser.parse_at("a flight to Paris", today()).intent, Intent::Chitchat);
    }
}

//! Keyword tables the parser and resolver are built from.
//!
//! Everything here is plain data so deployments can extend the city set or the
//! flight keywords from `config.yaml` without touching the matching logic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::LocationCode;

/// Turkish case endings a place or month name may carry when written without
/// an apostrophe (`paristen`, `ankaraya`, `kasımda`). Regex alternation,
/// longest first.
pub const CASE_SUFFIXES: &str =
    "dan|den|tan|ten|nın|nin|nun|nün|da|de|ta|te|ya|ye|yı|yi|yu|yü|ın|in|un|ün|a|e|ı|i|u|ü";

/// A place name as users type it, and the code it stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceKeyword {
    pub keyword: String,
    pub code: String,
}

impl PlaceKeyword {
    fn new(keyword: &str, code: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            code: code.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Lower-case place keywords. Several keywords may share a code.
    pub places: Vec<PlaceKeyword>,
    /// Code -> human readable city name
    pub display_names: BTreeMap<String, String>,
    /// Substrings that mark a message as being about flights
    pub flight_keywords: Vec<String>,
    /// Codes recognised when written upper-case in a message
    pub currency_codes: Vec<String>,
    /// Lower-case words or symbols -> currency code
    pub currency_aliases: BTreeMap<String, String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let places = vec![
            PlaceKeyword::new("istanbul", "IST"),
            PlaceKeyword::new("ıstanbul", "IST"),
            PlaceKeyword::new("sabiha", "SAW"),
            PlaceKeyword::new("ankara", "ESB"),
            PlaceKeyword::new("izmir", "ADB"),
            PlaceKeyword::new("antalya", "AYT"),
            PlaceKeyword::new("paris", "PAR"),
            PlaceKeyword::new("londra", "LON"),
            PlaceKeyword::new("london", "LON"),
            PlaceKeyword::new("berlin", "BER"),
            PlaceKeyword::new("amsterdam", "AMS"),
            PlaceKeyword::new("roma", "ROM"),
            PlaceKeyword::new("rome", "ROM"),
            PlaceKeyword::new("new york", "NYC"),
        ];

        let display_names = [
            ("LON", "London"),
            ("IST", "Istanbul"),
            ("SAW", "Istanbul (Sabiha Gökçen)"),
            ("ESB", "Ankara"),
            ("ADB", "Izmir"),
            ("AYT", "Antalya"),
            ("PAR", "Paris"),
            ("BER", "Berlin"),
            ("AMS", "Amsterdam"),
            ("ROM", "Rome"),
            ("NYC", "New York"),
        ]
        .into_iter()
        .map(|(code, name)| (code.to_string(), name.to_string()))
        .collect();

        let flight_keywords = ["uç", "uçak", "bilet", "flight", "fly", "ticket"]
            .into_iter()
            .map(String::from)
            .collect();

        let currency_codes = ["EUR", "USD", "GBP", "TRY", "CHF"]
            .into_iter()
            .map(String::from)
            .collect();

        let currency_aliases = [
            ("€", "EUR"),
            ("euro", "EUR"),
            ("$", "USD"),
            ("dollar", "USD"),
            ("£", "GBP"),
            ("pound", "GBP"),
            ("₺", "TRY"),
            ("lira", "TRY"),
        ]
        .into_iter()
        .map(|(alias, code)| (alias.to_string(), code.to_string()))
        .collect();

        Self {
            places,
            display_names,
            flight_keywords,
            currency_codes,
            currency_aliases,
        }
    }
}

impl Vocabulary {
    /// Check that every code in the tables is a well-formed three-letter code.
    pub fn validate(&self) -> Result<(), String> {
        if self.flight_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err("vocabulary.flight_keywords must contain at least one keyword".into());
        }
        for place in &self.places {
            if place.keyword.trim().is_empty() {
                return Err(format!("vocabulary.places has an empty keyword for {}", place.code));
            }
            if LocationCode::parse(&place.code).is_none() {
                return Err(format!(
                    "vocabulary.places: '{}' maps to invalid code '{}'",
                    place.keyword, place.code
                ));
            }
        }
        for code in self.display_names.keys() {
            if LocationCode::parse(code).is_none() {
                return Err(format!("vocabulary.display_names: invalid code '{code}'"));
            }
        }
        for code in self.currency_codes.iter().chain(self.currency_aliases.values()) {
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(format!("vocabulary: invalid currency code '{code}'"));
            }
        }
        Ok(())
    }
}

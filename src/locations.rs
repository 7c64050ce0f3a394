use std::collections::HashMap;

use crate::models::LocationCode;
use crate::vocabulary::Vocabulary;

/// Lower-cases a place name for table lookups.
///
/// `str::to_lowercase` turns the Turkish capital `İ` into `i` followed by a
/// combining dot, which would never match the plain `i` in the tables.
pub fn normalize_place(raw: &str) -> String {
    raw.trim().to_lowercase().replace("i\u{307}", "i")
}

/// How a place name turned into a code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The input already was a three-letter code
    Explicit,
    /// Found in the name table
    Known,
    /// Nothing matched; the caller's default was used
    Fallback,
}

/// Maps user-facing place names to location codes and back.
#[derive(Debug, Clone)]
pub struct LocationResolver {
    codes: HashMap<String, LocationCode>,
    display: HashMap<LocationCode, String>,
}

impl LocationResolver {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        let mut codes = HashMap::new();
        for place in &vocabulary.places {
            match LocationCode::parse(&place.code) {
                Some(code) => {
                    codes.insert(normalize_place(&place.keyword), code);
                }
                None => tracing::warn!(
                    "Skipping place keyword '{}' with invalid code '{}'",
                    place.keyword,
                    place.code
                ),
            }
        }

        let display = vocabulary
            .display_names
            .iter()
            .filter_map(|(code, name)| LocationCode::parse(code).map(|c| (c, name.clone())))
            .collect();

        Self { codes, display }
    }

    /// Resolve a name or explicit code without a default.
    pub fn lookup(&self, name_or_code: &str) -> Option<(LocationCode, Resolution)> {
        if let Some(code) = LocationCode::parse(name_or_code) {
            return Some((code, Resolution::Explicit));
        }
        self.codes
            .get(&normalize_place(name_or_code))
            .map(|code| (code.clone(), Resolution::Known))
    }

    /// Resolve a name or explicit code, falling back to `default` on a miss.
    ///
    /// Never fails. A fallback is only a best guess and is traced as such.
    pub fn resolve(&self, name_or_code: &str, default: &LocationCode) -> (LocationCode, Resolution) {
        match self.lookup(name_or_code) {
            Some(found) => found,
            None => {
                tracing::debug!(
                    "Resolution ambiguous for '{}', falling back to {}",
                    name_or_code,
                    default
                );
                (default.clone(), Resolution::Fallback)
            }
        }
    }

    pub fn resolve_code(&self, name_or_code: &str, default: &LocationCode) -> LocationCode {
        self.resolve(name_or_code, default).0
    }

    pub fn display_name(&self, code: &LocationCode) -> Option<&str> {
        self.display.get(code).map(String::as_str)
    }
}

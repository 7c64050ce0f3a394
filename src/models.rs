use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified purpose of one user message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FlightSearch,
    Chitchat,
}

/// Structured outcome of parsing one user message.
///
/// `origin` and `destination` carry the place text as it was matched in the
/// message (e.g. `"londra"`); code resolution happens in the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub intent: Intent,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub adults: u32,
    pub currency: String,
}

impl ParsedIntent {
    /// A chitchat result with every travel field unset
    pub fn chitchat(currency: impl Into<String>) -> Self {
        Self {
            intent: Intent::Chitchat,
            origin: None,
            destination: None,
            date_from: None,
            date_to: None,
            adults: 1,
            currency: currency.into(),
        }
    }

    pub fn is_flight_search(&self) -> bool {
        self.intent == Intent::FlightSearch
    }
}

/// Three-letter airport or city code, stored upper-case
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationCode(String);

impl LocationCode {
    /// Accepts exactly three alphabetic characters, in any case.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.chars().count() == 3 && trimmed.chars().all(char::is_alphabetic) {
            Some(Self(trimmed.to_uppercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LocationCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid location code: {value:?}"))
    }
}

impl From<LocationCode> for String {
    fn from(code: LocationCode) -> Self {
        code.0
    }
}

/// One normalized row of flight search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOffer {
    pub date: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub origin_code: String,
    pub destination_code: String,
    pub airline_code: String,
    pub price_display: String,
    #[serde(default)]
    pub link: String,
}

/// Validated input of one flight-offers query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub origin: LocationCode,
    pub destination: LocationCode,
    pub date_from: NaiveDate,
    pub date_to: Option<NaiveDate>,
    pub adults: u32,
    pub currency: String,
    pub max_results: u32,
}

impl SearchRequest {
    /// A return date that differs from the departure date makes the query round-trip.
    pub fn return_date(&self) -> Option<NaiveDate> {
        self.date_to.filter(|to| *to != self.date_from)
    }
}

/// What one `handle` call hands back to its caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResult {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_reply: Option<String>,
    pub offers: Vec<FlightOffer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

// Chat message handed to the reply generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_code_parse() {
        assert_eq!(LocationCode::parse("ist").unwrap().as_str(), "IST");
        assert_eq!(LocationCode::parse(" Lon ").unwrap().as_str(), "LON");
        assert!(LocationCode::parse("LOND").is_none());
        assert!(LocationCode::parse("L1N").is_none());
        assert!(LocationCode::parse("").is_none());
    }

    #[test]
    fn test_return_date_only_when_different() {
        let day = NaiveDate::from_ymd_opt(2026, 11, 6).unwrap();
        let mut req = SearchRequest {
            origin: LocationCode::parse("IST").unwrap(),
            destination: LocationCode::parse("LON").unwrap(),
            date_from: day,
            date_to: Some(day),
            adults: 1,
            currency: "EUR".to_string(),
            max_results: 10,
        };
        assert_eq!(req.return_date(), None);

        req.date_to = None;
        assert_eq!(req.return_date(), None);

        let back = NaiveDate::from_ymd_opt(2026, 11, 13).unwrap();
        req.date_to = Some(back);
        assert_eq!(req.return_date(), Some(back));
    }

    #[test]
    fn test_orchestration_result_boundary_shape() {
        let result = OrchestrationResult {
            reply: "hi".to_string(),
            translated_reply: None,
            offers: vec![FlightOffer {
                date: "2026-11-06".to_string(),
                departure_time: "08:30".to_string(),
                arrival_time: "10:45".to_string(),
                origin_code: "IST".to_string(),
                destination_code: "LHR".to_string(),
                airline_code: "TK".to_string(),
                price_display: "210.40 EUR".to_string(),
                link: String::new(),
            }],
            destination_label: Some("london".to_string()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("translatedReply").is_none());
        assert_eq!(json["destinationLabel"], "london");
        assert_eq!(json["offers"][0]["departureTime"], "08:30");
        assert_eq!(json["offers"][0]["priceDisplay"], "210.40 EUR");
    }
}

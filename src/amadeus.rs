use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::AmadeusConfig;
use crate::error::{Result, SearchError, TravelAgentError};
use crate::models::{FlightOffer, SearchRequest};

const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const FLIGHT_OFFERS_PATH: &str = "/v2/shopping/flight-offers";
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 1800;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlightSearch: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> std::result::Result<Vec<FlightOffer>, SearchError>;
}

// Upstream payload, only the fields normalization reads

#[derive(Debug, Deserialize)]
pub struct FlightOffersResponse {
    #[serde(default)]
    pub data: Vec<RawOffer>,
}

#[derive(Debug, Deserialize)]
pub struct RawOffer {
    #[serde(default)]
    pub itineraries: Vec<RawItinerary>,
    #[serde(default)]
    pub price: Option<RawPrice>,
}

#[derive(Debug, Deserialize)]
pub struct RawItinerary {
    #[serde(default)]
    pub segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSegment {
    pub departure: RawEndpoint,
    pub arrival: RawEndpoint,
    #[serde(default)]
    pub carrier_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEndpoint {
    pub iata_code: String,
    pub at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPrice {
    #[serde(default)]
    pub grand_total: Option<String>,
    #[serde(default)]
    pub total: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

fn parse_timestamp(raw: &str) -> std::result::Result<NaiveDateTime, SearchError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .map_err(|e| SearchError::Malformed(format!("bad timestamp {raw:?}: {e}")))
}

/// Turn the upstream payload into one row per offer.
///
/// Only the first segment of the first itinerary is read; connecting legs and
/// the return leg are not represented. Offers without segments are skipped and
/// upstream order is kept. The price is shown in the requested currency, which
/// is not reconciled with the currency the provider reports.
pub fn normalize_offers(
    payload: FlightOffersResponse,
    currency: &str,
) -> std::result::Result<Vec<FlightOffer>, SearchError> {
    let mut rows = Vec::with_capacity(payload.data.len());

    for (index, offer) in payload.data.into_iter().enumerate() {
        let Some(segment) = offer
            .itineraries
            .into_iter()
            .next()
            .and_then(|itinerary| itinerary.segments.into_iter().next())
        else {
            tracing::debug!("Skipping flight offer #{} without itinerary segments", index);
            continue;
        };

        let departure = parse_timestamp(&segment.departure.at)?;
        let arrival = parse_timestamp(&segment.arrival.at)?;

        if let Some(returned) = offer.price.as_ref().and_then(|p| p.currency.as_deref()) {
            if !returned.eq_ignore_ascii_case(currency) {
                tracing::warn!(
                    "Flight offer #{} priced in {} but {} was requested; showing as requested",
                    index,
                    returned,
                    currency
                );
            }
        }
        let amount = offer
            .price
            .and_then(|p| p.grand_total.or(p.total))
            .unwrap_or_else(|| "n/a".to_string());

        rows.push(FlightOffer {
            date: departure.format("%Y-%m-%d").to_string(),
            departure_time: departure.format("%H:%M").to_string(),
            arrival_time: arrival.format("%H:%M").to_string(),
            origin_code: segment.departure.iata_code,
            destination_code: segment.arrival.iata_code,
            airline_code: segment.carrier_code.unwrap_or_default(),
            price_display: format!("{amount} {currency}"),
            link: String::new(),
        });
    }

    Ok(rows)
}

/// Query string for one flight-offers search
pub fn query_params(request: &SearchRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("originLocationCode", request.origin.to_string()),
        ("destinationLocationCode", request.destination.to_string()),
        ("departureDate", request.date_from.format("%Y-%m-%d").to_string()),
        ("adults", request.adults.to_string()),
        ("currencyCode", request.currency.clone()),
        ("max", request.max_results.to_string()),
    ];
    if let Some(back) = request.return_date() {
        params.push(("returnDate", back.format("%Y-%m-%d").to_string()));
    }
    params
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn new(value: String, lifetime: Duration, now: Instant) -> Self {
        Self {
            value,
            expires_at: now + lifetime,
        }
    }

    /// Usable only while more than `margin` of its lifetime is left.
    fn is_usable(&self, now: Instant, margin: Duration) -> bool {
        now.checked_add(margin)
            .is_some_and(|deadline| deadline < self.expires_at)
    }
}

/// Amadeus Self-Service flight-offers client.
///
/// Owns the OAuth session: the token is fetched lazily, shared by concurrent
/// searches, and refreshed once it gets within `refresh_margin` of expiry.
/// Two searches racing past an expired token may both refresh it.
pub struct AmadeusClient {
    http: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    session: RwLock<Option<AccessToken>>,
    token_timeout: Duration,
    search_timeout: Duration,
    refresh_margin: Duration,
}

impl AmadeusClient {
    pub fn new(cfg: &AmadeusConfig) -> Result<Self> {
        if cfg.client_id.trim().is_empty() || cfg.client_secret.trim().is_empty() {
            return Err(TravelAgentError::Config(
                "Amadeus credentials are missing. Set AMADEUS_API_KEY/AMADEUS_API_SECRET".into(),
            ));
        }
        Ok(Self {
            http: Client::new(),
            base_url: cfg.env.base_url().to_string(),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            session: RwLock::new(None),
            token_timeout: Duration::from_secs(cfg.token_timeout_seconds),
            search_timeout: Duration::from_secs(cfg.search_timeout_seconds),
            refresh_margin: Duration::from_secs(cfg.token_refresh_margin_seconds),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn access_token(&self) -> std::result::Result<String, SearchError> {
        {
            let session = self.session.read().await;
            if let Some(token) = session.as_ref() {
                if token.is_usable(Instant::now(), self.refresh_margin) {
                    return Ok(token.value.clone());
                }
            }
        }

        let fresh = self.authenticate().await?;
        let value = fresh.value.clone();
        *self.session.write().await = Some(fresh);
        Ok(value)
    }

    async fn authenticate(&self) -> std::result::Result<AccessToken, SearchError> {
        tracing::info!("Requesting Amadeus access token");
        let response = self
            .http
            .post(format!("{}{}", self.base_url, TOKEN_PATH))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .timeout(self.token_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SearchError::Auth(format!("{status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Malformed(format!("token response: {e}")))?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
        Ok(AccessToken::new(token.access_token, lifetime, Instant::now()))
    }
}

#[async_trait]
impl FlightSearch for AmadeusClient {
    async fn search(&self, request: &SearchRequest) -> std::result::Result<Vec<FlightOffer>, SearchError> {
        let token = self.access_token().await?;
        tracing::info!(
            "Searching flight offers {} -> {} departing {} (return: {:?})",
            request.origin,
            request.destination,
            request.date_from,
            request.return_date()
        );

        let response = self
            .http
            .get(format!("{}{}", self.base_url, FLIGHT_OFFERS_PATH))
            .bearer_auth(&token)
            .query(&query_params(request))
            .timeout(self.search_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                // Revoked early; make the next call authenticate again
                *self.session.write().await = None;
            }
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: FlightOffersResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Malformed(e.to_string()))?;
        let offers = normalize_offers(payload, &request.currency)?;
        tracing::info!("Flight search returned {} offers", offers.len());
        Ok(offers)
    }
}

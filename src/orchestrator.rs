use chrono::{Days, Local, NaiveDate};
use std::sync::Arc;

use crate::amadeus::FlightSearch;
use crate::config::Config;
use crate::error::{Result, TravelAgentError};
use crate::intent::IntentParser;
use crate::locations::LocationResolver;
use crate::models::{FlightOffer, LocationCode, OrchestrationResult, ParsedIntent, SearchRequest};
use crate::synth::ReplySynth;
use crate::transport::ReplyGenerator;
use crate::translate::Translator;

pub const UNRESOLVED_DESTINATION_NOTE: &str =
    "Could not resolve destination. Please specify a city/airport (IATA code).";

#[derive(Debug, Clone)]
struct SearchDefaults {
    window_days: u32,
    fallback_origin: LocationCode,
    fallback_destination: Option<LocationCode>,
    max_results: u32,
}

fn config_code(field: &str, raw: &str) -> Result<LocationCode> {
    LocationCode::parse(raw)
        .ok_or_else(|| TravelAgentError::Config(format!("{field} '{raw}' is not a location code")))
}

/// Runs one conversational turn: parse, search, generate, translate.
///
/// Turns are independent; nothing is remembered between calls except the
/// flight provider's token session.
pub struct Orchestrator {
    parser: IntentParser,
    resolver: LocationResolver,
    synth: ReplySynth,
    translator: Arc<dyn Translator>,
    flights: Arc<dyn FlightSearch>,
    defaults: SearchDefaults,
}

impl Orchestrator {
    pub fn new(
        cfg: &Config,
        generator: Arc<dyn ReplyGenerator>,
        translator: Arc<dyn Translator>,
        flights: Arc<dyn FlightSearch>,
    ) -> Result<Self> {
        let fallback_destination = cfg
            .search
            .fallback_destination
            .as_deref()
            .map(|raw| config_code("search.fallback_destination", raw))
            .transpose()?;

        Ok(Self {
            parser: IntentParser::new(&cfg.vocabulary, cfg.search.default_currency.clone())?,
            resolver: LocationResolver::new(&cfg.vocabulary),
            synth: ReplySynth::new(generator, cfg.search.summary_limit),
            translator,
            flights,
            defaults: SearchDefaults {
                window_days: cfg.search.window_days,
                fallback_origin: config_code("search.fallback_origin", &cfg.search.fallback_origin)?,
                fallback_destination,
                max_results: cfg.amadeus.max_results,
            },
        })
    }

    pub async fn handle(
        &self,
        user_text: &str,
        want_translation: bool,
        target_language: &str,
    ) -> Result<OrchestrationResult> {
        self.handle_on(user_text, want_translation, target_language, Local::now().date_naive())
            .await
    }

    /// Same as [`handle`](Self::handle) with a fixed reference date.
    pub async fn handle_on(
        &self,
        user_text: &str,
        want_translation: bool,
        target_language: &str,
        today: NaiveDate,
    ) -> Result<OrchestrationResult> {
        let intent = self.parser.parse_at(user_text, today);
        tracing::info!("Handling message as {:?}", intent.intent);

        let mut offers = Vec::new();
        let mut note = None;
        let mut destination_label = None;

        if intent.is_flight_search() {
            let origin = self.resolve_origin(&intent);
            let destination = self.resolve_destination(&intent);
            destination_label = intent.destination.clone().or_else(|| {
                destination.as_ref().map(|code| {
                    self.resolver
                        .display_name(code)
                        .map(str::to_string)
                        .unwrap_or_else(|| code.to_string())
                })
            });

            match destination {
                None => {
                    tracing::warn!("No destination code for {:?}", intent.destination);
                    note = Some(UNRESOLVED_DESTINATION_NOTE.to_string());
                }
                Some(destination) => {
                    let request = self.search_request(&intent, origin, destination, today);
                    match self.search(&request).await {
                        Ok(found) => offers = found,
                        Err(e) => note = Some(e.to_string()),
                    }
                }
            }
        }

        let reply = self.synth.synth(user_text, &offers, note.as_deref()).await?;

        let translated_reply = if want_translation {
            Some(self.translator.translate(&reply, target_language).await?)
        } else {
            None
        };

        Ok(OrchestrationResult {
            reply,
            translated_reply,
            offers,
            destination_label,
        })
    }

    fn resolve_origin(&self, intent: &ParsedIntent) -> LocationCode {
        match &intent.origin {
            Some(raw) => self.resolver.resolve_code(raw, &self.defaults.fallback_origin),
            None => self.defaults.fallback_origin.clone(),
        }
    }

    fn resolve_destination(&self, intent: &ParsedIntent) -> Option<LocationCode> {
        match (&intent.destination, &self.defaults.fallback_destination) {
            (Some(raw), Some(fallback)) => Some(self.resolver.resolve_code(raw, fallback)),
            (Some(raw), None) => self.resolver.lookup(raw).map(|(code, _)| code),
            (None, fallback) => fallback.clone(),
        }
    }

    fn search_request(
        &self,
        intent: &ParsedIntent,
        origin: LocationCode,
        destination: LocationCode,
        today: NaiveDate,
    ) -> SearchRequest {
        let date_from = intent.date_from.unwrap_or_else(|| {
            today
                .checked_add_days(Days::new(u64::from(self.defaults.window_days)))
                .unwrap_or(today)
        });
        let date_to = match intent.date_to {
            Some(to) if to >= date_from => to,
            Some(to) => {
                tracing::debug!("Ignoring return date {} before departure {}", to, date_from);
                date_from
            }
            None => date_from,
        };

        SearchRequest {
            origin,
            destination,
            date_from,
            date_to: Some(date_to),
            adults: intent.adults,
            currency: intent.currency.clone(),
            max_results: self.defaults.max_results,
        }
    }

    /// Search failures are logged and handed back as crate errors for the note.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<FlightOffer>> {
        self.flights.search(request).await.map_err(|e| {
            let err = TravelAgentError::from(e);
            tracing::warn!("{}", err);
            err
        })
    }
}

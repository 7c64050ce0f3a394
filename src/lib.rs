pub mod amadeus;
pub mod config;
pub mod dates;
pub mod error;
pub mod intent;
pub mod locations;
pub mod media;
pub mod models;
pub mod orchestrator;
pub mod service;
pub mod synth;
pub mod tools;
pub mod translate;
pub mod transport;
pub mod vocabulary;
pub mod voice;

use std::sync::Arc;

use crate::amadeus::{AmadeusClient, FlightSearch};
use crate::config::Config;
use crate::error::{Result, TravelAgentError};
use crate::media::{ImageGenerator, OpenAiImages};
use crate::models::OrchestrationResult;
use crate::orchestrator::Orchestrator;
use crate::translate::{ClaudeTranslator, EchoTranslator, Translator};
use crate::transport::{EchoGenerator, OpenAiTransport, ReplyGenerator};
use crate::voice::{OpenAiVoice, SpeechSynthesizer, Transcriber};

/// The assistant and the optional media capabilities around it.
///
/// Generation and translation fall back to local echoes without API keys;
/// the media capabilities are simply absent in that case.
pub struct TravelAssistant {
    orchestrator: Orchestrator,
    transcriber: Option<Arc<dyn Transcriber>>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    images: Option<Arc<dyn ImageGenerator>>,
}

impl TravelAssistant {
    pub fn new(cfg: &Config) -> Result<Self> {
        let flights: Arc<dyn FlightSearch> = Arc::new(AmadeusClient::new(&cfg.amadeus)?);

        let translator: Arc<dyn Translator> = match cfg.anthropic.api_key() {
            Some(key) => Arc::new(ClaudeTranslator::new(key, &cfg.anthropic)),
            None => Arc::new(EchoTranslator),
        };

        let (generator, transcriber, speech, images) = match cfg.openai.api_key() {
            Some(key) => {
                let voice = Arc::new(OpenAiVoice::new(key, &cfg.openai));
                let generator: Arc<dyn ReplyGenerator> =
                    Arc::new(OpenAiTransport::new(key, &cfg.openai));
                let transcriber: Arc<dyn Transcriber> = voice.clone();
                let speech: Arc<dyn SpeechSynthesizer> = voice;
                let images: Arc<dyn ImageGenerator> = Arc::new(OpenAiImages::new(
                    key,
                    &cfg.openai,
                    cfg.media.image_dir.clone(),
                ));
                (generator, Some(transcriber), Some(speech), Some(images))
            }
            None => {
                let generator: Arc<dyn ReplyGenerator> = Arc::new(EchoGenerator);
                (generator, None, None, None)
            }
        };

        let orchestrator = Orchestrator::new(cfg, generator, translator, flights)?;
        tracing::info!(
            "Travel assistant ready (media capabilities: {})",
            images.is_some()
        );

        Ok(Self::from_parts(orchestrator, transcriber, speech, images))
    }

    pub fn from_parts(
        orchestrator: Orchestrator,
        transcriber: Option<Arc<dyn Transcriber>>,
        speech: Option<Arc<dyn SpeechSynthesizer>>,
        images: Option<Arc<dyn ImageGenerator>>,
    ) -> Self {
        Self {
            orchestrator,
            transcriber,
            speech,
            images,
        }
    }

    pub async fn answer(
        &self,
        message: &str,
        want_translation: bool,
        target_language: &str,
    ) -> Result<OrchestrationResult> {
        self.orchestrator
            .handle(message, want_translation, target_language)
            .await
    }

    pub fn transcriber(&self) -> Result<&dyn Transcriber> {
        self.transcriber
            .as_deref()
            .ok_or_else(|| missing_openai("transcription"))
    }

    pub fn speech(&self) -> Result<&dyn SpeechSynthesizer> {
        self.speech.as_deref().ok_or_else(|| missing_openai("speech synthesis"))
    }

    pub fn images(&self) -> Result<&dyn ImageGenerator> {
        self.images.as_deref().ok_or_else(|| missing_openai("image generation"))
    }
}

fn missing_openai(capability: &str) -> TravelAgentError {
    TravelAgentError::Config(format!("OPENAI_API_KEY is required for {capability}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_credentials() -> Config {
        let mut cfg = Config::default();
        cfg.amadeus.client_id = "client".to_string();
        cfg.amadeus.client_secret = "secret".to_string();
        cfg
    }

    #[test]
    fn test_requires_amadeus_credentials() {
        let result = TravelAssistant::new(&Config::default());
        assert!(matches!(result, Err(TravelAgentError::Config(_))));
    }

    #[test]
    fn test_without_openai_key_media_is_unavailable() {
        let assistant = TravelAssistant::new(&with_credentials()).unwrap();
        assert!(matches!(assistant.images(), Err(TravelAgentError::Config(_))));
        assert!(assistant.speech().is_err());
        assert!(assistant.transcriber().is_err());
    }

    #[test]
    fn test_with_openai_key_media_is_available() {
        let mut cfg = with_credentials();
        cfg.openai.api_key = Some("sk-test".to_string());
        let assistant = TravelAssistant::new(&cfg).unwrap();
        assert!(assistant.images().is_ok());
        assert!(assistant.speech().is_ok());
        assert!(assistant.transcriber().is_ok());
    }

    #[tokio::test]
    async fn test_chitchat_runs_offline_with_echo_generator() {
        let assistant = TravelAssistant::new(&with_credentials()).unwrap();
        let result = assistant.answer("Hello there", true, "de").await.unwrap();
        assert_eq!(result.reply, "(Local mock) You said: Hello there");
        assert_eq!(
            result.translated_reply.as_deref(),
            Some("(Local mock) [de] (Local mock) You said: Hello there")
        );
    }
}

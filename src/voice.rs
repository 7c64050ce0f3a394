use async_openai::{
    Client,
    config::OpenAIConfig as ClientConfig,
    types::{
        AudioInput, CreateSpeechRequestArgs, CreateTranscriptionRequestArgs, SpeechModel, Voice,
    },
};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::OpenAIConfig;
use crate::error::{Result, TravelAgentError};
use crate::transport::openai_client;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// `file_name` only hints the container format (`.wav`, `.mp3`, ...).
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns mp3 bytes
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

pub fn voice_from_name(name: &str) -> Voice {
    match name.trim().to_lowercase().as_str() {
        "alloy" => Voice::Alloy,
        "echo" => Voice::Echo,
        "fable" => Voice::Fable,
        "onyx" => Voice::Onyx,
        "nova" => Voice::Nova,
        "shimmer" => Voice::Shimmer,
        other => {
            tracing::warn!("Unknown TTS voice '{}', using alloy", other);
            Voice::Alloy
        }
    }
}

/// Whisper transcription and text-to-speech over the OpenAI audio API
pub struct OpenAiVoice {
    client: Client<ClientConfig>,
    transcription_model: String,
    tts_model: String,
    voice: Voice,
    timeout: Duration,
}

impl OpenAiVoice {
    pub fn new(api_key: &str, cfg: &OpenAIConfig) -> Self {
        Self {
            client: openai_client(api_key),
            transcription_model: cfg.transcription_model.clone(),
            tts_model: cfg.tts_model.clone(),
            voice: voice_from_name(&cfg.tts_voice),
            timeout: cfg.timeout(),
        }
    }
}

#[async_trait]
impl Transcriber for OpenAiVoice {
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String> {
        if audio.is_empty() {
            return Err(TravelAgentError::validation("audio", "must not be empty"));
        }

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(file_name.to_string(), audio))
            .model(self.transcription_model.clone())
            .build()
            .map_err(|e| TravelAgentError::TranscriptionFailed(e.to_string()))?;

        tracing::info!("Transcribing {} with {}", file_name, self.transcription_model);
        let response = tokio::time::timeout(self.timeout, self.client.audio().transcribe(request))
            .await
            .map_err(|_| {
                TravelAgentError::TranscriptionFailed(format!(
                    "no response within {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| TravelAgentError::TranscriptionFailed(e.to_string()))?;

        Ok(response.text.trim().to_string())
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiVoice {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(TravelAgentError::validation("text", "must not be empty"));
        }

        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .model(SpeechModel::Other(self.tts_model.clone()))
            .voice(self.voice.clone())
            .build()
            .map_err(|e| TravelAgentError::SpeechFailed(e.to_string()))?;

        tracing::info!("Synthesizing {} characters of speech", text.chars().count());
        let response = tokio::time::timeout(self.timeout, self.client.audio().speech(request))
            .await
            .map_err(|_| {
                TravelAgentError::SpeechFailed(format!(
                    "no response within {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| TravelAgentError::SpeechFailed(e.to_string()))?;

        Ok(response.bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_names() {
        assert!(matches!(voice_from_name("Nova"), Voice::Nova));
        assert!(matches!(voice_from_name(" shimmer "), Voice::Shimmer));
        assert!(matches!(voice_from_name("robot"), Voice::Alloy));
    }

    #[tokio::test]
    async fn test_empty_inputs_are_rejected_before_any_call() {
        let voice = OpenAiVoice::new("sk-test", &OpenAIConfig::default());

        let err = voice.synthesize("   ").await.unwrap_err();
        assert!(matches!(err, TravelAgentError::Validation { .. }));

        let err = voice.transcribe(Vec::new(), "audio.wav").await.unwrap_err();
        assert!(matches!(err, TravelAgentError::Validation { .. }));
    }
}

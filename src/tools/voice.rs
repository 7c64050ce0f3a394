use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::TravelAssistant;
use crate::config::Config;
use crate::error::{Result, TravelAgentError};

const DEFAULT_AUDIO_NAME: &str = "audio.wav";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TranscribeAudioParams {
    /// Audio file inside the server's audio directory, relative to it
    #[serde(default)]
    pub audio_path: Option<String>,
    /// Base64 encoded audio; used when no path is given
    #[serde(default)]
    pub audio_base64: Option<String>,
    /// Name hinting the audio format, e.g. "question.mp3"
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscribeAudioResult {
    pub text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadAloudParams {
    /// Text to speak
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ReadAloudResult {
    pub audio_path: String,
    pub bytes: usize,
}

/// Paths are resolved against `audio_dir` and may not leave it.
async fn audio_file(audio_dir: &Path, requested: &str) -> Result<PathBuf> {
    let root = tokio::fs::canonicalize(audio_dir).await.map_err(|e| {
        TravelAgentError::validation(
            "audio_path",
            format!("audio directory {} is unavailable: {e}", audio_dir.display()),
        )
    })?;
    let file = tokio::fs::canonicalize(root.join(requested))
        .await
        .map_err(|e| TravelAgentError::validation("audio_path", e.to_string()))?;
    if !file.starts_with(&root) {
        tracing::warn!("Refused audio path outside {}: {}", root.display(), requested);
        return Err(TravelAgentError::validation(
            "audio_path",
            "must name a file inside the audio directory",
        ));
    }
    Ok(file)
}

/// Resolve the audio payload and the file name sent along with it.
async fn load_audio(audio_dir: &Path, params: &TranscribeAudioParams) -> Result<(Vec<u8>, String)> {
    match (&params.audio_path, &params.audio_base64) {
        (Some(path), None) => {
            let file = audio_file(audio_dir, path).await?;
            let audio = tokio::fs::read(&file).await?;
            let name = params.file_name.clone().unwrap_or_else(|| {
                Path::new(path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| DEFAULT_AUDIO_NAME.to_string())
            });
            Ok((audio, name))
        }
        (None, Some(encoded)) => {
            let audio = STANDARD
                .decode(encoded.trim())
                .map_err(|e| TravelAgentError::validation("audio_base64", e.to_string()))?;
            let name = params
                .file_name
                .clone()
                .unwrap_or_else(|| DEFAULT_AUDIO_NAME.to_string());
            Ok((audio, name))
        }
        (Some(_), Some(_)) => Err(TravelAgentError::validation(
            "audio",
            "give either audio_path or audio_base64, not both",
        )),
        (None, None) => Err(TravelAgentError::validation(
            "audio",
            "audio_path or audio_base64 is required",
        )),
    }
}

pub async fn transcribe_audio_impl(
    config: &Config,
    assistant: &TravelAssistant,
    params: TranscribeAudioParams,
) -> Result<TranscribeAudioResult> {
    let transcriber = assistant.transcriber()?;
    let (audio, file_name) = load_audio(&config.media.audio_dir, &params).await?;
    if audio.is_empty() {
        return Err(TravelAgentError::validation("audio", "must not be empty"));
    }
    let text = transcriber.transcribe(audio, &file_name).await?;
    Ok(TranscribeAudioResult { text })
}

pub async fn read_aloud_impl(
    config: &Config,
    assistant: &TravelAssistant,
    params: ReadAloudParams,
) -> Result<ReadAloudResult> {
    if params.text.trim().is_empty() {
        return Err(TravelAgentError::validation("text", "must not be empty"));
    }
    let audio = assistant.speech()?.synthesize(&params.text).await?;

    let dir = &config.media.audio_dir;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("speech_{}.mp3", uuid::Uuid::new_v4()));
    tokio::fs::write(&path, &audio).await?;
    tracing::info!("Wrote {} bytes of speech to {}", audio.len(), path.display());

    Ok(ReadAloudResult {
        audio_path: path.display().to_string(),
        bytes: audio.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amadeus::MockFlightSearch;
    use crate::orchestrator::Orchestrator;
    use crate::translate::MockTranslator;
    use crate::transport::MockReplyGenerator;
    use crate::voice::{MockSpeechSynthesizer, MockTranscriber, SpeechSynthesizer, Transcriber};
    use std::sync::Arc;

    fn assistant(
        transcriber: Option<MockTranscriber>,
        speech: Option<MockSpeechSynthesizer>,
    ) -> TravelAssistant {
        let orchestrator = Orchestrator::new(
            &Config::default(),
            Arc::new(MockReplyGenerator::new()),
            Arc::new(MockTranslator::new()),
            Arc::new(MockFlightSearch::new()),
        )
        .unwrap();
        TravelAssistant::from_parts(
            orchestrator,
            transcriber.map(|t| Arc::new(t) as Arc<dyn Transcriber>),
            speech.map(|s| Arc::new(s) as Arc<dyn SpeechSynthesizer>),
            None,
        )
    }

    fn transcribe_params(path: Option<&str>, b64: Option<&str>, name: Option<&str>) -> TranscribeAudioParams {
        TranscribeAudioParams {
            audio_path: path.map(str::to_string),
            audio_base64: b64.map(str::to_string),
            file_name: name.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_transcribe_from_base64() {
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .withf(|audio, name| audio.as_slice() == b"RIFF" && name.to_string() == "audio.wav")
            .times(1)
            .returning(|_, _| Ok("flights to rome".to_string()));

        let params = transcribe_params(None, Some(&STANDARD.encode(b"RIFF")), None);
        let out = transcribe_audio_impl(&Config::default(), &assistant(Some(transcriber), None), params)
            .await
            .unwrap();
        assert_eq!(out.text, "flights to rome");
    }

    fn audio_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.media.audio_dir = dir.to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_transcribe_from_path_uses_its_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("question.mp3");
        std::fs::write(&path, b"ID3").unwrap();
        let config = audio_config(dir.path());

        for requested in ["question.mp3", path.to_str().unwrap()] {
            let mut transcriber = MockTranscriber::new();
            transcriber
                .expect_transcribe()
                .withf(|_, name| name.to_string() == "question.mp3")
                .times(1)
                .returning(|_, _| Ok("hello".to_string()));

            let params = transcribe_params(Some(requested), None, None);
            let out = transcribe_audio_impl(&config, &assistant(Some(transcriber), None), params)
                .await
                .unwrap();
            assert_eq!(out.text, "hello");
        }
    }

    #[tokio::test]
    async fn test_transcribe_refuses_paths_outside_audio_dir() {
        let root = tempfile::tempdir().unwrap();
        let audio_dir = root.path().join("audio");
        std::fs::create_dir(&audio_dir).unwrap();
        let secret = root.path().join("secret.txt");
        std::fs::write(&secret, b"password").unwrap();
        let config = audio_config(&audio_dir);

        for requested in ["../secret.txt", secret.to_str().unwrap(), "missing.wav"] {
            let mut transcriber = MockTranscriber::new();
            transcriber.expect_transcribe().times(0);
            let params = transcribe_params(Some(requested), None, None);
            let err = transcribe_audio_impl(&config, &assistant(Some(transcriber), None), params)
                .await
                .unwrap_err();
            assert!(matches!(err, TravelAgentError::Validation { .. }), "{requested}: {err}");
        }
    }

    #[tokio::test]
    async fn test_transcribe_rejects_bad_input() {
        for params in [
            transcribe_params(None, None, None),
            transcribe_params(Some("a.wav"), Some("AAAA"), None),
            transcribe_params(None, Some("not base64!"), None),
            transcribe_params(None, Some(""), None),
        ] {
            let mut transcriber = MockTranscriber::new();
            transcriber.expect_transcribe().times(0);
            let err = transcribe_audio_impl(&Config::default(), &assistant(Some(transcriber), None), params)
                .await
                .unwrap_err();
            assert!(matches!(err, TravelAgentError::Validation { .. }), "{err}");
        }
    }

    #[tokio::test]
    async fn test_transcribe_without_capability() {
        let params = transcribe_params(None, Some("AAAA"), None);
        let err = transcribe_audio_impl(&Config::default(), &assistant(None, None), params)
            .await
            .unwrap_err();
        assert!(matches!(err, TravelAgentError::Config(_)));
    }

    #[tokio::test]
    async fn test_read_aloud_writes_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.media.audio_dir = dir.path().join("audio");

        let mut speech = MockSpeechSynthesizer::new();
        speech
            .expect_synthesize()
            .times(1)
            .returning(|_| Ok(b"ID3mp3".to_vec()));

        let out = read_aloud_impl(
            &config,
            &assistant(None, Some(speech)),
            ReadAloudParams {
                text: "Your flight leaves at 08:30.".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(out.bytes, 6);
        let path = std::path::PathBuf::from(&out.audio_path);
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("speech_"));
        assert_eq!(path.extension().unwrap(), "mp3");
        assert_eq!(std::fs::read(path).unwrap(), b"ID3mp3");
    }

    #[tokio::test]
    async fn test_read_aloud_rejects_blank_text() {
        let mut speech = MockSpeechSynthesizer::new();
        speech.expect_synthesize().times(0);
        let err = read_aloud_impl(
            &Config::default(),
            &assistant(None, Some(speech)),
            ReadAloudParams { text: " ".to_string() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TravelAgentError::Validation { .. }));
    }
}

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AnthropicConfig;
use crate::error::{Result, TravelAgentError};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Name a language code for the prompt; unknown codes pass through as given.
pub fn language_name(code: &str) -> &str {
    match code.trim().to_lowercase().as_str() {
        "en" => "English",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "it" => "Italian",
        "tr" => "Turkish",
        _ => code.trim(),
    }
}

pub fn translation_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following text into {}. Keep prices and times intact.\n\n{text}",
        language_name(target_language)
    )
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<MessageParam>,
}

#[derive(Debug, Serialize)]
struct MessageParam {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn first_text(response: MessagesResponse) -> Option<String> {
    response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
}

/// Translation through the Anthropic messages API
pub struct ClaudeTranslator {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl ClaudeTranslator {
    pub fn new(api_key: &str, cfg: &AnthropicConfig) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.to_string(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            timeout: cfg.timeout(),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| {
                    TravelAgentError::TranslationFailed(format!("invalid Anthropic API key: {e}"))
                })?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl Translator for ClaudeTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![MessageParam {
                role: "user",
                content: translation_prompt(text, target_language),
            }],
        };

        tracing::info!("Translating reply into {} with {}", target_language, self.model);
        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .headers(self.headers()?)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TravelAgentError::TranslationFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TravelAgentError::TranslationFailed(format!(
                "Claude API error ({status}): {body}"
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| TravelAgentError::TranslationFailed(format!("unreadable response: {e}")))?;
        first_text(parsed).ok_or_else(|| {
            TravelAgentError::TranslationFailed("response carried no text block".to_string())
        })
    }
}

/// Offline stand-in used when no Anthropic key is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoTranslator;

#[async_trait]
impl Translator for EchoTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        Ok(format!("(Local mock) [{target_language}] {text}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_the_language() {
        let prompt = translation_prompt("Two flights found.", "de");
        assert_eq!(
            prompt,
            "Translate the following text into German. Keep prices and times intact.\n\nTwo flights found."
        );
        assert!(translation_prompt("x", "Portuguese").contains("into Portuguese."));
    }

    #[test]
    fn test_language_names() {
        assert_eq!(language_name("TR"), "Turkish");
        assert_eq!(language_name(" it "), "Italian");
        assert_eq!(language_name("pt-BR"), "pt-BR");
    }

    #[test]
    fn test_first_text_block_wins() {
        let json = r#"{"content": [
            {"type": "tool_use", "id": "x"},
            {"type": "text", "text": "Hallo"},
            {"type": "text", "text": "ignored"}
        ]}"#;
        let parsed: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(first_text(parsed).as_deref(), Some("Hallo"));

        let parsed: MessagesResponse = serde_json::from_str(r#"{"content": []}"#).unwrap();
        assert_eq!(first_text(parsed), None);
    }

    #[test]
    fn test_request_shape() {
        let request = MessagesRequest {
            model: "claude-3-haiku-20240307",
            max_tokens: 800,
            messages: vec![MessageParam {
                role: "user",
                content: "hi".to_string(),
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 800);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_echo_translator() {
        let out = EchoTranslator.translate("Hello", "fr").await.unwrap();
        assert_eq!(out, "(Local mock) [fr] Hello");
    }

    #[tokio::test]
    async fn test_unusable_api_key_is_translation_failure() {
        let cfg = AnthropicConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..AnthropicConfig::default()
        };
        let err = ClaudeTranslator::new("sk-ant\nbroken", &cfg)
            .translate("Hello", "de")
            .await
            .unwrap_err();
        match err {
            TravelAgentError::TranslationFailed(detail) => {
                assert!(detail.contains("invalid Anthropic API key"))
            }
            other => panic!("expected translation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_translation_failure() {
        let cfg = AnthropicConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
            ..AnthropicConfig::default()
        };
        let err = ClaudeTranslator::new("key", &cfg)
            .translate("Hello", "de")
            .await
            .unwrap_err();
        assert!(matches!(err, TravelAgentError::TranslationFailed(_)));
    }
}

use async_openai::{
    Client,
    config::OpenAIConfig as ClientConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::OpenAIConfig;
use crate::error::{Result, TravelAgentError};
use crate::models::{ChatMessage, Role};

/// Produces the assistant's reply for one conversation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

pub fn openai_client(api_key: &str) -> Client<ClientConfig> {
    Client::with_config(ClientConfig::new().with_api_key(api_key.to_string()))
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let built: std::result::Result<ChatCompletionRequestMessage, _> = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map(Into::into),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map(Into::into),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map(Into::into),
    };
    built.map_err(|e| TravelAgentError::GenerationFailed(format!("invalid message: {e}")))
}

/// Chat completions over the OpenAI API
pub struct OpenAiTransport {
    client: Client<ClientConfig>,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiTransport {
    pub fn new(api_key: &str, cfg: &OpenAIConfig) -> Self {
        Self {
            client: openai_client(api_key),
            model: cfg.chat_model.clone(),
            temperature: cfg.temperature,
            timeout: cfg.timeout(),
        }
    }
}

#[async_trait]
impl ReplyGenerator for OpenAiTransport {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| TravelAgentError::GenerationFailed(e.to_string()))?;

        tracing::info!("Generating reply with {}", self.model);
        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                TravelAgentError::GenerationFailed(format!(
                    "no response within {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| TravelAgentError::GenerationFailed(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                TravelAgentError::GenerationFailed("OpenAI API returned empty choices".to_string())
            })
    }
}

/// Offline stand-in used when no OpenAI key is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoGenerator;

#[async_trait]
impl ReplyGenerator for EchoGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let last = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(format!("(Local mock) You said: {last}"))
    }
}

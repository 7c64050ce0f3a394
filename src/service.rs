use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{CallToolResult, Content, ErrorData, ServerCapabilities, ServerInfo},
};
use rmcp_macros::{tool, tool_handler, tool_router};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

use crate::TravelAssistant;
use crate::config::Config;
use crate::error::TravelAgentError;
use crate::tools::city_image::{CityImageParams, city_image_impl};
use crate::tools::flight_chat::{FlightChatParams, flight_chat_impl};
use crate::tools::voice::{
    ReadAloudParams, TranscribeAudioParams, read_aloud_impl, transcribe_audio_impl,
};

/// MCP server exposing the travel assistant as tools
#[derive(Clone)]
pub struct FlightChatService {
    tool_router: ToolRouter<Self>,
    assistant: Arc<TravelAssistant>,
    config: Arc<Config>,
}

impl FlightChatService {
    pub fn new(config: Arc<Config>, assistant: Arc<TravelAssistant>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            assistant,
            config,
        }
    }
}

fn json_success<T: Serialize>(value: T) -> Result<CallToolResult, ErrorData> {
    let content = Content::json(value).map_err(|e| {
        ErrorData::internal_error(format!("Failed to create JSON content: {e}"), None)
    })?;
    Ok(CallToolResult::success(vec![content]))
}

/// Bad input is the caller's to fix; everything else is ours.
fn tool_error(tool: &str, e: TravelAgentError) -> ErrorData {
    match &e {
        TravelAgentError::Validation { .. } => {
            tracing::warn!("{} rejected input: {}", tool, e);
            ErrorData::invalid_params(e.to_string(), None)
        }
        _ => {
            tracing::error!("{} error: {}", tool, e);
            ErrorData::internal_error(e.to_string(), None)
        }
    }
}

#[tool_router]
impl FlightChatService {
    #[tool(
        description = "Chat with the travel assistant. Flight requests (e.g. 'flights from Istanbul to London next Friday') are searched and summarized; optionally translates the reply and illustrates the destination"
    )]
    pub async fn flight_chat(
        &self,
        params: Parameters<FlightChatParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        match flight_chat_impl(&self.assistant, params.0).await {
            Ok(result) => json_success(result),
            Err(e) => Err(tool_error("flight_chat", e)),
        }
    }

    #[tool(
        description = "Transcribe speech from base64 audio or from a file in the server's audio directory"
    )]
    pub async fn transcribe_audio(
        &self,
        params: Parameters<TranscribeAudioParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        match transcribe_audio_impl(&self.config, &self.assistant, params.0).await {
            Ok(result) => json_success(result),
            Err(e) => Err(tool_error("transcribe_audio", e)),
        }
    }

    #[tool(description = "Read text aloud; writes an mp3 file and returns its path")]
    pub async fn read_aloud(
        &self,
        params: Parameters<ReadAloudParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        match read_aloud_impl(&self.config, &self.assistant, params.0).await {
            Ok(result) => json_success(result),
            Err(e) => Err(tool_error("read_aloud", e)),
        }
    }

    #[tool(description = "Generate a 1024x1024 cityscape of a city and return the image path")]
    pub async fn city_image(
        &self,
        params: Parameters<CityImageParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        match city_image_impl(&self.assistant, params.0).await {
            Ok(result) => json_success(result),
            Err(e) => Err(tool_error("city_image", e)),
        }
    }
}

#[tool_handler]
impl ServerHandler for FlightChatService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2024_11_05,
            server_info: rmcp::model::Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
            },
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                ..Default::default()
            },
            instructions: Some(
                "Conversational flight assistant: flight search over Amadeus, replies, translation, speech and city images".into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_invalid_params() {
        let err = tool_error("flight_chat", TravelAgentError::validation("message", "must not be empty"));
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);

        let err = tool_error("city_image", TravelAgentError::ImageFailed("boom".to_string()));
        assert_eq!(err.code, rmcp::model::ErrorCode::INTERNAL_ERROR);
        assert_eq!(err.message, "Image generation failed: boom");
    }

    #[test]
    fn test_json_success_wraps_payload() {
        assert!(json_success(serde_json::json!({ "text": "hello" })).is_ok());
    }

    #[test]
    fn test_server_info_uses_config() {
        let mut cfg = Config::default();
        cfg.amadeus.client_id = "client".to_string();
        cfg.amadeus.client_secret = "secret".to_string();
        cfg.server.name = "flightchat-test".to_string();

        let assistant = Arc::new(TravelAssistant::new(&cfg).unwrap());
        let service = FlightChatService::new(Arc::new(cfg), assistant);
        let info = service.get_info();
        assert_eq!(info.server_info.name, "flightchat-test");
        assert!(info.capabilities.tools.is_some());
    }
}

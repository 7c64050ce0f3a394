use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::TravelAssistant;
use crate::error::{Result, TravelAgentError};
use crate::models::OrchestrationResult;

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FlightChatParams {
    /// Free-text message, e.g. "flights from Istanbul to London next Friday"
    pub message: String,
    /// Also return the reply translated into `target_language`
    #[serde(default)]
    pub translate: bool,
    /// en | de | fr | es | it | tr (default en)
    #[serde(default = "default_language")]
    pub target_language: String,
    /// Generate a picture of the destination when flights were found
    #[serde(default = "default_true")]
    pub include_image: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightChatResult {
    #[serde(flatten)]
    pub result: OrchestrationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

pub async fn flight_chat_impl(
    assistant: &TravelAssistant,
    params: FlightChatParams,
) -> Result<FlightChatResult> {
    let message = params.message.trim();
    if message.is_empty() {
        return Err(TravelAgentError::validation("message", "must not be empty"));
    }

    let result = assistant
        .answer(message, params.translate, &params.target_language)
        .await?;

    let image_path = match (&result.destination_label, params.include_image) {
        (Some(label), true) if !result.offers.is_empty() => illustrate(assistant, label).await,
        _ => None,
    };

    Ok(FlightChatResult { result, image_path })
}

/// A missing picture never fails the chat turn.
async fn illustrate(assistant: &TravelAssistant, city: &str) -> Option<String> {
    let images = match assistant.images() {
        Ok(images) => images,
        Err(e) => {
            tracing::debug!("Skipping city image: {}", e);
            return None;
        }
    };
    match images.city_image(city).await {
        Ok(path) => Some(path.display().to_string()),
        Err(e) => {
            tracing::warn!("City image for {} failed: {}", city, e);
            None
        }
    }
}

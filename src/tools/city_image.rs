use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::TravelAssistant;
use crate::error::{Result, TravelAgentError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CityImageParams {
    /// City to picture, e.g. "London"
    pub city: String,
}

#[derive(Debug, Serialize)]
pub struct CityImageResult {
    pub city: String,
    pub image_path: String,
}

pub async fn city_image_impl(
    assistant: &TravelAssistant,
    params: CityImageParams,
) -> Result<CityImageResult> {
    let city = params.city.trim();
    if city.is_empty() {
        return Err(TravelAgentError::validation("city", "must not be empty"));
    }
    let path = assistant.images()?.city_image(city).await?;
    Ok(CityImageResult {
        city: city.to_string(),
        image_path: path.display().to_string(),
    })
}

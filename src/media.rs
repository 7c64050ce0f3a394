use async_openai::{
    Client,
    config::OpenAIConfig as ClientConfig,
    types::{CreateImageRequestArgs, Image, ImageModel, ImageResponseFormat, ImageSize},
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use crate::config::OpenAIConfig;
use crate::error::{Result, TravelAgentError};
use crate::transport::openai_client;

static UNSAFE_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_.-]+").expect("Invalid file name regex"));

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate a picture of `city` and return where it was written.
    async fn city_image(&self, city: &str) -> Result<PathBuf>;
}

/// File-system safe form of a city name; never empty.
pub fn safe_name(city: &str) -> String {
    let replaced = UNSAFE_CHARS_RE.replace_all(city.trim(), "_");
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        "city".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn city_prompt(city: &str) -> String {
    format!(
        "A high-quality 1024x1024 photorealistic wide cityscape of {city}, with iconic landmarks and golden-hour lighting."
    )
}

pub fn image_path(dir: &Path, city: &str) -> PathBuf {
    dir.join(format!("city_{}.png", safe_name(city)))
}

async fn write_image(dir: &Path, city: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = image_path(dir, city);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// City images over the OpenAI images API
pub struct OpenAiImages {
    client: Client<ClientConfig>,
    http: reqwest::Client,
    model: String,
    output_dir: PathBuf,
    timeout: Duration,
}

impl OpenAiImages {
    pub fn new(api_key: &str, cfg: &OpenAIConfig, output_dir: PathBuf) -> Self {
        Self {
            client: openai_client(api_key),
            http: reqwest::Client::new(),
            model: cfg.image_model.clone(),
            output_dir,
            timeout: cfg.timeout(),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TravelAgentError::ImageFailed(format!("download failed: {e}")))?;
        if !response.status().is_success() {
            return Err(TravelAgentError::ImageFailed(format!(
                "download returned {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TravelAgentError::ImageFailed(format!("download failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImages {
    async fn city_image(&self, city: &str) -> Result<PathBuf> {
        if city.trim().is_empty() {
            return Err(TravelAgentError::validation("city", "must not be empty"));
        }

        let request = CreateImageRequestArgs::default()
            .prompt(city_prompt(city.trim()))
            .model(ImageModel::Other(self.model.clone()))
            .n(1)
            .size(ImageSize::S1024x1024)
            .response_format(ImageResponseFormat::B64Json)
            .build()
            .map_err(|e| TravelAgentError::ImageFailed(e.to_string()))?;

        tracing::info!("Generating city image for {} with {}", city, self.model);
        let response = tokio::time::timeout(self.timeout, self.client.images().create(request))
            .await
            .map_err(|_| {
                TravelAgentError::ImageFailed(format!(
                    "no response within {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| TravelAgentError::ImageFailed(e.to_string()))?;

        let image = response
            .data
            .first()
            .ok_or_else(|| TravelAgentError::ImageFailed("no image returned".to_string()))?;

        let bytes = match image.as_ref() {
            Image::B64Json { b64_json, .. } => STANDARD
                .decode(b64_json.as_bytes())
                .map_err(|e| TravelAgentError::ImageFailed(format!("bad base64 payload: {e}")))?,
            Image::Url { url, .. } => self.download(url).await?,
        };

        let path = write_image(&self.output_dir, city, &bytes).await?;
        tracing::info!("Saved city image to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_name() {
        assert_eq!(safe_name("London"), "London");
        assert_eq!(safe_name("New York"), "New_York");
        assert_eq!(safe_name("Istanbul (Sabiha Gökçen)"), "Istanbul_Sabiha_G_k_en");
        assert_eq!(safe_name("  ../etc  "), ".._etc");
        assert_eq!(safe_name("東京"), "city");
        assert_eq!(safe_name(""), "city");
    }

    #[test]
    fn test_prompt_and_path() {
        assert!(city_prompt("Paris").contains("wide cityscape of Paris,"));
        assert_eq!(
            image_path(Path::new("out"), "new york"),
            PathBuf::from("out/city_new_york.png")
        );
    }

    #[tokio::test]
    async fn test_write_image_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("images");
        let path = write_image(&nested, "Rome", b"\x89PNG").await.unwrap();
        assert_eq!(path, nested.join("city_Rome.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_blank_city_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let images = OpenAiImages::new("sk-test", &OpenAIConfig::default(), dir.path().to_path_buf());
        let err = images.city_image("  ").await.unwrap_err();
        assert!(matches!(err, TravelAgentError::Validation { .. }));
    }
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{GeneratedImage, ImageGenerator, ProviderError};

pub(crate) const PROVIDER: &str = "openai";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub image_size: String,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    prompt: &'a str,
    n: u8,
    size: &'a str,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct OpenAiImageGenerator {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiImageGenerator {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn generations_url(&self) -> String {
        format!(
            "{}/images/generations",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let request = ImageGenerationRequest {
            prompt,
            n: 1,
            size: &self.config.image_size,
            response_format: "b64_json",
        };
        debug!(size = %self.config.image_size, "requesting image generation");
        let response = self
            .http
            .post(self.generations_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("image generation request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = rejection_message(&body);
            warn!(status = status.as_u16(), %message, "image generation rejected");
            return Err(ProviderError::Rejected {
                provider: PROVIDER,
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body: ImageGenerationResponse = response
            .json()
            .await
            .context("invalid image generation response")?;
        body.data
            .into_iter()
            .find_map(|image| image.b64_json)
            .map(|b64_json| GeneratedImage { b64_json })
            .ok_or_else(|| ProviderError::EmptyResponse { provider: PROVIDER }.into())
    }
}

pub(crate) fn rejection_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "Something went wrong!".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

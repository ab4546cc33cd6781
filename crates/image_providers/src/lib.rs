//! Third-party collaborators behind the gallery: an AI image generator and an
//! image host. The server only talks to them through the traits below.

use async_trait::async_trait;
use thiserror::Error;

pub mod cloudinary;
pub mod openai;

pub use cloudinary::{CloudinaryConfig, CloudinaryImageHost, SignatureAlgorithm};
pub use openai::{OpenAiConfig, OpenAiImageGenerator};

/// Base64-encoded image produced from a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub b64_json: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImage {
    pub url: String,
    pub public_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} rejected the request ({status}): {message}")]
    Rejected {
        provider: &'static str,
        status: u16,
        message: String,
    },
    #[error("{provider} returned no image")]
    EmptyResponse { provider: &'static str },
    #[error("{provider} is not configured: missing {setting}")]
    NotConfigured {
        provider: &'static str,
        setting: &'static str,
    },
}

impl ProviderError {
    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<GeneratedImage>;
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Uploads a data URL or remote image URL and returns where it is hosted.
    async fn upload(&self, photo: &str) -> anyhow::Result<HostedImage>;
}

pub struct MissingImageGenerator;

#[async_trait]
impl ImageGenerator for MissingImageGenerator {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<GeneratedImage> {
        Err(ProviderError::NotConfigured {
            provider: openai::PROVIDER,
            setting: "OPENAI_API_KEY",
        }
        .into())
    }
}

pub struct MissingImageHost;

#[async_trait]
impl ImageHost for MissingImageHost {
    async fn upload(&self, _photo: &str) -> anyhow::Result<HostedImage> {
        Err(ProviderError::NotConfigured {
            provider: cloudinary::PROVIDER,
            setting: "CLOUDINARY_API_SECRET",
        }
        .into())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::{openai::rejection_message, HostedImage, ImageHost, ProviderError};

pub(crate) const PROVIDER: &str = "cloudinary";
pub const DEFAULT_CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Digest used for upload signatures. Accounts verify SHA-1 unless they have
/// opted into SHA-256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
    pub folder: Option<String>,
    pub signature_algorithm: SignatureAlgorithm,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: Option<String>,
}

pub struct CloudinaryImageHost {
    http: Client,
    config: CloudinaryConfig,
}

impl CloudinaryImageHost {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    fn signed_form(&self, photo: &str, timestamp: i64) -> Vec<(String, String)> {
        let mut signed = BTreeMap::new();
        signed.insert("timestamp".to_string(), timestamp.to_string());
        if let Some(folder) = self.config.folder.as_deref().filter(|f| !f.is_empty()) {
            signed.insert("folder".to_string(), folder.to_string());
        }
        let algorithm = self.config.signature_algorithm;
        let signature = sign_params(&signed, &self.config.api_secret, algorithm);

        let mut form: Vec<(String, String)> = signed.into_iter().collect();
        form.push(("file".to_string(), photo.to_string()));
        form.push(("api_key".to_string(), self.config.api_key.clone()));
        form.push(("signature".to_string(), signature));
        if algorithm == SignatureAlgorithm::Sha256 {
            form.push(("signature_algorithm".to_string(), "sha256".to_string()));
        }
        form
    }
}

/// Hex digest over `k1=v1&k2=v2...` (keys sorted) followed by the API secret.
pub fn sign_params(
    params: &BTreeMap<String, String>,
    api_secret: &str,
    algorithm: SignatureAlgorithm,
) -> String {
    let to_sign = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    match algorithm {
        SignatureAlgorithm::Sha1 => hex_digest::<Sha1>(&to_sign, api_secret),
        SignatureAlgorithm::Sha256 => hex_digest::<Sha256>(&to_sign, api_secret),
    }
}

fn hex_digest<D: Digest>(to_sign: &str, api_secret: &str) -> String {
    let mut hasher = D::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageHost for CloudinaryImageHost {
    async fn upload(&self, photo: &str) -> Result<HostedImage> {
        let form = self.signed_form(photo, Utc::now().timestamp());
        debug!(cloud = %self.config.cloud_name, bytes = photo.len(), "uploading image");
        let response = self
            .http
            .post(self.upload_url())
            .form(&form)
            .send()
            .await
            .context("image upload request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = rejection_message(&body);
            warn!(status = status.as_u16(), %message, "image upload rejected");
            return Err(ProviderError::Rejected {
                provider: PROVIDER,
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body: UploadResponse = response
            .json()
            .await
            .context("invalid image upload response")?;
        let url = body
            .secure_url
            .or(body.url)
            .ok_or(ProviderError::EmptyResponse { provider: PROVIDER })?;
        Ok(HostedImage {
            url,
            public_id: body.public_id,
        })
    }
}

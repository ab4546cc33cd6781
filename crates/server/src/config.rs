use std::{collections::HashMap, path::Path};

use anyhow::Context;
use config::{Config, Environment, File};
use image_providers::SignatureAlgorithm;
use serde::Deserialize;
use tracing::debug;

pub const SETTINGS_FILE: &str = "server.toml";

/// Conventional variable names accepted alongside the `APP__*` form.
const CONVENTIONAL_ENV: &[(&str, &str)] = &[
    ("SERVER_BIND", "bind_addr"),
    ("DATABASE_URL", "database_url"),
    ("OPENAI_API_KEY", "openai_api_key"),
    ("CLOUDINARY_CLOUD_NAME", "cloudinary_cloud_name"),
    ("CLOUDINARY_API_KEY", "cloudinary_api_key"),
    ("CLOUDINARY_API_SECRET", "cloudinary_api_secret"),
    ("CLOUDINARY_SIGNATURE_ALGORITHM", "cloudinary_signature_algorithm"),
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: String,
    pub max_body_bytes: usize,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub image_size: String,
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_api_key: Option<String>,
    pub cloudinary_api_secret: Option<String>,
    pub cloudinary_base_url: String,
    pub cloudinary_folder: Option<String>,
    pub cloudinary_signature_algorithm: SignatureAlgorithm,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/gallery.db".into(),
            max_body_bytes: 50 * 1024 * 1024,
            openai_api_key: None,
            openai_base_url: image_providers::openai::DEFAULT_OPENAI_BASE_URL.into(),
            image_size: image_providers::openai::DEFAULT_IMAGE_SIZE.into(),
            cloudinary_cloud_name: None,
            cloudinary_api_key: None,
            cloudinary_api_secret: None,
            cloudinary_base_url: image_providers::cloudinary::DEFAULT_CLOUDINARY_BASE_URL.into(),
            cloudinary_folder: None,
            cloudinary_signature_algorithm: SignatureAlgorithm::default(),
        }
    }
}

/// Defaults, then `server.toml`, then `.env` and process environment.
pub fn load_settings() -> anyhow::Result<Settings> {
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded .env");
    }
    let env: HashMap<String, String> = std::env::vars().collect();
    settings_from_sources(Some(Path::new(SETTINGS_FILE)), &env)
}

pub(crate) fn settings_from_sources(
    file: Option<&Path>,
    env: &HashMap<String, String>,
) -> anyhow::Result<Settings> {
    let mut builder = Config::builder();
    if let Some(file) = file {
        builder = builder.add_source(File::from(file).required(false));
    }
    let settings = builder
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .source(Some(layered_env(env))),
        )
        .build()
        .context("failed to read server settings")?
        .try_deserialize::<Settings>()
        .context("invalid server settings")?;
    Ok(settings)
}

/// `APP__*` variables win over their conventional counterparts.
fn layered_env(env: &HashMap<String, String>) -> HashMap<String, String> {
    let mut layered = HashMap::new();
    for (name, key) in CONVENTIONAL_ENV {
        if let Some(value) = env.get(*name) {
            layered.insert(format!("APP__{}", key.to_uppercase()), value.clone());
        }
    }
    for (name, value) in env {
        if name.starts_with("APP__") {
            layered.insert(name.clone(), value.clone());
        }
    }
    layered
}

/// Turns a plain file path into a SQLite URL. Blank input falls back to the
/// default database.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

use std::sync::Arc;

use image_providers::{ImageGenerator, ImageHost, ProviderError};
use rand::Rng;
use shared::{
    domain::{Post, PostId},
    error::{ApiError, ErrorCode},
    prompts::PromptCatalog,
    protocol::{CreatePostRequest, GenerateImageResponse, RandomPromptResponse},
};
use storage::Storage;
use tracing::{info, warn};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub generator: Arc<dyn ImageGenerator>,
    pub image_host: Arc<dyn ImageHost>,
    pub prompts: PromptCatalog,
}

/// Asks the image generator for an image and returns it base64-encoded.
pub async fn generate_image(
    ctx: &ApiContext,
    prompt: &str,
) -> Result<GenerateImageResponse, ApiError> {
    let prompt = require_field(prompt, "prompt")?;
    let image = ctx.generator.generate(prompt).await.map_err(upstream)?;
    info!(prompt_len = prompt.len(), "image generated");
    Ok(GenerateImageResponse {
        photo: image.b64_json,
    })
}

/// Uploads the photo to the image host, then records the post with the hosted URL.
pub async fn create_post(ctx: &ApiContext, req: &CreatePostRequest) -> Result<Post, ApiError> {
    let name = require_field(&req.name, "name")?;
    let prompt = require_field(&req.prompt, "prompt")?;
    let photo = require_field(&req.photo, "photo")?;

    let hosted = ctx.image_host.upload(photo).await.map_err(upstream)?;
    let post = ctx
        .storage
        .create_post(name, prompt, &hosted.url)
        .await
        .map_err(internal)?;
    info!(post_id = post.id.0, url = %post.photo_url, "post published");
    Ok(post)
}

pub async fn list_posts(ctx: &ApiContext) -> Result<Vec<Post>, ApiError> {
    ctx.storage.list_posts().await.map_err(internal)
}

pub async fn load_post(ctx: &ApiContext, post_id: PostId) -> Result<Post, ApiError> {
    ctx.storage
        .load_post(post_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            ApiError::new(
                ErrorCode::NotFound,
                format!("post {} not found", post_id.0),
            )
        })
}

pub fn random_prompt<R: Rng + ?Sized>(
    ctx: &ApiContext,
    current: &str,
    rng: &mut R,
) -> RandomPromptResponse {
    RandomPromptResponse {
        prompt: ctx.prompts.surprise_me(current, rng),
    }
}

fn require_field<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(value)
}

fn upstream(err: anyhow::Error) -> ApiError {
    warn!(error = %err, "image provider call failed");
    let message = match err.downcast_ref::<ProviderError>() {
        Some(provider_err) => provider_err.user_message(),
        None => err.to_string(),
    };
    ApiError::new(ErrorCode::Upstream, message)
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

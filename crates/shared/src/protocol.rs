use serde::{Deserialize, Serialize};

use crate::domain::{Post, PostId};

pub const GENERATE_IMAGE_ROUTE: &str = "/api/v1/dalle";
pub const POSTS_ROUTE: &str = "/api/v1/post";
pub const POST_BY_ID_ROUTE: &str = "/api/v1/post/:id";
pub const RANDOM_PROMPT_ROUTE: &str = "/api/v1/prompts/random";

pub fn post_path(post_id: PostId) -> String {
    format!("{POSTS_ROUTE}/{}", post_id.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateImageRequest {
    #[serde(default)]
    pub prompt: String,
}

/// Base64-encoded image bytes as returned by the image generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateImageResponse {
    pub photo: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prompt: String,
    /// Data URL (`data:image/jpeg;base64,...`) or a remote image URL.
    #[serde(default)]
    pub photo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostListResponse {
    pub success: bool,
    pub data: Vec<Post>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCreatedResponse {
    pub success: bool,
    pub data: Post,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub success: bool,
    pub data: Post,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RandomPromptQuery {
    #[serde(default)]
    pub current: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomPromptResponse {
    pub prompt: String,
}

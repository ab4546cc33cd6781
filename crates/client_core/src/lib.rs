use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use shared::{
    domain::{Post, PostId},
    error::{ApiError, ApiException},
    protocol::{
        post_path, CreatePostRequest, GenerateImageRequest, GenerateImageResponse,
        PostCreatedResponse, PostListResponse, PostResponse, RandomPromptResponse,
        GENERATE_IMAGE_ROUTE, POSTS_ROUTE, RANDOM_PROMPT_ROUTE,
    },
};
use tracing::info;
use url::Url;

pub mod form;
pub mod gallery_search;

pub use form::{CreatePostForm, FormError, GeneratedPhoto};
pub use gallery_search::{GallerySearch, GalleryView, SearchPhase};

/// Supplies the full post list for one gallery view activation.
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_all_posts(&self) -> Result<Vec<Post>>;
}

/// HTTP client for the gallery server.
#[derive(Clone)]
pub struct GalleryClient {
    http: Client,
    server_url: Url,
}

impl GalleryClient {
    pub fn new(server_url: &str) -> Result<Self> {
        let server_url =
            Url::parse(server_url).with_context(|| format!("invalid server url '{server_url}'"))?;
        Ok(Self {
            http: Client::new(),
            server_url,
        })
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    fn endpoint(&self, route: &str) -> Result<Url> {
        self.server_url
            .join(route)
            .with_context(|| format!("invalid route '{route}'"))
    }

    pub async fn generate_image(&self, request: &GenerateImageRequest) -> Result<GeneratedPhoto> {
        let response = self
            .http
            .post(self.endpoint(GENERATE_IMAGE_ROUTE)?)
            .json(request)
            .send()
            .await?;
        let body: GenerateImageResponse = checked(response).await?.json().await?;
        Ok(GeneratedPhoto { b64: body.photo })
    }

    pub async fn share_post(&self, request: &CreatePostRequest) -> Result<Post> {
        let response = self
            .http
            .post(self.endpoint(POSTS_ROUTE)?)
            .json(request)
            .send()
            .await?;
        let body: PostCreatedResponse = checked(response).await?.json().await?;
        info!(post_id = body.data.id.0, "post shared");
        Ok(body.data)
    }

    pub async fn fetch_post(&self, post_id: PostId) -> Result<Post> {
        let response = self
            .http
            .get(self.endpoint(&post_path(post_id))?)
            .send()
            .await?;
        let body: PostResponse = checked(response).await?.json().await?;
        Ok(body.data)
    }

    pub async fn random_prompt(&self, current: &str) -> Result<String> {
        let response = self
            .http
            .get(self.endpoint(RANDOM_PROMPT_ROUTE)?)
            .query(&[("current", current)])
            .send()
            .await?;
        let body: RandomPromptResponse = checked(response).await?.json().await?;
        Ok(body.prompt)
    }

    /// Raw bytes of a post's hosted image.
    pub async fn download_photo(&self, post: &Post) -> Result<Vec<u8>> {
        let bytes = self
            .http
            .get(&post.photo_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PostSource for GalleryClient {
    /// Newest post first.
    async fn fetch_all_posts(&self) -> Result<Vec<Post>> {
        let response = self.http.get(self.endpoint(POSTS_ROUTE)?).send().await?;
        let body: PostListResponse = checked(response).await?.json().await?;
        let mut posts = body.data;
        posts.reverse();
        Ok(posts)
    }
}

/// Turns a non-success response into an error carrying the server's message.
async fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => Err(ApiException::from(api_error).into()),
        Err(_) => Err(anyhow!("server returned {status}: {body}")),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

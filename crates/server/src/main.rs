use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use image_providers::{
    CloudinaryConfig, CloudinaryImageHost, ImageGenerator, ImageHost, MissingImageGenerator,
    MissingImageHost, OpenAiConfig, OpenAiImageGenerator,
};
use server_api::{create_post, generate_image, list_posts, load_post, random_prompt, ApiContext};
use shared::{
    domain::PostId,
    error::{ApiError, ErrorCode},
    prompts::PromptCatalog,
    protocol::{
        CreatePostRequest, GenerateImageRequest, GenerateImageResponse, PostCreatedResponse,
        PostListResponse, PostResponse, RandomPromptQuery, RandomPromptResponse,
        GENERATE_IMAGE_ROUTE, POSTS_ROUTE, POST_BY_ID_ROUTE, RANDOM_PROMPT_ROUTE,
    },
};
use storage::Storage;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_database_url, Settings};

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

type ApiRejection = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings()?;
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let api = ApiContext {
        storage,
        generator: image_generator(&settings),
        image_host: image_host(&settings),
        prompts: PromptCatalog::default(),
    };
    let app = build_router(Arc::new(AppState { api }), settings.max_body_bytes);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn image_generator(settings: &Settings) -> Arc<dyn ImageGenerator> {
    match non_empty(&settings.openai_api_key) {
        Some(api_key) => Arc::new(OpenAiImageGenerator::new(OpenAiConfig {
            api_key: api_key.to_string(),
            base_url: settings.openai_base_url.clone(),
            image_size: settings.image_size.clone(),
        })),
        None => {
            warn!("OPENAI_API_KEY is not set; image generation requests will fail");
            Arc::new(MissingImageGenerator)
        }
    }
}

fn image_host(settings: &Settings) -> Arc<dyn ImageHost> {
    let credentials = (
        non_empty(&settings.cloudinary_cloud_name),
        non_empty(&settings.cloudinary_api_key),
        non_empty(&settings.cloudinary_api_secret),
    );
    match credentials {
        (Some(cloud_name), Some(api_key), Some(api_secret)) => {
            Arc::new(CloudinaryImageHost::new(CloudinaryConfig {
                cloud_name: cloud_name.to_string(),
                api_key: api_key.to_string(),
                api_secret: api_secret.to_string(),
                base_url: settings.cloudinary_base_url.clone(),
                folder: settings.cloudinary_folder.clone(),
                signature_algorithm: settings.cloudinary_signature_algorithm,
            }))
        }
        _ => {
            warn!("Cloudinary credentials are incomplete; sharing posts will fail");
            Arc::new(MissingImageHost)
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route(
            GENERATE_IMAGE_ROUTE,
            get(generator_greeting).post(http_generate_image),
        )
        .route(POSTS_ROUTE, get(http_list_posts).post(http_create_post))
        .route(POST_BY_ID_ROUTE, get(http_load_post))
        .route(RANDOM_PROMPT_ROUTE, get(http_random_prompt))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn reject(err: ApiError) -> ApiRejection {
    let status = match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Upstream => StatusCode::BAD_GATEWAY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

async fn root() -> &'static str {
    "Hello from DreamBoard!"
}

async fn generator_greeting() -> &'static str {
    "Hello from the image generator!"
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiRejection> {
    state.api.storage.health_check().await.map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Internal, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn http_generate_image(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateImageRequest>,
) -> Result<Json<GenerateImageResponse>, ApiRejection> {
    let response = generate_image(&state.api, &req.prompt)
        .await
        .map_err(reject)?;
    Ok(Json(response))
}

async fn http_list_posts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PostListResponse>, ApiRejection> {
    let posts = list_posts(&state.api).await.map_err(reject)?;
    Ok(Json(PostListResponse {
        success: true,
        data: posts,
    }))
}

async fn http_load_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiRejection> {
    let post = load_post(&state.api, PostId(id)).await.map_err(reject)?;
    Ok(Json(PostResponse {
        success: true,
        data: post,
    }))
}

async fn http_create_post(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostCreatedResponse>), ApiRejection> {
    let post = create_post(&state.api, &req).await.map_err(reject)?;
    Ok((
        StatusCode::CREATED,
        Json(PostCreatedResponse {
            success: true,
            data: post,
        }),
    ))
}

async fn http_random_prompt(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RandomPromptQuery>,
) -> Json<RandomPromptResponse> {
    Json(random_prompt(&state.api, &q.current, &mut rand::thread_rng()))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;

use super::*;
use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::Request,
};
use image_providers::{GeneratedImage, HostedImage, ProviderError};
use shared::{domain::Post, protocol::post_path};
use tower::ServiceExt;

struct FixedGenerator;

#[async_trait]
impl ImageGenerator for FixedGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<GeneratedImage> {
        if prompt.contains("forbidden") {
            return Err(ProviderError::Rejected {
                provider: "openai",
                status: 400,
                message: "Your request was rejected as a result of our safety system.".into(),
            }
            .into());
        }
        Ok(GeneratedImage {
            b64_json: "aW1hZ2U=".into(),
        })
    }
}

struct FixedHost;

#[async_trait]
impl ImageHost for FixedHost {
    async fn upload(&self, _photo: &str) -> anyhow::Result<HostedImage> {
        Ok(HostedImage {
            url: "https://res.example/hosted.jpg".into(),
            public_id: Some("hosted".into()),
        })
    }
}

async fn test_app_with_limit(max_body_bytes: usize) -> (Router, Storage) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let api = ApiContext {
        storage: storage.clone(),
        generator: Arc::new(FixedGenerator),
        image_host: Arc::new(FixedHost),
        prompts: PromptCatalog::default(),
    };
    (
        build_router(Arc::new(AppState { api }), max_body_bytes),
        storage,
    )
}

async fn test_app() -> (Router, Storage) {
    test_app_with_limit(1024 * 1024).await
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec()
}

#[tokio::test]
async fn root_and_generator_greetings() {
    let (app, _storage) = test_app().await;

    let response = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"Hello from DreamBoard!");

    let response = app
        .oneshot(
            Request::get(GENERATE_IMAGE_ROUTE)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"Hello from the image generator!");
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ok");
}

#[tokio::test]
async fn generate_route_returns_photo() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(json_request(
            "POST",
            GENERATE_IMAGE_ROUTE,
            serde_json::json!({ "prompt": "a cat sat" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let dto: GenerateImageResponse =
        serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(dto.photo, "aW1hZ2U=");
}

#[tokio::test]
async fn generate_route_validates_and_reports_upstream_errors() {
    let (app, _storage) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request("POST", GENERATE_IMAGE_ROUTE, serde_json::json!({})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(err.code, ErrorCode::Validation);

    let response = app
        .oneshot(json_request(
            "POST",
            GENERATE_IMAGE_ROUTE,
            serde_json::json!({ "prompt": "something forbidden" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let err: ApiError = serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(err.code, ErrorCode::Upstream);
    assert_eq!(
        err.message,
        "Your request was rejected as a result of our safety system."
    );
}

#[tokio::test]
async fn create_then_list_posts() {
    let (app, storage) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            POSTS_ROUTE,
            serde_json::json!({
                "name": "Ann",
                "prompt": "a cat sat",
                "photo": "data:image/jpeg;base64,aW1hZ2U="
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: PostCreatedResponse =
        serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert!(created.success);
    assert_eq!(created.data.photo_url, "https://res.example/hosted.jpg");
    assert_eq!(storage.post_count().await.expect("count"), 1);

    let response = app
        .oneshot(Request::get(POSTS_ROUTE).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let raw: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(raw["success"], true);
    assert_eq!(raw["data"][0]["_id"], created.data.id.0);
    assert_eq!(raw["data"][0]["photo"], "https://res.example/hosted.jpg");

    let listed: Vec<Post> = serde_json::from_value(raw["data"].clone()).expect("posts");
    assert_eq!(listed, vec![created.data]);
}

#[tokio::test]
async fn create_post_rejects_missing_fields() {
    let (app, storage) = test_app().await;
    let response = app
        .oneshot(json_request(
            "POST",
            POSTS_ROUTE,
            serde_json::json!({ "name": "Ann", "prompt": "a cat sat" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(err.message, "photo is required");
    assert_eq!(storage.post_count().await.expect("count"), 0);
}

#[tokio::test]
async fn random_prompt_route_avoids_current_prompt() {
    let (app, _storage) = test_app().await;
    let catalog = PromptCatalog::default();
    let current = &catalog.prompts()[0];
    let uri = format!(
        "{RANDOM_PROMPT_ROUTE}?current={}",
        current.replace(' ', "%20").replace(',', "%2C")
    );

    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let dto: RandomPromptResponse =
        serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_ne!(&dto.prompt, current);
    assert!(catalog.prompts().contains(&dto.prompt));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (app, storage) = test_app_with_limit(256).await;
    let photo = format!("data:image/jpeg;base64,{}", "A".repeat(1024));
    let response = app
        .oneshot(json_request(
            "POST",
            POSTS_ROUTE,
            serde_json::json!({ "name": "Ann", "prompt": "big", "photo": photo }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(storage.post_count().await.expect("count"), 0);
}

#[tokio::test]
async fn cors_preflight_is_allowed() {
    let (app, _storage) = test_app().await;
    let request = Request::builder()
        .method("OPTIONS")
        .uri(POSTS_ROUTE)
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn single_post_route_returns_post_or_not_found() {
    let (app, storage) = test_app().await;
    let stored = storage
        .create_post("Ann", "a cat sat", "https://res.example/1.jpg")
        .await
        .expect("create");

    let response = app
        .clone()
        .oneshot(
            Request::get(post_path(stored.id))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let loaded: PostResponse = serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(loaded.data, stored);

    let response = app
        .oneshot(
            Request::get(post_path(PostId(stored.id.0 + 41)))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let err: ApiError = serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(err.code, ErrorCode::NotFound);
}

use super::*;
use async_trait::async_trait;
use image_providers::{GeneratedImage, HostedImage, MissingImageHost};
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Mutex;

#[derive(Default)]
struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageGenerator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<GeneratedImage> {
        self.prompts.lock().expect("lock").push(prompt.to_string());
        Ok(GeneratedImage {
            b64_json: "aW1hZ2U=".into(),
        })
    }
}

struct RejectingGenerator;

#[async_trait]
impl ImageGenerator for RejectingGenerator {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<GeneratedImage> {
        Err(ProviderError::Rejected {
            provider: "openai",
            status: 400,
            message: "Billing hard limit has been reached".into(),
        }
        .into())
    }
}

#[derive(Default)]
struct RecordingHost {
    uploads: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageHost for RecordingHost {
    async fn upload(&self, photo: &str) -> anyhow::Result<HostedImage> {
        let mut uploads = self.uploads.lock().expect("lock");
        uploads.push(photo.to_string());
        Ok(HostedImage {
            url: format!("https://res.example/{}.jpg", uploads.len()),
            public_id: None,
        })
    }
}

async fn setup(
    generator: Arc<dyn ImageGenerator>,
    image_host: Arc<dyn ImageHost>,
) -> ApiContext {
    ApiContext {
        storage: Storage::new("sqlite::memory:").await.expect("db"),
        generator,
        image_host,
        prompts: PromptCatalog::default(),
    }
}

fn post_request(name: &str, prompt: &str, photo: &str) -> CreatePostRequest {
    CreatePostRequest {
        name: name.into(),
        prompt: prompt.into(),
        photo: photo.into(),
    }
}

#[tokio::test]
async fn generate_image_returns_base64_photo() {
    let generator = Arc::new(RecordingGenerator::default());
    let ctx = setup(generator.clone(), Arc::new(RecordingHost::default())).await;

    let response = generate_image(&ctx, "a cat sat").await.expect("image");
    assert_eq!(response.photo, "aW1hZ2U=");
    assert_eq!(*generator.prompts.lock().expect("lock"), vec!["a cat sat"]);
}

#[tokio::test]
async fn generate_image_requires_prompt() {
    let generator = Arc::new(RecordingGenerator::default());
    let ctx = setup(generator.clone(), Arc::new(RecordingHost::default())).await;

    let err = generate_image(&ctx, "   ").await.expect_err("blank prompt");
    assert_eq!(err.code, ErrorCode::Validation);
    assert_eq!(err.message, "prompt is required");
    assert!(generator.prompts.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn generator_rejection_is_reported_as_upstream_error() {
    let ctx = setup(Arc::new(RejectingGenerator), Arc::new(RecordingHost::default())).await;

    let err = generate_image(&ctx, "a dog").await.expect_err("rejected");
    assert_eq!(err.code, ErrorCode::Upstream);
    assert_eq!(err.message, "Billing hard limit has been reached");
}

#[tokio::test]
async fn create_post_stores_hosted_url() {
    let host = Arc::new(RecordingHost::default());
    let ctx = setup(Arc::new(RecordingGenerator::default()), host.clone()).await;

    let post = create_post(
        &ctx,
        &post_request("Ann", "a cat sat", "data:image/jpeg;base64,aW1hZ2U="),
    )
    .await
    .expect("post");
    assert_eq!(post.name, "Ann");
    assert_eq!(post.photo_url, "https://res.example/1.jpg");
    assert_eq!(
        *host.uploads.lock().expect("lock"),
        vec!["data:image/jpeg;base64,aW1hZ2U="]
    );

    let listed = list_posts(&ctx).await.expect("list");
    assert_eq!(listed, vec![post]);
}

#[tokio::test]
async fn create_post_requires_every_field() {
    let host = Arc::new(RecordingHost::default());
    let ctx = setup(Arc::new(RecordingGenerator::default()), host.clone()).await;

    for (req, field) in [
        (post_request("", "p", "photo"), "name"),
        (post_request("Ann", "", "photo"), "prompt"),
        (post_request("Ann", "p", " "), "photo"),
    ] {
        let err = create_post(&ctx, &req).await.expect_err("missing field");
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, format!("{field} is required"));
    }
    assert!(host.uploads.lock().expect("lock").is_empty());
    assert!(list_posts(&ctx).await.expect("list").is_empty());
}

#[tokio::test]
async fn failed_upload_does_not_store_post() {
    let ctx = setup(
        Arc::new(RecordingGenerator::default()),
        Arc::new(MissingImageHost),
    )
    .await;

    let err = create_post(&ctx, &post_request("Ann", "p", "data:x"))
        .await
        .expect_err("unconfigured host");
    assert_eq!(err.code, ErrorCode::Upstream);
    assert!(list_posts(&ctx).await.expect("list").is_empty());
}

#[tokio::test]
async fn random_prompt_differs_from_current() {
    let ctx = setup(
        Arc::new(RecordingGenerator::default()),
        Arc::new(RecordingHost::default()),
    )
    .await;
    let mut rng = StdRng::seed_from_u64(42);
    let current = ctx.prompts.prompts()[0].clone();

    for _ in 0..100 {
        let response = random_prompt(&ctx, &current, &mut rng);
        assert_ne!(response.prompt, current);
        assert!(ctx.prompts.prompts().contains(&response.prompt));
    }
}

#[tokio::test]
async fn load_post_reports_missing_post_as_not_found() {
    let ctx = setup(
        Arc::new(RecordingGenerator::default()),
        Arc::new(RecordingHost::default()),
    )
    .await;
    let created = create_post(&ctx, &post_request("Ann", "a cat", "data:image/jpeg;base64,AAAA"))
        .await
        .expect("create");

    let loaded = load_post(&ctx, created.id).await.expect("load");
    assert_eq!(loaded, created);

    let err = load_post(&ctx, PostId(created.id.0 + 1))
        .await
        .expect_err("missing");
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.message, format!("post {} not found", created.id.0 + 1));
}

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use client_core::{CreatePostForm, GalleryClient, GallerySearch, GalleryView, PostSource};
use shared::{
    domain::{download_file_name, PostId},
    prompts::PromptCatalog,
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a prompt from the curated list that differs from `--current`.
    Surprise {
        #[arg(long, default_value = "")]
        current: String,
        /// Ask the server instead of the built-in list.
        #[arg(long)]
        remote: bool,
    },
    /// Generate an image and save it without sharing.
    Generate {
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long, default_value = "generated.jpg")]
        out: PathBuf,
    },
    /// Generate an image and share it with the community.
    Share {
        #[arg(long)]
        name: String,
        /// Omit to get a surprise prompt.
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Browse the gallery; each stdin line replaces the search query.
    Gallery,
    /// Save a post's image as `download-<id>.jpg`.
    Download {
        id: i64,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();
    let client = GalleryClient::new(&cli.server_url)?;

    match cli.command {
        Command::Surprise { current, remote } => {
            let prompt = if remote {
                client.random_prompt(&current).await?
            } else {
                PromptCatalog::default().surprise_me(&current, &mut rand::thread_rng())
            };
            println!("{prompt}");
        }
        Command::Generate { prompt, out } => {
            let mut form = form_with_prompt(String::new(), prompt);
            let photo = client.generate_image(&form.generation_request()?).await?;
            let bytes = STANDARD
                .decode(photo.b64.as_bytes())
                .context("generator returned invalid base64")?;
            tokio::fs::write(&out, bytes)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            form.set_photo_from_generated(&photo);
            println!("prompt: {}", form.prompt);
            println!("saved {}", out.display());
        }
        Command::Share { name, prompt } => {
            let mut form = form_with_prompt(name, prompt);
            let photo = client.generate_image(&form.generation_request()?).await?;
            form.set_photo_from_generated(&photo);
            let post = client.share_post(&form.share_request()?).await?;
            info!(post_id = post.id.0, "shared post");
            println!("shared #{} {}: {}", post.id.0, post.name, post.prompt);
            println!("{}", post.photo_url);
        }
        Command::Gallery => {
            let input = BufReader::new(tokio::io::stdin());
            browse(Arc::new(client), input, tokio::io::stdout()).await?;
        }
        Command::Download { id, dir } => {
            let post = client.fetch_post(PostId(id)).await?;
            let bytes = client.download_photo(&post).await?;
            let path = dir.join(download_file_name(post.id));
            tokio::fs::write(&path, bytes)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("saved {}", path.display());
        }
    }

    Ok(())
}

fn form_with_prompt(name: String, prompt: Option<String>) -> CreatePostForm {
    let mut form = CreatePostForm {
        name,
        ..CreatePostForm::default()
    };
    match prompt {
        Some(prompt) => form.prompt = prompt,
        None => {
            form.surprise_me(&PromptCatalog::default(), &mut rand::thread_rng());
        }
    }
    form
}

/// Feeds each input line to the search as the new query and writes every
/// published view to `out`. At end of input the pending load and filter are
/// allowed to finish before returning.
async fn browse<R, W>(source: Arc<dyn PostSource>, input: R, mut out: W) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut search = GallerySearch::new();
    let mut views = search.subscribe_views();
    let printer = tokio::spawn(async move {
        loop {
            match views.recv().await {
                Ok(view) => {
                    let line = format!("{}\n", render_view(&view));
                    out.write_all(line.as_bytes()).await?;
                    out.flush().await?;
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        Ok::<W, std::io::Error>(out)
    });

    search.activate(source);
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        search.on_text_changed(line.trim()).await;
    }

    search.wait_idle().await;
    drop(search);
    let out = printer.await.context("gallery printer task failed")??;
    Ok(out)
}

fn render_view(view: &GalleryView) -> String {
    match view {
        GalleryView::Loading => "loading posts...".to_string(),
        GalleryView::LoadFailed { message } => format!("could not load posts: {message}"),
        GalleryView::Empty { heading, title } => match heading {
            Some(heading) => format!("{heading}\n  {title}"),
            None => title.to_string(),
        },
        GalleryView::Posts { heading, posts } => {
            let mut out = heading.clone().unwrap_or_else(|| "The Community Showcase".into());
            for post in posts {
                out.push_str(&format!(
                    "\n  #{} {}: {}\n     {}",
                    post.id.0, post.name, post.prompt, post.photo_url
                ));
            }
            out
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;

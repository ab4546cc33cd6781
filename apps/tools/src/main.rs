use anyhow::Result;
use clap::{Parser, Subcommand};
use shared::{domain::PostId, prompts::SURPRISE_ME_PROMPTS};
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/gallery.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    ListPosts {
        /// Print the posts as the JSON the API returns.
        #[arg(long)]
        json: bool,
    },
    ShowPost {
        id: i64,
    },
    CreatePost {
        name: String,
        prompt: String,
        photo_url: String,
    },
    /// Insert `count` posts built from the curated prompts.
    Seed {
        #[arg(long, default_value_t = 5)]
        count: usize,
        #[arg(long, default_value = "https://res.cloudinary.com/demo/image/upload/sample.jpg")]
        photo_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::ListPosts { json } => {
            let posts = storage.list_posts().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&posts)?);
            } else {
                for post in &posts {
                    println!(
                        "{}\t{}\t{}\t{}",
                        post.id.0, post.name, post.prompt, post.photo_url
                    );
                }
                println!("{} post(s)", posts.len());
            }
        }
        Command::ShowPost { id } => match storage.load_post(PostId(id)).await? {
            Some(post) => println!("{}", serde_json::to_string_pretty(&post)?),
            None => println!("post_id={id} not found"),
        },
        Command::CreatePost {
            name,
            prompt,
            photo_url,
        } => {
            let post = storage.create_post(&name, &prompt, &photo_url).await?;
            println!("created post_id={}", post.id.0);
        }
        Command::Seed { count, photo_url } => {
            for (index, prompt) in SURPRISE_ME_PROMPTS.iter().cycle().take(count).enumerate() {
                let name = format!("seed-{}", index + 1);
                let post = storage.create_post(&name, prompt, &photo_url).await?;
                println!("created post_id={}", post.id.0);
            }
            println!("{} post(s) total", storage.post_count().await?);
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{Post, PostId};

const MEMORY_DATABASE_URL: &str = "sqlite::memory:";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        // Every connection to an in-memory database opens a fresh, empty one.
        let max_connections = if database_url.starts_with(MEMORY_DATABASE_URL) {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_post(&self, name: &str, prompt: &str, photo_url: &str) -> Result<Post> {
        let created_at = Utc::now();
        let rec = sqlx::query(
            "INSERT INTO posts (name, prompt, photo_url, created_at) VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(name)
        .bind(prompt)
        .bind(photo_url)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert post")?;

        Ok(Post {
            id: PostId(rec.get::<i64, _>(0)),
            name: name.to_string(),
            prompt: prompt.to_string(),
            photo_url: photo_url.to_string(),
            created_at,
        })
    }

    pub async fn load_post(&self, post_id: PostId) -> Result<Option<Post>> {
        let row = sqlx::query(
            "SELECT id, name, prompt, photo_url, created_at FROM posts WHERE id = ?",
        )
        .bind(post_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(post_from_row).transpose()
    }

    /// All posts in insertion order.
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            "SELECT id, name, prompt, photo_url, created_at FROM posts ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list posts")?;
        rows.iter().map(post_from_row).collect()
    }

    pub async fn post_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn post_from_row(row: &SqliteRow) -> Result<Post> {
    Ok(Post {
        id: PostId(row.try_get("id")?),
        name: row.try_get("name")?,
        prompt: row.try_get("prompt")?,
        photo_url: row.try_get("photo_url")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with(MEMORY_DATABASE_URL) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(PostId);

/// A published (name, prompt, image) record in the community gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: PostId,
    pub name: String,
    pub prompt: String,
    /// Hosted image URL returned by the image host.
    #[serde(rename = "photo")]
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Case-insensitive substring match against the author name or the prompt.
    ///
    /// `folded_query` must already be lowercased; callers fold once per filter run.
    pub fn matches_folded(&self, folded_query: &str) -> bool {
        self.name.to_lowercase().contains(folded_query)
            || self.prompt.to_lowercase().contains(folded_query)
    }
}

/// File name offered when a gallery image is downloaded.
pub fn download_file_name(post_id: PostId) -> String {
    format!("download-{}.jpg", post_id.0)
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;

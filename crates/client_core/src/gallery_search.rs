//! Debounced, in-memory search over the community gallery.
//!
//! The full post list arrives once per view activation. Every keystroke goes
//! through [`GallerySearch::on_text_changed`], which cancels the outstanding
//! debounce timer and arms a new one; only when the query has been quiet for
//! the debounce delay is the full list filtered. The timer reads the full list
//! when it fires, so a list that lands while a timer is pending is the one
//! that gets filtered.

use std::{sync::Arc, time::Duration};

use shared::domain::Post;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::PostSource;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);
pub const NO_POSTS_TITLE: &str = "No Posts Yet";
pub const NO_RESULTS_TITLE: &str = "No Search Results Found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    /// No query; the full list is shown.
    #[default]
    Idle,
    /// Query changed and a debounce timer is armed.
    PendingFilter,
    /// The timer fired and filtered results are available.
    Filtered,
}

/// What the gallery renderer should show.
#[derive(Debug, Clone, PartialEq)]
pub enum GalleryView {
    Loading,
    Posts {
        heading: Option<String>,
        posts: Vec<Post>,
    },
    Empty {
        heading: Option<String>,
        title: &'static str,
    },
    LoadFailed {
        message: String,
    },
}

/// Posts whose name or prompt contains `query`, ignoring case, in list order.
pub fn filter_posts(posts: &[Post], query: &str) -> Vec<Post> {
    let folded = query.to_lowercase();
    posts
        .iter()
        .filter(|post| post.matches_folded(&folded))
        .cloned()
        .collect()
}

#[derive(Debug, Default)]
struct SearchState {
    query_text: String,
    full_list: Option<Vec<Post>>,
    last_results: Option<Vec<Post>>,
    filtered_query: Option<String>,
    phase: SearchPhase,
    generation: u64,
    filter_runs: u64,
}

impl SearchState {
    fn run_filter(&mut self) {
        let results = match &self.full_list {
            Some(posts) => filter_posts(posts, &self.query_text),
            None => Vec::new(),
        };
        debug!(
            query = %self.query_text,
            matches = results.len(),
            "gallery filter ran"
        );
        self.last_results = Some(results);
        self.filtered_query = Some(self.query_text.clone());
        self.phase = SearchPhase::Filtered;
        self.filter_runs += 1;
    }

    fn display_list(&self) -> Vec<Post> {
        let shown = if self.query_text.is_empty() {
            &self.full_list
        } else {
            &self.last_results
        };
        shown.clone().unwrap_or_default()
    }

    fn view(&self) -> GalleryView {
        let heading = (!self.query_text.is_empty())
            .then(|| format!("Showing results for {}", self.query_text));
        let posts = self.display_list();
        if !posts.is_empty() {
            return GalleryView::Posts { heading, posts };
        }
        let title = if self.query_text.is_empty() {
            NO_POSTS_TITLE
        } else {
            NO_RESULTS_TITLE
        };
        GalleryView::Empty { heading, title }
    }
}

pub struct GallerySearch {
    delay: Duration,
    state: Arc<Mutex<SearchState>>,
    pending_timer: Option<JoinHandle<()>>,
    load_task: Option<JoinHandle<()>>,
    views: broadcast::Sender<GalleryView>,
}

impl Default for GallerySearch {
    fn default() -> Self {
        Self::new()
    }
}

impl GallerySearch {
    pub fn new() -> Self {
        Self::with_delay(SEARCH_DEBOUNCE)
    }

    pub fn with_delay(delay: Duration) -> Self {
        let (views, _) = broadcast::channel(64);
        Self {
            delay,
            state: Arc::new(Mutex::new(SearchState::default())),
            pending_timer: None,
            load_task: None,
            views,
        }
    }

    pub fn subscribe_views(&self) -> broadcast::Receiver<GalleryView> {
        self.views.subscribe()
    }

    /// Search box input. An empty query returns to the full list immediately;
    /// anything else (re)arms the debounce timer.
    pub async fn on_text_changed(&mut self, text: &str) {
        self.cancel_pending_timer();

        let mut state = self.state.lock().await;
        state.generation += 1;
        state.query_text = text.to_string();

        if text.is_empty() {
            state.last_results = None;
            state.filtered_query = None;
            state.phase = SearchPhase::Idle;
            let _ = self.views.send(state.view());
            return;
        }

        state.phase = SearchPhase::PendingFilter;
        let generation = state.generation;
        drop(state);
        self.arm_timer(generation);
    }

    /// Replaces the full list. Filtered results stay as they are until the
    /// next filter run.
    pub async fn on_full_list_loaded(&self, posts: Vec<Post>) {
        store_full_list(&self.state, &self.views, posts).await;
    }

    /// Fetches the full list once and feeds it to the pipeline. Failures are
    /// returned to the caller and leave the current list untouched.
    pub async fn load_from(&self, source: &dyn PostSource) -> anyhow::Result<()> {
        let posts = source.fetch_all_posts().await?;
        self.on_full_list_loaded(posts).await;
        Ok(())
    }

    /// Starts the one fetch of a view activation in the background. A failed
    /// fetch is published as [`GalleryView::LoadFailed`].
    pub fn activate(&mut self, source: Arc<dyn PostSource>) {
        if let Some(task) = self.load_task.take() {
            task.abort();
        }
        let _ = self.views.send(GalleryView::Loading);

        let state = Arc::clone(&self.state);
        let views = self.views.clone();
        self.load_task = Some(tokio::spawn(async move {
            match source.fetch_all_posts().await {
                Ok(posts) => store_full_list(&state, &views, posts).await,
                Err(err) => {
                    warn!(error = %err, "failed to fetch gallery posts");
                    let _ = views.send(GalleryView::LoadFailed {
                        message: err.to_string(),
                    });
                }
            }
        }));
    }

    /// Filtered results while a query is active, otherwise the full list.
    /// Empty until a full list has been loaded.
    pub async fn current_display_list(&self) -> Vec<Post> {
        self.state.lock().await.display_list()
    }

    pub async fn current_view(&self) -> GalleryView {
        self.state.lock().await.view()
    }

    pub async fn phase(&self) -> SearchPhase {
        self.state.lock().await.phase
    }

    pub async fn query_text(&self) -> String {
        self.state.lock().await.query_text.clone()
    }

    /// Query the current results were computed for.
    pub async fn filtered_query(&self) -> Option<String> {
        self.state.lock().await.filtered_query.clone()
    }

    pub async fn filter_runs(&self) -> u64 {
        self.state.lock().await.filter_runs
    }

    /// Waits for the activation fetch and any armed debounce timer to finish,
    /// so the last query typed before input ends still gets filtered.
    pub async fn wait_idle(&mut self) {
        if let Some(task) = self.load_task.take() {
            let _ = task.await;
        }
        if let Some(timer) = self.pending_timer.take() {
            let _ = timer.await;
        }
    }

    pub fn has_pending_timer(&self) -> bool {
        self.pending_timer
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    fn cancel_pending_timer(&mut self) {
        if let Some(timer) = self.pending_timer.take() {
            timer.abort();
        }
    }

    fn arm_timer(&mut self, generation: u64) {
        let state = Arc::clone(&self.state);
        let views = self.views.clone();
        let delay = self.delay;
        self.pending_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = state.lock().await;
            // A newer keystroke re-armed after this timer got past its sleep.
            if state.generation != generation {
                return;
            }
            state.run_filter();
            let _ = views.send(state.view());
        }));
    }
}

impl Drop for GallerySearch {
    fn drop(&mut self) {
        self.cancel_pending_timer();
        if let Some(task) = self.load_task.take() {
            task.abort();
        }
    }
}

async fn store_full_list(
    state: &Mutex<SearchState>,
    views: &broadcast::Sender<GalleryView>,
    posts: Vec<Post>,
) {
    let mut state = state.lock().await;
    debug!(posts = posts.len(), "gallery full list loaded");
    state.full_list = Some(posts);
    let _ = views.send(state.view());
}

#[cfg(test)]
#[path = "tests/gallery_search_tests.rs"]
mod tests;

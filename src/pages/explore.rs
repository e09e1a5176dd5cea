use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ContentQuery, RemoteClient};
use crate::debounce::Debouncer;
use crate::error::ApiResult;
use crate::filter::{available_tags, derive_view, FilterParams};
use crate::mutation::ContentActions;
use crate::pages::{read, resync, secondary, slot, write, Slot};
use crate::store::{lock, shared, Membership, SharedStore};
use crate::types::{Category, CategoryCount, ContentItem, Difficulty, SortKey};

/// Catalogue browsing. Search, category, difficulty and sort go to the backend;
/// the tag selection narrows the loaded items locally.
#[derive(Clone)]
pub struct ExplorePage {
    client: RemoteClient,
    store: SharedStore<ContentItem>,
    actions: ContentActions,
    categories: Slot<Vec<CategoryCount>>,
    search: Debouncer,
    per_page: u32,
}

impl ExplorePage {
    pub fn new(client: RemoteClient, per_page: u32, debounce: Duration) -> Self {
        let store = shared();
        let actions = ContentActions::new(client.clone(), store.clone());
        Self { client, store, actions, categories: slot(Vec::new()), search: Debouncer::new(debounce), per_page }
    }

    pub fn store(&self) -> &SharedStore<ContentItem> { &self.store }
    pub fn categories(&self) -> Vec<CategoryCount> { read(&self.categories) }
    pub fn filters(&self) -> FilterParams { lock(&self.store).filters.clone() }

    fn query(&self, page: u32) -> ContentQuery {
        let f = self.filters();
        ContentQuery {
            page: Some(page),
            per_page: Some(self.per_page),
            category: f.category,
            search: Some(f.search).filter(|s| !s.trim().is_empty()),
            sort_by: Some(f.sort),
            difficulty: f.difficulty,
        }
    }

    /// First visit: contents, categories and membership lists in parallel.
    pub async fn open(&self) -> ApiResult<()> {
        let authed = self.client.is_authenticated().await;
        let (contents, categories, liked, saved) = futures::join!(
            self.reload(),
            self.client.categories(),
            async { if authed { Some(self.client.liked().await) } else { None } },
            async { if authed { Some(self.client.saved().await) } else { None } },
        );
        if let Some(c) = secondary("categories", categories) { write(&self.categories, c); }
        resync(&self.store, Membership::Liked, liked.and_then(|r| secondary("liked", r)).as_deref());
        resync(&self.store, Membership::Saved, saved.and_then(|r| secondary("saved", r)).as_ref().map(|p| p.items.as_slice()));
        contents
    }

    /// Refetch page 1 with the current backend filters, replacing the list. When a
    /// newer reload starts before this one answers, its result is dropped.
    pub async fn reload(&self) -> ApiResult<()> {
        let generation = lock(&self.store).begin_load();
        let query = self.query(1);
        self.actions.sequencer().invalidate_all();
        let result = self.client.list_content(&query).await;
        let mut s = lock(&self.store);
        if s.generation() != generation {
            debug!(generation, search = ?query.search, "explore load superseded");
            return Ok(());
        }
        s.set_loading(false);
        match result {
            Ok(page) => {
                info!(count = page.items.len(), search = ?query.search, "explore loaded");
                s.replace(page.items, page.cursor);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "explore load failed");
                s.set_error(Some(e.clone()));
                Err(e)
            }
        }
    }

    pub async fn load_more(&self) -> ApiResult<usize> {
        let (next, generation) = {
            let mut s = lock(&self.store);
            match s.next_page() {
                Some(p) if !s.is_loading() => { s.set_loading(true); (p, s.generation()) }
                _ => return Ok(0),
            }
        };
        let result = self.client.list_content(&self.query(next)).await;
        let mut s = lock(&self.store);
        if s.generation() != generation {
            debug!(page = next, "stale page dropped");
            return Ok(0);
        }
        s.set_loading(false);
        match result {
            Ok(page) => Ok(s.append(page.items, page.cursor)),
            Err(e) => {
                s.set_error(Some(e.clone()));
                Err(e)
            }
        }
    }

    /// Record the search term and schedule a debounced reload. Only the last
    /// term in a burst reaches the backend.
    pub fn set_search(&self, term: &str) -> JoinHandle<bool> {
        lock(&self.store).filters.search = term.to_string();
        let page = self.clone();
        self.search.call(term.to_string(), move |term| async move {
            debug!(%term, "search settled");
            // the error is already recorded on the store
            let _ = page.reload().await;
        })
    }

    pub async fn set_category(&self, category: Option<Category>) -> ApiResult<()> {
        lock(&self.store).filters.category = category;
        self.reload().await
    }

    pub async fn set_difficulty(&self, difficulty: Option<Difficulty>) -> ApiResult<()> {
        lock(&self.store).filters.difficulty = difficulty;
        self.reload().await
    }

    pub async fn set_sort(&self, sort: SortKey) -> ApiResult<()> {
        lock(&self.store).filters.sort = sort;
        self.reload().await
    }

    /// Local only; no request.
    pub fn toggle_tag(&self, tag: &str) { lock(&self.store).filters.toggle_tag(tag); }

    pub async fn reset_filters(&self) -> ApiResult<()> {
        self.search.cancel();
        lock(&self.store).filters = FilterParams::default();
        self.reload().await
    }

    /// Loaded items narrowed by the tag selection. Search is left to the backend,
    /// which also matches on excerpts.
    pub fn visible(&self) -> Vec<ContentItem> {
        let s = lock(&self.store);
        let params = FilterParams { search: String::new(), ..s.filters.clone() };
        derive_view(s.items(), &params)
    }

    pub fn available_tags(&self) -> Vec<String> { available_tags(lock(&self.store).items()) }

    pub fn is_liked(&self, id: u64) -> bool { lock(&self.store).is_liked(id) }
    pub fn is_saved(&self, id: u64) -> bool { lock(&self.store).is_saved(id) }

    pub async fn toggle_like(&self, id: u64) -> ApiResult<bool> { self.actions.toggle_like(id).await }
    pub async fn toggle_save(&self, id: u64) -> ApiResult<bool> { self.actions.toggle_favorite(id).await }
}

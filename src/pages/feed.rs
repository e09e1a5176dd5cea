use tracing::{debug, info, warn};

use crate::api::{ContentQuery, Page, RemoteClient};
use crate::error::ApiResult;
use crate::filter::derive_view;
use crate::mutation::ContentActions;
use crate::pages::{read, secondary, slot, write, Slot};
use crate::store::{lock, shared, Membership, SharedStore};
use crate::types::{Category, CategoryCount, ContentItem, SortKey};

/// Regular users get the personalized feed; admins browse the sorted catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    Personalized,
    Catalogue,
}

#[derive(Clone)]
pub struct FeedPage {
    client: RemoteClient,
    store: SharedStore<ContentItem>,
    actions: ContentActions,
    categories: Slot<Vec<CategoryCount>>,
    mode: FeedMode,
    per_page: u32,
    for_you_limit: u32,
}

impl FeedPage {
    pub fn new(client: RemoteClient, mode: FeedMode, per_page: u32, for_you_limit: u32) -> Self {
        let store = shared();
        let actions = ContentActions::new(client.clone(), store.clone());
        Self { client, store, actions, categories: slot(Vec::new()), mode, per_page, for_you_limit }
    }

    pub fn store(&self) -> &SharedStore<ContentItem> { &self.store }
    pub fn categories(&self) -> Vec<CategoryCount> { read(&self.categories) }

    fn query(&self, page: u32) -> ContentQuery {
        let f = lock(&self.store).filters.clone();
        ContentQuery { page: Some(page), per_page: Some(self.per_page), category: f.category, sort_by: Some(f.sort), ..Default::default() }
    }

    async fn fetch_primary(&self) -> ApiResult<Page<ContentItem>> {
        match self.mode {
            FeedMode::Catalogue => self.client.list_content(&self.query(1)).await,
            FeedMode::Personalized => {
                let items = self.client.for_you(Some(self.for_you_limit)).await?;
                Ok(Page { items, cursor: None })
            }
        }
    }

    /// Initial load and reload: content, categories, liked and saved lists in parallel.
    /// Only a failed content branch fails the page. A load overtaken by a newer one
    /// leaves the store to it and returns `Ok`.
    pub async fn load(&self) -> ApiResult<()> {
        let generation = lock(&self.store).begin_load();
        self.actions.sequencer().invalidate_all();
        let authed = self.client.is_authenticated().await;

        let (primary, categories, liked, saved) = futures::join!(
            self.fetch_primary(),
            self.client.categories(),
            async { if authed { Some(self.client.liked().await) } else { None } },
            async { if authed { Some(self.client.saved().await) } else { None } },
        );

        if let Some(c) = secondary("categories", categories) { write(&self.categories, c); }
        let liked = liked.and_then(|r| secondary("liked", r));
        let saved = saved.and_then(|r| secondary("saved", r));

        let mut s = lock(&self.store);
        if s.generation() != generation {
            debug!(generation, "feed load superseded");
            return Ok(());
        }
        if let Some(items) = &liked { s.sync_membership(Membership::Liked, items.iter().map(|c| c.id)); }
        if let Some(page) = &saved { s.sync_membership(Membership::Saved, page.items.iter().map(|c| c.id)); }
        s.set_loading(false);
        match primary {
            Ok(page) => {
                info!(count = page.items.len(), mode = ?self.mode, "feed loaded");
                s.replace(page.items, page.cursor);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "feed load failed");
                s.set_error(Some(e.clone()));
                Err(e)
            }
        }
    }

    pub async fn retry(&self) -> ApiResult<()> { self.load().await }

    /// Fetch the next page and append it. Returns the number of new items; a page
    /// that arrives after a reload started is discarded.
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

    pub async fn set_category(&self, category: Option<Category>) -> ApiResult<()> {
        lock(&self.store).filters.category = category;
        self.load().await
    }

    pub async fn set_sort(&self, sort: SortKey) -> ApiResult<()> {
        lock(&self.store).filters.sort = sort;
        self.load().await
    }

    /// Narrow the loaded feed locally; no request is made.
    pub fn set_local_search(&self, term: &str) { lock(&self.store).filters.search = term.to_string(); }

    pub fn visible(&self) -> Vec<ContentItem> {
        let s = lock(&self.store);
        let mut params = s.filters.clone();
        // category is already applied by the backend for the catalogue, and not
        // applicable to personalized results
        params.category = None;
        derive_view(s.items(), &params)
    }

    pub fn is_liked(&self, id: u64) -> bool { lock(&self.store).is_liked(id) }
    pub fn is_saved(&self, id: u64) -> bool { lock(&self.store).is_saved(id) }

    pub async fn toggle_like(&self, id: u64) -> ApiResult<bool> { self.actions.toggle_like(id).await }
    pub async fn toggle_save(&self, id: u64) -> ApiResult<bool> { self.actions.toggle_favorite(id).await }
}

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::api::RemoteClient;
use crate::error::ApiResult;
use crate::mutation::ContentActions;
use crate::pages::{read, resync, secondary, slot, write, Slot};
use crate::store::{lock, shared, Membership, SharedStore};
use crate::types::{ContentItem, InteractionRecord, PaginationCursor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryFilter {
    #[default]
    All,
    Views,
    Likes,
    Favorites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryStats {
    pub views: usize,
    pub likes: usize,
    pub favorites: usize,
}

/// Reading history next to the liked list. The liked items live in the store so
/// that unliking from this page goes through the optimistic path.
#[derive(Clone)]
pub struct HistoryPage {
    client: RemoteClient,
    liked: SharedStore<ContentItem>,
    actions: ContentActions,
    records: Slot<Vec<InteractionRecord>>,
    cursor: Slot<Option<PaginationCursor>>,
    per_page: u32,
}

impl HistoryPage {
    pub fn new(client: RemoteClient, per_page: u32) -> Self {
        let liked = shared();
        let actions = ContentActions::new(client.clone(), liked.clone());
        Self { client, liked, actions, records: slot(Vec::new()), cursor: slot(None), per_page }
    }

    pub fn has_more(&self) -> bool { read(&self.cursor).is_some_and(|c| c.has_next) }

    /// History is the required branch; the liked and saved lists are best effort.
    pub async fn load(&self) -> ApiResult<()> {
        self.client.require_auth().await?;
        let generation = lock(&self.liked).begin_load();
        self.actions.sequencer().invalidate_all();
        let (history, liked, saved) = futures::join!(
            self.client.history(Some(1), Some(self.per_page)),
            self.client.liked(),
            self.client.saved(),
        );
        if lock(&self.liked).generation() != generation {
            debug!(generation, "history load superseded");
            return Ok(());
        }

        resync(&self.liked, Membership::Saved, secondary("saved", saved).as_ref().map(|p| p.items.as_slice()));

        if let Some(items) = secondary("liked", liked) {
            resync(&self.liked, Membership::Liked, Some(items.as_slice()));
            lock(&self.liked).replace(items, None);
        }
        let mut s = lock(&self.liked);
        s.set_loading(false);
        match history {
            Ok(h) => {
                info!(records = h.records.len(), "history loaded");
                write(&self.records, h.records);
                write(&self.cursor, h.cursor);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "history load failed");
                s.set_error(Some(e.clone()));
                Err(e)
            }
        }
    }

    /// Fetch the next page of history records. Returns how many new records were added.
    pub async fn load_more(&self) -> ApiResult<usize> {
        let Some(next) = read(&self.cursor).filter(|c| c.has_next).map(|c| c.page + 1) else {
            return Ok(0);
        };
        let generation = {
            let mut s = lock(&self.liked);
            if s.is_loading() { return Ok(0); }
            s.set_loading(true);
            s.generation()
        };
        let result = self.client.history(Some(next), Some(self.per_page)).await;
        let mut s = lock(&self.liked);
        if s.generation() != generation {
            return Ok(0);
        }
        s.set_loading(false);
        match result {
            Ok(h) => {
                let mut records = read(&self.records);
                let mut seen: HashSet<u64> = records.iter().map(|r| r.id).collect();
                let before = records.len();
                records.extend(h.records.into_iter().filter(|r| seen.insert(r.id)));
                let added = records.len() - before;
                write(&self.records, records);
                if h.cursor.is_some() { write(&self.cursor, h.cursor); }
                Ok(added)
            }
            Err(e) => {
                s.set_error(Some(e.clone()));
                Err(e)
            }
        }
    }

    /// Viewed items, most recent first as returned, each id once.
    pub fn viewed(&self) -> Vec<ContentItem> {
        let mut seen = HashSet::new();
        read(&self.records)
            .into_iter()
            .filter_map(|r| r.content.map(|c| *c))
            .filter(|c| seen.insert(c.id))
            .collect()
    }

    /// Liked items that are still liked.
    pub fn liked(&self) -> Vec<ContentItem> {
        let s = lock(&self.liked);
        s.items().iter().filter(|c| s.is_liked(c.id)).cloned().collect()
    }

    /// Viewed items currently marked as saved.
    pub fn favorites(&self) -> Vec<ContentItem> {
        let viewed = self.viewed();
        let s = lock(&self.liked);
        viewed.into_iter().filter(|c| s.is_saved(c.id)).collect()
    }

    pub fn view(&self, filter: HistoryFilter) -> Vec<ContentItem> {
        match filter {
            HistoryFilter::Views => self.viewed(),
            HistoryFilter::Likes => self.liked(),
            HistoryFilter::Favorites => self.favorites(),
            HistoryFilter::All => {
                let mut seen = HashSet::new();
                self.viewed().into_iter().chain(self.liked()).filter(|c| seen.insert(c.id)).collect()
            }
        }
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats { views: self.viewed().len(), likes: self.liked().len(), favorites: self.favorites().len() }
    }

    pub fn is_liked(&self, id: u64) -> bool { lock(&self.liked).is_liked(id) }

    pub async fn toggle_like(&self, id: u64) -> ApiResult<bool> { self.actions.toggle_like(id).await }
    pub async fn toggle_save(&self, id: u64) -> ApiResult<bool> { self.actions.toggle_favorite(id).await }
}

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{AdminContentQuery, RemoteClient};
use crate::debounce::Debouncer;
use crate::error::{ApiResult, ClientError};
use crate::mutation::{Confirm, ContentActions, UserActions};
use crate::pages::{read, secondary, slot, write, Slot};
use crate::store::{lock, shared, SharedStore};
use crate::types::{AdminStats, ContentItem, ContentStatus, UserProfile};

/// Filters of the content table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFilter {
    pub status: Option<ContentStatus>,
    pub search: String,
}

/// Dashboard: statistics, the user table and the content table.
#[derive(Clone)]
pub struct AdminPage {
    client: RemoteClient,
    stats: Slot<Option<AdminStats>>,
    users: SharedStore<UserProfile>,
    contents: SharedStore<ContentItem>,
    user_actions: UserActions,
    content_actions: ContentActions,
    user_search: Slot<String>,
    content_filter: Slot<ContentFilter>,
    user_debounce: Debouncer,
    content_debounce: Debouncer,
    per_page: u32,
}

impl AdminPage {
    pub fn new(client: RemoteClient, per_page: u32, debounce: Duration) -> Self {
        let users = shared();
        let contents = shared();
        let user_actions = UserActions::new(client.clone(), users.clone());
        let content_actions = ContentActions::new(client.clone(), contents.clone());
        Self {
            client,
            stats: slot(None),
            users,
            contents,
            user_actions,
            content_actions,
            user_search: slot(String::new()),
            content_filter: slot(ContentFilter::default()),
            user_debounce: Debouncer::new(debounce),
            content_debounce: Debouncer::new(debounce),
            per_page,
        }
    }

    pub fn users(&self) -> &SharedStore<UserProfile> { &self.users }
    pub fn contents(&self) -> &SharedStore<ContentItem> { &self.contents }
    pub fn stats(&self) -> Option<AdminStats> { read(&self.stats) }
    pub fn user_search(&self) -> String { read(&self.user_search) }
    pub fn content_filter(&self) -> ContentFilter { read(&self.content_filter) }

    fn users_term(&self) -> Option<String> {
        Some(read(&self.user_search)).map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
    }

    fn content_query(&self) -> AdminContentQuery {
        let f = read(&self.content_filter);
        AdminContentQuery {
            page: Some(1),
            per_page: Some(self.per_page),
            status: f.status,
            search: Some(f.search.trim().to_string()).filter(|t| !t.is_empty()),
            ..Default::default()
        }
    }

    /// Checks the signed-in user is an admin, then loads all three panels in
    /// parallel. The content table is the required branch.
    pub async fn open(&self) -> ApiResult<()> {
        let me = self.client.profile().await?;
        if !me.is_admin {
            return Err(ClientError::validation("admin rights required"));
        }
        self.user_actions.sequencer().invalidate_all();
        self.content_actions.sequencer().invalidate_all();

        let users_generation = lock(&self.users).begin_load();
        let contents_generation = lock(&self.contents).begin_load();
        let term = self.users_term();
        let query = self.content_query();
        let (stats, users, contents) = futures::join!(
            self.client.admin_stats(),
            self.client.admin_users(Some(1), Some(self.per_page), term.as_deref()),
            self.client.admin_contents(&query),
        );
        if let Some(s) = secondary("stats", stats) { write(&self.stats, Some(s)); }
        {
            let mut s = lock(&self.users);
            if s.generation() == users_generation {
                s.set_loading(false);
                if let Some(page) = secondary("users", users) { s.replace(page.items, page.cursor); }
            }
        }

        let mut s = lock(&self.contents);
        if s.generation() != contents_generation {
            debug!("admin contents superseded");
            return Ok(());
        }
        s.set_loading(false);
        match contents {
            Ok(mut page) => {
                info!(contents = page.items.len(), "admin dashboard loaded");
                stamp_status(&mut page.items, query.status);
                s.replace(page.items, page.cursor);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "admin contents load failed");
                s.set_error(Some(e.clone()));
                Err(e)
            }
        }
    }

    /// Record the user search term and schedule a debounced reload of the user table.
    pub fn search_users(&self, term: &str) -> JoinHandle<bool> {
        self.set_user_search(term);
        let page = self.clone();
        self.user_debounce.call(term.to_string(), move |term| async move {
            debug!(%term, "user search settled");
            // the error is already recorded on the store
            let _ = page.reload_users().await;
        })
    }

    /// Record content filters and schedule a debounced reload of the content table.
    pub fn filter_contents(&self, status: Option<ContentStatus>, search: &str) -> JoinHandle<bool> {
        self.set_content_filter(status, search);
        let page = self.clone();
        self.content_debounce.call(search.to_string(), move |search| async move {
            debug!(%search, ?status, "content filter settled");
            let _ = page.reload_contents().await;
        })
    }

    pub fn set_user_search(&self, term: &str) { write(&self.user_search, term.to_string()); }

    pub fn set_content_filter(&self, status: Option<ContentStatus>, search: &str) {
        write(&self.content_filter, ContentFilter { status, search: search.to_string() });
    }

    /// Refetch the user table with the current search term. Returns the row count.
    pub async fn reload_users(&self) -> ApiResult<usize> {
        let generation = lock(&self.users).begin_load();
        self.user_actions.sequencer().invalidate_all();
        let term = self.users_term();
        let result = self.client.admin_users(Some(1), Some(self.per_page), term.as_deref()).await;
        let mut s = lock(&self.users);
        if s.generation() != generation {
            return Ok(0);
        }
        s.set_loading(false);
        match result {
            Ok(page) => {
                let n = page.items.len();
                s.replace(page.items, page.cursor);
                Ok(n)
            }
            Err(e) => {
                warn!(error = %e, "admin users load failed");
                s.set_error(Some(e.clone()));
                Err(e)
            }
        }
    }

    /// Refetch the content table with the current filters. Returns the row count.
    pub async fn reload_contents(&self) -> ApiResult<usize> {
        let generation = lock(&self.contents).begin_load();
        self.content_actions.sequencer().invalidate_all();
        let query = self.content_query();
        let result = self.client.admin_contents(&query).await;
        let mut s = lock(&self.contents);
        if s.generation() != generation {
            return Ok(0);
        }
        s.set_loading(false);
        match result {
            Ok(mut page) => {
                stamp_status(&mut page.items, query.status);
                let n = page.items.len();
                s.replace(page.items, page.cursor);
                Ok(n)
            }
            Err(e) => {
                warn!(error = %e, "admin contents load failed");
                s.set_error(Some(e.clone()));
                Err(e)
            }
        }
    }

    pub async fn toggle_publish(&self, id: u64) -> ApiResult<ContentItem> { self.content_actions.toggle_publish(id).await }
    pub async fn toggle_feature(&self, id: u64) -> ApiResult<ContentItem> { self.content_actions.toggle_feature(id).await }
    pub async fn toggle_user_active(&self, id: u64) -> ApiResult<UserProfile> { self.user_actions.toggle_active(id).await }

    /// `Ok(false)` when the confirmation was declined.
    pub async fn delete_content(&self, id: u64, confirm: &dyn Confirm) -> ApiResult<bool> {
        let deleted = self.content_actions.delete(id, confirm).await?;
        if deleted {
            if let Some(mut stats) = self.stats() {
                stats.contents.total = stats.contents.total.saturating_sub(1);
                write(&self.stats, Some(stats));
            }
        }
        Ok(deleted)
    }
}

/// Rows listed under a published/draft filter carry that state even though the
/// backend leaves the flag out.
fn stamp_status(items: &mut [ContentItem], status: Option<ContentStatus>) {
    let known = match status {
        Some(ContentStatus::Published) => true,
        Some(ContentStatus::Draft) => false,
        _ => return,
    };
    for c in items {
        c.is_published.get_or_insert(known);
    }
}

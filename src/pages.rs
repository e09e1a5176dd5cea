//! Page controllers. Each owns its stores for the page's lifetime and wires the
//! remote client, optimistic actions and derived views together.

pub mod admin;
pub mod article;
pub mod explore;
pub mod feed;
pub mod history;
pub mod profile;

pub use admin::{AdminPage, ContentFilter};
pub use article::ArticlePage;
pub use explore::ExplorePage;
pub use feed::{FeedMode, FeedPage};
pub use history::{HistoryFilter, HistoryPage, HistoryStats};
pub use profile::ProfilePage;

use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::error::ApiResult;
use crate::store::{lock, Membership, SharedStore};
use crate::types::ContentItem;

/// Page-local value shared between the controller and its spawned tasks.
pub(crate) type Slot<T> = Arc<Mutex<T>>;

pub(crate) fn slot<T>(v: T) -> Slot<T> { Arc::new(Mutex::new(v)) }

pub(crate) fn read<T: Clone>(s: &Slot<T>) -> T { s.lock().unwrap_or_else(|e| e.into_inner()).clone() }

pub(crate) fn write<T>(s: &Slot<T>, v: T) { *s.lock().unwrap_or_else(|e| e.into_inner()) = v; }

/// Unwrap a secondary branch of a joined load. A failure is logged and leaves
/// the page's existing data alone.
pub(crate) fn secondary<T>(label: &str, r: ApiResult<T>) -> Option<T> {
    match r {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(branch = label, error = %e, "secondary load failed");
            None
        }
    }
}

/// Resync a membership cache from an authoritative list, if that branch loaded.
pub(crate) fn resync(store: &SharedStore<ContentItem>, which: Membership, items: Option<&[ContentItem]>) {
    if let Some(items) = items {
        lock(store).sync_membership(which, items.iter().map(|c| c.id));
    }
}

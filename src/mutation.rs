//! Optimistic mutations: apply locally, call the backend, then keep the backend's
//! answer or roll back.
//!
//! Mutations on the same (entity, action) pair run one at a time in the order they
//! were issued. Each run holds a [`Ticket`]; a ticket goes stale when the entity is
//! removed or the page reloads from the backend, and a stale ticket never writes
//! to the store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::api::RemoteClient;
use crate::error::{ApiResult, ClientError};
use crate::store::{lock, Entity, Membership, SharedStore};
use crate::types::{ContentItem, ContentPatch, InteractionKind, UserPatch, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Like,
    Favorite,
    Publish,
    Feature,
    UserActive,
    Delete,
}

pub type MutationKey = (u64, ActionKind);

#[derive(Default)]
struct Lane {
    gate: Arc<AsyncMutex<()>>,
    issued: u64,
}

/// Per-key serialization plus sequence tokens.
#[derive(Clone, Default)]
pub struct Sequencer {
    lanes: Arc<Mutex<HashMap<MutationKey, Lane>>>,
    epoch: Arc<AtomicU64>,
}

pub struct Ticket {
    key: MutationKey,
    seq: u64,
    epoch: u64,
    lanes: Arc<Mutex<HashMap<MutationKey, Lane>>>,
    _gate: OwnedMutexGuard<()>,
}

impl Ticket {
    pub fn seq(&self) -> u64 { self.seq }
}

impl Drop for Ticket {
    /// Forget the lane once nobody holds or waits on it. The map and this
    /// ticket's guard account for two references to the gate.
    fn drop(&mut self) {
        let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        if lanes.get(&self.key).is_some_and(|l| Arc::strong_count(&l.gate) <= 2) {
            lanes.remove(&self.key);
        }
    }
}

impl Sequencer {
    pub fn new() -> Self { Self::default() }

    /// Wait until no other mutation for `key` is in flight, then take the lane.
    pub async fn acquire(&self, key: MutationKey) -> Ticket {
        let gate = {
            let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
            lanes.entry(key).or_default().gate.clone()
        };
        let guard = gate.lock_owned().await;
        let seq = {
            let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
            let lane = lanes.entry(key).or_default();
            lane.issued += 1;
            lane.issued
        };
        Ticket { key, seq, epoch: self.epoch.load(Ordering::SeqCst), lanes: self.lanes.clone(), _gate: guard }
    }

    /// Whether the ticket may still write its outcome to the store.
    pub fn is_current(&self, t: &Ticket) -> bool {
        if self.epoch.load(Ordering::SeqCst) != t.epoch { return false; }
        let lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        lanes.get(&t.key).is_some_and(|l| l.issued == t.seq)
    }

    /// Make every in-flight ticket for `id` stale.
    pub fn invalidate(&self, id: u64) {
        let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        for (_, lane) in lanes.iter_mut().filter(|(k, _)| k.0 == id) { lane.issued += 1; }
    }

    /// Make every in-flight ticket stale; used when a reload brings authoritative state.
    pub fn invalidate_all(&self) { self.epoch.fetch_add(1, Ordering::SeqCst); }

    #[cfg(test)]
    fn lane_count(&self) -> usize { self.lanes.lock().unwrap_or_else(|e| e.into_inner()).len() }
}

/// Yes/no gate in front of irreversible actions.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Always answers the same; handy for non-interactive callers.
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&self, _prompt: &str) -> bool { self.0 }
}

/// Like count implied by a membership change from `was` to `now`.
pub fn settle_count(before: u64, was: bool, now: bool) -> u64 {
    match (was, now) {
        (false, true) => before + 1,
        (true, false) => before.saturating_sub(1),
        _ => before,
    }
}

/// How one boolean field is read and patched.
struct Flag<T: Entity> {
    /// `None` when the backend did not report the field.
    read: fn(&T) -> Option<bool>,
    /// Value assumed for an unreported field.
    unreported: bool,
    patch: fn(bool) -> T::Patch,
}

/// Shared protocol for boolean field toggles whose backend call returns the
/// authoritative entity. A field the reply leaves out keeps the value that was sent.
async fn toggle_field<T, F, Fut>(seq: &Sequencer, store: &SharedStore<T>, key: MutationKey, flag: Flag<T>, remote: F) -> ApiResult<T>
where
    T: Entity,
    F: FnOnce(T::Patch) -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let (id, action) = key;
    let ticket = seq.acquire(key).await;
    let previous = {
        let mut s = lock(store);
        let Some(current) = s.get(id).map(flag.read) else {
            return Err(ClientError::validation(format!("entity {id} is not loaded")));
        };
        let previous = current.unwrap_or(flag.unreported);
        s.apply_field_update(id, &(flag.patch)(!previous));
        previous
    };
    match remote((flag.patch)(!previous)).await {
        Ok(mut entity) => {
            if (flag.read)(&entity).is_none() { entity.apply(&(flag.patch)(!previous)); }
            if seq.is_current(&ticket) { lock(store).upsert_existing(entity.clone()); }
            Ok(entity)
        }
        Err(e) => {
            warn!(id, ?action, error = %e, "mutation failed, reverting");
            if seq.is_current(&ticket) {
                let mut s = lock(store);
                s.apply_field_update(id, &(flag.patch)(previous));
                s.set_error(Some(e.clone()));
            }
            Err(e)
        }
    }
}

/// Content-side actions bound to one page's store.
#[derive(Clone)]
pub struct ContentActions {
    client: RemoteClient,
    store: SharedStore<ContentItem>,
    seq: Sequencer,
}

impl ContentActions {
    pub fn new(client: RemoteClient, store: SharedStore<ContentItem>) -> Self {
        Self { client, store, seq: Sequencer::new() }
    }

    pub fn sequencer(&self) -> &Sequencer { &self.seq }

    /// Toggle like; returns the backend's liked state.
    pub async fn toggle_like(&self, id: u64) -> ApiResult<bool> {
        self.toggle_membership(id, ActionKind::Like, Membership::Liked, InteractionKind::Like).await
    }

    /// Toggle favorite; favorites are membership only and carry no counter.
    pub async fn toggle_favorite(&self, id: u64) -> ApiResult<bool> {
        self.toggle_membership(id, ActionKind::Favorite, Membership::Saved, InteractionKind::Favorite).await
    }

    async fn toggle_membership(&self, id: u64, action: ActionKind, which: Membership, kind: InteractionKind) -> ApiResult<bool> {
        self.client.require_auth().await?;
        let counted = which == Membership::Liked;
        let ticket = self.seq.acquire((id, action)).await;

        let (was, count_before) = {
            let mut s = lock(&self.store);
            let was = s.contains(which, id);
            let count_before = if counted { s.get(id).map(|c| c.like_count) } else { None };
            s.set_member(which, id, !was);
            if let Some(c) = count_before {
                s.apply_field_update(id, &ContentPatch { like_count: Some(settle_count(c, was, !was)), ..Default::default() });
            }
            (was, count_before)
        };
        debug!(id, ?action, seq = ticket.seq(), optimistic = !was, "applied optimistically");

        match self.client.toggle_interaction(id, kind).await {
            Ok(now) => {
                if self.seq.is_current(&ticket) {
                    let mut s = lock(&self.store);
                    s.set_member(which, id, now);
                    if let Some(c) = count_before {
                        s.apply_field_update(id, &ContentPatch { like_count: Some(settle_count(c, was, now)), ..Default::default() });
                    }
                }
                Ok(now)
            }
            Err(e) => {
                warn!(id, ?action, error = %e, "toggle failed, reverting");
                if self.seq.is_current(&ticket) {
                    let mut s = lock(&self.store);
                    s.set_member(which, id, was);
                    if let Some(c) = count_before {
                        s.apply_field_update(id, &ContentPatch { like_count: Some(c), ..Default::default() });
                    }
                    s.set_error(Some(e.clone()));
                }
                Err(e)
            }
        }
    }

    pub async fn toggle_publish(&self, id: u64) -> ApiResult<ContentItem> {
        self.client.require_auth().await?;
        let client = self.client.clone();
        toggle_field(
            &self.seq,
            &self.store,
            (id, ActionKind::Publish),
            Flag {
                read: |c: &ContentItem| c.is_published,
                unreported: true,
                patch: |v| ContentPatch { is_published: Some(v), ..Default::default() },
            },
            |p| async move { client.admin_update_content(id, &p).await },
        )
        .await
    }

    pub async fn toggle_feature(&self, id: u64) -> ApiResult<ContentItem> {
        self.client.require_auth().await?;
        let client = self.client.clone();
        toggle_field(
            &self.seq,
            &self.store,
            (id, ActionKind::Feature),
            Flag {
                read: |c: &ContentItem| Some(c.is_featured),
                unreported: false,
                patch: |v| ContentPatch { is_featured: Some(v), ..Default::default() },
            },
            |p| async move { client.admin_update_content(id, &p).await },
        )
        .await
    }

    /// Delete after confirmation. `Ok(false)` when the prompt was declined.
    pub async fn delete(&self, id: u64, confirm: &dyn Confirm) -> ApiResult<bool> {
        self.client.require_auth().await?;
        if !confirm.confirm(&format!("Delete content {id}? This cannot be undone.")).await {
            return Ok(false);
        }
        let _ticket = self.seq.acquire((id, ActionKind::Delete)).await;
        match self.client.admin_delete_content(id).await {
            Ok(_) => {
                self.seq.invalidate(id);
                let mut s = lock(&self.store);
                s.remove(id);
                s.set_member(Membership::Liked, id, false);
                s.set_member(Membership::Saved, id, false);
                Ok(true)
            }
            Err(e) => {
                warn!(id, error = %e, "delete failed");
                lock(&self.store).set_error(Some(e.clone()));
                Err(e)
            }
        }
    }
}

/// Admin user actions bound to a user store.
#[derive(Clone)]
pub struct UserActions {
    client: RemoteClient,
    store: SharedStore<UserProfile>,
    seq: Sequencer,
}

impl UserActions {
    pub fn new(client: RemoteClient, store: SharedStore<UserProfile>) -> Self {
        Self { client, store, seq: Sequencer::new() }
    }

    pub fn sequencer(&self) -> &Sequencer { &self.seq }

    pub async fn toggle_active(&self, user_id: u64) -> ApiResult<UserProfile> {
        self.client.require_auth().await?;
        let client = self.client.clone();
        toggle_field(
            &self.seq,
            &self.store,
            (user_id, ActionKind::UserActive),
            Flag {
                read: |u: &UserProfile| Some(u.is_active),
                unreported: true,
                patch: |v| UserPatch { is_active: Some(v), ..Default::default() },
            },
            |p| async move { client.admin_update_user(user_id, &p).await },
        )
        .await
    }
}

//! Per-page view state.
//!
//! Holds the loaded entity window, the backend's pagination cursor, the current
//! filters, and the liked/saved membership caches. The caches are an index over
//! backend interaction state, never a second source of truth.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ClientError;
use crate::filter::FilterParams;
use crate::types::{ContentItem, ContentPatch, PaginationCursor, UserPatch, UserProfile};

/// Anything a store can hold: identified by an integer and patchable field-by-field.
pub trait Entity: Clone {
    type Patch;
    fn id(&self) -> u64;
    fn apply(&mut self, patch: &Self::Patch);
}

impl Entity for ContentItem {
    type Patch = ContentPatch;

    fn id(&self) -> u64 { self.id }

    fn apply(&mut self, p: &ContentPatch) {
        if let Some(v) = &p.title { self.title = v.clone(); }
        if let Some(v) = &p.excerpt { self.excerpt = Some(v.clone()); }
        if let Some(v) = &p.body { self.body = Some(v.clone()); }
        if let Some(v) = &p.author { self.author = Some(v.clone()); }
        if let Some(v) = &p.category { self.category = v.clone(); }
        if let Some(v) = &p.tags { self.tags = v.clone(); }
        if let Some(v) = &p.image_url { self.image_url = Some(v.clone()); }
        if let Some(v) = p.duration { self.duration = Some(v); }
        if let Some(v) = &p.difficulty_level { self.difficulty_level = Some(v.clone()); }
        if let Some(v) = p.is_published { self.is_published = Some(v); }
        if let Some(v) = p.is_featured { self.is_featured = v; }
        if let Some(v) = p.like_count { self.like_count = v; }
    }
}

impl Entity for UserProfile {
    type Patch = UserPatch;

    fn id(&self) -> u64 { self.id }

    fn apply(&mut self, p: &UserPatch) {
        if let Some(v) = &p.name { self.name = v.clone(); }
        if let Some(v) = &p.preferences { self.preferences = v.clone(); }
        if let Some(v) = &p.avatar { self.avatar = Some(v.clone()); }
        if let Some(v) = p.is_active { self.is_active = v; }
        if let Some(v) = p.is_admin { self.is_admin = v; }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Membership {
    Liked,
    Saved,
}

#[derive(Debug, Clone)]
pub struct ViewStore<T: Entity> {
    items: Vec<T>,
    cursor: Option<PaginationCursor>,
    pub filters: FilterParams,
    loading: bool,
    error: Option<ClientError>,
    /// Bumped by every full reload; results of older loads are dropped.
    generation: u64,
    liked: HashSet<u64>,
    saved: HashSet<u64>,
}

impl<T: Entity> Default for ViewStore<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: None,
            filters: FilterParams::default(),
            loading: false,
            error: None,
            generation: 0,
            liked: HashSet::new(),
            saved: HashSet::new(),
        }
    }
}

impl<T: Entity> ViewStore<T> {
    pub fn new() -> Self { Self::default() }

    pub fn items(&self) -> &[T] { &self.items }
    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn get(&self, id: u64) -> Option<&T> { self.items.iter().find(|e| e.id() == id) }
    pub fn cursor(&self) -> Option<PaginationCursor> { self.cursor }
    pub fn has_next(&self) -> bool { self.cursor.is_some_and(|c| c.has_next) }

    /// Page to request for "load more", if the backend reported one.
    pub fn next_page(&self) -> Option<u32> {
        self.cursor.filter(|c| c.has_next).map(|c| c.page + 1)
    }

    /// Full overwrite after a reload or filter change. Membership caches are left
    /// alone; resync them with [`ViewStore::sync_membership`] when the reload also
    /// fetched the authoritative lists.
    pub fn replace(&mut self, items: Vec<T>, cursor: Option<PaginationCursor>) {
        self.items = Vec::with_capacity(items.len());
        self.cursor = cursor;
        self.extend_unique(items);
    }

    /// "Load more": concatenate in order, dropping ids already present (first occurrence wins).
    /// Returns how many items were actually added.
    pub fn append(&mut self, items: Vec<T>, cursor: Option<PaginationCursor>) -> usize {
        if cursor.is_some() { self.cursor = cursor; }
        self.extend_unique(items)
    }

    fn extend_unique(&mut self, items: Vec<T>) -> usize {
        let mut seen: HashSet<u64> = self.items.iter().map(|e| e.id()).collect();
        let before = self.items.len();
        self.items.extend(items.into_iter().filter(|e| seen.insert(e.id())));
        self.items.len() - before
    }

    /// Shallow-merge into the entity with `id`. Absent ids are ignored; they may
    /// simply be outside the loaded window.
    pub fn apply_field_update(&mut self, id: u64, patch: &T::Patch) -> bool {
        match self.items.iter_mut().find(|e| e.id() == id) {
            Some(e) => { e.apply(patch); true }
            None => false,
        }
    }

    /// Overwrite the whole entity with a backend-returned copy, if loaded.
    pub fn upsert_existing(&mut self, entity: T) -> bool {
        match self.items.iter_mut().find(|e| e.id() == entity.id()) {
            Some(slot) => { *slot = entity; true }
            None => false,
        }
    }

    pub fn remove(&mut self, id: u64) -> Option<T> {
        let idx = self.items.iter().position(|e| e.id() == id)?;
        Some(self.items.remove(idx))
    }

    // Membership caches

    fn set_of(&self, which: Membership) -> &HashSet<u64> {
        match which { Membership::Liked => &self.liked, Membership::Saved => &self.saved }
    }

    fn set_of_mut(&mut self, which: Membership) -> &mut HashSet<u64> {
        match which { Membership::Liked => &mut self.liked, Membership::Saved => &mut self.saved }
    }

    pub fn contains(&self, which: Membership, id: u64) -> bool { self.set_of(which).contains(&id) }
    pub fn is_liked(&self, id: u64) -> bool { self.contains(Membership::Liked, id) }
    pub fn is_saved(&self, id: u64) -> bool { self.contains(Membership::Saved, id) }
    pub fn members(&self, which: Membership) -> &HashSet<u64> { self.set_of(which) }

    /// Set membership and return the previous value.
    pub fn set_member(&mut self, which: Membership, id: u64, on: bool) -> bool {
        let set = self.set_of_mut(which);
        if on { !set.insert(id) } else { set.remove(&id) }
    }

    /// Replace a cache with the backend's authoritative list.
    pub fn sync_membership(&mut self, which: Membership, ids: impl IntoIterator<Item = u64>) {
        *self.set_of_mut(which) = ids.into_iter().collect();
    }

    // Status

    pub fn is_loading(&self) -> bool { self.loading }
    pub fn set_loading(&mut self, on: bool) { self.loading = on; }
    pub fn error(&self) -> Option<&ClientError> { self.error.as_ref() }
    pub fn set_error(&mut self, e: Option<ClientError>) { self.error = e; }

    /// Mark a full reload as started and return its generation. Anything still
    /// in flight from an earlier generation is stale from here on.
    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        self.generation
    }

    pub fn generation(&self) -> u64 { self.generation }
}

pub type SharedStore<T> = Arc<Mutex<ViewStore<T>>>;

pub fn shared<T: Entity>() -> SharedStore<T> { Arc::new(Mutex::new(ViewStore::new())) }

/// Lock a shared store. Store mutations never panic midway, so a poisoned lock
/// still holds consistent state.
pub fn lock<T: Entity>(store: &SharedStore<T>) -> MutexGuard<'_, ViewStore<T>> {
    store.lock().unwrap_or_else(|e| e.into_inner())
}

//! Derived view computation: which of the loaded items are shown.
//!
//! Pure functions over the loaded collection. Ordering comes from the backend
//! (`sort_by` is a request parameter) and is never changed here.

use std::collections::BTreeSet;

use crate::types::{Category, ContentItem, Difficulty, SortKey};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterParams {
    /// Case-insensitive substring over title, author and tags.
    pub search: String,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    /// Passed through to the backend only.
    pub sort: SortKey,
    /// Any-of; empty means no tag filtering.
    pub tags: BTreeSet<String>,
}

impl FilterParams {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.category.is_none() && self.difficulty.is_none() && self.tags.is_empty()
    }

    /// Flip a tag in the selection.
    pub fn toggle_tag(&mut self, tag: &str) {
        if !self.tags.remove(tag) { self.tags.insert(tag.to_string()); }
    }
}

pub fn matches(item: &ContentItem, p: &FilterParams) -> bool {
    if let Some(c) = &p.category {
        if &item.category != c { return false; }
    }
    if let Some(d) = &p.difficulty {
        if item.difficulty_level.as_ref() != Some(d) { return false; }
    }
    if !p.tags.is_empty() && !p.tags.iter().any(|t| item.has_tag(t)) {
        return false;
    }
    let needle = p.search.trim().to_lowercase();
    needle.is_empty() || text_matches(item, &needle)
}

fn text_matches(item: &ContentItem, needle: &str) -> bool {
    item.title.to_lowercase().contains(needle)
        || item.author.as_deref().is_some_and(|a| a.to_lowercase().contains(needle))
        || item.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

/// Subset of `items` to render, in their original order.
pub fn derive_view(items: &[ContentItem], p: &FilterParams) -> Vec<ContentItem> {
    items.iter().filter(|i| matches(i, p)).cloned().collect()
}

/// Sorted unique tags across the loaded items, for the tag picker.
pub fn available_tags(items: &[ContentItem]) -> Vec<String> {
    items.iter().flat_map(|i| i.tags.iter().cloned()).collect::<BTreeSet<_>>().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::content;

    fn tags(ts: &[&str]) -> BTreeSet<String> { ts.iter().map(|t| t.to_string()).collect() }

    #[test]
    fn tag_filter_is_any_of() {
        let items = vec![content(1, &["a", "b"]), content(2, &["c"]), content(3, &["a"])];
        let p = FilterParams { tags: tags(&["a"]), ..Default::default() };
        let ids: Vec<u64> = derive_view(&items, &p).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn empty_selection_keeps_everything() {
        let items = vec![content(1, &["a"]), content(2, &[])];
        assert_eq!(derive_view(&items, &FilterParams::default()).len(), 2);
    }

    #[test]
    fn search_is_case_insensitive_over_title_author_tags() {
        let mut a = content(1, &["Kubernetes"]);
        a.title = "Déployer en production".into();
        let mut b = content(2, &[]);
        b.author = Some("Thomas MARTIN".into());
        let c = content(3, &[]);
        let items = vec![a, b, c];
        let by = |s: &str| derive_view(&items, &FilterParams { search: s.into(), ..Default::default() }).iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(by("kubern"), vec![1]);
        assert_eq!(by("martin"), vec![2]);
        assert_eq!(by("DÉPLOYER"), vec![1]);
    }

    #[test]
    fn category_and_difficulty_are_exact() {
        let mut a = content(1, &[]);
        a.category = Category::Cloud;
        a.difficulty_level = Some(Difficulty::Expert);
        let b = content(2, &[]);
        let items = vec![a, b];
        let p = FilterParams { category: Some(Category::Cloud), difficulty: Some(Difficulty::Expert), ..Default::default() };
        assert_eq!(derive_view(&items, &p).len(), 1);
        let p = FilterParams { difficulty: Some(Difficulty::Beginner), ..Default::default() };
        assert!(derive_view(&items, &p).is_empty());
    }

    #[test]
    fn repeated_calls_are_value_equal() {
        let items = vec![content(1, &["x"]), content(2, &["y"])];
        let p = FilterParams { tags: tags(&["y"]), search: "article".into(), ..Default::default() };
        assert_eq!(derive_view(&items, &p), derive_view(&items, &p));
    }

    #[test]
    fn available_tags_are_sorted_and_unique() {
        let items = vec![content(1, &["rust", "ai"]), content(2, &["ai"])];
        assert_eq!(available_tags(&items), vec!["ai".to_string(), "rust".to_string()]);
    }

    #[test]
    fn toggle_tag_flips_selection() {
        let mut p = FilterParams::default();
        p.toggle_tag("a");
        assert!(p.tags.contains("a"));
        p.toggle_tag("a");
        assert!(p.tags.is_empty());
    }
}

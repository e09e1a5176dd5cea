use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use techfeed::config::ClientConfig;
use techfeed::credentials::{Anonymous, CredentialStore, StaticToken};
use techfeed::error::ClientError;
use techfeed::mutation::AutoConfirm;
use techfeed::pages::{FeedMode, HistoryFilter};
use techfeed::store::lock;
use techfeed::transport::{MemoryTransport, Method};
use techfeed::types::{Category, ContentStatus};
use techfeed::TechFeed;

fn item(id: u64, tags: &[&str]) -> Value {
    json!({
        "id": id,
        "title": format!("Article {id}"),
        "author": "Marie Curie",
        "category": "DevOps",
        "tags": tags,
        "like_count": 5,
        "created_at": "2024-03-01T10:00:00"
    })
}

fn item_in(id: u64, category: &str) -> Value {
    let mut v = item(id, &[]);
    v["category"] = json!(category);
    v
}

fn cursor(page: u32, pages: u32) -> Value {
    json!({"page": page, "per_page": 2, "total": pages * 2, "pages": pages, "has_next": page < pages, "has_prev": page > 1})
}

fn user(id: u64, admin: bool) -> Value {
    json!({"id": id, "email": "a@b.c", "name": "Alice", "preferences": ["DevOps"], "is_admin": admin, "is_active": true})
}

fn toggle(action: &str) -> Value { json!({"success": true, "action": action}) }

fn app(t: &Arc<MemoryTransport>, signed_in: bool) -> TechFeed {
    let creds: Arc<dyn CredentialStore> = if signed_in { Arc::new(StaticToken("tok".into())) } else { Arc::new(Anonymous) };
    TechFeed::with_transport(ClientConfig::default(), t.clone(), creds)
}

fn ids(items: &[techfeed::types::ContentItem]) -> Vec<u64> { items.iter().map(|c| c.id).collect() }

// --- Feed ---

#[tokio::test]
async fn feed_survives_failed_categories() {
    let t = Arc::new(MemoryTransport::new());
    t.ok(Method::Get, "/recommendation/for-you", json!({"success": true, "recommendations": [item(1, &[]), item(2, &[])]}));
    t.status(Method::Get, "/content/categories", 500, json!({"error": "boom"}));
    t.ok(Method::Get, "/interaction/user/liked", json!({"success": true, "liked_contents": [item(1, &[])]}));
    t.ok(Method::Get, "/interaction/user/bookmarks", json!({"success": true, "bookmarked_contents": []}));

    let feed = app(&t, true).feed(FeedMode::Personalized);
    feed.load().await.unwrap();

    assert_eq!(ids(&feed.visible()), vec![1, 2]);
    assert!(feed.is_liked(1));
    assert!(!feed.is_liked(2));
    assert!(feed.categories().is_empty());
    assert!(lock(feed.store()).error().is_none());
}

#[tokio::test]
async fn feed_fails_only_when_content_fails() {
    let t = Arc::new(MemoryTransport::new());
    t.down(Method::Get, "/recommendation/for-you");
    t.ok(Method::Get, "/content/categories", json!({"success": true, "categories": [{"name": "DevOps", "count": 3}]}));

    let feed = app(&t, true).feed(FeedMode::Personalized);
    let err = feed.load().await.unwrap_err();

    assert!(err.is_network_layer());
    assert_eq!(lock(feed.store()).error(), Some(&err));
    assert_eq!(feed.categories().len(), 1);
}

#[tokio::test]
async fn anonymous_feed_skips_membership_lists() {
    let t = Arc::new(MemoryTransport::new());
    t.ok(Method::Get, "/content/", json!({"success": true, "contents": [item(1, &[])], "pagination": cursor(1, 1)}));
    t.ok(Method::Get, "/content/categories", json!({"success": true, "categories": []}));

    let feed = app(&t, false).feed(FeedMode::Catalogue);
    feed.load().await.unwrap();

    assert_eq!(t.count(Method::Get, "/interaction/user/liked"), 0);
    assert_eq!(t.count(Method::Get, "/interaction/user/bookmarks"), 0);
    assert!(matches!(feed.toggle_like(1).await, Err(ClientError::Validation(_))));
    assert_eq!(t.count(Method::Post, "/interaction/toggle"), 0);
}

#[tokio::test]
async fn load_more_appends_without_duplicates() {
    let t = Arc::new(MemoryTransport::new());
    t.ok(Method::Get, "/content/", json!({"success": true, "contents": [item(1, &[]), item(2, &[])], "pagination": cursor(1, 2)}));
    t.ok(Method::Get, "/content/", json!({"success": true, "contents": [item(2, &[]), item(3, &[])], "pagination": cursor(2, 2)}));
    t.ok(Method::Get, "/content/categories", json!({"success": true, "categories": []}));

    let feed = app(&t, false).feed(FeedMode::Catalogue);
    feed.load().await.unwrap();
    assert_eq!(feed.load_more().await.unwrap(), 1);
    assert_eq!(ids(&feed.visible()), vec![1, 2, 3]);

    let pages: Vec<String> = t.requests().iter().filter(|r| r.path == "/content/").filter_map(|r| r.query_value("page").map(String::from)).collect();
    assert_eq!(pages, vec!["1", "2"]);
    // last page reached
    assert_eq!(feed.load_more().await.unwrap(), 0);
    assert_eq!(t.count(Method::Get, "/content/"), 2);
}

#[tokio::test(start_paused = true)]
async fn load_more_in_flight_is_dropped_after_category_change() {
    let t = Arc::new(MemoryTransport::new());
    t.ok(Method::Get, "/content/", json!({"success": true, "contents": [item_in(1, "IA")], "pagination": cursor(1, 2)}));
    t.ok_after(Method::Get, "/content/", Duration::from_millis(300), json!({"success": true, "contents": [item_in(2, "IA")], "pagination": cursor(2, 2)}));
    t.ok(Method::Get, "/content/", json!({"success": true, "contents": [item_in(9, "Cloud")], "pagination": cursor(1, 1)}));
    t.ok(Method::Get, "/content/categories", json!({"success": true, "categories": []}));

    let feed = app(&t, false).feed(FeedMode::Catalogue);
    feed.load().await.unwrap();
    let more = tokio::spawn({
        let feed = feed.clone();
        async move { feed.load_more().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    feed.set_category(Some(Category::Cloud)).await.unwrap();

    assert_eq!(more.await.unwrap().unwrap(), 0);
    let s = lock(feed.store());
    assert_eq!(ids(s.items()), vec![9]);
    assert!(s.items().iter().all(|c| c.category == Category::Cloud));
    assert!(!s.has_next());
    assert!(!s.is_loading());
}

#[tokio::test]
async fn category_change_goes_to_backend() {
    let t = Arc::new(MemoryTransport::new());
    t.ok(Method::Get, "/content/", json!({"success": true, "contents": [], "pagination": cursor(1, 1)}));

    let feed = app(&t, false).feed(FeedMode::Catalogue);
    feed.set_category(Some(Category::Cloud)).await.unwrap();

    let last = t.requests().into_iter().filter(|r| r.path == "/content/").last().unwrap();
    assert_eq!(last.query_value("category"), Some("Cloud"));
}

// --- Explore ---

#[tokio::test(start_paused = true)]
async fn search_burst_sends_one_request_with_last_term() {
    let t = Arc::new(MemoryTransport::new());
    t.ok(Method::Get, "/content/", json!({"success": true, "contents": [item(1, &[])], "pagination": cursor(1, 1)}));
    t.ok(Method::Get, "/content/categories", json!({"success": true, "categories": []}));

    let page = app(&t, false).explore();
    page.open().await.unwrap();
    assert_eq!(t.count(Method::Get, "/content/"), 1);

    let mut handles = Vec::new();
    for term in ["k", "ku", "kube"] {
        handles.push(page.set_search(term));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let fired: Vec<bool> = futures::future::join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(fired, vec![false, false, true]);
    assert_eq!(t.count(Method::Get, "/content/"), 2);
    let last = t.requests().into_iter().filter(|r| r.path == "/content/").last().unwrap();
    assert_eq!(last.query_value("search"), Some("kube"));
    assert_eq!(last.query_value("page"), Some("1"));
}

#[tokio::test(start_paused = true)]
async fn slower_earlier_reload_does_not_overwrite_newer() {
    let t = Arc::new(MemoryTransport::new());
    t.ok_after(Method::Get, "/content/", Duration::from_millis(300), json!({"success": true, "contents": [item_in(1, "IA")], "pagination": cursor(1, 1)}));
    t.ok(Method::Get, "/content/", json!({"success": true, "contents": [item_in(9, "Cloud")], "pagination": cursor(1, 1)}));

    let page = app(&t, false).explore();
    let first = tokio::spawn({
        let page = page.clone();
        async move { page.reload().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    page.set_category(Some(Category::Cloud)).await.unwrap();
    first.await.unwrap().unwrap();

    let s = lock(page.store());
    assert_eq!(ids(s.items()), vec![9]);
    assert!(!s.is_loading());
}

#[tokio::test]
async fn tag_selection_filters_locally() {
    let t = Arc::new(MemoryTransport::new());
    t.ok(Method::Get, "/content/", json!({"success": true, "contents": [item(1, &["rust", "async"]), item(2, &["go"]), item(3, &["async"])], "pagination": cursor(1, 1)}));

    let page = app(&t, false).explore();
    page.reload().await.unwrap();
    assert_eq!(page.available_tags(), vec!["async", "go", "rust"]);

    page.toggle_tag("async");
    assert_eq!(ids(&page.visible()), vec![1, 3]);
    page.toggle_tag("go");
    assert_eq!(ids(&page.visible()), vec![1, 2, 3]);
    assert_eq!(t.count(Method::Get, "/content/"), 1);
}

#[tokio::test]
async fn reset_filters_reloads_unfiltered() {
    let t = Arc::new(MemoryTransport::new());
    t.ok(Method::Get, "/content/", json!({"success": true, "contents": [], "pagination": cursor(1, 1)}));

    let page = app(&t, false).explore();
    page.toggle_tag("rust");
    page.set_difficulty(Some(techfeed::types::Difficulty::Expert)).await.unwrap();
    page.reset_filters().await.unwrap();

    assert!(page.filters().is_empty());
    let last = t.requests().into_iter().last().unwrap();
    assert_eq!(last.query_value("difficulty"), None);
}

// --- Article ---

#[tokio::test]
async fn article_loads_without_related() {
    let t = Arc::new(MemoryTransport::new());
    t.ok(Method::Get, "/content/7", json!({"success": true, "content": item(7, &[])}));
    t.down(Method::Get, "/recommendation/similar/7");

    let page = app(&t, false).article();
    let a = page.open(7).await.unwrap();

    assert_eq!(a.id, 7);
    assert!(page.related().is_empty());
    assert!(page.error().is_none());
}

#[tokio::test]
async fn missing_article_is_http_error() {
    let t = Arc::new(MemoryTransport::new());
    t.status(Method::Get, "/content/9", 404, json!({"error": "Contenu non trouvé"}));
    t.ok(Method::Get, "/recommendation/similar/9", json!({"success": true, "similar_contents": []}));

    let page = app(&t, false).article();
    let err = page.open(9).await.unwrap_err();

    assert_eq!(err, ClientError::Http { status: 404, message: Some("Contenu non trouvé".into()) });
    assert!(page.article().is_none());
    assert!(matches!(page.open(0).await, Err(ClientError::Validation(_))));
}

#[tokio::test]
async fn like_twice_returns_to_original_state() {
    let t = Arc::new(MemoryTransport::new());
    t.ok(Method::Get, "/content/3", json!({"success": true, "content": item(3, &[])}));
    t.ok(Method::Get, "/recommendation/similar/3", json!({"success": true, "similar_contents": [item(4, &[])]}));
    t.ok(Method::Get, "/interaction/user/liked", json!({"success": true, "liked_contents": []}));
    t.ok(Method::Get, "/interaction/user/bookmarks", json!({"success": true, "bookmarked_contents": []}));
    t.ok(Method::Post, "/interaction/toggle", toggle("added"));
    t.ok(Method::Post, "/interaction/toggle", toggle("removed"));

    let page = app(&t, true).article();
    page.open(3).await.unwrap();
    assert_eq!(page.related().len(), 1);

    assert!(page.toggle_like().await.unwrap());
    assert!(page.is_liked());
    assert_eq!(page.article().unwrap().like_count, 6);

    assert!(!page.toggle_like().await.unwrap());
    assert!(!page.is_liked());
    assert_eq!(page.article().unwrap().like_count, 5);
}

#[tokio::test]
async fn failed_save_rolls_back() {
    let t = Arc::new(MemoryTransport::new());
    t.ok(Method::Get, "/content/3", json!({"success": true, "content": item(3, &[])}));
    t.ok(Method::Get, "/interaction/user/bookmarks", json!({"success": true, "bookmarked_contents": []}));
    t.down(Method::Post, "/interaction/toggle");

    let page = app(&t, true).article();
    page.open(3).await.unwrap();

    let err = page.toggle_save().await.unwrap_err();
    assert!(err.is_network_layer());
    assert!(!page.is_saved());
    assert_eq!(page.error(), Some(err));
}

// --- History ---

#[tokio::test]
async fn history_dedups_views_and_counts() {
    let t = Arc::new(MemoryTransport::new());
    let entry = |iid: u64, cid: u64| json!({"interaction": {"id": iid, "content_id": cid, "interaction_type": "view"}, "content": item(cid, &[])});
    t.ok(Method::Get, "/interaction/user/history", json!({"success": true, "reading_history": [entry(1, 1), entry(2, 2), entry(3, 1)]}));
    t.ok(Method::Get, "/interaction/user/liked", json!({"success": true, "liked_contents": [item(3, &[])]}));
    t.ok(Method::Get, "/interaction/user/bookmarks", json!({"success": true, "bookmarked_contents": [item(2, &[])]}));

    let page = app(&t, true).history();
    page.load().await.unwrap();

    assert_eq!(ids(&page.view(HistoryFilter::Views)), vec![1, 2]);
    assert_eq!(ids(&page.view(HistoryFilter::Likes)), vec![3]);
    assert_eq!(ids(&page.view(HistoryFilter::Favorites)), vec![2]);
    assert_eq!(ids(&page.view(HistoryFilter::All)), vec![1, 2, 3]);
    let stats = page.stats();
    assert_eq!((stats.views, stats.likes, stats.favorites), (2, 1, 1));
}

#[tokio::test]
async fn history_pages_through_cursor() {
    let t = Arc::new(MemoryTransport::new());
    let entry = |iid: u64, cid: u64| json!({"interaction": {"id": iid, "content_id": cid, "interaction_type": "view"}, "content": item(cid, &[])});
    t.ok(Method::Get, "/interaction/user/history", json!({"success": true, "reading_history": [entry(1, 1), entry(2, 2)], "pagination": cursor(1, 2)}));
    t.ok(Method::Get, "/interaction/user/history", json!({"success": true, "reading_history": [entry(2, 2), entry(3, 3)], "pagination": cursor(2, 2)}));
    t.ok(Method::Get, "/interaction/user/liked", json!({"success": true, "liked_contents": []}));
    t.ok(Method::Get, "/interaction/user/bookmarks", json!({"success": true, "bookmarked_contents": []}));

    let page = app(&t, true).history();
    page.load().await.unwrap();
    assert!(page.has_more());
    assert_eq!(page.load_more().await.unwrap(), 1);
    assert_eq!(ids(&page.view(HistoryFilter::Views)), vec![1, 2, 3]);
    assert!(!page.has_more());
    assert_eq!(page.load_more().await.unwrap(), 0);

    let pages: Vec<String> = t.requests().iter().filter(|r| r.path == "/interaction/user/history").filter_map(|r| r.query_value("page").map(String::from)).collect();
    assert_eq!(pages, vec!["1", "2"]);
    let first = t.requests().into_iter().find(|r| r.path == "/interaction/user/history").unwrap();
    assert_eq!(first.query_value("per_page"), Some("20"));
}

#[tokio::test]
async fn history_requires_sign_in() {
    let t = Arc::new(MemoryTransport::new());
    let page = app(&t, false).history();
    assert!(matches!(page.load().await, Err(ClientError::Validation(_))));
    assert!(t.requests().is_empty());
}

// --- Profile ---

#[tokio::test]
async fn profile_preview_and_updates() {
    let t = Arc::new(MemoryTransport::new());
    t.ok(Method::Get, "/auth/profile", json!({"success": true, "user": user(1, false)}));
    let liked: Vec<Value> = (1..=6).map(|i| item(i, &[])).collect();
    t.ok(Method::Get, "/interaction/user/liked", json!({"success": true, "liked_contents": liked}));
    let mut renamed = user(1, false);
    renamed["name"] = json!("Alicia");
    t.ok(Method::Put, "/auth/profile", json!({"success": true, "user": renamed}));

    let page = app(&t, true).profile();
    page.load().await.unwrap();
    assert_eq!(ids(&page.liked_preview()), vec![1, 2, 3, 4]);

    page.toggle_preference(Category::DevOps);
    assert!(matches!(page.update_preferences().await, Err(ClientError::Validation(_))));
    assert!(matches!(page.rename("   ").await, Err(ClientError::Validation(_))));
    assert_eq!(t.count(Method::Put, "/auth/profile"), 0);

    let u = page.rename("Alicia").await.unwrap();
    assert_eq!(u.name, "Alicia");
    assert_eq!(page.user().unwrap().name, "Alicia");
    assert_eq!(page.draft_preferences(), vec![Category::DevOps]);
}

// --- Admin ---

fn admin_routes(t: &MemoryTransport) {
    t.ok(Method::Get, "/auth/profile", json!({"success": true, "user": user(1, true)}));
    t.ok(Method::Get, "/admin/stats", json!({"success": true, "stats": {
        "users": {"total": 2, "active": 2, "admins": 1},
        "contents": {"total": 2, "published": 1, "featured": 0},
        "interactions": {"total": 10, "likes": 4, "views": 6}
    }}));
    t.ok(Method::Get, "/admin/users", json!({"success": true, "users": [user(1, true), user(2, false)], "pagination": cursor(1, 1)}));
    t.ok(Method::Get, "/admin/contents", json!({"success": true, "contents": [item(1, &[]), item(2, &[])], "pagination": cursor(1, 1)}));
}

#[tokio::test]
async fn admin_delete_removes_row_after_confirmation() {
    let t = Arc::new(MemoryTransport::new());
    admin_routes(&t);
    t.ok(Method::Delete, "/admin/contents/2", json!({"success": true, "message": "Contenu supprimé"}));

    let page = app(&t, true).admin();
    page.open().await.unwrap();

    assert!(!page.delete_content(2, &AutoConfirm(false)).await.unwrap());
    assert_eq!(t.count(Method::Delete, "/admin/contents/2"), 0);

    assert!(page.delete_content(2, &AutoConfirm(true)).await.unwrap());
    assert_eq!(ids(lock(page.contents()).items()), vec![1]);
    assert_eq!(page.stats().unwrap().contents.total, 1);
}

#[tokio::test]
async fn admin_publish_toggle_uses_backend_entity() {
    let t = Arc::new(MemoryTransport::new());
    admin_routes(&t);
    // the backend's content payload never includes the publish flag
    t.ok(Method::Put, "/admin/contents/1", json!({"success": true, "content": item(1, &["edited"])}));

    let page = app(&t, true).admin();
    page.open().await.unwrap();
    let c = page.toggle_publish(1).await.unwrap();

    assert_eq!(c.is_published, Some(false));
    {
        let s = lock(page.contents());
        assert_eq!(s.get(1).unwrap().tags, vec!["edited".to_string()]);
        assert_eq!(s.get(1).unwrap().is_published, Some(false));
    }
    let body = t.requests().into_iter().find(|r| r.method == Method::Put).unwrap().body.unwrap();
    assert_eq!(body, json!({"is_published": false}));

    // and back again
    assert_eq!(page.toggle_publish(1).await.unwrap().is_published, Some(true));
    let body = t.requests().into_iter().filter(|r| r.method == Method::Put).last().unwrap().body.unwrap();
    assert_eq!(body, json!({"is_published": true}));
}

#[tokio::test]
async fn draft_listing_publishes_on_toggle() {
    let t = Arc::new(MemoryTransport::new());
    admin_routes(&t);
    t.ok(Method::Put, "/admin/contents/2", json!({"success": true, "content": item(2, &[])}));

    let page = app(&t, true).admin();
    page.set_content_filter(Some(ContentStatus::Draft), "");
    page.open().await.unwrap();

    assert_eq!(t.requests().into_iter().find(|r| r.path == "/admin/contents").unwrap().query_value("status"), Some("draft"));
    assert!(lock(page.contents()).items().iter().all(|c| c.is_published == Some(false)));
    assert_eq!(page.toggle_publish(2).await.unwrap().is_published, Some(true));
    let body = t.requests().into_iter().find(|r| r.method == Method::Put).unwrap().body.unwrap();
    assert_eq!(body, json!({"is_published": true}));
}

#[tokio::test]
async fn admin_tables_use_admin_page_size() {
    let t = Arc::new(MemoryTransport::new());
    admin_routes(&t);

    let page = app(&t, true).admin();
    page.open().await.unwrap();

    for path in ["/admin/users", "/admin/contents"] {
        let req = t.requests().into_iter().find(|r| r.path == path).unwrap();
        assert_eq!(req.query_value("per_page"), Some("50"));
    }
}

#[tokio::test(start_paused = true)]
async fn admin_searches_are_debounced() {
    let t = Arc::new(MemoryTransport::new());
    admin_routes(&t);

    let page = app(&t, true).admin();
    page.open().await.unwrap();
    assert_eq!(t.count(Method::Get, "/admin/users"), 1);

    let mut users = Vec::new();
    let mut contents = Vec::new();
    for term in ["a", "al", "ali"] {
        users.push(page.search_users(term));
        contents.push(page.filter_contents(Some(ContentStatus::Published), term));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let fired: Vec<bool> = futures::future::join_all(users).await.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(fired, vec![false, false, true]);
    let fired: Vec<bool> = futures::future::join_all(contents).await.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(fired, vec![false, false, true]);

    assert_eq!(t.count(Method::Get, "/admin/users"), 2);
    assert_eq!(t.count(Method::Get, "/admin/contents"), 2);
    let last_users = t.requests().into_iter().filter(|r| r.path == "/admin/users").last().unwrap();
    assert_eq!(last_users.query_value("search"), Some("ali"));
    let last_contents = t.requests().into_iter().filter(|r| r.path == "/admin/contents").last().unwrap();
    assert_eq!(last_contents.query_value("search"), Some("ali"));
    assert_eq!(last_contents.query_value("status"), Some("published"));
    assert!(lock(page.contents()).items().iter().all(|c| c.is_published == Some(true)));
}

#[tokio::test]
async fn admin_dashboard_tolerates_missing_stats() {
    let t = Arc::new(MemoryTransport::new());
    admin_routes(&t);
    t.status(Method::Get, "/admin/stats", 500, json!({"error": "db"}));
    // the first queued stats reply is consumed before the failure repeats
    let page = app(&t, true).admin();
    page.open().await.unwrap();
    page.open().await.unwrap();

    assert_eq!(lock(page.users()).len(), 2);
    assert_eq!(page.stats().unwrap().users.total, 2);
}

#[tokio::test]
async fn non_admin_cannot_open_dashboard() {
    let t = Arc::new(MemoryTransport::new());
    t.ok(Method::Get, "/auth/profile", json!({"success": true, "user": user(5, false)}));

    let page = app(&t, true).admin();
    assert!(matches!(page.open().await, Err(ClientError::Validation(_))));
    assert_eq!(t.count(Method::Get, "/admin/contents"), 0);
}

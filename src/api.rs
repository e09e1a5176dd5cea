//! Typed wrappers over the REST endpoints.
//!
//! Every call is a single attempt and returns `ApiResult`; nothing here panics or
//! propagates a failure other than as a `ClientError` value.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{ApiResult, ClientError};
use crate::mapping::{backend_message, normalize, Endpoint};
use crate::transport::{ApiRequest, HttpTransport, RawResponse, Transport};
use crate::types::{
    AdminInteraction, AdminStats, Category, CategoryCount, ContentItem, ContentPatch, ContentStatus, Difficulty,
    InteractionKind, InteractionRecord, PaginationCursor, SortKey, UserPatch, UserProfile,
};

// --- Normalized payloads ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub cursor: Option<PaginationCursor>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Records<T> {
    pub records: Vec<T>,
    #[serde(default)]
    pub cursor: Option<PaginationCursor>,
}

#[derive(Deserialize)]
struct One<T> { item: T }

/// Profile and token pair handed out by login and signup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthSession {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Deserialize)]
struct AccessBody { access_token: String }

#[derive(Deserialize)]
struct UserBody { user: UserProfile }

#[derive(Deserialize)]
struct ToggleBody { added: bool }

#[derive(Deserialize)]
struct CategoriesBody { categories: Vec<CategoryCount> }

#[derive(Deserialize)]
struct StatsBody { stats: AdminStats }

#[derive(Deserialize)]
struct DeleteBody { #[serde(default)] message: Option<String> }

// --- Queries ---

/// Parameters of `GET /content/`. `None` fields are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<Category>,
    pub search: Option<String>,
    pub sort_by: Option<SortKey>,
    pub difficulty: Option<Difficulty>,
}

impl ContentQuery {
    fn to_request(&self) -> ApiRequest {
        ApiRequest::get("/content/")
            .param("page", self.page)
            .param("per_page", self.per_page)
            .param("category", self.category.as_ref().map(Category::as_str))
            .param("search", self.search.as_deref().filter(|s| !s.trim().is_empty()))
            .param("sort_by", self.sort_by.map(SortKey::as_str))
            .param("difficulty", self.difficulty.as_ref().map(Difficulty::as_str))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminContentQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<ContentStatus>,
    pub category: Option<Category>,
    pub search: Option<String>,
}

/// Account creation form, sent as the signup body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signup {
    pub email: String,
    pub password: String,
    pub name: String,
    pub preferences: Vec<Category>,
}

impl Signup {
    /// Same rules the backend applies, checked before any request.
    fn check(&self) -> ApiResult<()> {
        if self.email.trim().is_empty() || self.password.is_empty() || self.name.trim().is_empty() {
            return Err(ClientError::validation("email, password and name are required"));
        }
        if !self.email.contains('@') {
            return Err(ClientError::validation("invalid email address"));
        }
        if self.password.chars().count() < 6 || !self.password.chars().any(|c| c.is_alphabetic()) {
            return Err(ClientError::validation("password needs at least 6 characters including a letter"));
        }
        if self.preferences.is_empty() {
            return Err(ClientError::validation("select at least one category"));
        }
        Ok(())
    }
}

// --- Client ---

#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn Transport>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { transport, credentials }
    }

    pub fn from_config(cfg: &ClientConfig, credentials: Arc<dyn CredentialStore>) -> ApiResult<Self> {
        let transport = HttpTransport::new(cfg.base_url_trimmed(), Duration::from_millis(cfg.timeout_ms))?;
        Ok(Self::new(Arc::new(transport), credentials))
    }

    /// Whether a bearer credential is currently available; mutations need one.
    pub async fn is_authenticated(&self) -> bool { self.credentials.bearer_token().await.is_some() }

    pub(crate) async fn require_auth(&self) -> ApiResult<()> {
        if self.is_authenticated().await { Ok(()) } else { Err(ClientError::validation("sign-in required")) }
    }

    async fn call<T: DeserializeOwned>(&self, endpoint: Endpoint, req: ApiRequest) -> ApiResult<T> {
        let token = self.credentials.bearer_token().await;
        self.call_as(endpoint, req, token.as_deref()).await
    }

    async fn call_as<T: DeserializeOwned>(&self, endpoint: Endpoint, req: ApiRequest, bearer: Option<&str>) -> ApiResult<T> {
        debug!(method = req.method.as_str(), path = %req.path, ?endpoint, "request");
        let raw = self.transport.send(&req, bearer).await.inspect_err(|e| {
            warn!(path = %req.path, error = %e, "request failed");
        })?;
        decode(endpoint, raw)
    }

    // Auth

    /// Exchange credentials for a session. Sent without a bearer.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthSession> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ClientError::validation("email and password are required"));
        }
        let body = json!({"email": email, "password": password});
        self.call_as(Endpoint::Login, ApiRequest::post("/auth/login", body), None).await
    }

    pub async fn signup(&self, form: &Signup) -> ApiResult<AuthSession> {
        form.check()?;
        self.call_as(Endpoint::Signup, ApiRequest::post("/auth/signup", to_body(form)?), None).await
    }

    /// New access token for a refresh token. The refresh token goes out as the bearer.
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<String> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(ClientError::validation("refresh token is empty"));
        }
        let req = ApiRequest::post("/auth/refresh", json!({"refresh_token": refresh_token}));
        let body: AccessBody = self.call_as(Endpoint::Refresh, req, Some(refresh_token)).await?;
        Ok(body.access_token)
    }

    // Content

    pub async fn list_content(&self, q: &ContentQuery) -> ApiResult<Page<ContentItem>> {
        self.call(Endpoint::ListContent, q.to_request()).await
    }

    pub async fn get_content(&self, id: u64) -> ApiResult<ContentItem> {
        check_id(id)?;
        let one: One<ContentItem> = self.call(Endpoint::GetContent, ApiRequest::get(format!("/content/{id}"))).await?;
        Ok(one.item)
    }

    pub async fn featured(&self, limit: Option<u32>) -> ApiResult<Vec<ContentItem>> { self.shortlist("featured", limit).await }
    pub async fn popular(&self, limit: Option<u32>) -> ApiResult<Vec<ContentItem>> { self.shortlist("popular", limit).await }
    pub async fn recent(&self, limit: Option<u32>) -> ApiResult<Vec<ContentItem>> { self.shortlist("recent", limit).await }

    async fn shortlist(&self, which: &str, limit: Option<u32>) -> ApiResult<Vec<ContentItem>> {
        let page: Page<ContentItem> = self.call(Endpoint::Shortlist, ApiRequest::get(format!("/content/{which}")).param("limit", limit)).await?;
        Ok(page.items)
    }

    pub async fn categories(&self) -> ApiResult<Vec<CategoryCount>> {
        let body: CategoriesBody = self.call(Endpoint::Categories, ApiRequest::get("/content/categories")).await?;
        Ok(body.categories)
    }

    pub async fn search(&self, term: &str, category: Option<&Category>, difficulty: Option<&Difficulty>, page: Option<u32>) -> ApiResult<Page<ContentItem>> {
        let term = term.trim();
        if term.is_empty() { return Err(ClientError::validation("search term is empty")); }
        let req = ApiRequest::get("/content/search")
            .param("search", Some(term))
            .param("category", category.map(Category::as_str))
            .param("difficulty", difficulty.map(Difficulty::as_str))
            .param("page", page);
        self.call(Endpoint::Search, req).await
    }

    // Interactions

    /// Returns the backend's verdict: `true` when the interaction now exists.
    pub async fn toggle_interaction(&self, content_id: u64, kind: InteractionKind) -> ApiResult<bool> {
        check_id(content_id)?;
        if !matches!(kind, InteractionKind::Like | InteractionKind::Favorite) {
            return Err(ClientError::validation(format!("{} cannot be toggled", kind.as_str())));
        }
        let body = json!({"content_id": content_id, "interaction_type": kind.as_str()});
        let out: ToggleBody = self.call(Endpoint::Toggle, ApiRequest::post("/interaction/toggle", body)).await?;
        Ok(out.added)
    }

    pub async fn history(&self, page: Option<u32>, per_page: Option<u32>) -> ApiResult<Records<InteractionRecord>> {
        let req = ApiRequest::get("/interaction/user/history").param("page", page).param("per_page", per_page);
        self.call(Endpoint::History, req).await
    }

    pub async fn liked(&self) -> ApiResult<Vec<ContentItem>> {
        let page: Page<ContentItem> = self.call(Endpoint::Liked, ApiRequest::get("/interaction/user/liked")).await?;
        Ok(page.items)
    }

    pub async fn saved(&self) -> ApiResult<Page<ContentItem>> {
        self.call(Endpoint::Saved, ApiRequest::get("/interaction/user/bookmarks")).await
    }

    // Recommendations

    pub async fn for_you(&self, limit: Option<u32>) -> ApiResult<Vec<ContentItem>> {
        let page: Page<ContentItem> = self.call(Endpoint::ForYou, ApiRequest::get("/recommendation/for-you").param("limit", limit)).await?;
        Ok(page.items)
    }

    pub async fn similar(&self, content_id: u64, limit: Option<u32>) -> ApiResult<Vec<ContentItem>> {
        check_id(content_id)?;
        let req = ApiRequest::get(format!("/recommendation/similar/{content_id}")).param("limit", limit);
        let page: Page<ContentItem> = self.call(Endpoint::Similar, req).await?;
        Ok(page.items)
    }

    pub async fn trending(&self, limit: Option<u32>) -> ApiResult<Vec<ContentItem>> {
        let page: Page<ContentItem> = self.call(Endpoint::Trending, ApiRequest::get("/recommendation/trending").param("limit", limit)).await?;
        Ok(page.items)
    }

    // Profile

    pub async fn profile(&self) -> ApiResult<UserProfile> {
        let body: UserBody = self.call(Endpoint::Profile, ApiRequest::get("/auth/profile")).await?;
        Ok(body.user)
    }

    pub async fn update_profile(&self, patch: &UserPatch) -> ApiResult<UserProfile> {
        let body: UserBody = self.call(Endpoint::Profile, ApiRequest::put("/auth/profile", to_body(patch)?)).await?;
        Ok(body.user)
    }

    // Admin

    pub async fn admin_stats(&self) -> ApiResult<AdminStats> {
        let body: StatsBody = self.call(Endpoint::AdminStats, ApiRequest::get("/admin/stats")).await?;
        Ok(body.stats)
    }

    pub async fn admin_users(&self, page: Option<u32>, per_page: Option<u32>, search: Option<&str>) -> ApiResult<Page<UserProfile>> {
        let req = ApiRequest::get("/admin/users")
            .param("page", page)
            .param("per_page", per_page)
            .param("search", search.filter(|s| !s.trim().is_empty()));
        self.call(Endpoint::AdminUsers, req).await
    }

    pub async fn admin_update_user(&self, user_id: u64, patch: &UserPatch) -> ApiResult<UserProfile> {
        check_id(user_id)?;
        let body: UserBody = self.call(Endpoint::AdminUser, ApiRequest::put(format!("/admin/users/{user_id}"), to_body(patch)?)).await?;
        Ok(body.user)
    }

    pub async fn admin_contents(&self, q: &AdminContentQuery) -> ApiResult<Page<ContentItem>> {
        let req = ApiRequest::get("/admin/contents")
            .param("page", q.page)
            .param("per_page", q.per_page)
            .param("status", q.status.map(ContentStatus::as_str))
            .param("category", q.category.as_ref().map(Category::as_str))
            .param("search", q.search.as_deref().filter(|s| !s.trim().is_empty()));
        self.call(Endpoint::AdminContents, req).await
    }

    pub async fn admin_create_content(&self, draft: &ContentPatch) -> ApiResult<ContentItem> {
        if draft.title.as_deref().map_or(true, |t| t.trim().is_empty()) || draft.category.is_none() {
            return Err(ClientError::validation("title and category are required"));
        }
        let one: One<ContentItem> = self.call(Endpoint::AdminContent, ApiRequest::post("/admin/contents", to_body(draft)?)).await?;
        Ok(one.item)
    }

    pub async fn admin_update_content(&self, content_id: u64, patch: &ContentPatch) -> ApiResult<ContentItem> {
        check_id(content_id)?;
        let one: One<ContentItem> = self.call(Endpoint::AdminContent, ApiRequest::put(format!("/admin/contents/{content_id}"), to_body(patch)?)).await?;
        Ok(one.item)
    }

    pub async fn admin_delete_content(&self, content_id: u64) -> ApiResult<Option<String>> {
        check_id(content_id)?;
        let body: DeleteBody = self.call(Endpoint::AdminDelete, ApiRequest::delete(format!("/admin/contents/{content_id}"))).await?;
        Ok(body.message)
    }

    pub async fn admin_interactions(&self, page: Option<u32>, per_page: Option<u32>, kind: Option<InteractionKind>) -> ApiResult<Records<AdminInteraction>> {
        let req = ApiRequest::get("/admin/interactions")
            .param("page", page)
            .param("per_page", per_page)
            .param("type", kind.map(InteractionKind::as_str));
        self.call(Endpoint::AdminInteractions, req).await
    }
}

/// Turn one raw response into a typed, normalized value.
pub fn decode<T: DeserializeOwned>(endpoint: Endpoint, raw: RawResponse) -> ApiResult<T> {
    let parsed = serde_json::from_str::<Value>(&raw.body);
    if !raw.is_success() {
        let message = parsed.ok().as_ref().and_then(Value::as_object).and_then(backend_message);
        return Err(ClientError::Http { status: raw.status, message });
    }
    let normalized = normalize(endpoint, raw.status, parsed?)?;
    Ok(serde_json::from_value(normalized)?)
}

fn check_id(id: u64) -> ApiResult<()> {
    if id == 0 { Err(ClientError::validation("content identifier must be positive")) } else { Ok(()) }
}

fn to_body<T: serde::Serialize>(v: &T) -> ApiResult<Value> {
    serde_json::to_value(v).map_err(|e| ClientError::validation(e.to_string()))
}

//! Client-side copies of backend entities.
//!
//! Authoritative copies live in the backend; everything here is a transient
//! snapshot scoped to a page's lifetime.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// --- Enumerations ---

/// Content category. Values the client does not know yet are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Ia,
    DevOps,
    Cyber,
    Mobile,
    Frontend,
    Backend,
    BigData,
    Blockchain,
    Cloud,
    Other(String),
}

impl Category {
    pub const KNOWN: [Category; 9] = [
        Category::Ia,
        Category::DevOps,
        Category::Cyber,
        Category::Mobile,
        Category::Frontend,
        Category::Backend,
        Category::BigData,
        Category::Blockchain,
        Category::Cloud,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::Ia => "IA",
            Category::DevOps => "DevOps",
            Category::Cyber => "Cyber",
            Category::Mobile => "Mobile",
            Category::Frontend => "Frontend",
            Category::Backend => "Backend",
            Category::BigData => "Big Data",
            Category::Blockchain => "Blockchain",
            Category::Cloud => "Cloud",
            Category::Other(s) => s,
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        match s.as_str() {
            "IA" => Category::Ia,
            "DevOps" => Category::DevOps,
            "Cyber" => Category::Cyber,
            "Mobile" => Category::Mobile,
            "Frontend" => Category::Frontend,
            "Backend" => Category::Backend,
            "Big Data" => Category::BigData,
            "Blockchain" => Category::Blockchain,
            "Cloud" => Category::Cloud,
            _ => Category::Other(s),
        }
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self { c.as_str().to_string() }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.pad(self.as_str()) }
}

/// Difficulty level. The backend stores English keys while older content
/// carries the French display labels; both spellings map to the same variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
    Other(String),
}

impl Difficulty {
    pub fn as_str(&self) -> &str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
            Difficulty::Other(s) => s,
        }
    }
}

impl From<String> for Difficulty {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "beginner" | "débutant" | "debutant" => Difficulty::Beginner,
            "intermediate" | "intermédiaire" | "intermediaire" => Difficulty::Intermediate,
            "advanced" | "avancé" | "avance" => Difficulty::Advanced,
            "expert" => Difficulty::Expert,
            _ => Difficulty::Other(s),
        }
    }
}

impl From<Difficulty> for String {
    fn from(d: Difficulty) -> Self { d.as_str().to_string() }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.pad(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    View,
    Like,
    Dislike,
    Favorite,
    Share,
    Bookmark,
}

impl InteractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Like => "like",
            InteractionKind::Dislike => "dislike",
            InteractionKind::Favorite => "favorite",
            InteractionKind::Share => "share",
            InteractionKind::Bookmark => "bookmark",
        }
    }
}

/// Backend-side ordering for content lists; never applied locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Recent,
    Popular,
    Engagement,
    Featured,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Recent => "recent",
            SortKey::Popular => "popular",
            SortKey::Engagement => "engagement",
            SortKey::Featured => "featured",
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recent" => Ok(SortKey::Recent),
            "popular" => Ok(SortKey::Popular),
            "engagement" => Ok(SortKey::Engagement),
            "featured" => Ok(SortKey::Featured),
            other => Err(format!("unknown sort key `{other}` (expected recent, popular, engagement, featured)")),
        }
    }
}

/// Admin content listing status filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStatus {
    Published,
    Draft,
    Featured,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Published => "published",
            ContentStatus::Draft => "draft",
            ContentStatus::Featured => "featured",
        }
    }
}

// --- Entities ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Full body; only present on single-item fetches.
    #[serde(default, rename = "content")]
    pub body: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    /// Reading time in minutes.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub difficulty_level: Option<Difficulty>,
    /// `None` when the backend left the flag out, which `to_dict` always does.
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub engagement_score: f64,
    #[serde(default, with = "lenient_timestamp")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "lenient_timestamp")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default, with = "lenient_timestamp")]
    pub published_at: Option<NaiveDateTime>,
}

impl ContentItem {
    pub fn has_tag(&self, tag: &str) -> bool { self.tags.iter().any(|t| t == tag) }

    /// Publication state with an unreported flag read as published: public
    /// listings only carry published items and new content starts published.
    pub fn published(&self) -> bool { self.is_published.unwrap_or(true) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    #[serde(default)]
    pub email: Option<String>,
    pub name: String,
    #[serde(default)]
    pub preferences: Vec<Category>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub interactions_count: Option<u64>,
    #[serde(default, with = "lenient_timestamp")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "lenient_timestamp")]
    pub last_login: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: u64,
    pub content_id: u64,
    #[serde(rename = "interaction_type")]
    pub kind: InteractionKind,
    #[serde(default)]
    pub rating: Option<u8>,
    /// Seconds spent on the content.
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default, with = "lenient_timestamp")]
    pub created_at: Option<NaiveDateTime>,
    /// Denormalized copy for history display; never assumed to be present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Box<ContentItem>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginationCursor {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u32,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub has_prev: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: u64,
}

// --- Admin ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserTotals {
    pub total: u64,
    pub active: u64,
    pub admins: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentTotals {
    pub total: u64,
    pub published: u64,
    pub featured: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionTotals {
    pub total: u64,
    pub likes: u64,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryViews {
    pub name: String,
    pub content_count: u64,
    #[serde(default)]
    pub total_views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminStats {
    pub users: UserTotals,
    pub contents: ContentTotals,
    pub interactions: InteractionTotals,
    #[serde(default)]
    pub top_contents: Vec<ContentItem>,
    #[serde(default)]
    pub categories: Vec<CategoryViews>,
}

/// Admin listing row: an interaction plus the thin user/content summaries
/// the backend attaches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminInteraction {
    pub id: u64,
    pub user_id: u64,
    pub content_id: u64,
    pub interaction_type: InteractionKind,
    #[serde(default, with = "lenient_timestamp")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

// --- Partial updates ---

/// Shallow field update for a [`ContentItem`]; also the JSON body of the
/// admin update/create calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "content")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Vec<Category>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

fn default_true() -> bool { true }

/// Backend timestamps are naive ISO-8601 (`datetime.isoformat()`), sometimes with an
/// offset. Unparseable values degrade to `None` rather than failing the whole payload.
mod lenient_timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => s.serialize_some(&ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.as_deref().and_then(parse))
    }

    pub(super) fn parse(s: &str) -> Option<NaiveDateTime> {
        s.parse::<NaiveDateTime>()
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
    }
}

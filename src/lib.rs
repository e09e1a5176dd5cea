pub mod api;
pub mod config;
pub mod credentials;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod mapping;
pub mod mutation;
pub mod pages;
pub mod store;
pub mod transport;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::api::{AuthSession, ContentQuery, Page, Records, RemoteClient, Signup};
    pub use crate::config::ClientConfig;
    pub use crate::credentials::{Anonymous, CredentialStore, EnvToken, StaticToken};
    pub use crate::error::{ApiResult, ClientError};
    pub use crate::filter::{derive_view, FilterParams};
    pub use crate::mutation::{AutoConfirm, Confirm};
    pub use crate::pages::{AdminPage, ArticlePage, ExplorePage, FeedMode, FeedPage, HistoryFilter, HistoryPage, ProfilePage};
    pub use crate::types::{Category, ContentItem, Difficulty, InteractionKind, SortKey, UserProfile};
    pub use crate::TechFeed;
}

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::api::RemoteClient;
use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::pages::{AdminPage, ArticlePage, ExplorePage, FeedMode, FeedPage, HistoryPage, ProfilePage};
use crate::transport::Transport;

/// Async library entry point. Owns the settings and a remote client, and hands
/// out page controllers bound to them.
#[derive(Clone)]
pub struct TechFeed {
    config: ClientConfig,
    client: RemoteClient,
}

impl TechFeed {
    /// Load configuration (file, then `TECHFEED_*` env) and build an HTTP-backed client.
    pub async fn connect(config_path: Option<&Path>, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let config = ClientConfig::load(config_path)?;
        Self::from_config(config, credentials)
    }

    pub fn from_config(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let client = RemoteClient::from_config(&config, credentials)?;
        tracing::debug!(base_url = %config.base_url, "client ready");
        Ok(Self { config, client })
    }

    /// Build over any transport; used with the in-memory transport in tests.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { client: RemoteClient::new(transport, credentials), config }
    }

    pub fn config(&self) -> &ClientConfig { &self.config }
    pub fn client(&self) -> &RemoteClient { &self.client }

    // Pages

    pub fn feed(&self, mode: FeedMode) -> FeedPage {
        FeedPage::new(self.client.clone(), mode, self.config.per_page, self.config.for_you_limit)
    }

    /// Feed for whoever is signed in: personalized for regular users, the catalogue otherwise.
    pub async fn feed_for_viewer(&self) -> FeedPage {
        let mode = match self.client.profile().await {
            Ok(u) if !u.is_admin => FeedMode::Personalized,
            _ => FeedMode::Catalogue,
        };
        self.feed(mode)
    }

    pub fn explore(&self) -> ExplorePage {
        ExplorePage::new(self.client.clone(), self.config.per_page, Duration::from_millis(self.config.debounce_ms))
    }

    pub fn article(&self) -> ArticlePage { ArticlePage::new(self.client.clone(), self.config.similar_limit) }
    pub fn history(&self) -> HistoryPage { HistoryPage::new(self.client.clone(), self.config.history_per_page) }
    pub fn profile(&self) -> ProfilePage { ProfilePage::new(self.client.clone()) }
    pub fn admin(&self) -> AdminPage {
        AdminPage::new(self.client.clone(), self.config.admin_per_page, Duration::from_millis(self.config.debounce_ms))
    }
}

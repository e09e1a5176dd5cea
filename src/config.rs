use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5001/api";

/// Client settings. Read from an optional TOML file, then overridden by
/// `TECHFEED_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub per_page: u32,
    /// Page size of the admin user and content tables.
    pub admin_per_page: u32,
    /// Page size of the reading history.
    pub history_per_page: u32,
    pub debounce_ms: u64,
    pub similar_limit: u32,
    pub for_you_limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 10_000,
            per_page: 12,
            admin_per_page: 50,
            history_per_page: 20,
            debounce_ms: 500,
            similar_limit: 3,
            for_you_limit: 20,
        }
    }
}

impl ClientConfig {
    /// Load from `path` (or the default location when `None`), apply env overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };
        let mut cfg = match path {
            Some(p) if p.exists() => Self::from_file(&p)?,
            _ => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Self = toml::from_str(&text).with_context(|| format!("parsing config: {}", path.display()))?;
        debug!(path = %path.display(), "loaded client config");
        Ok(cfg)
    }

    /// Env lookup is injected so tests do not touch the process environment.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(u) = var("TECHFEED_API_URL").filter(|s| !s.trim().is_empty()) { self.base_url = u; }
        if let Some(v) = var("TECHFEED_TIMEOUT_MS") { self.timeout_ms = v.parse().with_context(|| format!("invalid TECHFEED_TIMEOUT_MS: {v}"))?; }
        if let Some(v) = var("TECHFEED_PER_PAGE") { self.per_page = v.parse().with_context(|| format!("invalid TECHFEED_PER_PAGE: {v}"))?; }
        if let Some(v) = var("TECHFEED_ADMIN_PER_PAGE") { self.admin_per_page = v.parse().with_context(|| format!("invalid TECHFEED_ADMIN_PER_PAGE: {v}"))?; }
        if let Some(v) = var("TECHFEED_DEBOUNCE_MS") { self.debounce_ms = v.parse().with_context(|| format!("invalid TECHFEED_DEBOUNCE_MS: {v}"))?; }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url).with_context(|| format!("invalid base URL: {}", self.base_url))?;
        anyhow::ensure!(matches!(url.scheme(), "http" | "https"), "base URL must be http(s): {}", self.base_url);
        for (name, size) in [("per_page", self.per_page), ("admin_per_page", self.admin_per_page), ("history_per_page", self.history_per_page)] {
            anyhow::ensure!(size > 0 && size <= 100, "{name} must be within 1..=100");
        }
        Ok(())
    }

    pub fn base_url_trimmed(&self) -> &str { self.base_url.trim_end_matches('/') }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "techfeed", "techfeed").map(|p| p.config_dir().join("client.toml"))
}

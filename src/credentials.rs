use async_trait::async_trait;

/// Source of the bearer credential attached to every request.
/// Where the token is kept is up to the embedder.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

/// No credential: public read endpoints only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

#[async_trait]
impl CredentialStore for Anonymous {
    async fn bearer_token(&self) -> Option<String> { None }
}

#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl CredentialStore for StaticToken {
    async fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone()).filter(|t| !t.is_empty())
    }
}

/// Reads `TECHFEED_TOKEN` on every call so a refreshed token is picked up.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvToken;

#[async_trait]
impl CredentialStore for EnvToken {
    async fn bearer_token(&self) -> Option<String> {
        std::env::var("TECHFEED_TOKEN").ok().filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_static_token_counts_as_anonymous() {
        assert_eq!(StaticToken(String::new()).bearer_token().await, None);
        assert_eq!(StaticToken("abc".into()).bearer_token().await.as_deref(), Some("abc"));
        assert_eq!(Anonymous.bearer_token().await, None);
    }
}

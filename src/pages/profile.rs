use tracing::{info, warn};

use crate::api::RemoteClient;
use crate::error::{ApiResult, ClientError};
use crate::pages::{read, secondary, slot, write, Slot};
use crate::types::{Category, ContentItem, UserPatch, UserProfile};

const LIKED_PREVIEW: usize = 4;

#[derive(Clone)]
pub struct ProfilePage {
    client: RemoteClient,
    user: Slot<Option<UserProfile>>,
    liked_preview: Slot<Vec<ContentItem>>,
    /// Preference selection being edited; saved with [`ProfilePage::update_preferences`].
    draft: Slot<Vec<Category>>,
}

impl ProfilePage {
    pub fn new(client: RemoteClient) -> Self {
        Self { client, user: slot(None), liked_preview: slot(Vec::new()), draft: slot(Vec::new()) }
    }

    pub async fn load(&self) -> ApiResult<UserProfile> {
        self.client.require_auth().await?;
        let (user, liked) = futures::join!(self.client.profile(), self.client.liked());
        if let Some(mut items) = secondary("liked", liked) {
            items.truncate(LIKED_PREVIEW);
            write(&self.liked_preview, items);
        }
        let user = user.inspect_err(|e| warn!(error = %e, "profile load failed"))?;
        info!(user = user.id, "profile loaded");
        write(&self.draft, user.preferences.clone());
        write(&self.user, Some(user.clone()));
        Ok(user)
    }

    pub fn user(&self) -> Option<UserProfile> { read(&self.user) }
    pub fn liked_preview(&self) -> Vec<ContentItem> { read(&self.liked_preview) }
    pub fn draft_preferences(&self) -> Vec<Category> { read(&self.draft) }

    /// Flip a category in the draft selection; nothing is sent.
    pub fn toggle_preference(&self, category: Category) {
        let mut draft = read(&self.draft);
        match draft.iter().position(|c| *c == category) {
            Some(i) => { draft.remove(i); }
            None => draft.push(category),
        }
        write(&self.draft, draft);
    }

    pub async fn update_preferences(&self) -> ApiResult<UserProfile> {
        let preferences = read(&self.draft);
        if preferences.is_empty() {
            return Err(ClientError::validation("select at least one category"));
        }
        self.update(UserPatch { preferences: Some(preferences), ..Default::default() }).await
    }

    pub async fn rename(&self, name: &str) -> ApiResult<UserProfile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::validation("name cannot be empty"));
        }
        self.update(UserPatch { name: Some(name.to_string()), ..Default::default() }).await
    }

    async fn update(&self, patch: UserPatch) -> ApiResult<UserProfile> {
        let user = self.client.update_profile(&patch).await?;
        write(&self.draft, user.preferences.clone());
        write(&self.user, Some(user.clone()));
        Ok(user)
    }
}

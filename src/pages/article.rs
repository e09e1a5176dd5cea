use tracing::{info, warn};

use crate::api::RemoteClient;
use crate::error::{ApiResult, ClientError};
use crate::mutation::ContentActions;
use crate::pages::{read, resync, secondary, slot, write, Slot};
use crate::store::{lock, shared, Membership, SharedStore};
use crate::types::ContentItem;

/// One article with its related items. The article itself is the only
/// required branch.
#[derive(Clone)]
pub struct ArticlePage {
    client: RemoteClient,
    store: SharedStore<ContentItem>,
    actions: ContentActions,
    related: Slot<Vec<ContentItem>>,
    similar_limit: u32,
}

impl ArticlePage {
    pub fn new(client: RemoteClient, similar_limit: u32) -> Self {
        let store = shared();
        let actions = ContentActions::new(client.clone(), store.clone());
        Self { client, store, actions, related: slot(Vec::new()), similar_limit }
    }

    pub async fn open(&self, id: u64) -> ApiResult<ContentItem> {
        if id == 0 {
            return Err(ClientError::validation("content id must be positive"));
        }
        {
            let mut s = lock(&self.store);
            s.set_loading(true);
            s.set_error(None);
        }
        self.actions.sequencer().invalidate_all();
        let authed = self.client.is_authenticated().await;

        let (article, similar, liked, saved) = futures::join!(
            self.client.get_content(id),
            self.client.similar(id, Some(self.similar_limit)),
            async { if authed { Some(self.client.liked().await) } else { None } },
            async { if authed { Some(self.client.saved().await) } else { None } },
        );

        write(&self.related, secondary("similar", similar).unwrap_or_default());
        resync(&self.store, Membership::Liked, liked.and_then(|r| secondary("liked", r)).as_deref());
        resync(&self.store, Membership::Saved, saved.and_then(|r| secondary("saved", r)).as_ref().map(|p| p.items.as_slice()));

        let mut s = lock(&self.store);
        s.set_loading(false);
        match article {
            Ok(item) => {
                info!(id, title = %item.title, "article loaded");
                s.replace(vec![item.clone()], None);
                Ok(item)
            }
            Err(e) => {
                warn!(id, error = %e, "article load failed");
                s.replace(Vec::new(), None);
                s.set_error(Some(e.clone()));
                Err(e)
            }
        }
    }

    pub fn article(&self) -> Option<ContentItem> { lock(&self.store).items().first().cloned() }
    pub fn related(&self) -> Vec<ContentItem> { read(&self.related) }
    pub fn error(&self) -> Option<ClientError> { lock(&self.store).error().cloned() }

    fn current_id(&self) -> ApiResult<u64> {
        self.article().map(|a| a.id).ok_or_else(|| ClientError::validation("no article loaded"))
    }

    pub fn is_liked(&self) -> bool { self.article().is_some_and(|a| lock(&self.store).is_liked(a.id)) }
    pub fn is_saved(&self) -> bool { self.article().is_some_and(|a| lock(&self.store).is_saved(a.id)) }

    pub async fn toggle_like(&self) -> ApiResult<bool> { self.actions.toggle_like(self.current_id()?).await }
    pub async fn toggle_save(&self) -> ApiResult<bool> { self.actions.toggle_favorite(self.current_id()?).await }
}

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::admin::list::OperatorPostList;
use crate::application::admin::notices::{Notice, NoticeSink};
use crate::application::assets::AssetUploader;
use crate::application::identity::IdentityProvider;
use crate::application::repos::PostsRepo;
use crate::changefeed::{ChangeFeedListener, ListenerHandle, ReloadTarget};
use crate::domain::entities::Operator;

use super::types::{AuthoringError, BusyFlag, Draft, DraftFields};

/// Operator-side workflow: the held post list, the open draft, and the
/// list-level actions (publish toggle, delete).
pub struct AuthoringSession {
    pub(crate) repo: Arc<dyn PostsRepo>,
    pub(crate) uploader: AssetUploader,
    pub(crate) identity: Arc<dyn IdentityProvider>,
    pub(crate) notices: Arc<dyn NoticeSink>,
    pub(crate) posts: Arc<OperatorPostList>,
    pub(crate) draft: Option<Draft>,
    pub(crate) busy: BusyFlag,
    listener: ChangeFeedListener,
    handle: Option<ListenerHandle>,
}

impl AuthoringSession {
    pub fn new(
        repo: Arc<dyn PostsRepo>,
        uploader: AssetUploader,
        identity: Arc<dyn IdentityProvider>,
        notices: Arc<dyn NoticeSink>,
        listener: ChangeFeedListener,
    ) -> Self {
        let posts = Arc::new(OperatorPostList::new(repo.clone()));
        Self {
            repo,
            uploader,
            identity,
            notices,
            posts,
            draft: None,
            busy: BusyFlag::default(),
            listener,
            handle: None,
        }
    }

    pub(crate) async fn operator(&self) -> Result<Operator, AuthoringError> {
        self.identity
            .current_user()
            .await
            .ok_or(AuthoringError::Unauthenticated)
    }

    /// Subscribe to the change feed and load the full list.
    pub async fn activate(&mut self) -> Result<(), AuthoringError> {
        let operator = self.operator().await?;
        if self.handle.is_some() {
            return Ok(());
        }

        let target: Arc<dyn ReloadTarget> = self.posts.clone();
        let handle = self.listener.activate(target).await;
        let lease = handle.lease().clone();
        self.handle = Some(handle);

        self.posts
            .refresh_under(&lease)
            .await
            .map_err(AuthoringError::from_repo)?;
        info!(operator = %operator.id, posts = self.posts.len(), "Authoring session activated");
        Ok(())
    }

    pub fn deactivate(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.release();
            debug!("Authoring session deactivated");
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub fn posts(&self) -> &Arc<OperatorPostList> {
        &self.posts
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn draft_fields_mut(&mut self) -> Option<&mut DraftFields> {
        self.draft.as_mut().map(Draft::fields_mut)
    }

    /// Start a blank draft for a new post.
    pub async fn open_new(&mut self) -> Result<&mut DraftFields, AuthoringError> {
        let operator = self.operator().await?;
        let draft = self
            .draft
            .insert(Draft::Creating(DraftFields::for_operator(&operator)));
        Ok(draft.fields_mut())
    }

    /// Start a draft seeded from the held copy of post `id`.
    pub async fn open_edit(&mut self, id: Uuid) -> Result<&mut DraftFields, AuthoringError> {
        self.operator().await?;
        let baseline = self.posts.find(id).ok_or(AuthoringError::NotFound)?;
        let fields = DraftFields::from_record(&baseline);
        let draft = self.draft.insert(Draft::Editing {
            id,
            baseline,
            fields,
        });
        Ok(draft.fields_mut())
    }

    /// Discard the draft and close the editing surface.
    pub fn close(&mut self) {
        self.draft = None;
    }

    pub async fn sign_out(&mut self) {
        self.draft = None;
        self.deactivate();
        self.identity.sign_out().await;
        info!("Operator signed out");
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.notices.notify(notice);
    }

    /// Best-effort re-read after the session's own write; the change feed
    /// will catch up if this fails.
    pub(crate) async fn refresh_after_write(&self) {
        let result = match &self.handle {
            Some(handle) => self.posts.refresh_under(handle.lease()).await.map(|_| ()),
            None => self.posts.refresh().await.map(|_| ()),
        };
        if let Err(err) = result {
            warn!(error = %err, "Operator list refresh after write failed");
        }
    }
}

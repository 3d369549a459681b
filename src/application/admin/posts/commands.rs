use tracing::{info, warn};
use uuid::Uuid;

use crate::application::admin::notices::{
    self, DELETE_FAILED, Notice, POST_DELETED, SAVE_FAILED, STATUS_FAILED, UPLOAD_FAILED,
};
use crate::domain::posts::PostPatch;

use super::service::AuthoringSession;
use super::types::{AuthoringError, Confirm, Draft, SubmitOutcome};

impl AuthoringSession {
    /// Persist the open draft.
    ///
    /// A pending image is uploaded before anything is written; if the upload
    /// fails nothing is written at all. On any failure the draft stays open.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, AuthoringError> {
        let operator = self.operator().await?;
        let draft = self.draft.clone().ok_or(AuthoringError::NoDraft)?;
        let fields = draft.fields();
        if let Err(err) = fields.validate() {
            self.notify(Notice::error(err.to_string()));
            return Err(err.into());
        }

        let _busy = self.busy.raise();

        let uploaded = match &fields.pending_image {
            Some(image) => match self.uploader.upload_image(operator.id, image).await {
                Ok(reference) => Some(reference),
                Err(err) => {
                    self.notify(Notice::error(UPLOAD_FAILED));
                    return Err(AuthoringError::AssetUpload(err));
                }
            },
            None => None,
        };

        let result = match &draft {
            Draft::Editing { id, baseline, .. } => {
                let image_ref = uploaded.or_else(|| baseline.image_ref.clone());
                self.repo
                    .update(*id, fields.to_patch(image_ref))
                    .await
                    .map(SubmitOutcome::Updated)
            }
            Draft::Creating(_) => self
                .repo
                .create(fields.to_new_post(operator.id, uploaded))
                .await
                .map(SubmitOutcome::Created),
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, editing = ?draft.editing_id(), "Saving draft failed");
                self.notify(Notice::error(SAVE_FAILED));
                return Err(AuthoringError::from_repo(err));
            }
        };

        self.draft = None;
        let text = match &outcome {
            SubmitOutcome::Created(_) => notices::POST_CREATED,
            SubmitOutcome::Updated(_) => notices::POST_UPDATED,
        };
        self.notify(Notice::success(text));
        info!(post_id = %outcome.post().id, "{text}");

        self.refresh_after_write().await;
        Ok(outcome)
    }

    /// Flip `published` based on the held copy of the post.
    pub async fn toggle_publish(&mut self, id: Uuid) -> Result<bool, AuthoringError> {
        self.operator().await?;

        let Some(current) = self.posts.find(id) else {
            self.notify(Notice::error(STATUS_FAILED));
            return Err(AuthoringError::NotFound);
        };

        let _busy = self.busy.raise();
        let published = !current.published;
        match self.repo.update(id, PostPatch::publication(published)).await {
            Ok(_) => {
                let text = if published {
                    notices::POST_PUBLISHED
                } else {
                    notices::POST_UNPUBLISHED
                };
                self.notify(Notice::success(text));
                info!(post_id = %id, published, "Publication toggled");
                self.refresh_after_write().await;
                Ok(published)
            }
            Err(err) => {
                warn!(post_id = %id, error = %err, "Publication toggle failed");
                self.notify(Notice::error(STATUS_FAILED));
                Err(AuthoringError::from_repo(err))
            }
        }
    }

    /// Delete post `id` once the operator confirms. Declining makes no call.
    pub async fn delete_post(
        &mut self,
        id: Uuid,
        confirm: &dyn Confirm,
    ) -> Result<(), AuthoringError> {
        self.operator().await?;

        if !confirm.confirm("Are you sure you want to delete this post?") {
            return Err(AuthoringError::Cancelled);
        }

        let _busy = self.busy.raise();
        match self.repo.delete(id).await {
            Ok(()) => {
                if self
                    .draft
                    .as_ref()
                    .is_some_and(|draft| draft.editing_id() == Some(id))
                {
                    self.draft = None;
                }
                self.notify(Notice::success(POST_DELETED));
                info!(post_id = %id, "Post deleted");
                self.refresh_after_write().await;
                Ok(())
            }
            Err(err) => {
                warn!(post_id = %id, error = %err, "Post deletion failed");
                self.notify(Notice::error(DELETE_FAILED));
                Err(AuthoringError::from_repo(err))
            }
        }
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use uuid::Uuid;

use crate::application::assets::AssetStoreError;
use crate::application::repos::RepoError;
use crate::domain::assets::{AssetRef, PendingImage};
use crate::domain::entities::{Operator, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::posts::{NewPost, PostPatch, ensure_non_empty};

#[derive(Debug, Error)]
pub enum AuthoringError {
    #[error("no operator is signed in")]
    Unauthenticated,
    #[error("no draft is open")]
    NoDraft,
    #[error("invalid draft: {message}")]
    Validation { message: String },
    #[error("post not found")]
    NotFound,
    #[error("image upload failed: {0}")]
    AssetUpload(#[source] AssetStoreError),
    #[error("saving the post failed: {0}")]
    Save(#[source] RepoError),
    #[error("cancelled by operator")]
    Cancelled,
}

impl AuthoringError {
    /// Map a repository failure, keeping not-found and validation distinct.
    pub fn from_repo(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            RepoError::Validation { message } => Self::Validation { message },
            other => Self::Save(other),
        }
    }
}

impl From<DomainError> for AuthoringError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { .. } => Self::NotFound,
            DomainError::Validation { message } => Self::Validation { message },
        }
    }
}

/// Editable fields of the draft.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftFields {
    pub title: String,
    pub description: String,
    pub content: String,
    pub author: String,
    pub pending_image: Option<PendingImage>,
    pub published: bool,
}

impl DraftFields {
    /// Blank draft for `operator`: published by default, signed with their name.
    pub fn for_operator(operator: &Operator) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            content: String::new(),
            author: operator.display_name.clone(),
            pending_image: None,
            published: true,
        }
    }

    pub fn from_record(record: &PostRecord) -> Self {
        Self {
            title: record.title.clone(),
            description: record.description.clone(),
            content: record.content.clone(),
            author: record.author.clone(),
            pending_image: None,
            published: record.published,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_non_empty(&self.title, "title")?;
        ensure_non_empty(&self.description, "description")?;
        ensure_non_empty(&self.content, "content")?;
        ensure_non_empty(&self.author, "author")?;
        Ok(())
    }

    pub(crate) fn to_new_post(&self, author_id: Uuid, image_ref: Option<AssetRef>) -> NewPost {
        NewPost {
            title: self.title.clone(),
            description: self.description.clone(),
            content: self.content.clone(),
            image_ref,
            author: self.author.clone(),
            author_id,
            published: self.published,
        }
    }

    pub(crate) fn to_patch(&self, image_ref: Option<AssetRef>) -> PostPatch {
        PostPatch {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            content: Some(self.content.clone()),
            author: Some(self.author.clone()),
            image_ref: Some(image_ref),
            published: Some(self.published),
        }
    }
}

/// The in-progress draft, tagged by whether it targets an existing post.
#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    Creating(DraftFields),
    Editing {
        id: Uuid,
        baseline: PostRecord,
        fields: DraftFields,
    },
}

impl Draft {
    pub fn fields(&self) -> &DraftFields {
        match self {
            Draft::Creating(fields) | Draft::Editing { fields, .. } => fields,
        }
    }

    pub fn fields_mut(&mut self) -> &mut DraftFields {
        match self {
            Draft::Creating(fields) | Draft::Editing { fields, .. } => fields,
        }
    }

    pub fn editing_id(&self) -> Option<Uuid> {
        match self {
            Draft::Creating(_) => None,
            Draft::Editing { id, .. } => Some(*id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(PostRecord),
    Updated(PostRecord),
}

impl SubmitOutcome {
    pub fn post(&self) -> &PostRecord {
        match self {
            SubmitOutcome::Created(post) | SubmitOutcome::Updated(post) => post,
        }
    }
}

/// Yes/no gate shown before destructive actions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Raised while a mutating action is in flight. Cloned handles observe it.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn raise(&self) -> BusyGuard {
        self.0.store(true, Ordering::SeqCst);
        BusyGuard(self.0.clone())
    }
}

pub(crate) struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_drafts_default_to_published_with_operator_name() {
        let operator = Operator {
            id: Uuid::new_v4(),
            display_name: "Alice".into(),
        };
        let fields = DraftFields::for_operator(&operator);

        assert!(fields.published);
        assert_eq!(fields.author, "Alice");
        assert!(fields.validate().is_err());
    }

    #[test]
    fn busy_guard_lowers_flag_on_drop() {
        let flag = BusyFlag::default();
        let observer = flag.clone();
        {
            let _guard = flag.raise();
            assert!(observer.is_busy());
        }
        assert!(!observer.is_busy());
    }

    #[test]
    fn repo_errors_keep_their_category() {
        assert!(matches!(
            AuthoringError::from_repo(RepoError::NotFound),
            AuthoringError::NotFound
        ));
        assert!(matches!(
            AuthoringError::from_repo(RepoError::Timeout),
            AuthoringError::Save(RepoError::Timeout)
        ));
    }
}

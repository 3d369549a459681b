//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::assets::AssetRef;

/// Displayed in place of an empty stored author.
pub const FALLBACK_AUTHOR: &str = "Admin";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub content: String,
    pub image_ref: Option<AssetRef>,
    pub author: String,
    pub author_id: Uuid,
    pub published: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PostRecord {
    /// Whether anonymous readers may see this post.
    pub fn is_visible_to_readers(&self) -> bool {
        self.published
    }

    pub fn display_author(&self) -> &str {
        let trimmed = self.author.trim();
        if trimmed.is_empty() {
            FALLBACK_AUTHOR
        } else {
            trimmed
        }
    }
}

/// The authenticated operator as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operator {
    pub id: Uuid,
    pub display_name: String,
}

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::assets::AssetRef;
use crate::domain::entities::PostRecord;

pub(super) const POST_COLUMNS: &str = "id, title, description, content, image_ref, author, \
     author_id, published, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: Uuid,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) content: String,
    pub(crate) image_ref: Option<String>,
    pub(crate) author: String,
    pub(crate) author_id: Uuid,
    pub(crate) published: bool,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            content: row.content,
            image_ref: row.image_ref.map(AssetRef::new),
            author: row.author,
            author_id: row.author_id,
            published: row.published,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

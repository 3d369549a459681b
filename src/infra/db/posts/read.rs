use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::domain::entities::PostRecord;
use crate::infra::db::map_sqlx_error;

use crate::infra::db::PostgresRepositories;
use super::types::{POST_COLUMNS, PostRow};

impl PostgresRepositories {
    pub(super) async fn select_all(&self) -> Result<Vec<PostRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!("SELECT {POST_COLUMNS} FROM posts"))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    pub(super) async fn select_published(&self) -> Result<Vec<PostRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE published \
             ORDER BY created_at DESC, id ASC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    pub(super) async fn select_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(PostRecord::from))
    }
}

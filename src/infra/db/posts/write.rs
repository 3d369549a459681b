use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::domain::posts::{NewPost, PostPatch};
use crate::infra::db::map_sqlx_error;

use crate::infra::db::PostgresRepositories;
use super::types::{POST_COLUMNS, PostRow};

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn create(&self, post: NewPost) -> Result<PostRecord, RepoError> {
        post.validate()?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts \
             (title, description, content, image_ref, author, author_id, published) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.content)
        .bind(post.image_ref.as_ref().map(|image| image.as_str()))
        .bind(&post.author)
        .bind(post.author_id)
        .bind(post.published)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update(&self, id: Uuid, patch: PostPatch) -> Result<PostRecord, RepoError> {
        patch.validate()?;

        let clear_image = matches!(patch.image_ref, Some(None));
        let image_ref = patch
            .image_ref
            .as_ref()
            .and_then(|image| image.as_ref().map(|image| image.as_str()));

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "UPDATE posts SET \
                 title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 content = COALESCE($4, content), \
                 author = COALESCE($5, author), \
                 image_ref = CASE WHEN $6 THEN NULL ELSE COALESCE($7, image_ref) END, \
                 published = COALESCE($8, published), \
                 updated_at = GREATEST(now(), updated_at) \
             WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.content.as_deref())
        .bind(patch.author.as_deref())
        .bind(clear_image)
        .bind(image_ref)
        .bind(patch.published)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(PostRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<PostRecord>, RepoError> {
        self.select_all().await
    }

    async fn list_published(&self) -> Result<Vec<PostRecord>, RepoError> {
        self.select_published().await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        self.select_by_id(id).await
    }
}

//! Post field sets, validation and ordering rules.

use std::cmp::Ordering;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::assets::AssetRef;
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;

/// Field set for a post that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub content: String,
    pub image_ref: Option<AssetRef>,
    pub author: String,
    pub author_id: Uuid,
    pub published: bool,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_non_empty(&self.title, "title")?;
        ensure_non_empty(&self.description, "description")?;
        ensure_non_empty(&self.content, "content")?;
        ensure_non_empty(&self.author, "author")?;
        Ok(())
    }

    /// Materialise the record the store will hold for this field set.
    pub fn into_record(self, id: Uuid, now: OffsetDateTime) -> PostRecord {
        PostRecord {
            id,
            title: self.title,
            description: self.description,
            content: self.content,
            image_ref: self.image_ref,
            author: self.author,
            author_id: self.author_id,
            published: self.published,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. `None` leaves the stored value untouched.
///
/// `image_ref` is doubly optional: `Some(None)` clears the reference.
/// `author_id`, `id` and `created_at` are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub image_ref: Option<Option<AssetRef>>,
    pub published: Option<bool>,
}

impl PostPatch {
    pub fn publication(published: bool) -> Self {
        Self {
            published: Some(published),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.content.is_none()
            && self.author.is_none()
            && self.image_ref.is_none()
            && self.published.is_none()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            (&self.title, "title"),
            (&self.description, "description"),
            (&self.content, "content"),
            (&self.author, "author"),
        ];
        for (value, field) in required {
            if let Some(value) = value {
                ensure_non_empty(value, field)?;
            }
        }
        Ok(())
    }

    /// Apply the patch in place and stamp `updated_at`.
    pub fn apply_to(self, record: &mut PostRecord, now: OffsetDateTime) {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(content) = self.content {
            record.content = content;
        }
        if let Some(author) = self.author {
            record.author = author;
        }
        if let Some(image_ref) = self.image_ref {
            record.image_ref = image_ref;
        }
        if let Some(published) = self.published {
            record.published = published;
        }
        record.updated_at = next_updated_at(record.updated_at, now);
    }
}

pub fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::empty_field(field));
    }
    Ok(())
}

/// `updated_at` never moves backwards, even when the wall clock does.
pub fn next_updated_at(previous: OffsetDateTime, now: OffsetDateTime) -> OffsetDateTime {
    previous.max(now)
}

/// Feed order: newest `created_at` first, ties broken by ascending `id`.
pub fn feed_order(left: &PostRecord, right: &PostRecord) -> Ordering {
    right
        .created_at
        .cmp(&left.created_at)
        .then_with(|| left.id.cmp(&right.id))
}

pub fn sort_for_feed(posts: &mut [PostRecord]) {
    posts.sort_by(feed_order);
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    fn new_post() -> NewPost {
        NewPost {
            title: "A".into(),
            description: "d".into(),
            content: "c".into(),
            image_ref: None,
            author: "Alice".into(),
            author_id: Uuid::new_v4(),
            published: false,
        }
    }

    fn record_at(id: u128, created_at: OffsetDateTime) -> PostRecord {
        let mut record = new_post().into_record(Uuid::from_u128(id), created_at);
        record.published = true;
        record
    }

    #[test]
    fn new_post_rejects_blank_required_fields() {
        let mut post = new_post();
        post.description = "  ".into();
        let err = post.validate().expect_err("blank description rejected");
        assert_eq!(err, DomainError::empty_field("description"));

        let mut post = new_post();
        post.author = String::new();
        assert!(post.validate().is_err());

        assert!(new_post().validate().is_ok());
    }

    #[test]
    fn patch_only_validates_present_fields() {
        assert!(PostPatch::publication(true).validate().is_ok());

        let patch = PostPatch {
            title: Some(String::new()),
            ..PostPatch::default()
        };
        assert_eq!(
            patch.validate().expect_err("blank title"),
            DomainError::empty_field("title")
        );
    }

    #[test]
    fn patch_keeps_updated_at_monotonic() {
        let created = OffsetDateTime::now_utc();
        let mut record = new_post().into_record(Uuid::new_v4(), created);

        PostPatch::publication(true).apply_to(&mut record, created - Duration::hours(1));

        assert!(record.published);
        assert_eq!(record.updated_at, created);
        assert!(record.updated_at >= record.created_at);
    }

    #[test]
    fn patch_can_clear_image_reference() {
        let now = OffsetDateTime::now_utc();
        let mut record = new_post().into_record(Uuid::new_v4(), now);
        record.image_ref = Some(AssetRef::new("https://cdn.example/a.png"));

        let patch = PostPatch {
            image_ref: Some(None),
            ..PostPatch::default()
        };
        patch.apply_to(&mut record, now);

        assert!(record.image_ref.is_none());
    }

    #[test]
    fn feed_order_is_insertion_independent() {
        let base = OffsetDateTime::now_utc();
        let newest = record_at(9, base + Duration::minutes(5));
        let tie_low = record_at(1, base);
        let tie_high = record_at(2, base);
        let oldest = record_at(3, base - Duration::minutes(5));

        let expected = vec![
            newest.id,
            tie_low.id,
            tie_high.id,
            oldest.id,
        ];

        let inputs = [
            vec![oldest.clone(), tie_high.clone(), newest.clone(), tie_low.clone()],
            vec![tie_high.clone(), tie_low.clone(), oldest.clone(), newest.clone()],
            vec![newest.clone(), oldest.clone(), tie_low.clone(), tie_high.clone()],
        ];

        for mut posts in inputs {
            sort_for_feed(&mut posts);
            let ids: Vec<Uuid> = posts.iter().map(|post| post.id).collect();
            assert_eq!(ids, expected);
        }
    }
}

//! Title search over the operator's list.

use crate::domain::entities::PostRecord;

/// Case-insensitive substring match on `title`. Only the empty query
/// matches all; whitespace in the query is matched literally.
pub fn filter_by_title<'a>(posts: &'a [PostRecord], query: &str) -> Vec<&'a PostRecord> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return posts.iter().collect();
    }
    posts
        .iter()
        .filter(|post| post.title.to_lowercase().contains(&needle))
        .collect()
}

/// Holds the current query; results are recomputed on every read.
#[derive(Debug, Clone, Default)]
pub struct SearchView {
    query: String,
}

impl SearchView {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn apply(&self, posts: &[PostRecord]) -> Vec<PostRecord> {
        filter_by_title(posts, &self.query)
            .into_iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;

    fn titled(title: &str) -> PostRecord {
        let now = OffsetDateTime::now_utc();
        PostRecord {
            id: Uuid::new_v4(),
            title: title.into(),
            description: "d".into(),
            content: "c".into(),
            image_ref: None,
            author: "a".into(),
            author_id: Uuid::nil(),
            published: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn matches_title_case_insensitively() {
        let posts = vec![titled("My Blog"), titled("Other")];

        let hits = filter_by_title(&posts, "blo");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "My Blog");

        assert_eq!(filter_by_title(&posts, "BLOG").len(), 1);
    }

    #[test]
    fn ignores_description_and_content() {
        let mut post = titled("Release notes");
        post.description = "blog".into();
        post.content = "blog".into();

        assert!(filter_by_title(&[post], "blog").is_empty());
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let posts = vec![titled("b"), titled("a")];
        let mut view = SearchView::default();

        assert_eq!(view.apply(&posts), posts);
    }

    #[test]
    fn whitespace_in_query_is_matched_literally() {
        let posts = vec![titled("Myblog"), titled("Other")];
        assert!(filter_by_title(&posts, " blog").is_empty());
        assert!(filter_by_title(&posts, "blog ").is_empty());

        let posts = vec![titled("My Blog"), titled("Other")];
        let hits = filter_by_title(&posts, " ");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "My Blog");
        assert_eq!(filter_by_title(&posts, " blog").len(), 1);
    }
}

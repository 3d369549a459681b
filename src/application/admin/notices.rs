//! User-visible outcome notices for mutating admin actions.

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

use crate::changefeed::lock::mutex_lock;

pub const POST_CREATED: &str = "Post created";
pub const POST_UPDATED: &str = "Post updated";
pub const POST_PUBLISHED: &str = "Post published";
pub const POST_UNPUBLISHED: &str = "Post unpublished";
pub const POST_DELETED: &str = "Post deleted";
pub const UPLOAD_FAILED: &str = "Failed to upload image";
pub const SAVE_FAILED: &str = "Failed to save post";
pub const STATUS_FAILED: &str = "Failed to update post status";
pub const DELETE_FAILED: &str = "Failed to delete post";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Buffers notices until the surface drains them.
#[derive(Debug, Default)]
pub struct NoticeLog {
    entries: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *mutex_lock(&self.entries, "application::admin::notices", "drain"))
    }

    pub fn last(&self) -> Option<Notice> {
        mutex_lock(&self.entries, "application::admin::notices", "last")
            .last()
            .cloned()
    }
}

impl NoticeSink for NoticeLog {
    fn notify(&self, notice: Notice) {
        info!(kind = ?notice.kind, text = %notice.text, "Notice");
        mutex_lock(&self.entries, "application::admin::notices", "notify").push(notice);
    }
}

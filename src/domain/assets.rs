//! Asset references, storage keys and pending image payloads.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;

const FALLBACK_EXTENSION: &str = "bin";
const MAX_EXTENSION_LEN: usize = 8;

/// Stable public locator of an uploaded asset, as stored on a post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage key of the form `{owner}/{token}.{ext}`.
///
/// Tokens are unique per upload, so re-uploading never overwrites an
/// existing asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn for_upload(owner: Uuid, token: &str, extension: &str) -> Self {
        Self(format!("{owner}/{token}.{}", sanitize_extension(extension)))
    }

    /// Derive a key with a fresh random token.
    pub fn generate(owner: Uuid, extension: &str) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self::for_upload(owner, &token, extension)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An image selected in the draft but not uploaded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImage {
    file_name: String,
    content_type: String,
    data: Bytes,
}

impl PendingImage {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Bytes,
    ) -> Result<Self, DomainError> {
        let file_name = file_name.into();
        let content_type = content_type.into().trim().to_ascii_lowercase();

        if !content_type.starts_with("image/") {
            return Err(DomainError::validation(format!(
                "`{file_name}` is not an image (content type `{content_type}`)"
            )));
        }
        if data.is_empty() {
            return Err(DomainError::validation(format!("`{file_name}` is empty")));
        }

        Ok(Self {
            file_name,
            content_type,
            data,
        })
    }

    /// Build from a file name, guessing the content type from its extension.
    pub fn from_file_name(file_name: impl Into<String>, data: Bytes) -> Result<Self, DomainError> {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_raw()
            .unwrap_or("application/octet-stream");
        Self::new(file_name, content_type, data)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Extension used in the storage key: the file's own, else one implied
    /// by the content type.
    pub fn extension(&self) -> String {
        let from_name = Path::new(&self.file_name)
            .extension()
            .and_then(|value| value.to_str())
            .map(str::to_string);

        from_name
            .or_else(|| {
                mime_guess::get_mime_extensions_str(&self.content_type)
                    .and_then(|extensions| extensions.first())
                    .map(|extension| (*extension).to_string())
            })
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
    }
}

fn sanitize_extension(extension: &str) -> String {
    let cleaned: String = extension
        .trim_matches('.')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_lowercase())
        .collect();

    if cleaned.is_empty() || cleaned.len() > MAX_EXTENSION_LEN {
        FALLBACK_EXTENSION.to_string()
    } else {
        cleaned
    }
}

//! Filesystem-backed asset store.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use url::Url;

use crate::application::assets::{AssetStore, AssetStoreError};
use crate::domain::assets::{AssetKey, AssetRef};

/// Writes assets under `root` and serves them from `public_base`.
#[derive(Debug)]
pub struct FsAssetStore {
    root: PathBuf,
    public_base: Url,
}

impl FsAssetStore {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf, public_base: Url) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_base: with_trailing_slash(public_base),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Attempt to read a stored asset into memory.
    pub async fn read(&self, key: &AssetKey) -> Result<Bytes, AssetStoreError> {
        let absolute = self.resolve(key)?;
        Ok(Bytes::from(fs::read(absolute).await?))
    }

    fn resolve(&self, key: &AssetKey) -> Result<PathBuf, AssetStoreError> {
        let relative = Path::new(key.as_str());
        if key.as_str().is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(AssetStoreError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn upload(
        &self,
        key: &AssetKey,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), AssetStoreError> {
        let absolute = self.resolve(key)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write beside the target and rename so readers never see a partial file.
        let partial = absolute.with_extension("part");
        let written = async {
            let mut file = fs::File::create(&partial).await?;
            file.write_all(&data).await?;
            file.flush().await?;
            fs::rename(&partial, &absolute).await
        }
        .await;

        if let Err(err) = written {
            let _ = fs::remove_file(&partial).await;
            return Err(AssetStoreError::Io(err));
        }

        debug!(key = %key, content_type, size_bytes = data.len(), "Asset written");
        Ok(())
    }

    fn public_url(&self, key: &AssetKey) -> AssetRef {
        match self.public_base.join(key.as_str()) {
            Ok(url) => AssetRef::new(url.to_string()),
            Err(_) => AssetRef::new(format!("{}{}", self.public_base, key)),
        }
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use uuid::Uuid;

    use super::*;

    fn store(root: &Path) -> FsAssetStore {
        let base = Url::parse("https://cdn.example.test/assets").unwrap();
        FsAssetStore::new(root.join("assets"), base).unwrap()
    }

    #[tokio::test]
    async fn upload_writes_under_root_and_resolves_public_url() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let key = AssetKey::for_upload(Uuid::nil(), "1700000000000", "png");

        store
            .upload(&key, "image/png", Bytes::from_static(b"\x89PNG"))
            .await
            .unwrap();

        assert_eq!(store.read(&key).await.unwrap(), Bytes::from_static(b"\x89PNG"));
        assert_eq!(
            store.public_url(&key).as_str(),
            format!("https://cdn.example.test/assets/{key}")
        );
        assert!(!store.root().join(key.as_str()).with_extension("part").exists());
    }

    #[tokio::test]
    async fn rejects_keys_escaping_root() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let key = AssetKey::for_upload(Uuid::nil(), "../../etc", "png");

        let err = store
            .upload(&key, "image/png", Bytes::from_static(b"x"))
            .await
            .expect_err("traversal rejected");
        assert!(matches!(err, AssetStoreError::InvalidKey(_)));
    }
}

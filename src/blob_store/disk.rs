/// Disk-based blob storage
use crate::blob_store::{BlobReader, BlobStore, ByteStream, StorageError};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Filesystem blob store
///
/// Blobs live at `<root>/<user_id>/<stored_name>`. The user directory is
/// created lazily on first write. Writes go through a `.part` file that is
/// renamed into place once the stream is fully consumed, so readers never
/// observe a half-written blob.
#[derive(Clone)]
pub struct DiskBlobStore {
    root: PathBuf,
}

impl DiskBlobStore {
    /// Create a new disk blob store rooted at `root`
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn blob_path(&self, user_id: i64, stored_name: &str) -> PathBuf {
        self.root.join(user_id.to_string()).join(stored_name)
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn write(
        &self,
        user_id: i64,
        stored_name: &str,
        mut body: ByteStream<'_>,
        limit: u64,
    ) -> Result<u64, StorageError> {
        let user_dir = self.root.join(user_id.to_string());
        fs::create_dir_all(&user_dir)
            .await
            .map_err(StorageError::Write)?;

        let final_path = user_dir.join(stored_name);
        let part_path = user_dir.join(format!("{}.part", stored_name));

        let result = async {
            let mut file = fs::File::create(&part_path)
                .await
                .map_err(StorageError::Write)?;

            let mut written: u64 = 0;
            while let Some(chunk) = body.try_next().await.map_err(StorageError::Write)? {
                written += chunk.len() as u64;
                if written > limit {
                    return Err(StorageError::TooLarge { limit });
                }
                file.write_all(&chunk).await.map_err(StorageError::Write)?;
            }

            file.flush().await.map_err(StorageError::Write)?;
            drop(file);

            fs::rename(&part_path, &final_path)
                .await
                .map_err(StorageError::Write)?;

            Ok(written)
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&part_path).await;
        }

        result
    }

    async fn open(&self, user_id: i64, stored_name: &str) -> Result<BlobReader, StorageError> {
        let path = self.blob_path(user_id, stored_name);

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    user_id,
                    stored_name: stored_name.to_string(),
                })
            }
            Err(e) => return Err(StorageError::Read(e)),
        };

        let size = file.metadata().await.map_err(StorageError::Read)?.len();

        Ok(BlobReader { file, size })
    }

    async fn delete(&self, user_id: i64, stored_name: &str) -> Result<(), StorageError> {
        let path = self.blob_path(user_id, stored_name);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Delete(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use tokio::io::AsyncReadExt;

    fn chunks(parts: &[&[u8]]) -> ByteStream<'static> {
        let items: Vec<std::io::Result<Bytes>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p)))
            .collect();
        Box::pin(futures::stream::iter(items))
    }

    #[tokio::test]
    async fn write_and_open_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlobStore::new(dir.path().to_path_buf());

        let written = store
            .write(7, "token.png", chunks(&[b"hello ", b"blob"]), 1024)
            .await
            .unwrap();
        assert_eq!(written, 10);

        let mut reader = store.open(7, "token.png").await.unwrap();
        assert_eq!(reader.size, 10);

        let mut data = Vec::new();
        reader.file.read_to_end(&mut data).await.unwrap();
        assert_eq!(data, b"hello blob");
    }

    #[tokio::test]
    async fn write_creates_user_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlobStore::new(dir.path().to_path_buf());

        store
            .write(42, "a.webp", chunks(&[b"x"]), 1024)
            .await
            .unwrap();

        assert!(dir.path().join("42").join("a.webp").exists());
    }

    #[tokio::test]
    async fn oversized_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlobStore::new(dir.path().to_path_buf());

        let result = store
            .write(7, "big.png", chunks(&[&[0u8; 6], &[0u8; 5]]), 10)
            .await;
        assert!(matches!(result, Err(StorageError::TooLarge { limit: 10 })));

        let mut entries = fs::read_dir(dir.path().join("7")).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_up_to_the_limit_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlobStore::new(dir.path().to_path_buf());

        let written = store
            .write(7, "edge.png", chunks(&[&[0u8; 10]]), 10)
            .await
            .unwrap();
        assert_eq!(written, 10);
    }

    #[tokio::test]
    async fn open_missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlobStore::new(dir.path().to_path_buf());

        let result = store.open(7, "nope.png").await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlobStore::new(dir.path().to_path_buf());

        store
            .write(7, "gone.jpg", chunks(&[b"data"]), 1024)
            .await
            .unwrap();

        store.delete(7, "gone.jpg").await.unwrap();
        assert!(!dir.path().join("7").join("gone.jpg").exists());

        // Second delete of a missing blob still succeeds
        store.delete(7, "gone.jpg").await.unwrap();
    }
}

/// Blob storage for item images
///
/// Stores opaque byte blobs under per-user directories. Paths are built only
/// from the numeric owner id and an internally generated stored name, so no
/// path component ever derives from client input.

pub mod disk;

pub use disk::DiskBlobStore;

use async_trait::async_trait;
use axum::body::Bytes;
use futures::stream::Stream;
use std::pin::Pin;
use thiserror::Error;
use tokio::fs::File;

/// Errors raised by blob storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("blob {user_id}/{stored_name} not found")]
    NotFound { user_id: i64, stored_name: String },

    #[error("upload exceeds the size limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("failed to write blob: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to read blob: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to delete blob: {0}")]
    Delete(#[source] std::io::Error),
}

/// Stream of uploaded file chunks, consumed exactly once
pub type ByteStream<'a> = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + 'a>>;

/// Readable, length-known handle to a stored blob
#[derive(Debug)]
pub struct BlobReader {
    pub file: File,
    pub size: u64,
}

/// Blob storage backend trait
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stream a blob into the user's directory, enforcing `limit` bytes.
    ///
    /// Returns the number of bytes written. On any failure (IO or an
    /// oversized stream) nothing is left behind on disk.
    async fn write(
        &self,
        user_id: i64,
        stored_name: &str,
        body: ByteStream<'_>,
        limit: u64,
    ) -> Result<u64, StorageError>;

    /// Open a stored blob for reading
    async fn open(&self, user_id: i64, stored_name: &str) -> Result<BlobReader, StorageError>;

    /// Delete a stored blob; a missing file is not an error
    async fn delete(&self, user_id: i64, stored_name: &str) -> Result<(), StorageError>;
}

/// Image coordinator
///
/// Orchestrates upload-replace, read, and delete across the blob store, the
/// image metadata rows, and the ownership checks. Metadata changes happen in
/// one transaction; blob writes and deletes are sequenced around it so that
/// no committed row is ever left without a readable blob. Stray blobs from
/// interrupted operations are tolerated garbage and are logged when cleanup
/// fails.
use crate::{
    account::Principal,
    blob_store::{BlobReader, BlobStore, ByteStream, StorageError},
    error::{ApiError, ApiResult, ValidationCode},
    images::{
        metadata::{self, ImageRecord, NewImage},
        ownership::OwnershipOracle,
        types::ImageType,
    },
};
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Upload size limit, inclusive
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// An uploaded file as it arrives from the multipart layer
pub struct ImageUpload<'a> {
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub body: ByteStream<'a>,
}

/// Coordinator for the item image subsystem
pub struct ImageService {
    db: SqlitePool,
    blobs: Arc<dyn BlobStore>,
    oracle: OwnershipOracle,
}

impl ImageService {
    /// Create a new image service
    pub fn new(db: SqlitePool, blobs: Arc<dyn BlobStore>) -> Self {
        let oracle = OwnershipOracle::new(db.clone());
        Self { db, blobs, oracle }
    }

    /// Store or replace the image of an item.
    ///
    /// A missing or empty file is a no-op: the image is optional on the item
    /// form and an empty part means "nothing to change". Otherwise the new
    /// blob is written first, the metadata swap commits in one transaction,
    /// and only then is the replaced blob removed. A metadata failure rolls
    /// the blob write back; a failed cleanup of the replaced blob is logged
    /// and does not fail the call.
    pub async fn upload_or_replace(
        &self,
        item_id: i64,
        upload: Option<ImageUpload<'_>>,
        principal: &Principal,
    ) -> ApiResult<()> {
        let Some(upload) = upload else {
            return Ok(());
        };

        // Peek for the first real chunk; an empty stream is a silent no-op.
        let mut body = upload.body;
        let first = loop {
            match body.try_next().await? {
                Some(chunk) if chunk.is_empty() => continue,
                other => break other,
            }
        };
        let Some(first) = first else {
            return Ok(());
        };
        let body: ByteStream<'_> =
            Box::pin(futures::stream::once(async move { Ok(first) }).chain(body));

        let item = self.oracle.assert_item_owned(item_id, principal).await?;

        let image_type = ImageType::from_mime(upload.content_type.as_deref())
            .ok_or(ApiError::Validation(ValidationCode::ImageTypeNotAllowed))?;

        let old = metadata::find_by_item(&self.db, item_id).await?;

        let stored_name = format!("{}{}", Uuid::new_v4(), image_type.extension());

        // New blob goes to disk before any row changes. The size cap is
        // enforced while the stream drains; an oversized upload aborts the
        // write with nothing left behind.
        let size = match self
            .blobs
            .write(item.owner_id, &stored_name, body, MAX_IMAGE_BYTES)
            .await
        {
            Ok(size) => size,
            Err(StorageError::TooLarge { .. }) => {
                return Err(ApiError::Validation(ValidationCode::ImageTooLarge))
            }
            Err(e) => return Err(e.into()),
        };

        let record = NewImage {
            item_id,
            stored_name: stored_name.clone(),
            content_type: image_type,
            original_name: upload.original_name,
            size: size as i64,
            created_at: Utc::now().date_naive(),
        };

        if let Err(err) = self.swap_records(&record, old.as_ref()).await {
            // The row never landed; remove the blob written above so a
            // failed upload leaves no trace.
            if let Err(cleanup) = self.blobs.delete(item.owner_id, &stored_name).await {
                tracing::warn!(
                    user_id = item.owner_id,
                    stored_name = %stored_name,
                    error = %cleanup,
                    "failed to remove blob after metadata failure; orphan left behind"
                );
            }
            return Err(err);
        }

        // The commit made the replacement durable; the old blob is garbage.
        if let Some(old) = old {
            if let Err(e) = self.blobs.delete(item.owner_id, &old.stored_name).await {
                tracing::warn!(
                    user_id = item.owner_id,
                    stored_name = %old.stored_name,
                    error = %e,
                    "failed to remove replaced blob; orphan left behind"
                );
            }
        }

        Ok(())
    }

    /// Swap the item's image row inside one transaction: the old row (if
    /// any) is deleted before the insert so the unique `item_id` constraint
    /// arbitrates concurrent uploads instead of tripping on a replace.
    async fn swap_records(&self, record: &NewImage, old: Option<&ImageRecord>) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;

        if let Some(old) = old {
            metadata::delete_by_id(&mut *tx, old.id).await?;
        }
        metadata::insert(&mut *tx, record).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Open an image for serving.
    ///
    /// Returns the readable blob handle and the canonical MIME to put in the
    /// Content-Type header. A row whose blob is gone is a broken storage
    /// invariant and surfaces as an internal error, not as a 404.
    pub async fn load(
        &self,
        image_id: i64,
        principal: &Principal,
    ) -> ApiResult<(BlobReader, &'static str)> {
        let (record, owner_id) = self.oracle.assert_image_owned(image_id, principal).await?;

        let reader = match self.blobs.open(owner_id, &record.stored_name).await {
            Ok(reader) => reader,
            Err(StorageError::NotFound { .. }) => {
                return Err(ApiError::BlobMissing { image_id: record.id })
            }
            Err(e) => return Err(e.into()),
        };

        Ok((reader, record.content_type.mime()))
    }

    /// Remove the image of an item, if it has one.
    ///
    /// The row is removed first and committed; the blob follows. Once the
    /// commit is through the user's intent is durable, so a failing blob
    /// delete is logged and the call still succeeds.
    pub async fn delete_for_item(&self, item_id: i64, principal: &Principal) -> ApiResult<()> {
        let item = self.oracle.assert_item_owned(item_id, principal).await?;

        let Some(record) = metadata::find_by_item(&self.db, item_id).await? else {
            return Ok(());
        };

        let mut tx = self.db.begin().await?;
        metadata::delete_by_id(&mut *tx, record.id).await?;
        tx.commit().await?;

        if let Err(e) = self.blobs.delete(item.owner_id, &record.stored_name).await {
            tracing::warn!(
                user_id = item.owner_id,
                stored_name = %record.stored_name,
                error = %e,
                "failed to remove deleted image blob; orphan left behind"
            );
        }

        Ok(())
    }

    /// Remove blobs whose rows were already cascaded away (item or list
    /// removal). Best-effort: failures are logged as orphans.
    pub async fn remove_blobs(&self, owner_id: i64, stored_names: &[String]) {
        for stored_name in stored_names {
            if let Err(e) = self.blobs.delete(owner_id, stored_name).await {
                tracing::warn!(
                    user_id = owner_id,
                    stored_name = %stored_name,
                    error = %e,
                    "failed to remove cascaded image blob; orphan left behind"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::DiskBlobStore;
    use axum::body::Bytes;
    use sqlx::Row;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    struct Fixture {
        service: ImageService,
        pool: SqlitePool,
        dir: TempDir,
    }

    async fn setup() -> Fixture {
        let pool = crate::db::test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let blobs: Arc<dyn BlobStore> = Arc::new(DiskBlobStore::new(dir.path().to_path_buf()));

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, created_at)
             VALUES (7, 'owner@example.com', 'x', '2026-01-01'),
                    (8, 'other@example.com', 'x', '2026-01-01')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO lists (id, name, owner_id) VALUES (1, 'groceries', 7)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO items (id, list_id, name, count, purchased) VALUES (42, 1, 'milk', 1, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        Fixture {
            service: ImageService::new(pool.clone(), blobs),
            pool,
            dir,
        }
    }

    fn principal(user_id: i64) -> Principal {
        Principal {
            user_id,
            email: format!("u{}@example.com", user_id),
        }
    }

    fn upload(name: &str, mime: Option<&str>, data: Vec<u8>) -> Option<ImageUpload<'static>> {
        Some(ImageUpload {
            original_name: Some(name.to_string()),
            content_type: mime.map(String::from),
            body: Box::pin(futures::stream::iter(vec![Ok(Bytes::from(data))])),
        })
    }

    async fn image_row(pool: &SqlitePool, item_id: i64) -> Option<ImageRecord> {
        metadata::find_by_item(pool, item_id).await.unwrap()
    }

    fn user_dir_files(dir: &TempDir, user_id: i64) -> Vec<String> {
        let path = dir.path().join(user_id.to_string());
        if !path.exists() {
            return Vec::new();
        }
        std::fs::read_dir(path)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn fresh_upload_persists_row_and_blob() {
        let fx = setup().await;

        fx.service
            .upload_or_replace(
                42,
                upload("a.png", Some("image/png"), vec![0xAB; 1024]),
                &principal(7),
            )
            .await
            .unwrap();

        let record = image_row(&fx.pool, 42).await.unwrap();
        assert!(record.stored_name.ends_with(".png"));
        assert_eq!(record.content_type, ImageType::Png);
        assert_eq!(record.original_name.as_deref(), Some("a.png"));
        assert_eq!(record.size, 1024);

        let blob = fx.dir.path().join("7").join(&record.stored_name);
        assert_eq!(std::fs::read(blob).unwrap(), vec![0xAB; 1024]);
    }

    #[tokio::test]
    async fn replace_swaps_row_and_removes_old_blob() {
        let fx = setup().await;
        let owner = principal(7);

        fx.service
            .upload_or_replace(42, upload("a.png", Some("image/png"), b"AAAA".to_vec()), &owner)
            .await
            .unwrap();
        let old = image_row(&fx.pool, 42).await.unwrap();

        fx.service
            .upload_or_replace(
                42,
                upload("b.webp", Some("image/webp"), b"BBB".to_vec()),
                &owner,
            )
            .await
            .unwrap();

        let new = image_row(&fx.pool, 42).await.unwrap();
        assert_ne!(new.id, old.id);
        assert!(new.stored_name.ends_with(".webp"));

        // exactly one blob left, the new one
        assert_eq!(user_dir_files(&fx.dir, 7), vec![new.stored_name.clone()]);

        let (mut reader, mime) = fx.service.load(new.id, &owner).await.unwrap();
        assert_eq!(mime, "image/webp");
        assert_eq!(reader.size, 3);
        let mut data = Vec::new();
        reader.file.read_to_end(&mut data).await.unwrap();
        assert_eq!(data, b"BBB");
    }

    #[tokio::test]
    async fn non_owner_upload_is_forbidden_and_writes_nothing() {
        let fx = setup().await;

        let err = fx
            .service
            .upload_or_replace(
                42,
                upload("a.png", Some("image/png"), b"AAAA".to_vec()),
                &principal(8),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(image_row(&fx.pool, 42).await.is_none());
        assert!(user_dir_files(&fx.dir, 7).is_empty());
        assert!(user_dir_files(&fx.dir, 8).is_empty());
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let fx = setup().await;

        let err = fx
            .service
            .upload_or_replace(
                999,
                upload("a.png", Some("image/png"), b"AAAA".to_vec()),
                &principal(7),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::ItemNotFound));
    }

    #[tokio::test]
    async fn disallowed_type_is_rejected_before_any_write() {
        let fx = setup().await;

        let err = fx
            .service
            .upload_or_replace(
                42,
                upload("a.gif", Some("image/gif"), b"AAAA".to_vec()),
                &principal(7),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::Validation(ValidationCode::ImageTypeNotAllowed)
        ));
        assert!(image_row(&fx.pool, 42).await.is_none());
        assert!(user_dir_files(&fx.dir, 7).is_empty());
    }

    #[tokio::test]
    async fn missing_mime_is_rejected() {
        let fx = setup().await;

        let err = fx
            .service
            .upload_or_replace(42, upload("a", None, b"AAAA".to_vec()), &principal(7))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::Validation(ValidationCode::ImageTypeNotAllowed)
        ));
    }

    #[tokio::test]
    async fn uppercase_mime_is_accepted() {
        let fx = setup().await;

        fx.service
            .upload_or_replace(
                42,
                upload("a.png", Some("IMAGE/PNG"), b"AAAA".to_vec()),
                &principal(7),
            )
            .await
            .unwrap();

        let record = image_row(&fx.pool, 42).await.unwrap();
        assert_eq!(record.content_type, ImageType::Png);
    }

    #[tokio::test]
    async fn size_limit_boundary() {
        let fx = setup().await;
        let owner = principal(7);

        // exactly at the limit: accepted
        fx.service
            .upload_or_replace(
                42,
                upload(
                    "max.png",
                    Some("image/png"),
                    vec![0u8; MAX_IMAGE_BYTES as usize],
                ),
                &owner,
            )
            .await
            .unwrap();
        let record = image_row(&fx.pool, 42).await.unwrap();
        assert_eq!(record.size as u64, MAX_IMAGE_BYTES);

        // one byte over: rejected, previous state untouched
        let err = fx
            .service
            .upload_or_replace(
                42,
                upload(
                    "over.png",
                    Some("image/png"),
                    vec![0u8; MAX_IMAGE_BYTES as usize + 1],
                ),
                &owner,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationCode::ImageTooLarge)
        ));

        let unchanged = image_row(&fx.pool, 42).await.unwrap();
        assert_eq!(unchanged.id, record.id);
        assert_eq!(user_dir_files(&fx.dir, 7), vec![record.stored_name]);
    }

    #[tokio::test]
    async fn empty_upload_is_a_silent_noop() {
        let fx = setup().await;
        let owner = principal(7);

        fx.service
            .upload_or_replace(42, None, &owner)
            .await
            .unwrap();

        // an empty file part is a no-op too, even with a bogus declared type
        fx.service
            .upload_or_replace(42, upload("x.gif", Some("image/gif"), Vec::new()), &owner)
            .await
            .unwrap();

        assert!(image_row(&fx.pool, 42).await.is_none());
        assert!(user_dir_files(&fx.dir, 7).is_empty());
    }

    #[tokio::test]
    async fn metadata_failure_cleans_up_the_new_blob() {
        let fx = setup().await;

        sqlx::query(
            "CREATE TRIGGER images_insert_blocked BEFORE INSERT ON images
             BEGIN SELECT RAISE(ABORT, 'insert blocked'); END",
        )
        .execute(&fx.pool)
        .await
        .unwrap();

        let err = fx
            .service
            .upload_or_replace(
                42,
                upload("a.png", Some("image/png"), b"AAAA".to_vec()),
                &principal(7),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Database(_)));
        assert!(image_row(&fx.pool, 42).await.is_none());
        assert!(user_dir_files(&fx.dir, 7).is_empty());
    }

    #[tokio::test]
    async fn metadata_failure_during_replace_keeps_the_old_image() {
        let fx = setup().await;
        let owner = principal(7);

        fx.service
            .upload_or_replace(42, upload("a.png", Some("image/png"), b"AAAA".to_vec()), &owner)
            .await
            .unwrap();
        let old = image_row(&fx.pool, 42).await.unwrap();

        sqlx::query(
            "CREATE TRIGGER images_insert_blocked BEFORE INSERT ON images
             BEGIN SELECT RAISE(ABORT, 'insert blocked'); END",
        )
        .execute(&fx.pool)
        .await
        .unwrap();

        let err = fx
            .service
            .upload_or_replace(42, upload("b.png", Some("image/png"), b"BBBB".to_vec()), &owner)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Database(_)));

        // rollback kept the old row; cleanup removed the new blob
        let kept = image_row(&fx.pool, 42).await.unwrap();
        assert_eq!(kept.id, old.id);
        assert_eq!(user_dir_files(&fx.dir, 7), vec![old.stored_name]);
    }

    #[tokio::test]
    async fn delete_removes_row_and_blob_and_is_idempotent() {
        let fx = setup().await;
        let owner = principal(7);

        fx.service
            .upload_or_replace(42, upload("a.png", Some("image/png"), b"AAAA".to_vec()), &owner)
            .await
            .unwrap();
        let record = image_row(&fx.pool, 42).await.unwrap();

        fx.service.delete_for_item(42, &owner).await.unwrap();

        assert!(image_row(&fx.pool, 42).await.is_none());
        assert!(user_dir_files(&fx.dir, 7).is_empty());

        let err = fx.service.load(record.id, &owner).await.unwrap_err();
        assert!(matches!(err, ApiError::ImageNotFound));

        // deleting again is still a success
        fx.service.delete_for_item(42, &owner).await.unwrap();
    }

    #[tokio::test]
    async fn delete_by_non_owner_is_forbidden() {
        let fx = setup().await;

        fx.service
            .upload_or_replace(
                42,
                upload("a.png", Some("image/png"), b"AAAA".to_vec()),
                &principal(7),
            )
            .await
            .unwrap();

        let err = fx
            .service
            .delete_for_item(42, &principal(8))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(image_row(&fx.pool, 42).await.is_some());
    }

    #[tokio::test]
    async fn load_by_non_owner_is_forbidden() {
        let fx = setup().await;

        fx.service
            .upload_or_replace(
                42,
                upload("a.png", Some("image/png"), b"AAAA".to_vec()),
                &principal(7),
            )
            .await
            .unwrap();
        let record = image_row(&fx.pool, 42).await.unwrap();

        let err = fx.service.load(record.id, &principal(8)).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn missing_blob_under_a_live_row_is_an_internal_error() {
        let fx = setup().await;
        let owner = principal(7);

        fx.service
            .upload_or_replace(42, upload("a.png", Some("image/png"), b"AAAA".to_vec()), &owner)
            .await
            .unwrap();
        let record = image_row(&fx.pool, 42).await.unwrap();

        std::fs::remove_file(fx.dir.path().join("7").join(&record.stored_name)).unwrap();

        let err = fx.service.load(record.id, &owner).await.unwrap_err();
        assert!(matches!(err, ApiError::BlobMissing { .. }));
    }

    #[tokio::test]
    async fn item_removal_cascades_the_image_row() {
        let fx = setup().await;
        let owner = principal(7);

        fx.service
            .upload_or_replace(42, upload("a.png", Some("image/png"), b"AAAA".to_vec()), &owner)
            .await
            .unwrap();
        let record = image_row(&fx.pool, 42).await.unwrap();

        sqlx::query("DELETE FROM items WHERE id = 42")
            .execute(&fx.pool)
            .await
            .unwrap();

        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM images WHERE id = ?1")
            .bind(record.id)
            .fetch_one(&fx.pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(count, 0);
    }
}

/// Image metadata rows
///
/// One row per stored image, keyed one-to-one to an item by the unique
/// `item_id` column. All functions take a sqlx executor so they can run
/// inside the coordinator's transaction.
use crate::{
    error::{ApiError, ApiResult},
    images::types::ImageType,
};
use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, Row, SqliteExecutor};

/// A persisted image record
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: i64,
    pub item_id: i64,
    pub stored_name: String,
    pub content_type: ImageType,
    pub original_name: Option<String>,
    pub size: i64,
    pub created_at: NaiveDate,
}

/// Field set for a record about to be inserted
#[derive(Debug, Clone)]
pub struct NewImage {
    pub item_id: i64,
    pub stored_name: String,
    pub content_type: ImageType,
    pub original_name: Option<String>,
    pub size: i64,
    pub created_at: NaiveDate,
}

fn record_from_row(row: &SqliteRow) -> ApiResult<ImageRecord> {
    let type_name: String = row.try_get("content_type")?;
    let content_type = ImageType::from_canonical_name(&type_name).ok_or_else(|| {
        ApiError::Internal(format!("unknown image content type in database: {}", type_name))
    })?;

    Ok(ImageRecord {
        id: row.try_get("id")?,
        item_id: row.try_get("item_id")?,
        stored_name: row.try_get("stored_name")?,
        content_type,
        original_name: row.try_get("original_name")?,
        size: row.try_get("size")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Insert a new image record and return it with its assigned id.
///
/// A second concurrent insert for the same item trips the `item_id`
/// uniqueness and is reported as a conflict.
pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, new: &NewImage) -> ApiResult<ImageRecord> {
    let row = sqlx::query(
        r#"
        INSERT INTO images (item_id, stored_name, content_type, original_name, size, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        RETURNING id, item_id, stored_name, content_type, original_name, size, created_at
        "#,
    )
    .bind(new.item_id)
    .bind(&new.stored_name)
    .bind(new.content_type.canonical_name())
    .bind(&new.original_name)
    .bind(new.size)
    .bind(new.created_at)
    .fetch_one(exec)
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            ApiError::ImageConflict
        } else {
            ApiError::Database(e)
        }
    })?;

    record_from_row(&row)
}

/// Find an image record by its id
pub async fn find_by_id<'e, E: SqliteExecutor<'e>>(
    exec: E,
    image_id: i64,
) -> ApiResult<Option<ImageRecord>> {
    let row = sqlx::query(
        "SELECT id, item_id, stored_name, content_type, original_name, size, created_at
         FROM images WHERE id = ?1",
    )
    .bind(image_id)
    .fetch_optional(exec)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Find the image record linked to an item, if any
pub async fn find_by_item<'e, E: SqliteExecutor<'e>>(
    exec: E,
    item_id: i64,
) -> ApiResult<Option<ImageRecord>> {
    let row = sqlx::query(
        "SELECT id, item_id, stored_name, content_type, original_name, size, created_at
         FROM images WHERE item_id = ?1",
    )
    .bind(item_id)
    .fetch_optional(exec)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Delete an image record by its id
pub async fn delete_by_id<'e, E: SqliteExecutor<'e>>(exec: E, image_id: i64) -> ApiResult<()> {
    sqlx::query("DELETE FROM images WHERE id = ?1")
        .bind(image_id)
        .execute(exec)
        .await?;

    Ok(())
}

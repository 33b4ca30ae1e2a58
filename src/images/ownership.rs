/// Ownership checks for the image subsystem
///
/// The single authorization choke-point: every image read, upload, and
/// delete resolves the item's list owner here and compares it against the
/// principal. Only the list owner may touch item images; users the list is
/// shared with can see items but not modify their images.
use crate::{
    account::Principal,
    error::{ApiError, ApiResult},
    images::metadata::{self, ImageRecord},
};
use sqlx::{Row, SqlitePool};

/// An item together with its resolved list owner
#[derive(Debug, Clone, Copy)]
pub struct OwnedItem {
    pub id: i64,
    pub list_id: i64,
    pub owner_id: i64,
}

/// Authorization oracle over the items/lists/images tables
#[derive(Clone)]
pub struct OwnershipOracle {
    db: SqlitePool,
}

impl OwnershipOracle {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Load an item and require that the principal owns its list
    pub async fn assert_item_owned(
        &self,
        item_id: i64,
        principal: &Principal,
    ) -> ApiResult<OwnedItem> {
        let row = sqlx::query(
            "SELECT items.id, items.list_id, lists.owner_id
             FROM items JOIN lists ON lists.id = items.list_id
             WHERE items.id = ?1",
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(ApiError::ItemNotFound)?;

        let item = OwnedItem {
            id: row.get("id"),
            list_id: row.get("list_id"),
            owner_id: row.get("owner_id"),
        };

        if item.owner_id != principal.user_id {
            return Err(ApiError::Forbidden(
                "item belongs to another user's list".to_string(),
            ));
        }

        Ok(item)
    }

    /// Load an image and require that the principal owns the list of the
    /// item it is linked to. Returns the record and the owner id (the blob
    /// directory prefix).
    pub async fn assert_image_owned(
        &self,
        image_id: i64,
        principal: &Principal,
    ) -> ApiResult<(ImageRecord, i64)> {
        let record = metadata::find_by_id(&self.db, image_id)
            .await?
            .ok_or(ApiError::ImageNotFound)?;

        let row = sqlx::query(
            "SELECT lists.owner_id
             FROM items JOIN lists ON lists.id = items.list_id
             WHERE items.id = ?1",
        )
        .bind(record.item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(ApiError::ImageNotFound)?;

        let owner_id: i64 = row.get("owner_id");

        if owner_id != principal.user_id {
            return Err(ApiError::Forbidden(
                "image belongs to another user's list".to_string(),
            ));
        }

        Ok((record, owner_id))
    }
}

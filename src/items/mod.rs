/// Items inside shopping lists
use crate::{
    account::Principal,
    error::{ApiError, ApiResult, ValidationCode},
    lists::ListManager,
};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// An item row
#[derive(Debug, Clone)]
pub struct Item {
    pub id: i64,
    pub list_id: i64,
    pub name: String,
    pub count: f64,
    pub purchased: bool,
}

/// An item together with the id of its image, if it has one
#[derive(Debug, Clone)]
pub struct ItemWithImage {
    pub item: Item,
    pub image_id: Option<i64>,
}

/// Field set for creating or updating an item
#[derive(Debug, Clone)]
pub struct ItemInput {
    pub name: String,
    pub count: f64,
    pub purchased: bool,
}

/// Item manager service
pub struct ItemManager {
    db: SqlitePool,
    lists: Arc<ListManager>,
}

impl ItemManager {
    /// Create a new item manager
    pub fn new(db: SqlitePool, lists: Arc<ListManager>) -> Self {
        Self { db, lists }
    }

    fn validate(input: &ItemInput) -> ApiResult<()> {
        if input.name.trim().is_empty() {
            return Err(ApiError::Validation(ValidationCode::ItemNameEmpty));
        }
        if input.count <= 0.0 {
            return Err(ApiError::Validation(ValidationCode::ItemCountEmpty));
        }
        Ok(())
    }

    /// Add an item to a list the principal can access
    pub async fn add(
        &self,
        list_id: i64,
        principal: &Principal,
        input: ItemInput,
    ) -> ApiResult<ItemWithImage> {
        self.lists.require_access(list_id, principal).await?;
        Self::validate(&input)?;

        let row = sqlx::query(
            "INSERT INTO items (list_id, name, count, purchased) VALUES (?1, ?2, ?3, ?4)
             RETURNING id",
        )
        .bind(list_id)
        .bind(&input.name)
        .bind(input.count)
        .bind(input.purchased)
        .fetch_one(&self.db)
        .await?;

        Ok(ItemWithImage {
            item: Item {
                id: row.get("id"),
                list_id,
                name: input.name,
                count: input.count,
                purchased: input.purchased,
            },
            image_id: None,
        })
    }

    /// All items of a list the principal can access
    pub async fn list_for(
        &self,
        list_id: i64,
        principal: &Principal,
    ) -> ApiResult<Vec<ItemWithImage>> {
        self.lists.require_access(list_id, principal).await?;

        let rows = sqlx::query(
            "SELECT items.id, items.list_id, items.name, items.count, items.purchased,
                    images.id AS image_id
             FROM items LEFT JOIN images ON images.item_id = items.id
             WHERE items.list_id = ?1
             ORDER BY items.id",
        )
        .bind(list_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(item_from_row).collect())
    }

    /// Load a single item the principal can access
    pub async fn get(&self, item_id: i64, principal: &Principal) -> ApiResult<ItemWithImage> {
        let row = sqlx::query(
            "SELECT items.id, items.list_id, items.name, items.count, items.purchased,
                    images.id AS image_id
             FROM items LEFT JOIN images ON images.item_id = items.id
             WHERE items.id = ?1",
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(ApiError::ItemNotFound)?;

        let item = item_from_row(&row);
        self.lists.require_access(item.item.list_id, principal).await?;

        Ok(item)
    }

    /// Update an item's fields
    pub async fn update(
        &self,
        item_id: i64,
        principal: &Principal,
        input: ItemInput,
    ) -> ApiResult<ItemWithImage> {
        let existing = self.get(item_id, principal).await?;
        Self::validate(&input)?;

        sqlx::query("UPDATE items SET name = ?1, count = ?2, purchased = ?3 WHERE id = ?4")
            .bind(&input.name)
            .bind(input.count)
            .bind(input.purchased)
            .bind(item_id)
            .execute(&self.db)
            .await?;

        Ok(ItemWithImage {
            item: Item {
                id: item_id,
                list_id: existing.item.list_id,
                name: input.name,
                count: input.count,
                purchased: input.purchased,
            },
            image_id: existing.image_id,
        })
    }

    /// Delete an item (owner only, since this destroys its image slot).
    ///
    /// The image row cascades with the item; callers that need the blob
    /// removed run the image delete first.
    pub async fn remove(&self, item_id: i64, principal: &Principal) -> ApiResult<()> {
        let row = sqlx::query(
            "SELECT lists.owner_id FROM items JOIN lists ON lists.id = items.list_id
             WHERE items.id = ?1",
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(ApiError::ItemNotFound)?;

        let owner_id: i64 = row.get("owner_id");
        if owner_id != principal.user_id {
            return Err(ApiError::Forbidden(
                "item belongs to another user's list".to_string(),
            ));
        }

        sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(item_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}

fn item_from_row(row: &sqlx::sqlite::SqliteRow) -> ItemWithImage {
    ItemWithImage {
        item: Item {
            id: row.get("id"),
            list_id: row.get("list_id"),
            name: row.get("name"),
            count: row.get("count"),
            purchased: row.get("purchased"),
        },
        image_id: row.get("image_id"),
    }
}

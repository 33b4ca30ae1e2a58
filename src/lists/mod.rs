/// Shopping list management: CRUD, sharing, and guest-draft import
use crate::{
    account::Principal,
    error::{ApiError, ApiResult, ValidationCode},
};
use sqlx::{Row, SqlitePool};

/// A shopping list row
#[derive(Debug, Clone)]
pub struct List {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
}

/// A list as shown in the overview, with its item count
#[derive(Debug, Clone)]
pub struct ListSummary {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub items_count: i64,
}

/// A guest-mode list about to be imported
#[derive(Debug, Clone)]
pub struct ListDraft {
    pub name: String,
    pub items: Vec<ItemDraft>,
}

/// A guest-mode item about to be imported
#[derive(Debug, Clone)]
pub struct ItemDraft {
    pub name: String,
    pub count: f64,
    pub purchased: bool,
}

/// Blob cleanup work left over after a list removal cascaded its image rows
#[derive(Debug)]
pub struct CascadedBlobs {
    pub owner_id: i64,
    pub stored_names: Vec<String>,
}

/// List manager service
pub struct ListManager {
    db: SqlitePool,
}

impl ListManager {
    /// Create a new list manager
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a list owned by the principal
    pub async fn create(&self, principal: &Principal, name: &str) -> ApiResult<List> {
        if name.trim().is_empty() {
            return Err(ApiError::Validation(ValidationCode::ListNameEmpty));
        }

        let row = sqlx::query("INSERT INTO lists (name, owner_id) VALUES (?1, ?2) RETURNING id")
            .bind(name)
            .bind(principal.user_id)
            .fetch_one(&self.db)
            .await?;

        Ok(List {
            id: row.get("id"),
            name: name.to_string(),
            owner_id: principal.user_id,
        })
    }

    /// Load a list or fail with not-found
    pub async fn require(&self, list_id: i64) -> ApiResult<List> {
        let row = sqlx::query("SELECT id, name, owner_id FROM lists WHERE id = ?1")
            .bind(list_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(ApiError::ListNotFound)?;

        Ok(List {
            id: row.get("id"),
            name: row.get("name"),
            owner_id: row.get("owner_id"),
        })
    }

    /// Load a list and require the principal to be its owner
    pub async fn require_owned(&self, list_id: i64, principal: &Principal) -> ApiResult<List> {
        let list = self.require(list_id).await?;

        if list.owner_id != principal.user_id {
            return Err(ApiError::Forbidden(
                "list is owned by another user".to_string(),
            ));
        }

        Ok(list)
    }

    /// Load a list the principal can at least read: owned or shared with them
    pub async fn require_access(&self, list_id: i64, principal: &Principal) -> ApiResult<List> {
        let list = self.require(list_id).await?;

        if list.owner_id == principal.user_id {
            return Ok(list);
        }

        let shared = sqlx::query(
            "SELECT 1 AS present FROM shared_lists WHERE list_id = ?1 AND user_id = ?2",
        )
        .bind(list_id)
        .bind(principal.user_id)
        .fetch_optional(&self.db)
        .await?
        .is_some();

        if !shared {
            return Err(ApiError::Forbidden(
                "list is not shared with this user".to_string(),
            ));
        }

        Ok(list)
    }

    /// All lists the principal owns or has been shared, with item counts
    pub async fn list_accessible(&self, principal: &Principal) -> ApiResult<Vec<ListSummary>> {
        let rows = sqlx::query(
            "SELECT lists.id, lists.name, lists.owner_id, COUNT(items.id) AS items_count
             FROM lists LEFT JOIN items ON items.list_id = lists.id
             WHERE lists.owner_id = ?1
                OR lists.id IN (SELECT list_id FROM shared_lists WHERE user_id = ?1)
             GROUP BY lists.id, lists.name, lists.owner_id
             ORDER BY lists.id",
        )
        .bind(principal.user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ListSummary {
                id: row.get("id"),
                name: row.get("name"),
                owner_id: row.get("owner_id"),
                items_count: row.get("items_count"),
            })
            .collect())
    }

    /// Rename a list (owner only)
    pub async fn rename(
        &self,
        list_id: i64,
        principal: &Principal,
        name: &str,
    ) -> ApiResult<List> {
        let mut list = self.require_owned(list_id, principal).await?;

        if name.trim().is_empty() {
            return Err(ApiError::Validation(ValidationCode::ListNameEmpty));
        }

        sqlx::query("UPDATE lists SET name = ?1 WHERE id = ?2")
            .bind(name)
            .bind(list_id)
            .execute(&self.db)
            .await?;

        list.name = name.to_string();

        Ok(list)
    }

    /// Remove a list (owner only). Items, shared entries, and image rows go
    /// with it via cascade; the caller is handed the stored blob names so
    /// the image service can sweep them after the commit.
    pub async fn remove(&self, list_id: i64, principal: &Principal) -> ApiResult<CascadedBlobs> {
        let list = self.require_owned(list_id, principal).await?;

        let stored_names: Vec<String> = sqlx::query(
            "SELECT images.stored_name
             FROM images JOIN items ON items.id = images.item_id
             WHERE items.list_id = ?1",
        )
        .bind(list_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|row| row.get("stored_name"))
        .collect();

        sqlx::query("DELETE FROM lists WHERE id = ?1")
            .bind(list_id)
            .execute(&self.db)
            .await?;

        Ok(CascadedBlobs {
            owner_id: list.owner_id,
            stored_names,
        })
    }

    /// Share a list with another registered user by email (owner only)
    pub async fn share(&self, list_id: i64, principal: &Principal, email: &str) -> ApiResult<()> {
        self.require_owned(list_id, principal).await?;

        let target = sqlx::query("SELECT id FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?
            .ok_or(ApiError::EmailNotFound)?;

        let target_id: i64 = target.get("id");

        // The owner already has access; treat self-sharing as a duplicate.
        if target_id == principal.user_id {
            return Err(ApiError::AlreadyShared);
        }

        sqlx::query("INSERT INTO shared_lists (list_id, user_id) VALUES (?1, ?2)")
            .bind(list_id)
            .bind(target_id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                if crate::db::is_unique_violation(&e) {
                    ApiError::AlreadyShared
                } else {
                    ApiError::Database(e)
                }
            })?;

        Ok(())
    }

    /// Import guest drafts as fresh lists owned by the principal.
    ///
    /// Runs in one transaction so a half-imported browser state never
    /// becomes visible.
    pub async fn import(&self, principal: &Principal, drafts: Vec<ListDraft>) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;

        for draft in drafts {
            let row = sqlx::query("INSERT INTO lists (name, owner_id) VALUES (?1, ?2) RETURNING id")
                .bind(&draft.name)
                .bind(principal.user_id)
                .fetch_one(&mut *tx)
                .await?;
            let list_id: i64 = row.get("id");

            for item in draft.items {
                sqlx::query(
                    "INSERT INTO items (list_id, name, count, purchased) VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(list_id)
                .bind(&item.name)
                .bind(item.count)
                .bind(item.purchased)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Ok(())
    }
}

//! Wishlist repository for database operations.
//!
//! Entries are created and destroyed, never updated in place. The store's
//! unique index on `(user_id, item_id)` is the only guard against duplicate
//! favorites; inserts that lose that race surface as
//! [`RepositoryError::Conflict`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tackroom_core::{ListingId, PrincipalId, WishlistEntryId};

use super::RepositoryError;
use crate::models::WishlistItem;

/// Raw `wishlists` row.
#[derive(Debug, sqlx::FromRow)]
struct WishlistRow {
    id: Uuid,
    user_id: Uuid,
    item_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<WishlistRow> for WishlistItem {
    fn from(row: WishlistRow) -> Self {
        Self {
            id: WishlistEntryId::new(row.id),
            principal_id: PrincipalId::new(row.user_id),
            listing_id: ListingId::new(row.item_id),
            created_at: row.created_at,
            listing: None,
        }
    }
}

const SELECT_COLUMNS: &str = "id, user_id, item_id, created_at";

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All wishlist entries for a principal, without listing enrichment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn entries_for(
        &self,
        principal: PrincipalId,
    ) -> Result<Vec<WishlistItem>, RepositoryError> {
        let rows: Vec<WishlistRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM wishlists WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(principal.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(WishlistItem::from).collect())
    }

    /// Insert a favorite for `(principal, listing)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when the pair already exists (the
    /// double-favorite race); `RepositoryError::Database` for other failures.
    pub async fn insert(
        &self,
        principal: PrincipalId,
        listing: ListingId,
    ) -> Result<WishlistItem, RepositoryError> {
        let row: WishlistRow = sqlx::query_as(&format!(
            "INSERT INTO wishlists (id, user_id, item_id) VALUES ($1, $2, $3) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(tackroom_core::new_uuid())
        .bind(principal.as_uuid())
        .bind(listing.as_uuid())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "listing already in wishlist"))?;

        Ok(row.into())
    }

    /// Delete the favorite keyed by `(principal, listing)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no entry existed;
    /// `RepositoryError::Database` for other failures.
    pub async fn delete(
        &self,
        principal: PrincipalId,
        listing: ListingId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM wishlists WHERE user_id = $1 AND item_id = $2")
            .bind(principal.as_uuid())
            .bind(listing.as_uuid())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

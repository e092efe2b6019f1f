//! Listing repository for database operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use tackroom_core::{ListingId, Price, PrincipalId};

use super::RepositoryError;
use crate::models::{Listing, NewListing};

/// Raw `listings` row, validated into [`Listing`] at the boundary.
#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    id: Uuid,
    title: String,
    price: Decimal,
    category: String,
    subcategory: Option<String>,
    condition: Option<String>,
    description: String,
    image_url: Option<String>,
    location: Option<String>,
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl ListingRow {
    fn into_domain(self) -> Result<Listing, RepositoryError> {
        let price = Price::new(self.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;
        let condition = self
            .condition
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid condition in database: {e}"))
            })?;

        Ok(Listing {
            id: ListingId::new(self.id),
            title: self.title,
            price,
            category: self.category,
            subcategory: self.subcategory,
            condition,
            description: self.description,
            image_ref: self.image_url,
            location: self.location,
            owner_id: PrincipalId::new(self.user_id),
            created_at: self.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, title, price, category, subcategory, condition, description, \
                              image_url, location, user_id, created_at";

/// Optional filters for browsing listings.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    /// Restrict to one category.
    pub category: Option<String>,
    /// Case-insensitive substring match against the title.
    pub search: Option<String>,
}

/// Repository for listing database operations.
pub struct ListingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ListingRepository<'a> {
    /// Create a new listing repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a listing by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if the row fails validation.
    pub async fn get(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        let row: Option<ListingRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM listings WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(ListingRow::into_domain).transpose()
    }

    /// Browse listings, newest first, with optional category/search filters.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ListingFilter) -> Result<Vec<Listing>, RepositoryError> {
        let mut builder: QueryBuilder<'_, sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {SELECT_COLUMNS} FROM listings WHERE true"));

        if let Some(category) = &filter.category {
            builder.push(" AND category = ");
            builder.push_bind(category.clone());
        }
        if let Some(search) = &filter.search {
            builder.push(" AND title ILIKE ");
            builder.push_bind(format!("%{search}%"));
        }
        builder.push(" ORDER BY created_at DESC");

        let rows: Vec<ListingRow> = builder.build_query_as().fetch_all(self.pool).await?;
        rows.into_iter().map(ListingRow::into_domain).collect()
    }

    /// Fetch listings by id set in a single query.
    ///
    /// Ids with no surviving listing are simply absent from the result; callers
    /// that care (the wishlist layer) treat those as dangling references.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_ids(&self, ids: &[ListingId]) -> Result<Vec<Listing>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw: Vec<Uuid> = ids.iter().map(ListingId::as_uuid).collect();
        let rows: Vec<ListingRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM listings WHERE id = ANY($1)"
        ))
        .bind(raw)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ListingRow::into_domain).collect()
    }

    /// All listings owned by a principal, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_owner(&self, owner: PrincipalId) -> Result<Vec<Listing>, RepositoryError> {
        let rows: Vec<ListingRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM listings WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner.as_uuid())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ListingRow::into_domain).collect()
    }

    /// Insert a new listing owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        &self,
        owner: PrincipalId,
        new: &NewListing,
    ) -> Result<Listing, RepositoryError> {
        let row: ListingRow = sqlx::query_as(&format!(
            "INSERT INTO listings \
             (id, title, price, category, subcategory, condition, description, image_url, location, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(tackroom_core::new_uuid())
        .bind(&new.title)
        .bind(new.price.amount())
        .bind(&new.category)
        .bind(&new.subcategory)
        .bind(new.condition.map(|c| c.to_string()))
        .bind(&new.description)
        .bind(&new.image_ref)
        .bind(&new.location)
        .bind(owner.as_uuid())
        .fetch_one(self.pool)
        .await?;

        row.into_domain()
    }

    /// Update a listing, scoped to its owner. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the listing does not exist or is
    /// not owned by `owner`; `RepositoryError::Database` for other failures.
    pub async fn update(
        &self,
        id: ListingId,
        owner: PrincipalId,
        new: &NewListing,
    ) -> Result<Listing, RepositoryError> {
        let row: Option<ListingRow> = sqlx::query_as(&format!(
            "UPDATE listings SET \
             title = $3, price = $4, category = $5, subcategory = $6, condition = $7, \
             description = $8, image_url = $9, location = $10 \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(owner.as_uuid())
        .bind(&new.title)
        .bind(new.price.amount())
        .bind(&new.category)
        .bind(&new.subcategory)
        .bind(new.condition.map(|c| c.to_string()))
        .bind(&new.description)
        .bind(&new.image_ref)
        .bind(&new.location)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.into_domain()
    }

    /// Delete a listing, scoped to its owner.
    ///
    /// Wishlist entries referencing it are left in place and dangle; the
    /// wishlist layer tolerates that.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if nothing was deleted;
    /// `RepositoryError::Database` for other failures.
    pub async fn delete(&self, id: ListingId, owner: PrincipalId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(owner.as_uuid())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

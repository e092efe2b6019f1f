//! Profile repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tackroom_core::{Email, PrincipalId};

use super::RepositoryError;
use crate::models::Profile;

/// Raw `profiles` row.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    username: String,
    avatar_url: Option<String>,
    location: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: PrincipalId::new(row.id),
            username: row.username,
            avatar_ref: row.avatar_url,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str = "id, username, avatar_url, location, created_at, updated_at";

/// Fields a principal may change on their own profile.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub username: String,
    pub avatar_ref: Option<String>,
    pub location: Option<String>,
}

/// Repository for profile database operations.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a profile by principal id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: PrincipalId) -> Result<Option<Profile>, RepositoryError> {
        let row: Option<ProfileRow> =
            sqlx::query_as(&format!("SELECT {SELECT_COLUMNS} FROM profiles WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(Profile::from))
    }

    /// Read-repair: return the profile, creating it first if missing.
    ///
    /// The synthesized username is the principal's email local-part. The
    /// insert is an idempotent upsert keyed by id with conflict-ignore
    /// semantics, so two concurrent first requests cannot race each other -
    /// whichever insert loses simply reads the surviving row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either statement fails, or
    /// `RepositoryError::DataCorruption` if the row vanished between the
    /// upsert and the read.
    pub async fn ensure(
        &self,
        id: PrincipalId,
        email: &Email,
    ) -> Result<Profile, RepositoryError> {
        sqlx::query(
            "INSERT INTO profiles (id, username) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
        )
        .bind(id.as_uuid())
        .bind(email.local_part())
        .execute(self.pool)
        .await?;

        self.get(id).await?.ok_or_else(|| {
            RepositoryError::DataCorruption(format!("profile {id} missing after upsert"))
        })
    }

    /// Update a profile's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no profile row exists;
    /// `RepositoryError::Database` for other failures.
    pub async fn update(
        &self,
        id: PrincipalId,
        update: &ProfileUpdate,
    ) -> Result<Profile, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "UPDATE profiles SET username = $2, avatar_url = $3, location = $4, updated_at = now() \
             WHERE id = $1 RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(&update.username)
        .bind(&update.avatar_ref)
        .bind(&update.location)
        .fetch_optional(self.pool)
        .await?;

        row.map(Profile::from).ok_or(RepositoryError::NotFound)
    }
}

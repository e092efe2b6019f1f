//! Profile domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tackroom_core::PrincipalId;

use crate::storage::StorageClient;

/// A user profile (domain type).
///
/// Keyed by the identity provider's subject id. Created lazily on first
/// authenticated access when missing (read-repair).
#[derive(Debug, Clone)]
pub struct Profile {
    /// Equal to the identity provider's subject id.
    pub id: PrincipalId,
    /// Display name shown next to listings.
    pub username: String,
    /// Stored avatar reference: absolute URL or storage-relative key.
    pub avatar_ref: Option<String>,
    /// Optional free-form location.
    pub location: Option<String>,
    /// When the profile row was created.
    pub created_at: DateTime<Utc>,
    /// When the profile was last updated.
    pub updated_at: DateTime<Utc>,
}

/// JSON shape for a profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: PrincipalId,
    pub username: String,
    /// Directly fetchable avatar URL, or null.
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileView {
    /// Build the API view of a profile, resolving its avatar reference.
    #[must_use]
    pub fn from_profile(profile: &Profile, storage: &StorageClient) -> Self {
        Self {
            id: profile.id,
            username: profile.username.clone(),
            avatar_url: storage.resolve(profile.avatar_ref.as_deref()),
            location: profile.location.clone(),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

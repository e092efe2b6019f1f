//! Wishlist domain types.

use chrono::{DateTime, Utc};

use tackroom_core::{ListingId, PrincipalId, WishlistEntryId};

use super::Listing;

/// A favorite relationship between a principal and a listing.
///
/// The `listing` payload is an enrichment fetched alongside the entry; it is
/// `None` when the referenced listing has since been deleted (the entry then
/// dangles and is excluded from display, never an error) or when the
/// best-effort fetch after a toggle did not return it.
#[derive(Debug, Clone)]
pub struct WishlistItem {
    /// Surrogate entry id.
    pub id: WishlistEntryId,
    /// Owning principal.
    pub principal_id: PrincipalId,
    /// The favorited listing.
    pub listing_id: ListingId,
    /// When the entry was created. Entries are never updated in place.
    pub created_at: DateTime<Utc>,
    /// Enriched listing payload, if it still exists.
    pub listing: Option<Listing>,
}

//! Listing domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tackroom_core::{Condition, ListingId, Price, PrincipalId};

use crate::storage::StorageClient;

/// A marketplace listing (domain type).
///
/// Owned by exactly one principal (the seller). Mutated and deleted only by
/// its owner; no versioning, last write wins.
#[derive(Debug, Clone)]
pub struct Listing {
    /// Unique listing ID.
    pub id: ListingId,
    /// Listing title.
    pub title: String,
    /// Asking price.
    pub price: Price,
    /// Top-level category.
    pub category: String,
    /// Optional subcategory.
    pub subcategory: Option<String>,
    /// Optional item condition.
    pub condition: Option<Condition>,
    /// Free-form description.
    pub description: String,
    /// Stored image reference: absolute URL or storage-relative key.
    pub image_ref: Option<String>,
    /// Optional seller-entered location.
    pub location: Option<String>,
    /// The selling principal.
    pub owner_id: PrincipalId,
    /// When the listing was created.
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating or updating a listing.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub title: String,
    pub price: Price,
    pub category: String,
    pub subcategory: Option<String>,
    pub condition: Option<Condition>,
    pub description: String,
    pub image_ref: Option<String>,
    pub location: Option<String>,
}

/// JSON shape for a listing, shared by every route that shows one.
///
/// Carries the resolved image URL and the formatted price so all surfaces
/// render them identically.
#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    pub id: ListingId,
    pub title: String,
    pub price: Decimal,
    /// Grouped amount plus currency suffix, e.g. `1,234.5 kr DKK`.
    pub price_display: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    pub description: String,
    /// Directly fetchable image URL, or null when the listing has no image.
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub seller_id: PrincipalId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ListingView {
    /// Build the API view of a listing, resolving its image reference.
    #[must_use]
    pub fn from_listing(
        listing: &Listing,
        storage: &StorageClient,
        seller_name: Option<String>,
    ) -> Self {
        Self {
            id: listing.id,
            title: listing.title.clone(),
            price: listing.price.amount(),
            price_display: listing.price.display(),
            category: listing.category.clone(),
            subcategory: listing.subcategory.clone(),
            condition: listing.condition,
            description: listing.description.clone(),
            image_url: storage.resolve(listing.image_ref.as_deref()),
            location: listing.location.clone(),
            seller_id: listing.owner_id,
            seller_name,
            created_at: listing.created_at,
        }
    }
}

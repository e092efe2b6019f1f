//! Wishlist routes, served through the per-principal synchronization layer.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use tackroom_core::ListingId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::ListingView;
use crate::state::AppState;

/// JSON shape of the wishlist: the listings still worth showing plus the raw
/// membership id-set (which includes dangling entries).
#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub listings: Vec<ListingView>,
    pub listing_ids: Vec<ListingId>,
}

/// Result of a toggle: the new membership state, or a failure the client
/// should leave its UI unchanged for.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub toggled: bool,
    pub in_wishlist: bool,
}

/// The authenticated principal's wishlist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<WishlistResponse>> {
    let session = state.wishlists().session_for(&principal).await;

    let items = session.service.items().await;
    let listing_ids = items.iter().map(|item| item.listing_id).collect();
    let listings = session
        .service
        .listings()
        .await
        .iter()
        .map(|listing| ListingView::from_listing(listing, state.storage(), None))
        .collect();

    Ok(Json(WishlistResponse {
        listings,
        listing_ids,
    }))
}

/// Flip a listing's favorite state for the authenticated principal.
#[instrument(skip(state))]
pub async fn toggle(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(listing_id): Path<ListingId>,
) -> Result<Json<ToggleResponse>> {
    let session = state.wishlists().session_for(&principal).await;

    let toggled = session.service.toggle(listing_id).await;
    let in_wishlist = session.service.is_in_wishlist(listing_id).await;

    Ok(Json(ToggleResponse {
        toggled,
        in_wishlist,
    }))
}

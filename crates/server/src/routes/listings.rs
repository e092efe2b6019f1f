//! Listing catalog routes: browse, inspect, and seller CRUD.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use tackroom_core::{Condition, ListingId, Price};

use crate::db::{ListingRepository, ProfileRepository, listings::ListingFilter};
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{ListingView, NewListing};
use crate::state::AppState;

/// Query parameters for browsing the catalog.
#[derive(Debug, Deserialize, Default)]
pub struct BrowseQuery {
    /// Restrict to one category.
    pub category: Option<String>,
    /// Case-insensitive substring match against titles.
    pub q: Option<String>,
}

/// Request body for creating or replacing a listing.
#[derive(Debug, Deserialize)]
pub struct ListingPayload {
    pub title: String,
    pub price: Decimal,
    pub category: String,
    pub subcategory: Option<String>,
    pub condition: Option<Condition>,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    pub location: Option<String>,
}

impl ListingPayload {
    /// Validate the payload into the domain shape.
    fn into_new_listing(self) -> Result<NewListing> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest("title must not be empty".into()));
        }
        if self.category.trim().is_empty() {
            return Err(AppError::BadRequest("category must not be empty".into()));
        }
        let price = Price::new(self.price)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        Ok(NewListing {
            title: self.title.trim().to_owned(),
            price,
            category: self.category,
            subcategory: self.subcategory,
            condition: self.condition,
            description: self.description,
            image_ref: self.image_url,
            location: self.location,
        })
    }
}

/// Browse the catalog, newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<Vec<ListingView>>> {
    let filter = ListingFilter {
        category: query.category,
        search: query.q,
    };
    let listings = ListingRepository::new(state.pool()).list(&filter).await?;

    let views = listings
        .iter()
        .map(|listing| ListingView::from_listing(listing, state.storage(), None))
        .collect();
    Ok(Json(views))
}

/// Listing detail payload: the listing plus the caller's favorite state.
#[derive(Debug, serde::Serialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: ListingView,
    /// Whether the authenticated caller has favorited this listing.
    /// Always `false` for anonymous requests.
    pub in_wishlist: bool,
}

/// Show one listing with its seller's display name.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(principal): OptionalAuth,
    Path(id): Path<ListingId>,
) -> Result<Json<ListingDetail>> {
    let listing = ListingRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("listing {id}")))?;

    let seller_name = ProfileRepository::new(state.pool())
        .get(listing.owner_id)
        .await?
        .map(|profile| profile.username);

    let in_wishlist = match principal {
        Some(principal) => {
            let session = state.wishlists().session_for(&principal).await;
            session.service.is_in_wishlist(id).await
        }
        None => false,
    };

    Ok(Json(ListingDetail {
        listing: ListingView::from_listing(&listing, state.storage(), seller_name),
        in_wishlist,
    }))
}

/// The authenticated seller's own listings.
#[instrument(skip(state))]
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<Vec<ListingView>>> {
    let listings = ListingRepository::new(state.pool())
        .by_owner(principal.id)
        .await?;

    let views = listings
        .iter()
        .map(|listing| ListingView::from_listing(listing, state.storage(), None))
        .collect();
    Ok(Json(views))
}

/// Create a listing owned by the authenticated principal.
#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Json(payload): Json<ListingPayload>,
) -> Result<impl IntoResponse> {
    let new = payload.into_new_listing()?;
    let listing = ListingRepository::new(state.pool())
        .insert(principal.id, &new)
        .await?;

    let view = ListingView::from_listing(&listing, state.storage(), None);
    Ok((StatusCode::CREATED, Json(view)))
}

/// Replace a listing's fields. Owner-scoped; last write wins.
#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<ListingId>,
    Json(payload): Json<ListingPayload>,
) -> Result<Json<ListingView>> {
    let new = payload.into_new_listing()?;
    let listing = ListingRepository::new(state.pool())
        .update(id, principal.id, &new)
        .await?;

    Ok(Json(ListingView::from_listing(&listing, state.storage(), None)))
}

/// Delete a listing. Owner-scoped; wishlist entries referencing it dangle.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<ListingId>,
) -> Result<StatusCode> {
    ListingRepository::new(state.pool())
        .delete(id, principal.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

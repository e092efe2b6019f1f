//! Profile routes: the caller's own profile (with read-repair) and the
//! public seller page.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tackroom_core::PrincipalId;

use crate::db::{ListingRepository, ProfileRepository, profiles::ProfileUpdate};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{ListingView, ProfileView};
use crate::state::AppState;

/// Request body for updating the caller's profile.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: String,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
}

/// A seller's public page: profile plus active listings.
#[derive(Debug, Serialize)]
pub struct SellerResponse {
    pub profile: ProfileView,
    pub listings: Vec<ListingView>,
}

/// The caller's own profile, created from their email local-part if the row
/// is missing (read-repair for identities provisioned before the profiles
/// table existed).
#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<ProfileView>> {
    let profile = ProfileRepository::new(state.pool())
        .ensure(principal.id, &principal.email)
        .await?;
    Ok(Json(ProfileView::from_profile(&profile, state.storage())))
}

/// Update the caller's profile.
#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileView>> {
    if payload.username.trim().is_empty() {
        return Err(AppError::BadRequest("username must not be empty".into()));
    }

    let repo = ProfileRepository::new(state.pool());
    // Repair first so a fresh identity can save a profile in one call.
    repo.ensure(principal.id, &principal.email).await?;

    let profile = repo
        .update(
            principal.id,
            &ProfileUpdate {
                username: payload.username.trim().to_owned(),
                avatar_ref: payload.avatar_url,
                location: payload.location,
            },
        )
        .await?;

    Ok(Json(ProfileView::from_profile(&profile, state.storage())))
}

/// A seller's public page.
#[instrument(skip(state))]
pub async fn seller(
    State(state): State<AppState>,
    Path(id): Path<PrincipalId>,
) -> Result<Json<SellerResponse>> {
    let profile = ProfileRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("seller {id}")))?;

    let listings = ListingRepository::new(state.pool()).by_owner(id).await?;
    let views = listings
        .iter()
        .map(|listing| {
            ListingView::from_listing(listing, state.storage(), Some(profile.username.clone()))
        })
        .collect();

    Ok(Json(SellerResponse {
        profile: ProfileView::from_profile(&profile, state.storage()),
        listings: views,
    }))
}

//! Session lifecycle routes.
//!
//! Token issuance lives with the identity provider; the only session state
//! held here is the per-principal wishlist cache, which sign-out discards.

use axum::{extract::State, http::StatusCode};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Discard the caller's server-side session state.
#[instrument(skip(state))]
pub async fn signout(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<StatusCode> {
    state.wishlists().sign_out(principal.id).await;
    tracing::info!(principal = %principal.id, "signed out");
    Ok(StatusCode::NO_CONTENT)
}

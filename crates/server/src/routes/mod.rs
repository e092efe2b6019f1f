//! HTTP route handlers for the marketplace API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (database)
//!
//! # Catalog
//! GET    /api/listings             - Browse (category / search filters)
//! POST   /api/listings             - Create listing (auth)
//! GET    /api/listings/mine        - Caller's listings (auth)
//! GET    /api/listings/{id}        - Listing detail with seller name
//! PUT    /api/listings/{id}        - Replace listing (auth, owner)
//! DELETE /api/listings/{id}        - Delete listing (auth, owner)
//! POST   /api/images               - Upload listing image (auth, multipart)
//!
//! # Wishlist (auth)
//! GET  /api/wishlist               - Current principal's wishlist
//! POST /api/wishlist/{id}/toggle   - Flip favorite state of a listing
//!
//! # Profiles
//! GET  /api/profile                - Caller's profile, read-repaired (auth)
//! PUT  /api/profile                - Update caller's profile (auth)
//! GET  /api/sellers/{id}           - Public seller page
//! POST /api/auth/signout           - Discard session state (auth)
//!
//! # Stripe Connect
//! POST /api/stripe/account         - Provision Express account (auth)
//! POST /api/stripe/account_link    - Mint hosted onboarding link (auth)
//! POST /api/stripe/account_session - Embedded-component session (auth)
//! POST /api/stripe/webhook         - Signed webhook deliveries
//! POST /api/seller/onboarding/start   - Account + first link in one call (auth)
//! POST /api/seller/onboarding/refresh - Fresh link for an existing account (auth)
//! ```

pub mod auth;
pub mod images;
pub mod listings;
pub mod onboarding;
pub mod profiles;
pub mod stripe;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Assemble every API route under one router.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/api/listings", get(listings::index).post(listings::create))
        .route("/api/listings/mine", get(listings::mine))
        .route(
            "/api/listings/{id}",
            get(listings::show)
                .put(listings::update)
                .delete(listings::destroy),
        )
        .route("/api/images", post(images::upload))
        // Wishlist
        .route("/api/wishlist", get(wishlist::show))
        .route("/api/wishlist/{id}/toggle", post(wishlist::toggle))
        // Profiles
        .route("/api/profile", get(profiles::me).put(profiles::update))
        .route("/api/sellers/{id}", get(profiles::seller))
        .route("/api/auth/signout", post(auth::signout))
        // Stripe Connect
        .route("/api/stripe/account", post(stripe::create_account))
        .route("/api/stripe/account_link", post(stripe::create_account_link))
        .route(
            "/api/stripe/account_session",
            post(stripe::create_account_session),
        )
        .route("/api/stripe/webhook", post(stripe::webhook))
        .route("/api/seller/onboarding/start", post(onboarding::start))
        .route("/api/seller/onboarding/refresh", post(onboarding::refresh))
}

//! Stripe Connect proxy routes and the webhook receiver.
//!
//! The proxy endpoints exist so the Stripe secret key never reaches a
//! client; callers get back only the ids, URLs, and client secrets they
//! need. The webhook endpoint verifies signatures before touching the body.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::ORIGIN},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tackroom_core::StripeAccountId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::services::OnboardingFlow;
use crate::state::AppState;

/// Request body naming an existing connected account.
#[derive(Debug, Deserialize)]
pub struct AccountRequest {
    pub account: StripeAccountId,
}

/// Request body for an embedded onboarding session; an account is created
/// when the caller does not have one yet.
#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    #[serde(default)]
    pub account: Option<StripeAccountId>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account: StripeAccountId,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub account: StripeAccountId,
    pub client_secret: String,
}

/// The origin hosted-flow URLs should land back on: the caller's `Origin`
/// header when present, the configured base URL otherwise.
fn request_origin(headers: &HeaderMap, state: &AppState) -> String {
    headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| state.config().base_url.clone(), ToOwned::to_owned)
}

/// Provision an Express account for the authenticated seller.
#[instrument(skip(state))]
pub async fn create_account(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<AccountResponse>> {
    let account = state.stripe().create_account().await?;
    tracing::info!(seller = %principal.id, account = %account.id, "connected account created");
    Ok(Json(AccountResponse { account: account.id }))
}

/// Mint a hosted onboarding link for an existing account.
#[instrument(skip(state, headers))]
pub async fn create_account_link(
    State(state): State<AppState>,
    RequireAuth(_principal): RequireAuth,
    headers: HeaderMap,
    Json(payload): Json<AccountRequest>,
) -> Result<Json<LinkResponse>> {
    let origin = request_origin(&headers, &state);
    let link = state
        .stripe()
        .create_account_link(&payload.account, &origin)
        .await?;
    Ok(Json(LinkResponse { url: link.url }))
}

/// Create an embedded-component onboarding session, provisioning an account
/// first when the caller has none. Driven through the onboarding flow so
/// failures follow the same retry contract as the hosted-link path.
#[instrument(skip(state))]
pub async fn create_account_session(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<SessionResponse>> {
    let mut flow = match payload.account {
        Some(account) => OnboardingFlow::resume(state.stripe().clone(), account),
        None => OnboardingFlow::new(state.stripe().clone()),
    };
    let session = flow.embedded_session().await?;
    tracing::info!(seller = %principal.id, account = %session.account, "embedded onboarding session created");

    Ok(Json(SessionResponse {
        account: session.account,
        client_secret: session.client_secret,
    }))
}

/// Receive a webhook delivery from Stripe.
///
/// The raw body is taken as a `String` because the signature covers the
/// exact bytes; any re-serialization would break verification.
#[instrument(skip(state, headers, body))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".into()))?;

    state.webhooks().verify(signature, &body)?;
    let outcome = state.webhooks().process(&body)?;
    tracing::debug!(?outcome, "webhook processed");

    Ok(StatusCode::OK)
}

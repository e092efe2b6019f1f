//! Seller onboarding routes, driving the flow state machine over the real
//! Stripe client.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::ORIGIN},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tackroom_core::StripeAccountId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::OnboardingFlow;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub account: StripeAccountId,
    pub url: String,
}

/// Request body for re-entering an interrupted flow.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub account: StripeAccountId,
}

fn request_origin(headers: &HeaderMap, state: &AppState) -> String {
    headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| state.config().base_url.clone(), ToOwned::to_owned)
}

/// Begin onboarding: provision an account and mint the first hosted link.
#[instrument(skip(state, headers))]
pub async fn start(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    headers: HeaderMap,
) -> Result<Json<OnboardingResponse>> {
    let origin = request_origin(&headers, &state);

    let mut flow = OnboardingFlow::new(state.stripe().clone());
    let link = flow.start(&origin).await?;
    tracing::info!(seller = %principal.id, account = %link.account, "onboarding started");

    Ok(Json(OnboardingResponse {
        account: link.account,
        url: link.url,
    }))
}

/// Mint a fresh link after the previous one expired or was abandoned.
#[instrument(skip(state, headers))]
pub async fn refresh(
    State(state): State<AppState>,
    RequireAuth(_principal): RequireAuth,
    headers: HeaderMap,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<OnboardingResponse>> {
    let origin = request_origin(&headers, &state);

    let mut flow = OnboardingFlow::resume(state.stripe().clone(), payload.account);
    let link = flow.refresh(&origin).await?;

    Ok(Json(OnboardingResponse {
        account: link.account,
        url: link.url,
    }))
}

//! Stripe API resource shapes (only the fields this application reads).

use serde::Deserialize;

use tackroom_core::StripeAccountId;

/// A connected account, as returned by account creation and carried in
/// `account.updated` events.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: StripeAccountId,
    #[serde(default)]
    pub details_submitted: bool,
    #[serde(default)]
    pub charges_enabled: bool,
}

/// A single-use hosted onboarding link.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountLink {
    pub url: String,
}

/// An embedded-component session.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSession {
    pub client_secret: String,
}

/// Error envelope returned by the Stripe API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub message: String,
}

/// Webhook event envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventData {
    pub object: serde_json::Value,
}

//! Stripe error types.

use thiserror::Error;

/// Errors that can occur when interacting with the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response; `message` is the platform's own
    /// wording, surfaced verbatim to the seller.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Webhook signature verification failed.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// The onboarding flow was driven out of order.
    #[error("{0}")]
    Flow(String),
}

//! Stripe Connect integration: account provisioning for sellers and the
//! webhook receiver for account lifecycle events.

pub mod client;
pub mod error;
pub mod types;
pub mod webhook;

pub use client::StripeClient;
pub use error::StripeError;
pub use types::{Account, AccountLink, AccountSession};
pub use webhook::{WebhookOutcome, WebhookReceiver};

//! Stripe webhook signature verification and event dispatch.
//!
//! Stripe signs each delivery with the endpoint's shared secret:
//! `Stripe-Signature: t=<unix>,v1=<hex hmac>` where the HMAC-SHA256 input is
//! `{t}.{raw body}`. Verification rejects stale timestamps (5 minutes) and
//! compares signatures in constant time. A delivery that fails verification
//! is never parsed.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, info, instrument, warn};

use tackroom_core::StripeAccountId;

use super::error::StripeError;
use super::types::{Account, Event};

/// Maximum accepted age of a delivery, in seconds.
const REPLAY_WINDOW_SECS: i64 = 300;

/// What the receiver did with a verified delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// `account.updated` where the account has submitted details and can
    /// take charges; the point where onboarding-complete side effects hook
    /// in.
    OnboardingCompleted { account: StripeAccountId },
    /// `account.updated` for an account still mid-onboarding.
    AccountProgress { account: StripeAccountId },
    /// The seller disconnected the platform from their account.
    Deauthorized,
    /// Any event type the receiver does not act on; acknowledged as-is.
    Ignored { event_type: String },
}

/// Verifies and dispatches webhook deliveries for one endpoint secret.
#[derive(Clone)]
pub struct WebhookReceiver {
    endpoint_secret: SecretString,
}

impl WebhookReceiver {
    /// Create a receiver for the given endpoint secret.
    #[must_use]
    pub const fn new(endpoint_secret: SecretString) -> Self {
        Self { endpoint_secret }
    }

    /// Verify a delivery's `Stripe-Signature` header against the raw body.
    ///
    /// # Errors
    ///
    /// Returns [`StripeError::InvalidSignature`] for a malformed header, a
    /// timestamp outside the replay window, or a signature mismatch.
    #[instrument(skip(self, body, signature_header))]
    pub fn verify(&self, signature_header: &str, body: &str) -> Result<(), StripeError> {
        let (timestamp, signature) = parse_signature_header(signature_header)?;

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| StripeError::InvalidSignature("Invalid timestamp".to_string()))?;

        let now_secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| StripeError::InvalidSignature(e.to_string()))?
            .as_secs();

        let now = i64::try_from(now_secs)
            .map_err(|_| StripeError::InvalidSignature("System time overflow".to_string()))?;

        if (now - ts).abs() > REPLAY_WINDOW_SECS {
            return Err(StripeError::InvalidSignature(
                "Request timestamp too old".to_string(),
            ));
        }

        let signed_payload = format!("{timestamp}.{body}");

        let mut mac =
            Hmac::<Sha256>::new_from_slice(self.endpoint_secret.expose_secret().as_bytes())
                .map_err(|e| StripeError::InvalidSignature(e.to_string()))?;
        mac.update(signed_payload.as_bytes());

        let expected = hex::encode(mac.finalize().into_bytes());

        if !constant_time_compare(&expected, signature) {
            return Err(StripeError::InvalidSignature(
                "Signature mismatch".to_string(),
            ));
        }

        debug!("webhook signature verified");
        Ok(())
    }

    /// Parse a verified body and act on the event.
    ///
    /// Account lifecycle events are logged; no persistence side effect hangs
    /// off them yet. Unknown event types are acknowledged so Stripe does not
    /// redeliver.
    ///
    /// # Errors
    ///
    /// Returns [`StripeError::Parse`] when the body is not a valid event
    /// envelope.
    pub fn process(&self, body: &str) -> Result<WebhookOutcome, StripeError> {
        let event: Event =
            serde_json::from_str(body).map_err(|e| StripeError::Parse(e.to_string()))?;

        let outcome = match event.event_type.as_str() {
            "account.updated" => {
                let account: Account = serde_json::from_value(event.data.object)
                    .map_err(|e| StripeError::Parse(e.to_string()))?;
                if account.details_submitted && account.charges_enabled {
                    info!(account = %account.id, "seller onboarding completed");
                    WebhookOutcome::OnboardingCompleted {
                        account: account.id,
                    }
                } else {
                    debug!(
                        account = %account.id,
                        details_submitted = account.details_submitted,
                        charges_enabled = account.charges_enabled,
                        "account updated, onboarding incomplete"
                    );
                    WebhookOutcome::AccountProgress {
                        account: account.id,
                    }
                }
            }
            "account.application.deauthorized" => {
                warn!("connected account deauthorized the platform");
                WebhookOutcome::Deauthorized
            }
            other => {
                debug!(event_type = other, "ignoring webhook event");
                WebhookOutcome::Ignored {
                    event_type: event.event_type,
                }
            }
        };

        Ok(outcome)
    }
}

/// Split `t=...,v1=...` into the timestamp and the v1 signature.
///
/// Stripe may send multiple `v1` entries during secret rotation; only the
/// first is checked since this endpoint has a single secret.
fn parse_signature_header(header: &str) -> Result<(&str, &str), StripeError> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) if signature.is_none() => signature = Some(value),
            _ => {}
        }
    }

    match (timestamp, signature) {
        (Some(t), Some(v1)) => Ok((t, v1)),
        _ => Err(StripeError::InvalidSignature(
            "Malformed signature header".to_string(),
        )),
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

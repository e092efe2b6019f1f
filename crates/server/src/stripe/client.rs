//! Stripe API client for Connect account provisioning.
//!
//! Form-encoded requests with basic auth, one best-effort attempt per call.
//! API error messages come back verbatim so sellers see the platform's own
//! wording.

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use tackroom_core::StripeAccountId;

use crate::config::StripeConfig;
use crate::services::ConnectGateway;

use super::error::StripeError;
use super::types::{Account, AccountLink, AccountSession, ApiErrorBody};

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// Merchant category code for miscellaneous personal services; every seller
/// on the marketplace onboards under the same fixed business profile.
const SELLER_MCC: &str = "7299";

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: SecretString,
}

impl StripeClient {
    /// Create a new Stripe API client.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: config.secret_key.clone(),
        }
    }

    /// Provision an Express account for a Danish individual seller with
    /// card payments and transfers, daily payouts.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn create_account(&self) -> Result<Account, StripeError> {
        let params = [
            ("type", "express"),
            ("country", "DK"),
            ("capabilities[card_payments][requested]", "true"),
            ("capabilities[transfers][requested]", "true"),
            ("business_type", "individual"),
            ("business_profile[mcc]", SELLER_MCC),
            (
                "business_profile[product_description]",
                "Second-hand equestrian equipment",
            ),
            ("settings[payouts][schedule][interval]", "daily"),
        ];
        self.post("/accounts", &params).await
    }

    /// Mint a single-use hosted onboarding link for an account.
    ///
    /// Refresh and return URLs are derived from the requesting origin so the
    /// hosted flow lands back on whichever deployment initiated it.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn create_account_link(
        &self,
        account: &StripeAccountId,
        origin: &str,
    ) -> Result<AccountLink, StripeError> {
        let refresh_url = format!("{origin}/stripe/refresh/{account}");
        let return_url = format!("{origin}/stripe/return/{account}");
        let params = [
            ("account", account.as_str()),
            ("refresh_url", refresh_url.as_str()),
            ("return_url", return_url.as_str()),
            ("type", "account_onboarding"),
        ];
        self.post("/account_links", &params).await
    }

    /// Create an embedded-component session with the onboarding component
    /// enabled (including external account collection).
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn create_account_session(
        &self,
        account: &StripeAccountId,
    ) -> Result<AccountSession, StripeError> {
        let params = [
            ("account", account.as_str()),
            ("components[account_onboarding][enabled]", "true"),
            (
                "components[account_onboarding][features][external_account_collection]",
                "true",
            ),
        ];
        self.post("/account_sessions", &params).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, StripeError> {
        let request = self
            .client
            .post(format!("{BASE_URL}{path}"))
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .form(params);
        Self::execute(request).await
    }

    async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, StripeError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map_or(body, |parsed| parsed.error.message);
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StripeError::Parse(e.to_string()))
    }
}

impl ConnectGateway for StripeClient {
    async fn create_account(&self) -> Result<StripeAccountId, StripeError> {
        Self::create_account(self).await.map(|account| account.id)
    }

    async fn create_account_link(
        &self,
        account: &StripeAccountId,
        origin: &str,
    ) -> Result<String, StripeError> {
        Self::create_account_link(self, account, origin)
            .await
            .map(|link| link.url)
    }

    async fn create_account_session(
        &self,
        account: &StripeAccountId,
    ) -> Result<String, StripeError> {
        Self::create_account_session(self, account)
            .await
            .map(|session| session.client_secret)
    }
}

//! Seller onboarding flow for Stripe Connect Express accounts.
//!
//! Sellers go through a hosted onboarding form before they can receive
//! payouts. The flow tracks where a seller is in that journey:
//!
//! ```text
//! NotStarted -> AccountCreatePending -> AccountCreated
//!            -> OnboardingFormActive -> Returned (terminal)
//!
//! RefreshRequired -> OnboardingFormActive   (link expired / user backed out)
//! any call failure -> Error { message }     (retry re-invokes the action)
//! ```
//!
//! Every platform call is a single best-effort attempt; a failure lands in
//! `Error` with the raw platform message and stays visible until the seller
//! retries the triggering action, which clears it first. No automatic
//! retries.

use tackroom_core::StripeAccountId;

use crate::stripe::StripeError;

/// Stripe Connect operations the onboarding flow depends on.
///
/// Implemented by the real [`crate::stripe::StripeClient`] and by mocks in
/// tests.
pub trait ConnectGateway: Send + Sync {
    /// Provision a new Express account for a seller.
    fn create_account(&self)
    -> impl Future<Output = Result<StripeAccountId, StripeError>> + Send;

    /// Mint a single-use hosted onboarding link for an existing account.
    fn create_account_link(
        &self,
        account: &StripeAccountId,
        origin: &str,
    ) -> impl Future<Output = Result<String, StripeError>> + Send;

    /// Create an embedded-component session for an existing account.
    fn create_account_session(
        &self,
        account: &StripeAccountId,
    ) -> impl Future<Output = Result<String, StripeError>> + Send;
}

/// Where a seller is in the onboarding journey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnboardingState {
    /// No connected account yet.
    NotStarted,
    /// Account creation request in flight.
    AccountCreatePending,
    /// Account exists, no onboarding form issued yet.
    AccountCreated { account: StripeAccountId },
    /// An onboarding form is live, hosted or embedded.
    OnboardingFormActive {
        account: StripeAccountId,
        form: ActiveForm,
    },
    /// The seller came back from the hosted form. Terminal.
    Returned { account: StripeAccountId },
    /// The link expired or the seller backed out; a fresh link is needed.
    RefreshRequired { account: StripeAccountId },
    /// A platform call failed; `message` is shown until the next retry.
    Error {
        message: String,
        /// Account that survived the failure, if one was already created.
        account: Option<StripeAccountId>,
    },
}

/// The onboarding surface a seller was handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveForm {
    /// Stripe-hosted page reached via a single-use link.
    HostedLink { url: String },
    /// Embedded component driven by a client secret.
    Embedded { client_secret: String },
}

/// Outcome of [`OnboardingFlow::start`] and [`OnboardingFlow::refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingLink {
    pub account: StripeAccountId,
    pub url: String,
}

/// Outcome of [`OnboardingFlow::embedded_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingSession {
    pub account: StripeAccountId,
    pub client_secret: String,
}

/// Single-seller onboarding state machine over a Connect gateway.
pub struct OnboardingFlow<G> {
    gateway: G,
    state: OnboardingState,
}

impl<G: ConnectGateway> OnboardingFlow<G> {
    /// A fresh flow for a seller with no connected account.
    pub const fn new(gateway: G) -> Self {
        Self {
            gateway,
            state: OnboardingState::NotStarted,
        }
    }

    /// Resume a flow for a seller whose account id is already known
    /// (the refresh entry point, keyed by account id from the URL).
    pub const fn resume(gateway: G, account: StripeAccountId) -> Self {
        Self {
            gateway,
            state: OnboardingState::RefreshRequired { account },
        }
    }

    /// Current position in the journey.
    pub const fn state(&self) -> &OnboardingState {
        &self.state
    }

    /// Begin onboarding: create the account if needed, then mint a link.
    ///
    /// Retrying after a failure clears the previous error and reuses the
    /// account that survived it, so a seller never ends up with two
    /// connected accounts from one session.
    ///
    /// # Errors
    ///
    /// Returns the platform error verbatim; the flow also records it in
    /// [`OnboardingState::Error`] for display.
    pub async fn start(&mut self, origin: &str) -> Result<OnboardingLink, StripeError> {
        let account = self.ensure_account().await?;
        self.activate_form(account, origin).await
    }

    /// Mint a fresh link for an existing account (expired-link re-entry).
    ///
    /// # Errors
    ///
    /// `StripeError::Flow` when no account exists yet; otherwise the
    /// platform error, also recorded for display.
    pub async fn refresh(&mut self, origin: &str) -> Result<OnboardingLink, StripeError> {
        let Some(account) = self.existing_account() else {
            return Err(StripeError::Flow(
                "no connected account to refresh".to_owned(),
            ));
        };
        self.state = OnboardingState::RefreshRequired {
            account: account.clone(),
        };

        self.activate_form(account, origin).await
    }

    /// Begin onboarding with an embedded component instead of a hosted
    /// link: create the account if needed, then mint a session.
    ///
    /// Same retry contract as [`start`](Self::start): a failure is recorded
    /// for display, and retrying reuses the account that survived it.
    ///
    /// # Errors
    ///
    /// Returns the platform error verbatim; the flow also records it in
    /// [`OnboardingState::Error`] for display.
    pub async fn embedded_session(&mut self) -> Result<OnboardingSession, StripeError> {
        let account = self.ensure_account().await?;

        match self.gateway.create_account_session(&account).await {
            Ok(client_secret) => {
                self.state = OnboardingState::OnboardingFormActive {
                    account: account.clone(),
                    form: ActiveForm::Embedded {
                        client_secret: client_secret.clone(),
                    },
                };
                Ok(OnboardingSession {
                    account,
                    client_secret,
                })
            }
            Err(e) => {
                self.fail(e.to_string(), Some(account));
                Err(e)
            }
        }
    }

    /// Record that the seller returned from the hosted form.
    ///
    /// The webhook receiver, not this transition, decides whether the
    /// account actually completed its requirements.
    pub fn mark_returned(&mut self) {
        if let Some(account) = self.existing_account() {
            self.state = OnboardingState::Returned { account };
        }
    }

    /// Reuse the account carried by the current state, creating one when
    /// there is none. A creation failure lands in `Error { account: None }`.
    async fn ensure_account(&mut self) -> Result<StripeAccountId, StripeError> {
        if let Some(account) = self.existing_account() {
            self.state = OnboardingState::AccountCreated {
                account: account.clone(),
            };
            return Ok(account);
        }

        self.state = OnboardingState::AccountCreatePending;
        match self.gateway.create_account().await {
            Ok(account) => {
                self.state = OnboardingState::AccountCreated {
                    account: account.clone(),
                };
                Ok(account)
            }
            Err(e) => {
                self.fail(e.to_string(), None);
                Err(e)
            }
        }
    }

    async fn activate_form(
        &mut self,
        account: StripeAccountId,
        origin: &str,
    ) -> Result<OnboardingLink, StripeError> {
        match self.gateway.create_account_link(&account, origin).await {
            Ok(url) => {
                self.state = OnboardingState::OnboardingFormActive {
                    account: account.clone(),
                    form: ActiveForm::HostedLink { url: url.clone() },
                };
                Ok(OnboardingLink { account, url })
            }
            Err(e) => {
                self.fail(e.to_string(), Some(account));
                Err(e)
            }
        }
    }

    /// The account carried by the current state, if any survives a retry.
    fn existing_account(&self) -> Option<StripeAccountId> {
        match &self.state {
            OnboardingState::NotStarted | OnboardingState::AccountCreatePending => None,
            OnboardingState::AccountCreated { account }
            | OnboardingState::OnboardingFormActive { account, .. }
            | OnboardingState::Returned { account }
            | OnboardingState::RefreshRequired { account } => Some(account.clone()),
            OnboardingState::Error { account, .. } => account.clone(),
        }
    }

    fn fail(&mut self, message: String, account: Option<StripeAccountId>) {
        tracing::warn!(error = %message, "onboarding step failed");
        self.state = OnboardingState::Error { message, account };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockGateway {
        accounts_created: AtomicUsize,
        links_created: AtomicUsize,
        sessions_created: AtomicUsize,
        fail_account: Mutex<bool>,
        fail_link: Mutex<bool>,
        fail_session: Mutex<bool>,
    }

    impl MockGateway {
        fn fail_account(&self, fail: bool) {
            *self.fail_account.lock().unwrap() = fail;
        }

        fn fail_link(&self, fail: bool) {
            *self.fail_link.lock().unwrap() = fail;
        }

        fn fail_session(&self, fail: bool) {
            *self.fail_session.lock().unwrap() = fail;
        }
    }

    impl ConnectGateway for &MockGateway {
        async fn create_account(&self) -> Result<StripeAccountId, StripeError> {
            if *self.fail_account.lock().unwrap() {
                return Err(StripeError::Api {
                    status: 402,
                    message: "platform cannot create accounts".to_owned(),
                });
            }
            let n = self.accounts_created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(StripeAccountId::new(format!("acct_test{n}")))
        }

        async fn create_account_link(
            &self,
            account: &StripeAccountId,
            origin: &str,
        ) -> Result<String, StripeError> {
            if *self.fail_link.lock().unwrap() {
                return Err(StripeError::Api {
                    status: 400,
                    message: "account link unavailable".to_owned(),
                });
            }
            let n = self.links_created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("{origin}/onboard/{account}/{n}"))
        }

        async fn create_account_session(
            &self,
            _account: &StripeAccountId,
        ) -> Result<String, StripeError> {
            if *self.fail_session.lock().unwrap() {
                return Err(StripeError::Api {
                    status: 400,
                    message: "account session unavailable".to_owned(),
                });
            }
            let n = self.sessions_created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("cs_secret{n}"))
        }
    }

    #[tokio::test]
    async fn test_happy_path_reaches_active_form_without_error() {
        let gateway = MockGateway::default();
        let mut flow = OnboardingFlow::new(&gateway);

        let link = flow.start("https://tackroom.dk").await.unwrap();
        assert!(link.url.starts_with("https://tackroom.dk/onboard/acct_test1"));
        assert!(matches!(
            flow.state(),
            OnboardingState::OnboardingFormActive { .. }
        ));
        assert_eq!(gateway.accounts_created.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.links_created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_account_create_failure_is_visible_and_retryable() {
        let gateway = MockGateway::default();
        gateway.fail_account(true);
        let mut flow = OnboardingFlow::new(&gateway);

        assert!(flow.start("https://tackroom.dk").await.is_err());
        let OnboardingState::Error { message, account } = flow.state() else {
            panic!("expected error state, got {:?}", flow.state());
        };
        assert!(message.contains("platform cannot create accounts"));
        assert!(account.is_none());

        // Retry clears the error and completes.
        gateway.fail_account(false);
        flow.start("https://tackroom.dk").await.unwrap();
        assert!(matches!(
            flow.state(),
            OnboardingState::OnboardingFormActive { .. }
        ));
    }

    #[tokio::test]
    async fn test_link_failure_keeps_account_so_retry_does_not_duplicate() {
        let gateway = MockGateway::default();
        gateway.fail_link(true);
        let mut flow = OnboardingFlow::new(&gateway);

        assert!(flow.start("https://tackroom.dk").await.is_err());
        let OnboardingState::Error { account, .. } = flow.state() else {
            panic!("expected error state");
        };
        assert!(account.is_some(), "account survives a failed link");

        gateway.fail_link(false);
        flow.start("https://tackroom.dk").await.unwrap();
        assert_eq!(
            gateway.accounts_created.load(Ordering::SeqCst),
            1,
            "retry reuses the surviving account"
        );
    }

    #[tokio::test]
    async fn test_refresh_mints_fresh_link_for_existing_account() {
        let gateway = MockGateway::default();
        let account = StripeAccountId::new("acct_existing".to_owned());
        let mut flow = OnboardingFlow::resume(&gateway, account.clone());

        let link = flow.refresh("https://tackroom.dk").await.unwrap();
        assert_eq!(link.account, account);
        assert_eq!(gateway.accounts_created.load(Ordering::SeqCst), 0);
        assert!(matches!(
            flow.state(),
            OnboardingState::OnboardingFormActive { .. }
        ));
    }

    #[tokio::test]
    async fn test_refresh_failure_leaves_retryable_error() {
        let gateway = MockGateway::default();
        gateway.fail_link(true);
        let account = StripeAccountId::new("acct_existing".to_owned());
        let mut flow = OnboardingFlow::resume(&gateway, account.clone());

        assert!(flow.refresh("https://tackroom.dk").await.is_err());
        assert!(matches!(flow.state(), OnboardingState::Error { .. }));

        gateway.fail_link(false);
        let link = flow.refresh("https://tackroom.dk").await.unwrap();
        assert_eq!(link.account, account);
    }

    #[tokio::test]
    async fn test_refresh_without_account_is_rejected() {
        let gateway = MockGateway::default();
        let mut flow = OnboardingFlow::new(&gateway);
        let err = flow.refresh("https://tackroom.dk").await.unwrap_err();
        assert!(matches!(err, StripeError::Flow(_)));
    }

    #[tokio::test]
    async fn test_embedded_session_reaches_active_form_without_error() {
        let gateway = MockGateway::default();
        let mut flow = OnboardingFlow::new(&gateway);

        let session = flow.embedded_session().await.unwrap();
        assert_eq!(session.client_secret, "cs_secret1");
        assert!(matches!(
            flow.state(),
            OnboardingState::OnboardingFormActive {
                form: ActiveForm::Embedded { .. },
                ..
            }
        ));
        assert_eq!(gateway.accounts_created.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.links_created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embedded_session_failure_keeps_account_and_is_retryable() {
        let gateway = MockGateway::default();
        gateway.fail_session(true);
        let mut flow = OnboardingFlow::new(&gateway);

        assert!(flow.embedded_session().await.is_err());
        let OnboardingState::Error { message, account } = flow.state() else {
            panic!("expected error state, got {:?}", flow.state());
        };
        assert!(message.contains("account session unavailable"));
        assert!(account.is_some(), "account survives a failed session");

        gateway.fail_session(false);
        flow.embedded_session().await.unwrap();
        assert!(matches!(
            flow.state(),
            OnboardingState::OnboardingFormActive { .. }
        ));
        assert_eq!(
            gateway.accounts_created.load(Ordering::SeqCst),
            1,
            "retry reuses the surviving account"
        );
    }

    #[tokio::test]
    async fn test_embedded_session_for_existing_account_skips_creation() {
        let gateway = MockGateway::default();
        let account = StripeAccountId::new("acct_existing".to_owned());
        let mut flow = OnboardingFlow::resume(&gateway, account.clone());

        let session = flow.embedded_session().await.unwrap();
        assert_eq!(session.account, account);
        assert_eq!(gateway.accounts_created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mark_returned_is_terminal_position() {
        let gateway = MockGateway::default();
        let mut flow = OnboardingFlow::new(&gateway);
        flow.start("https://tackroom.dk").await.unwrap();
        flow.mark_returned();
        assert!(matches!(flow.state(), OnboardingState::Returned { .. }));
    }
}

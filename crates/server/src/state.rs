//! Application state shared across handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::middleware::AuthVerifier;
use crate::services::{AuthEvents, WishlistRegistry};
use crate::storage::{StorageClient, StorageError};
use crate::stripe::{StripeClient, WebhookReceiver};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    stripe: StripeClient,
    webhooks: WebhookReceiver,
    storage: StorageClient,
    auth: AuthVerifier,
    auth_events: AuthEvents,
    wishlists: WishlistRegistry,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the storage HTTP client fails to build.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, StorageError> {
        let stripe = StripeClient::new(&config.stripe);
        let webhooks = WebhookReceiver::new(config.stripe.webhook_secret.clone());
        let storage = StorageClient::new(&config.storage)?;
        let auth = AuthVerifier::new(config.auth_jwt_secret.clone());
        let auth_events = AuthEvents::new();
        let wishlists = WishlistRegistry::new(pool.clone(), auth_events.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                stripe,
                webhooks,
                storage,
                auth,
                auth_events,
                wishlists,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Stripe API client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    /// Get a reference to the webhook receiver.
    #[must_use]
    pub fn webhooks(&self) -> &WebhookReceiver {
        &self.inner.webhooks
    }

    /// Get a reference to the object storage client.
    #[must_use]
    pub fn storage(&self) -> &StorageClient {
        &self.inner.storage
    }

    /// Get a reference to the bearer-token verifier.
    #[must_use]
    pub fn auth(&self) -> &AuthVerifier {
        &self.inner.auth
    }

    /// Get a reference to the auth-event hub.
    #[must_use]
    pub fn auth_events(&self) -> &AuthEvents {
        &self.inner.auth_events
    }

    /// Get a reference to the per-principal wishlist registry.
    #[must_use]
    pub fn wishlists(&self) -> &WishlistRegistry {
        &self.inner.wishlists
    }
}

impl FromRef<AppState> for AuthVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.inner.auth.clone()
    }
}

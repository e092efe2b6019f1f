//! Identity primitives: the current principal and auth-state notifications.
//!
//! Authentication itself lives in the external identity provider; this module
//! only models what the rest of the server needs from it:
//!
//! - [`Principal`] - a verified identity (subject id + email)
//! - [`IdentitySource`] - synchronous "who is signed in right now" lookup
//! - [`AuthEvents`] - an explicit observer hub for sign-in/sign-out events
//!   with a drop-to-unsubscribe [`Subscription`] contract, replacing implicit
//!   listener lifetimes

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use tackroom_core::{Email, PrincipalId};

/// An authenticated identity as issued by the identity provider.
#[derive(Debug, Clone)]
pub struct Principal {
    /// The provider's subject id.
    pub id: PrincipalId,
    /// Verified email address.
    pub email: Email,
}

/// Synchronous access to the currently signed-in principal.
///
/// The wishlist toggle path re-resolves the principal through this seam on
/// every call instead of trusting a possibly-stale cached copy.
pub trait IdentitySource: Send + Sync {
    /// The signed-in principal, or `None` when anonymous.
    fn current(&self) -> Option<Principal>;
}

/// A sign-in or sign-out transition for one principal.
///
/// Carrying the principal lets subscribers ignore transitions that do not
/// concern the session they serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(PrincipalId),
    SignedOut(PrincipalId),
}

impl AuthEvent {
    /// The principal this transition is about.
    #[must_use]
    pub const fn principal(&self) -> PrincipalId {
        match self {
            Self::SignedIn(principal) | Self::SignedOut(principal) => *principal,
        }
    }
}

type Callback = Box<dyn Fn(AuthEvent) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    callbacks: Mutex<HashMap<u64, Callback>>,
    next_id: AtomicU64,
}

/// Hub broadcasting auth-state transitions to interested components.
///
/// Callbacks run inline on the emitting task and must be cheap and
/// non-reentrant (no `subscribe`/`emit` from inside a callback).
#[derive(Clone, Default)]
pub struct AuthEvents {
    inner: Arc<Subscribers>,
}

impl AuthEvents {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for future auth events.
    ///
    /// The returned [`Subscription`] is the cancellation contract: dropping it
    /// unsubscribes the callback. There is no other way to unsubscribe, and a
    /// leaked guard keeps the callback alive for the hub's lifetime.
    #[must_use]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(AuthEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut callbacks) = self.inner.callbacks.lock() {
            callbacks.insert(id, Box::new(callback));
        }
        Subscription {
            hub: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Broadcast an event to all live subscribers.
    pub fn emit(&self, event: AuthEvent) {
        if let Ok(callbacks) = self.inner.callbacks.lock() {
            for callback in callbacks.values() {
                callback(event);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.inner.callbacks.lock().map(|c| c.len()).unwrap_or(0)
    }
}

/// Guard tying a subscription's lifetime to a value the subscriber owns.
pub struct Subscription {
    hub: Weak<Subscribers>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade()
            && let Ok(mut callbacks) = hub.callbacks.lock()
        {
            callbacks.remove(&self.id);
        }
    }
}

/// Identity source for one session, settable by the auth layer.
///
/// Holds the principal the session's bearer token verified to; cleared on
/// sign-out. Cheap to clone and share with the session's wishlist service.
#[derive(Clone, Default)]
pub struct SessionIdentity {
    current: Arc<RwLock<Option<Principal>>>,
}

impl SessionIdentity {
    /// Create a session identity for a signed-in principal.
    #[must_use]
    pub fn signed_in(principal: Principal) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(principal))),
        }
    }

    /// Create an anonymous session identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Replace the signed-in principal.
    pub fn set(&self, principal: Principal) {
        if let Ok(mut current) = self.current.write() {
            *current = Some(principal);
        }
    }

    /// Clear the principal (sign-out).
    pub fn clear(&self) {
        if let Ok(mut current) = self.current.write() {
            *current = None;
        }
    }
}

impl IdentitySource for SessionIdentity {
    fn current(&self) -> Option<Principal> {
        self.current.read().ok().and_then(|c| c.clone())
    }
}

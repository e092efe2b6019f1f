//! Wishlist synchronization service.
//!
//! Presents a read-your-writes view of "is listing X favorited by the current
//! principal" while the remote store stays authoritative. One service instance
//! exists per signed-in session; its cache is derived, session-scoped, and
//! eventually stale - rebuilt on sign-in, discarded on sign-out or after
//! sitting idle past the registry's session window.
//!
//! # State machine
//!
//! ```text
//! Uninitialized --(no principal)--> Anonymous
//! Uninitialized --(principal)-----> Loading --> Ready
//! any state --(auth event)--> Loading on next access
//! ```
//!
//! Loading fetches the principal's entries plus one batched listing fetch by
//! id-set. Entries whose listing no longer exists stay in the raw entry list
//! but are excluded from display. A failed load fails open to Ready with an
//! empty set (logged, never surfaced as a blocking error).
//!
//! All mutation goes through [`WishlistService::toggle`]; consumers read the
//! cache after the returned bool resolves rather than assuming optimistic
//! state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tokio::sync::Mutex;

use tackroom_core::{ListingId, PrincipalId};

use super::identity::{AuthEvent, AuthEvents, IdentitySource, Principal, SessionIdentity, Subscription};
use crate::db::{ListingRepository, RepositoryError, WishlistRepository};
use crate::models::{Listing, WishlistItem};

/// Store operations the synchronization layer depends on.
///
/// A seam so the service can run against PostgreSQL in production and an
/// in-memory store in tests.
pub trait WishlistStore: Send + Sync {
    /// All wishlist entries for a principal (no listing enrichment).
    fn entries_for(
        &self,
        principal: PrincipalId,
    ) -> impl Future<Output = Result<Vec<WishlistItem>, RepositoryError>> + Send;

    /// Batched listing fetch by id-set.
    fn listings_by_ids(
        &self,
        ids: &[ListingId],
    ) -> impl Future<Output = Result<Vec<Listing>, RepositoryError>> + Send;

    /// Single listing fetch (best-effort enrichment after an insert).
    fn get_listing(
        &self,
        id: ListingId,
    ) -> impl Future<Output = Result<Option<Listing>, RepositoryError>> + Send;

    /// Insert a favorite; `Conflict` when the pair already exists.
    fn insert_entry(
        &self,
        principal: PrincipalId,
        listing: ListingId,
    ) -> impl Future<Output = Result<WishlistItem, RepositoryError>> + Send;

    /// Delete the favorite keyed by the pair.
    fn delete_entry(
        &self,
        principal: PrincipalId,
        listing: ListingId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Production store backed by the marketplace database.
#[derive(Clone)]
pub struct SqlWishlistStore {
    pool: PgPool,
}

impl SqlWishlistStore {
    /// Create a store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl WishlistStore for SqlWishlistStore {
    async fn entries_for(
        &self,
        principal: PrincipalId,
    ) -> Result<Vec<WishlistItem>, RepositoryError> {
        WishlistRepository::new(&self.pool).entries_for(principal).await
    }

    async fn listings_by_ids(&self, ids: &[ListingId]) -> Result<Vec<Listing>, RepositoryError> {
        ListingRepository::new(&self.pool).by_ids(ids).await
    }

    async fn get_listing(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        ListingRepository::new(&self.pool).get(id).await
    }

    async fn insert_entry(
        &self,
        principal: PrincipalId,
        listing: ListingId,
    ) -> Result<WishlistItem, RepositoryError> {
        WishlistRepository::new(&self.pool).insert(principal, listing).await
    }

    async fn delete_entry(
        &self,
        principal: PrincipalId,
        listing: ListingId,
    ) -> Result<(), RepositoryError> {
        WishlistRepository::new(&self.pool).delete(principal, listing).await
    }
}

/// Per-session synchronization state.
#[derive(Debug)]
enum SyncState {
    /// Nothing fetched yet.
    Uninitialized,
    /// No signed-in principal; empty set, toggles report failure.
    Anonymous,
    /// A fetch is in progress (observable only while the cache lock is held).
    Loading,
    /// Cache populated for `principal`.
    Ready {
        principal: PrincipalId,
        items: Vec<WishlistItem>,
    },
}

/// Session-scoped wishlist cache, kept consistent with the remote store.
///
/// Constructed explicitly per session and injected into consumers; the cache
/// is owned exclusively by this service and exposed read-only. The internal
/// lock serializes back-to-back toggles within one session, so the only
/// insert race left is cross-session (two tabs), which the store's uniqueness
/// constraint resolves and [`toggle`](Self::toggle) swallows as benign.
pub struct WishlistService<S, I> {
    store: S,
    identity: I,
    state: Mutex<SyncState>,
    stale: Arc<AtomicBool>,
    _subscription: Subscription,
}

impl<S, I> WishlistService<S, I>
where
    S: WishlistStore,
    I: IdentitySource,
{
    /// Create a service wired to the auth-event hub.
    ///
    /// A sign-in or sign-out observed through the subscription marks the
    /// cache stale; the next access re-fetches from scratch, so favorite
    /// state never leaks across principals within one session. Events about
    /// other principals are ignored, so one session signing in does not
    /// dump every other live session's cache.
    #[must_use]
    pub fn new(store: S, identity: I, events: &AuthEvents) -> Self
    where
        I: Clone + 'static,
    {
        let stale = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stale);
        let scope = identity.clone();
        let subscription = events.subscribe(move |event: AuthEvent| {
            // Anonymous sessions hold nothing worth preserving, so any
            // event invalidates them.
            if scope.current().is_none_or(|p| p.id == event.principal()) {
                flag.store(true, Ordering::SeqCst);
            }
        });

        Self {
            store,
            identity,
            state: Mutex::new(SyncState::Uninitialized),
            stale,
            _subscription: subscription,
        }
    }

    /// Raw cached entries, including ones whose listing no longer exists.
    pub async fn items(&self) -> Vec<WishlistItem> {
        let mut state = self.state.lock().await;
        self.refresh_if_needed(&mut state).await;
        match &*state {
            SyncState::Ready { items, .. } => items.clone(),
            _ => Vec::new(),
        }
    }

    /// Listings to display: cached entries with dangling references filtered.
    pub async fn listings(&self) -> Vec<Listing> {
        self.items()
            .await
            .into_iter()
            .filter_map(|item| item.listing)
            .collect()
    }

    /// Set-containment membership test over the cached entry list.
    pub async fn is_in_wishlist(&self, listing_id: ListingId) -> bool {
        let mut state = self.state.lock().await;
        self.refresh_if_needed(&mut state).await;
        match &*state {
            SyncState::Ready { items, .. } => {
                items.iter().any(|item| item.listing_id == listing_id)
            }
            _ => false,
        }
    }

    /// Flip the favorite state of a listing for the current principal.
    ///
    /// Returns `true` when the store mutation (or a benign duplicate-insert
    /// race) succeeded and the cache reflects the new membership; `false`
    /// when anonymous or when the store call failed, in which case the cache
    /// is left untouched. Callers re-render from the cache after this
    /// resolves.
    pub async fn toggle(&self, listing_id: ListingId) -> bool {
        // Re-resolve the principal; never trust the cached one.
        let Some(principal) = self.identity.current() else {
            tracing::debug!(%listing_id, "wishlist toggle ignored: not signed in");
            return false;
        };

        let mut state = self.state.lock().await;
        self.refresh_if_needed(&mut state).await;
        let SyncState::Ready { items, .. } = &mut *state else {
            return false;
        };

        let is_member = items.iter().any(|item| item.listing_id == listing_id);
        if is_member {
            self.remove(items, principal.id, listing_id).await
        } else {
            self.add(items, principal.id, listing_id).await
        }
    }

    async fn remove(
        &self,
        items: &mut Vec<WishlistItem>,
        principal: PrincipalId,
        listing_id: ListingId,
    ) -> bool {
        match self.store.delete_entry(principal, listing_id).await {
            // A missing row means another session already removed it; the
            // desired end state holds either way.
            Ok(()) | Err(RepositoryError::NotFound) => {
                items.retain(|item| item.listing_id != listing_id);
                true
            }
            Err(e) => {
                tracing::warn!(%listing_id, error = %e, "wishlist remove failed");
                false
            }
        }
    }

    async fn add(
        &self,
        items: &mut Vec<WishlistItem>,
        principal: PrincipalId,
        listing_id: ListingId,
    ) -> bool {
        match self.store.insert_entry(principal, listing_id).await {
            Ok(mut item) => {
                // Best-effort enrichment; its absence must not fail the toggle.
                match self.store.get_listing(listing_id).await {
                    Ok(listing) => item.listing = listing,
                    Err(e) => {
                        tracing::debug!(%listing_id, error = %e, "listing enrichment skipped");
                    }
                }
                items.push(item);
                true
            }
            Err(RepositoryError::Conflict(_)) => {
                // The pair already exists: a concurrent favorite won the
                // race. Success-equivalent; re-fetch on next access so the
                // cache picks up the surviving row.
                tracing::debug!(%listing_id, "duplicate favorite insert treated as no-op");
                self.stale.store(true, Ordering::SeqCst);
                true
            }
            Err(e) => {
                tracing::warn!(%listing_id, error = %e, "wishlist add failed");
                false
            }
        }
    }

    /// Drive the state machine forward if the cache is missing or stale.
    async fn refresh_if_needed(&self, state: &mut SyncState) {
        let stale = self.stale.swap(false, Ordering::SeqCst);
        let current = self.identity.current();

        let needs_load = stale
            || match &*state {
                SyncState::Uninitialized | SyncState::Loading => true,
                SyncState::Anonymous => current.is_some(),
                // Covers a missed event: a different principal signed in.
                SyncState::Ready { principal, .. } => {
                    current.as_ref().is_none_or(|p| p.id != *principal)
                }
            };
        if !needs_load {
            return;
        }

        *state = SyncState::Loading;
        match current {
            None => *state = SyncState::Anonymous,
            Some(principal) => {
                let items = self.load(principal.id).await;
                *state = SyncState::Ready {
                    principal: principal.id,
                    items,
                };
            }
        }
    }

    /// Fetch entries plus batched listing enrichment, failing open to empty.
    async fn load(&self, principal: PrincipalId) -> Vec<WishlistItem> {
        let mut items = match self.store.entries_for(principal).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(%principal, error = %e, "wishlist load failed; failing open to empty");
                return Vec::new();
            }
        };

        let ids: Vec<ListingId> = items.iter().map(|item| item.listing_id).collect();
        match self.store.listings_by_ids(&ids).await {
            Ok(listings) => {
                for item in &mut items {
                    item.listing = listings.iter().find(|l| l.id == item.listing_id).cloned();
                }
            }
            Err(e) => {
                // Entries still render as favorites; only display data is lost.
                tracing::warn!(%principal, error = %e, "wishlist listing enrichment failed");
            }
        }
        items
    }
}

/// How long a session entry survives without an authenticated request.
///
/// Bearer tokens expire without a sign-out call, so idle eviction is the
/// disposal path for most sessions; an explicit sign-out just front-runs it.
const SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

const SESSION_CAPACITY: u64 = 10_000;

/// One wishlist service per signed-in principal, created on first
/// authenticated access and discarded on sign-out or idle expiry.
pub struct WishlistRegistry {
    store: SqlWishlistStore,
    events: AuthEvents,
    sessions: Cache<PrincipalId, Arc<SessionEntry>>,
}

/// A session's identity plus the service bound to it.
pub struct SessionEntry {
    identity: SessionIdentity,
    pub service: WishlistService<SqlWishlistStore, SessionIdentity>,
}

impl WishlistRegistry {
    /// Create a registry over the database-backed store.
    #[must_use]
    pub fn new(pool: PgPool, events: AuthEvents) -> Self {
        Self::with_session_idle(pool, events, SESSION_IDLE)
    }

    fn with_session_idle(pool: PgPool, events: AuthEvents, idle: Duration) -> Self {
        Self {
            store: SqlWishlistStore::new(pool),
            events,
            sessions: Cache::builder()
                .max_capacity(SESSION_CAPACITY)
                .time_to_idle(idle)
                .build(),
        }
    }

    /// Get or create the session entry for a principal.
    ///
    /// An entry evicted for idleness or capacity is simply rebuilt here on
    /// the next authenticated request; creation counts as observing a
    /// sign-in for that principal.
    pub async fn session_for(&self, principal: &Principal) -> Arc<SessionEntry> {
        self.sessions
            .get_with(principal.id, async {
                let identity = SessionIdentity::signed_in(principal.clone());
                let service =
                    WishlistService::new(self.store.clone(), identity.clone(), &self.events);
                self.events.emit(AuthEvent::SignedIn(principal.id));
                Arc::new(SessionEntry { identity, service })
            })
            .await
    }

    /// Discard a principal's session cache and broadcast the sign-out.
    pub async fn sign_out(&self, principal: PrincipalId) {
        if let Some(entry) = self.sessions.remove(&principal).await {
            entry.identity.clear();
        }
        self.events.emit(AuthEvent::SignedOut(principal));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex as StdMutex;
    use tackroom_core::{Email, Price, WishlistEntryId};

    /// In-memory store enforcing the (principal, listing) uniqueness
    /// constraint the way the database does.
    #[derive(Clone, Default)]
    struct MemoryStore {
        inner: Arc<StdMutex<MemoryInner>>,
    }

    #[derive(Default)]
    struct MemoryInner {
        entries: Vec<WishlistItem>,
        listings: HashMap<ListingId, Listing>,
        fail_entry_reads: bool,
        fail_writes: bool,
        entry_reads: usize,
    }

    impl MemoryStore {
        fn add_listing(&self, listing: Listing) {
            self.inner.lock().unwrap().listings.insert(listing.id, listing);
        }

        fn seed_entry(&self, principal: PrincipalId, listing: ListingId) {
            self.inner.lock().unwrap().entries.push(WishlistItem {
                id: WishlistEntryId::new(uuid::Uuid::new_v4()),
                principal_id: principal,
                listing_id: listing,
                created_at: Utc::now(),
                listing: None,
            });
        }

        fn fail_entry_reads(&self, fail: bool) {
            self.inner.lock().unwrap().fail_entry_reads = fail;
        }

        fn fail_writes(&self, fail: bool) {
            self.inner.lock().unwrap().fail_writes = fail;
        }

        fn entry_read_count(&self) -> usize {
            self.inner.lock().unwrap().entry_reads
        }

        fn persisted_count(&self, principal: PrincipalId, listing: ListingId) -> usize {
            self.inner
                .lock()
                .unwrap()
                .entries
                .iter()
                .filter(|e| e.principal_id == principal && e.listing_id == listing)
                .count()
        }
    }

    impl WishlistStore for MemoryStore {
        async fn entries_for(
            &self,
            principal: PrincipalId,
        ) -> Result<Vec<WishlistItem>, RepositoryError> {
            let mut inner = self.inner.lock().unwrap();
            inner.entry_reads += 1;
            if inner.fail_entry_reads {
                return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
            }
            Ok(inner
                .entries
                .iter()
                .filter(|e| e.principal_id == principal)
                .cloned()
                .collect())
        }

        async fn listings_by_ids(
            &self,
            ids: &[ListingId],
        ) -> Result<Vec<Listing>, RepositoryError> {
            let wanted: HashSet<ListingId> = ids.iter().copied().collect();
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .listings
                .values()
                .filter(|l| wanted.contains(&l.id))
                .cloned()
                .collect())
        }

        async fn get_listing(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
            Ok(self.inner.lock().unwrap().listings.get(&id).cloned())
        }

        async fn insert_entry(
            &self,
            principal: PrincipalId,
            listing: ListingId,
        ) -> Result<WishlistItem, RepositoryError> {
            let mut inner = self.inner.lock().unwrap();
            if inner.fail_writes {
                return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
            }
            if inner
                .entries
                .iter()
                .any(|e| e.principal_id == principal && e.listing_id == listing)
            {
                return Err(RepositoryError::Conflict(
                    "listing already in wishlist".to_owned(),
                ));
            }
            let item = WishlistItem {
                id: WishlistEntryId::new(uuid::Uuid::new_v4()),
                principal_id: principal,
                listing_id: listing,
                created_at: Utc::now(),
                listing: None,
            };
            inner.entries.push(item.clone());
            Ok(item)
        }

        async fn delete_entry(
            &self,
            principal: PrincipalId,
            listing: ListingId,
        ) -> Result<(), RepositoryError> {
            let mut inner = self.inner.lock().unwrap();
            if inner.fail_writes {
                return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
            }
            let before = inner.entries.len();
            inner
                .entries
                .retain(|e| !(e.principal_id == principal && e.listing_id == listing));
            if inner.entries.len() == before {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        }
    }

    fn principal(email: &str) -> Principal {
        Principal {
            id: PrincipalId::new(uuid::Uuid::new_v4()),
            email: Email::parse(email).unwrap(),
        }
    }

    fn listing(owner: PrincipalId) -> Listing {
        Listing {
            id: ListingId::new(uuid::Uuid::new_v4()),
            title: "Dressage saddle".to_owned(),
            price: Price::new(Decimal::new(12345, 1)).unwrap(),
            category: "Saddles".to_owned(),
            subcategory: None,
            condition: None,
            description: "Barely used".to_owned(),
            image_ref: None,
            location: Some("Aarhus".to_owned()),
            owner_id: owner,
            created_at: Utc::now(),
        }
    }

    fn service(
        store: &MemoryStore,
        identity: &SessionIdentity,
        events: &AuthEvents,
    ) -> WishlistService<MemoryStore, SessionIdentity> {
        WishlistService::new(store.clone(), identity.clone(), events)
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let store = MemoryStore::default();
        let events = AuthEvents::new();
        let buyer = principal("buyer@example.dk");
        let item = listing(principal("seller@example.dk").id);
        let listing_id = item.id;
        store.add_listing(item);

        let identity = SessionIdentity::signed_in(buyer);
        let svc = service(&store, &identity, &events);

        assert!(!svc.is_in_wishlist(listing_id).await);
        assert!(svc.toggle(listing_id).await);
        assert!(svc.is_in_wishlist(listing_id).await);

        assert!(svc.toggle(listing_id).await);
        assert!(!svc.is_in_wishlist(listing_id).await);
    }

    #[tokio::test]
    async fn test_no_cross_principal_leakage_on_identity_change() {
        let store = MemoryStore::default();
        let events = AuthEvents::new();
        let alice = principal("alice@example.dk");
        let bob = principal("bob@example.dk");
        let item = listing(principal("seller@example.dk").id);
        let listing_id = item.id;
        store.add_listing(item);

        // One session, identity swapped underneath it.
        let alice_id = alice.id;
        let identity = SessionIdentity::signed_in(alice);
        let svc = service(&store, &identity, &events);
        assert!(svc.toggle(listing_id).await);
        assert!(svc.is_in_wishlist(listing_id).await);

        identity.clear();
        events.emit(AuthEvent::SignedOut(alice_id));
        let bob_id = bob.id;
        identity.set(bob);
        events.emit(AuthEvent::SignedIn(bob_id));

        assert!(!svc.is_in_wishlist(listing_id).await);
        assert!(svc.items().await.is_empty());
    }

    #[tokio::test]
    async fn test_dangling_entry_retained_raw_but_not_displayed() {
        let store = MemoryStore::default();
        let events = AuthEvents::new();
        let buyer = principal("buyer@example.dk");
        let gone = ListingId::new(uuid::Uuid::new_v4());
        store.seed_entry(buyer.id, gone);

        let live = listing(principal("seller@example.dk").id);
        let live_id = live.id;
        store.add_listing(live);
        store.seed_entry(buyer.id, live_id);

        let identity = SessionIdentity::signed_in(buyer);
        let svc = service(&store, &identity, &events);

        let items = svc.items().await;
        assert_eq!(items.len(), 2, "raw entry list keeps dangling entries");

        let shown = svc.listings().await;
        assert_eq!(shown.len(), 1, "display list filters dangling entries");
        assert_eq!(shown.first().map(|l| l.id), Some(live_id));

        // Membership still answers true for the dangling id.
        assert!(svc.is_in_wishlist(gone).await);
    }

    #[tokio::test]
    async fn test_stale_cache_insert_conflict_is_success_equivalent() {
        let store = MemoryStore::default();
        let events = AuthEvents::new();
        let buyer = principal("buyer@example.dk");
        let item = listing(principal("seller@example.dk").id);
        let listing_id = item.id;
        store.add_listing(item);

        let identity = SessionIdentity::signed_in(buyer.clone());
        let svc = service(&store, &identity, &events);

        // Warm the cache while the store is still empty.
        assert!(svc.items().await.is_empty());

        // Another tab favorites the listing behind this session's back.
        store.seed_entry(buyer.id, listing_id);

        // This session's insert now hits the uniqueness constraint; the
        // toggle must report success and must not duplicate the row.
        assert!(svc.toggle(listing_id).await);
        assert_eq!(store.persisted_count(buyer.id, listing_id), 1);

        // Next access re-fetches and sees the surviving row.
        assert!(svc.is_in_wishlist(listing_id).await);
    }

    #[tokio::test]
    async fn test_two_sessions_racing_leave_exactly_one_row() {
        let store = MemoryStore::default();
        let events = AuthEvents::new();
        let buyer = principal("buyer@example.dk");
        let item = listing(principal("seller@example.dk").id);
        let listing_id = item.id;
        store.add_listing(item);

        let tab_a = service(&store, &SessionIdentity::signed_in(buyer.clone()), &events);
        let tab_b = service(&store, &SessionIdentity::signed_in(buyer.clone()), &events);

        // Warm both caches to "not favorited" so both attempt an insert.
        assert!(!tab_a.is_in_wishlist(listing_id).await);
        assert!(!tab_b.is_in_wishlist(listing_id).await);

        let (a, b) = tokio::join!(tab_a.toggle(listing_id), tab_b.toggle(listing_id));
        assert!(a && b, "both toggles resolve successfully");
        assert_eq!(store.persisted_count(buyer.id, listing_id), 1);
    }

    #[tokio::test]
    async fn test_empty_wishlist_is_ready_not_error() {
        let store = MemoryStore::default();
        let events = AuthEvents::new();
        let identity = SessionIdentity::signed_in(principal("buyer@example.dk"));
        let svc = service(&store, &identity, &events);

        // Reaches Ready with an explicit empty set; repeated reads stay empty
        // without re-entering Loading.
        assert!(svc.items().await.is_empty());
        assert!(svc.listings().await.is_empty());
        assert!(svc.items().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_failure_fails_open_to_empty() {
        let store = MemoryStore::default();
        let events = AuthEvents::new();
        let buyer = principal("buyer@example.dk");
        let buyer_id = buyer.id;
        store.seed_entry(buyer_id, ListingId::new(uuid::Uuid::new_v4()));
        store.fail_entry_reads(true);

        let identity = SessionIdentity::signed_in(buyer);
        let svc = service(&store, &identity, &events);

        // Degrades to "nothing favorited" instead of blocking.
        assert!(svc.items().await.is_empty());

        // Recovery after the store comes back, via an auth event re-fetch.
        store.fail_entry_reads(false);
        events.emit(AuthEvent::SignedIn(buyer_id));
        assert_eq!(svc.items().await.len(), 1);
    }

    #[tokio::test]
    async fn test_anonymous_toggle_is_failed_noop() {
        let store = MemoryStore::default();
        let events = AuthEvents::new();
        let identity = SessionIdentity::anonymous();
        let svc = service(&store, &identity, &events);

        let listing_id = ListingId::new(uuid::Uuid::new_v4());
        assert!(!svc.toggle(listing_id).await);
        assert!(!svc.is_in_wishlist(listing_id).await);
        assert_eq!(
            store.persisted_count(PrincipalId::new(uuid::Uuid::nil()), listing_id),
            0
        );
    }

    #[tokio::test]
    async fn test_failed_remove_leaves_cache_untouched() {
        let store = MemoryStore::default();
        let events = AuthEvents::new();
        let buyer = principal("buyer@example.dk");
        let item = listing(principal("seller@example.dk").id);
        let listing_id = item.id;
        store.add_listing(item);

        let identity = SessionIdentity::signed_in(buyer);
        let svc = service(&store, &identity, &events);
        assert!(svc.toggle(listing_id).await);

        store.fail_writes(true);
        assert!(!svc.toggle(listing_id).await, "remove reports failure");
        assert!(
            svc.is_in_wishlist(listing_id).await,
            "membership unchanged after failed remove"
        );
    }

    #[tokio::test]
    async fn test_other_principals_events_leave_cache_warm() {
        let store = MemoryStore::default();
        let events = AuthEvents::new();
        let buyer = principal("buyer@example.dk");
        let other = principal("other@example.dk");

        let identity = SessionIdentity::signed_in(buyer.clone());
        let svc = service(&store, &identity, &events);

        assert!(svc.items().await.is_empty());
        assert_eq!(store.entry_read_count(), 1);

        events.emit(AuthEvent::SignedIn(other.id));
        events.emit(AuthEvent::SignedOut(other.id));
        assert!(svc.items().await.is_empty());
        assert_eq!(
            store.entry_read_count(),
            1,
            "another principal's transitions must not dump this cache"
        );

        events.emit(AuthEvent::SignedIn(buyer.id));
        let _ = svc.items().await;
        assert_eq!(store.entry_read_count(), 2, "own sign-in re-fetches");
    }

    // The registry tests never run a query, so a lazy pool that would fail
    // on first use is enough.
    fn lazy_pool() -> PgPool {
        PgPool::connect_lazy("postgres://tackroom@localhost/tackroom").unwrap()
    }

    #[tokio::test]
    async fn test_idle_session_is_evicted_and_rebuilt_on_next_access() {
        let registry = WishlistRegistry::with_session_idle(
            lazy_pool(),
            AuthEvents::new(),
            Duration::from_millis(20),
        );
        let buyer = principal("buyer@example.dk");

        let first = registry.session_for(&buyer).await;
        let again = registry.session_for(&buyer).await;
        assert!(Arc::ptr_eq(&first, &again), "live session is reused");

        tokio::time::sleep(Duration::from_millis(60)).await;
        let rebuilt = registry.session_for(&buyer).await;
        assert!(
            !Arc::ptr_eq(&first, &rebuilt),
            "idle session is discarded and rebuilt"
        );
        assert_eq!(rebuilt.identity.current().map(|p| p.id), Some(buyer.id));
    }

    #[tokio::test]
    async fn test_sign_out_discards_session_and_clears_identity() {
        let registry = WishlistRegistry::new(lazy_pool(), AuthEvents::new());
        let buyer = principal("buyer@example.dk");

        let entry = registry.session_for(&buyer).await;
        registry.sign_out(buyer.id).await;

        assert!(entry.identity.current().is_none(), "identity cleared");
        let rebuilt = registry.session_for(&buyer).await;
        assert!(!Arc::ptr_eq(&entry, &rebuilt), "fresh entry after sign-out");
        assert!(rebuilt.identity.current().is_some());
    }
}

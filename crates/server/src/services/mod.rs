//! Application services: identity/session plumbing, the wishlist
//! synchronization layer, and the seller onboarding flow.

pub mod identity;
pub mod onboarding;
pub mod wishlist;

pub use identity::{AuthEvent, AuthEvents, IdentitySource, Principal, SessionIdentity, Subscription};
pub use onboarding::{ActiveForm, ConnectGateway, OnboardingFlow, OnboardingSession, OnboardingState};
pub use wishlist::{WishlistRegistry, WishlistService, WishlistStore};

//! Request middleware: bearer-token authentication extractors.

pub mod auth;

pub use auth::{AuthVerifier, OptionalAuth, RequireAuth};

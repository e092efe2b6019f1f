//! Tackroom Core - Shared types library.
//!
//! This crate provides common types used across all Tackroom components:
//! - `server` - JSON API backend for the marketplace web client
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and the
//!   listing condition enum

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

//! Core types for Tackroom.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod condition;
pub mod email;
pub mod id;
pub mod price;

pub use condition::Condition;
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};

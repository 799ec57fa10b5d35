//! Core types for Shoppy.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod account;
pub mod id;
pub mod money;
pub mod status;

pub use account::{Email, EmailError, Username, UsernameError};
pub use id::*;
pub use status::*;

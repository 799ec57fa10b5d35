//! Shoppy Core - Shared domain types.
//!
//! This crate provides the types shared by every Shoppy component:
//! - `server` - JSON API, chat orchestration, and the chat-to-cart pipeline
//! - `cli` - Migrations and offline pipeline diagnostics
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no database
//! access, no HTTP clients. Database encoding is opt-in through the
//! `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, account identifiers, statuses, and money helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

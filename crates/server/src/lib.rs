//! Shoppy server library.
//!
//! JSON API for a chat shopping assistant: accounts, chat sessions backed by
//! an external conversational AI, a persisted cart that the chat can fill
//! automatically, checkout into purchase history, and Shopify product search.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod retry;
pub mod routes;
pub mod sensay;
pub mod services;
pub mod shopify;
pub mod state;

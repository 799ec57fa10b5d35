//! Domain models for the chat-commerce backend.
//!
//! These types represent validated domain objects and API payloads. Row
//! types that need conversion live beside their repositories in `db`.

pub mod cart;
pub mod chat;
pub mod purchase;
pub mod user;

pub use cart::{CartItem, CartTotals, CartUpsert, NewCartItem};
pub use chat::{ChatMessage, ChatSession, ChatSessionSummary, NewChatMessage};
pub use purchase::{CheckoutReceipt, Purchase};
pub use user::User;

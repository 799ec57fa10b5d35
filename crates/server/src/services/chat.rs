//! Chat orchestration: one shopper message in, one assistant reply out.
//!
//! A turn resolves the session, optionally appends the live cart to the
//! prompt, calls the replica, runs the cart pipeline over the exchange,
//! attaches recommended products, and persists both messages.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use shoppy_core::money::format_usd;
use shoppy_core::{ChatRole, ChatSessionId, UserId};

use super::cart::{CartCountCache, CartService};
use super::catalog::Catalog;
use crate::db::{
    ApiUsageEntry, ApiUsageRepository, CartRepository, ChatRepository, RepositoryError,
    UserRepository,
};
use crate::models::{
    CartItem, ChatMessage, ChatSession, ChatSessionSummary, NewChatMessage, User,
};
use crate::pipeline::{
    CartAddition, CartStore, Pipeline, ProductSearch, ReconcileError, ShownOption,
    add_best_match,
};
use crate::sensay::{Replica, SensayClient, SensayError};
use crate::shopify::{Product, StorefrontClient};

/// Title given to sessions created without a first message.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Literal session id clients send to ask for a fresh session.
const NEW_CHAT_SENTINEL: &str = "new-chat";

/// Words of the first message used for a session title.
const TITLE_WORDS: usize = 4;
/// Longest title before it is cut and suffixed with `...`.
const TITLE_MAX_CHARS: usize = 30;

/// Reply used when the replica cannot be reached.
const FALLBACK_REPLY: &str = "I'm having trouble reaching the shopping assistant right now. \
                              Please try again in a moment.";

/// Errors from chat operations.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The message was blank.
    #[error("Message is required")]
    EmptyMessage,

    /// Unknown or deleted session.
    #[error("Chat session not found")]
    SessionNotFound,

    /// The session belongs to someone else.
    #[error("Invalid session access")]
    SessionForbidden,

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// A session reference as sent by clients: a number, a numeric string, or
/// the `new-chat` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SessionRef {
    Id(i32),
    Text(String),
}

impl SessionRef {
    /// `Ok(None)` asks for a new session.
    fn resolve(&self) -> Result<Option<ChatSessionId>, ChatError> {
        match self {
            Self::Id(id) => Ok(Some(ChatSessionId::new(*id))),
            Self::Text(text) => {
                let text = text.trim();
                if text.is_empty() || text == NEW_CHAT_SENTINEL {
                    return Ok(None);
                }
                text.parse()
                    .map(Some)
                    .map_err(|_| ChatError::SessionNotFound)
            }
        }
    }
}

/// One shopper message.
#[derive(Debug, Clone)]
pub struct ChatTurn<'a> {
    pub message: &'a str,
    pub session: Option<&'a SessionRef>,
    pub new_chat: bool,
}

/// Outcome of the automatic add-to-cart attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAction {
    pub success: bool,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<CartItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_count: Option<i64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub cart_total: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

impl CartAction {
    fn added(addition: CartAddition) -> Self {
        let message = format!("Successfully added \"{}\" to your cart!", addition.item.product_name);
        Self {
            success: true,
            action: "added_to_cart",
            product: Some(addition.item),
            cart_count: Some(addition.cart_count),
            cart_total: Some(addition.cart_total),
            error: None,
            message,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            action: "add_to_cart_failed",
            product: None,
            cart_count: None,
            cart_total: None,
            error: Some(error.into()),
            message: "Sorry, I couldn't add that item to your cart automatically.".to_string(),
        }
    }
}

/// The assistant's side of a turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub content: String,
    pub role: ChatRole,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shopify_products: Option<Vec<Product>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_action: Option<CartAction>,
    pub session_id: ChatSessionId,
    pub is_new_session: bool,
    /// The replica was unreachable and `content` is a canned apology.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

// =============================================================================
// ChatService
// =============================================================================

/// Chat orchestrator.
pub struct ChatService<'a> {
    pool: &'a PgPool,
    sensay: &'a SensayClient,
    storefront: &'a StorefrontClient,
    pipeline: &'a Pipeline,
    cart_cache: &'a CartCountCache,
}

impl<'a> ChatService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        sensay: &'a SensayClient,
        storefront: &'a StorefrontClient,
        pipeline: &'a Pipeline,
        cart_cache: &'a CartCountCache,
    ) -> Self {
        Self {
            pool,
            sensay,
            storefront,
            pipeline,
            cart_cache,
        }
    }

    fn chats(&self) -> ChatRepository<'a> {
        ChatRepository::new(self.pool)
    }

    /// Handle one shopper message.
    ///
    /// Replica and storefront failures degrade the reply rather than fail
    /// the turn; so does a failed cart write.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::EmptyMessage` for a blank message,
    /// `ChatError::SessionNotFound`/`SessionForbidden` for a bad session
    /// reference, and `ChatError::Repository` if the exchange cannot be
    /// persisted.
    #[instrument(skip(self, user, turn), fields(user_id = %user.id))]
    pub async fn send(&self, user: &User, turn: ChatTurn<'_>) -> Result<ChatReply, ChatError> {
        let message = turn.message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let (session, is_new_session) = self.resolve_session(user.id, &turn, message).await?;
        let previous_options = if is_new_session {
            Vec::new()
        } else {
            self.chats().last_shown_options(session.id).await?
        };

        let sensay_user_id = match self.ensure_sensay_user(user).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Could not provision conversational AI user");
                None
            }
        };
        let prompt = match sensay_user_id {
            Some(_) => self.prompt_with_cart(user.id, message).await,
            None => message.to_string(),
        };

        let catalog = Catalog::new(self.storefront, self.pipeline.lexicon());
        let store = CartService::new(self.pool, self.cart_cache);
        let Outcome {
            reply,
            degraded,
            replica,
            cart_action,
            products,
            shown_options,
        } = Exchange::new(self.pipeline, self.sensay, &catalog, &store)
            .run(
                user.id,
                sensay_user_id.as_deref(),
                message,
                &prompt,
                &previous_options,
            )
            .await;

        let request = json!({ "message": message, "sessionId": session.id });
        match replica {
            ReplicaCall::Skipped => {}
            ReplicaCall::Answered(response) => {
                self.log_usage(ApiUsageEntry {
                    user_id: user.id,
                    endpoint: "chat",
                    request,
                    response: Some(response),
                    success: true,
                    error_message: None,
                })
                .await;
            }
            ReplicaCall::Failed(error) => {
                self.log_usage(ApiUsageEntry {
                    user_id: user.id,
                    endpoint: "chat",
                    request,
                    response: None,
                    success: false,
                    error_message: Some(error),
                })
                .await;
            }
        }

        let chats = self.chats();
        chats
            .add_message(&NewChatMessage {
                session_id: session.id,
                role: ChatRole::User,
                content: message,
                shopify_products: None,
                shown_options: &[],
            })
            .await?;
        let saved = chats
            .add_message(&NewChatMessage {
                session_id: session.id,
                role: ChatRole::Assistant,
                content: &reply,
                shopify_products: (!products.is_empty()).then_some(products.as_slice()),
                shown_options: &shown_options,
            })
            .await?;
        chats.touch_session(session.id).await?;

        info!(
            session_id = %session.id,
            is_new_session,
            degraded,
            products = products.len(),
            cart_action = cart_action.as_ref().map(|a| a.action),
            "Chat turn completed"
        );

        Ok(ChatReply {
            content: reply,
            role: ChatRole::Assistant,
            timestamp: saved.timestamp,
            shopify_products: (!products.is_empty()).then_some(products),
            cart_action,
            session_id: session.id,
            is_new_session,
            degraded,
        })
    }

    /// Find the turn's session, creating one when asked or when none is given.
    async fn resolve_session(
        &self,
        user_id: UserId,
        turn: &ChatTurn<'_>,
        message: &str,
    ) -> Result<(ChatSession, bool), ChatError> {
        let requested = match turn.session {
            Some(reference) if !turn.new_chat => reference.resolve()?,
            _ => None,
        };

        let Some(session_id) = requested else {
            let session = self
                .chats()
                .create_session(user_id, &session_title(message))
                .await?;
            return Ok((session, true));
        };

        let session = self.owned_session(user_id, session_id).await?;
        Ok((session, false))
    }

    /// An active session that belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::SessionNotFound` for unknown or deleted sessions
    /// and `ChatError::SessionForbidden` for someone else's.
    pub async fn owned_session(
        &self,
        user_id: UserId,
        session_id: ChatSessionId,
    ) -> Result<ChatSession, ChatError> {
        let session = self
            .chats()
            .get_session(session_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or(ChatError::SessionNotFound)?;

        if session.user_id != Some(user_id) {
            warn!(session_id = %session_id, user_id = %user_id, "Session ownership mismatch");
            return Err(ChatError::SessionForbidden);
        }
        Ok(session)
    }

    /// `message`, followed by the live cart when it asks about the cart.
    async fn prompt_with_cart(&self, user_id: UserId, message: &str) -> String {
        if !self.pipeline.lexicon().is_cart_query(message) {
            return message.to_string();
        }
        match CartRepository::new(self.pool).list(user_id).await {
            Ok(items) => format!("{message}{}", cart_context(&items)),
            Err(e) => {
                warn!(error = %e, "Failed to load cart context");
                message.to_string()
            }
        }
    }

    /// The user's conversational AI id, provisioning one on first use.
    async fn ensure_sensay_user(&self, user: &User) -> Result<String, SensayError> {
        if let Some(id) = &user.sensay_user_id {
            return Ok(id.clone());
        }

        let external_id = format!("customer_{}_{}", user.id, Utc::now().timestamp_millis());
        let created = self.sensay.create_user(&external_id).await;
        self.log_usage(ApiUsageEntry {
            user_id: user.id,
            endpoint: "create_user",
            request: json!({ "userId": user.id }),
            response: created
                .as_ref()
                .ok()
                .and_then(|u| serde_json::to_value(u).ok()),
            success: created.is_ok(),
            error_message: created.as_ref().err().map(ToString::to_string),
        })
        .await;
        let created = created?;

        if let Err(e) = UserRepository::new(self.pool)
            .set_sensay_user_id(user.id, &created.id)
            .await
        {
            warn!(error = %e, "Failed to store conversational AI user id");
        }
        info!(user_id = %user.id, "Provisioned conversational AI user");
        Ok(created.id)
    }

    async fn log_usage(&self, entry: ApiUsageEntry<'_>) {
        if let Err(e) = ApiUsageRepository::new(self.pool).record(entry).await {
            warn!(error = %e, "Failed to record API usage");
        }
    }

    // =========================================================================
    // Sessions and History
    // =========================================================================

    /// Create an empty session.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Repository` if the insert fails.
    pub async fn create_session(&self, user_id: UserId) -> Result<ChatSession, ChatError> {
        Ok(self
            .chats()
            .create_session(user_id, DEFAULT_SESSION_TITLE)
            .await?)
    }

    /// The user's active sessions, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Repository` if the query fails.
    pub async fn list_sessions(&self, user_id: UserId) -> Result<Vec<ChatSessionSummary>, ChatError> {
        Ok(self.chats().list_sessions(user_id).await?)
    }

    /// Soft-delete a session of the user.
    ///
    /// # Errors
    ///
    /// See [`Self::owned_session`].
    pub async fn delete_session(
        &self,
        user_id: UserId,
        session_id: ChatSessionId,
    ) -> Result<(), ChatError> {
        self.owned_session(user_id, session_id).await?;
        self.chats()
            .deactivate_session(user_id, session_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ChatError::SessionNotFound,
                other => ChatError::Repository(other),
            })?;
        info!(session_id = %session_id, "Chat session deleted");
        Ok(())
    }

    /// A session of the user together with all of its messages.
    ///
    /// # Errors
    ///
    /// See [`Self::owned_session`].
    pub async fn session_with_messages(
        &self,
        user_id: UserId,
        session_id: ChatSessionId,
    ) -> Result<(ChatSession, Vec<ChatMessage>), ChatError> {
        let session = self.owned_session(user_id, session_id).await?;
        let messages = self.chats().recent_messages(session_id, i64::from(i32::MAX)).await?;
        Ok((session, messages))
    }

    /// The latest `limit` messages, oldest first, of one session or of all
    /// the user's active sessions.
    ///
    /// # Errors
    ///
    /// See [`Self::owned_session`].
    pub async fn history(
        &self,
        user_id: UserId,
        session_id: Option<ChatSessionId>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let chats = self.chats();
        let messages = match session_id {
            Some(id) => {
                self.owned_session(user_id, id).await?;
                chats.recent_messages(id, limit).await?
            }
            None => chats.recent_messages_for_user(user_id, limit).await?,
        };
        Ok(messages)
    }
}

// =============================================================================
// Exchange
// =============================================================================

/// What happened when the replica was asked.
#[derive(Debug)]
pub enum ReplicaCall {
    /// No replica user was available.
    Skipped,
    /// The raw completion, kept for usage logging.
    Answered(serde_json::Value),
    Failed(String),
}

/// Everything a turn produced apart from persistence.
#[derive(Debug)]
pub struct Outcome {
    pub reply: String,
    /// `reply` is the canned apology.
    pub degraded: bool,
    pub replica: ReplicaCall,
    pub cart_action: Option<CartAction>,
    pub products: Vec<Product>,
    /// Options listed by the reply, saved for later selections.
    pub shown_options: Vec<ShownOption>,
}

/// The replica call plus the cart pipeline for one message.
///
/// Nothing here touches sessions or history; a failed cart write only
/// turns into a failed [`CartAction`].
pub struct Exchange<'a, R, S, C> {
    pipeline: &'a Pipeline,
    replica: &'a R,
    search: &'a S,
    store: &'a C,
}

impl<'a, R, S, C> Exchange<'a, R, S, C>
where
    R: Replica + Sync,
    S: ProductSearch + Sync,
    C: CartStore + Sync,
{
    #[must_use]
    pub const fn new(pipeline: &'a Pipeline, replica: &'a R, search: &'a S, store: &'a C) -> Self {
        Self {
            pipeline,
            replica,
            search,
            store,
        }
    }

    /// Ask the replica and act on the exchange.
    ///
    /// Without a `sensay_user_id`, or when the replica fails, the reply is
    /// the fallback and cart detection sees the user message alone.
    pub async fn run(
        &self,
        user_id: UserId,
        sensay_user_id: Option<&str>,
        message: &str,
        prompt: &str,
        previous_options: &[ShownOption],
    ) -> Outcome {
        let (reply, replica) = match sensay_user_id {
            None => (FALLBACK_REPLY.to_string(), ReplicaCall::Skipped),
            Some(id) => match self.replica.complete(id, prompt).await {
                Ok(completion) => {
                    let response = serde_json::to_value(&completion).unwrap_or_default();
                    (completion.content, ReplicaCall::Answered(response))
                }
                Err(e) => {
                    warn!(error = %e, "Conversational AI call failed");
                    (FALLBACK_REPLY.to_string(), ReplicaCall::Failed(e.to_string()))
                }
            },
        };
        let degraded = !matches!(replica, ReplicaCall::Answered(_));
        let detected_reply = if degraded { "" } else { reply.as_str() };

        let cart_action = self
            .add_to_cart(user_id, message, detected_reply, previous_options)
            .await;

        let products = if !degraded && self.pipeline.wants_recommendations(&reply) {
            self.pipeline
                .recommend_products(self.search, message, &reply)
                .await
        } else {
            Vec::new()
        };
        let shown_options = self.pipeline.shown_options(detected_reply, &products);

        Outcome {
            reply,
            degraded,
            replica,
            cart_action,
            products,
            shown_options,
        }
    }

    /// Run the cart pipeline over the exchange.
    async fn add_to_cart(
        &self,
        user_id: UserId,
        message: &str,
        reply: &str,
        previous_options: &[ShownOption],
    ) -> Option<CartAction> {
        let intent = self.pipeline.detect(message, reply);
        if !intent.is_cart_intent {
            return None;
        }

        let Some(candidate) =
            self.pipeline
                .resolve_candidate(intent, message, reply, previous_options)
        else {
            warn!(?intent, "Cart intent without an identifiable product");
            return Some(CartAction::failed("No product could be identified in the message"));
        };

        match add_best_match(
            self.pipeline.lexicon(),
            self.search,
            self.store,
            user_id,
            &candidate,
            message,
        )
        .await
        {
            Ok(addition) => Some(CartAction::added(addition)),
            Err(ReconcileError::Store(e)) => {
                tracing::error!(error = %e, "Cart write failed during auto add");
                Some(CartAction::failed("Could not update your cart"))
            }
            Err(e) => {
                info!(candidate = %candidate.name, error = %e, "No catalog match for candidate");
                Some(CartAction::failed(e.to_string()))
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Title for a session started with `message`.
#[must_use]
pub fn session_title(message: &str) -> String {
    let title = message
        .split_whitespace()
        .take(TITLE_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        return DEFAULT_SESSION_TITLE.to_string();
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        let cut: String = title.chars().take(TITLE_MAX_CHARS).collect();
        return format!("{cut}...");
    }
    title
}

/// Bracketed cart summary appended to a cart question.
#[must_use]
pub fn cart_context(items: &[CartItem]) -> String {
    if items.is_empty() {
        return "\n\n[Current Cart State: Your cart is empty. No items are currently in your cart.]"
            .to_string();
    }

    let details = items
        .iter()
        .map(|item| {
            format!(
                "{} (Qty: {}, {} each)",
                item.product_name,
                item.quantity,
                format_usd(item.price)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    let total: Decimal = items.iter().map(|item| item.total).sum();

    format!(
        "\n\n[Current Cart State: You have {} item(s) in your cart: {details}. Total: {}]",
        items.len(),
        format_usd(total)
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::str::FromStr;
    use std::sync::Mutex;

    use shoppy_core::CartItemId;

    use crate::models::{CartTotals, CartUpsert, NewCartItem};
    use crate::pipeline::Lexicon;
    use crate::sensay::ChatCompletion;
    use crate::shopify::Money;

    fn cart_item(name: &str, price: i64, quantity: i32) -> CartItem {
        let price = Decimal::new(price, 2);
        CartItem {
            id: CartItemId::new(1),
            user_id: UserId::new(1),
            product_id: format!("gid://shopify/Product/{name}"),
            product_name: name.to_string(),
            description: None,
            price,
            quantity,
            total: price * Decimal::from(quantity),
            image_url: None,
            product_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_session_title_short_message() {
        assert_eq!(session_title("  show me  red tees please now "), "show me red tees");
        assert_eq!(session_title("hi"), "hi");
        assert_eq!(session_title("   "), DEFAULT_SESSION_TITLE);
    }

    #[test]
    fn test_session_title_truncates_long_words() {
        let title = session_title("supercalifragilistic expialidocious wardrobe essentials");
        assert_eq!(title, "supercalifragilistic expialido...");
    }

    #[test]
    fn test_session_ref_resolution() {
        assert_eq!(SessionRef::Id(5).resolve().unwrap(), Some(ChatSessionId::new(5)));
        assert_eq!(
            SessionRef::Text("12".to_string()).resolve().unwrap(),
            Some(ChatSessionId::new(12))
        );
        assert_eq!(SessionRef::Text("new-chat".to_string()).resolve().unwrap(), None);
        assert_eq!(SessionRef::Text(String::new()).resolve().unwrap(), None);
        assert!(matches!(
            SessionRef::Text("abc".to_string()).resolve(),
            Err(ChatError::SessionNotFound)
        ));
    }

    #[test]
    fn test_session_ref_accepts_number_or_string() {
        let number: SessionRef = serde_json::from_str("7").unwrap();
        let text: SessionRef = serde_json::from_str("\"new-chat\"").unwrap();
        assert_eq!(number, SessionRef::Id(7));
        assert_eq!(text, SessionRef::Text("new-chat".to_string()));
    }

    #[test]
    fn test_cart_context_empty() {
        assert_eq!(
            cart_context(&[]),
            "\n\n[Current Cart State: Your cart is empty. No items are currently in your cart.]"
        );
    }

    #[test]
    fn test_cart_context_lists_items() {
        let items = vec![
            cart_item("Burgundy V-Neck Tee", 1999, 2),
            cart_item("Olive Chinos", 600, 1),
        ];
        assert_eq!(
            cart_context(&items),
            "\n\n[Current Cart State: You have 2 item(s) in your cart: \
             Burgundy V-Neck Tee (Qty: 2, $19.99 each), Olive Chinos (Qty: 1, $6.00 each). \
             Total: $45.98]"
        );
    }

    #[test]
    fn test_cart_action_shapes() {
        let failed = serde_json::to_value(CartAction::failed("No matching product found for \"X\"")).unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["action"], "add_to_cart_failed");
        assert_eq!(
            failed["message"],
            "Sorry, I couldn't add that item to your cart automatically."
        );
        assert!(failed.get("cartCount").is_none());

        let item = cart_item("Burgundy V-Neck Tee", 1999, 1);
        let added = CartAction::added(CartAddition {
            product: Product {
                id: item.product_id.clone(),
                title: item.product_name.clone(),
                handle: "burgundy-v-neck-tee".to_string(),
                description: String::new(),
                total_inventory: None,
                price: crate::shopify::Money::usd(item.price),
                image_url: None,
                variants: vec![],
            },
            item,
            is_update: false,
            cart_count: 1,
            cart_total: Decimal::new(1999, 2),
        });
        let json = serde_json::to_value(added).unwrap();
        assert_eq!(json["action"], "added_to_cart");
        assert_eq!(json["cartCount"], 1);
        assert_eq!(json["cartTotal"], 19.99);
        assert_eq!(
            json["message"],
            "Successfully added \"Burgundy V-Neck Tee\" to your cart!"
        );
    }

    #[test]
    fn test_reply_omits_degraded_flag_when_false() {
        let reply = ChatReply {
            content: "Hello".to_string(),
            role: ChatRole::Assistant,
            timestamp: Utc::now(),
            shopify_products: None,
            cart_action: None,
            session_id: ChatSessionId::new(3),
            is_new_session: true,
            degraded: false,
        };
        let json = serde_json::to_value(reply).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["sessionId"], 3);
        assert_eq!(json["isNewSession"], true);
        assert!(json.get("degraded").is_none());
        assert!(json.get("cartAction").is_none());
    }

    /// Replica fake: answers with a fixed reply, or fails when there is none.
    struct ScriptedReplica(Option<&'static str>);

    impl Replica for ScriptedReplica {
        async fn complete(&self, _: &str, _: &str) -> Result<ChatCompletion, SensayError> {
            match self.0 {
                Some(content) => Ok(ChatCompletion {
                    success: true,
                    content: content.to_string(),
                }),
                None => Err(SensayError::Declined),
            }
        }
    }

    /// Catalog fake: every product whose title contains a query word.
    struct Shelf(Vec<Product>);

    impl ProductSearch for Shelf {
        async fn search_multiple(&self, text: &str, limit: usize) -> Vec<Product> {
            let words: Vec<String> = text.to_lowercase().split_whitespace().map(String::from).collect();
            self.0
                .iter()
                .filter(|p| {
                    let title = p.title.to_lowercase();
                    words.iter().any(|w| title.contains(w.as_str()))
                })
                .take(limit)
                .cloned()
                .collect()
        }

        fn product_url(&self, handle: &str) -> String {
            format!("https://shop.example/products/{handle}")
        }
    }

    #[derive(Default)]
    struct RecordingCart {
        added: Mutex<Vec<NewCartItem>>,
    }

    impl CartStore for RecordingCart {
        async fn upsert_item(
            &self,
            user_id: UserId,
            item: NewCartItem,
        ) -> Result<CartUpsert, RepositoryError> {
            let mut added = self.added.lock().unwrap();
            let row = CartItem {
                id: CartItemId::new(1),
                user_id,
                product_id: item.product_id.clone(),
                product_name: item.product_name.clone(),
                description: None,
                price: item.price,
                quantity: item.quantity,
                total: item.price * Decimal::from(item.quantity),
                image_url: None,
                product_url: item.product_url.clone(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            added.push(item);
            let totals = CartTotals {
                count: i64::try_from(added.len()).unwrap(),
                total: row.total,
            };
            Ok(CartUpsert {
                item: row,
                is_update: false,
                totals,
            })
        }
    }

    struct BrokenCart;

    impl CartStore for BrokenCart {
        async fn upsert_item(&self, _: UserId, _: NewCartItem) -> Result<CartUpsert, RepositoryError> {
            Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    fn shelf() -> Shelf {
        let product = |id: &str, title: &str, price: &str| Product {
            id: id.to_string(),
            title: title.to_string(),
            handle: title.to_lowercase().replace(' ', "-"),
            description: "Soft cotton.".to_string(),
            total_inventory: Some(10),
            price: Money::usd(Decimal::from_str(price).unwrap()),
            image_url: None,
            variants: vec![],
        };
        Shelf(vec![
            product("gid://p/1", "Navy Hoodie", "45.00"),
            product("gid://p/2", "Burgundy V-Neck Tee", "19.99"),
        ])
    }

    async fn run<C: CartStore + Sync>(
        replica: &ScriptedReplica,
        store: &C,
        sensay_user_id: Option<&str>,
        message: &str,
    ) -> Outcome {
        let pipeline = Pipeline::new(Lexicon::default()).unwrap();
        let shelf = shelf();
        Exchange::new(&pipeline, replica, &shelf, store)
            .run(UserId::new(9), sensay_user_id, message, message, &[])
            .await
    }

    #[tokio::test]
    async fn test_user_intent_adds_matching_product() {
        let cart = RecordingCart::default();
        let outcome = run(
            &ScriptedReplica(Some("Great choice!")),
            &cart,
            Some("sensay-1"),
            "I'll take the navy hoodie",
        )
        .await;

        assert!(!outcome.degraded);
        assert!(matches!(outcome.replica, ReplicaCall::Answered(_)));
        assert_eq!(outcome.reply, "Great choice!");
        let action = outcome.cart_action.unwrap();
        assert!(action.success);
        assert_eq!(action.product.unwrap().product_name, "Navy Hoodie");
        assert_eq!(action.cart_count, Some(1));
        assert_eq!(cart.added.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_cart_write_keeps_reply() {
        let outcome = run(
            &ScriptedReplica(Some("Great choice!")),
            &BrokenCart,
            Some("sensay-1"),
            "I want the navy hoodie",
        )
        .await;

        assert_eq!(outcome.reply, "Great choice!");
        assert!(!outcome.degraded);
        let action = outcome.cart_action.unwrap();
        assert!(!action.success);
        assert_eq!(action.action, "add_to_cart_failed");
        assert_eq!(action.error.as_deref(), Some("Could not update your cart"));
    }

    #[tokio::test]
    async fn test_assistant_confirmation_adds_named_product() {
        let cart = RecordingCart::default();
        let outcome = run(
            &ScriptedReplica(Some("I've added the Burgundy V-Neck Tee to your cart")),
            &cart,
            Some("sensay-1"),
            "sounds good",
        )
        .await;

        let action = outcome.cart_action.unwrap();
        assert!(action.success);
        assert_eq!(action.product.unwrap().product_name, "Burgundy V-Neck Tee");
        assert_eq!(action.cart_total, Some(Decimal::from_str("19.99").unwrap()));
    }

    #[tokio::test]
    async fn test_replica_failure_falls_back_and_reads_user_message() {
        let cart = RecordingCart::default();
        let outcome = run(&ScriptedReplica(None), &cart, Some("sensay-1"), "I want the navy hoodie").await;

        assert!(outcome.degraded);
        assert_eq!(outcome.reply, FALLBACK_REPLY);
        assert!(matches!(outcome.replica, ReplicaCall::Failed(_)));
        assert!(outcome.products.is_empty());
        assert!(outcome.shown_options.is_empty());
        let action = outcome.cart_action.unwrap();
        assert!(action.success);
        assert_eq!(action.product.unwrap().product_name, "Navy Hoodie");
    }

    #[tokio::test]
    async fn test_missing_replica_user_skips_the_call() {
        let cart = RecordingCart::default();
        let outcome = run(&ScriptedReplica(Some("unused")), &cart, None, "what is linen?").await;

        assert!(outcome.degraded);
        assert_eq!(outcome.reply, FALLBACK_REPLY);
        assert!(matches!(outcome.replica, ReplicaCall::Skipped));
        assert!(outcome.cart_action.is_none());
        assert!(cart.added.lock().unwrap().is_empty());
    }
}

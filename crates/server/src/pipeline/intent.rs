//! Cart-intent detection over one chat exchange.

use serde::Serialize;

use super::lexicon::{Lexicon, normalize};

/// Which side of the exchange signalled the intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceHint {
    /// The shopper asked for an item directly.
    User,
    /// The shopper picked an item from a list they were shown.
    Selection,
    /// The assistant said it added (or will add) an item.
    Assistant,
}

/// Outcome of [`IntentDetector::detect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartIntent {
    pub is_cart_intent: bool,
    pub source_hint: Option<SourceHint>,
}

impl CartIntent {
    const NONE: Self = Self {
        is_cart_intent: false,
        source_hint: None,
    };

    const fn from(hint: SourceHint) -> Self {
        Self {
            is_cart_intent: true,
            source_hint: Some(hint),
        }
    }
}

/// Phrase-list cart-intent detector.
///
/// Selection phrases are checked before direct-intent phrases so that
/// "I want the second one" resolves against the shown options; the
/// assistant's reply is only consulted when the user message says nothing.
#[derive(Debug, Clone, Copy)]
pub struct IntentDetector<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> IntentDetector<'a> {
    #[must_use]
    pub const fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    /// Classify one exchange. Never fails; no match yields `is_cart_intent: false`.
    #[must_use]
    pub fn detect(&self, user_message: &str, assistant_reply: &str) -> CartIntent {
        let user = normalize(user_message.trim());

        if !user.is_empty() {
            if self.lexicon.has_selection_phrase(&user) {
                return CartIntent::from(SourceHint::Selection);
            }
            if self.lexicon.has_direct_intent(&user) {
                return CartIntent::from(SourceHint::User);
            }
        }

        if self.lexicon.has_ai_confirmation(&normalize(assistant_reply)) {
            return CartIntent::from(SourceHint::Assistant);
        }

        CartIntent::NONE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn detect(user: &str, reply: &str) -> CartIntent {
        let lexicon = Lexicon::default();
        IntentDetector::new(&lexicon).detect(user, reply)
    }

    #[test]
    fn test_direct_intent_from_user() {
        let intent = detect("I want 1 burgundy t-shirt", "Sure thing!");
        assert!(intent.is_cart_intent);
        assert_eq!(intent.source_hint, Some(SourceHint::User));
    }

    #[test]
    fn test_selection_takes_priority_over_direct_intent() {
        let intent = detect("I want the second one", "");
        assert_eq!(intent.source_hint, Some(SourceHint::Selection));
    }

    #[test]
    fn test_assistant_confirmation_when_user_is_neutral() {
        let intent = detect(
            "that looks nice",
            "I\u{2019}ve added the Burgundy V-Neck Tee to your cart",
        );
        assert!(intent.is_cart_intent);
        assert_eq!(intent.source_hint, Some(SourceHint::Assistant));
    }

    #[test]
    fn test_empty_user_message_never_matches_user_lists() {
        let intent = detect("   ", "Here are some shirts you might like.");
        assert!(!intent.is_cart_intent);
        assert_eq!(intent.source_hint, None);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert!(detect("ADD TO CART please", "").is_cart_intent);
    }

    #[test]
    fn test_no_intent() {
        let intent = detect("what fabrics do you use?", "Mostly cotton and linen.");
        assert_eq!(intent, CartIntent::NONE);
    }

    #[test]
    fn test_adding_phrases_never_turns_detection_off() {
        let mut lexicon = Lexicon::default();
        let before = IntentDetector::new(&lexicon).detect("buy this", "");
        lexicon.direct_intents.push("zzz");
        lexicon.ai_confirmations.push("qqq");
        let after = IntentDetector::new(&lexicon).detect("buy this", "");
        assert!(before.is_cart_intent);
        assert!(after.is_cart_intent);
    }
}

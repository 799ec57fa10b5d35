//! Chat-to-cart pipeline.
//!
//! # Stages
//!
//! 1. [`IntentDetector`] decides whether an exchange asks for a cart add
//!    and which side asked.
//! 2. [`Extractor`] pulls a [`CandidateProduct`] out of the text, trying
//!    the hinted side first.
//! 3. [`reconcile::add_best_match`] matches the candidate to a live product
//!    and upserts it into the cart.
//!
//! Independently, [`Recommender`] decides whether a reply recommends
//! products so the orchestrator can attach live search results.
//!
//! All word lists come from one [`Lexicon`] shared by every stage.

pub mod extract;
pub mod intent;
pub mod lexicon;
pub mod recommend;
pub mod reconcile;

pub use extract::{CandidateProduct, Extractor, Origin, ShownOption};
pub use intent::{CartIntent, IntentDetector, SourceHint};
pub use lexicon::Lexicon;
pub use recommend::{MAX_RECOMMENDED, Recommender};
pub use reconcile::{CartAddition, CartStore, ProductSearch, ReconcileError, add_best_match};

use crate::shopify::Product;

/// Results requested per recommended name.
const PER_NAME_LIMIT: usize = 3;
/// Results requested by the keyword fallback.
const KEYWORD_LIMIT: usize = 5;

/// The lexicon plus the compiled stages built from it.
#[derive(Debug)]
pub struct Pipeline {
    lexicon: Lexicon,
    extractor: Extractor,
    recommender: Recommender,
}

impl Pipeline {
    /// Compile the stages for `lexicon`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern built from the lexicon fails to compile.
    pub fn new(lexicon: Lexicon) -> Result<Self, regex::Error> {
        let extractor = Extractor::new(&lexicon)?;
        let recommender = Recommender::new(&lexicon)?;
        Ok(Self {
            lexicon,
            extractor,
            recommender,
        })
    }

    #[must_use]
    pub const fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    #[must_use]
    pub const fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Classify one exchange.
    #[must_use]
    pub fn detect(&self, user_message: &str, assistant_reply: &str) -> CartIntent {
        IntentDetector::new(&self.lexicon).detect(user_message, assistant_reply)
    }

    /// Find the product the exchange refers to, trying sources in the order
    /// the intent's hint suggests.
    ///
    /// A selection resolves against `previous_options` (the session's last
    /// shown list) and falls back to the numbered lines of the current reply.
    #[must_use]
    pub fn resolve_candidate(
        &self,
        intent: CartIntent,
        user_message: &str,
        assistant_reply: &str,
        previous_options: &[ShownOption],
    ) -> Option<CandidateProduct> {
        let hint = intent.source_hint?;
        if !intent.is_cart_intent {
            return None;
        }

        let from_user = || self.extractor.extract(user_message, Origin::User);
        let from_reply = || self.extractor.extract(assistant_reply, Origin::Assistant);

        match hint {
            SourceHint::Selection => {
                let current;
                let options = if previous_options.is_empty() {
                    current = self.extractor.shown_options(assistant_reply);
                    current.as_slice()
                } else {
                    previous_options
                };
                Extractor::extract_selection(&self.lexicon, user_message, options)
                    .or_else(from_user)
                    .or_else(from_reply)
            }
            SourceHint::User => from_user().or_else(from_reply),
            SourceHint::Assistant => from_reply(),
        }
    }

    /// The options a reply shows, for the next turn's selection lookup:
    /// its numbered priced lines, or else the attached products in order.
    #[must_use]
    pub fn shown_options(&self, reply: &str, attached: &[Product]) -> Vec<ShownOption> {
        let listed = self.extractor.shown_options(reply);
        if !listed.is_empty() {
            return listed;
        }
        attached
            .iter()
            .map(|p| ShownOption {
                name: p.title.clone(),
                price: Some(p.price.amount),
            })
            .collect()
    }

    /// Whether the reply recommends products rather than explaining.
    #[must_use]
    pub fn wants_recommendations(&self, reply: &str) -> bool {
        self.recommender.is_recommendation(reply) && !self.recommender.is_general_information(reply)
    }

    /// Live products for the names recommended in `reply`.
    ///
    /// Each name is searched separately; when fewer than two products turn
    /// up, a keyword search over both messages fills in. Results are
    /// de-duplicated by id and capped at [`MAX_RECOMMENDED`].
    pub async fn recommend_products<S>(
        &self,
        search: &S,
        user_message: &str,
        reply: &str,
    ) -> Vec<Product>
    where
        S: ProductSearch + Sync,
    {
        let mut found: Vec<Product> = Vec::new();
        for name in self.recommender.recommended_names(&self.extractor, reply) {
            found.extend(search.search_multiple(&name, PER_NAME_LIMIT).await);
        }

        if found.len() < 2 {
            let mut keywords = self.lexicon.product_keywords(user_message);
            for keyword in self.lexicon.product_keywords(reply) {
                if !keywords.contains(&keyword) {
                    keywords.push(keyword);
                }
            }
            if !keywords.is_empty() {
                found.extend(search.search_multiple(&keywords.join(" "), KEYWORD_LIMIT).await);
            }
        }

        let mut unique: Vec<Product> = Vec::with_capacity(MAX_RECOMMENDED);
        for product in found {
            if !unique.iter().any(|p| p.id == product.id) {
                unique.push(product);
            }
            if unique.len() == MAX_RECOMMENDED {
                break;
            }
        }
        unique
    }
}

//! Versioned keyword lexicon shared by every pipeline stage.
//!
//! The intent detector, product extractor, storefront search adapter, and
//! chat orchestrator all read their phrase lists from one [`Lexicon`] so
//! the vocabularies cannot drift apart. All matching is case-insensitive
//! substring matching over [`normalize`]d text.

/// Lower-case `text` and fold typographic apostrophes to `'`.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

/// A set of trigger words that expands into a wider list of search terms.
#[derive(Debug, Clone)]
pub struct CategoryExpansion {
    /// Any of these in the query activates the expansion.
    pub triggers: Vec<&'static str>,
    /// Terms searched when the expansion is active.
    pub terms: Vec<&'static str>,
}

impl CategoryExpansion {
    fn new(triggers: &[&'static str], terms: &[&'static str]) -> Self {
        Self {
            triggers: triggers.to_vec(),
            terms: terms.to_vec(),
        }
    }
}

/// The keyword lists driving chat-to-cart detection and product search.
#[derive(Debug, Clone)]
pub struct Lexicon {
    /// Bumped whenever a list changes meaning.
    pub version: u32,
    /// Color words, lower-case.
    pub colors: Vec<&'static str>,
    /// Garment nouns, longest spelling first (`t-shirt` before `shirt`).
    pub product_nouns: Vec<&'static str>,
    /// Neckline and cut words that sit between color and noun.
    pub style_nouns: Vec<&'static str>,
    /// Curated `color noun` pairs recognised anywhere in a user message.
    pub known_products: Vec<&'static str>,
    /// User phrases that ask for something to be added to the cart.
    pub direct_intents: Vec<&'static str>,
    /// User phrases that pick an item from a previously shown list.
    pub selection_phrases: Vec<&'static str>,
    /// Ordinal phrases mapped to a zero-based list position.
    pub ordinals: Vec<(&'static str, usize)>,
    /// Style keywords mapped to a zero-based list position.
    pub style_keywords: Vec<(&'static str, usize)>,
    /// Assistant phrases confirming that something was (or will be) added.
    pub ai_confirmations: Vec<&'static str>,
    /// User phrases asking about the cart contents.
    pub cart_query_keywords: Vec<&'static str>,
    /// Words ignored when building search terms.
    pub stopwords: Vec<&'static str>,
    /// Category expansions used by the search query builder.
    pub category_expansions: Vec<CategoryExpansion>,
    /// Phrases suggesting the assistant is recommending products.
    pub recommendation_phrases: Vec<&'static str>,
    /// Subset of recommendation phrases that are explicit recommendations.
    pub specific_recommendations: Vec<&'static str>,
    /// Words showing the reply is about actual products.
    pub product_indicators: Vec<&'static str>,
    /// Phrases suggesting the assistant is explaining rather than recommending.
    pub general_info_phrases: Vec<&'static str>,
    /// Product category words pulled out of free text as search keywords.
    pub category_keywords: Vec<&'static str>,
}

impl Default for Lexicon {
    #[allow(clippy::too_many_lines)]
    fn default() -> Self {
        Self {
            version: 1,
            colors: vec![
                "burgundy", "red", "blue", "green", "black", "white", "yellow", "pink", "purple",
                "orange", "brown", "gray", "grey", "navy", "olive", "beige", "cream",
            ],
            product_nouns: vec![
                "t-shirt", "tshirt", "tee", "shirt", "dress", "pants", "jeans", "jacket",
                "hoodie", "sweater", "shoes",
            ],
            style_nouns: vec!["v-neck", "crew neck"],
            known_products: vec![
                "burgundy t-shirt",
                "burgundy tee",
                "burgundy shirt",
                "red t-shirt",
                "red tee",
                "red shirt",
                "blue t-shirt",
                "blue tee",
                "blue shirt",
            ],
            direct_intents: vec![
                "add to cart",
                "add this to cart",
                "put in cart",
                "add to bag",
                "buy this",
                "i want this",
                "i'll take it",
                "i'll buy",
                "purchase this",
                "get this",
                "order this",
                "i want to buy",
                "add the",
                "i want the",
                "give me the",
                "i'll get the",
                "i want",
                "i need",
                "get me",
                "give me",
                "i'll take",
            ],
            selection_phrases: vec![
                "first one",
                "second one",
                "third one",
                "number 1",
                "number 2",
                "number 3",
                "1st",
                "2nd",
                "3rd",
                "option 1",
                "option 2",
                "option 3",
                "classic striped",
                "graphic print",
                "denim button",
            ],
            ordinals: vec![
                ("first", 0),
                ("1st", 0),
                ("number 1", 0),
                ("option 1", 0),
                ("second", 1),
                ("2nd", 1),
                ("number 2", 1),
                ("option 2", 1),
                ("third", 2),
                ("3rd", 2),
                ("number 3", 2),
                ("option 3", 2),
            ],
            style_keywords: vec![
                ("classic striped", 0),
                ("striped tee", 0),
                ("graphic print", 1),
                ("graphic", 1),
                ("denim button", 2),
                ("denim", 2),
            ],
            ai_confirmations: vec![
                "added to cart",
                "added to your cart",
                "added one to your cart",
                "i've added",
                "i added",
                "added for you",
                "added it to your cart",
                "successfully added",
                "added to bag",
                "added to basket",
                "make sure that",
                "let's make sure",
                "let's add",
                "let me add",
                "i'll add",
                "i will add",
                "adding to your cart",
                "adding to cart",
                "is added to your cart",
                "is added to cart",
                "has been added",
                "will be added",
                "going to add",
                "about to add",
                "i'll make sure",
                "i will make sure",
                "perfect choice",
                "great pick",
                "excellent choice",
                "good choice",
            ],
            cart_query_keywords: vec![
                "cart",
                "keranjang",
                "bag",
                "basket",
                "how many items",
                "are there any products",
                "do i have anything",
            ],
            stopwords: vec![
                "the", "and", "for", "with", "like", "want", "need", "looking", "show", "find",
                "could", "would", "something", "budget", "range", "prefer", "comfortable",
                "options", "choices", "recommendations",
            ],
            category_expansions: vec![
                CategoryExpansion::new(
                    &["kemeja", "shirt", "t-shirt", "tshirt"],
                    &["shirt", "kemeja", "t-shirt", "tshirt"],
                ),
                CategoryExpansion::new(&["celana", "pants", "jeans"], &["pants", "celana", "jeans"]),
                CategoryExpansion::new(
                    &["sepatu", "shoes", "sneakers"],
                    &["shoes", "sepatu", "sneakers"],
                ),
                CategoryExpansion::new(
                    &["tops", "atasan", "blouse"],
                    &["tops", "atasan", "shirt", "blouse", "t-shirt"],
                ),
                CategoryExpansion::new(
                    &["hoodie", "hoodies", "sweater"],
                    &["hoodie", "hoodies", "sweater"],
                ),
                CategoryExpansion::new(&["polo", "polos"], &["polo", "polos"]),
                CategoryExpansion::new(&["oversized", "loose"], &["oversized", "loose", "relaxed"]),
                CategoryExpansion::new(
                    &["phone", "smartphone", "handphone"],
                    &["phone", "smartphone", "handphone", "mobile"],
                ),
                CategoryExpansion::new(
                    &["laptop", "computer", "notebook"],
                    &["laptop", "computer", "notebook"],
                ),
            ],
            recommendation_phrases: vec![
                "here are", "here's", "i recommend", "i suggest", "check out", "great options",
                "perfect choice", "you might like", "consider", "available", "in stock",
                "we have", "let me show you", "take a look", "browse", "explore", "find",
                "search", "classic", "trendy", "stylish", "popular", "best seller", "$",
                "price", "budget", "affordable", "deal", "sale", "material", "color", "size",
                "style", "design", "1.", "2.", "3.", "•", "-", "option", "choice",
            ],
            specific_recommendations: vec![
                "here are",
                "i recommend",
                "i suggest",
                "check out",
                "great options",
                "perfect choice",
                "you might like",
                "consider",
                "available",
                "in stock",
                "we have",
                "let me show you",
                "take a look",
                "browse",
                "explore",
                "find",
                "search",
            ],
            product_indicators: vec![
                "shirt", "shirts", "jeans", "dress", "shoes", "jacket", "laptop", "phone",
                "watch", "bag", "headphones", "denim", "leather", "wireless", "bluetooth",
            ],
            general_info_phrases: vec![
                "made from",
                "known for",
                "gentle on",
                "throughout the day",
                "all day",
                "during the day",
                "whether you choose",
                "if you choose",
                "when you choose",
                "do you have a preference",
                "which one do you prefer",
                "prefer",
                "depends",
                "in terms of",
                "style and occasion",
                "suit your style",
                "what you're looking for",
                "what you are looking for",
            ],
            category_keywords: vec![
                "phone", "laptop", "computer", "tablet", "watch", "headphones", "earbuds",
                "clothes", "clothing", "shirt", "pants", "shoes", "dress", "jacket", "jeans",
                "sweater", "hoodie", "book", "camera", "speaker", "television", "monitor",
                "bag", "backpack", "wallet", "sunglasses", "jewelry", "necklace", "ring",
                "kitchen", "furniture", "chair", "table", "electronics", "gadget",
                "accessories", "charger", "cable", "casual", "formal", "trendy", "stylish",
            ],
        }
    }
}

fn any_in(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| haystack.contains(phrase))
}

impl Lexicon {
    /// Whether `lower` contains a direct add-to-cart phrase.
    #[must_use]
    pub fn has_direct_intent(&self, lower: &str) -> bool {
        any_in(lower, &self.direct_intents)
    }

    /// Whether `lower` contains a selection phrase.
    #[must_use]
    pub fn has_selection_phrase(&self, lower: &str) -> bool {
        any_in(lower, &self.selection_phrases)
    }

    /// Whether `lower` contains an assistant cart confirmation.
    #[must_use]
    pub fn has_ai_confirmation(&self, lower: &str) -> bool {
        any_in(lower, &self.ai_confirmations)
    }

    /// Whether a user message asks about the cart.
    #[must_use]
    pub fn is_cart_query(&self, message: &str) -> bool {
        any_in(&normalize(message), &self.cart_query_keywords)
    }

    /// Colors mentioned in `text`, in lexicon order.
    #[must_use]
    pub fn colors_in(&self, text: &str) -> Vec<&'static str> {
        let lower = normalize(text);
        self.colors
            .iter()
            .copied()
            .filter(|color| lower.contains(color))
            .collect()
    }

    /// Garment nouns mentioned in `text`, in lexicon order.
    #[must_use]
    pub fn nouns_in(&self, text: &str) -> Vec<&'static str> {
        let lower = normalize(text);
        self.product_nouns
            .iter()
            .copied()
            .filter(|noun| lower.contains(noun))
            .collect()
    }

    /// Zero-based list position named by an ordinal phrase.
    #[must_use]
    pub fn ordinal_index(&self, lower: &str) -> Option<usize> {
        self.ordinals
            .iter()
            .find(|(phrase, _)| lower.contains(phrase))
            .map(|&(_, index)| index)
    }

    /// Zero-based list position named by a style keyword.
    #[must_use]
    pub fn style_index(&self, lower: &str) -> Option<usize> {
        self.style_keywords
            .iter()
            .find(|(phrase, _)| lower.contains(phrase))
            .map(|&(_, index)| index)
    }

    /// Whether `word` is a search stopword.
    #[must_use]
    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(&word)
    }

    /// Lower-case words longer than two characters that are not stopwords.
    #[must_use]
    pub fn significant_terms(&self, text: &str) -> Vec<String> {
        normalize(text)
            .split_whitespace()
            .filter(|word| word.chars().count() > 2 && !self.is_stopword(word))
            .map(String::from)
            .collect()
    }

    /// Category keywords and double-quoted phrases found in `text`, deduplicated.
    #[must_use]
    pub fn product_keywords(&self, text: &str) -> Vec<String> {
        let lower = normalize(text);
        let mut keywords: Vec<String> = self
            .category_keywords
            .iter()
            .filter(|category| lower.contains(*category))
            .map(|category| (*category).to_string())
            .collect();

        for quoted in text.split('"').skip(1).step_by(2) {
            let quoted = quoted.trim();
            if !quoted.is_empty() && !keywords.iter().any(|k| k == quoted) {
                keywords.push(quoted.to_string());
            }
        }

        keywords
    }

    /// List sizes, for diagnostics.
    #[must_use]
    pub fn stats(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("colors", self.colors.len()),
            ("product_nouns", self.product_nouns.len()),
            ("style_nouns", self.style_nouns.len()),
            ("known_products", self.known_products.len()),
            ("direct_intents", self.direct_intents.len()),
            ("selection_phrases", self.selection_phrases.len()),
            ("ordinals", self.ordinals.len()),
            ("style_keywords", self.style_keywords.len()),
            ("ai_confirmations", self.ai_confirmations.len()),
            ("cart_query_keywords", self.cart_query_keywords.len()),
            ("stopwords", self.stopwords.len()),
            ("category_expansions", self.category_expansions.len()),
            ("recommendation_phrases", self.recommendation_phrases.len()),
            ("specific_recommendations", self.specific_recommendations.len()),
            ("product_indicators", self.product_indicators.len()),
            ("general_info_phrases", self.general_info_phrases.len()),
            ("category_keywords", self.category_keywords.len()),
        ]
    }
}

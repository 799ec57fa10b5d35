//! Product-name extraction from free chat text.
//!
//! Each origin has an ordered list of [`Strategy`] values; the first one
//! that produces a name wins. Nothing here is authoritative about price:
//! a scraped price is only a hint for picking between search results.

use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::lexicon::{Lexicon, normalize};

/// Which side of the conversation a text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Assistant,
}

/// A product name pulled out of chat text, not yet matched to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProduct {
    pub name: String,
    /// Price hint scraped from the text; zero when none was present.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// The text fragment the name was taken from.
    pub origin: String,
}

/// One entry of a list the assistant showed to the shopper, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShownOption {
    pub name: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
}

#[derive(Debug)]
enum Strategy {
    /// `<color> [style] <noun>` captured in groups 1-3, title-cased.
    ColorNoun { label: &'static str, regex: Regex },
    /// A curated `color noun` pair anywhere in the text, title-cased.
    KnownProduct,
    /// An assistant phrasing whose first capture group is the name.
    Phrase { label: &'static str, regex: Regex },
    /// A bare mention where the whole match is the name.
    Mention { label: &'static str, regex: Regex },
    /// The first bulleted or numbered line carrying a price.
    PricedLine,
}

impl Strategy {
    const fn label(&self) -> &'static str {
        match self {
            Self::KnownProduct => "known_product",
            Self::ColorNoun { label, .. }
            | Self::Phrase { label, .. }
            | Self::Mention { label, .. } => *label,
            Self::PricedLine => "priced_line",
        }
    }

    fn apply(&self, extractor: &Extractor, text: &str) -> Option<CandidateProduct> {
        match self {
            Self::ColorNoun { regex, .. } => {
                let caps = regex.captures(text)?;
                let name = [caps.get(1), caps.get(2), caps.get(3)]
                    .into_iter()
                    .flatten()
                    .map(|m| title_case(&m.as_str().split_whitespace().collect::<Vec<_>>().join(" ")))
                    .collect::<Vec<_>>()
                    .join(" ");
                Some(CandidateProduct {
                    name,
                    price: Decimal::ZERO,
                    origin: caps.get(0)?.as_str().to_string(),
                })
            }
            Self::KnownProduct => {
                let lower = normalize(text);
                let known = extractor
                    .known_products
                    .iter()
                    .find(|product| lower.contains(*product))?;
                Some(CandidateProduct {
                    name: title_case(known),
                    price: Decimal::ZERO,
                    origin: (*known).to_string(),
                })
            }
            Self::Phrase { regex, .. } => {
                let caps = regex.captures(text)?;
                let name = clean_name(caps.get(1)?.as_str());
                (!name.is_empty()).then(|| CandidateProduct {
                    name,
                    price: Decimal::ZERO,
                    origin: caps.get(0).map_or("", |m| m.as_str()).to_string(),
                })
            }
            Self::Mention { regex, .. } => {
                let found = regex.find(text)?;
                Some(CandidateProduct {
                    name: clean_name(found.as_str()),
                    price: Decimal::ZERO,
                    origin: found.as_str().to_string(),
                })
            }
            Self::PricedLine => text.lines().find_map(|line| {
                let option = extractor.parse_priced_line(line)?;
                Some(CandidateProduct {
                    name: option.name,
                    price: option.price.unwrap_or(Decimal::ZERO),
                    origin: line.trim().to_string(),
                })
            }),
        }
    }
}

/// Ordered-strategy product extractor built from a [`Lexicon`].
#[derive(Debug)]
pub struct Extractor {
    user_strategies: Vec<Strategy>,
    assistant_strategies: Vec<Strategy>,
    known_products: Vec<&'static str>,
    price: Regex,
    list_marker: Regex,
    bold: Regex,
}

impl Extractor {
    /// Compile the extraction patterns for `lexicon`.
    ///
    /// # Errors
    ///
    /// Returns `regex::Error` if a lexicon entry produces an invalid pattern.
    pub fn new(lexicon: &Lexicon) -> Result<Self, regex::Error> {
        let colors = alternation(&lexicon.colors);
        let nouns = alternation(&lexicon.product_nouns);
        let styles = alternation(&lexicon.style_nouns);
        let name = format!(r"[A-Za-z][A-Za-z\- ]*?\b(?:{nouns})\b");

        let color_noun = format!(r"({colors})\s+(?:({styles})\s+)?({nouns})\b");
        let user_strategies = vec![
            Strategy::ColorNoun {
                label: "intent_color_noun",
                regex: Regex::new(&format!(
                    r"(?i)\b(?:i want|i need|get me|give me|i'll take|i'll get|i'll buy|add|buy|order)\s+(?:(?:1|one|a|an|the|this|that)\s+)?{color_noun}"
                ))?,
            },
            Strategy::KnownProduct,
            Strategy::ColorNoun {
                label: "color_noun",
                regex: Regex::new(&format!(r"(?i)\b{color_noun}"))?,
            },
        ];

        let phrase = |label, pattern: String| -> Result<Strategy, regex::Error> {
            Ok(Strategy::Phrase {
                label,
                regex: Regex::new(&pattern)?,
            })
        };
        let mention = |label, pattern: String| -> Result<Strategy, regex::Error> {
            Ok(Strategy::Mention {
                label,
                regex: Regex::new(&pattern)?,
            })
        };

        let assistant_strategies = vec![
            phrase(
                "make_sure",
                format!(
                    r"(?i)(?:let's make sure that|make sure that|make sure the|let's add|let me add)\s+(?:the\s+)?({name})\s+(?:is|are|will be|gets|going to be)\s+added"
                ),
            )?,
            phrase(
                "is_added",
                format!(
                    r"(?i)\b(?:the|a)\s+({name})\s+(?:is|are|has been|have been)\s+(?:now\s+)?added"
                ),
            )?,
            phrase(
                "i_added",
                format!(
                    r"(?i)\b(?:i've added|i have added|i added|i'll add|i will add)\s+(?:(?:the|a|an)\s+)?({name})"
                ),
            )?,
            phrase(
                "added_article",
                format!(r"(?i)\badded\s+(?:the|a|an)\s+({name})"),
            )?,
            phrase(
                "praise_then_added",
                format!(
                    r"(?i)(?:perfect choice|great pick|excellent choice|good choice)[^\n]*?\badded\s+(?:(?:the|a|an)\s+)?({name})"
                ),
            )?,
            mention(
                "color_style_noun",
                format!(r"(?i)\b(?:{colors})\s+(?:{styles})\s+(?:{nouns})\b"),
            )?,
            mention(
                "color_noun",
                format!(r"(?i)\b(?:{colors})\s+(?:{nouns})\b"),
            )?,
            phrase("bold", r"\*\*([^*\n]+)\*\*".to_string())?,
            phrase(
                "trailing_added",
                format!(r"(?i)\b({name})\s+(?:is|are|will be|has been)\s+added"),
            )?,
            Strategy::PricedLine,
        ];

        Ok(Self {
            user_strategies,
            assistant_strategies,
            known_products: lexicon.known_products.clone(),
            price: Regex::new(r"\$(\d+(?:\.\d{1,2})?)")?,
            list_marker: Regex::new(r"^(?:\d+[.)]|[-•*])\s*")?,
            bold: Regex::new(r"\*\*([^*\n]+)\*\*")?,
        })
    }

    /// Run the strategies for `origin` over `text`; first success wins.
    #[must_use]
    pub fn extract(&self, text: &str, origin: Origin) -> Option<CandidateProduct> {
        let text = fold_apostrophes(text);
        let strategies = match origin {
            Origin::User => &self.user_strategies,
            Origin::Assistant => &self.assistant_strategies,
        };

        strategies.iter().find_map(|strategy| {
            let candidate = strategy.apply(self, &text)?;
            tracing::debug!(
                strategy = strategy.label(),
                name = %candidate.name,
                "Extracted product candidate"
            );
            Some(candidate)
        })
    }

    /// Resolve a selection ("the second one", "the denim one") against shown options.
    ///
    /// Ordinal phrases win; otherwise the option sharing the most words with
    /// the message; otherwise a style keyword's fixed position.
    #[must_use]
    pub fn extract_selection(
        lexicon: &Lexicon,
        user_message: &str,
        options: &[ShownOption],
    ) -> Option<CandidateProduct> {
        if options.is_empty() {
            return None;
        }
        let lower = normalize(user_message);

        let index = lexicon
            .ordinal_index(&lower)
            .or_else(|| best_overlap(&lower, options))
            .or_else(|| lexicon.style_index(&lower))?;

        let option = options.get(index)?;
        Some(CandidateProduct {
            name: option.name.clone(),
            price: option.price.unwrap_or(Decimal::ZERO),
            origin: user_message.trim().to_string(),
        })
    }

    /// Numbered `$`-priced lines of a reply, in display order.
    #[must_use]
    pub fn shown_options(&self, text: &str) -> Vec<ShownOption> {
        text.lines()
            .filter(|line| {
                line.trim_start()
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit())
            })
            .filter_map(|line| self.parse_priced_line(line))
            .collect()
    }

    /// Bulleted or numbered `$`-priced lines of a reply, in display order.
    #[must_use]
    pub fn priced_lines(&self, text: &str) -> Vec<ShownOption> {
        text.lines()
            .filter_map(|line| self.parse_priced_line(line))
            .collect()
    }

    /// `**bold**` spans of a reply, trimmed.
    #[must_use]
    pub fn bold_spans(&self, text: &str) -> Vec<String> {
        self.bold
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|span| !span.is_empty())
            .collect()
    }

    /// Parse `1. Name - $19.99` or `• **Name** $19.99` into an option.
    ///
    /// Lines without a `$`, without a list marker or dash, or with an empty
    /// name yield `None`.
    fn parse_priced_line(&self, line: &str) -> Option<ShownOption> {
        let trimmed = line.trim();
        let dollar = trimmed.find('$')?;
        let has_marker = self.list_marker.is_match(trimmed);
        if !has_marker && !trimmed.contains('-') && !trimmed.contains('•') {
            return None;
        }

        let head = trimmed.get(..dollar)?;
        let head = self.list_marker.replace(head, "");
        let name = clean_name(
            head.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | '—' | ':' | '(')),
        );
        if name.is_empty() {
            return None;
        }

        let price = self
            .price
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .and_then(|m| Decimal::from_str(m.as_str()).ok());

        Some(ShownOption { name, price })
    }
}

/// Index of the option whose name shares the most significant words with `lower`.
fn best_overlap(lower: &str, options: &[ShownOption]) -> Option<usize> {
    options
        .iter()
        .enumerate()
        .map(|(index, option)| {
            let score = normalize(&option.name)
                .split(|c: char| !c.is_alphanumeric())
                .filter(|word| word.len() > 2 && lower.contains(word))
                .count();
            (index, score)
        })
        .filter(|&(_, score)| score > 0)
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(index, _)| index)
}

fn alternation(words: &[&str]) -> String {
    words
        .iter()
        .map(|word| regex::escape(word).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|")
}

fn fold_apostrophes(text: &str) -> String {
    text.replace(['\u{2019}', '\u{2018}'], "'")
}

/// Strip markdown emphasis, leading articles, and surrounding punctuation.
fn clean_name(raw: &str) -> String {
    let name = raw.replace("**", "");
    let name = name.trim().trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '_'));
    let lower = name.to_lowercase();
    let name = ["the ", "a ", "an "]
        .iter()
        .find(|article| lower.starts_with(*article))
        .and_then(|article| name.get(article.len()..))
        .unwrap_or(name);
    name.trim().to_string()
}

/// `burgundy t-shirt` -> `Burgundy T-Shirt`.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut upper_next = true;
    for c in text.chars() {
        if upper_next {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        upper_next = c == ' ' || c == '-';
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LISTING: &str = "Here are three tees you might like:\n\
        1. Classic Striped Tee - $24.99\n\
        2. Graphic Print Tee - $19.99\n\
        3. Denim Button Shirt - $39.99\n\
        Let me know which one you like!";

    fn extractor() -> Extractor {
        Extractor::new(&Lexicon::default()).unwrap()
    }

    fn name(text: &str, origin: Origin) -> Option<String> {
        extractor().extract(text, origin).map(|c| c.name)
    }

    #[test]
    fn test_user_color_noun_is_title_cased() {
        let candidate = extractor()
            .extract("I want 1 burgundy t-shirt", Origin::User)
            .unwrap();
        assert_eq!(candidate.name, "Burgundy T-Shirt");
        assert_eq!(candidate.price, Decimal::ZERO);

        assert_eq!(
            name("i want 1 burgundy tee", Origin::User).as_deref(),
            Some("Burgundy Tee")
        );
        assert_eq!(
            name("GIVE ME ONE RED SHIRT", Origin::User).as_deref(),
            Some("Red Shirt")
        );
    }

    #[test]
    fn test_user_intent_phrasings_with_articles() {
        assert_eq!(
            name("I'll take the navy hoodie", Origin::User).as_deref(),
            Some("Navy Hoodie")
        );
        assert_eq!(
            name("Add a black jacket to my cart", Origin::User).as_deref(),
            Some("Black Jacket")
        );
        assert_eq!(
            name("I want the green dress", Origin::User).as_deref(),
            Some("Green Dress")
        );
        assert_eq!(
            name("i\u{2019}ll get the white shoes", Origin::User).as_deref(),
            Some("White Shoes")
        );
    }

    #[test]
    fn test_user_color_style_noun_keeps_style() {
        assert_eq!(
            name("can I order a red v-neck tee?", Origin::User).as_deref(),
            Some("Red V-Neck Tee")
        );
    }

    #[test]
    fn test_user_color_noun_anywhere_in_message() {
        assert_eq!(
            name("that olive sweater looks great, put it in my bag", Origin::User).as_deref(),
            Some("Olive Sweater")
        );
    }

    #[test]
    fn test_user_known_product_without_intent_verb() {
        assert_eq!(
            name("is the blue tee still around?", Origin::User).as_deref(),
            Some("Blue Tee")
        );
    }

    #[test]
    fn test_user_message_without_product() {
        assert_eq!(name("hello there", Origin::User), None);
    }

    #[test]
    fn test_assistant_i_have_added() {
        assert_eq!(
            name(
                "I\u{2019}ve added the Burgundy V-Neck Tee to your cart",
                Origin::Assistant
            )
            .as_deref(),
            Some("Burgundy V-Neck Tee")
        );
    }

    #[test]
    fn test_assistant_make_sure() {
        assert_eq!(
            name(
                "Let's make sure that the Red Crew Neck Tee is added to your cart.",
                Origin::Assistant
            )
            .as_deref(),
            Some("Red Crew Neck Tee")
        );
    }

    #[test]
    fn test_assistant_now_added() {
        assert_eq!(
            name(
                "Great news! The Olive Utility Jacket is now added to your cart.",
                Origin::Assistant
            )
            .as_deref(),
            Some("Olive Utility Jacket")
        );
    }

    #[test]
    fn test_assistant_bold_span() {
        assert_eq!(
            name("You'll love the **Classic Striped Tee**!", Origin::Assistant).as_deref(),
            Some("Classic Striped Tee")
        );
    }

    #[test]
    fn test_assistant_priced_line_fallback() {
        let candidate = extractor().extract(LISTING, Origin::Assistant).unwrap();
        assert_eq!(candidate.name, "Classic Striped Tee");
        assert_eq!(candidate.price, Decimal::new(2499, 2));
    }

    #[test]
    fn test_assistant_without_product() {
        assert_eq!(name("How can I help you today?", Origin::Assistant), None);
    }

    #[test]
    fn test_shown_options_keep_display_order() {
        let options = extractor().shown_options(LISTING);
        let names: Vec<_> = options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Classic Striped Tee", "Graphic Print Tee", "Denim Button Shirt"]
        );
        assert_eq!(options[2].price, Some(Decimal::new(3999, 2)));
    }

    #[test]
    fn test_priced_lines_accept_bullets_and_bold() {
        let options = extractor().priced_lines("• **Linen Shirt** - $45\nplain text $5");
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].name, "Linen Shirt");
        assert_eq!(options[0].price, Some(Decimal::new(45, 0)));
    }

    #[test]
    fn test_selection_by_ordinal() {
        let ex = extractor();
        let options = ex.shown_options(LISTING);
        let candidate =
            Extractor::extract_selection(&Lexicon::default(), "I'll take the second one", &options)
                .unwrap();
        assert_eq!(candidate.name, "Graphic Print Tee");
        assert_eq!(candidate.price, Decimal::new(1999, 2));
    }

    #[test]
    fn test_selection_by_name_overlap() {
        let ex = extractor();
        let options = ex.shown_options(LISTING);
        let candidate =
            Extractor::extract_selection(&Lexicon::default(), "the denim one please", &options)
                .unwrap();
        assert_eq!(candidate.name, "Denim Button Shirt");
    }

    #[test]
    fn test_selection_out_of_range_or_empty() {
        let lexicon = Lexicon::default();
        let options = vec![ShownOption {
            name: "Only Tee".to_string(),
            price: None,
        }];
        assert!(Extractor::extract_selection(&lexicon, "the third one", &options).is_none());
        assert!(Extractor::extract_selection(&lexicon, "the first one", &[]).is_none());
    }

    #[test]
    fn test_bold_spans() {
        let spans = extractor().bold_spans("Try **Slim Jeans** or ** Wide Pants **.");
        assert_eq!(spans, vec!["Slim Jeans", "Wide Pants"]);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("burgundy t-shirt"), "Burgundy T-Shirt");
        assert_eq!(title_case("RED crew neck"), "Red Crew Neck");
    }

    #[test]
    fn test_clean_name_strips_articles_and_markdown() {
        assert_eq!(clean_name(" the **Navy Hoodie** "), "Navy Hoodie");
        assert_eq!(clean_name("An Olive Jacket"), "Olive Jacket");
    }
}

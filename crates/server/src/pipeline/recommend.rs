//! Decide whether an assistant reply recommends products, and which ones.

use regex::Regex;

use super::extract::Extractor;
use super::lexicon::{Lexicon, normalize};

/// Most product names taken from one reply.
pub const MAX_RECOMMENDED: usize = 5;

/// Heuristic classifier for assistant replies.
#[derive(Debug)]
pub struct Recommender {
    recommendation_phrases: Vec<&'static str>,
    specific_recommendations: Vec<&'static str>,
    product_indicators: Vec<&'static str>,
    general_info_phrases: Vec<&'static str>,
    numbered_list: Regex,
    price_mention: Regex,
    quoted_shirt: Regex,
    bold: Regex,
}

impl Recommender {
    /// Build a recommender from the lexicon's recommendation lists.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in pattern fails to compile.
    pub fn new(lexicon: &Lexicon) -> Result<Self, regex::Error> {
        Ok(Self {
            recommendation_phrases: lexicon.recommendation_phrases.clone(),
            specific_recommendations: lexicon.specific_recommendations.clone(),
            product_indicators: lexicon.product_indicators.clone(),
            general_info_phrases: lexicon.general_info_phrases.clone(),
            numbered_list: Regex::new(r"\d+\.\s+[A-Za-z]|[•\-]\s+[A-Za-z]")?,
            price_mention: Regex::new(r"(?i)\$\d+|rp\s*\d+|price")?,
            quoted_shirt: Regex::new(r#"(?i)"[^"]*shirt[^"]*""#)?,
            bold: Regex::new(r"\*\*[^*]+\*\*")?,
        })
    }

    /// Whether `reply` reads like it is pointing the shopper at products.
    #[must_use]
    pub fn is_recommendation(&self, reply: &str) -> bool {
        let lower = normalize(reply);
        let contains_any = |list: &[&str]| list.iter().any(|p| lower.contains(p));

        let indicator = contains_any(&self.product_indicators);
        let specific = contains_any(&self.specific_recommendations);
        let phrase = contains_any(&self.recommendation_phrases);
        let listed = self.numbered_list.is_match(reply);
        let priced = self.price_mention.is_match(reply);
        let named = self.bold.is_match(reply) || self.quoted_shirt.is_match(reply);

        (specific && indicator) || (listed && indicator) || (priced && indicator) || (named && phrase)
    }

    /// Whether `reply` explains, compares or asks for a preference instead
    /// of recommending.
    #[must_use]
    pub fn is_general_information(&self, reply: &str) -> bool {
        let lower = normalize(reply);
        if self.general_info_phrases.iter().any(|p| lower.contains(p)) {
            return true;
        }

        let both = lower.contains("both");
        let explaining = both
            && (lower.contains(" are ") || lower.contains(" is "))
            && (lower.contains("made from") || lower.contains("known for"));
        let comparing = both
            && lower.contains("but")
            && (lower.contains("depends") || lower.contains("prefer"));

        explaining || comparing
    }

    /// Product names recommended in `reply`: priced list lines first, then
    /// bold spans, de-duplicated case-insensitively, at most [`MAX_RECOMMENDED`].
    #[must_use]
    pub fn recommended_names(&self, extractor: &Extractor, reply: &str) -> Vec<String> {
        let listed = extractor.priced_lines(reply).into_iter().map(|o| o.name);
        let bold = extractor
            .bold_spans(reply)
            .into_iter()
            .filter(|span| (4..100).contains(&span.chars().count()));

        let mut names: Vec<String> = Vec::new();
        for name in listed.chain(bold) {
            let key = name.to_lowercase();
            if !names.iter().any(|n| n.to_lowercase() == key) {
                names.push(name);
            }
            if names.len() == MAX_RECOMMENDED {
                break;
            }
        }
        names
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fixtures() -> (Recommender, Extractor) {
        let lexicon = Lexicon::default();
        (
            Recommender::new(&lexicon).unwrap(),
            Extractor::new(&lexicon).unwrap(),
        )
    }

    const LISTING: &str = "Here are a few tees:\n\
        1. Burgundy V-Neck Tee - $19.99\n\
        2. Classic White Crew Tee - $15.00\n\
        3. Navy Pocket Tee - $22.50";

    #[test]
    fn test_numbered_price_list_is_a_recommendation() {
        let (recommender, _) = fixtures();
        assert!(recommender.is_recommendation("I recommend these shirts: 1. Red Tee - $20"));
    }

    #[test]
    fn test_small_talk_is_not_a_recommendation() {
        let (recommender, _) = fixtures();
        assert!(!recommender.is_recommendation("Hello! How can I help you today?"));
    }

    #[test]
    fn test_bold_name_with_phrase_is_a_recommendation() {
        let (recommender, _) = fixtures();
        assert!(recommender.is_recommendation("Check out the **Aurora Runner**."));
    }

    #[test]
    fn test_material_explanation_is_general_information() {
        let (recommender, _) = fixtures();
        assert!(recommender.is_general_information(
            "Both tees are made from organic cotton and feel soft."
        ));
        assert!(recommender.is_general_information(
            "Both work well, but it depends on the occasion."
        ));
        assert!(!recommender.is_general_information("Here are two shirts: 1. Red Tee - $20"));
    }

    #[test]
    fn test_recommended_names_from_list() {
        let (recommender, extractor) = fixtures();
        let names = recommender.recommended_names(&extractor, LISTING);
        assert_eq!(
            names,
            vec![
                "Burgundy V-Neck Tee",
                "Classic White Crew Tee",
                "Navy Pocket Tee"
            ]
        );
    }

    #[test]
    fn test_recommended_names_dedupes_and_caps() {
        let (recommender, extractor) = fixtures();
        let reply = "1. **Red Tee** - $10\n**red tee** is great. Also **Blue Tee**, **Green Tee**, \
                     **Black Tee**, **White Tee**, **Pink Tee** and **Ok**.";
        let names = recommender.recommended_names(&extractor, reply);
        assert_eq!(names.len(), MAX_RECOMMENDED);
        assert_eq!(names.first().unwrap(), "Red Tee");
        assert!(!names.iter().any(|n| n == "Ok"));
    }
}

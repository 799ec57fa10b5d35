//! Storefront search query construction.
//!
//! Shopify's product search matches substrings of titles and exact tags
//! only, so one free-text request fans out into several alternative
//! queries whose results are merged by the client.

use crate::pipeline::lexicon::{Lexicon, normalize};

/// Most alternative queries issued for one request.
pub const MAX_QUERIES: usize = 8;

/// Most significant words used by a single query.
const MAX_TERMS: usize = 3;

/// `(title:*a* OR title:*b*) OR (tag:a OR tag:b)`
fn title_or_tag(terms: &[&str]) -> String {
    let titles = terms
        .iter()
        .map(|t| format!("title:*{t}*"))
        .collect::<Vec<_>>()
        .join(" OR ");
    let tags = terms
        .iter()
        .map(|t| format!("tag:{t}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("({titles}) OR ({tags})")
}

/// The most targeted single query for `text`.
///
/// Category expansions win; otherwise up to three significant words;
/// otherwise the first word as a title substring.
#[must_use]
pub fn primary_query(lexicon: &Lexicon, text: &str) -> String {
    let clean = normalize(text.trim());

    let mut expanded: Vec<&str> = Vec::new();
    for expansion in &lexicon.category_expansions {
        if expansion.triggers.iter().any(|t| clean.contains(t)) {
            for term in &expansion.terms {
                if !expanded.contains(term) {
                    expanded.push(term);
                }
            }
        }
    }
    if !expanded.is_empty() {
        return title_or_tag(&expanded);
    }

    let terms = lexicon.significant_terms(&clean);
    if !terms.is_empty() {
        let terms: Vec<&str> = terms.iter().take(MAX_TERMS).map(String::as_str).collect();
        return title_or_tag(&terms);
    }

    let first = clean.split_whitespace().next().unwrap_or_default();
    format!("title:*{first}*")
}

/// Alternative queries for `text`, most specific first, de-duplicated and
/// capped at [`MAX_QUERIES`].
#[must_use]
pub fn build_search_queries(lexicon: &Lexicon, text: &str) -> Vec<String> {
    let clean = normalize(text.trim());
    let terms = lexicon.significant_terms(&clean);
    let mut queries = vec![primary_query(lexicon, text)];

    queries.extend(
        terms
            .iter()
            .take(MAX_TERMS)
            .map(|term| format!("title:*{term}* OR tag:{term}")),
    );

    let colors = lexicon.colors_in(&clean);
    let nouns = lexicon.nouns_in(&clean);
    for color in &colors {
        for noun in &nouns {
            queries.push(format!("title:*{color}*{noun}* OR title:*{noun}*{color}*"));
        }
    }

    if ["shirt", "tee", "t-shirt"].iter().any(|w| clean.contains(w)) {
        queries.push("title:*shirt* OR title:*tee* OR title:*t-shirt*".to_string());
    }
    if ["pants", "jeans"].iter().any(|w| clean.contains(w)) {
        queries.push("title:*pants* OR title:*jeans*".to_string());
    }

    if let Some(first) = terms.first() {
        queries.push(format!("title:*{first}*"));
    }

    let mut unique: Vec<String> = Vec::with_capacity(queries.len());
    for query in queries {
        if !unique.contains(&query) {
            unique.push(query);
        }
    }
    unique.truncate(MAX_QUERIES);
    unique
}

/// Per-query page size so that all queries together ask for about `limit`.
#[must_use]
pub fn per_query_limit(limit: usize, queries: usize) -> usize {
    if queries == 0 {
        return limit;
    }
    limit.div_ceil(queries).max(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_query_uses_category_expansion() {
        let lexicon = Lexicon::default();
        let query = primary_query(&lexicon, "Looking for a T-Shirt");
        assert_eq!(
            query,
            "(title:*shirt* OR title:*kemeja* OR title:*t-shirt* OR title:*tshirt*) OR \
             (tag:shirt OR tag:kemeja OR tag:t-shirt OR tag:tshirt)"
        );
    }

    #[test]
    fn test_primary_query_falls_back_to_significant_words() {
        let lexicon = Lexicon::default();
        assert_eq!(
            primary_query(&lexicon, "the linen scarf with tassels please"),
            "(title:*linen* OR title:*scarf* OR title:*tassels*) OR \
             (tag:linen OR tag:scarf OR tag:tassels)"
        );
    }

    #[test]
    fn test_primary_query_last_resort_is_first_word() {
        let lexicon = Lexicon::default();
        assert_eq!(primary_query(&lexicon, "go on"), "title:*go*");
    }

    #[test]
    fn test_color_noun_pairs_and_broad_category() {
        let lexicon = Lexicon::default();
        let queries = build_search_queries(&lexicon, "burgundy tee");
        assert!(queries.contains(&"title:*burgundy*tee* OR title:*tee*burgundy*".to_string()));
        assert!(queries.contains(&"title:*shirt* OR title:*tee* OR title:*t-shirt*".to_string()));
        assert!(queries.contains(&"title:*burgundy* OR tag:burgundy".to_string()));
    }

    #[test]
    fn test_queries_are_unique_and_capped() {
        let lexicon = Lexicon::default();
        let queries = build_search_queries(
            &lexicon,
            "red blue green black white t-shirt jeans pants dress",
        );
        assert!(queries.len() <= MAX_QUERIES);
        let mut sorted = queries.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), queries.len());
    }

    #[test]
    fn test_single_word_does_not_repeat_queries() {
        let lexicon = Lexicon::default();
        let queries = build_search_queries(&lexicon, "scarf");
        assert_eq!(
            queries,
            vec![
                "(title:*scarf*) OR (tag:scarf)".to_string(),
                "title:*scarf* OR tag:scarf".to_string(),
                "title:*scarf*".to_string(),
            ]
        );
    }

    #[test]
    fn test_per_query_limit() {
        assert_eq!(per_query_limit(5, 3), 2);
        assert_eq!(per_query_limit(3, 8), 1);
        assert_eq!(per_query_limit(4, 0), 4);
    }
}

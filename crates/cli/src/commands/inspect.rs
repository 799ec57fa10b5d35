//! Offline inspection of the chat-to-cart pipeline.

use serde::Serialize;

use shoppy_server::pipeline::{CandidateProduct, CartIntent, Lexicon, Pipeline, ShownOption};

/// Everything the pipeline decides about one exchange without touching the
/// network.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub lexicon_version: u32,
    pub intent: CartIntent,
    pub candidate: Option<CandidateProduct>,
    pub shown_options: Vec<ShownOption>,
    pub wants_recommendations: bool,
}

/// Run detection and extraction over one exchange.
///
/// # Errors
///
/// Returns an error if a lexicon pattern fails to compile.
pub fn analyze(user: &str, assistant: &str) -> Result<Detection, regex::Error> {
    let pipeline = Pipeline::new(Lexicon::default())?;
    let intent = pipeline.detect(user, assistant);
    let candidate = pipeline.resolve_candidate(intent, user, assistant, &[]);

    Ok(Detection {
        lexicon_version: pipeline.lexicon().version,
        intent,
        candidate,
        shown_options: pipeline.shown_options(assistant, &[]),
        wants_recommendations: pipeline.wants_recommendations(assistant),
    })
}

/// Print the lexicon version and the size of each list.
#[allow(clippy::print_stdout)]
pub fn lexicon() {
    let lexicon = Lexicon::default();
    println!("Lexicon version {}", lexicon.version);
    for (name, size) in lexicon.stats() {
        println!("  {name:<28} {size:>4}");
    }
}

/// Print the pipeline's decision for one exchange as JSON.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be built or the result cannot be
/// serialized.
#[allow(clippy::print_stdout)]
pub fn detect(user: &str, assistant: &str) -> Result<(), Box<dyn std::error::Error>> {
    let detection = analyze(user, assistant)?;
    println!("{}", serde_json::to_string_pretty(&detection)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_request_is_detected() {
        let detection = analyze("I want 1 burgundy t-shirt", "Great choice!").unwrap();
        assert!(detection.intent.is_cart_intent);
        assert_eq!(detection.candidate.unwrap().name, "Burgundy T-Shirt");
    }

    #[test]
    fn test_small_talk_is_ignored() {
        let detection = analyze("hello there", "Hi! How can I help you today?").unwrap();
        assert!(!detection.intent.is_cart_intent);
        assert!(detection.candidate.is_none());
    }
}

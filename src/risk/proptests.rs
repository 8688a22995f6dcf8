//! Property-based tests for the risk rule
//!
//! - No denylist phrase: never at risk, whatever the sentiment
//! - Phrase present but sentiment not negative: never at risk
//! - Phrase present and sentiment negative: always at risk
//! - Matching ignores case

use super::{is_risky, RiskPhrases, Sentiment, DEFAULT_RISK_PHRASES};
use proptest::prelude::*;

fn arb_sentiment() -> impl Strategy<Value = Sentiment> {
    prop::sample::select(Sentiment::ALL.to_vec())
}

fn arb_non_negative() -> impl Strategy<Value = Sentiment> {
    prop::sample::select(vec![
        Sentiment::Positive,
        Sentiment::Neutral,
        Sentiment::Mixed,
    ])
}

fn arb_phrase() -> impl Strategy<Value = &'static str> {
    prop::sample::select(DEFAULT_RISK_PHRASES.to_vec())
}

/// Filler text around a phrase: lower/upper letters, digits, punctuation
fn arb_filler() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.!?¿¡]{0,40}"
}

/// Randomly flip the case of each char
fn arb_recased(phrase: &'static str) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<bool>(), phrase.chars().count()).prop_map(move |upper| {
        phrase
            .chars()
            .zip(upper)
            .map(|(c, up)| {
                if up {
                    c.to_uppercase().collect::<String>()
                } else {
                    c.to_string()
                }
            })
            .collect()
    })
}

/// Text that contains a (possibly re-cased) denylist phrase
fn arb_risky_text() -> impl Strategy<Value = String> {
    (arb_filler(), arb_phrase().prop_flat_map(arb_recased), arb_filler())
        .prop_map(|(before, phrase, after)| format!("{before}{phrase}{after}"))
}

fn classify(phrases: &RiskPhrases, sentiment: Sentiment, text: &str) -> bool {
    is_risky(Some(sentiment), phrases.find_in(text))
}

proptest! {
    #[test]
    fn text_without_phrase_is_never_at_risk(
        text in arb_filler(),
        sentiment in arb_sentiment(),
    ) {
        let phrases = RiskPhrases::default();
        prop_assume!(phrases.find_in(&text).is_none());
        prop_assert!(!classify(&phrases, sentiment, &text));
    }

    #[test]
    fn phrase_without_negative_sentiment_is_not_at_risk(
        text in arb_risky_text(),
        sentiment in arb_non_negative(),
    ) {
        let phrases = RiskPhrases::default();
        prop_assert!(!classify(&phrases, sentiment, &text));
    }

    #[test]
    fn phrase_with_negative_sentiment_is_at_risk(text in arb_risky_text()) {
        let phrases = RiskPhrases::default();
        prop_assert!(classify(&phrases, Sentiment::Negative, &text));
    }

    #[test]
    fn matching_ignores_case(phrase in arb_phrase(), upper in any::<bool>()) {
        let phrases = RiskPhrases::default();
        let text = if upper { phrase.to_uppercase() } else { phrase.to_string() };
        prop_assert!(phrases.find_in(&text).is_some());
    }

    #[test]
    fn failed_classification_is_never_at_risk(text in arb_risky_text()) {
        let phrases = RiskPhrases::default();
        prop_assert!(!is_risky(None, phrases.find_in(&text)));
    }
}

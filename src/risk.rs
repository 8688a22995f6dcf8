//! Crisis-risk screening of user messages
//!
//! A message is flagged only when the sentiment classifier calls it
//! negative AND it contains one of the denylisted risk phrases. Either
//! signal alone is not enough.

#[cfg(test)]
mod proptests;

use crate::runtime::SentimentClassifier;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Phrases shipped with the companion, used when no denylist file is given
pub const DEFAULT_RISK_PHRASES: &[&str] = &[
    "suicidio",
    "quitarme la vida",
    "ya no puedo",
    "me quiero morir",
    "desaparecer",
    "autolesión",
];

/// Categorical sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Sentiment {
    #[cfg(test)]
    pub const ALL: [Sentiment; 4] = [
        Sentiment::Positive,
        Sentiment::Negative,
        Sentiment::Neutral,
        Sentiment::Mixed,
    ];

    /// Parse the upper-case label used on the wire (`NEGATIVE`, ...)
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "POSITIVE" => Some(Self::Positive),
            "NEGATIVE" => Some(Self::Negative),
            "NEUTRAL" => Some(Self::Neutral),
            "MIXED" => Some(Self::Mixed),
            _ => None,
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
            Self::Mixed => "MIXED",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    #[error("Sentiment classifier not configured")]
    NotConfigured,
    #[error("Sentiment classifier timed out after {0:?}")]
    Timeout(Duration),
    #[error("Sentiment request failed: {0}")]
    Request(String),
    #[error("Unknown sentiment label: {0}")]
    UnknownLabel(String),
}

/// Denylist of risk phrases, matched case-insensitively as substrings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskPhrases {
    phrases: Vec<String>,
}

impl RiskPhrases {
    /// Phrases are trimmed and lower-cased; blanks and duplicates are
    /// dropped, first occurrence wins.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for phrase in phrases {
            let phrase = phrase.as_ref().trim().to_lowercase();
            if !phrase.is_empty() && !out.contains(&phrase) {
                out.push(phrase);
            }
        }
        Self { phrases: out }
    }

    /// Parse a denylist file: one phrase per line, `#` starts a comment line
    pub fn parse(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        std::fs::read_to_string(path).map(|contents| Self::parse(&contents))
    }

    /// First denylisted phrase contained in `text`, if any
    pub fn find_in(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.iter().find(|phrase| lowered.contains(phrase))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.phrases.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

impl Default for RiskPhrases {
    fn default() -> Self {
        Self::new(DEFAULT_RISK_PHRASES)
    }
}

/// The risk rule itself: negative sentiment and a denylist hit, both required
pub fn is_risky(sentiment: Option<Sentiment>, matched_phrase: Option<&str>) -> bool {
    sentiment == Some(Sentiment::Negative) && matched_phrase.is_some()
}

/// Outcome of screening one user message
#[derive(Debug, Clone, Default)]
pub struct RiskAssessment {
    pub at_risk: bool,
    /// None when the classifier failed
    pub sentiment: Option<Sentiment>,
    pub matched_phrase: Option<String>,
    /// Set when the classifier failed; the message is then treated as not at risk
    pub classifier_error: Option<String>,
}

/// Combines the sentiment classifier with the denylist
pub struct RiskDetector {
    classifier: Arc<dyn SentimentClassifier>,
    phrases: RiskPhrases,
    timeout: Duration,
}

impl RiskDetector {
    pub fn new(
        classifier: Arc<dyn SentimentClassifier>,
        phrases: RiskPhrases,
        timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            phrases,
            timeout,
        }
    }

    pub fn phrases(&self) -> &RiskPhrases {
        &self.phrases
    }

    #[allow(dead_code)] // Boolean form of `assess`
    pub async fn is_at_risk(&self, text: &str) -> bool {
        self.assess(text).await.at_risk
    }

    /// Screen one message. A classifier failure fails open (not at risk)
    /// and is logged and reported in the assessment.
    pub async fn assess(&self, text: &str) -> RiskAssessment {
        let sentiment = match timeout(self.timeout, self.classifier.classify(text)).await {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout(self.timeout)),
        };
        let matched_phrase = self.phrases.find_in(text).map(str::to_string);

        match sentiment {
            Ok(sentiment) => RiskAssessment {
                at_risk: is_risky(Some(sentiment), matched_phrase.as_deref()),
                sentiment: Some(sentiment),
                matched_phrase,
                classifier_error: None,
            },
            Err(e) => {
                tracing::error!(
                    error = %e,
                    phrase_matched = matched_phrase.is_some(),
                    "Sentiment classification failed, treating message as not at risk"
                );
                RiskAssessment {
                    at_risk: false,
                    sentiment: None,
                    matched_phrase,
                    classifier_error: Some(e.to_string()),
                }
            }
        }
    }
}

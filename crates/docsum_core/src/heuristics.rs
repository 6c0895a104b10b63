//! crates/docsum_core/src/heuristics.rs
//!
//! Keyword and sentence heuristics that turn raw summary text into suggestions
//! and key points. Pure and deterministic, no I/O.

use crate::domain::{KeyPoint, Suggestion, SuggestionCategory};

const MIN_SENTENCE_CHARS: usize = 20;
const MAX_KEY_POINTS: usize = 3;
const FALLBACK_PREVIEW_CHARS: usize = 100;
const FALLBACK_IMPORTANCE: u8 = 3;

/// A keyword family: any matching term emits the family's suggestion once.
struct KeywordFamily {
    terms: &'static [&'static str],
    action: &'static str,
    category: SuggestionCategory,
}

// Checked in this order; each family is independent of the others.
const FAMILIES: [KeywordFamily; 3] = [
    KeywordFamily {
        terms: &["conformité", "réglementation"],
        action: "Vérifier la conformité réglementaire",
        category: SuggestionCategory::Important,
    },
    KeywordFamily {
        terms: &["échéance", "deadline", "date limite"],
        action: "Planifier les échéances importantes",
        category: SuggestionCategory::Urgent,
    },
    KeywordFamily {
        terms: &["procédure", "processus"],
        action: "Réviser les procédures internes",
        category: SuggestionCategory::Normal,
    },
];

const DEFAULT_ACTION: &str = "Analyser les informations du document";

/// The output of [`derive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derived {
    pub suggestions: Vec<Suggestion>,
    pub key_points: Vec<KeyPoint>,
}

/// Derives suggestions and key points from a summary.
pub fn derive(summary: &str) -> Derived {
    Derived {
        suggestions: suggestions(summary),
        key_points: key_points(summary),
    }
}

fn suggestions(summary: &str) -> Vec<Suggestion> {
    let lowered = summary.to_lowercase();
    let mut found: Vec<Suggestion> = FAMILIES
        .iter()
        .filter(|family| family.terms.iter().any(|term| lowered.contains(term)))
        .map(|family| Suggestion {
            action: family.action.to_string(),
            category: family.category,
        })
        .collect();

    if found.is_empty() {
        found.push(Suggestion {
            action: DEFAULT_ACTION.to_string(),
            category: SuggestionCategory::Normal,
        });
    }
    found
}

fn key_points(summary: &str) -> Vec<KeyPoint> {
    let points: Vec<KeyPoint> = summary
        .split(|c: char| c == '.' || c == '!' || c == '?')
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .take(MAX_KEY_POINTS)
        .enumerate()
        .map(|(i, sentence)| KeyPoint {
            text: sentence.to_string(),
            importance: 5u8.saturating_sub(i as u8).max(3),
        })
        .collect();

    if !points.is_empty() {
        return points;
    }

    let preview: String = summary.chars().take(FALLBACK_PREVIEW_CHARS).collect();
    vec![KeyPoint {
        text: format!("{}...", preview),
        importance: FALLBACK_IMPORTANCE,
    }]
}

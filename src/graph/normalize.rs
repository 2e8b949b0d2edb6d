//! Entity-name canonicalization
//!
//! One real-world concept must map to exactly one graph node, or traversal
//! fragments: "SVMs", "svm" and "support vector machine" reaching three
//! different nodes would hide every cross-paper connection between them.
//! Canonical form is lowercase, singular, whitespace-collapsed, with known
//! abbreviations expanded. Extraction applies this before node creation;
//! the retrieval core trusts the result and never re-normalizes.

use super::node::{NodeId, NodeKind};

/// Known abbreviation → canonical expansion pairs.
///
/// Matched against the whole normalized mention, not substrings. Extend as
/// the extraction vocabulary grows; entries must themselves be canonical
/// (lowercase, singular).
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("svm", "support vector machine"),
    ("cnn", "convolutional neural network"),
    ("rnn", "recurrent neural network"),
    ("lstm", "long short-term memory"),
    ("gan", "generative adversarial network"),
    ("nlp", "natural language processing"),
    ("ner", "named entity recognition"),
    ("knn", "k-nearest neighbor"),
    ("pca", "principal component analysis"),
    ("rl", "reinforcement learning"),
    ("hmm", "hidden markov model"),
    ("crf", "conditional random field"),
];

/// Words that look plural but must not be singularized.
const PLURAL_EXCEPTIONS: &[&str] =
    &["bias", "analysis", "corpus", "consensus", "loss", "class", "series"];

/// Normalize a raw entity mention to its canonical name.
///
/// Lowercases, collapses internal whitespace, trims punctuation, expands a
/// known abbreviation, and singularizes the final word.
pub fn canonical_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let cleaned: Vec<&str> = lowered
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '-'))
        .filter(|w| !w.is_empty())
        .collect();
    let joined = cleaned.join(" ");

    // Hyphens are dropped for abbreviation matching so "k-NN" meets "knn".
    let lookup = singularize(&joined.replace('-', ""));
    let expanded = ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| *abbr == lookup)
        .map(|(_, full)| (*full).to_string())
        .unwrap_or(joined);

    // Singularize only the head noun (the final word).
    match expanded.rsplit_once(' ') {
        Some((rest, last)) => format!("{} {}", rest, singularize(last)),
        None => singularize(&expanded),
    }
}

/// Build the stable node id for an entity mention.
pub fn entity_id(kind: NodeKind, raw: &str) -> NodeId {
    NodeId::from_string(format!("{}:{}", kind.as_str(), canonical_name(raw)))
}

fn singularize(word: &str) -> String {
    if PLURAL_EXCEPTIONS.contains(&word) {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        if stem.len() > 1 {
            return format!("{}y", stem);
        }
    }
    if let Some(stem) = word.strip_suffix("sses") {
        return format!("{}ss", stem);
    }
    if let Some(stem) = word.strip_suffix('s') {
        // "ss", "us", "is" endings are not plural markers.
        if !stem.ends_with('s') && !stem.ends_with('u') && !stem.ends_with('i') && stem.len() > 1 {
            return stem.to_string();
        }
    }
    word.to_string()
}

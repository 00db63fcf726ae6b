//! String similarity between local SKUs and master SKUs.
//!
//! All metrics compare *normalized* strings: lowercase, every
//! non-alphanumeric character turned into a space, whitespace collapsed.
//! Scores are integers 0-100.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

/// Scoring seam for the matcher. Implement this to plug in a
/// deployment-specific metric.
pub trait Similarity: Send + Sync {
    fn score(&self, local_sku: &str, msku: &str) -> u8;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Edit-distance ratio of the normalized strings.
    Ratio,
    /// Tokens sorted alphabetically, then `Ratio`.
    TokenSortRatio,
    /// Best ratio between shared tokens and each side's remainder.
    TokenSetRatio,
    JaroWinkler,
}

impl Default for Metric {
    fn default() -> Self {
        Self::TokenSortRatio
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ratio => write!(f, "ratio"),
            Self::TokenSortRatio => write!(f, "token_sort_ratio"),
            Self::TokenSetRatio => write!(f, "token_set_ratio"),
            Self::JaroWinkler => write!(f, "jaro_winkler"),
        }
    }
}

impl Similarity for Metric {
    fn score(&self, local_sku: &str, msku: &str) -> u8 {
        let a = normalize(local_sku);
        let b = normalize(msku);
        let sim = match self {
            Self::Ratio => ratio(&a, &b),
            Self::TokenSortRatio => ratio(&sort_tokens(&a), &sort_tokens(&b)),
            Self::TokenSetRatio => token_set(&a, &b),
            Self::JaroWinkler => {
                if a.is_empty() || b.is_empty() {
                    0.0
                } else {
                    jaro_winkler(&a, &b)
                }
            }
        };
        to_score(sim)
    }
}

/// Lowercase, punctuation to spaces, collapse whitespace.
pub fn normalize(s: &str) -> String {
    let mapped: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn to_score(sim: f64) -> u8 {
    (sim * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Empty input never matches anything, including another empty input.
fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(a, b)
}

fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn token_set(a: &str, b: &str) -> f64 {
    let left: BTreeSet<&str> = a.split_whitespace().collect();
    let right: BTreeSet<&str> = b.split_whitespace().collect();

    let shared = join(left.intersection(&right).copied().collect());
    let left_rest = join(left.difference(&right).copied().collect());
    let right_rest = join(right.difference(&left).copied().collect());

    let with_left = concat(&shared, &left_rest);
    let with_right = concat(&shared, &right_rest);

    ratio(&shared, &with_left)
        .max(ratio(&shared, &with_right))
        .max(ratio(&with_left, &with_right))
}

fn join(tokens: Vec<&str>) -> String {
    tokens.join(" ")
}

fn concat(a: &str, b: &str) -> String {
    format!("{a} {b}").trim().to_string()
}

//! Product-name extraction from the text leading up to a price.

use std::collections::HashSet;
use std::ops::Range;

/// Maximum number of tokens kept in a product label.
pub const MAX_NAME_TOKENS: usize = 5;
/// Length of the fallback label, in characters.
pub const FALLBACK_NAME_CHARS: usize = 50;

/// Derives a short "what is being sold" label.
///
/// Posts in the target languages usually name the product right before the
/// price, after some promotional lead-in, so the label is built from the
/// last few meaningful tokens before the price span.
#[derive(Debug, Clone)]
pub struct ProductNameExtractor {
    stop_words: HashSet<String>,
}

impl ProductNameExtractor {
    pub fn new<S: AsRef<str>>(stop_words: &[S]) -> Self {
        Self {
            stop_words: stop_words
                .iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Extract a label from `text`, looking only before `price_span` when
    /// one is given.
    pub fn extract(&self, text: &str, price_span: Option<Range<usize>>) -> String {
        let before_price = match price_span {
            Some(span) => text.get(..span.start).unwrap_or(text),
            None => text,
        }
        .trim();

        let kept: Vec<&str> = before_price
            .split_whitespace()
            .filter(|word| self.is_meaningful(word))
            .collect();

        let start = kept.len().saturating_sub(MAX_NAME_TOKENS);
        let name = kept[start..].join(" ");

        if name.is_empty() {
            return before_price
                .chars()
                .take(FALLBACK_NAME_CHARS)
                .collect::<String>()
                .trim()
                .to_string();
        }
        name
    }

    fn is_meaningful(&self, word: &str) -> bool {
        word.chars().count() > 1 && !self.stop_words.contains(&word.to_lowercase())
    }
}

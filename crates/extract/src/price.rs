//! Price and currency recognition.
//!
//! A price token is either a thousands-grouped number (`1,200`, `1.200.000`)
//! or a plain digit run (`1500`), optionally followed by a fractional tail
//! (`.50`). It may be preceded by a currency marker and followed by either a
//! currency marker or a `k`/`K` magnitude suffix, never both.
//!
//! Grouping and decimal separators are not told apart: without a magnitude
//! suffix every `,` and `.` is dropped, so `120.50` reads as `12050`.

use crate::ExtractError;
use regex::Regex;
use std::ops::Range;
use tracing::debug;

/// Power of ten applied by the `k`/`K` suffix.
const MAGNITUDE_FACTOR_EXP: i32 = 3;

/// A recognized price.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatch {
    pub price: f64,
    /// Explicit marker found next to the number, as written in the text.
    pub currency: Option<String>,
    /// Byte range of the whole match, leading marker included.
    pub span: Range<usize>,
}

/// Scans normalized text for the authoritative price mention.
#[derive(Debug, Clone)]
pub struct PriceRecognizer {
    pattern: Regex,
}

impl PriceRecognizer {
    /// Build a recognizer for the given currency markers.
    ///
    /// Markers are matched literally and case-insensitively, in the order
    /// given.
    pub fn new<S: AsRef<str>>(markers: &[S]) -> Result<Self, ExtractError> {
        let alternatives: Vec<String> = markers
            .iter()
            .map(|m| m.as_ref().trim())
            .filter(|m| !m.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            return Err(ExtractError::EmptyMarkerSet);
        }

        let markers = alternatives.join("|");
        let pattern = Regex::new(&format!(
            r"(?i)(?:(?P<pre>{markers})\s*)?(?P<int>\d{{1,3}}(?:[,.]\d{{3}})+|\d+)(?P<frac>[.,]\d+)?(?:\s*(?:(?P<post>{markers})|(?P<kilo>k)))?"
        ))?;

        Ok(Self { pattern })
    }

    /// Recognize the last price token in `text`.
    ///
    /// Returns `None` when no token matches or the chosen token does not
    /// parse as a number.
    pub fn recognize(&self, text: &str) -> Option<PriceMatch> {
        let caps = self.pattern.captures_iter(text).last()?;
        let whole = caps.get(0)?;

        let int_digits = strip_separators(caps.name("int")?.as_str());
        let frac_digits = caps
            .name("frac")
            .map(|m| strip_separators(m.as_str()))
            .unwrap_or_default();

        let price = if caps.name("kilo").is_some() {
            scaled_price(&int_digits, &frac_digits)
        } else {
            parse_digits(&format!("{int_digits}{frac_digits}"))
        };

        let Some(price) = price else {
            debug!(token = whole.as_str(), "Discarding malformed price token");
            return None;
        };

        let currency = caps
            .name("pre")
            .or_else(|| caps.name("post"))
            .map(|m| m.as_str().trim().to_string());

        Some(PriceMatch {
            price,
            currency,
            span: whole.range(),
        })
    }
}

fn strip_separators(token: &str) -> String {
    token.chars().filter(|c| *c != ',' && *c != '.').collect()
}

/// Parse a string of ASCII digits. Digits of other scripts are rejected.
fn parse_digits(digits: &str) -> Option<f64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<f64>().ok()
}

/// Value of a `k`-suffixed token. The fractional tail is kept as a decimal
/// fraction here (`1.2k` is 1200).
fn scaled_price(int_digits: &str, frac_digits: &str) -> Option<f64> {
    let value = parse_digits(&format!("{int_digits}{frac_digits}"))?;
    let exp = MAGNITUDE_FACTOR_EXP - frac_digits.len() as i32;
    if exp >= 0 {
        Some(value * 10f64.powi(exp))
    } else {
        Some(value / 10f64.powi(-exp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExtractorConfig;
    use pretty_assertions::assert_eq;

    fn recognizer() -> PriceRecognizer {
        PriceRecognizer::new(&ExtractorConfig::default().currency_markers).unwrap()
    }

    #[test]
    fn test_grouped_price_with_trailing_marker() {
        let text = "iPhone 15 Pro Max بسعر 4,500 ريال سعودي";
        let m = recognizer().recognize(text).unwrap();
        assert_eq!(m.price, 4500.0);
        assert_eq!(m.currency.as_deref(), Some("ريال"));
        assert_eq!(&text[m.span.clone()], "4,500 ريال");
    }

    #[test]
    fn test_separators_always_discarded() {
        let r = recognizer();
        assert_eq!(r.recognize("1.200").unwrap().price, 1200.0);
        assert_eq!(r.recognize("1,200").unwrap().price, 1200.0);
        assert_eq!(r.recognize("1200").unwrap().price, 1200.0);
        assert_eq!(r.recognize("1.200.000,50").unwrap().price, 120000050.0);

        let m = r.recognize("ليغلق عند 120.50$").unwrap();
        assert_eq!(m.price, 12050.0);
        assert_eq!(m.currency.as_deref(), Some("$"));
    }

    #[test]
    fn test_plain_digit_run_is_one_token() {
        let r = recognizer();
        assert_eq!(r.recognize("سعر المنتج هو 1500").unwrap().price, 1500.0);

        let m = r.recognize("BTC الآن بـ 65000 دولار أمريكي").unwrap();
        assert_eq!(m.price, 65000.0);
        assert_eq!(m.currency, None);
    }

    #[test]
    fn test_magnitude_suffix() {
        let r = recognizer();

        let m = r.recognize("السعر النهائي 1.2k").unwrap();
        assert_eq!(m.price, 1200.0);
        assert_eq!(m.currency, None);

        assert_eq!(r.recognize("only 15K").unwrap().price, 15000.0);
        assert_eq!(r.recognize("only 250 k").unwrap().price, 250000.0);
        assert_eq!(r.recognize("1,5k").unwrap().price, 1500.0);
    }

    #[test]
    fn test_magnitude_suffix_keeps_prefix_currency() {
        let m = recognizer().recognize("كاميرا $ 3k").unwrap();
        assert_eq!(m.price, 3000.0);
        assert_eq!(m.currency.as_deref(), Some("$"));
    }

    #[test]
    fn test_magnitude_suffix_after_thousands_group() {
        let r = recognizer();
        // A three-digit tail is a thousands group, shorter tails are decimals.
        assert_eq!(r.recognize("1.20k").unwrap().price, 1200.0);
        assert_eq!(r.recognize("1.200k").unwrap().price, 1_200_000.0);
    }

    #[test]
    fn test_prefix_marker_wins_over_suffix_marker() {
        let m = recognizer().recognize("price: $ 300 USD").unwrap();
        assert_eq!(m.price, 300.0);
        assert_eq!(m.currency.as_deref(), Some("$"));
    }

    #[test]
    fn test_prefix_marker_is_part_of_span() {
        let text = "سماعات EUR 99";
        let m = recognizer().recognize(text).unwrap();
        assert_eq!(m.currency.as_deref(), Some("EUR"));
        assert_eq!(&text[..m.span.start], "سماعات ");
    }

    #[test]
    fn test_markers_case_insensitive() {
        let m = recognizer().recognize("laptop 900 usd").unwrap();
        assert_eq!(m.currency.as_deref(), Some("usd"));
    }

    #[test]
    fn test_dotted_marker() {
        let m = recognizer().recognize("هاتف سامسونج S24، السعر: 3,200 د.إ").unwrap();
        assert_eq!(m.price, 3200.0);
        assert_eq!(m.currency.as_deref(), Some("د.إ"));
    }

    #[test]
    fn test_rightmost_match_wins() {
        let m = recognizer().recognize("كان 500 ريال والآن 350 ريال").unwrap();
        assert_eq!(m.price, 350.0);
    }

    #[test]
    fn test_no_price() {
        let r = recognizer();
        assert_eq!(r.recognize("عرض خاص اليوم فقط"), None);
        assert_eq!(r.recognize(""), None);
        assert_eq!(r.recognize("$ USD"), None);
    }

    #[test]
    fn test_foreign_script_digits_fail_soft() {
        // Devanagari digits are `\d` but not ASCII.
        assert_eq!(recognizer().recognize("कीमत १२००"), None);
    }

    #[test]
    fn test_empty_marker_set_rejected() {
        let markers: [&str; 2] = ["", "  "];
        assert!(matches!(
            PriceRecognizer::new(&markers),
            Err(ExtractError::EmptyMarkerSet)
        ));
    }
}

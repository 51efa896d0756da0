//! Extraction orchestrator: raw message text to `(product, price, currency)`.

use crate::digits::normalize_digits;
use crate::price::PriceRecognizer;
use crate::product::ProductNameExtractor;
use crate::ExtractError;
use compact_str::CompactString;
use deal_core::Extraction;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration consumed by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Currency code used when the text has no explicit marker.
    pub default_currency: String,
    /// Recognized currency markers (symbols and words).
    pub currency_markers: Vec<String>,
    /// Marketing filler dropped from product names.
    pub stop_words: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            default_currency: "SAR".to_string(),
            currency_markers: [
                "$", "ريال", "جنيه", "د.إ", "درهم", "د.ك", "دينار", "يورو", "EUR", "USD", "SAR",
                "EGP",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            stop_words: [
                "عرض", "سعر", "صفقة", "خصم", "الآن", "فقط", "جديد", "للبيع", "بـ", "بسعر",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Two-stage rule-based extractor.
#[derive(Debug, Clone)]
pub struct Extractor {
    prices: PriceRecognizer,
    names: ProductNameExtractor,
    default_currency: CompactString,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractError> {
        let default_currency = config.default_currency.trim();
        if default_currency.is_empty() {
            return Err(ExtractError::EmptyDefaultCurrency);
        }

        Ok(Self {
            prices: PriceRecognizer::new(&config.currency_markers)?,
            names: ProductNameExtractor::new(&config.stop_words),
            default_currency: CompactString::from(default_currency),
        })
    }

    /// Extract a structured price from a message.
    ///
    /// `None` means the message carries no usable price (or no usable
    /// product label) and should be skipped.
    pub fn extract(&self, raw: &str) -> Option<Extraction> {
        let text = normalize_digits(raw);

        let Some(price) = self.prices.recognize(&text) else {
            debug!("No price found in message");
            return None;
        };

        let product_name = clean_name(&self.names.extract(&text, Some(price.span.clone())));
        if product_name.is_empty() {
            debug!(price = price.price, "No product label before price");
            return None;
        }

        let currency = price
            .currency
            .map(CompactString::from)
            .unwrap_or_else(|| self.default_currency.clone());

        Some(Extraction {
            product_name,
            price: price.price,
            currency,
        })
    }

    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }
}

/// Keep letters, digits and whitespace only.
fn clean_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extractor() -> Extractor {
        Extractor::new(ExtractorConfig::default()).unwrap()
    }

    fn to_eastern_digits(text: &str) -> String {
        text.chars()
            .map(|c| match c.to_digit(10) {
                Some(d) => char::from_u32(0x0660 + d).unwrap_or(c),
                None => c,
            })
            .collect()
    }

    const SAMPLES: &[&str] = &[
        "عرض خاص على iPhone 15 Pro Max بسعر 4,500 ريال سعودي اليوم فقط!",
        "سهم ABC ارتفع ليغلق عند 120.50$",
        "BTC الآن بـ 65000 دولار أمريكي",
        "لابتوب Dell جديد بـ 3500 جنيه مصري",
        "تخفيض كبير على ساعة ذكية، السعر النهائي 1.2k",
        "المنتج: هاتف سامسونج S24، السعر: 3,200 د.إ",
        "عرض نهاية الأسبوع: سماعات بلوتوث بـ 99 ريال",
        "السعر الجديد هو ٥٠٠٠ ريال",
        "سعر المنتج هو 1500",
    ];

    #[test]
    fn test_iphone_offer() {
        let e = extractor()
            .extract("عرض خاص على iPhone 15 Pro Max بسعر 4,500 ريال سعودي اليوم فقط!")
            .unwrap();
        assert_eq!(e.product_name, "على iPhone 15 Pro Max");
        assert!(e.product_name.contains("iPhone 15 Pro Max"));
        assert_eq!(e.price, 4500.0);
        assert_eq!(e.currency, "ريال");
    }

    #[test]
    fn test_magnitude_suffix_uses_default_currency() {
        let e = extractor()
            .extract("تخفيض كبير على ساعة ذكية، السعر النهائي 1.2k")
            .unwrap();
        assert_eq!(e.price, 1200.0);
        assert_eq!(e.currency, "SAR");
        // Punctuation is stripped from the label.
        assert_eq!(e.product_name, "على ساعة ذكية السعر النهائي");
    }

    #[test]
    fn test_no_marker_uses_default_currency() {
        let e = extractor().extract("سعر المنتج هو 1500").unwrap();
        assert_eq!(e.price, 1500.0);
        assert_eq!(e.currency, "SAR");
        assert_eq!(e.product_name, "المنتج هو");
    }

    #[test]
    fn test_decimal_read_as_grouping() {
        let e = extractor().extract("سهم ABC ارتفع ليغلق عند 120.50$").unwrap();
        assert_eq!(e.price, 12050.0);
        assert_eq!(e.currency, "$");
        assert_eq!(e.product_name, "سهم ABC ارتفع ليغلق عند");
    }

    #[test]
    fn test_eastern_digits_in_message() {
        let e = extractor().extract("السعر الجديد هو ٥٠٠٠ ريال").unwrap();
        assert_eq!(e.price, 5000.0);
        assert_eq!(e.currency, "ريال");
        assert_eq!(e.product_name, "السعر الجديد هو");
    }

    #[test]
    fn test_configured_default_currency() {
        let config = ExtractorConfig {
            default_currency: "EGP".to_string(),
            ..Default::default()
        };
        let e = Extractor::new(config).unwrap().extract("شاشة 55 بوصة 7000").unwrap();
        assert_eq!(e.currency, "EGP");
        assert_eq!(e.price, 7000.0);
    }

    #[test]
    fn test_no_price_is_none() {
        let e = extractor();
        assert_eq!(e.extract("عرض خاص على كل المنتجات اليوم"), None);
        assert_eq!(e.extract(""), None);
        assert_eq!(e.extract("call us now!"), None);
    }

    #[test]
    fn test_bare_number_without_label_is_skipped() {
        assert_eq!(extractor().extract("1500"), None);
        assert_eq!(extractor().extract("!!! 1500"), None);
    }

    #[test]
    fn test_rightmost_price_wins() {
        let e = extractor()
            .extract("سماعات كانت 500 ريال والآن 350 ريال")
            .unwrap();
        assert_eq!(e.price, 350.0);
        assert_eq!(e.product_name, "سماعات كانت 500 ريال والآن");
    }

    #[test]
    fn test_suffix_scaling_has_no_currency() {
        for (text, expected) in [("كاميرا 3k", 3000.0), ("كاميرا 12K", 12000.0)] {
            let e = extractor().extract(text).unwrap();
            assert_eq!(e.price, expected);
            assert_eq!(e.currency, "SAR");
        }
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let e = extractor();
        for text in SAMPLES {
            assert_eq!(e.extract(text), e.extract(&normalize_digits(text)), "{text}");
        }
    }

    #[test]
    fn test_digit_script_equivalence() {
        let e = extractor();
        for text in SAMPLES {
            let eastern = to_eastern_digits(text);
            assert_eq!(e.extract(&eastern), e.extract(text), "{text}");
        }
    }

    #[test]
    fn test_price_never_negative_and_fields_non_empty() {
        let e = extractor();
        for text in SAMPLES {
            let x = e.extract(text).unwrap();
            assert!(x.price >= 0.0);
            assert!(!x.product_name.is_empty());
            assert!(!x.currency.is_empty());
        }
    }

    #[test]
    fn test_empty_default_currency_rejected() {
        let config = ExtractorConfig {
            default_currency: " ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Extractor::new(config),
            Err(ExtractError::EmptyDefaultCurrency)
        ));
    }

    #[test]
    fn test_config_from_json() {
        let config: ExtractorConfig = serde_json::from_str(
            r#"{ "default_currency": "KWD", "currency_markers": ["د.ك", "KWD"], "stop_words": ["حصري"] }"#,
        )
        .unwrap();
        let e = Extractor::new(config).unwrap();

        let x = e.extract("حصري ساعة Casio 25 د.ك").unwrap();
        assert_eq!(x.price, 25.0);
        assert_eq!(x.currency, "د.ك");
        assert_eq!(x.product_name, "ساعة Casio");
        assert_eq!(e.extract("ساعة Casio 25 ريال").unwrap().currency, "KWD");
    }
}

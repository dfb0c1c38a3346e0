//! Best-effort receipt field extraction: amount, date, vendor.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiptExtraction {
    pub amount_minor: Option<i64>,
    pub date: Option<String>,
    pub vendor: Option<String>,
}

static AMOUNT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:total|amount|paid)[:\s]*\$?\s*(\d{1,10}(?:,\d{3})*(?:\.\d{2})?)").unwrap());

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").unwrap());

static VENDOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^(?:vendor|merchant|from)[:\s]+(.+)$").unwrap());

/// Order matters: amount, then date, then vendor, each independent of the
/// others succeeding. Missing fields are left unset.
pub fn extract_receipt_fields(text: &str) -> ReceiptExtraction {
    let amount_minor = AMOUNT_PATTERN.captures(text).and_then(|cap| {
        let raw = cap.get(1)?.as_str().replace(',', "");
        parse_decimal_to_minor_units(&raw)
    });

    let date = DATE_PATTERN.captures(text).map(|cap| cap[1].to_string());

    let vendor = VENDOR_PATTERN
        .captures(text)
        .map(|cap| cap[1].trim().to_string())
        .filter(|v| !v.is_empty());

    ReceiptExtraction { amount_minor, date, vendor }
}

fn parse_decimal_to_minor_units(raw: &str) -> Option<i64> {
    let (whole, frac) = match raw.split_once('.') {
        Some((w, f)) => (w, f),
        None => (raw, ""),
    };
    let whole: i64 = whole.parse().ok()?;
    let frac_padded = format!("{:0<2}", frac);
    let frac_value: i64 = if frac_padded.len() == 2 { frac_padded.parse().ok()? } else { 0 };
    Some(whole * 100 + frac_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_all_three_fields() {
        let text = "Vendor: Acme Supplies\nDate: 2024-11-03\nTotal: $1,234.56";
        let result = extract_receipt_fields(text);
        assert_eq!(result.amount_minor, Some(123456));
        assert_eq!(result.date, Some("2024-11-03".to_string()));
        assert_eq!(result.vendor, Some("Acme Supplies".to_string()));
    }

    #[test]
    fn missing_fields_are_left_unset() {
        let text = "Thanks for your purchase!";
        let result = extract_receipt_fields(text);
        assert_eq!(result, ReceiptExtraction::default());
    }

    #[test]
    fn amount_without_cents_pads_zero() {
        let text = "Amount: $50";
        let result = extract_receipt_fields(text);
        assert_eq!(result.amount_minor, Some(5000));
    }
}

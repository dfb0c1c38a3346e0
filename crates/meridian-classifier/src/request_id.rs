//! Treasury request-id extraction: `SBA-YYYYMM-NNN`, optionally wrapped in
//! `#` or `[...]`.

use once_cell::sync::Lazy;
use regex::Regex;

static REQUEST_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[?#?(SBA-\d{6}-\d{3})\]?").unwrap());

pub fn extract_request_id(subject: &str) -> Option<String> {
    REQUEST_ID_PATTERN
        .captures(subject)
        .map(|cap| cap[1].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bracketed_hash_form() {
        assert_eq!(extract_request_id("Re: Payment [#SBA-202412-001]"), Some("SBA-202412-001".to_string()));
    }

    #[test]
    fn extracts_bare_hash_form() {
        assert_eq!(extract_request_id("Approval request #SBA-202412-002"), Some("SBA-202412-002".to_string()));
    }

    #[test]
    fn extracts_and_uppercases_lowercase_id() {
        assert_eq!(extract_request_id("re: sba-202412-003"), Some("SBA-202412-003".to_string()));
    }

    #[test]
    fn absent_id_returns_none() {
        assert_eq!(extract_request_id("Hello there"), None);
    }
}

//! Auto-reply detection: headers, sender local-part, subject prefix, or
//! body phrasing — first match wins, order doesn't matter for the result.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::MailContent;

const NOREPLY_LOCAL_PARTS: &[&str] = &[
    "noreply",
    "no-reply",
    "donotreply",
    "mailer-daemon",
    "postmaster",
    "mail-delivery",
    "bounce",
];

const PRECEDENCE_AUTO_VALUES: &[&str] = &["bulk", "junk", "auto_reply", "list"];

const SUBJECT_PREFIXES: &[&str] = &[
    "auto:",
    "automatic reply:",
    "ooo:",
    "out of office:",
    "away:",
    "vacation:",
    "undeliverable:",
    "delivery status notification",
    "failure notice:",
    "returned mail:",
    "mail delivery failed:",
];

static BODY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bout of (the )?office\b",
        r"(?i)\bi am currently (out of|away from) the office\b",
        r"(?i)\bwill be (out|away) (of the office )?until\b",
        r"(?i)\bdelivery (has )?failed\b",
        r"(?i)\bmessage (could not|was not) (be )?delivered\b",
        r"(?i)\bundeliverable\b",
        r"(?i)\bthis is an automat(ed|ic) (reply|response)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static auto-reply pattern compiles"))
    .collect()
});

pub fn is_auto_reply(content: &MailContent) -> bool {
    header_indicates_auto_reply(content.headers) || sender_local_part_indicates_auto_reply(content.sender)
        || subject_indicates_auto_reply(content.subject)
        || body_indicates_auto_reply(content.body)
}

fn header_indicates_auto_reply(headers: &std::collections::HashMap<String, String>) -> bool {
    if let Some(v) = headers.get("auto-submitted") {
        if v.trim().to_lowercase() != "no" {
            return true;
        }
    }
    if headers.contains_key("x-auto-response-suppress") {
        return true;
    }
    if headers.contains_key("x-autoreply") {
        return true;
    }
    if let Some(v) = headers.get("precedence") {
        if PRECEDENCE_AUTO_VALUES.contains(&v.trim().to_lowercase().as_str()) {
            return true;
        }
    }
    false
}

fn sender_local_part_indicates_auto_reply(sender: &str) -> bool {
    let local_part = sender.split('@').next().unwrap_or(sender).to_lowercase();
    NOREPLY_LOCAL_PARTS.iter().any(|p| local_part == *p || local_part.contains(p))
}

fn subject_indicates_auto_reply(subject: &str) -> bool {
    let trimmed = subject.trim().to_lowercase();
    SUBJECT_PREFIXES.iter().any(|p| trimmed.starts_with(p))
}

fn body_indicates_auto_reply(body: &str) -> bool {
    BODY_PATTERNS.iter().any(|re| re.is_match(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn content<'a>(
        headers: &'a HashMap<String, String>,
        sender: &'a str,
        subject: &'a str,
        body: &'a str,
    ) -> MailContent<'a> {
        MailContent { headers, sender, subject, body }
    }

    #[test]
    fn detects_via_auto_submitted_header() {
        let mut headers = HashMap::new();
        headers.insert("auto-submitted".to_string(), "auto-replied".to_string());
        assert!(is_auto_reply(&content(&headers, "a@b.com", "hello", "body")));
    }

    #[test]
    fn auto_submitted_no_is_not_auto_reply() {
        let mut headers = HashMap::new();
        headers.insert("auto-submitted".to_string(), "no".to_string());
        assert!(!is_auto_reply(&content(&headers, "a@b.com", "hello", "body")));
    }

    #[test]
    fn detects_via_noreply_sender() {
        let headers = HashMap::new();
        assert!(is_auto_reply(&content(&headers, "no-reply@shop.com", "hi", "body")));
    }

    #[test]
    fn detects_via_subject_prefix() {
        let headers = HashMap::new();
        assert!(is_auto_reply(&content(&headers, "a@b.com", "Out Of Office: back Monday", "body")));
    }

    #[test]
    fn detects_via_body_phrasing_s5_scenario() {
        let headers = HashMap::new();
        let body = "I am currently out of the office and will respond when I return.";
        assert!(is_auto_reply(&content(&headers, "a@b.com", "Re: Payment [#SBA-202412-001]", body)));
    }

    #[test]
    fn ordinary_mail_is_not_auto_reply() {
        let headers = HashMap::new();
        assert!(!is_auto_reply(&content(&headers, "finance@partner.com", "Invoice #1234", "Please see attached.")));
    }
}

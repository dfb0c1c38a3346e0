//! Approval-verdict parsing over a treasury message's subject + body.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::MailContent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Rejected,
    Unclear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone)]
pub struct ApprovalVerdict {
    pub verdict: Verdict,
    pub confidence: Confidence,
    pub matched_tokens: Vec<String>,
}

fn compile_bucket(phrases: &'static [&'static str]) -> Vec<Regex> {
    phrases
        .iter()
        .map(|p| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(p))).expect("approval phrase compiles"))
        .collect()
}

static HIGH_APPROVE: Lazy<Vec<Regex>> = Lazy::new(|| compile_bucket(&["approved", "proceed", "go ahead", "authorized"]));
static MEDIUM_APPROVE: Lazy<Vec<Regex>> = Lazy::new(|| compile_bucket(&["looks good", "sounds good", "ok to proceed", "fine by me"]));
static HIGH_REJECT: Lazy<Vec<Regex>> = Lazy::new(|| compile_bucket(&["rejected", "denied", "do not proceed", "not authorized"]));
static MEDIUM_REJECT: Lazy<Vec<Regex>> = Lazy::new(|| compile_bucket(&["not sure", "hold off", "need more info", "let's wait"]));

fn matches_in(text: &str, bucket: &[Regex]) -> Vec<String> {
    bucket
        .iter()
        .filter_map(|re| re.find(text).map(|m| m.as_str().to_string()))
        .collect()
}

pub fn classify_approval(content: &MailContent) -> ApprovalVerdict {
    let text = format!("{} {}", content.subject, content.body);

    let high_approve = matches_in(&text, &HIGH_APPROVE);
    let medium_approve = matches_in(&text, &MEDIUM_APPROVE);
    let high_reject = matches_in(&text, &HIGH_REJECT);
    let medium_reject = matches_in(&text, &MEDIUM_REJECT);

    let approve_score = 2 * high_approve.len() + medium_approve.len();
    let reject_score = 2 * high_reject.len() + medium_reject.len();

    let mut matched_tokens: Vec<String> = Vec::new();
    matched_tokens.extend(high_approve.iter().cloned());
    matched_tokens.extend(medium_approve.iter().cloned());
    matched_tokens.extend(high_reject.iter().cloned());
    matched_tokens.extend(medium_reject.iter().cloned());

    let (verdict, confidence) = match (approve_score > 0, reject_score > 0) {
        (true, false) => (
            Verdict::Approved,
            if !high_approve.is_empty() { Confidence::High } else { Confidence::Medium },
        ),
        (false, true) => (
            Verdict::Rejected,
            if !high_reject.is_empty() { Confidence::High } else { Confidence::Medium },
        ),
        (true, true) => {
            if approve_score > reject_score {
                (Verdict::Approved, Confidence::Low)
            } else if reject_score > approve_score {
                (Verdict::Rejected, Confidence::Low)
            } else {
                (Verdict::Unclear, Confidence::Low)
            }
        }
        (false, false) => (Verdict::Unclear, Confidence::Low),
    };

    ApprovalVerdict { verdict, confidence, matched_tokens }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn content<'a>(subject: &'a str, body: &'a str) -> MailContent<'a> {
        static EMPTY: once_cell::sync::Lazy<HashMap<String, String>> = once_cell::sync::Lazy::new(HashMap::new);
        MailContent { headers: &EMPTY, sender: "treasury@partner.com", subject, body }
    }

    #[test]
    fn s6_treasury_approval_scenario() {
        let c = content("Approval request #SBA-202412-002", "Approved — please proceed.");
        let result = classify_approval(&c);
        assert_eq!(result.verdict, Verdict::Approved);
        assert_eq!(result.confidence, Confidence::High);
        assert!(result.matched_tokens.iter().any(|t| t.eq_ignore_ascii_case("approved")));
        assert!(result.matched_tokens.iter().any(|t| t.eq_ignore_ascii_case("proceed")));
    }

    #[test]
    fn conflicting_signals_favor_higher_score_at_low_confidence() {
        let c = content("Re: funds", "Approved, but actually hold off and rejected for now.");
        let result = classify_approval(&c);
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn no_signal_is_unclear() {
        let c = content("Weekly update", "Nothing to report this week.");
        let result = classify_approval(&c);
        assert_eq!(result.verdict, Verdict::Unclear);
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result.matched_tokens.is_empty());
    }

    #[test]
    fn medium_confidence_approve_without_high_phrase() {
        let c = content("Re: request", "Looks good, thanks.");
        let result = classify_approval(&c);
        assert_eq!(result.verdict, Verdict::Approved);
        assert_eq!(result.confidence, Confidence::Medium);
    }
}

//! Spam scoring: integer/half-point signals normalized to `[0, 1]`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::MailContent;

static SPAM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bfree money\b",
        r"(?i)\bact now\b",
        r"(?i)\bclick here\b",
        r"(?i)\bwinner\b.*\blottery\b",
        r"(?i)\blimited time offer\b",
        r"(?i)\bwire transfer\b.*\burgent\b",
        r"(?i)\bnigerian prince\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static spam pattern compiles"))
    .collect()
});

static NOREPLY_SENDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)no-?reply|donotreply").expect("static no-reply pattern compiles"));

static ALL_CAPS_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{4,}\b").expect("static all-caps pattern compiles"));

/// One point per regex hit, plus the `!`-count and ALL-CAPS signals below;
/// the maximum attainable is the sum of every weight, used as the
/// normalizing denominator.
const MAX_POINTS: f64 = SPAM_PATTERNS_COUNT + 1.0 + 1.0 + 0.5;
const SPAM_PATTERNS_COUNT: f64 = 7.0;

pub fn spam_score(content: &MailContent) -> f64 {
    let text = format!("{} {}", content.subject, content.body);

    let mut points = 0.0;

    for re in SPAM_PATTERNS.iter() {
        if re.is_match(&text) {
            points += 1.0;
        }
    }

    if text.matches('!').count() > 3 {
        points += 1.0;
    }

    let all_caps_hits = ALL_CAPS_TOKEN.find_iter(&text).count();
    if all_caps_hits > 3 {
        points += 1.0;
    }

    if NOREPLY_SENDER.is_match(content.sender) {
        points += 0.5;
    }

    (points / MAX_POINTS).min(1.0)
}

pub fn is_spam(content: &MailContent, threshold: f64) -> bool {
    spam_score(content) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn content<'a>(sender: &'a str, subject: &'a str, body: &'a str) -> MailContent<'a> {
        static EMPTY: once_cell::sync::Lazy<HashMap<String, String>> = once_cell::sync::Lazy::new(HashMap::new);
        MailContent { headers: &EMPTY, sender, subject, body }
    }

    #[test]
    fn clean_message_scores_zero() {
        let c = content("finance@partner.com", "Invoice #1234", "Please see the attached invoice.");
        assert_eq!(spam_score(&c), 0.0);
    }

    #[test]
    fn regex_hit_and_noreply_sender_compound() {
        let c = content("no-reply@scam.biz", "Act now!", "Click here for your free money.");
        let score = spam_score(&c);
        assert!(score > 0.0);
        assert!(is_spam(&c, 0.2));
    }

    #[test]
    fn excessive_exclamations_add_a_point() {
        let shouting = "Buy now!!!! Don't miss out!!!!";
        let c = content("a@b.com", "Sale", shouting);
        assert!(spam_score(&c) > 0.0);
    }

    #[test]
    fn score_never_exceeds_one() {
        let c = content(
            "no-reply@scam.biz",
            "FREE MONEY ACT NOW CLICK HERE WINNER LOTTERY LIMITED TIME OFFER WIRE TRANSFER URGENT NIGERIAN PRINCE",
            "AMAZING DEAL RIGHT NOW!!!! CLAIM YOUR PRIZE TODAY!!!!",
        );
        assert!(spam_score(&c) <= 1.0);
    }
}

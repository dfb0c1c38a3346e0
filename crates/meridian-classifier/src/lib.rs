//! Meridian Content Classifier (§4.J)
//!
//! A deterministic rule cascade over inbound email: auto-reply detection,
//! spam scoring, approval-verdict parsing, receipt field extraction, and
//! treasury request-id extraction. Every function here is pure — no I/O,
//! no clock reads beyond what the caller passes in — so the whole crate is
//! exercised with table-driven `#[cfg(test)]` cases.

pub mod approval;
pub mod auto_reply;
pub mod receipt;
pub mod request_id;
pub mod spam;

pub use approval::{classify_approval, ApprovalVerdict, Confidence, Verdict};
pub use auto_reply::is_auto_reply;
pub use receipt::{extract_receipt_fields, ReceiptExtraction};
pub use request_id::extract_request_id;
pub use spam::spam_score;

use std::collections::HashMap;

/// The subset of an inbound message the classifier needs. Header keys are
/// expected lower-cased by the caller (the ingress pipeline normalizes them
/// once at parse time).
pub struct MailContent<'a> {
    pub headers: &'a HashMap<String, String>,
    pub sender: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
}

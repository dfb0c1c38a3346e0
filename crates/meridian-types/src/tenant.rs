//! Tenant and connection lifecycle vocabulary.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a tenant (registry row, administrative only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
    Deleted,
}

/// Lifecycle status of an external-source connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Active,
    Suspended,
    Disconnected,
    Deleted,
    /// Marked failed after repeated registration failures (§4.L).
    Failed,
}

/// Purpose tag for an inbound email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailPurpose {
    Treasury,
    Receipts,
    Support,
    Creator,
    General,
}

impl MailPurpose {
    /// The dispatch topic this purpose routes to.
    pub fn topic(&self) -> &'static str {
        match self {
            MailPurpose::Treasury => "mail/treasury",
            MailPurpose::Receipts => "mail/receipts",
            MailPurpose::Support => "mail/support",
            MailPurpose::Creator => "mail/creator",
            MailPurpose::General => "mail/general",
        }
    }
}

/// Processing status of an event-log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Completed,
    Failed,
    Ignored,
}

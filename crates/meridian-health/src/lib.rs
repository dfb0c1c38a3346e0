//! Meridian Health — read-only registration/event-status queries plus the
//! one mutating operation, `retry` (§4.L).
//!
//! This is a thin read-model crate over `meridian-db`'s repos: it opens no
//! connections of its own beyond what `with_tenant` (`meridian-tenancy`)
//! already provides, and defines no storage it owns. `services/meridian-server`
//! exposes these as a small set of operator-facing HTTP routes.

pub mod error;
pub mod registration;
pub mod retry;
pub mod stats;

pub use error::HealthError;
pub use registration::{registration_status, RegistrationStatus};
pub use retry::{
    failed_events_eligible_for_retry, retry as retry_event, DEFAULT_MAX_RETRY_COUNT, DEFAULT_RETRY_DEADLINE,
    DEFAULT_RETRY_LOOKBACK_DAYS,
};
pub use stats::{counts_by_topic, counts_last_24h, StatusCount, TopicCount};

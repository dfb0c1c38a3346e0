//! Meridian Mail — inbound-email ingress (§4.G).
//!
//! Shares the ingress pipeline core (`meridian_webhook::pipeline`) with
//! commerce webhooks through the same [`meridian_webhook::pipeline::Source`]
//! seam (§9): svix-style signature verification, purpose-routed dispatch
//! after auto-reply/spam classification, and idempotent logging.
//!
//! - [`wire`]: the provider wire shape and its mapping onto the stored
//!   event payload.
//! - [`mail_source`]: the [`Source`](meridian_webhook::pipeline::Source)
//!   implementation itself.

pub mod mail_source;
pub mod wire;

pub use mail_source::{handle, MailSource};

//! Meridian Crypto
//!
//! - [`sealer`]: authenticated symmetric encryption of long-lived secrets at rest (§4.A).
//! - [`signature`]: constant-time HMAC verification for webhook bodies,
//!   OAuth query strings, and svix-style inbound-mail signatures (§4.B, §4.G).
//!
//! # Security invariant
//!
//! Neither module ever logs plaintext, ciphertext, or key material. `Debug`
//! on key-holding types is redacted.

pub mod sealer;
pub mod signature;

pub use sealer::{CredentialSealer, SealError, SealedSecret};
pub use signature::{verify_oauth_query, verify_svix_mail, verify_webhook_body};

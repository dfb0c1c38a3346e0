//! Meridian Webhook — commerce platform ingress (§4.F).
//!
//! - [`headers`]: the per-source header vocabulary extracted before a
//!   tenant is known.
//! - [`pipeline`]: the source-agnostic ingress pipeline shared with
//!   `meridian-mail` (§9).
//! - [`commerce_source`]: the commerce [`pipeline::Source`] implementation —
//!   shop resolution, body-HMAC verification, idempotent logging.

pub mod commerce_source;
pub mod headers;
pub mod pipeline;

pub use commerce_source::{handle, CommerceSource};
pub use pipeline::{IngressContext, IngressOutcome, RawIngress, ResolvedTenant, Source, SourceIdentity, TopicDecision};

#[cfg(test)]
mod tests {
    use super::headers::CommerceHeaders;

    #[test]
    fn header_names_are_templated_by_source() {
        let names = CommerceHeaders::header_names("shopify");
        assert_eq!(
            names,
            [
                "x-shopify-shop-domain".to_string(),
                "x-shopify-topic".to_string(),
                "x-shopify-hmac-sha256".to_string(),
                "x-shopify-webhook-id".to_string(),
                "x-shopify-api-version".to_string(),
            ]
        );
    }
}

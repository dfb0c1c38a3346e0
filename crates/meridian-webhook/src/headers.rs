//! Header extraction (§4.F step 1). Kept independent of any particular HTTP
//! framework's header map type — an adapter only needs to be able to hand
//! over a few named strings plus the raw body bytes.

/// The four commerce-webhook headers, already-templated by the configured
/// source name (e.g. `x-shopify-shop-domain` when `source_name` is
/// `"shopify"`). All but `webhook_id` and `api_version` are required.
#[derive(Debug, Clone, Default)]
pub struct CommerceHeaders {
    pub shop_domain: Option<String>,
    pub topic: Option<String>,
    pub hmac_signature: Option<String>,
    pub webhook_id: Option<String>,
    pub api_version: Option<String>,
}

impl CommerceHeaders {
    /// Builds the four header names this source expects, e.g.
    /// `x-shopify-shop-domain`, `x-shopify-topic`.
    pub fn header_names(source_name: &str) -> [String; 5] {
        [
            format!("x-{source_name}-shop-domain"),
            format!("x-{source_name}-topic"),
            format!("x-{source_name}-hmac-sha256"),
            format!("x-{source_name}-webhook-id"),
            format!("x-{source_name}-api-version"),
        ]
    }

    fn required_present(&self) -> bool {
        [&self.shop_domain, &self.topic, &self.hmac_signature]
            .iter()
            .all(|h| h.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

/// The body and headers of one inbound commerce webhook request, already
/// extracted from whatever transport delivered it.
pub struct RawWebhook {
    pub headers: CommerceHeaders,
    pub raw_body: Vec<u8>,
}

impl RawWebhook {
    pub fn new(headers: CommerceHeaders, raw_body: Vec<u8>) -> Self {
        Self { headers, raw_body }
    }

    pub(crate) fn required_headers(&self) -> Option<(&str, &str, &str)> {
        if !self.headers.required_present() {
            return None;
        }
        Some((
            self.headers.shop_domain.as_deref()?,
            self.headers.topic.as_deref()?,
            self.headers.hmac_signature.as_deref()?,
        ))
    }
}

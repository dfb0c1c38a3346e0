//! Identifier newtypes.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(TenantId);
uuid_id!(ConnectionId);
uuid_id!(InboundAddressId);
uuid_id!(EventId);
uuid_id!(OAuthStateId);

/// An idempotency key, scoped to one tenant. Construction rules live with
/// the caller (webhook vs. mail vs. GDPR log) per the source's id scheme;
/// this type just guarantees non-empty content and a stable `Display`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `topic:external_resource_id[:external_event_id]`
    pub fn for_commerce_webhook(topic: &str, external_resource_id: &str, external_event_id: Option<&str>) -> Self {
        match external_event_id {
            Some(eid) => Self(format!("{topic}:{external_resource_id}:{eid}")),
            None => Self(format!("{topic}:{external_resource_id}")),
        }
    }

    /// `inbound-id:sender:to-address:message-id-hash`
    pub fn for_inbound_mail(inbound_id: &str, sender: &str, to_address: &str, message_id_hash: &str) -> Self {
        Self(format!("{inbound_id}:{sender}:{to_address}:{message_id_hash}"))
    }

    /// `gdpr-data-request:customer_id:shop`
    pub fn for_gdpr_data_request(customer_id: &str, shop: &str) -> Self {
        Self(format!("gdpr-data-request:{customer_id}:{shop}"))
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commerce_key_includes_event_id_when_present() {
        let key = IdempotencyKey::for_commerce_webhook("orders/create", "100001", Some("evt-1"));
        assert_eq!(key.as_str(), "orders/create:100001:evt-1");
    }

    #[test]
    fn commerce_key_omits_event_id_when_absent() {
        let key = IdempotencyKey::for_commerce_webhook("orders/create", "100001", None);
        assert_eq!(key.as_str(), "orders/create:100001");
    }

    #[test]
    fn mail_key_is_four_parts() {
        let key = IdempotencyKey::for_inbound_mail("in_1", "a@b.com", "treasury@tenant.com", "abc123");
        assert_eq!(key.as_str(), "in_1:a@b.com:treasury@tenant.com:abc123");
    }
}

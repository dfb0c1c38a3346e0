//! Commerce webhook ingress (§4.F): header extraction, shop resolution,
//! body-HMAC verification, and idempotent logging, expressed as a
//! [`Source`] over the shared pipeline.

use std::collections::HashMap;

use meridian_crypto::verify_webhook_body;
use meridian_types::topic::commerce;
use meridian_types::IdempotencyKey;

use crate::headers::CommerceHeaders;
use crate::pipeline::{IngressContext, IngressOutcome, RawIngress, ResolvedTenant, Source, SourceIdentity, TopicDecision};

/// A commerce source is identified by its header prefix (e.g. `shopify`),
/// used to derive the five `x-<source>-*` header names it expects.
pub struct CommerceSource {
    pub source_name: &'static str,
}

impl CommerceSource {
    pub fn new(source_name: &'static str) -> Self {
        Self { source_name }
    }

    fn read_headers(&self, raw: &RawIngress) -> CommerceHeaders {
        let [shop, topic, hmac, webhook_id, api_version] = CommerceHeaders::header_names(self.source_name);
        CommerceHeaders {
            shop_domain: raw.header(&shop).map(str::to_string),
            topic: raw.header(&topic).map(str::to_string),
            hmac_signature: raw.header(&hmac).map(str::to_string),
            webhook_id: raw.header(&webhook_id).map(str::to_string),
            api_version: raw.header(&api_version).map(str::to_string),
        }
    }
}

/// The JSON payload's own primary-entity id, used as the idempotency key's
/// "external resource id" (§4.E). GDPR `shop/redact` carries no per-entity
/// id, so the shop domain itself stands in for one.
fn flexible_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn external_resource_id(topic: &str, shop_domain: &str, payload: &serde_json::Value) -> String {
    match topic {
        commerce::GDPR_SHOP_REDACT => shop_domain.to_string(),
        commerce::GDPR_CUSTOMERS_REDACT | commerce::GDPR_CUSTOMERS_DATA_REQUEST => payload
            .get("customer")
            .and_then(|c| c.get("id"))
            .and_then(flexible_id)
            .unwrap_or_default(),
        commerce::GDPR_CUSTOMERS_DELETE => payload
            .get("customer")
            .and_then(|c| c.get("id"))
            .and_then(flexible_id)
            .or_else(|| payload.get("id").and_then(flexible_id))
            .unwrap_or_default(),
        _ => payload.get("id").and_then(flexible_id).unwrap_or_default(),
    }
}

#[async_trait::async_trait]
impl Source for CommerceSource {
    fn name(&self) -> &'static str {
        self.source_name
    }

    fn extract_identity(&self, raw: &RawIngress) -> Result<SourceIdentity, IngressOutcome> {
        let headers = self.read_headers(raw);
        let (shop, topic, hmac) = headers.required_headers().ok_or(IngressOutcome::MalformedPayload)?;
        Ok(SourceIdentity {
            external_source_id: shop.to_string(),
            topic_hint: Some(topic.to_string()),
            signature: hmac.to_string(),
            external_event_id: headers.webhook_id.clone(),
            actor: None,
            svix_id: None,
            svix_timestamp: None,
        })
    }

    async fn resolve_tenant(&self, ctx: &IngressContext, identity: &SourceIdentity) -> Result<ResolvedTenant, IngressOutcome> {
        match ctx.registry.resolve_by_shop(&identity.external_source_id).await {
            Ok(resolved) => Ok(ResolvedTenant {
                tenant_id: resolved.tenant_id,
                tenant_slug: resolved.tenant_slug,
                connection: Some(resolved.connection),
                inbound_purpose: None,
                inbound_address_id: None,
            }),
            Err(_) => Err(IngressOutcome::NotRegistered),
        }
    }

    async fn load_secret(&self, ctx: &IngressContext, resolved: &ResolvedTenant) -> Result<Vec<u8>, IngressOutcome> {
        let connection = resolved.connection.as_ref().ok_or(IngressOutcome::ConfigError)?;
        match ctx.registry.get_sealed_credentials(connection).await {
            Ok(creds) => creds.webhook_secret.ok_or(IngressOutcome::ConfigError),
            Err(e) => {
                tracing::error!(error = %e, "failed to open sealed webhook secret");
                Err(IngressOutcome::ConfigError)
            }
        }
    }

    fn verify(&self, identity: &SourceIdentity, raw: &RawIngress, secret: &[u8]) -> bool {
        verify_webhook_body(secret, &raw.raw_body, &identity.signature)
    }

    fn parse_payload(&self, raw: &RawIngress) -> Result<serde_json::Value, IngressOutcome> {
        serde_json::from_slice(&raw.raw_body).map_err(|_| IngressOutcome::MalformedPayload)
    }

    fn topic(&self, _resolved: &ResolvedTenant, identity: &SourceIdentity, _payload: &serde_json::Value) -> TopicDecision {
        match &identity.topic_hint {
            Some(topic) => TopicDecision::Dispatch(topic.clone()),
            None => TopicDecision::Ignore("missing topic header"),
        }
    }

    fn idempotency_key(&self, resolved: &ResolvedTenant, identity: &SourceIdentity, topic: &str, payload: &serde_json::Value) -> IdempotencyKey {
        if topic == commerce::GDPR_CUSTOMERS_DATA_REQUEST {
            let customer_id = external_resource_id(topic, &identity.external_source_id, payload);
            return IdempotencyKey::for_gdpr_data_request(&customer_id, &resolved.tenant_slug);
        }
        let resource_id = external_resource_id(topic, &identity.external_source_id, payload);
        IdempotencyKey::for_commerce_webhook(topic, &resource_id, identity.external_event_id.as_deref())
    }

    async fn after_dispatch(&self, ctx: &IngressContext, resolved: &ResolvedTenant, _identity: &SourceIdentity) {
        if let Some(connection) = &resolved.connection {
            if let Err(e) = ctx.registry.db().connection_repo().touch_last_inbound(connection.id).await {
                tracing::warn!(error = %e, "failed to record last inbound timestamp");
            }
        }
    }
}

/// `handle` wraps [`run_ingress`](crate::pipeline::run_ingress) for a
/// configured commerce source (§4.F entry point).
pub async fn handle(ctx: &IngressContext, source: &CommerceSource, headers: HashMap<String, String>, raw_body: Vec<u8>) -> IngressOutcome {
    let raw = RawIngress { headers, raw_body };
    crate::pipeline::run_ingress(ctx, source, raw).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn order_topics_use_the_payloads_own_id() {
        let payload = json!({"id": 100001, "name": "#1001"});
        assert_eq!(external_resource_id(commerce::ORDERS_CREATE, "acme.myshopify.com", &payload), "100001");
    }

    #[test]
    fn refund_topic_uses_the_refunds_own_id_not_the_order_id() {
        let payload = json!({"id": "re_1", "order_id": 100001});
        assert_eq!(external_resource_id(commerce::REFUNDS_CREATE, "acme.myshopify.com", &payload), "re_1");
    }

    #[test]
    fn shop_redact_has_no_entity_id_so_the_shop_domain_stands_in() {
        let payload = json!({"shop_id": 42, "shop_domain": "acme.myshopify.com"});
        assert_eq!(
            external_resource_id(commerce::GDPR_SHOP_REDACT, "acme.myshopify.com", &payload),
            "acme.myshopify.com"
        );
    }

    #[test]
    fn customers_redact_uses_the_nested_customer_id() {
        let payload = json!({"customer": {"id": 7890}, "orders_to_redact": []});
        assert_eq!(external_resource_id(commerce::GDPR_CUSTOMERS_REDACT, "acme.myshopify.com", &payload), "7890");
    }

    #[test]
    fn customers_delete_falls_back_to_top_level_id_when_not_nested() {
        let payload = json!({"id": 42});
        assert_eq!(external_resource_id(commerce::GDPR_CUSTOMERS_DELETE, "acme.myshopify.com", &payload), "42");
    }

    #[test]
    fn idempotency_key_for_data_request_uses_the_gdpr_format() {
        let resolved = ResolvedTenant {
            tenant_id: meridian_types::TenantId::new(),
            tenant_slug: "acme".to_string(),
            connection: None,
            inbound_purpose: None,
            inbound_address_id: None,
        };
        let identity = SourceIdentity {
            external_source_id: "acme.myshopify.com".to_string(),
            ..Default::default()
        };
        let source = CommerceSource::new("shopify");
        let payload = json!({"customer": {"id": 7890}});
        let key = source.idempotency_key(&resolved, &identity, commerce::GDPR_CUSTOMERS_DATA_REQUEST, &payload);
        assert_eq!(key.as_str(), "gdpr-data-request:7890:acme");
    }

    #[test]
    fn idempotency_key_for_orders_includes_webhook_id_when_present() {
        let resolved = ResolvedTenant {
            tenant_id: meridian_types::TenantId::new(),
            tenant_slug: "acme".to_string(),
            connection: None,
            inbound_purpose: None,
            inbound_address_id: None,
        };
        let identity = SourceIdentity {
            external_source_id: "acme.myshopify.com".to_string(),
            external_event_id: Some("evt-1".to_string()),
            ..Default::default()
        };
        let source = CommerceSource::new("shopify");
        let payload = json!({"id": 100001});
        let key = source.idempotency_key(&resolved, &identity, commerce::ORDERS_CREATE, &payload);
        assert_eq!(key.as_str(), "orders/create:100001:evt-1");
    }
}

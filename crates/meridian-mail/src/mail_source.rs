//! Inbound-mail ingress (§4.G): svix-style verification, purpose-routed
//! dispatch, and classification gating, expressed as a [`Source`] over the
//! shared pipeline.

use std::collections::HashMap;

use base64::Engine;
use meridian_classifier::{is_auto_reply, spam, MailContent};
use meridian_crypto::verify_svix_mail;
use meridian_types::{IdempotencyKey, MailPurpose};
use sha2::{Digest, Sha256};

use meridian_webhook::pipeline::{IngressContext, IngressOutcome, RawIngress, ResolvedTenant, Source, SourceIdentity, TopicDecision};

use crate::wire::{StoredMailPayload, WireBody};

/// ±5 minutes, per §4.G.
const TIMESTAMP_WINDOW_SECS: i64 = 5 * 60;

pub struct MailSource {
    webhook_secret: String,
    spam_threshold: f64,
}

impl MailSource {
    /// `webhook_secret` may be configured either `whsec_`-prefixed (svix's
    /// own convention) or as a raw shared secret — both are accepted and
    /// normalized to the `whsec_` form `meridian_crypto::verify_svix_mail`
    /// expects.
    pub fn new(webhook_secret: &str, spam_threshold: f64) -> Self {
        Self {
            webhook_secret: normalize_webhook_secret(webhook_secret),
            spam_threshold,
        }
    }
}

fn normalize_webhook_secret(raw: &str) -> String {
    if raw.starts_with("whsec_") {
        raw.to_string()
    } else {
        format!("whsec_{}", base64::engine::general_purpose::STANDARD.encode(raw.as_bytes()))
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn parse_purpose(raw: &str) -> Option<MailPurpose> {
    match raw {
        "treasury" => Some(MailPurpose::Treasury),
        "receipts" => Some(MailPurpose::Receipts),
        "support" => Some(MailPurpose::Support),
        "creator" => Some(MailPurpose::Creator),
        "general" => Some(MailPurpose::General),
        _ => None,
    }
}

fn timestamp_within_window(timestamp: &str) -> bool {
    let Ok(ts) = timestamp.parse::<i64>() else {
        return false;
    };
    (chrono::Utc::now().timestamp() - ts).abs() <= TIMESTAMP_WINDOW_SECS
}

#[async_trait::async_trait]
impl Source for MailSource {
    fn name(&self) -> &'static str {
        "inbound-mail"
    }

    fn extract_identity(&self, raw: &RawIngress) -> Result<SourceIdentity, IngressOutcome> {
        let svix_id = raw.header("svix-id").ok_or(IngressOutcome::MalformedPayload)?.to_string();
        let svix_timestamp = raw.header("svix-timestamp").ok_or(IngressOutcome::MalformedPayload)?.to_string();
        let signature = raw.header("svix-signature").ok_or(IngressOutcome::MalformedPayload)?.to_string();

        let wire: WireBody = serde_json::from_slice(&raw.raw_body).map_err(|_| IngressOutcome::MalformedPayload)?;
        let external_event_id = wire.provider_message_id().map(str::to_string);

        Ok(SourceIdentity {
            external_source_id: wire.to.to_lowercase(),
            topic_hint: None,
            signature,
            external_event_id,
            actor: Some(wire.from),
            svix_id: Some(svix_id),
            svix_timestamp: Some(svix_timestamp),
        })
    }

    async fn resolve_tenant(&self, ctx: &IngressContext, identity: &SourceIdentity) -> Result<ResolvedTenant, IngressOutcome> {
        match ctx.registry.resolve_by_inbound_address(&identity.external_source_id).await {
            Ok((tenant_id, tenant_slug, row)) => {
                if !row.enabled {
                    return Err(IngressOutcome::NotRegistered);
                }
                let purpose = parse_purpose(&row.purpose).ok_or(IngressOutcome::ConfigError)?;
                Ok(ResolvedTenant {
                    tenant_id,
                    tenant_slug,
                    connection: None,
                    inbound_purpose: Some(purpose),
                    inbound_address_id: Some(row.id),
                })
            }
            Err(_) => Err(IngressOutcome::NotRegistered),
        }
    }

    async fn load_secret(&self, _ctx: &IngressContext, _resolved: &ResolvedTenant) -> Result<Vec<u8>, IngressOutcome> {
        Ok(self.webhook_secret.clone().into_bytes())
    }

    fn verify(&self, identity: &SourceIdentity, raw: &RawIngress, secret: &[u8]) -> bool {
        let (Some(svix_id), Some(svix_timestamp)) = (&identity.svix_id, &identity.svix_timestamp) else {
            return false;
        };
        if !timestamp_within_window(svix_timestamp) {
            return false;
        }
        let Ok(secret_str) = std::str::from_utf8(secret) else {
            return false;
        };
        verify_svix_mail(secret_str, svix_id, svix_timestamp, &raw.raw_body, &identity.signature)
    }

    fn parse_payload(&self, raw: &RawIngress) -> Result<serde_json::Value, IngressOutcome> {
        let wire: WireBody = serde_json::from_slice(&raw.raw_body).map_err(|_| IngressOutcome::MalformedPayload)?;
        let stored: StoredMailPayload = wire.into();
        serde_json::to_value(stored).map_err(|_| IngressOutcome::MalformedPayload)
    }

    fn topic(&self, resolved: &ResolvedTenant, _identity: &SourceIdentity, payload: &serde_json::Value) -> TopicDecision {
        let sender = payload.get("sender").and_then(|v| v.as_str()).unwrap_or_default();
        let subject = payload.get("subject").and_then(|v| v.as_str()).unwrap_or_default();
        let body = payload.get("body").and_then(|v| v.as_str()).unwrap_or_default();
        let headers = HashMap::new();
        let content = MailContent { headers: &headers, sender, subject, body };

        if is_auto_reply(&content) {
            tracing::debug!(sender, "ignoring auto-reply mail");
            return TopicDecision::Ignore("Auto-reply detected");
        }
        if spam::is_spam(&content, self.spam_threshold) {
            tracing::debug!(sender, "ignoring mail classified as spam");
            return TopicDecision::Ignore("Spam score exceeded threshold");
        }

        match resolved.inbound_purpose {
            Some(purpose) => TopicDecision::Dispatch(purpose.topic().to_string()),
            None => TopicDecision::Ignore("no purpose resolved for inbound address"),
        }
    }

    fn idempotency_key(&self, resolved: &ResolvedTenant, identity: &SourceIdentity, _topic: &str, _payload: &serde_json::Value) -> IdempotencyKey {
        let inbound_id = resolved.inbound_address_id.map(|id| id.to_string()).unwrap_or_default();
        let sender = identity.actor.as_deref().unwrap_or_default();
        let message_id = identity.external_event_id.as_deref().unwrap_or_default();
        let message_id_hash = sha256_hex(message_id.as_bytes());
        IdempotencyKey::for_inbound_mail(&inbound_id, sender, &identity.external_source_id, &message_id_hash)
    }

    fn rate_limit_identifiers(&self, resolved: &ResolvedTenant, identity: &SourceIdentity) -> Vec<String> {
        let mut keys = vec![format!("ingress:{}", resolved.tenant_slug)];
        if let Some(sender) = &identity.actor {
            keys.push(format!("ingress:sender:{sender}"));
        }
        keys
    }

    async fn after_dispatch(&self, _ctx: &IngressContext, _resolved: &ResolvedTenant, _identity: &SourceIdentity) {}
}

/// `handle` wraps [`run_ingress`](meridian_webhook::pipeline::run_ingress)
/// for the configured inbound-mail source (§4.G entry point).
pub async fn handle(ctx: &IngressContext, source: &MailSource, headers: HashMap<String, String>, raw_body: Vec<u8>) -> IngressOutcome {
    let raw = RawIngress { headers, raw_body };
    meridian_webhook::pipeline::run_ingress(ctx, source, raw).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_whsec_prefixed_secret_is_kept_as_is() {
        assert_eq!(normalize_webhook_secret("whsec_abc123"), "whsec_abc123");
    }

    #[test]
    fn bare_secret_is_wrapped_into_whsec_form() {
        let normalized = normalize_webhook_secret("plain-shared-secret");
        assert!(normalized.starts_with("whsec_"));
    }

    #[test]
    fn timestamp_within_five_minutes_is_accepted() {
        let now = chrono::Utc::now().timestamp();
        assert!(timestamp_within_window(&now.to_string()));
    }

    #[test]
    fn timestamp_outside_five_minutes_is_rejected() {
        let stale = chrono::Utc::now().timestamp() - 3600;
        assert!(!timestamp_within_window(&stale.to_string()));
    }

    #[test]
    fn unparseable_timestamp_is_rejected() {
        assert!(!timestamp_within_window("not-a-number"));
    }

    #[test]
    fn unknown_purpose_string_does_not_parse() {
        assert!(parse_purpose("billing").is_none());
    }
}

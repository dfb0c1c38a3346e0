//! The shared ingress pipeline core (§9 design note: "one pipeline shape
//! parameterized by a small `Source` trait" rather than duplicated
//! commerce/mail modules). `meridian-webhook`'s own commerce pipeline and
//! `meridian-mail`'s pipeline are both thin [`Source`] implementations over
//! [`run_ingress`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use meridian_db::{DbConnection, EventLogRepo, ReserveOutcome};
use meridian_tenancy::{with_tenant, TenantRegistry};
use meridian_types::{IdempotencyKey, MailPurpose, TenantId};
use sqlx::PgPool;
use uuid::Uuid;

use meridian_dispatch::HandlerRegistry;

/// The headers and raw body of one inbound request, already lifted out of
/// whatever transport delivered it (§4.F step 1). Header keys are expected
/// lower-cased by the caller.
pub struct RawIngress {
    pub headers: HashMap<String, String>,
    pub raw_body: Vec<u8>,
}

impl RawIngress {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Source-specific identity extracted from the request before a tenant is
/// known (§4.F step 1). Fields not meaningful to a given source are left at
/// their default.
#[derive(Debug, Clone, Default)]
pub struct SourceIdentity {
    /// Commerce: the shop domain. Mail: the resolved inbound address.
    pub external_source_id: String,
    /// Commerce: the `x-<source>-topic` header value. Unused by mail, whose
    /// topic is decided after classification.
    pub topic_hint: Option<String>,
    /// The signature header's raw value — meaning is scheme-specific.
    pub signature: String,
    /// Commerce: `x-<source>-webhook-id`. Mail: the provider's message id.
    pub external_event_id: Option<String>,
    /// Mail only: the sender address, used for the per-sender rate limit.
    pub actor: Option<String>,
    /// Mail only: `svix-id`.
    pub svix_id: Option<String>,
    /// Mail only: `svix-timestamp`.
    pub svix_timestamp: Option<String>,
}

/// The tenant (and, for commerce, the connection; for mail, the inbound
/// address) an identity resolved to.
pub struct ResolvedTenant {
    pub tenant_id: TenantId,
    pub tenant_slug: String,
    pub connection: Option<DbConnection>,
    pub inbound_purpose: Option<MailPurpose>,
    pub inbound_address_id: Option<Uuid>,
}

/// Every outcome the pipeline can return, already aligned with the
/// HTTP status/body mapping in §6/§7 — `services/meridian-server` owns that
/// mapping, this type just carries enough information to make it.
#[derive(Debug, Clone)]
pub enum IngressOutcome {
    /// Accepted for processing. `dispatch_ok` is `false` when a handler
    /// failed or the deadline elapsed — the caller still gets 200 either way
    /// (§7), but the distinction is useful for logging.
    Processed { event_id: Uuid, dispatch_ok: bool },
    Duplicate { event_id: Uuid },
    /// Reserved and logged, but never dispatched (§4.G: auto-reply or spam
    /// past threshold). `event_id` is `None` only when classification ran
    /// before a reservation could be attempted (e.g. malformed identity).
    Ignored { event_id: Option<Uuid>, reason: &'static str },
    NotRegistered,
    RateLimited,
    MalformedPayload,
    InvalidSignature,
    ConfigError,
}

/// What a [`Source`] decided the dispatchable topic should be, or why it
/// decided not to dispatch at all (§4.G classification gate).
pub enum TopicDecision {
    Dispatch(String),
    Ignore(&'static str),
}

/// Collaborators every ingress pipeline needs, built once at process start
/// and shared across requests.
pub struct IngressContext {
    pub pool: PgPool,
    pub registry: Arc<TenantRegistry>,
    pub handlers: Arc<HandlerRegistry>,
    pub cache: meridian_db::cache::CacheManager,
    /// Per-request deadline wrapping dispatch (§5, default 25s).
    pub request_deadline: Duration,
    /// Default 300/minute per §5.
    pub rate_limit_per_minute: i64,
}

/// The four-method seam named in the design note, expressed as the full set
/// of steps a concrete source must supply: identity extraction, tenant
/// resolution, secret loading + verification, payload parsing, topic
/// selection, idempotency key construction, and any post-dispatch
/// bookkeeping (commerce touches `last_inbound_at`; mail has none).
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract_identity(&self, raw: &RawIngress) -> Result<SourceIdentity, IngressOutcome>;

    async fn resolve_tenant(&self, ctx: &IngressContext, identity: &SourceIdentity) -> Result<ResolvedTenant, IngressOutcome>;

    async fn load_secret(&self, ctx: &IngressContext, resolved: &ResolvedTenant) -> Result<Vec<u8>, IngressOutcome>;

    fn verify(&self, identity: &SourceIdentity, raw: &RawIngress, secret: &[u8]) -> bool;

    fn parse_payload(&self, raw: &RawIngress) -> Result<serde_json::Value, IngressOutcome>;

    /// `Ignore` still reaches reservation/logging — only dispatch is
    /// skipped (mail auto-reply/spam gate, §4.G).
    fn topic(&self, resolved: &ResolvedTenant, identity: &SourceIdentity, payload: &serde_json::Value) -> TopicDecision;

    /// `topic` is the dispatch topic for `TopicDecision::Dispatch`, or the
    /// fixed string `"ignored"` for `TopicDecision::Ignore` — sources whose
    /// idempotency key does not depend on topic (inbound mail) can ignore
    /// the distinction.
    fn idempotency_key(&self, resolved: &ResolvedTenant, identity: &SourceIdentity, topic: &str, payload: &serde_json::Value) -> IdempotencyKey;

    /// Extra rate-limit bucket identifiers beyond the universal per-tenant
    /// one (§5: inbound mail also rate-limits per sender).
    fn rate_limit_identifiers(&self, resolved: &ResolvedTenant, identity: &SourceIdentity) -> Vec<String> {
        vec![format!("ingress:{}", resolved.tenant_slug)]
    }

    async fn after_dispatch(&self, ctx: &IngressContext, resolved: &ResolvedTenant, identity: &SourceIdentity);
}

/// Runs the full ten-step pipeline (§4.F) for one request against `source`.
pub async fn run_ingress<S: Source>(ctx: &IngressContext, source: &S, raw: RawIngress) -> IngressOutcome {
    let identity = match source.extract_identity(&raw) {
        Ok(identity) => identity,
        Err(outcome) => return outcome,
    };

    let resolved = match source.resolve_tenant(ctx, &identity).await {
        Ok(resolved) => resolved,
        Err(outcome) => return outcome,
    };

    for key in source.rate_limit_identifiers(&resolved, &identity) {
        match ctx.cache.rate_limit_incr(&key, 60).await {
            Ok(count) if count > ctx.rate_limit_per_minute => {
                tracing::warn!(source = source.name(), tenant = %resolved.tenant_slug, key = %key, "rate limit exceeded");
                return IngressOutcome::RateLimited;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "rate limiter unavailable, failing open"),
        }
    }

    let secret = match source.load_secret(ctx, &resolved).await {
        Ok(secret) => secret,
        Err(outcome) => return outcome,
    };

    if !source.verify(&identity, &raw, &secret) {
        tracing::warn!(source = source.name(), tenant = %resolved.tenant_slug, "signature verification failed");
        return IngressOutcome::InvalidSignature;
    }

    let payload = match source.parse_payload(&raw) {
        Ok(payload) => payload,
        Err(outcome) => return outcome,
    };

    let (topic, ignore_reason) = match source.topic(&resolved, &identity, &payload) {
        TopicDecision::Dispatch(topic) => (topic, None),
        TopicDecision::Ignore(reason) => ("ignored".to_string(), Some(reason)),
    };

    let idempotency_key = source.idempotency_key(&resolved, &identity, &topic, &payload);
    let headers_json = serde_json::to_value(&raw.headers).unwrap_or(serde_json::Value::Null);

    let tenant_id = resolved.tenant_id;
    let tenant_slug = resolved.tenant_slug.clone();
    let external_source_id = identity.external_source_id.clone();
    let external_event_id = identity.external_event_id.clone();
    let pool = ctx.pool.clone();
    let handlers = Arc::clone(&ctx.handlers);
    let request_deadline = ctx.request_deadline;

    let scoped = with_tenant(&pool, tenant_id, &tenant_slug, move |scope| async move {
        let reserved = {
            let mut conn = scope.connection().await;
            EventLogRepo::reserve(
                &mut conn,
                &external_source_id,
                &topic,
                external_event_id.as_deref(),
                payload,
                headers_json,
                true,
                idempotency_key.as_str(),
            )
            .await
        };

        match reserved {
            Ok(ReserveOutcome::Existing(row)) => IngressOutcome::Duplicate { event_id: row.id },
            Ok(ReserveOutcome::Inserted(row)) => {
                if let Some(reason) = ignore_reason {
                    let mut conn = scope.connection().await;
                    let _ = EventLogRepo::mark_ignored(&mut conn, row.id, reason).await;
                    return IngressOutcome::Ignored { event_id: Some(row.id), reason };
                }

                let dispatch = handlers.dispatch(&pool, tenant_id, &tenant_slug, &row);
                match tokio::time::timeout(request_deadline, dispatch).await {
                    Ok(Ok(())) => {
                        let mut conn = scope.connection().await;
                        let _ = EventLogRepo::mark_completed(&mut conn, row.id).await;
                        IngressOutcome::Processed { event_id: row.id, dispatch_ok: true }
                    }
                    Ok(Err(e)) => {
                        let mut conn = scope.connection().await;
                        let _ = EventLogRepo::mark_failed(&mut conn, row.id, &e.to_string()).await;
                        IngressOutcome::Processed { event_id: row.id, dispatch_ok: false }
                    }
                    Err(_) => {
                        let mut conn = scope.connection().await;
                        let _ = EventLogRepo::mark_failed(&mut conn, row.id, "deadline exceeded").await;
                        IngressOutcome::Processed { event_id: row.id, dispatch_ok: false }
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to reserve event");
                IngressOutcome::ConfigError
            }
        }
    })
    .await;

    let outcome = match scoped {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "tenant scope error during ingress");
            IngressOutcome::ConfigError
        }
    };

    source.after_dispatch(ctx, &resolved, &identity).await;
    outcome
}

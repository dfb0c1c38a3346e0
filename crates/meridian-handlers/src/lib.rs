//! Meridian Domain Handlers (§4.I): the topic-specific side effects that run
//! after an event has been reserved and logged. Each handler takes only a
//! `&TenantScope` and the stored `DbEventRecord` — no axum types, no direct
//! pool access — so it composes into `HandlerRegistry::dispatch` without
//! knowing anything about HTTP or ingress.

mod payload;

pub mod commerce;
pub mod gdpr;
pub mod mail;

use std::sync::Arc;

use meridian_dispatch::{Handler, HandlerRegistry};

/// Registers every handler this core ships with, grounded on each topic's
/// §4.I behavior. GDPR topics are registered here like any other handler —
/// only their *webhook subscription* is Partner-only (§9), not their
/// dispatch wiring.
pub fn register_default_handlers(registry: &HandlerRegistry, deps: HandlerDeps) {
    registry.register(Arc::new(commerce::OrderCreateHandler::new(deps.jobs.clone())));
    registry.register(Arc::new(commerce::OrderUpdatedHandler));
    registry.register(Arc::new(commerce::OrderPaidHandler::new(deps.jobs.clone())));
    registry.register(Arc::new(commerce::OrderCancelledHandler::new(deps.jobs.clone())));
    registry.register(Arc::new(commerce::OrderFulfilledHandler::new(deps.jobs.clone())));

    registry.register(Arc::new(commerce::ProductCreateHandler::new(deps.jobs.clone())));
    registry.register(Arc::new(commerce::ProductUpdateHandler::new(deps.jobs.clone())));
    registry.register(Arc::new(commerce::ProductDeleteHandler));

    registry.register(Arc::new(commerce::CustomerCreateHandler::new(deps.jobs.clone())));
    registry.register(Arc::new(commerce::CustomerUpdateHandler::new(deps.jobs.clone())));
    // `customers/delete` is one topic shared with the GDPR mandatory webhook
    // of the same name (see gdpr::CustomersDeleteHandler below) — only one
    // handler may own it.

    registry.register(Arc::new(commerce::RefundCreateHandler::new(deps.jobs.clone())));

    registry.register(Arc::new(commerce::FulfillmentCreateHandler::new(deps.jobs.clone())));
    registry.register(Arc::new(commerce::FulfillmentUpdateHandler::new(deps.jobs.clone())));

    registry.register(Arc::new(commerce::AppUninstalledHandler::new(deps.jobs.clone(), deps.connections.clone())));

    registry.register(Arc::new(gdpr::CustomersRedactHandler));
    registry.register(Arc::new(gdpr::ShopRedactHandler::new(deps.connections.clone())));
    registry.register(Arc::new(gdpr::CustomersDataRequestHandler));
    registry.register(Arc::new(gdpr::CustomersDeleteHandler));

    registry.register(Arc::new(mail::TreasuryHandler));
    registry.register(Arc::new(mail::ReceiptsHandler::new(deps.blobs.clone())));
    registry.register(Arc::new(mail::SupportHandler));
    registry.register(Arc::new(mail::CreatorHandler));
    registry.register(Arc::new(mail::GeneralHandler));
}

/// Shared, process-wide collaborators every handler construction needs.
/// Kept as one struct (rather than threading each field individually)
/// because `register_default_handlers` is the single call site that wires
/// up the whole registry at startup.
#[derive(Clone)]
pub struct HandlerDeps {
    pub jobs: Arc<dyn meridian_dispatch::JobDispatcher>,
    pub connections: Arc<meridian_db::ConnectionRepo>,
    pub blobs: Arc<dyn meridian_dispatch::BlobStore>,
}

pub(crate) fn job_request(
    ctx: &meridian_tenancy::TenantScope,
    topic: &str,
    payload: serde_json::Value,
) -> meridian_dispatch::JobRequest {
    meridian_dispatch::JobRequest {
        tenant_id: ctx.tenant_id(),
        tenant_slug: ctx.tenant_slug().to_string(),
        topic: topic.to_string(),
        payload,
    }
}

pub(crate) fn typed_payload<T: serde::de::DeserializeOwned>(
    event: &meridian_db::DbEventRecord,
) -> Result<T, meridian_dispatch::HandlerError> {
    serde_json::from_value(event.payload.clone())
        .map_err(|e| meridian_dispatch::HandlerError::Failed(format!("payload did not match {}: {e}", event.topic)))
}

pub(crate) use payload::*;

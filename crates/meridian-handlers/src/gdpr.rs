//! GDPR mandatory-compliance handlers (§4.I). These share topic strings
//! with `meridian_types::topic::commerce::GDPR_TOPICS` — Shopify registers
//! `customers/redact`, `shop/redact`, `customers/data_request`, and
//! `customers/delete` as Partner-only subscriptions (§9), but once an event
//! for one of them arrives, dispatch treats it like any other topic.

use std::sync::Arc;

use async_trait::async_trait;
use meridian_db::{redaction_sentinel_email, ConnectionRepo, CustomerRepo, DbEventRecord, OrderRepo};
use meridian_dispatch::HandlerError;
use meridian_tenancy::TenantScope;

use crate::{typed_payload, CustomerDeletePayload, GdprRedactPayload};

/// Anonymizes the customer's PII as `customers/delete` does, additionally
/// rewriting `orders.customer_email` for every order id in
/// `orders_to_redact` to the same sentinel, and deletes the customer's
/// address rows (§4.I).
pub struct CustomersRedactHandler;

#[async_trait]
impl meridian_dispatch::Handler for CustomersRedactHandler {
    fn topic(&self) -> &'static str {
        "customers/redact"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: GdprRedactPayload = typed_payload(event)?;
        let sentinel = redaction_sentinel_email(&payload.customer.id);

        let mut conn = ctx.connection().await;
        CustomerRepo::redact(&mut conn, &payload.customer.id, &sentinel).await?;
        if !payload.orders_to_redact.is_empty() {
            OrderRepo::redact_customer_email(&mut conn, &payload.orders_to_redact, &sentinel).await?;
        }
        Ok(())
    }
}

/// Executed 48h after uninstall: marks the connection as deleted and sets
/// all sealed credential columns to null (§4.I). The 48h scheduling delay
/// is the caller's responsibility (the health/retry scheduler or the
/// partner's own webhook timing) — this handler only performs the write.
pub struct ShopRedactHandler {
    connections: Arc<ConnectionRepo>,
}

impl ShopRedactHandler {
    pub fn new(connections: Arc<ConnectionRepo>) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl meridian_dispatch::Handler for ShopRedactHandler {
    fn topic(&self) -> &'static str {
        "shop/redact"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        if let Some(connection) = self
            .connections
            .find_by_tenant(ctx.tenant_id().0, &event.external_source_id)
            .await?
        {
            self.connections.mark_deleted(connection.id).await?;
        }
        Ok(())
    }
}

/// Logged only: the fixed-idempotency-key event row is already inserted by
/// ingress (§4.E); no extraction runs synchronously (§4.I).
pub struct CustomersDataRequestHandler;

#[async_trait]
impl meridian_dispatch::Handler for CustomersDataRequestHandler {
    fn topic(&self) -> &'static str {
        "customers/data_request"
    }

    async fn handle(&self, _ctx: &TenantScope, _event: &DbEventRecord) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// `customers/delete`: the same topic string as the commerce "Customer
/// events" delete behavior (§4.I) — anonymizes PII, hard-deletes address
/// rows, preserves order history.
pub struct CustomersDeleteHandler;

#[async_trait]
impl meridian_dispatch::Handler for CustomersDeleteHandler {
    fn topic(&self) -> &'static str {
        "customers/delete"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: CustomerDeletePayload = typed_payload(event)?;
        let external_id = payload
            .customer_external_id()
            .ok_or_else(|| HandlerError::Failed("customers/delete payload had no customer id".to_string()))?;
        let sentinel = redaction_sentinel_email(external_id);
        let mut conn = ctx.connection().await;
        CustomerRepo::redact(&mut conn, external_id, &sentinel).await?;
        Ok(())
    }
}

//! Commerce webhook handlers (§4.I "Order events", "Customer events",
//! "Refund", "Product", "App uninstalled").

use std::sync::Arc;

use async_trait::async_trait;
use meridian_db::{
    ConnectionRepo, CustomerRepo, DbCustomer, DbCustomerAddress, DbEventRecord, DbFulfillment,
    DbOrder, DbOrderLineItem, DbProduct, DbRefund, DbRefundLineItem, FulfillmentRepo, OrderRepo,
    ProductRepo, RefundRepo,
};
use meridian_dispatch::{HandlerError, JobDispatcher};
use meridian_tenancy::TenantScope;
use meridian_types::MinorUnits;
use uuid::Uuid;

use crate::{
    job_request, typed_payload, CustomerPayload, FulfillmentPayload, OrderPayload, ProductPayload,
    RefundPayload,
};

fn money(raw: &Option<String>) -> i64 {
    raw.as_deref()
        .and_then(MinorUnits::from_decimal_str)
        .unwrap_or(MinorUnits::ZERO)
        .as_i64()
}

fn order_from_payload(payload: &OrderPayload) -> DbOrder {
    let gross = money(&payload.subtotal_price);
    let discounts = money(&payload.total_discounts);
    let tax = money(&payload.total_tax);
    let total = money(&payload.total_price);

    DbOrder {
        id: Uuid::new_v4(),
        external_id: payload.id.clone(),
        order_number: payload.name.clone(),
        customer_external_id: payload.customer.as_ref().map(|c| c.id.clone()),
        customer_email: payload.email.clone(),
        status: payload.financial_status.clone().unwrap_or_else(|| "pending".to_string()),
        fulfillment_status: payload.fulfillment_status.clone(),
        gross_sales_minor: gross,
        discounts_minor: discounts,
        tax_minor: tax,
        net_sales_minor: gross - discounts,
        total_amount_minor: total,
        refunded_amount_minor: 0,
        currency: payload.currency.clone(),
        synced_at: chrono::Utc::now(),
    }
}

fn line_items_from_payload(order_id: Uuid, payload: &OrderPayload) -> Vec<DbOrderLineItem> {
    payload
        .line_items
        .iter()
        .map(|item| DbOrderLineItem {
            id: Uuid::new_v4(),
            order_id,
            external_id: item.id.clone(),
            product_external_id: item.product_id.clone(),
            title: item.title.clone(),
            quantity: item.quantity,
            price_minor: MinorUnits::from_decimal_str(&item.price).unwrap_or(MinorUnits::ZERO).as_i64(),
            currency: payload.currency.clone(),
        })
        .collect()
}

/// *create*: upserts the order, replaces its line items atomically, then
/// enqueues the three follow-up jobs §4.I names (attribution, commission,
/// post-create).
pub struct OrderCreateHandler {
    jobs: Arc<dyn JobDispatcher>,
}

impl OrderCreateHandler {
    pub fn new(jobs: Arc<dyn JobDispatcher>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl meridian_dispatch::Handler for OrderCreateHandler {
    fn topic(&self) -> &'static str {
        "orders/create"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: OrderPayload = typed_payload(event)?;
        let order = order_from_payload(&payload);
        let line_items = line_items_from_payload(order.id, &payload);

        {
            let mut conn = ctx.connection().await;
            let stored = OrderRepo::upsert(&mut conn, &order).await?;
            OrderRepo::replace_line_items(&mut conn, stored.id, &line_items).await?;
        }

        for topic in ["jobs/attribution", "jobs/commission", "jobs/post-create"] {
            self.jobs
                .enqueue(job_request(ctx, topic, serde_json::json!({"order_external_id": order.external_id})))
                .await
                .map_err(|e| HandlerError::Failed(e.to_string()))?;
        }

        Ok(())
    }
}

/// *updated*: refreshes financial/fulfillment status only, no line-item
/// replacement and no follow-up jobs (§4.I).
pub struct OrderUpdatedHandler;

#[async_trait]
impl meridian_dispatch::Handler for OrderUpdatedHandler {
    fn topic(&self) -> &'static str {
        "orders/updated"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: OrderPayload = typed_payload(event)?;
        let mut conn = ctx.connection().await;
        OrderRepo::update_status(
            &mut conn,
            &payload.id,
            payload.financial_status.as_deref().unwrap_or("pending"),
            payload.fulfillment_status.as_deref(),
        )
        .await?;
        Ok(())
    }
}

/// *paid* = updated + enqueue gift-card-reward and pixel jobs (§4.I).
pub struct OrderPaidHandler {
    jobs: Arc<dyn JobDispatcher>,
}

impl OrderPaidHandler {
    pub fn new(jobs: Arc<dyn JobDispatcher>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl meridian_dispatch::Handler for OrderPaidHandler {
    fn topic(&self) -> &'static str {
        "orders/paid"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: OrderPayload = typed_payload(event)?;
        {
            let mut conn = ctx.connection().await;
            OrderRepo::update_status(
                &mut conn,
                &payload.id,
                payload.financial_status.as_deref().unwrap_or("paid"),
                payload.fulfillment_status.as_deref(),
            )
            .await?;
        }

        for topic in ["jobs/gift-card-reward", "jobs/pixel"] {
            self.jobs
                .enqueue(job_request(ctx, topic, serde_json::json!({"order_external_id": payload.id})))
                .await
                .map_err(|e| HandlerError::Failed(e.to_string()))?;
        }
        Ok(())
    }
}

/// *cancelled* = updated + enqueue commission-reversal and A/B-exclusion
/// jobs (§4.I).
pub struct OrderCancelledHandler {
    jobs: Arc<dyn JobDispatcher>,
}

impl OrderCancelledHandler {
    pub fn new(jobs: Arc<dyn JobDispatcher>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl meridian_dispatch::Handler for OrderCancelledHandler {
    fn topic(&self) -> &'static str {
        "orders/cancelled"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: OrderPayload = typed_payload(event)?;
        {
            let mut conn = ctx.connection().await;
            OrderRepo::update_status(
                &mut conn,
                &payload.id,
                payload.financial_status.as_deref().unwrap_or("cancelled"),
                payload.fulfillment_status.as_deref(),
            )
            .await?;
        }

        for topic in ["jobs/commission-reversal", "jobs/ab-exclusion"] {
            self.jobs
                .enqueue(job_request(ctx, topic, serde_json::json!({"order_external_id": payload.id})))
                .await
                .map_err(|e| HandlerError::Failed(e.to_string()))?;
        }
        Ok(())
    }
}

/// *fulfilled*: upserts a fulfillment row, sets the order's fulfillment
/// status, enqueues review-request and post-fulfill jobs (§4.I).
pub struct OrderFulfilledHandler {
    jobs: Arc<dyn JobDispatcher>,
}

impl OrderFulfilledHandler {
    pub fn new(jobs: Arc<dyn JobDispatcher>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl meridian_dispatch::Handler for OrderFulfilledHandler {
    fn topic(&self) -> &'static str {
        "orders/fulfilled"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: FulfillmentPayload = typed_payload(event)?;
        {
            let mut conn = ctx.connection().await;
            let fulfillment = DbFulfillment {
                id: Uuid::new_v4(),
                external_id: payload.id.clone(),
                order_external_id: payload.order_id.clone(),
                status: payload.status.clone().unwrap_or_else(|| "fulfilled".to_string()),
                tracking_number: payload.tracking_number.clone(),
                tracking_url: payload.tracking_url.clone(),
                synced_at: chrono::Utc::now(),
            };
            FulfillmentRepo::upsert(&mut conn, &fulfillment).await?;

            if let Some(order) = OrderRepo::find_by_external_id(&mut conn, &payload.order_id).await? {
                OrderRepo::update_status(&mut conn, &order.external_id, &order.status, Some("fulfilled")).await?;
            }
        }

        for topic in ["jobs/review-request", "jobs/post-fulfill"] {
            self.jobs
                .enqueue(job_request(ctx, topic, serde_json::json!({"order_external_id": payload.order_id})))
                .await
                .map_err(|e| HandlerError::Failed(e.to_string()))?;
        }
        Ok(())
    }
}

/// `fulfillments/create`: separate from `orders/fulfilled` in the topic
/// vocabulary (§4.H) but the same essential write — grounded on the same
/// upsert-plus-order-status behavior since both topics describe the
/// creation of a fulfillment on an order.
pub struct FulfillmentCreateHandler {
    jobs: Arc<dyn JobDispatcher>,
}

impl FulfillmentCreateHandler {
    pub fn new(jobs: Arc<dyn JobDispatcher>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl meridian_dispatch::Handler for FulfillmentCreateHandler {
    fn topic(&self) -> &'static str {
        "fulfillments/create"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: FulfillmentPayload = typed_payload(event)?;
        {
            let mut conn = ctx.connection().await;
            let fulfillment = DbFulfillment {
                id: Uuid::new_v4(),
                external_id: payload.id.clone(),
                order_external_id: payload.order_id.clone(),
                status: payload.status.clone().unwrap_or_else(|| "fulfilled".to_string()),
                tracking_number: payload.tracking_number.clone(),
                tracking_url: payload.tracking_url.clone(),
                synced_at: chrono::Utc::now(),
            };
            FulfillmentRepo::upsert(&mut conn, &fulfillment).await?;

            if let Some(order) = OrderRepo::find_by_external_id(&mut conn, &payload.order_id).await? {
                OrderRepo::update_status(&mut conn, &order.external_id, &order.status, Some("fulfilled")).await?;
            }
        }

        self.jobs
            .enqueue(job_request(ctx, "jobs/review-request", serde_json::json!({"order_external_id": payload.order_id})))
            .await
            .map_err(|e| HandlerError::Failed(e.to_string()))?;
        Ok(())
    }
}

/// `fulfillments/update`: tracking/status refresh only, no order-status
/// side effect and no follow-up job.
pub struct FulfillmentUpdateHandler;

#[async_trait]
impl meridian_dispatch::Handler for FulfillmentUpdateHandler {
    fn topic(&self) -> &'static str {
        "fulfillments/update"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: FulfillmentPayload = typed_payload(event)?;
        let mut conn = ctx.connection().await;
        let fulfillment = DbFulfillment {
            id: Uuid::new_v4(),
            external_id: payload.id.clone(),
            order_external_id: payload.order_id.clone(),
            status: payload.status.clone().unwrap_or_else(|| "in_transit".to_string()),
            tracking_number: payload.tracking_number.clone(),
            tracking_url: payload.tracking_url.clone(),
            synced_at: chrono::Utc::now(),
        };
        FulfillmentRepo::upsert(&mut conn, &fulfillment).await?;
        Ok(())
    }
}

fn customer_from_payload(payload: &CustomerPayload) -> DbCustomer {
    DbCustomer {
        id: Uuid::new_v4(),
        external_id: payload.id.clone(),
        email: payload.email.clone(),
        first_name: payload.first_name.clone(),
        last_name: payload.last_name.clone(),
        phone: payload.phone.clone(),
        synced_at: chrono::Utc::now(),
    }
}

fn addresses_from_payload(external_id: &str, payload: &CustomerPayload) -> Vec<DbCustomerAddress> {
    payload
        .addresses
        .iter()
        .filter_map(|addr| {
            addr.address1.clone().map(|line1| DbCustomerAddress {
                id: Uuid::new_v4(),
                customer_external_id: external_id.to_string(),
                line1,
                line2: addr.address2.clone(),
                city: addr.city.clone(),
                province: addr.province.clone(),
                country: addr.country.clone(),
                zip: addr.zip.clone(),
            })
        })
        .collect()
}

/// *create*/*update*: upsert customer, replace address list, enqueue a
/// customer-sync job (§4.I).
pub struct CustomerCreateHandler {
    jobs: Arc<dyn JobDispatcher>,
}

impl CustomerCreateHandler {
    pub fn new(jobs: Arc<dyn JobDispatcher>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl meridian_dispatch::Handler for CustomerCreateHandler {
    fn topic(&self) -> &'static str {
        "customers/create"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: CustomerPayload = typed_payload(event)?;
        let customer = customer_from_payload(&payload);
        let addresses = addresses_from_payload(&payload.id, &payload);
        {
            let mut conn = ctx.connection().await;
            CustomerRepo::upsert(&mut conn, &customer).await?;
            CustomerRepo::replace_addresses(&mut conn, &customer.external_id, &addresses).await?;
        }
        self.jobs
            .enqueue(job_request(ctx, "jobs/customer-sync", serde_json::json!({"customer_external_id": customer.external_id})))
            .await
            .map_err(|e| HandlerError::Failed(e.to_string()))?;
        Ok(())
    }
}

pub struct CustomerUpdateHandler {
    jobs: Arc<dyn JobDispatcher>,
}

impl CustomerUpdateHandler {
    pub fn new(jobs: Arc<dyn JobDispatcher>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl meridian_dispatch::Handler for CustomerUpdateHandler {
    fn topic(&self) -> &'static str {
        "customers/update"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: CustomerPayload = typed_payload(event)?;
        let customer = customer_from_payload(&payload);
        let addresses = addresses_from_payload(&payload.id, &payload);
        {
            let mut conn = ctx.connection().await;
            CustomerRepo::upsert(&mut conn, &customer).await?;
            CustomerRepo::replace_addresses(&mut conn, &customer.external_id, &addresses).await?;
        }
        self.jobs
            .enqueue(job_request(ctx, "jobs/customer-sync", serde_json::json!({"customer_external_id": customer.external_id})))
            .await
            .map_err(|e| HandlerError::Failed(e.to_string()))?;
        Ok(())
    }
}

// *delete* (customers): the same anonymization the GDPR `customers/delete`
// topic performs (§4.I); registered once under
// `crate::gdpr::CustomersDeleteHandler` since the two are, per the topic
// vocabulary, literally the same string — there is no separate commerce
// handler here.

/// *create*/*update* (products): the webhook payload lacks enough detail
/// for a full sync, so both trigger a full-product-sync job rather than
/// writing partial fields (§4.I).
pub struct ProductCreateHandler {
    jobs: Arc<dyn JobDispatcher>,
}

impl ProductCreateHandler {
    pub fn new(jobs: Arc<dyn JobDispatcher>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl meridian_dispatch::Handler for ProductCreateHandler {
    fn topic(&self) -> &'static str {
        "products/create"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: ProductPayload = typed_payload(event)?;
        let product = DbProduct {
            id: Uuid::new_v4(),
            external_id: payload.id.clone(),
            title: payload.title.clone().unwrap_or_default(),
            status: "active".to_string(),
            synced_at: chrono::Utc::now(),
        };
        {
            let mut conn = ctx.connection().await;
            ProductRepo::upsert(&mut conn, &product).await?;
        }
        self.jobs
            .enqueue(job_request(ctx, "jobs/product-sync", serde_json::json!({"product_external_id": product.external_id})))
            .await
            .map_err(|e| HandlerError::Failed(e.to_string()))?;
        Ok(())
    }
}

pub struct ProductUpdateHandler {
    jobs: Arc<dyn JobDispatcher>,
}

impl ProductUpdateHandler {
    pub fn new(jobs: Arc<dyn JobDispatcher>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl meridian_dispatch::Handler for ProductUpdateHandler {
    fn topic(&self) -> &'static str {
        "products/update"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: ProductPayload = typed_payload(event)?;
        let product = DbProduct {
            id: Uuid::new_v4(),
            external_id: payload.id.clone(),
            title: payload.title.clone().unwrap_or_default(),
            status: "active".to_string(),
            synced_at: chrono::Utc::now(),
        };
        {
            let mut conn = ctx.connection().await;
            ProductRepo::upsert(&mut conn, &product).await?;
        }
        self.jobs
            .enqueue(job_request(ctx, "jobs/product-sync", serde_json::json!({"product_external_id": product.external_id})))
            .await
            .map_err(|e| HandlerError::Failed(e.to_string()))?;
        Ok(())
    }
}

/// *delete* (products): archives rather than removing the row (§4.I).
pub struct ProductDeleteHandler;

#[async_trait]
impl meridian_dispatch::Handler for ProductDeleteHandler {
    fn topic(&self) -> &'static str {
        "products/delete"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: crate::CustomerRefPayload = typed_payload(event)?;
        let mut conn = ctx.connection().await;
        ProductRepo::mark_archived(&mut conn, &payload.id).await?;
        Ok(())
    }
}

/// Inserts a refund row aggregating successful refund transactions into a
/// single minor-unit total; increments the order's refunded-amount column;
/// replaces refund line items; enqueues commission-adjustment, pixel, and
/// analytics jobs (§4.I).
pub struct RefundCreateHandler {
    jobs: Arc<dyn JobDispatcher>,
}

impl RefundCreateHandler {
    pub fn new(jobs: Arc<dyn JobDispatcher>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl meridian_dispatch::Handler for RefundCreateHandler {
    fn topic(&self) -> &'static str {
        "refunds/create"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: RefundPayload = typed_payload(event)?;

        let amount_minor: i64 = payload
            .transactions
            .iter()
            .filter(|t| t.status.as_deref() == Some("success"))
            .filter_map(|t| t.amount.as_deref())
            .filter_map(MinorUnits::from_decimal_str)
            .map(|m| m.as_i64())
            .sum();

        let refund = DbRefund {
            id: Uuid::new_v4(),
            external_id: payload.id.clone(),
            order_external_id: payload.order_id.clone(),
            amount_minor,
            currency: "USD".to_string(),
            reason: payload.note.clone(),
            synced_at: chrono::Utc::now(),
        };

        let line_items: Vec<DbRefundLineItem> = payload
            .refund_line_items
            .iter()
            .map(|item| DbRefundLineItem {
                id: Uuid::new_v4(),
                refund_id: refund.id,
                order_line_item_external_id: item.line_item_id.clone(),
                quantity: item.quantity,
                amount_minor: item.subtotal.as_deref().and_then(MinorUnits::from_decimal_str).unwrap_or(MinorUnits::ZERO).as_i64(),
            })
            .collect();

        {
            let mut conn = ctx.connection().await;
            let stored = RefundRepo::upsert(&mut conn, &refund).await?;
            RefundRepo::replace_line_items(&mut conn, stored.id, &line_items).await?;
            OrderRepo::increment_refunded_amount(&mut conn, &refund.order_external_id, amount_minor).await?;
        }

        for topic in ["jobs/commission-adjustment", "jobs/pixel", "jobs/analytics"] {
            self.jobs
                .enqueue(job_request(ctx, topic, serde_json::json!({"refund_external_id": refund.external_id, "order_external_id": refund.order_external_id})))
                .await
                .map_err(|e| HandlerError::Failed(e.to_string()))?;
        }
        Ok(())
    }
}

/// Marks the connection as disconnected, clears sealed credentials to null,
/// and triggers a cleanup job. "Marks all webhook registrations for that
/// shop as deleted" has no separate registration table in this core — the
/// connection row's `status` is the single source of registration truth, so
/// this handler's `mark_disconnected` call is that step (§4.I).
pub struct AppUninstalledHandler {
    jobs: Arc<dyn JobDispatcher>,
    connections: Arc<ConnectionRepo>,
}

impl AppUninstalledHandler {
    pub fn new(jobs: Arc<dyn JobDispatcher>, connections: Arc<ConnectionRepo>) -> Self {
        Self { jobs, connections }
    }
}

#[async_trait]
impl meridian_dispatch::Handler for AppUninstalledHandler {
    fn topic(&self) -> &'static str {
        "app/uninstalled"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        if let Some(connection) = self
            .connections
            .find_by_tenant(ctx.tenant_id().0, &event.external_source_id)
            .await?
        {
            self.connections.mark_disconnected(connection.id).await?;
        }

        self.jobs
            .enqueue(job_request(ctx, "jobs/uninstall-cleanup", serde_json::json!({"shop": event.external_source_id})))
            .await
            .map_err(|e| HandlerError::Failed(e.to_string()))?;
        Ok(())
    }
}

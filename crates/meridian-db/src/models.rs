//! Row types. Each mirrors a table from §3 of the data model; money columns
//! are `BIGINT` minor units, never `NUMERIC`/`FLOAT`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbTenant {
    pub id: Uuid,
    pub slug: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbConnection {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub external_id: String,
    pub sealed_access_token: String,
    pub sealed_webhook_secret: Option<String>,
    pub capabilities: Vec<String>,
    pub protocol_version: String,
    pub status: String,
    pub last_inbound_at: Option<DateTime<Utc>>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub installed_at: DateTime<Utc>,
    pub consecutive_registration_failures: i32,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbInboundAddress {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub address: String,
    pub purpose: String,
    pub display_name: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbOAuthState {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub external_source_candidate: String,
    pub redirect: String,
    pub expires_at: DateTime<Utc>,
}

/// A row of the tenant-schema-scoped event log (§3, §4.E).
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbEventRecord {
    pub id: Uuid,
    pub external_source_id: String,
    pub topic: String,
    pub external_event_id: Option<String>,
    pub payload: serde_json::Value,
    pub hmac_verified: bool,
    pub status: String,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub idempotency_key: String,
    pub received_at: DateTime<Utc>,
    pub headers: serde_json::Value,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbOrder {
    pub id: Uuid,
    pub external_id: String,
    pub order_number: Option<String>,
    pub customer_external_id: Option<String>,
    /// Snapshot of the order's contact email at sync time, independent of
    /// the linked customer row (an order outlives `customers/delete`).
    /// The GDPR `customers/redact` target column (§4.I).
    pub customer_email: Option<String>,
    pub status: String,
    pub fulfillment_status: Option<String>,
    /// Gross sales before discounts (§8 S1: `subtotal_price`).
    pub gross_sales_minor: i64,
    pub discounts_minor: i64,
    pub tax_minor: i64,
    /// Net of discounts, before tax (`gross_sales_minor - discounts_minor`).
    pub net_sales_minor: i64,
    pub total_amount_minor: i64,
    pub refunded_amount_minor: i64,
    pub currency: String,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbCustomerAddress {
    pub id: Uuid,
    pub customer_external_id: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbRefundLineItem {
    pub id: Uuid,
    pub refund_id: Uuid,
    pub order_line_item_external_id: String,
    pub quantity: i32,
    pub amount_minor: i64,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbOrderLineItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub external_id: String,
    pub product_external_id: Option<String>,
    pub title: String,
    pub quantity: i32,
    pub price_minor: i64,
    pub currency: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbCustomer {
    pub id: Uuid,
    pub external_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbFulfillment {
    pub id: Uuid,
    pub external_id: String,
    pub order_external_id: String,
    pub status: String,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbRefund {
    pub id: Uuid,
    pub external_id: String,
    pub order_external_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub reason: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbProduct {
    pub id: Uuid,
    pub external_id: String,
    pub title: String,
    pub status: String,
    pub synced_at: DateTime<Utc>,
}

/// A parsed inbound receipt email (§3 "content-derived records", §4.I
/// *receipts*). `attachment_urls` points into blob storage, one entry per
/// attachment that passed the content-type/size filter.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbReceiptRecord {
    pub id: Uuid,
    pub source_event_id: Uuid,
    pub vendor: Option<String>,
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    pub occurred_on: Option<DateTime<Utc>>,
    pub attachment_urls: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A contact resolved from an inbound sender address (§4.I *support*/*creator*).
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbContact {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A treasury approval/rejection communication parsed from inbound mail
/// (§4.I *treasury*).
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbTreasuryCommunication {
    pub id: Uuid,
    pub source_event_id: Uuid,
    pub request_id: Option<String>,
    pub direction: String,
    pub verdict: String,
    pub confidence: String,
    pub matched_tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbThreadRecord {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub purpose: String,
    pub subject: Option<String>,
    pub external_thread_key: String,
    pub status: String,
    pub message_count: i32,
    pub last_inbound_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbThreadMessageRecord {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub source_event_id: Uuid,
    pub sender: String,
    pub body_excerpt: String,
    pub created_at: DateTime<Utc>,
}

/// A spooled follow-up job the live sink could not acknowledge in time
/// (§3b, §4.K).
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DbOutboxJob {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub topic: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub enqueued_at: DateTime<Utc>,
}

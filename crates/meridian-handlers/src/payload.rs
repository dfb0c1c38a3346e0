//! Narrow, topic-specific payload shapes (§9 design note: "define narrow
//! record types per topic and perform the parse once"). The ingress has
//! already validated the body is well-formed JSON before reservation;
//! handlers deserialize the stored `serde_json::Value` into one of these
//! the moment they need typed access, and treat a field that doesn't
//! parse as simply absent rather than failing the whole handler, since a
//! money string parse failure shouldn't make an otherwise-good order
//! unprocessable.

use serde::Deserialize;

fn deserialize_flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdValue {
        Number(i64),
        Text(String),
    }
    match IdValue::deserialize(deserializer)? {
        IdValue::Number(n) => Ok(n.to_string()),
        IdValue::Text(s) => Ok(s),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineItemPayload {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub title: String,
    pub quantity: i32,
    pub price: String,
    #[serde(default, deserialize_with = "deserialize_flexible_id_opt")]
    pub product_id: Option<String>,
}

fn deserialize_flexible_id_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdValue {
        Number(i64),
        Text(String),
        Null,
    }
    match Option::<IdValue>::deserialize(deserializer)? {
        Some(IdValue::Number(n)) => Ok(Some(n.to_string())),
        Some(IdValue::Text(s)) => Ok(Some(s)),
        Some(IdValue::Null) | None => Ok(None),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRefPayload {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderPayload {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub customer: Option<CustomerRefPayload>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    #[serde(default)]
    pub subtotal_price: Option<String>,
    #[serde(default)]
    pub total_discounts: Option<String>,
    #[serde(default)]
    pub total_tax: Option<String>,
    #[serde(default)]
    pub total_price: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub line_items: Vec<OrderLineItemPayload>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressPayload {
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerPayload {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub addresses: Vec<AddressPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductPayload {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundTransactionPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundLineItemPayload {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub line_item_id: String,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub subtotal: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundPayload {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub order_id: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub transactions: Vec<RefundTransactionPayload>,
    #[serde(default)]
    pub refund_line_items: Vec<RefundLineItemPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FulfillmentPayload {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub order_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub tracking_url: Option<String>,
}

/// `customers/delete` arrives in either shape depending on whether the
/// merchant or the GDPR mandatory-webhook path triggered it: a bare
/// customer object, or `{"customer": {...}, ...}` (§4.I — the two share one
/// topic string, so one handler must accept both).
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDeletePayload {
    #[serde(default, deserialize_with = "deserialize_flexible_id_opt")]
    pub id: Option<String>,
    #[serde(default)]
    pub customer: Option<CustomerRefPayload>,
}

impl CustomerDeletePayload {
    pub fn customer_external_id(&self) -> Option<&str> {
        self.customer.as_ref().map(|c| c.id.as_str()).or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GdprRedactPayload {
    pub customer: CustomerRefPayload,
    #[serde(default)]
    pub orders_to_redact: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GdprDataRequestPayload {
    pub customer: CustomerRefPayload,
    #[serde(default)]
    pub shop_domain: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailAttachmentPayload {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub data_base64: String,
}

/// The parsed shape inbound-mail ingress stores as `event_log.payload`;
/// header lines live in the sibling `headers` column instead (same split
/// webhook events use).
#[derive(Debug, Clone, Deserialize)]
pub struct MailEventPayload {
    pub sender: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<MailAttachmentPayload>,
    #[serde(default)]
    pub references: Vec<String>,
}

/// Flattens the `headers` JSON object column into the
/// `HashMap<String, String>` the classifier expects, coercing non-string
/// values with `to_string` rather than dropping them.
pub fn headers_map(headers: &serde_json::Value) -> std::collections::HashMap<String, String> {
    headers
        .as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.to_lowercase(), v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

//! Inbound-mail handlers (§4.I "Inbound-mail handlers"). Classification
//! (auto-reply / spam detection) has already happened in the ingress
//! pipeline before dispatch — these handlers only run for mail that reached
//! a real purpose topic.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use meridian_classifier::{classify_approval, extract_receipt_fields, extract_request_id, Confidence, MailContent, Verdict};
use meridian_db::{ContactRepo, DbEventRecord, ReceiptRepo, ThreadRepo, TreasuryCommunicationRepo};
use meridian_dispatch::{receipt_blob_path, BlobStore, HandlerError};
use meridian_tenancy::TenantScope;

use crate::{headers_map, typed_payload, MailEventPayload};

fn verdict_str(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Approved => "approved",
        Verdict::Rejected => "rejected",
        Verdict::Unclear => "unclear",
    }
}

fn confidence_str(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::High => "high",
        Confidence::Medium => "medium",
        Confidence::Low => "low",
    }
}

/// Parses approval status, extracts the `SBA-YYYYMM-NNN` request id from
/// the subject, and inserts a treasury-communication row (§4.I *treasury*).
pub struct TreasuryHandler;

#[async_trait]
impl meridian_dispatch::Handler for TreasuryHandler {
    fn topic(&self) -> &'static str {
        "mail/treasury"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: MailEventPayload = typed_payload(event)?;
        let headers = headers_map(&event.headers);
        let content = MailContent {
            headers: &headers,
            sender: &payload.sender,
            subject: &payload.subject,
            body: &payload.body,
        };

        let verdict = classify_approval(&content);
        let request_id = extract_request_id(&payload.subject);

        let mut conn = ctx.connection().await;
        TreasuryCommunicationRepo::insert(
            &mut conn,
            event.id,
            request_id.as_deref(),
            "inbound",
            verdict_str(verdict.verdict),
            confidence_str(verdict.confidence),
            &verdict.matched_tokens,
        )
        .await?;
        Ok(())
    }
}

/// Permitted receipt attachment content types (§4.I *receipts*): common
/// invoice/receipt formats only, matching the size ceiling of 10 MiB.
const PERMITTED_ATTACHMENT_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png", "image/heic"];
const MAX_ATTACHMENT_BYTES: i64 = 10 * 1024 * 1024;

/// Filters attachments to the permitted types and size, uploads each to
/// blob storage, inserts a receipt row referencing the stored attachments,
/// and attempts best-effort field extraction from the mail text (§4.I
/// *receipts*).
pub struct ReceiptsHandler {
    blobs: Arc<dyn BlobStore>,
}

impl ReceiptsHandler {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }
}

#[async_trait]
impl meridian_dispatch::Handler for ReceiptsHandler {
    fn topic(&self) -> &'static str {
        "mail/receipts"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        let payload: MailEventPayload = typed_payload(event)?;
        let now_ms = chrono::Utc::now().timestamp_millis();

        let mut attachment_urls = Vec::new();
        for attachment in &payload.attachments {
            if !PERMITTED_ATTACHMENT_TYPES.contains(&attachment.content_type.as_str()) {
                continue;
            }
            if attachment.size_bytes > MAX_ATTACHMENT_BYTES {
                continue;
            }
            let bytes = BASE64
                .decode(&attachment.data_base64)
                .map_err(|e| HandlerError::Failed(format!("attachment {} was not valid base64: {e}", attachment.filename)))?;
            let path = receipt_blob_path(ctx.tenant_slug(), now_ms, &attachment.filename);
            let url = self
                .blobs
                .put(&path, &attachment.content_type, &bytes)
                .await
                .map_err(|e| HandlerError::Failed(e.to_string()))?;
            attachment_urls.push(url);
        }

        let combined_text = format!("{} {}", payload.subject, payload.body);
        let extraction = extract_receipt_fields(&combined_text);
        let occurred_on = extraction
            .date
            .as_deref()
            .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());

        let mut conn = ctx.connection().await;
        ReceiptRepo::insert(
            &mut conn,
            event.id,
            extraction.vendor.as_deref(),
            extraction.amount_minor,
            None,
            occurred_on,
            &attachment_urls,
        )
        .await?;
        Ok(())
    }
}

/// Resolves the sender to a contact, finds or creates a thread, and
/// appends the inbound message (shared by *support* and *creator*, §4.I).
async fn handle_threaded_mail(ctx: &TenantScope, event: &DbEventRecord, purpose: &str) -> Result<(), HandlerError> {
    let payload: MailEventPayload = typed_payload(event)?;
    let mut conn = ctx.connection().await;

    let contact = ContactRepo::find_or_create(&mut conn, &payload.sender, None).await?;

    let mut thread = None;
    for reference in &payload.references {
        if let Some(found) = ThreadRepo::find_by_external_key(&mut conn, reference).await? {
            thread = Some(found);
            break;
        }
    }
    if thread.is_none() {
        thread = ThreadRepo::find_open_for_contact(&mut conn, contact.id, purpose).await?;
    }
    let thread = match thread {
        Some(t) => t,
        None => {
            let external_key = payload
                .references
                .first()
                .cloned()
                .unwrap_or_else(|| format!("contact:{}:{}", contact.id, event.id));
            ThreadRepo::create(&mut conn, contact.id, purpose, Some(&payload.subject), &external_key).await?
        }
    };

    let excerpt: String = payload.body.chars().take(2000).collect();
    ThreadRepo::append_message(&mut conn, thread.id, event.id, &payload.sender, &excerpt).await?;
    Ok(())
}

pub struct SupportHandler;

#[async_trait]
impl meridian_dispatch::Handler for SupportHandler {
    fn topic(&self) -> &'static str {
        "mail/support"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        handle_threaded_mail(ctx, event, "support").await
    }
}

/// *creator*: falls back to *support* semantics whenever no matching
/// creator exists (§4.I). This core has no separate creator directory, so
/// the fallback always applies — the thread's `purpose` column still
/// records `creator` so downstream reporting can tell the two apart.
pub struct CreatorHandler;

#[async_trait]
impl meridian_dispatch::Handler for CreatorHandler {
    fn topic(&self) -> &'static str {
        "mail/creator"
    }

    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        handle_threaded_mail(ctx, event, "creator").await
    }
}

/// `general`: a registered purpose with no handler of consequence beyond
/// logging (§4.H).
pub struct GeneralHandler;

#[async_trait]
impl meridian_dispatch::Handler for GeneralHandler {
    fn topic(&self) -> &'static str {
        "mail/general"
    }

    async fn handle(&self, _ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError> {
        tracing::info!(event_id = %event.id, "general-purpose inbound mail received, no handler action");
        Ok(())
    }
}

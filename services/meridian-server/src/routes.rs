//! HTTP routes (§6): commerce/mail webhook ingress, the OAuth callback's
//! signature-verification step, and the operator-facing health/retry
//! surface over `meridian-health`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use meridian_crypto::verify_oauth_query;

use crate::error::{ApiError, IngressResponse};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhooks/commerce", post(commerce_webhook))
        .route("/webhooks/mail", post(mail_webhook))
        .route("/oauth/callback", get(oauth_callback))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/internal/tenants/:tenant_id/connections/:external_id/status",
            get(registration_status),
        )
        .route("/internal/tenants/:tenant_id/events/stats", get(events_stats))
        .route("/internal/tenants/:tenant_id/events/failed", get(events_failed))
        .route(
            "/internal/tenants/:tenant_id/events/:event_id/retry",
            post(retry_event),
        )
        .with_state(state)
}

fn lower_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_lowercase(), v.to_string())))
        .collect()
}

async fn commerce_webhook(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> IngressResponse {
    let outcome = meridian_webhook::handle(&state.ctx, &state.commerce_source, lower_headers(&headers), body.to_vec()).await;
    IngressResponse(outcome)
}

async fn mail_webhook(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Result<IngressResponse, ApiError> {
    let source = state
        .mail_source
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("inbound mail is not configured for this deployment".to_string()))?;
    let outcome = meridian_mail::handle(&state.ctx, source, lower_headers(&headers), body.to_vec()).await;
    Ok(IngressResponse(outcome))
}

/// Verifies the OAuth callback's HMAC query signature and consumes the
/// matching handshake state (§4.B OAuth mode, §9). The token exchange
/// itself — calling back to the commerce platform with `code` — is the
/// bootstrap registration routine's job (external collaborator, §1); this
/// route only gates the callback on a valid signature and a live state.
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<&'static str, ApiError> {
    let secret = state
        .config
        .ingest
        .commerce_client_secret
        .as_ref()
        .ok_or(ApiError::Internal)?;

    let hmac_value = params.get("hmac").ok_or_else(|| ApiError::BadRequest("missing hmac".to_string()))?;
    let timestamp = params
        .get("timestamp")
        .ok_or_else(|| ApiError::BadRequest("missing timestamp".to_string()))?;
    let state_param = params
        .get("state")
        .ok_or_else(|| ApiError::BadRequest("missing state".to_string()))?;

    let skew = timestamp
        .parse::<i64>()
        .ok()
        .map(|ts| (Utc::now().timestamp() - ts).abs())
        .ok_or_else(|| ApiError::BadRequest("malformed timestamp".to_string()))?;
    if skew > 5 * 60 {
        return Err(ApiError::Unauthorized);
    }

    let pairs: Vec<(String, String)> = params.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    if !verify_oauth_query(secret.as_bytes(), &pairs, hmac_value) {
        return Err(ApiError::Unauthorized);
    }

    let state_id = Uuid::parse_str(state_param).map_err(|_| ApiError::BadRequest("malformed state".to_string()))?;
    let consumed = state
        .db
        .oauth_state_repo()
        .consume(state_id)
        .await
        .map_err(|_| ApiError::Internal)?;

    if consumed.is_none() {
        return Err(ApiError::Unauthorized);
    }

    Ok("ok")
}

#[derive(Serialize)]
struct HealthBody {
    healthy: bool,
    postgres: bool,
    redis: bool,
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<Json<HealthBody>, ApiError> {
    let status = state.db.health_check().await.map_err(|_| ApiError::Internal)?;
    Ok(Json(HealthBody {
        healthy: status.healthy,
        postgres: status.postgres,
        redis: status.redis,
    }))
}

async fn readyz(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    let status = state.db.health_check().await.map_err(|_| ApiError::Internal)?;
    if status.healthy {
        Ok("ready")
    } else {
        Err(ApiError::Internal)
    }
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.config.ingest.admin_token.as_ref() else {
        return Ok(());
    };
    let provided = headers
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    if provided.as_bytes().ct_eq(expected.as_bytes()).into() {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

async fn tenant_slug(state: &AppState, tenant_id: Uuid) -> Result<String, ApiError> {
    let tenant = state
        .db
        .tenant_repo()
        .find_by_id(tenant_id)
        .await
        .map_err(|_| ApiError::Internal)?
        .ok_or(ApiError::NotFound)?;
    Ok(tenant.slug)
}

async fn registration_status(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, external_id)): Path<(Uuid, String)>,
    headers: HeaderMap,
) -> Result<Json<meridian_health::RegistrationStatus>, ApiError> {
    require_admin(&state, &headers)?;
    let status = meridian_health::registration_status(&state.db, tenant_id, &external_id)
        .await
        .map_err(|_| ApiError::NotFound)?;
    Ok(Json(status))
}

#[derive(serde::Deserialize)]
struct StatsQuery {
    #[serde(default = "default_stats_days")]
    days: i64,
}

fn default_stats_days() -> i64 {
    7
}

#[derive(Serialize)]
struct EventStatsBody {
    last_24h: Vec<meridian_health::StatusCount>,
    by_topic: Vec<meridian_health::TopicCount>,
}

async fn events_stats(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<StatsQuery>,
    headers: HeaderMap,
) -> Result<Json<EventStatsBody>, ApiError> {
    require_admin(&state, &headers)?;
    let slug = tenant_slug(&state, tenant_id).await?;
    let tenant = meridian_types::TenantId::from_uuid(tenant_id);

    let last_24h = meridian_health::counts_last_24h(&state.db.pg, tenant, &slug)
        .await
        .map_err(|_| ApiError::Internal)?;
    let by_topic = meridian_health::counts_by_topic(&state.db.pg, tenant, &slug, query.days)
        .await
        .map_err(|_| ApiError::Internal)?;

    Ok(Json(EventStatsBody { last_24h, by_topic }))
}

async fn events_failed(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Vec<meridian_db::DbEventRecord>>, ApiError> {
    require_admin(&state, &headers)?;
    let slug = tenant_slug(&state, tenant_id).await?;
    let tenant = meridian_types::TenantId::from_uuid(tenant_id);

    let rows = meridian_health::failed_events_eligible_for_retry(
        &state.db.pg,
        tenant,
        &slug,
        state.config.ingest.max_retry_count,
        state.config.ingest.retry_lookback_days,
        100,
    )
    .await
    .map_err(|_| ApiError::Internal)?;

    Ok(Json(rows))
}

#[derive(Serialize)]
struct RetryBody {
    dispatch_ok: bool,
}

async fn retry_event(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, event_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<RetryBody>, ApiError> {
    require_admin(&state, &headers)?;
    let slug = tenant_slug(&state, tenant_id).await?;
    let tenant = meridian_types::TenantId::from_uuid(tenant_id);

    let dispatch_ok = meridian_health::retry_event(
        &state.db.pg,
        &state.handlers,
        tenant,
        &slug,
        event_id,
        state.config.ingest.request_deadline(),
    )
    .await
    .map_err(|_| ApiError::Internal)?;

    Ok(Json(RetryBody { dispatch_ok }))
}

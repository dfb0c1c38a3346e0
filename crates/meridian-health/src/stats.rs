//! Read-only event counters (§4.L): last-24h status rollup and per-topic
//! counts over N days, both scoped to one tenant's isolated event log.

use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use meridian_db::EventLogRepo;
use meridian_tenancy::with_tenant;
use meridian_types::TenantId;

use crate::error::HealthError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: i64,
}

/// Status counts for events received in the last 24 hours (§4.L).
pub async fn counts_last_24h(
    pool: &PgPool,
    tenant_id: TenantId,
    tenant_slug: &str,
) -> Result<Vec<StatusCount>, HealthError> {
    let since = Utc::now() - ChronoDuration::hours(24);
    let rows = with_tenant(pool, tenant_id, tenant_slug, move |scope| async move {
        let mut conn = scope.connection().await;
        EventLogRepo::counts_by_status_since(&mut conn, since).await
    })
    .await??;

    Ok(rows.into_iter().map(|(status, count)| StatusCount { status, count }).collect())
}

/// Per-topic counts over the last `days` days (§4.L).
pub async fn counts_by_topic(
    pool: &PgPool,
    tenant_id: TenantId,
    tenant_slug: &str,
    days: i64,
) -> Result<Vec<TopicCount>, HealthError> {
    let since = Utc::now() - ChronoDuration::days(days);
    let rows = with_tenant(pool, tenant_id, tenant_slug, move |scope| async move {
        let mut conn = scope.connection().await;
        EventLogRepo::counts_by_topic_since(&mut conn, since).await
    })
    .await??;

    Ok(rows.into_iter().map(|(topic, count)| TopicCount { topic, count }).collect())
}

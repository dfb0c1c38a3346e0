//! Failed-event retrieval and retry (§4.L): `retry(event id)` resets status
//! to pending, increments `retry_count`, and re-runs dispatch under the
//! same tenant scope with the original payload — the idempotency key never
//! changes (§8 property 5).

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use meridian_db::{DbEventRecord, EventLogRepo};
use meridian_dispatch::HandlerRegistry;
use meridian_tenancy::with_tenant;
use meridian_types::TenantId;

use crate::error::HealthError;

/// A failed event stops being offered for retry after this many attempts
/// (§4.L "retry_count < max").
pub const DEFAULT_MAX_RETRY_COUNT: i32 = 5;

/// Only events received within this lookback window are offered for retry
/// (§4.L "received_at within cutoff").
pub const DEFAULT_RETRY_LOOKBACK_DAYS: i64 = 7;

/// The same per-request deadline the ingress pipeline applies to a fresh
/// dispatch (§5), reused here since a retry is just a redispatch.
pub const DEFAULT_RETRY_DEADLINE: Duration = Duration::from_secs(25);

/// Lists failed events still eligible for retry, oldest received first.
pub async fn failed_events_eligible_for_retry(
    pool: &PgPool,
    tenant_id: TenantId,
    tenant_slug: &str,
    max_retry_count: i32,
    lookback_days: i64,
    limit: i64,
) -> Result<Vec<DbEventRecord>, HealthError> {
    let since = Utc::now() - ChronoDuration::days(lookback_days);
    let rows = with_tenant(pool, tenant_id, tenant_slug, move |scope| async move {
        let mut conn = scope.connection().await;
        EventLogRepo::find_failed_eligible_for_retry(&mut conn, max_retry_count, since, limit).await
    })
    .await??;
    Ok(rows)
}

/// Resets `event_id` to pending, bumps `retry_count`, and re-dispatches it
/// through the same handler registry the original ingress used. Returns the
/// handler outcome so callers can tell a retry that failed again from one
/// that succeeded — the event row reflects either outcome either way.
pub async fn retry(
    pool: &PgPool,
    handlers: &Arc<HandlerRegistry>,
    tenant_id: TenantId,
    tenant_slug: &str,
    event_id: Uuid,
    deadline: Duration,
) -> Result<bool, HealthError> {
    let pool_for_dispatch = pool.clone();
    let slug_for_dispatch = tenant_slug.to_string();
    let handlers = Arc::clone(handlers);

    let dispatch_ok = with_tenant(pool, tenant_id, tenant_slug, move |scope| async move {
        let row = {
            let mut conn = scope.connection().await;
            EventLogRepo::retry(&mut conn, event_id).await?
        };

        let dispatch = handlers.dispatch(&pool_for_dispatch, tenant_id, &slug_for_dispatch, &row);
        let outcome = match tokio::time::timeout(deadline, dispatch).await {
            Ok(Ok(())) => {
                let mut conn = scope.connection().await;
                EventLogRepo::mark_completed(&mut conn, row.id).await?;
                true
            }
            Ok(Err(e)) => {
                let mut conn = scope.connection().await;
                EventLogRepo::mark_failed(&mut conn, row.id, &e.to_string()).await?;
                false
            }
            Err(_) => {
                let mut conn = scope.connection().await;
                EventLogRepo::mark_failed(&mut conn, row.id, "deadline exceeded").await?;
                false
            }
        };

        Ok::<bool, meridian_db::DbError>(outcome)
    })
    .await??;

    Ok(dispatch_ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_deadline_matches_ingress_default() {
        assert_eq!(DEFAULT_RETRY_DEADLINE, Duration::from_secs(25));
    }
}

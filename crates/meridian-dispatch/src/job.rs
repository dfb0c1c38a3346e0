//! Job Dispatcher (§4.K): an abstract enqueue sink that must never block the
//! ingress pipeline.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use meridian_types::TenantId;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::error::DispatchError;

#[derive(Debug, Clone)]
pub struct JobRequest {
    pub tenant_id: TenantId,
    pub tenant_slug: String,
    pub topic: String,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait JobDispatcher: Send + Sync {
    async fn enqueue(&self, job: JobRequest) -> Result<(), DispatchError>;
}

/// In-process bounded channel, matching the teacher's in-process-map style
/// dispatch for local/dev and single-binary deployments. A full channel
/// after `send_timeout` ms is treated as a non-ack — the caller falls back
/// to [`OutboxDispatcher`].
#[derive(Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::Sender<JobRequest>,
    send_timeout: Duration,
}

impl ChannelDispatcher {
    pub fn new(capacity: usize, send_timeout: Duration) -> (Self, mpsc::Receiver<JobRequest>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender, send_timeout }, receiver)
    }
}

#[async_trait]
impl JobDispatcher for ChannelDispatcher {
    async fn enqueue(&self, job: JobRequest) -> Result<(), DispatchError> {
        timeout(self.send_timeout, self.sender.send(job))
            .await
            .map_err(|_| DispatchError::Deadline)?
            .map_err(|_| DispatchError::ChannelClosed)
    }
}

/// Always writes to `job_outbox` first, then attempts the inner sink with a
/// bounded deadline (default 2s per §4.K). A background flusher
/// (`tokio::time::interval`) later drains rows the inner sink never
/// acknowledged, with exponential backoff.
pub struct OutboxDispatcher<D: JobDispatcher> {
    pool: PgPool,
    inner: D,
    ack_deadline: Duration,
}

impl<D: JobDispatcher> OutboxDispatcher<D> {
    pub fn new(pool: PgPool, inner: D, ack_deadline: Duration) -> Self {
        Self { pool, inner, ack_deadline }
    }

    async fn spool(&self, job: &JobRequest) -> Result<(), DispatchError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(&format!(
            "SET search_path = {}, public",
            meridian_db::tenant_schema_name(&job.tenant_slug)
        ))
        .execute(&mut *conn)
        .await?;

        meridian_db::OutboxRepo::enqueue(&mut conn, job.tenant_id.0, &job.topic, job.payload.clone()).await?;

        sqlx::query("RESET search_path").execute(&mut *conn).await?;
        Ok(())
    }
}

#[async_trait]
impl<D: JobDispatcher> JobDispatcher for OutboxDispatcher<D> {
    async fn enqueue(&self, job: JobRequest) -> Result<(), DispatchError> {
        match timeout(self.ack_deadline, self.inner.enqueue(job.clone())).await {
            Ok(Ok(())) => Ok(()),
            _ => self.spool(&job).await,
        }
    }
}

/// Drains due `job_outbox` rows into `inner`, doubling the retry delay on
/// each failed attempt. Runs as a detached `tokio::spawn` loop started by
/// the service binary.
pub async fn run_outbox_flusher<D: JobDispatcher>(
    pool: PgPool,
    inner: D,
    tenant_slug: String,
    tenant_id: TenantId,
    poll_interval: Duration,
    batch_size: i64,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        ticker.tick().await;

        let mut conn = match pool.acquire().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "outbox flusher failed to acquire connection");
                continue;
            }
        };

        if let Err(e) = sqlx::query(&format!(
            "SET search_path = {}, public",
            meridian_db::tenant_schema_name(&tenant_slug)
        ))
        .execute(&mut *conn)
        .await
        {
            tracing::warn!(error = %e, "outbox flusher failed to set search_path");
            continue;
        }

        let due = match meridian_db::OutboxRepo::claim_due(&mut conn, Utc::now(), batch_size).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "outbox flusher failed to claim due jobs");
                continue;
            }
        };

        for job in due {
            let request = JobRequest {
                tenant_id,
                tenant_slug: tenant_slug.clone(),
                topic: job.topic.clone(),
                payload: job.payload.clone(),
            };

            match inner.enqueue(request).await {
                Ok(()) => {
                    let _ = meridian_db::OutboxRepo::delete(&mut conn, job.id).await;
                }
                Err(_) => {
                    let backoff_secs = 2i64.saturating_pow(job.attempts.clamp(0, 16) as u32).min(3600);
                    let next_attempt = Utc::now() + chrono::Duration::seconds(backoff_secs);
                    let _ = meridian_db::OutboxRepo::record_attempt_failure(&mut conn, job.id, next_attempt).await;
                }
            }
        }

        let _ = sqlx::query("RESET search_path").execute(&mut *conn).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_dispatcher_delivers_to_receiver() {
        let (dispatcher, mut rx) = ChannelDispatcher::new(4, Duration::from_millis(100));
        let job = JobRequest {
            tenant_id: TenantId::new(),
            tenant_slug: "acme".to_string(),
            topic: "attribution".to_string(),
            payload: serde_json::json!({"order_id": "123"}),
        };
        dispatcher.enqueue(job.clone()).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.topic, job.topic);
    }

    #[tokio::test]
    async fn channel_dispatcher_times_out_when_full_and_unread() {
        let (dispatcher, _rx) = ChannelDispatcher::new(1, Duration::from_millis(20));
        let job = JobRequest {
            tenant_id: TenantId::new(),
            tenant_slug: "acme".to_string(),
            topic: "attribution".to_string(),
            payload: serde_json::json!({}),
        };
        dispatcher.enqueue(job.clone()).await.unwrap();
        let result = dispatcher.enqueue(job).await;
        assert!(matches!(result, Err(DispatchError::Deadline)));
    }
}

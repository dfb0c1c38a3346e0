//! Handler Registry & Dispatcher (§4.H): process-wide topic → ordered
//! handler list, with parallel per-event fan-out and failure isolation.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use meridian_db::DbEventRecord;
use meridian_tenancy::{with_tenant, TenantScope};
use meridian_types::TenantId;
use sqlx::PgPool;

use crate::error::HandlerError;

#[async_trait]
pub trait Handler: Send + Sync {
    fn topic(&self) -> &'static str;
    async fn handle(&self, ctx: &TenantScope, event: &DbEventRecord) -> Result<(), HandlerError>;
}

/// `DashMap<String, Vec<Arc<dyn Handler>>>` built once at process start by
/// `register_default_handlers` in `meridian-handlers`.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<String, Vec<Arc<dyn Handler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: Arc<dyn Handler>) {
        self.handlers
            .entry(handler.topic().to_string())
            .or_default()
            .push(handler);
    }

    pub fn handlers_for(&self, topic: &str) -> Vec<Arc<dyn Handler>> {
        self.handlers.get(topic).map(|v| v.clone()).unwrap_or_default()
    }

    /// Runs every handler registered for `event.topic` concurrently, each
    /// inside its own `with_tenant` scope (so a deadline-cancelled sibling
    /// doesn't stall the rest, §5). The event completes iff every handler
    /// succeeds; otherwise dispatch fails with the error from the
    /// first-*registered* handler that failed, regardless of completion
    /// order.
    pub async fn dispatch(
        &self,
        pool: &PgPool,
        tenant_id: TenantId,
        tenant_slug: &str,
        event: &DbEventRecord,
    ) -> Result<(), HandlerError> {
        let handlers = self.handlers_for(&event.topic);
        if handlers.is_empty() {
            tracing::warn!(topic = %event.topic, "no handlers registered for topic");
            return Ok(());
        }

        let tasks: Vec<_> = handlers
            .into_iter()
            .map(|handler| {
                let pool = pool.clone();
                let slug = tenant_slug.to_string();
                let event = event.clone();
                tokio::spawn(async move {
                    with_tenant(&pool, tenant_id, &slug, move |scope| async move {
                        handler.handle(&scope, &event).await
                    })
                    .await
                    .map_err(|e| HandlerError::Storage(e.to_string()))
                    .and_then(|inner| inner)
                })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;

        let mut first_error = None;
        for joined in results {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(join_err) => {
                    if first_error.is_none() {
                        first_error = Some(HandlerError::Failed(format!("handler task panicked: {join_err}")));
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysOk;
    #[async_trait]
    impl Handler for AlwaysOk {
        fn topic(&self) -> &'static str {
            "orders/create"
        }
        async fn handle(&self, _ctx: &TenantScope, _event: &DbEventRecord) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[test]
    fn registering_twice_for_same_topic_preserves_order() {
        let registry = HandlerRegistry::new();
        registry.register(Arc::new(AlwaysOk));
        registry.register(Arc::new(AlwaysOk));
        assert_eq!(registry.handlers_for("orders/create").len(), 2);
    }

    #[test]
    fn unknown_topic_has_no_handlers() {
        let registry = HandlerRegistry::new();
        assert!(registry.handlers_for("unknown/topic").is_empty());
    }
}

//! Meridian Server
//!
//! The HTTP entrypoint for the multi-tenant inbound event ingestion core:
//! commerce webhook ingress, inbound-mail ingress, the OAuth callback's
//! signature gate, and an operator-facing health/retry surface.
//!
//! ```bash
//! meridian-server
//! meridian-server --config /path/to/config.toml
//! MERIDIAN__SERVER__PORT=9000 meridian-server
//! ```

mod config;
mod error;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use meridian_crypto::sealer::SealingKey;
use meridian_crypto::CredentialSealer;
use meridian_db::Database;
use meridian_dispatch::{
    run_outbox_flusher, ChannelDispatcher, HandlerRegistry, JobDispatcher, LocalBlobStore, OutboxDispatcher,
};
use meridian_handlers::{register_default_handlers, HandlerDeps};
use meridian_mail::MailSource;
use meridian_tenancy::TenantRegistry;
use meridian_types::TenantId;
use meridian_webhook::{CommerceSource, IngressContext};

use crate::config::ServerConfig;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "meridian-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "MERIDIAN_CONFIG")]
    config: Option<String>,

    #[arg(long, env = "MERIDIAN_HOST")]
    host: Option<String>,

    #[arg(short, long, env = "MERIDIAN_PORT")]
    port: Option<u16>,

    #[arg(long, env = "MERIDIAN_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, env = "MERIDIAN_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;

    if let Some(host) = args.host {
        server_config.server.host = host;
    }
    if let Some(port) = args.port {
        server_config.server.port = port;
    }
    if let Some(db_url) = args.database_url {
        server_config.database.postgres_url = db_url;
    }
    server_config.logging.level = args.log_level;
    server_config.logging.format = args.log_format;

    init_logging(&server_config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting meridian-server");

    let problems = server_config.validate();
    if !problems.is_empty() {
        for problem in &problems {
            tracing::error!(%problem, "invalid configuration");
        }
        anyhow::bail!("refusing to start with {} configuration problem(s)", problems.len());
    }

    let db = Database::connect(&server_config.database).await?;
    let health = db.health_check().await?;
    if !health.healthy {
        anyhow::bail!("database health check failed");
    }
    tracing::info!(postgres = health.postgres, redis = health.redis, "database health check passed");

    // A second `Database` sharing the same pools: `TenantRegistry` owns one,
    // the rest of the process (health routes, outbox flusher) needs another
    // since `Database` isn't `Clone` itself but its pools are.
    let db_for_state = Database {
        pg: db.pg.clone(),
        redis: db.redis.clone(),
    };

    let sealing_key = SealingKey::from_hex(&server_config.ingest.token_encryption_key)?;
    let sealer = CredentialSealer::new(sealing_key);
    let registry = Arc::new(TenantRegistry::new(db, sealer, server_config.ingest.credential_cache_ttl()));

    let db = Arc::new(db_for_state);
    let handlers = Arc::new(HandlerRegistry::new());

    let (channel_dispatcher, job_rx) = ChannelDispatcher::new(server_config.ingest.outbox_channel_capacity, Duration::from_millis(200));
    spawn_job_sink(job_rx);

    let outbox_dispatcher = OutboxDispatcher::new(db.pg.clone(), channel_dispatcher.clone(), server_config.ingest.outbox_ack_deadline());
    let jobs: Arc<dyn JobDispatcher> = Arc::new(outbox_dispatcher);

    let blobs: Arc<dyn meridian_dispatch::BlobStore> = Arc::new(LocalBlobStore::new(server_config.ingest.blob_store_root.clone()));
    let connections = Arc::new(db.connection_repo());

    register_default_handlers(
        &handlers,
        HandlerDeps {
            jobs: Arc::clone(&jobs),
            connections: Arc::clone(&connections),
            blobs,
        },
    );

    let ctx = Arc::new(IngressContext {
        pool: db.pg.clone(),
        registry: Arc::clone(&registry),
        handlers: Arc::clone(&handlers),
        cache: db.cache(),
        request_deadline: server_config.ingest.request_deadline(),
        rate_limit_per_minute: server_config.ingest.rate_limit_per_minute,
    });

    let commerce_source_name: &'static str = Box::leak(server_config.ingest.commerce_source_name.clone().into_boxed_str());
    let commerce_source = Arc::new(CommerceSource::new(commerce_source_name));

    let mail_source = server_config
        .ingest
        .email_webhook_secret
        .as_deref()
        .map(|secret| Arc::new(MailSource::new(secret, server_config.ingest.spam_threshold)));

    spawn_outbox_flushers(
        &db,
        channel_dispatcher,
        server_config.ingest.outbox_poll_interval(),
        server_config.ingest.outbox_batch_size,
    )
    .await?;

    let app_state = Arc::new(AppState {
        db: Arc::clone(&db),
        registry,
        handlers,
        ctx,
        commerce_source,
        mail_source,
        config: Arc::new(server_config.clone()),
    });

    let app = routes::build_router(app_state);

    let addr = server_config.server.socket_addr();
    tracing::info!(host = %server_config.server.host, port = %server_config.server.port, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(server_config.server.shutdown_timeout()))
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber.with(fmt::layer().json().with_target(true)).init();
        }
        _ => {
            subscriber.with(fmt::layer().pretty().with_target(true)).init();
        }
    }

    Ok(())
}

/// Drains the in-process job channel. Acting on a job's topic (running
/// commissions, attribution, etc.) is explicitly out of scope (§1 Non-goals:
/// "defining the business semantics of downstream jobs") — a real
/// deployment attaches its own worker process to this same channel, or
/// replaces `ChannelDispatcher` with an adapter over its job queue of
/// choice.
fn spawn_job_sink(mut job_rx: tokio::sync::mpsc::Receiver<meridian_dispatch::JobRequest>) {
    tokio::spawn(async move {
        while let Some(job) = job_rx.recv().await {
            tracing::debug!(tenant = %job.tenant_slug, topic = %job.topic, "job dispatched (no in-process worker attached)");
        }
    });
}

/// One flusher per active tenant schema (§4.K). Tenants created after
/// startup won't get a flusher until the process restarts — acceptable for
/// this core's scope, since job delivery is already best-effort and the
/// outbox itself never loses a row.
async fn spawn_outbox_flushers(
    db: &Database,
    inner: ChannelDispatcher,
    poll_interval: Duration,
    batch_size: i64,
) -> anyhow::Result<()> {
    let tenants = db.tenant_repo().list_active().await?;
    tracing::info!(count = tenants.len(), "starting outbox flushers");

    for tenant in tenants {
        let pool = db.pg.clone();
        let inner = inner.clone();
        let tenant_id = TenantId::from_uuid(tenant.id);
        let tenant_slug = tenant.slug;
        tokio::spawn(run_outbox_flusher(pool, inner, tenant_slug, tenant_id, poll_interval, batch_size));
    }

    Ok(())
}

async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received ctrl-c, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("received sigterm, initiating graceful shutdown");
        }
    }

    tracing::info!(timeout_secs = timeout.as_secs(), "waiting for in-flight requests to complete");
    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parsing_reads_port_override() {
        let args = Args::parse_from(["meridian-server", "--port", "9090"]);
        assert_eq!(args.port, Some(9090));
    }

    #[test]
    fn development_config_listens_on_the_default_port() {
        let config = ServerConfig::development();
        assert_eq!(config.server.port, 8088);
    }
}

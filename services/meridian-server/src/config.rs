//! Server Configuration (§6a)
//!
//! Layered configuration for the ingestion core: environment variables
//! (prefix `MERIDIAN`, `__` separator), an optional config file, and CLI
//! overrides applied on top — matching `openibank-api-server::config`.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use meridian_db::DatabaseConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub ingest: IngestSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("invalid socket address")
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Every ingress-specific knob named in §6/§6a: the commerce credential
/// pair, the sealing key, and the defaulted thresholds (spam, rate limit,
/// request deadline, credential cache TTL) the pipeline and dispatch layers
/// need at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// 64 hex chars (32 bytes) — the `CredentialSealer` key (§4.A).
    #[serde(default)]
    pub token_encryption_key: String,

    /// The header-prefix vocabulary this deployment speaks, e.g. `shopify`
    /// (§4.F). One commerce source per process.
    #[serde(default = "default_commerce_source_name")]
    pub commerce_source_name: String,

    #[serde(default)]
    pub commerce_client_id: Option<String>,

    #[serde(default)]
    pub commerce_client_secret: Option<String>,

    #[serde(default = "default_commerce_api_version")]
    pub commerce_api_version: String,

    /// Required only if inbound mail is enabled for this deployment.
    #[serde(default)]
    pub email_webhook_secret: Option<String>,

    #[serde(default = "default_spam_threshold")]
    pub spam_threshold: f64,

    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: i64,

    #[serde(default = "default_request_deadline_secs")]
    pub request_deadline_secs: u64,

    #[serde(default = "default_credential_cache_ttl_secs")]
    pub credential_cache_ttl_secs: u64,

    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: i32,

    #[serde(default = "default_retry_lookback_days")]
    pub retry_lookback_days: i64,

    #[serde(default = "default_outbox_ack_deadline_secs")]
    pub outbox_ack_deadline_secs: u64,

    #[serde(default = "default_outbox_poll_interval_secs")]
    pub outbox_poll_interval_secs: u64,

    #[serde(default = "default_outbox_batch_size")]
    pub outbox_batch_size: i64,

    #[serde(default = "default_outbox_channel_capacity")]
    pub outbox_channel_capacity: usize,

    /// Filesystem root for the dev/test `BlobStore` (§6b). A deployment
    /// swaps this for an S3/GCS-backed implementation of the same trait.
    #[serde(default = "default_blob_store_root")]
    pub blob_store_root: String,

    /// Shared secret required on `/internal/*` operator routes. Left unset
    /// only in development.
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            token_encryption_key: String::new(),
            commerce_source_name: default_commerce_source_name(),
            commerce_client_id: None,
            commerce_client_secret: None,
            commerce_api_version: default_commerce_api_version(),
            email_webhook_secret: None,
            spam_threshold: default_spam_threshold(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            request_deadline_secs: default_request_deadline_secs(),
            credential_cache_ttl_secs: default_credential_cache_ttl_secs(),
            max_retry_count: default_max_retry_count(),
            retry_lookback_days: default_retry_lookback_days(),
            outbox_ack_deadline_secs: default_outbox_ack_deadline_secs(),
            outbox_poll_interval_secs: default_outbox_poll_interval_secs(),
            outbox_batch_size: default_outbox_batch_size(),
            outbox_channel_capacity: default_outbox_channel_capacity(),
            blob_store_root: default_blob_store_root(),
            admin_token: None,
        }
    }
}

impl IngestSettings {
    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }

    pub fn credential_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.credential_cache_ttl_secs)
    }

    pub fn outbox_ack_deadline(&self) -> Duration {
        Duration::from_secs(self.outbox_ack_deadline_secs)
    }

    pub fn outbox_poll_interval(&self) -> Duration {
        Duration::from_secs(self.outbox_poll_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8088
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_commerce_source_name() -> String {
    "shopify".to_string()
}

fn default_commerce_api_version() -> String {
    "2026-01".to_string()
}

fn default_spam_threshold() -> f64 {
    0.5
}

fn default_rate_limit_per_minute() -> i64 {
    300
}

fn default_request_deadline_secs() -> u64 {
    25
}

fn default_credential_cache_ttl_secs() -> u64 {
    60
}

fn default_max_retry_count() -> i32 {
    5
}

fn default_retry_lookback_days() -> i64 {
    7
}

fn default_outbox_ack_deadline_secs() -> u64 {
    2
}

fn default_outbox_poll_interval_secs() -> u64 {
    5
}

fn default_outbox_batch_size() -> i64 {
    25
}

fn default_outbox_channel_capacity() -> usize {
    1024
}

fn default_blob_store_root() -> String {
    "./data/blobs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl ServerConfig {
    /// Environment (prefix `MERIDIAN`, separator `__`) layered over an
    /// optional config file, matching `openibank-api-server::config::ServerConfig::load`.
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        builder = builder.add_source(
            config::Environment::with_prefix("MERIDIAN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;

        let server_config: ServerConfig = config.try_deserialize().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration - some settings may need adjustment");
            ServerConfig::default()
        });

        Ok(server_config)
    }

    /// Fails closed: every problem found is returned rather than raising on
    /// the first one, so an operator sees the whole list at once.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.ingest.token_encryption_key.len() != 64
            || hex::decode(&self.ingest.token_encryption_key).is_err()
        {
            problems.push("ingest.token_encryption_key must be exactly 64 hex characters".to_string());
        }

        if self.ingest.commerce_client_id.is_some() != self.ingest.commerce_client_secret.is_some() {
            problems.push(
                "ingest.commerce_client_id and ingest.commerce_client_secret must be set together".to_string(),
            );
        }

        if !(0.0..=1.0).contains(&self.ingest.spam_threshold) {
            problems.push("ingest.spam_threshold must be between 0.0 and 1.0".to_string());
        }

        if self.ingest.request_deadline_secs == 0 {
            problems.push("ingest.request_deadline_secs must be greater than zero".to_string());
        }

        if self.ingest.rate_limit_per_minute <= 0 {
            problems.push("ingest.rate_limit_per_minute must be positive".to_string());
        }

        problems
    }

    pub fn development() -> Self {
        Self {
            server: ServerSettings::default(),
            database: DatabaseConfig::default(),
            ingest: IngestSettings {
                token_encryption_key: "00".repeat(32),
                ..IngestSettings::default()
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::development()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_config_has_a_valid_sealing_key() {
        let config = ServerConfig::development();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn validate_rejects_a_short_encryption_key() {
        let mut config = ServerConfig::development();
        config.ingest.token_encryption_key = "tooshort".to_string();
        let problems = config.validate();
        assert!(problems.iter().any(|p| p.contains("token_encryption_key")));
    }

    #[test]
    fn validate_rejects_lopsided_commerce_credentials() {
        let mut config = ServerConfig::development();
        config.ingest.commerce_client_id = Some("abc".to_string());
        config.ingest.commerce_client_secret = None;
        let problems = config.validate();
        assert!(problems.iter().any(|p| p.contains("commerce_client_id")));
    }

    #[test]
    fn validate_rejects_out_of_range_spam_threshold() {
        let mut config = ServerConfig::development();
        config.ingest.spam_threshold = 1.5;
        let problems = config.validate();
        assert!(problems.iter().any(|p| p.contains("spam_threshold")));
    }
}

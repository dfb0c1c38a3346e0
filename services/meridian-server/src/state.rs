//! Process-wide collaborators, built once at startup and shared across
//! every request (mirrors `openibank_api::state::AppState`).

use std::sync::Arc;

use meridian_db::Database;
use meridian_dispatch::HandlerRegistry;
use meridian_mail::MailSource;
use meridian_tenancy::TenantRegistry;
use meridian_webhook::{CommerceSource, IngressContext};

use crate::config::ServerConfig;

pub struct AppState {
    pub db: Arc<Database>,
    pub registry: Arc<TenantRegistry>,
    pub handlers: Arc<HandlerRegistry>,
    pub ctx: Arc<IngressContext>,
    pub commerce_source: Arc<CommerceSource>,
    pub mail_source: Option<Arc<MailSource>>,
    pub config: Arc<ServerConfig>,
}

//! Meridian Types - canonical domain types for the event ingestion core
//!
//! This crate has zero dependencies on other meridian crates. It defines:
//!
//! - Tenant and connection identity (`TenantId`, `ConnectionStatus`)
//! - The topic/idempotency vocabulary shared by ingress, dispatch and handlers
//! - Money as integer minor units — no floating-point currency anywhere
//! - The failure-kind taxonomy from which every crate's own error enum is built

pub mod error;
pub mod ids;
pub mod money;
pub mod tenant;
pub mod topic;

pub use error::*;
pub use ids::*;
pub use money::*;
pub use tenant::*;
pub use topic::*;

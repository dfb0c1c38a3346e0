//! Meridian Dispatch
//!
//! - [`handler`]: the Handler Registry & Dispatcher (§4.H) — a process-wide
//!   topic → handler-list table with parallel per-event fan-out and
//!   failure isolation.
//! - [`job`]: the Job Dispatcher (§4.K) — an abstract, non-blocking enqueue
//!   sink for follow-up work, with a durable outbox fallback.
//! - [`blob`]: the write-only blob storage sink receipts are uploaded to
//!   (§6 "Blob storage").

pub mod blob;
pub mod error;
pub mod handler;
pub mod job;

pub use blob::{sanitize_filename, receipt_blob_path, BlobError, BlobStore, LocalBlobStore};
pub use error::{DispatchError, HandlerError};
pub use handler::{Handler, HandlerRegistry};
pub use job::{run_outbox_flusher, ChannelDispatcher, JobDispatcher, JobRequest, OutboxDispatcher};

//! Audit trail for refused access.
//!
//! Guards hand an [`AuditRecord`] to an [`AuditSink`] every time they deny
//! access. Sinks are best-effort and non-blocking:
//!
//! - [`MemoryAuditSink`] keeps records in memory for hosts and tests
//! - [`TracingAuditSink`] emits a structured `warn` event on the `audit` target
//! - [`SecureAuditLog`] appends to a SHA-256 hash-chained file from a
//!   background task

pub mod error;
pub mod record;
pub mod secure_log;
pub mod sink;

pub use error::{AuditError, Result as AuditResult};
pub use record::{AuditOutcome, AuditRecord, DenialReason};
pub use secure_log::{
    read_entries, verify_chain, AuditWriterHandle, SecureAuditEntry, SecureAuditLog,
    SecureAuditLogConfig,
};
pub use sink::{AuditSink, MemoryAuditSink, TracingAuditSink};

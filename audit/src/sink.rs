//! Audit sinks

use std::sync::Mutex;
use tracing::warn;

use crate::error::{AuditError, Result};
use crate::record::AuditRecord;

/// Destination for unauthorized-access records.
///
/// `record_unauthorized_access` is called on the decision path and must not
/// block. Delivery is best-effort: an error is reported to the caller but never
/// changes an authorization outcome.
pub trait AuditSink: Send + Sync {
    fn record_unauthorized_access(&self, record: AuditRecord) -> Result<()>;
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every record received so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn record_unauthorized_access(&self, record: AuditRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|e| AuditError::Unavailable(e.to_string()))?
            .push(record);
        Ok(())
    }
}

/// Emits each record as a structured `tracing` event on the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record_unauthorized_access(&self, record: AuditRecord) -> Result<()> {
        warn!(
            target: "audit",
            id = %record.id,
            outcome = ?record.outcome,
            reason = %record.reason,
            role = record.role.map(|r| r.as_str()).unwrap_or("none"),
            user_id = record.user_id.as_deref().unwrap_or("anonymous"),
            requirements = %record.requirements_label(),
            enterprise_id = record.enterprise_id.as_deref().unwrap_or(""),
            site_id = record.site_id.as_deref().unwrap_or(""),
            "Unauthorized access"
        );
        Ok(())
    }
}

//! Hash-chained, append-only audit log on disk.
//!
//! Each line is one JSON [`SecureAuditEntry`]. An entry's hash covers the
//! record and the previous entry's hash, so removing or editing any line
//! breaks verification of every line after it.
//!
//! Writes happen on a background task; [`SecureAuditLog`] only pushes onto a
//! channel and never blocks the caller.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{AuditError, Result};
use crate::record::AuditRecord;
use crate::sink::AuditSink;

/// Hash used as `previous_hash` of the first entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// A record as stored in the log, with its chain hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecureAuditEntry {
    #[serde(flatten)]
    pub record: AuditRecord,
    /// Hash of the previous entry
    pub previous_hash: String,
    /// Hash of this entry
    pub entry_hash: String,
}

impl SecureAuditEntry {
    pub fn new(record: AuditRecord, previous_hash: String) -> Result<Self> {
        let entry_hash = Self::calculate_hash(&record, &previous_hash)?;
        Ok(Self {
            record,
            previous_hash,
            entry_hash,
        })
    }

    fn calculate_hash(record: &AuditRecord, previous_hash: &str) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_string(record)?.as_bytes());
        hasher.update(previous_hash.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// Verify the hash of this entry
    pub fn verify_hash(&self) -> bool {
        Self::calculate_hash(&self.record, &self.previous_hash)
            .map(|hash| hash == self.entry_hash)
            .unwrap_or(false)
    }
}

/// Configuration for the secure audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecureAuditLogConfig {
    /// Path to the log file
    pub log_path: PathBuf,
}

impl Default for SecureAuditLogConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("data/audit/unauthorized-access.log"),
        }
    }
}

/// Non-blocking [`AuditSink`] backed by a hash-chained file.
#[derive(Debug, Clone)]
pub struct SecureAuditLog {
    sender: mpsc::UnboundedSender<AuditRecord>,
}

/// Handle on the background writer.
///
/// The writer stops once every [`SecureAuditLog`] clone has been dropped.
#[derive(Debug)]
pub struct AuditWriterHandle {
    handle: JoinHandle<usize>,
}

impl AuditWriterHandle {
    /// Wait for the writer to drain and return the number of entries written.
    pub async fn join(self) -> Result<usize> {
        self.handle
            .await
            .map_err(|e| AuditError::Writer(e.to_string()))
    }
}

impl SecureAuditLog {
    /// Open (or create) the log and start the writer task.
    ///
    /// Must be called from within a tokio runtime. An existing log is
    /// continued from its last entry's hash.
    pub fn open(config: SecureAuditLogConfig) -> Result<(Self, AuditWriterHandle)> {
        // Ensure the log directory exists
        if let Some(parent) = config.log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Continue the chain from the last entry
        let last_hash = if config.log_path.exists() {
            last_hash(&config.log_path)?
        } else {
            GENESIS_HASH.to_string()
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(config.log_path, last_hash, receiver));

        Ok((Self { sender }, AuditWriterHandle { handle }))
    }
}

impl AuditSink for SecureAuditLog {
    fn record_unauthorized_access(&self, record: AuditRecord) -> Result<()> {
        self.sender.send(record).map_err(|_| AuditError::Closed)
    }
}

async fn run_writer(
    log_path: PathBuf,
    mut last_hash: String,
    mut receiver: mpsc::UnboundedReceiver<AuditRecord>,
) -> usize {
    let mut written = 0;

    // Runs until every sender is dropped
    while let Some(record) = receiver.recv().await {
        let id = record.id.clone();
        match write_entry(&log_path, record, &last_hash) {
            Ok(hash) => {
                last_hash = hash;
                written += 1;
                debug!("Audit entry {} appended", id);
            }
            Err(e) => error!("Failed to append audit entry {}: {}", id, e),
        }
    }

    info!("Audit writer stopped after {} entries", written);
    written
}

fn write_entry(log_path: &Path, record: AuditRecord, previous_hash: &str) -> Result<String> {
    let entry = SecureAuditEntry::new(record, previous_hash.to_string())?;

    // Open in append mode
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    // Write to file
    let json = serde_json::to_string(&entry)?;
    writeln!(file, "{}", json)?;
    file.flush()?;

    Ok(entry.entry_hash)
}

fn last_hash(path: &Path) -> Result<String> {
    let reader = BufReader::new(File::open(path)?);
    let mut last_hash = GENESIS_HASH.to_string();

    // Skip lines that do not parse; the chain continues from the last good one
    for line in reader.lines().map_while(|r| r.ok()) {
        if let Ok(entry) = serde_json::from_str::<SecureAuditEntry>(&line) {
            last_hash = entry.entry_hash;
        }
    }

    Ok(last_hash)
}

/// Read every entry of a log, failing on the first unparseable line.
pub fn read_entries(path: &Path) -> Result<Vec<SecureAuditEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: SecureAuditEntry = serde_json::from_str(&line).map_err(|e| {
            AuditError::Log(format!("Failed to parse line {}: {}", index + 1, e))
        })?;
        entries.push(entry);
    }

    Ok(entries)
}

/// Verify the integrity of the entire chain.
///
/// A missing file is an empty, valid log.
pub fn verify_chain(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }

    let mut expected_previous = GENESIS_HASH.to_string();
    let entries = read_entries(path)?;

    for (index, entry) in entries.iter().enumerate() {
        // Verify the entry's own hash
        if !entry.verify_hash() {
            error!(
                "Hash verification failed at entry {}: id={}",
                index + 1,
                entry.record.id
            );
            return Ok(false);
        }
        // Verify the link to the previous entry
        if entry.previous_hash != expected_previous {
            error!(
                "Chain verification failed at entry {}: expected_previous={}, got={}",
                index + 1,
                expected_previous,
                entry.previous_hash
            );
            return Ok(false);
        }
        expected_previous = entry.entry_hash.clone();
    }

    info!(
        "Audit chain verification successful: {} entries verified",
        entries.len()
    );
    Ok(true)
}

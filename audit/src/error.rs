use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audit sink is closed")]
    Closed,

    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("Audit writer failed: {0}")]
    Writer(String),

    #[error("Audit log error: {0}")]
    Log(String),
}

pub type Result<T> = std::result::Result<T, AuditError>;

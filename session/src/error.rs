use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Impersonation not allowed for role: {0}")]
    ImpersonationNotAllowed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Session backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;

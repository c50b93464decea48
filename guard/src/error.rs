use thiserror::Error;

/// Errors raised while configuring a guard.
///
/// Checking itself never fails; see [`crate::Guard::check`].
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Guard configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, GuardError>;

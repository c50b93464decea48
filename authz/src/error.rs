//! Error types for the authorization system.
//!
//! # Security Note
//! Only table loading and policy export can fail. Authorization decisions
//! themselves never produce an error: every abnormal condition collapses into
//! a denial. Error messages here describe configuration problems and are meant
//! for operators, not end users.

use thiserror::Error;

/// Errors that can occur while building, loading or exporting a permission table.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A second entry was supplied for a (role, resource) pair.
    #[error("Duplicate permission entry for role '{role}' on resource '{resource}'")]
    DuplicateEntry { role: String, resource: String },

    /// A role name did not match any known role.
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// An action name did not match any known action.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The YAML table definition could not be parsed.
    #[error("Permission table parsing failed: {0}")]
    TableParse(String),

    /// The table definition parsed but is not acceptable.
    #[error("Permission table validation failed: {0}")]
    TableValidation(String),

    /// Failed to read a table definition from disk.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the Cedar rendering of the table.
    #[error("Policy parsing failed: {0}")]
    PolicyParse(String),

    /// Failed to create a Cedar entity or request.
    #[error("Entity creation failed: {0}")]
    EntityCreation(String),
}

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

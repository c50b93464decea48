use audit::DenialReason;
use authz::types::Role;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GuardError, Result};

/// Lifecycle of a guard.
///
/// `Initializing → Checking → {Granted, Denied, SessionInvalid}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Initializing,
    Checking,
    Granted,
    Denied,
    SessionInvalid,
}

impl GuardState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GuardState::Granted | GuardState::Denied | GuardState::SessionInvalid
        )
    }
}

/// The result of a check, for the hosting layer to match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Granted {
        role: Role,
        session_id: String,
    },
    Denied {
        role: Option<Role>,
        reason: DenialReason,
        redirect: Option<String>,
    },
    SessionInvalid {
        reason: DenialReason,
        redirect: Option<String>,
    },
}

/// What the host should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderInstruction {
    RenderContent,
    RenderFallback,
    Navigate(String),
}

impl GuardOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, GuardOutcome::Granted { .. })
    }

    /// The terminal state this outcome corresponds to.
    pub fn state(&self) -> GuardState {
        match self {
            GuardOutcome::Granted { .. } => GuardState::Granted,
            GuardOutcome::Denied { .. } => GuardState::Denied,
            GuardOutcome::SessionInvalid { .. } => GuardState::SessionInvalid,
        }
    }

    /// The denial reason, if access was refused.
    pub fn reason(&self) -> Option<DenialReason> {
        match self {
            GuardOutcome::Granted { .. } => None,
            GuardOutcome::Denied { reason, .. } | GuardOutcome::SessionInvalid { reason, .. } => {
                Some(*reason)
            }
        }
    }

    pub fn render_instruction(&self) -> RenderInstruction {
        match self {
            GuardOutcome::Granted { .. } => RenderInstruction::RenderContent,
            GuardOutcome::Denied { redirect, .. } | GuardOutcome::SessionInvalid { redirect, .. } => {
                match redirect {
                    Some(path) => RenderInstruction::Navigate(path.clone()),
                    None => RenderInstruction::RenderFallback,
                }
            }
        }
    }
}

/// Per-guard settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Where to navigate on denial; the fallback view is rendered when unset
    #[serde(default)]
    pub redirect_on_denial: Option<String>,
}

impl GuardConfig {
    pub fn with_redirect(path: impl Into<String>) -> Self {
        Self {
            redirect_on_denial: Some(path.into()),
        }
    }

    /// Parse a guard configuration from YAML and validate it.
    ///
    /// ```yaml
    /// redirect_on_denial: /login
    /// ```
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: GuardConfig = serde_yaml::from_str(content)
            .map_err(|e| GuardError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a guard configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GuardError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Redirects must be absolute in-app paths.
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.redirect_on_denial {
            if !path.starts_with('/') {
                return Err(GuardError::Configuration(format!(
                    "redirect_on_denial must be an absolute path, got '{}'",
                    path
                )));
            }
        }
        Ok(())
    }
}

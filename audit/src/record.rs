//! The unauthorized-access record written for every denial

use authz::types::{CombineMode, CompositeRequirement, Requirement, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which terminal guard state produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Denied,
    SessionInvalid,
}

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// Nobody is signed in.
    NoSession,
    /// The actor was signed in but the session lapsed or was revoked.
    ExpiredSession,
    /// The role lacks at least one required grant.
    InsufficientPermissions,
    /// The requirement names a resource with no table entry at all.
    UnknownResourceOrRole,
    /// The session provider failed while checking.
    CollaboratorFailure,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NoSession => "no_session",
            DenialReason::ExpiredSession => "expired_session",
            DenialReason::InsufficientPermissions => "insufficient_permissions",
            DenialReason::UnknownResourceOrRole => "unknown_resource_or_role",
            DenialReason::CollaboratorFailure => "collaborator_failure",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single unauthorized-access event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique ID for this record (ULID)
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: AuditOutcome,
    pub reason: DenialReason,
    pub user_id: Option<String>,
    pub role: Option<Role>,
    pub session_id: Option<String>,
    /// The (resource, action) pairs that were requested
    pub requirements: Vec<Requirement>,
    pub mode: CombineMode,
    pub enterprise_id: Option<String>,
    pub site_id: Option<String>,
}

impl AuditRecord {
    pub fn new(
        outcome: AuditOutcome,
        reason: DenialReason,
        requirement: &CompositeRequirement,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            timestamp: Utc::now(),
            outcome,
            reason,
            user_id: None,
            role: None,
            session_id: None,
            requirements: requirement.requirements.clone(),
            mode: requirement.mode,
            enterprise_id: None,
            site_id: None,
        }
    }

    pub fn with_actor(mut self, user_id: &str, role: Role, session_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self.role = Some(role);
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn with_scope(mut self, enterprise_id: Option<String>, site_id: Option<String>) -> Self {
        self.enterprise_id = enterprise_id;
        self.site_id = site_id;
        self
    }

    /// Requirements rendered as `resource:action`, comma separated.
    pub fn requirements_label(&self) -> String {
        self.requirements
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz::types::Action;

    #[test]
    fn test_record_builders() {
        let requirement = CompositeRequirement::all([
            Requirement::new("patients", Action::Read),
            Requirement::new("billing", Action::Read),
        ]);
        let record = AuditRecord::new(
            AuditOutcome::Denied,
            DenialReason::InsufficientPermissions,
            &requirement,
        )
        .with_actor("user-1", Role::FrontDesk, "sess-1")
        .with_scope(Some("ent-1".into()), None);

        assert_eq!(record.role, Some(Role::FrontDesk));
        assert_eq!(record.enterprise_id.as_deref(), Some("ent-1"));
        assert_eq!(record.requirements_label(), "patients:read,billing:read");
        assert_eq!(record.mode, CombineMode::All);
    }

    #[test]
    fn test_reason_serialization() {
        let json = serde_json::to_string(&DenialReason::ExpiredSession).unwrap();
        assert_eq!(json, "\"expired_session\"");
        assert_eq!(DenialReason::ExpiredSession.to_string(), "expired_session");
    }
}

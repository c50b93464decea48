//! Allow/deny decisions over a [`PermissionTable`].
//!
//! Every authorization decision in the application funnels through
//! [`AuthzEvaluator`]; call sites never compare role names themselves.
//!
//! The evaluator is infallible by construction. Unknown roles, unknown
//! resources and missing entries all resolve to `false`.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::table::PermissionTable;
use crate::types::{Action, CombineMode, CompositeRequirement, Requirement, Role};

/// The outcome of one requirement inside a composite check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementCheck {
    pub requirement: Requirement,
    pub allowed: bool,
}

/// Decides allow/deny for single and composite requirements.
#[derive(Debug, Clone)]
pub struct AuthzEvaluator {
    table: Arc<PermissionTable>,
}

impl AuthzEvaluator {
    pub fn new(table: Arc<PermissionTable>) -> Self {
        Self { table }
    }

    /// The table this evaluator consults.
    pub fn table(&self) -> &PermissionTable {
        &self.table
    }

    /// True iff `action` is granted to `role` on `resource`.
    pub fn can(&self, role: Role, resource: &str, action: Action) -> bool {
        let allowed = self.table.allowed_actions(role, resource).contains(action);
        debug!(
            "AUTHZ: role={} resource={} action={} allowed={}",
            role, resource, action, allowed
        );
        allowed
    }

    /// Like [`can`](Self::can), for a role given by name.
    ///
    /// A name that does not parse as a [`Role`] is denied.
    pub fn can_named(&self, role: &str, resource: &str, action: Action) -> bool {
        match role.parse::<Role>() {
            Ok(role) => self.can(role, resource, action),
            Err(_) => {
                debug!("AUTHZ: unknown role '{}' denied", role);
                false
            }
        }
    }

    /// True iff at least one requirement passes. An empty list is `false`.
    pub fn can_any(&self, role: Role, requirements: &[(&str, Action)]) -> bool {
        requirements
            .iter()
            .any(|(resource, action)| self.can(role, resource, *action))
    }

    /// True iff every requirement passes. An empty list is `true`.
    pub fn can_all(&self, role: Role, requirements: &[(&str, Action)]) -> bool {
        requirements
            .iter()
            .all(|(resource, action)| self.can(role, resource, *action))
    }

    /// Evaluate a composite requirement according to its mode.
    pub fn evaluate(&self, role: Role, requirement: &CompositeRequirement) -> bool {
        let pairs = requirement.pairs();
        match requirement.mode {
            CombineMode::All => self.can_all(role, &pairs),
            CombineMode::Any => self.can_any(role, &pairs),
        }
    }

    /// Per-requirement results, in order.
    pub fn explain(&self, role: Role, requirement: &CompositeRequirement) -> Vec<RequirementCheck> {
        requirement
            .requirements
            .iter()
            .map(|r| RequirementCheck {
                requirement: r.clone(),
                allowed: self.can(role, r.resource.as_str(), r.action),
            })
            .collect()
    }

    /// Whether every resource named by `requirement` has at least one entry.
    pub fn knows_all_resources(&self, requirement: &CompositeRequirement) -> bool {
        requirement
            .requirements
            .iter()
            .all(|r| self.table.knows_resource(r.resource.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn evaluator() -> AuthzEvaluator {
        AuthzEvaluator::new(Arc::new(PermissionTable::clinic_default()))
    }

    #[test]
    fn test_physician_can_update_patients() {
        assert!(evaluator().can(Role::Physician, "patients", Action::Update));
    }

    #[test]
    fn test_front_desk_cannot_read_settings() {
        assert!(!evaluator().can(Role::FrontDesk, "settings", Action::Read));
    }

    #[rstest]
    fn test_unknown_resource_always_denied(
        #[values(
            Role::SuperAdmin,
            Role::ClinicAdmin,
            Role::Physician,
            Role::Nurse,
            Role::FrontDesk,
            Role::Assistant,
            Role::Patient
        )]
        role: Role,
        #[values(Action::Create, Action::Read, Action::Update, Action::Delete, Action::Manage)]
        action: Action,
    ) {
        assert!(!evaluator().can(role, "nonexistent_resource", action));
    }

    #[test]
    fn test_empty_requirement_asymmetry() {
        let evaluator = evaluator();
        for role in Role::ALL {
            assert!(evaluator.can_all(role, &[]), "can_all([]) must be true");
            assert!(!evaluator.can_any(role, &[]), "can_any([]) must be false");
        }
    }

    #[test]
    fn test_manage_does_not_imply_delete() {
        let evaluator = evaluator();
        assert!(evaluator.can(Role::ClinicAdmin, "settings", Action::Manage));
        assert!(!evaluator.can(Role::ClinicAdmin, "settings", Action::Delete));
    }

    #[test]
    fn test_manage_does_not_imply_other_actions_in_custom_table() {
        let table = PermissionTable::builder()
            .grant(Role::Nurse, "inventory", [Action::Manage])
            .build()
            .unwrap();
        let evaluator = AuthzEvaluator::new(Arc::new(table));
        for action in [Action::Create, Action::Read, Action::Update, Action::Delete] {
            assert!(!evaluator.can(Role::Nurse, "inventory", action));
        }
    }

    #[test]
    fn test_can_all_implies_can_any() {
        let evaluator = evaluator();
        let lists: [&[(&str, Action)]; 4] = [
            &[("patients", Action::Read), ("billing", Action::Read)],
            &[("patients", Action::Read), ("settings", Action::Delete)],
            &[("inventory", Action::Update)],
            &[("hr", Action::Manage), ("reports", Action::Read)],
        ];
        for role in Role::ALL {
            for list in lists {
                if evaluator.can_all(role, list) {
                    assert!(evaluator.can_any(role, list));
                }
            }
        }
    }

    #[test]
    fn test_can_any_without_can_all() {
        let evaluator = evaluator();
        let list = [("patients", Action::Read), ("settings", Action::Read)];
        assert!(evaluator.can_any(Role::Physician, &list));
        assert!(!evaluator.can_all(Role::Physician, &list));
    }

    #[test]
    fn test_clinic_admin_reads_patients_and_billing() {
        let evaluator = evaluator();
        let requirement = CompositeRequirement::all([
            Requirement::new("patients", Action::Read),
            Requirement::new("billing", Action::Read),
        ]);
        assert!(evaluator.evaluate(Role::ClinicAdmin, &requirement));
    }

    #[test]
    fn test_revoked_billing_read_fails_composite() {
        let table = PermissionTable::builder()
            .grant(Role::ClinicAdmin, "patients", [Action::Read])
            .grant(Role::ClinicAdmin, "billing", [Action::Create])
            .build()
            .unwrap();
        let evaluator = AuthzEvaluator::new(Arc::new(table));
        let requirement = CompositeRequirement::all([
            Requirement::new("patients", Action::Read),
            Requirement::new("billing", Action::Read),
        ]);
        assert!(!evaluator.evaluate(Role::ClinicAdmin, &requirement));
    }

    #[test]
    fn test_evaluate_dispatches_on_mode() {
        let evaluator = evaluator();
        let requirements = [
            Requirement::new("enterprises", Action::Read),
            Requirement::new("appointments", Action::Read),
        ];
        let all = CompositeRequirement::all(requirements.clone());
        let any = CompositeRequirement::any(requirements);

        assert!(!evaluator.evaluate(Role::Patient, &all));
        assert!(evaluator.evaluate(Role::Patient, &any));
        assert!(evaluator.evaluate(Role::Patient, &CompositeRequirement::all(Vec::new())));
        assert!(!evaluator.evaluate(Role::Patient, &CompositeRequirement::any(Vec::new())));
    }

    #[test]
    fn test_can_named_fails_closed() {
        let evaluator = evaluator();
        assert!(evaluator.can_named("physician", "patients", Action::Read));
        assert!(!evaluator.can_named("Physician", "patients", Action::Read));
        assert!(!evaluator.can_named("", "patients", Action::Read));
    }

    #[test]
    fn test_explain_reports_each_requirement() {
        let evaluator = evaluator();
        let requirement = CompositeRequirement::all([
            Requirement::new("patients", Action::Read),
            Requirement::new("settings", Action::Read),
        ]);
        let checks = evaluator.explain(Role::Assistant, &requirement);
        assert_eq!(checks.len(), 2);
        assert!(checks[0].allowed);
        assert!(!checks[1].allowed);
    }

    #[test]
    fn test_knows_all_resources() {
        let evaluator = evaluator();
        assert!(evaluator.knows_all_resources(&CompositeRequirement::single("billing", Action::Read)));
        assert!(!evaluator.knows_all_resources(&CompositeRequirement::any([
            Requirement::new("billing", Action::Read),
            Requirement::new("payroll", Action::Read),
        ])));
    }
}

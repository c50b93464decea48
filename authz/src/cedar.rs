//! Cedar rendering of a [`PermissionTable`].
//!
//! The static table maps one-to-one onto Cedar `permit` statements with the
//! role as principal and the resource key as resource:
//!
//! ```text
//! permit(
//!     principal == Role::"physician",
//!     action == Action::"update",
//!     resource == Resource::"patients"
//! );
//! ```
//!
//! [`CedarMirror`] evaluates those statements with the Cedar authorizer. It
//! exists so a deployment can move the table into a policy store and confirm
//! the decisions did not change.

use cedar_policy::{
    Authorizer, Context, Decision, Entities, EntityId, EntityTypeName, EntityUid, PolicySet,
    Request,
};
use std::fmt::Write;
use std::str::FromStr;

use crate::error::{AuthzError, Result};
use crate::table::PermissionTable;
use crate::types::{Action, Role};

/// Render the table as Cedar policy source, one `permit` per granted action.
pub fn to_cedar_policies(table: &PermissionTable) -> String {
    let mut out = String::new();
    for entry in table.entries() {
        for action in entry.actions.iter() {
            // Writing to a String cannot fail.
            let _ = writeln!(
                out,
                "permit(\n    principal == Role::\"{}\",\n    action == Action::\"{}\",\n    resource == Resource::\"{}\"\n);",
                entry.role,
                action,
                escape(entry.resource.as_str())
            );
        }
    }
    out
}

/// Escape `id` for a Cedar string literal. Control characters become `\n`,
/// `\t` or `\u{..}` escapes, which Cedar decodes back to the same string.
fn escape(id: &str) -> String {
    id.chars().flat_map(char::escape_default).collect()
}

/// Cedar-backed evaluation of a rendered table.
pub struct CedarMirror {
    authorizer: Authorizer,
    policies: PolicySet,
    entities: Entities,
}

impl CedarMirror {
    /// Render `table` and parse it into a Cedar policy set.
    pub fn from_table(table: &PermissionTable) -> Result<Self> {
        let source = to_cedar_policies(table);
        let policies =
            PolicySet::from_str(&source).map_err(|e| AuthzError::PolicyParse(e.to_string()))?;

        Ok(Self {
            authorizer: Authorizer::new(),
            policies,
            entities: Entities::empty(),
        })
    }

    /// Number of parsed `permit` statements.
    pub fn policy_count(&self) -> usize {
        self.policies.policies().count()
    }

    /// Ask Cedar whether `role` may perform `action` on `resource`.
    pub fn is_authorized(&self, role: Role, resource: &str, action: Action) -> Result<bool> {
        let request = Request::new(
            Some(uid("Role", role.as_str())?),
            Some(uid("Action", action.as_str())?),
            Some(uid("Resource", resource)?),
            Context::empty(),
            None,
        )
        .map_err(|e| AuthzError::EntityCreation(e.to_string()))?;

        let response = self
            .authorizer
            .is_authorized(&request, &self.policies, &self.entities);

        Ok(response.decision() == Decision::Allow)
    }
}

fn uid(type_name: &str, id: &str) -> Result<EntityUid> {
    let type_name = EntityTypeName::from_str(type_name)
        .map_err(|e| AuthzError::EntityCreation(format!("Invalid entity type: {}", e)))?;
    Ok(EntityUid::from_type_name_and_id(type_name, EntityId::new(id)))
}

//! The static role → resource → actions table.
//!
//! A [`PermissionTable`] is built once, either from the compiled-in clinic
//! defaults or from a YAML definition (see [`crate::config`]), and is never
//! mutated afterwards. Share it through `Arc`; lookups are pure and safe for
//! any number of concurrent readers.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::{AuthzError, Result};
use crate::types::{Action, ActionSet, PermissionEntry, Resource, Role};

/// Immutable mapping of role → {resource → allowed actions}.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionTable {
    grants: BTreeMap<Role, BTreeMap<Resource, ActionSet>>,
}

impl PermissionTable {
    /// Starts an empty table builder.
    pub fn builder() -> PermissionTableBuilder {
        PermissionTableBuilder::default()
    }

    /// The set of actions `role` may perform on `resource`.
    ///
    /// Unknown roles and resources yield the empty set.
    pub fn allowed_actions(&self, role: Role, resource: &str) -> ActionSet {
        self.grants
            .get(&role)
            .and_then(|resources| resources.get(resource))
            .copied()
            .unwrap_or_default()
    }

    /// Every entry, ordered by role then resource.
    pub fn entries(&self) -> impl Iterator<Item = PermissionEntry> + '_ {
        self.grants.iter().flat_map(|(role, resources)| {
            resources.iter().map(move |(resource, actions)| PermissionEntry {
                role: *role,
                resource: resource.clone(),
                actions: *actions,
            })
        })
    }

    /// Every resource named by at least one entry, in sorted order.
    pub fn resources(&self) -> Vec<Resource> {
        let set: BTreeSet<&Resource> = self.grants.values().flat_map(|r| r.keys()).collect();
        set.into_iter().cloned().collect()
    }

    /// Whether any role has an entry for `resource`.
    pub fn knows_resource(&self, resource: &str) -> bool {
        self.grants.values().any(|r| r.contains_key(resource))
    }

    /// Number of (role, resource) entries.
    pub fn len(&self) -> usize {
        self.grants.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The compiled-in table for the clinic ERP.
    pub fn clinic_default() -> Self {
        use Action::*;
        use Role::*;

        const ALL: [Action; 5] = Action::ALL;
        const CRUD: [Action; 4] = [Create, Read, Update, Delete];
        const RESOURCES: [&str; 10] = [
            "patients",
            "appointments",
            "medical-records",
            "billing",
            "inventory",
            "hr",
            "reports",
            "settings",
            "users",
            "enterprises",
        ];

        let mut entries: Vec<PermissionEntry> = RESOURCES
            .iter()
            .map(|resource| PermissionEntry::new(SuperAdmin, *resource, ALL))
            .collect();

        entries.extend([
            PermissionEntry::new(ClinicAdmin, "patients", CRUD),
            PermissionEntry::new(ClinicAdmin, "appointments", CRUD),
            PermissionEntry::new(ClinicAdmin, "medical-records", [Read]),
            PermissionEntry::new(ClinicAdmin, "billing", ALL),
            PermissionEntry::new(ClinicAdmin, "inventory", ALL),
            PermissionEntry::new(ClinicAdmin, "hr", ALL),
            PermissionEntry::new(ClinicAdmin, "reports", [Read, Manage]),
            PermissionEntry::new(ClinicAdmin, "settings", [Read, Update, Manage]),
            PermissionEntry::new(ClinicAdmin, "users", CRUD),
            PermissionEntry::new(Physician, "patients", [Create, Read, Update]),
            PermissionEntry::new(Physician, "appointments", [Create, Read, Update]),
            PermissionEntry::new(Physician, "medical-records", [Create, Read, Update]),
            PermissionEntry::new(Physician, "billing", [Read]),
            PermissionEntry::new(Physician, "inventory", [Read]),
            PermissionEntry::new(Physician, "reports", [Read]),
            PermissionEntry::new(Nurse, "patients", [Read, Update]),
            PermissionEntry::new(Nurse, "appointments", [Read, Update]),
            PermissionEntry::new(Nurse, "medical-records", [Read, Update]),
            PermissionEntry::new(Nurse, "inventory", [Read, Update]),
            PermissionEntry::new(FrontDesk, "patients", [Create, Read, Update]),
            PermissionEntry::new(FrontDesk, "appointments", CRUD),
            PermissionEntry::new(FrontDesk, "billing", [Create, Read]),
            PermissionEntry::new(Assistant, "patients", [Read]),
            PermissionEntry::new(Assistant, "appointments", [Create, Read, Update]),
            PermissionEntry::new(Assistant, "inventory", [Read, Update]),
            PermissionEntry::new(Patient, "appointments", [Create, Read]),
            PermissionEntry::new(Patient, "medical-records", [Read]),
        ]);

        let mut builder = Self::builder();
        for entry in entries {
            builder = builder.entry(entry);
        }
        // The literal above holds one entry per (role, resource) pair.
        builder.build_unchecked()
    }
}

/// Collects entries and enforces one entry per (role, resource) pair.
#[derive(Debug, Default)]
pub struct PermissionTableBuilder {
    entries: Vec<PermissionEntry>,
}

impl PermissionTableBuilder {
    pub fn entry(mut self, entry: PermissionEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Shorthand for `entry(PermissionEntry::new(..))`.
    pub fn grant(
        self,
        role: Role,
        resource: impl Into<Resource>,
        actions: impl IntoIterator<Item = Action>,
    ) -> Self {
        self.entry(PermissionEntry::new(role, resource, actions))
    }

    /// Freezes the table.
    ///
    /// Fails with [`AuthzError::DuplicateEntry`] if a (role, resource) pair
    /// appears more than once.
    pub fn build(self) -> Result<PermissionTable> {
        let mut grants: BTreeMap<Role, BTreeMap<Resource, ActionSet>> = BTreeMap::new();

        for entry in self.entries {
            let resources = grants.entry(entry.role).or_default();
            if resources.contains_key(&entry.resource) {
                return Err(AuthzError::DuplicateEntry {
                    role: entry.role.to_string(),
                    resource: entry.resource.to_string(),
                });
            }
            resources.insert(entry.resource, entry.actions);
        }

        let table = PermissionTable { grants };
        debug!("Permission table built with {} entries", table.len());
        Ok(table)
    }

    /// Freezes the table, keeping the first entry on duplicates.
    fn build_unchecked(self) -> PermissionTable {
        let mut grants: BTreeMap<Role, BTreeMap<Resource, ActionSet>> = BTreeMap::new();
        for entry in self.entries {
            grants
                .entry(entry.role)
                .or_default()
                .entry(entry.resource)
                .or_insert(entry.actions);
        }
        PermissionTable { grants }
    }
}

//! Core authorization types for the clinic permission model.
//!
//! A decision is always made about a [`Role`] performing an [`Action`] on a
//! [`Resource`]. Roles and actions are closed sets; resources are opaque keys
//! so new capability domains can be added to the table without code changes.
//!
//! # Security Notes
//!
//! - `Manage` is an ordinary action. It does not imply `Create`, `Read`,
//!   `Update` or `Delete`; every grant must be listed explicitly.
//! - Resources are compared byte-for-byte. `"Patients"` and `"patients"` are
//!   different resources and the former is unknown to the default table.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::error::AuthzError;

/// The actor-type tag driving authorization decisions.
///
/// `SuperAdmin` is the only platform-level role; every other role is scoped
/// to a tenant (enterprise and, optionally, a site).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    SuperAdmin,
    ClinicAdmin,
    Physician,
    Nurse,
    FrontDesk,
    Assistant,
    Patient,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 7] = [
        Role::SuperAdmin,
        Role::ClinicAdmin,
        Role::Physician,
        Role::Nurse,
        Role::FrontDesk,
        Role::Assistant,
        Role::Patient,
    ];

    /// The canonical kebab-case name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super-admin",
            Role::ClinicAdmin => "clinic-admin",
            Role::Physician => "physician",
            Role::Nurse => "nurse",
            Role::FrontDesk => "front-desk",
            Role::Assistant => "assistant",
            Role::Patient => "patient",
        }
    }

    /// Whether this role operates above tenant boundaries.
    pub fn is_platform_level(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| AuthzError::UnknownRole(s.to_string()))
    }
}

/// One of the five independently grantable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Manage,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Manage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Manage => "manage",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| AuthzError::UnknownAction(s.to_string()))
    }
}

/// A set of actions, stored as a bitset.
///
/// Serializes as a list of action names in declaration order.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Action>", into = "Vec<Action>")]
pub struct ActionSet(u8);

impl ActionSet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn contains(&self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn insert(&mut self, action: Action) {
        self.0 |= action.bit();
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate the contained actions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        Action::ALL.into_iter().filter(|action| self.contains(*action))
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = ActionSet::empty();
        for action in iter {
            set.insert(action);
        }
        set
    }
}

impl From<Vec<Action>> for ActionSet {
    fn from(actions: Vec<Action>) -> Self {
        actions.into_iter().collect()
    }
}

impl From<ActionSet> for Vec<Action> {
    fn from(set: ActionSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// An opaque named capability domain subject to access control.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(String);

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Resource {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Resource {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Resource {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// The grant of a set of actions on one resource to one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub role: Role,
    pub resource: Resource,
    pub actions: ActionSet,
}

impl PermissionEntry {
    pub fn new(
        role: Role,
        resource: impl Into<Resource>,
        actions: impl IntoIterator<Item = Action>,
    ) -> Self {
        Self {
            role,
            resource: resource.into(),
            actions: actions.into_iter().collect(),
        }
    }
}

/// A single (resource, action) pair a protected surface depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requirement {
    pub resource: Resource,
    pub action: Action,
}

impl Requirement {
    pub fn new(resource: impl Into<Resource>, action: Action) -> Self {
        Self {
            resource: resource.into(),
            action,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

/// How the requirements of a [`CompositeRequirement`] are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMode {
    #[default]
    All,
    Any,
}

/// An ordered set of requirements combined with ALL or ANY semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeRequirement {
    pub requirements: Vec<Requirement>,
    pub mode: CombineMode,
}

impl CompositeRequirement {
    /// Every requirement must pass.
    pub fn all(requirements: impl IntoIterator<Item = Requirement>) -> Self {
        Self {
            requirements: requirements.into_iter().collect(),
            mode: CombineMode::All,
        }
    }

    /// At least one requirement must pass.
    pub fn any(requirements: impl IntoIterator<Item = Requirement>) -> Self {
        Self {
            requirements: requirements.into_iter().collect(),
            mode: CombineMode::Any,
        }
    }

    pub fn single(resource: impl Into<Resource>, action: Action) -> Self {
        Self::all([Requirement::new(resource, action)])
    }

    /// The requirements as borrowed (resource, action) pairs.
    pub fn pairs(&self) -> Vec<(&str, Action)> {
        self.requirements
            .iter()
            .map(|r| (r.resource.as_str(), r.action))
            .collect()
    }
}

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{AuthzError, Result};
use crate::table::PermissionTable;
use crate::types::{Action, Role};

/// On-disk definition of a permission table.
///
/// ```yaml
/// id: permissions
/// name: Clinic permissions
/// version: 1.0.0
/// entries:
///   - role: physician
///     resource: patients
///     actions: [create, read, update]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionTableDefinition {
    /// Unique identifier for this table
    pub id: String,
    /// Human-readable name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Version of the table contents
    pub version: String,
    /// One entry per (role, resource) pair
    #[serde(default)]
    pub entries: Vec<EntryDefinition>,
}

/// A single entry as written in YAML.
///
/// Names are kept as strings so that validation can report which entry is
/// wrong instead of failing with a generic deserializer message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDefinition {
    pub role: String,
    pub resource: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

impl PermissionTableDefinition {
    /// Parse a definition from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| AuthzError::TableParse(e.to_string()))
    }

    /// Load a definition from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Describe an existing table in the on-disk format.
    pub fn from_table(table: &PermissionTable) -> Self {
        Self {
            id: "permissions".to_string(),
            name: "Permission Table".to_string(),
            description: None,
            version: "1.0.0".to_string(),
            entries: table
                .entries()
                .map(|entry| EntryDefinition {
                    role: entry.role.to_string(),
                    resource: entry.resource.to_string(),
                    actions: entry.actions.iter().map(|a| a.to_string()).collect(),
                })
                .collect(),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| AuthzError::TableParse(e.to_string()))
    }

    /// Validate the definition and freeze it into a table.
    pub fn into_table(self) -> Result<PermissionTable> {
        if self.id.trim().is_empty() {
            return Err(AuthzError::TableValidation(
                "Table ID cannot be empty".to_string(),
            ));
        }
        if self.version.trim().is_empty() {
            return Err(AuthzError::TableValidation(
                "Table version cannot be empty".to_string(),
            ));
        }

        let mut builder = PermissionTable::builder();
        for (index, entry) in self.entries.into_iter().enumerate() {
            if entry.resource.trim().is_empty() {
                return Err(AuthzError::TableValidation(format!(
                    "Entry {} has an empty resource",
                    index
                )));
            }
            if entry.resource.chars().any(char::is_control) {
                return Err(AuthzError::TableValidation(format!(
                    "Entry {} resource {:?} contains control characters",
                    index, entry.resource
                )));
            }
            let role: Role = entry.role.parse()?;
            let actions = entry
                .actions
                .iter()
                .map(|name| name.parse::<Action>())
                .collect::<Result<Vec<_>>>()?;
            builder = builder.grant(role, entry.resource, actions);
        }

        let table = builder.build()?;
        info!(
            "Loaded permission table '{}' v{} with {} entries",
            self.id,
            self.version,
            table.len()
        );
        Ok(table)
    }
}

/// Load and validate a permission table from a YAML file.
pub fn load_table(path: &Path) -> Result<PermissionTable> {
    PermissionTableDefinition::from_file(path)?.into_table()
}

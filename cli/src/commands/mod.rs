pub mod audit;
pub mod check;
pub mod table;

use anyhow::{Context, Result};
use authz::{config, PermissionTable};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Load the table from `path`, or fall back to the compiled-in clinic table.
pub fn load_table(path: Option<&Path>) -> Result<Arc<PermissionTable>> {
    let table = match path {
        Some(path) => {
            debug!("Loading permission table from {:?}", path);
            config::load_table(path)
                .with_context(|| format!("Failed to load permission table from {}", path.display()))?
        }
        None => PermissionTable::clinic_default(),
    };
    Ok(Arc::new(table))
}

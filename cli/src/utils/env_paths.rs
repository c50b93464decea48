use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Environment-based path configuration
#[derive(Debug, Clone)]
pub struct EnvPaths {
    /// YAML permission table; the compiled-in table is used when unset
    pub table_path: Option<PathBuf>,
    /// Secure audit log for denials; denials only go to tracing when unset
    pub audit_log_path: Option<PathBuf>,
}

impl EnvPaths {
    /// Load paths from environment variables, honouring a `.env` file in the
    /// current directory
    pub fn load() -> Result<Self> {
        let base = env::current_dir().context("Failed to get current directory")?;

        // Try to load .env file if it exists in current directory
        let env_file = base.join(".env");
        if env_file.exists() {
            dotenv::from_path(&env_file).ok();
        }

        Ok(Self::from_lookup(&base, |name| env::var(name).ok()))
    }

    /// Build paths from a variable lookup, resolving relative values against `base_dir`
    fn from_lookup(base_dir: &Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get_optional_path = |var_name: &str| {
            lookup(var_name)
                .filter(|value| !value.trim().is_empty())
                .map(|value| Self::resolve(PathBuf::from(value), base_dir))
        };

        Self {
            table_path: get_optional_path("AUTHZ_TABLE_PATH"),
            audit_log_path: get_optional_path("AUDIT_LOG_PATH"),
        }
    }

    /// Relative paths are taken relative to the base directory
    fn resolve(path: PathBuf, base_dir: &Path) -> PathBuf {
        if path.is_relative() {
            base_dir.join(path)
        } else {
            path
        }
    }
}

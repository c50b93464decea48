//! Session and tenant scope types

use authz::types::Role;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{Result, SessionError};

/// Tenant scoping carried by a session.
///
/// Scope is recorded on audit entries but never changes an authorization
/// decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope {
    /// Enterprise (tenant) identifier
    pub enterprise_id: Option<String>,
    /// Site within the enterprise
    pub site_id: Option<String>,
}

impl TenantScope {
    pub fn new(enterprise_id: impl Into<String>, site_id: Option<String>) -> Self {
        Self {
            enterprise_id: Some(enterprise_id.into()),
            site_id,
        }
    }

    /// Scope for platform-level actors that belong to no tenant.
    pub fn platform() -> Self {
        Self::default()
    }
}

/// An authenticated actor.
///
/// The role is fixed for the lifetime of the session. Changing it takes a new
/// sign-in or an explicit impersonation, both of which produce a new session
/// with a new id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (ULID)
    pub id: String,
    /// The authenticated user
    pub user_id: String,
    pub role: Role,
    pub scope: TenantScope,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set when the session is revoked before it expires
    pub revoked: bool,
    /// User id of the platform administrator impersonating this role, if any
    pub impersonated_by: Option<String>,
}

impl Session {
    /// Create a session valid for `ttl` from now.
    pub fn new(user_id: impl Into<String>, role: Role, scope: TenantScope, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: ulid::Ulid::new().to_string(),
            user_id: user_id.into(),
            role,
            scope,
            created_at: now,
            expires_at: now + ttl,
            revoked: false,
            impersonated_by: None,
        }
    }

    /// Whether the session is usable at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in seconds
    pub ttl_seconds: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 86400, // 24 hours
        }
    }
}

impl SessionConfig {
    /// Load configuration, taking `SESSION_TTL_SECONDS` from the environment if set
    pub fn from_env() -> Result<Self> {
        match env::var("SESSION_TTL_SECONDS") {
            Ok(value) => Self::with_ttl_str(&value),
            Err(_) => Ok(Self::default()),
        }
    }

    fn with_ttl_str(value: &str) -> Result<Self> {
        let ttl_seconds: i64 = value.trim().parse().map_err(|_| {
            SessionError::Configuration(format!("Invalid SESSION_TTL_SECONDS: {}", value))
        })?;
        if ttl_seconds <= 0 {
            return Err(SessionError::Configuration(
                "SESSION_TTL_SECONDS must be positive".to_string(),
            ));
        }
        Ok(Self { ttl_seconds })
    }

    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_active() {
        let session = Session::new(
            "user-1",
            Role::Nurse,
            TenantScope::new("ent-1", Some("site-a".to_string())),
            Duration::hours(1),
        );
        assert!(session.is_active_at(Utc::now()));
        assert!(session.impersonated_by.is_none());
        assert_eq!(session.scope.site_id.as_deref(), Some("site-a"));
    }

    #[test]
    fn test_session_inactive_after_expiry() {
        let session = Session::new("user-1", Role::Nurse, TenantScope::platform(), Duration::hours(1));
        assert!(!session.is_active_at(session.expires_at));
        assert!(!session.is_active_at(session.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_revoked_session_inactive() {
        let mut session =
            Session::new("user-1", Role::Nurse, TenantScope::platform(), Duration::hours(1));
        session.revoked = true;
        assert!(!session.is_active_at(Utc::now()));
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = Session::new("u", Role::Patient, TenantScope::platform(), Duration::hours(1));
        let b = Session::new("u", Role::Patient, TenantScope::platform(), Duration::hours(1));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_session_serializes_role_name() {
        let session =
            Session::new("u", Role::FrontDesk, TenantScope::platform(), Duration::hours(1));
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["role"], "front-desk");
    }

    #[test]
    fn test_ttl_parsing() {
        assert_eq!(SessionConfig::with_ttl_str("3600").unwrap().ttl_seconds, 3600);
        assert!(SessionConfig::with_ttl_str("soon").is_err());
        assert!(SessionConfig::with_ttl_str("0").is_err());
        assert_eq!(SessionConfig::default().ttl(), Duration::hours(24));
    }
}

//! Identity/session provider interface and an in-memory implementation

use async_trait::async_trait;
use authz::types::Role;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::types::{Session, SessionConfig, TenantScope};

/// Source of the current actor.
///
/// The provider is authoritative and read-only from the point of view of
/// authorization code.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The current session, or `None` if nobody is signed in.
    async fn current_session(&self) -> Result<Option<Session>>;

    /// Whether `session` is still usable.
    async fn is_session_active(&self, session: &Session) -> Result<bool>;

    /// Counter bumped on every session change.
    ///
    /// A check that started under one epoch and finished under another must
    /// discard its result.
    fn epoch(&self) -> u64;
}

/// Single-actor session provider held in memory.
pub struct InMemorySessionProvider {
    config: SessionConfig,
    current: RwLock<Option<Session>>,
    epoch: AtomicU64,
}

impl InMemorySessionProvider {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
            epoch: AtomicU64::new(0),
        }
    }

    fn bump(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start a new session, replacing any existing one.
    pub async fn sign_in(&self, user_id: &str, role: Role, scope: TenantScope) -> Session {
        let session = Session::new(user_id, role, scope, self.config.ttl());
        *self.current.write().await = Some(session.clone());
        let epoch = self.bump();
        info!(
            "Session {} started for user {} as {} (epoch {})",
            session.id, user_id, role, epoch
        );
        session
    }

    /// End the current session, if any.
    pub async fn sign_out(&self) {
        let previous = self.current.write().await.take();
        let epoch = self.bump();
        match previous {
            Some(session) => info!("Session {} ended (epoch {})", session.id, epoch),
            None => debug!("Sign-out with no active session (epoch {})", epoch),
        }
    }

    /// Revoke the current session without removing it.
    pub async fn revoke(&self) -> Result<()> {
        let mut guard = self.current.write().await;
        let session = guard.as_mut().ok_or(SessionError::NoActiveSession)?;
        session.revoked = true;
        let id = session.id.clone();
        drop(guard);

        let epoch = self.bump();
        warn!("Session {} revoked (epoch {})", id, epoch);
        Ok(())
    }

    /// Force the current session past its expiry time.
    pub async fn expire(&self) -> Result<()> {
        let mut guard = self.current.write().await;
        let session = guard.as_mut().ok_or(SessionError::NoActiveSession)?;
        session.expires_at = Utc::now() - Duration::seconds(1);
        let id = session.id.clone();
        drop(guard);

        let epoch = self.bump();
        info!("Session {} expired (epoch {})", id, epoch);
        Ok(())
    }

    /// Replace the current session with one acting as `role`.
    ///
    /// Only platform-level roles may impersonate, and only from an active
    /// session. The new session keeps the user id and scope and records who
    /// is impersonating.
    pub async fn impersonate(&self, role: Role) -> Result<Session> {
        let mut guard = self.current.write().await;
        let current = guard
            .as_ref()
            .filter(|s| s.is_active_at(Utc::now()))
            .ok_or(SessionError::NoActiveSession)?;

        if !current.role.is_platform_level() {
            warn!(
                "Impersonation attempt by {} with role {}",
                current.user_id, current.role
            );
            return Err(SessionError::ImpersonationNotAllowed(
                current.role.to_string(),
            ));
        }

        let mut session = Session::new(
            current.user_id.clone(),
            role,
            current.scope.clone(),
            self.config.ttl(),
        );
        session.impersonated_by = Some(current.user_id.clone());
        *guard = Some(session.clone());
        drop(guard);

        let epoch = self.bump();
        info!(
            "User {} now impersonating {} in session {} (epoch {})",
            session.user_id, role, session.id, epoch
        );
        Ok(session)
    }
}

impl Default for InMemorySessionProvider {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionProvider {
    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.current.read().await.clone())
    }

    async fn is_session_active(&self, session: &Session) -> Result<bool> {
        let current = self.current.read().await;
        let active = match current.as_ref() {
            Some(c) => c.id == session.id && c.is_active_at(Utc::now()),
            None => false,
        };
        Ok(active)
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}
